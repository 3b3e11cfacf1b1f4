use std::sync::Arc;

use dotenv::dotenv;
use tokio::io::{stdin, stdout, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod console;

use clinic_client_cell::HttpSchedulingStore;
use scheduling_cell::TemporalPolicyGuard;
use shared_config::AppConfig;
use shared_models::SessionContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Logs go to stderr so they do not interleave with prompts
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn,scheduling_cell=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::from_env();
    info!("Starting booking console against {}", config.api_base_url);

    let session = Arc::new(SessionContext::new(config.api_token.clone()));
    let store = Arc::new(HttpSchedulingStore::new(&config, session.clone()));

    let mut console = console::Console::new(
        store,
        TemporalPolicyGuard::system(),
        session,
        BufReader::new(stdin()),
        stdout(),
    );
    console.run().await?;

    info!("Booking console closed");
    Ok(())
}
