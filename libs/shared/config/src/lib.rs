use std::env;
use tracing::warn;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_token: String,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            api_base_url: env::var("SCHEDULING_API_URL")
                .unwrap_or_else(|_| {
                    warn!("SCHEDULING_API_URL not set, using default");
                    DEFAULT_API_BASE_URL.to_string()
                }),
            api_token: env::var("SCHEDULING_API_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("SCHEDULING_API_TOKEN not set, using empty value");
                    String::new()
                }),
            request_timeout_secs: env::var("SCHEDULING_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|raw| match raw.parse::<u64>() {
                    Ok(secs) => Some(secs),
                    Err(_) => {
                        warn!("SCHEDULING_REQUEST_TIMEOUT_SECS is not a number: {}", raw);
                        None
                    }
                })
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_base_url.is_empty() && !self.api_token.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_token: String::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}
