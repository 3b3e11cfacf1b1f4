use tokio::sync::RwLock;
use tracing::{debug, info};

/// Authentication state handed to the collaborators that talk to the clinic API.
///
/// Nothing reads a token from ambient storage: whoever builds a store passes the
/// session in, and the store clears it when the server rejects the token.
#[derive(Debug, Default)]
pub struct SessionContext {
    token: RwLock<Option<String>>,
}

impl SessionContext {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            token: RwLock::new(if token.is_empty() { None } else { Some(token) }),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub async fn bearer_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    pub async fn set_token(&self, token: impl Into<String>) {
        debug!("Session token replaced");
        *self.token.write().await = Some(token.into());
    }

    /// Drop the token after the server refused it.
    pub async fn invalidate(&self) {
        let mut token = self.token.write().await;
        if token.take().is_some() {
            info!("Session token invalidated");
        }
    }
}
