use crate::config::Config;
use crate::crypto::Crypto;
use crate::services::webhook::WebhookClient;
use crate::store::SessionStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub webhook: WebhookClient,
    pub crypto: Arc<Crypto>,
    pub sessions: SessionStore,
}

pub type SharedState = Arc<AppState>;
