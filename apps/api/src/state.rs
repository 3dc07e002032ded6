use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::llm_client::session::SessionConfig;
use crate::store::workspace::ResumeWorkspace;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The master record. Mutations are serialized through the lock.
    pub workspace: Arc<Mutex<ResumeWorkspace>>,
    /// Provider settings for this process; never persisted.
    pub session: SessionConfig,
    pub config: Config,
}
