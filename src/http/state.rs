use crate::config::Config;
use crate::providers::ProviderRegistry;
use crate::session::ControlMessage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::warn;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Read-only after startup
    pub registry: Arc<ProviderRegistry>,

    /// Control channels of live sessions (session_id → sender)
    pub sessions: Arc<RwLock<HashMap<String, mpsc::Sender<ControlMessage>>>>,
}

impl AppState {
    pub fn new(config: Config, registry: ProviderRegistry) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Publish a live session's control channel
    ///
    /// Returns false, leaving the existing entry alone, if another live
    /// connection already holds `session_id`.
    pub async fn register_session(
        &self,
        session_id: &str,
        control: mpsc::Sender<ControlMessage>,
    ) -> bool {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(session_id) {
            if !existing.is_closed() {
                warn!(session_id = %session_id, "Session ID already in use, control not published");
                return false;
            }
        }

        sessions.insert(session_id.to_string(), control);
        true
    }

    /// Withdraw a control channel, but only if `session_id` still maps to it
    pub async fn unregister_session(
        &self,
        session_id: &str,
        control: &mpsc::Sender<ControlMessage>,
    ) {
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(session_id)
            .is_some_and(|current| current.same_channel(control))
        {
            sessions.remove(session_id);
        }
    }
}
