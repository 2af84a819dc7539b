// Session orchestration; keep socket handling in backend/.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::errors::CallError;
use crate::shared_types::{ConnectionState, SessionId};

use super::session::SessionConnection;
use super::settings::{CallOptions, SessionSettings};

// -----------------------------------------------------------------------------
// ----- SessionRegistry -------------------------------------------------------

/// Every live session, keyed by token. Built once at startup and handed to
/// whatever needs it; `shutdown` tears everything down at exit.
#[derive(Debug)]
pub struct SessionRegistry {
    settings: Arc<SessionSettings>,
    sessions: Mutex<HashMap<SessionId, Arc<SessionConnection>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub id: String,
    pub state: ConnectionState,
    pub pending: usize,
    pub idle_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub backend: String,
    pub total: usize,
    pub connected: usize,
    pub pending: usize,
    pub sessions: Vec<SessionStats>,
}

// -----------------------------------------------------------------------------
// ----- SessionRegistry: Static -----------------------------------------------

impl SessionRegistry {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings: Arc::new(settings),
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- SessionRegistry: Public -----------------------------------------------

impl SessionRegistry {
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Existing session for `id`, or a new one. Concurrent first touches for the
    /// same id all get the same session.
    pub fn get_or_create(&self, id: &SessionId) -> Arc<SessionConnection> {
        let mut sessions = self.sessions.lock();
        if let Some(session) = sessions.get(id) {
            return session.clone();
        }

        debug!("creating session {id}");
        let session = SessionConnection::new(id.clone(), self.settings.clone());
        sessions.insert(id.clone(), session.clone());
        session
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<SessionConnection>> {
        self.sessions.lock().get(id).cloned()
    }

    /// Send `request` on the session for `id` and wait for its response.
    ///
    /// A session retired between lookup and enqueue never saw the call, so the
    /// lookup is simply repeated; this is not a backend retry.
    pub async fn send(
        &self,
        id: &SessionId,
        request: &Value,
        options: CallOptions,
    ) -> Result<Value, CallError> {
        let timeout = options.timeout.unwrap_or(self.settings.request_timeout);

        loop {
            let session = self.get_or_create(id);
            match session.send(request, timeout).await {
                Err(CallError::Retired) => self.forget(id, &session),
                outcome => return outcome,
            }
        }
    }

    /// Tear down the session for `id` and forget it. Pending calls fail with a
    /// connection error.
    pub fn evict(&self, id: &SessionId) -> bool {
        let Some(session) = self.sessions.lock().remove(id) else {
            return false;
        };

        session.destroy();
        info!("evicted session {id}");
        true
    }

    /// Evict every session idle for longer than the configured threshold.
    pub fn sweep_idle(&self, now: Instant) -> usize {
        let threshold = self.settings.idle_timeout;
        let mut sessions = self.sessions.lock();

        let before = sessions.len();
        sessions.retain(|_, session| !session.retire_if_idle(now, threshold));
        let evicted = before - sessions.len();

        if evicted > 0 {
            info!(
                "evicted {evicted} idle session(s); {} remaining",
                sessions.len()
            );
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        let now = Instant::now();
        let mut sessions: Vec<SessionStats> = self
            .sessions
            .lock()
            .values()
            .map(|session| SessionStats {
                id: session.id().to_string(),
                state: session.state(),
                pending: session.pending(),
                idle_ms: duration_ms(session.idle_for(now)),
            })
            .collect();
        sessions.sort_by(|a, b| a.id.cmp(&b.id));

        RegistryStats {
            backend: self.settings.backend.to_string(),
            total: sessions.len(),
            connected: sessions.iter().filter(|s| s.state.is_connected()).count(),
            pending: sessions.iter().map(|s| s.pending).sum(),
            sessions,
        }
    }

    /// Destroy every session. Returns how many there were.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<_> = self.sessions.lock().drain().collect();
        for (_, session) in &drained {
            session.destroy();
        }

        info!("session registry shut down ({} session(s))", drained.len());
        drained.len()
    }
}

// -----------------------------------------------------------------------------
// ----- SessionRegistry: Private ----------------------------------------------

impl SessionRegistry {
    fn forget(&self, id: &SessionId, retired: &Arc<SessionConnection>) {
        let mut sessions = self.sessions.lock();
        if sessions.get(id).is_some_and(|s| Arc::ptr_eq(s, retired)) {
            sessions.remove(id);
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
