// In-memory MCP session bookkeeping

use crate::protocol::ClientInfo;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Sessions unused for this long are dropped
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// One negotiated MCP session
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub protocol_version: String,
    pub client_info: ClientInfo,
    pub created_at: Instant,
    pub last_seen: Instant,
}

/// Live sessions, keyed by session id.
///
/// Clients that never send `DELETE` are expired after an idle period,
/// checked whenever a new session is created.
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Register a new session and return its id
    pub fn create(&self, protocol_version: &str, client_info: ClientInfo) -> Session {
        let now = Instant::now();
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            protocol_version: protocol_version.to_string(),
            client_info,
            created_at: now,
            last_seen: now,
        };

        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, s| now.duration_since(s.last_seen) < self.idle_timeout);
        if sessions.len() < before {
            tracing::debug!(expired = before - sessions.len(), "Expired idle sessions");
        }
        sessions.insert(session.id.clone(), session.clone());
        session
    }

    /// Mark a session as used; returns false when it is unknown or idle too long
    pub fn touch(&self, id: &str) -> bool {
        let mut sessions = self.lock();
        let now = Instant::now();
        match sessions.get_mut(id) {
            Some(session) if now.duration_since(session.last_seen) < self.idle_timeout => {
                session.last_seen = now;
                true
            }
            Some(_) => {
                sessions.remove(id);
                false
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Terminate a session; returns whether it existed
    pub fn remove(&self, id: &str) -> bool {
        self.lock().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        // A poisoned map is still structurally valid
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ClientInfo {
        ClientInfo {
            name: "test-client".to_string(),
            version: "1.0.0".to_string(),
        }
    }

    #[test]
    fn test_session_lifecycle() {
        let store = SessionStore::new();
        let session = store.create("2025-06-18", client());

        assert!(store.contains(&session.id));
        assert_eq!(store.get(&session.id).unwrap().client_info, client());
        assert_eq!(store.len(), 1);

        assert!(store.remove(&session.id));
        assert!(!store.remove(&session.id));
        assert!(store.is_empty());
    }

    #[test]
    fn test_idle_sessions_expire() {
        let store = SessionStore::with_idle_timeout(Duration::from_millis(200));
        let idle = store.create("2025-06-18", client());
        let active = store.create("2025-06-18", client());

        std::thread::sleep(Duration::from_millis(120));
        assert!(store.touch(&active.id));
        std::thread::sleep(Duration::from_millis(120));

        // Creating a session sweeps the idle one, the touched one survives
        store.create("2025-06-18", client());
        assert!(!store.contains(&idle.id));
        assert!(store.contains(&active.id));
        assert_eq!(store.len(), 2);

        std::thread::sleep(Duration::from_millis(250));
        assert!(!store.touch(&active.id));
        assert!(!store.contains(&active.id));
    }

    #[test]
    fn test_session_ids_are_unique() {
        let store = SessionStore::new();
        let a = store.create("2025-06-18", client());
        let b = store.create("2025-06-18", client());
        assert_ne!(a.id, b.id);
    }
}
