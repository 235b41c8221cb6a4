use crate::playback::MediaPlayerManager;
use std::sync::{Arc, Mutex, Weak};
use tracing::debug;
use uuid::Uuid;

struct RegisteredSession {
    id: Uuid,
    manager: Weak<MediaPlayerManager>,
}

/// Tracks which playback session is the active one
///
/// At most one manager is current at a time. Registering a new one replaces
/// the previous; a manager releases its slot when it stops or fails, and a
/// release from a manager that has already been replaced is ignored.
#[derive(Default)]
pub struct SessionRegistry {
    current: Mutex<Option<RegisteredSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, manager: &Arc<MediaPlayerManager>) {
        let mut current = self.current.lock().unwrap();
        if let Some(previous) = current.as_ref() {
            debug!("Replacing active session {}", previous.id);
        }
        *current = Some(RegisteredSession {
            id: manager.id(),
            manager: Arc::downgrade(manager),
        });
    }

    /// Clear the slot if `id` still holds it
    pub fn release(&self, id: Uuid) -> bool {
        let mut current = self.current.lock().unwrap();
        match current.as_ref() {
            Some(session) if session.id == id => {
                debug!("Releasing active session {}", id);
                *current = None;
                true
            }
            _ => false,
        }
    }

    /// The active manager, if one is registered and still alive
    pub fn current(&self) -> Option<Arc<MediaPlayerManager>> {
        self.current
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|session| session.manager.upgrade())
    }

    pub fn current_id(&self) -> Option<Uuid> {
        self.current.lock().unwrap().as_ref().map(|session| session.id)
    }
}
