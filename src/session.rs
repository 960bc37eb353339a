// In-memory survey sessions
// One per browser visit: participant, trial counter and the pending trial
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::trial::{Participant, Trial};

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub participant: Option<Participant>,
    /// Set while a registration is being persisted
    pub registering: bool,
    /// 1-based number of the trial being shown
    pub trial_number: u32,
    /// Rendered but not yet answered; kept so a reload shows the same clips
    pub pending: Option<Trial>,
    pub completed: bool,
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            participant: None,
            registering: false,
            trial_number: 1,
            pending: None,
            completed: false,
        }
    }
}

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Session>> {
        // A panic mid-update leaves plain data behind, still usable
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a new session and return its id
    pub fn create(&self) -> Uuid {
        let session = Session::new();
        let id = session.id;
        self.lock().insert(id, session);
        log::info!("Started session {}", id);
        id
    }

    /// Snapshot of a session
    pub fn get(&self, id: &Uuid) -> Option<Session> {
        self.lock().get(id).cloned()
    }

    /// Run `f` on a session under the lock
    pub fn update<T>(&self, id: &Uuid, f: impl FnOnce(&mut Session) -> T) -> Option<T> {
        self.lock().get_mut(id).map(f)
    }

    /// Remove sessions created before `cutoff` and return them
    pub fn expire(&self, cutoff: DateTime<Utc>) -> Vec<Session> {
        let mut sessions = self.lock();
        let stale: Vec<Uuid> = sessions
            .values()
            .filter(|s| s.created_at < cutoff)
            .map(|s| s.id)
            .collect();
        let expired: Vec<Session> = stale.iter().filter_map(|id| sessions.remove(id)).collect();

        if !expired.is_empty() {
            log::info!("Expired {} session(s), {} still active", expired.len(), sessions.len());
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
