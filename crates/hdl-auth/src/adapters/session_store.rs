//! Session Registry
//!
//! In-memory session attribute store holding `SessionAuthState` snapshots.
//!
//! Snapshots are never mutated. A request reads the current `Arc`, does its
//! verification work without holding any lock, then installs its successor
//! with `replace_if_current`. If another request on the same session got
//! there first, the late snapshot is discarded.
//!
//! The registry is bounded. Sessions idle longer than the configured age are
//! purged, and at capacity the least recently used session is evicted to
//! make room for a new one.

use crate::domain::config::{AuthConfig, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_MAX_AGE};
use crate::domain::session::SessionAuthState;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

struct SessionSlot {
    state: Arc<SessionAuthState>,
    last_used: Instant,
}

impl SessionSlot {
    fn new(state: Arc<SessionAuthState>) -> Self {
        Self {
            state,
            last_used: Instant::now(),
        }
    }
}

pub struct SessionRegistry {
    sessions: DashMap<String, SessionSlot>,
    nonce_length: usize,
    max_sessions: usize,
    max_idle: Duration,
}

impl SessionRegistry {
    pub fn new(nonce_length: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            nonce_length,
            max_sessions: DEFAULT_MAX_SESSIONS,
            max_idle: DEFAULT_SESSION_MAX_AGE,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.nonce_length).with_limits(config.max_sessions, config.session_max_age)
    }

    /// At most `max_sessions` entries, each dropped after `max_idle` unused.
    pub fn with_limits(mut self, max_sessions: usize, max_idle: Duration) -> Self {
        self.max_sessions = max_sessions.max(1);
        self.max_idle = max_idle;
        self
    }

    /// Current snapshot, creating one with a fresh server nonce on first use.
    pub fn load_or_create(&self, session_id: &str) -> Arc<SessionAuthState> {
        if let Some(state) = self.get(session_id) {
            return state;
        }
        if self.sessions.len() >= self.max_sessions {
            self.make_room();
        }
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!(session_id, "Creating session authentication state");
                SessionSlot::new(Arc::new(SessionAuthState::new(session_id, self.nonce_length)))
            })
            .state
            .clone()
    }

    /// Current snapshot of an existing session. Counts as use.
    pub fn get(&self, session_id: &str) -> Option<Arc<SessionAuthState>> {
        self.sessions.get_mut(session_id).map(|mut slot| {
            slot.last_used = Instant::now();
            Arc::clone(&slot.state)
        })
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Install `next` only if `current` is still the installed snapshot.
    pub fn replace_if_current(
        &self,
        session_id: &str,
        current: &Arc<SessionAuthState>,
        next: Arc<SessionAuthState>,
    ) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut slot) if Arc::ptr_eq(&slot.state, current) => {
                *slot = SessionSlot::new(next);
                true
            }
            _ => {
                debug!(session_id, "Session state changed concurrently, discarding update");
                false
            }
        }
    }

    /// Move a session to `new_id` under a fresh server nonce.
    ///
    /// The old id stops naming anything. `None` when `session_id` is unknown.
    pub fn rotate(&self, session_id: &str, new_id: &str) -> Option<Arc<SessionAuthState>> {
        let (_, slot) = self.sessions.remove(session_id)?;
        let next = Arc::new(slot.state.rotated(new_id, self.nonce_length));
        self.sessions
            .insert(new_id.to_string(), SessionSlot::new(Arc::clone(&next)));
        debug!(session_id, new_id, "Rotated session id");
        Some(next)
    }

    pub fn remove(&self, session_id: &str) -> Option<Arc<SessionAuthState>> {
        self.sessions.remove(session_id).map(|(_, slot)| slot.state)
    }

    /// Drop sessions unused for longer than `max_idle`. Returns how many were removed.
    pub fn purge_expired(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, slot| slot.last_used.elapsed() <= max_idle);
        before.saturating_sub(self.sessions.len())
    }

    fn make_room(&self) {
        let purged = self.purge_expired(self.max_idle);
        let mut evicted = 0usize;
        while self.sessions.len() >= self.max_sessions {
            let oldest = self
                .sessions
                .iter()
                .min_by_key(|entry| entry.value().last_used)
                .map(|entry| entry.key().clone());
            let Some(oldest) = oldest else {
                break;
            };
            self.sessions.remove(&oldest);
            evicted += 1;
        }
        debug!(purged, evicted, "Session registry at capacity");
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
