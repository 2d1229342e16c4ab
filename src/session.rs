use crate::error::{RelayError, Result};
use crate::metrics;
use crate::types::CardRecord;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Time source for the registry. Injected so TTL behavior is testable
/// without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Ready,
}

/// One desktop-to-mobile handoff. Owned exclusively by the registry; callers
/// only ever see clones.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub record: Option<CardRecord>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Time-bounded session store coordinating the asynchronous mobile-upload /
/// desktop-poll relationship.
///
/// All critical sections are short map operations; recognition and
/// extraction always run outside the lock. A session past its `expires_at`
/// is treated as gone by every reader, whether or not the sweeper has
/// removed it yet.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
    sweep_interval: std::time::Duration,
    clock: Arc<dyn Clock>,
}

impl SessionRegistry {
    pub fn new(ttl_secs: i64, sweep_interval_secs: u64) -> Self {
        Self::with_clock(ttl_secs, sweep_interval_secs, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl_secs: i64, sweep_interval_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_secs),
            sweep_interval: std::time::Duration::from_secs(sweep_interval_secs),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Creates a fresh pending session. Ids are UUID v4 and never reused.
    pub fn create(&self) -> Session {
        let now = self.clock.now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            expires_at: now + self.ttl,
            status: SessionStatus::Pending,
            record: None,
            delivered_at: None,
        };
        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(session.id.clone(), session.clone());
        metrics::sessions::created();
        metrics::sessions::active(sessions.len());
        info!(session_id = %session.id, "session created");
        session
    }

    /// Expiry-aware lookup that distinguishes a session that never existed
    /// from one that timed out. An expired entry is removed on the spot.
    pub fn get_checked(&self, id: &str) -> Result<Session> {
        let now = self.clock.now();
        {
            let sessions = self.sessions.read().unwrap();
            match sessions.get(id) {
                None => return Err(RelayError::SessionNotFound),
                Some(session) if session.expires_at > now => return Ok(session.clone()),
                Some(_) => {}
            }
        }
        // lazy eviction of the expired entry
        let mut sessions = self.sessions.write().unwrap();
        if sessions.remove(id).is_some() {
            metrics::sessions::expired_on_read();
            metrics::sessions::active(sessions.len());
            debug!(session_id = %id, "expired session evicted on read");
        }
        Err(RelayError::SessionExpired)
    }

    /// Lookup treating expired sessions as absent.
    pub fn get(&self, id: &str) -> Option<Session> {
        self.get_checked(id).ok()
    }

    /// Attaches an extraction result and moves the session to ready.
    ///
    /// A later successful upload replaces an already-attached record; the
    /// session stays ready. This is a deliberate policy: the operator may
    /// rescan a badly framed card within the same session.
    pub fn attach_record(&self, id: &str, record: CardRecord) -> Result<()> {
        // re-validate under the write lock so an expiry between recognition
        // and attach is still honored
        let now = self.clock.now();
        let mut sessions = self.sessions.write().unwrap();
        match sessions.get_mut(id) {
            None => Err(RelayError::SessionNotFound),
            Some(session) if session.expires_at <= now => {
                sessions.remove(id);
                Err(RelayError::SessionExpired)
            }
            Some(session) => {
                if session.status == SessionStatus::Ready {
                    info!(session_id = %id, "replacing existing record on rescan");
                }
                session.status = SessionStatus::Ready;
                session.record = Some(record);
                Ok(())
            }
        }
    }

    /// Records the first time a ready result was served to the desktop.
    /// Observability only, never a guard.
    pub fn mark_delivered(&self, id: &str) {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().unwrap();
        if let Some(session) = sessions.get_mut(id) {
            if session.status == SessionStatus::Ready && session.delivered_at.is_none() {
                session.delivered_at = Some(now);
            }
        }
    }

    /// Number of sessions that have not yet expired.
    pub fn active_count(&self) -> usize {
        let now = self.clock.now();
        let sessions = self.sessions.read().unwrap();
        sessions.values().filter(|s| s.expires_at > now).count()
    }

    /// Removes every expired session. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at > now);
        let removed = before - sessions.len();
        if removed > 0 {
            metrics::sessions::swept(removed);
            metrics::sessions::active(sessions.len());
            info!(removed, "sweep removed expired sessions");
        }
        removed
    }

    /// Runs the sweep on a fixed interval, independent of request traffic.
    /// The task lives until the returned handle is aborted or the process
    /// shuts down.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(registry.sweep_interval);
            loop {
                tick.tick().await;
                registry.sweep();
            }
        })
    }
}
