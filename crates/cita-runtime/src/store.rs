//! Session store: identity resolution, per-session turn serialization,
//! committed snapshots, and idle eviction.
//!
//! Many sessions are processed concurrently, but a single session's turns
//! are strictly serialized: [`SessionStore::begin_turn`] hands out at most
//! one [`TurnGuard`] per thread id at a time and rejects the rest with
//! `SessionBusy`. Maps are sharded (`DashMap`), so a slow operation on one
//! session never blocks another.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use metrics::gauge;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use cita_core::session::Session;

use crate::errors::RuntimeError;
use crate::persist::{Snapshot, SnapshotStore};

/// External session id mapped to an internal thread, with the last time
/// the external id was seen (drives identity reaping).
#[derive(Debug, Clone)]
struct IdentityEntry {
    thread_id: String,
    last_seen: DateTime<Utc>,
}

/// RAII guard marking a thread's turn as in flight.
///
/// Dropped when the turn finishes (committed or not), releasing the
/// thread for the next turn.
#[derive(Debug)]
pub struct TurnGuard {
    active: Arc<DashMap<String, ()>>,
    thread_id: String,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        let _ = self.active.remove(&self.thread_id);
        gauge!("turns_active").set(self.active.len() as f64);
    }
}

/// The session store.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    identities: DashMap<String, IdentityEntry>,
    active_turns: Arc<DashMap<String, ()>>,
    persist: Arc<dyn SnapshotStore>,
    commit_timeout: Duration,
}

impl SessionStore {
    /// Store backed by the given snapshot persistence.
    #[must_use]
    pub fn new(persist: Arc<dyn SnapshotStore>, commit_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            identities: DashMap::new(),
            active_turns: Arc::new(DashMap::new()),
            persist,
            commit_timeout,
        }
    }

    /// Resolve an external session id to an internal thread id, creating
    /// the mapping lazily on first use.
    pub fn resolve(&self, external_id: &str) -> String {
        let mut entry = self
            .identities
            .entry(external_id.to_owned())
            .or_insert_with(|| {
                let thread_id = format!("thr_{}", Uuid::now_v7().simple());
                debug!(external_id, thread_id, "new identity mapping");
                IdentityEntry {
                    thread_id,
                    last_seen: Utc::now(),
                }
            });
        entry.last_seen = Utc::now();
        entry.thread_id.clone()
    }

    /// Claim the thread for a turn. At most one guard exists per thread
    /// at any time; a second claim fails with `SessionBusy`.
    pub fn begin_turn(&self, thread_id: &str) -> Result<TurnGuard, RuntimeError> {
        match self.active_turns.entry(thread_id.to_owned()) {
            Entry::Occupied(_) => Err(RuntimeError::SessionBusy(thread_id.to_owned())),
            Entry::Vacant(slot) => {
                let _ = slot.insert(());
                gauge!("turns_active").set(self.active_turns.len() as f64);
                Ok(TurnGuard {
                    active: Arc::clone(&self.active_turns),
                    thread_id: thread_id.to_owned(),
                })
            }
        }
    }

    /// Whether a turn is currently in flight for the thread.
    #[must_use]
    pub fn is_busy(&self, thread_id: &str) -> bool {
        self.active_turns.contains_key(thread_id)
    }

    /// Committed session for a thread.
    ///
    /// Falls back to the snapshot store on a cold map (process restart);
    /// a thread with no snapshot anywhere is `SessionNotFound`.
    pub async fn get(&self, thread_id: &str) -> Result<Session, RuntimeError> {
        if let Some(session) = self.sessions.get(thread_id) {
            return Ok(session.clone());
        }
        let snapshot = self
            .persist
            .load(thread_id)
            .await
            .map_err(|e| RuntimeError::Persistence(e.to_string()))?;
        match snapshot {
            Some(snapshot) => {
                let session = snapshot.into_session(thread_id);
                let _ = self.sessions.insert(thread_id.to_owned(), session.clone());
                Ok(session)
            }
            None => Err(RuntimeError::SessionNotFound(thread_id.to_owned())),
        }
    }

    /// Create a fresh session for a thread.
    pub fn create(&self, thread_id: &str) -> Session {
        info!(thread_id, "creating session");
        let session = Session::new(thread_id);
        let _ = self.sessions.insert(thread_id.to_owned(), session.clone());
        gauge!("sessions_live").set(self.sessions.len() as f64);
        session
    }

    /// Committed session, or a fresh one on first contact.
    pub async fn get_or_create(&self, thread_id: &str) -> Result<Session, RuntimeError> {
        match self.get(thread_id).await {
            Ok(session) => Ok(session),
            Err(RuntimeError::SessionNotFound(_)) => Ok(self.create(thread_id)),
            Err(err) => Err(err),
        }
    }

    /// Commit a turn's updated session atomically.
    ///
    /// The snapshot is persisted first (with a timeout), then the live map
    /// is replaced; on any failure nothing is visible to the next turn.
    #[instrument(skip_all, fields(thread_id = %session.id))]
    pub async fn commit(&self, mut session: Session) -> Result<(), RuntimeError> {
        session.touch();
        let snapshot = Snapshot::of(&session);
        let persisted = tokio::time::timeout(
            self.commit_timeout,
            self.persist.store(&session.id, snapshot),
        )
        .await;
        match persisted {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(RuntimeError::Persistence(e.to_string())),
            Err(_) => {
                warn!(timeout_ms = self.commit_timeout.as_millis() as u64, "commit timed out");
                return Err(RuntimeError::Persistence("commit timed out".into()));
            }
        }
        let _ = self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    /// Evict sessions idle longer than `max_idle` and reap identity
    /// mappings not seen in as long. Sessions with a turn in flight are
    /// skipped. Returns how many sessions were evicted.
    pub async fn evict_idle_older_than(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(max_idle).unwrap_or_else(|_| chrono::Duration::hours(48));

        let stale: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.last_active < cutoff && !self.is_busy(&entry.id))
            .map(|entry| entry.id.clone())
            .collect();

        for thread_id in &stale {
            let _ = self.sessions.remove(thread_id);
            if let Err(e) = self.persist.delete(thread_id).await {
                warn!(thread_id, error = %e, "failed to delete evicted snapshot");
            }
        }
        self.identities.retain(|_, entry| entry.last_seen >= cutoff);

        if !stale.is_empty() {
            info!(evicted = stale.len(), "idle sweep");
        }
        gauge!("sessions_live").set(self.sessions.len() as f64);
        stale.len()
    }

    /// Number of live (in-memory) sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
