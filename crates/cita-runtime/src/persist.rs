//! Snapshot persistence boundary.
//!
//! The engine persists one snapshot per thread and requires atomic
//! replace: a reader sees either the previous snapshot or the new one,
//! never a mix. Real deployments plug in a database-backed
//! [`SnapshotStore`]; [`MemorySnapshotStore`] backs tests and
//! single-process embeddings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cita_core::intent::Language;
use cita_core::messages::History;
use cita_core::session::{CollectedData, RetryCounters, Session};
use cita_core::state::State;

/// Persistence failures. The store either wrote the whole snapshot or
/// nothing.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The backing store failed.
    #[error("snapshot store failure: {0}")]
    Backend(String),
}

/// The persisted form of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Conversational state.
    pub state: State,
    /// Collected flow fields.
    pub data: CollectedData,
    /// Per-flow retry counters.
    pub retries: RetryCounters,
    /// Full message history.
    pub history: History,
    /// Detected language.
    pub language: Option<Language>,
    /// Transport hint.
    pub platform: Option<String>,
    /// Last activity instant.
    pub last_active: DateTime<Utc>,
}

impl Snapshot {
    /// Snapshot the current state of a session.
    #[must_use]
    pub fn of(session: &Session) -> Self {
        Self {
            state: session.state,
            data: session.data.clone(),
            retries: session.retries.clone(),
            history: session.history.clone(),
            language: session.language,
            platform: session.platform.clone(),
            last_active: session.last_active,
        }
    }

    /// Rehydrate a session from this snapshot.
    #[must_use]
    pub fn into_session(self, thread_id: impl Into<String>) -> Session {
        Session {
            id: thread_id.into(),
            state: self.state,
            data: self.data,
            retries: self.retries,
            history: self.history,
            language: self.language,
            platform: self.platform,
            last_active: self.last_active,
        }
    }
}

/// The persistence collaborator.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the snapshot for a thread, if one was ever stored.
    async fn load(&self, thread_id: &str) -> Result<Option<Snapshot>, PersistError>;

    /// Atomically replace the snapshot for a thread.
    async fn store(&self, thread_id: &str, snapshot: Snapshot) -> Result<(), PersistError>;

    /// Delete the snapshot for a thread (idle eviction).
    async fn delete(&self, thread_id: &str) -> Result<(), PersistError>;
}

/// In-memory snapshot store. Insertion into the concurrent map is the
/// atomic replace.
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: DashMap<String, Snapshot>,
}

impl MemorySnapshotStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self, thread_id: &str) -> Result<Option<Snapshot>, PersistError> {
        Ok(self.snapshots.get(thread_id).map(|s| s.value().clone()))
    }

    async fn store(&self, thread_id: &str, snapshot: Snapshot) -> Result<(), PersistError> {
        let _ = self.snapshots.insert(thread_id.to_owned(), snapshot);
        Ok(())
    }

    async fn delete(&self, thread_id: &str) -> Result<(), PersistError> {
        let _ = self.snapshots.remove(thread_id);
        Ok(())
    }
}
