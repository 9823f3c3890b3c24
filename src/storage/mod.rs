//! Persistence boundary for the session snapshot.
//!
//! Backends store one named, versioned record. The payload is the MessagePack
//! encoding of [`SessionSnapshot`] with named fields, so a record written by an
//! older schema decodes with only the newly added keys defaulted.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::Result;
use crate::model::SessionSnapshot;

mod seaorm_store;

pub use seaorm_store::SeaOrmStorage;

/// Schema version written with every snapshot.
///
/// Version 0 lacks `lastActivityTimestamp`. Its tokens and identity are kept
/// on migration, but with no activity on record the session counts as idle,
/// so an upgraded version-0 session always ends in a fresh sign-in.
pub const SNAPSHOT_VERSION: i32 = 1;

/// Device-local storage for the persisted session subset.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Loads the stored snapshot, migrating it if it was written by another
    /// schema version.
    async fn load(&self) -> Result<Option<SessionSnapshot>>;

    /// Replaces the stored snapshot.
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<()>;

    /// Removes the stored snapshot entirely. Called in place of saving an
    /// empty snapshot.
    async fn clear(&self) -> Result<()>;
}

/// Encodes a snapshot at the current schema version.
pub(crate) fn encode_snapshot(snapshot: &SessionSnapshot) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(snapshot)?)
}

/// Decodes a stored payload, returning whether it needs to be rewritten at
/// [`SNAPSHOT_VERSION`].
pub(crate) fn decode_snapshot(version: i32, data: &[u8]) -> Result<(SessionSnapshot, bool)> {
    let snapshot: SessionSnapshot = rmp_serde::from_slice(data)?;

    if version == SNAPSHOT_VERSION {
        return Ok((snapshot, false));
    }

    if version > SNAPSHOT_VERSION {
        warn!(
            stored = version,
            current = SNAPSHOT_VERSION,
            "session snapshot written by a newer schema, unknown keys dropped"
        );
    } else {
        info!(
            from = version,
            to = SNAPSHOT_VERSION,
            "migrating session snapshot"
        );
    }
    Ok((snapshot, true))
}

/// Volatile storage backend, used in tests and for clients that should not
/// remember sessions across restarts.
///
/// Clones share the same underlying record.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    record: Arc<Mutex<Option<(i32, Vec<u8>)>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with a raw record, as if written by another version.
    pub fn with_raw(version: i32, data: Vec<u8>) -> Self {
        Self {
            record: Arc::new(Mutex::new(Some((version, data)))),
        }
    }

    /// Schema version of the stored record, if any.
    pub fn stored_version(&self) -> Option<i32> {
        self.lock().as_ref().map(|(version, _)| *version)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<(i32, Vec<u8>)>> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn load(&self) -> Result<Option<SessionSnapshot>> {
        let mut record = self.lock();
        let Some((version, data)) = record.as_ref() else {
            return Ok(None);
        };

        let (snapshot, migrated) = decode_snapshot(*version, data)?;
        if migrated {
            *record = Some((SNAPSHOT_VERSION, encode_snapshot(&snapshot)?));
        }
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let data = encode_snapshot(snapshot)?;
        *self.lock() = Some((SNAPSHOT_VERSION, data));
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.lock() = None;
        Ok(())
    }
}
