//! Flat-file storage of the world snapshot.
//!
//! The whole id → record mapping is written as one JSON document on every
//! save. Writes go to a sibling temporary file which is then renamed over the
//! target, so a crash mid-write leaves the previous snapshot intact.
//!
//! Every save is stamped with a generation when it is requested. A write
//! whose generation is older than the one already on disk is skipped, so
//! background saves that finish out of order never roll the file back.

use log::{debug, error, info, warn};
use shared::{PlayerRecord, SessionId};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

pub type Snapshot = HashMap<SessionId, PlayerRecord>;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct Persistence {
    path: PathBuf,
    next_generation: AtomicU64,
    /// Generation of the snapshot currently on disk
    written: Mutex<u64>,
}

impl Persistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            next_generation: AtomicU64::new(1),
            written: Mutex::new(0),
        }
    }

    /// Reads the stored snapshot. Missing or unreadable files give an empty
    /// world.
    pub async fn load(&self) -> Snapshot {
        match self.try_load().await {
            Ok(snapshot) => {
                info!(
                    "Loaded {} player(s) from {}",
                    snapshot.len(),
                    self.path.display()
                );
                snapshot
            }
            Err(PersistenceError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                info!("No world file at {}, starting empty", self.path.display());
                Snapshot::new()
            }
            Err(e) => {
                warn!("Ignoring stored world, starting empty: {}", e);
                Snapshot::new()
            }
        }
    }

    pub async fn try_load(&self) -> Result<Snapshot, PersistenceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Writes `snapshot`, replacing whatever was stored before.
    ///
    /// The snapshot is stamped as the newest one requested so far and the
    /// call waits for the write to land.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let generation = self.stamp();
        self.write(generation, snapshot).await.map(|_| ())
    }

    /// Saves on a background task. Failures are logged and dropped.
    ///
    /// The generation is taken before this returns, so callers that hand over
    /// snapshots in order get them written in order even when the spawned
    /// tasks are scheduled differently.
    pub fn save_in_background(self: &Arc<Self>, snapshot: Snapshot) {
        let generation = self.stamp();
        let persistence = Arc::clone(self);
        tokio::spawn(async move {
            match persistence.write(generation, &snapshot).await {
                Ok(true) => info!(
                    "Saved {} player(s) to {}",
                    snapshot.len(),
                    persistence.path.display()
                ),
                Ok(false) => debug!("Skipped stale save #{}", generation),
                Err(e) => error!("Failed to save world: {}", e),
            }
        });
    }

    fn stamp(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst)
    }

    /// Writes `snapshot` unless a newer generation is already on disk.
    /// Returns whether the file was written.
    async fn write(&self, generation: u64, snapshot: &Snapshot) -> Result<bool, PersistenceError> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        let tmp_path = self.tmp_path();

        let mut written = self.written.lock().await;
        if *written > generation {
            return Ok(false);
        }
        tokio::fs::write(&tmp_path, &json)
            .await
            .map_err(|source| self.io_error(source))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        *written = generation;
        Ok(true)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
