// =============================================================================
// Snapshot persistence
// =============================================================================
//
// The pipeline hands each finished snapshot to a `SnapshotSink`.  The file
// sink writes pretty JSON through a `.tmp` sibling and a rename so readers
// never see a half-written document.
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::error::PersistenceError;
use crate::snapshot::model::Snapshot;

pub trait SnapshotSink: Send + Sync {
    fn persist(&self, snapshot: &Snapshot) -> Result<(), PersistenceError>;
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the last persisted snapshot, if any.  A missing file is `None`;
    /// an unreadable or malformed one is an error.
    pub fn load(&self) -> Result<Option<Snapshot>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no persisted snapshot");
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read snapshot from {}", self.path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse snapshot from {}", self.path.display()))?;
        info!(
            path = %self.path.display(),
            taken_at = %snapshot.timestamp,
            "persisted snapshot loaded"
        );
        Ok(Some(snapshot))
    }

    /// `load`, logging and discarding a corrupt file instead of failing.
    pub fn load_or_none(&self) -> Option<Snapshot> {
        match self.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable snapshot file");
                None
            }
        }
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl SnapshotSink for JsonFileStore {
    fn persist(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let content = serde_json::to_string_pretty(snapshot)?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), cycle_id = %snapshot.cycle_id, "snapshot persisted");
        Ok(())
    }
}

/// In-memory sink for tests; can be told to fail.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySink {
    pub saved: parking_lot::Mutex<Vec<Snapshot>>,
    pub fail: bool,
}

#[cfg(test)]
impl MemorySink {
    pub fn failing() -> Self {
        Self {
            saved: Default::default(),
            fail: true,
        }
    }

    pub fn count(&self) -> usize {
        self.saved.lock().len()
    }
}

#[cfg(test)]
impl SnapshotSink for MemorySink {
    fn persist(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        if self.fail {
            return Err(PersistenceError::Io {
                path: "memory".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        self.saved.lock().push(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::model::fixtures::sample_snapshot;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sentinel-store-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn persist_then_load() {
        let dir = temp_dir();
        let store = JsonFileStore::new(dir.join("dashboard_data.json"));
        assert!(store.load().unwrap().is_none());

        let snap = sample_snapshot();
        store.persist(&snap).unwrap();
        assert!(!store.path().with_extension("json.tmp").exists());

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.cycle_id, snap.cycle_id);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn corrupt_file_is_ignored_by_load_or_none() {
        let dir = temp_dir();
        let path = dir.join("dashboard_data.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(store.load().is_err());
        assert!(store.load_or_none().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unwritable_path_is_persistence_error() {
        let store = JsonFileStore::new("/nonexistent-dir/for/sure/dashboard_data.json");
        let err = store.persist(&sample_snapshot()).unwrap_err();
        assert!(matches!(err, PersistenceError::Io { .. }));
    }
}
