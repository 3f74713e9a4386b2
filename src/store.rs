//! Snapshot persistence.
//!
//! The whole factory (platform config plus every group) is stored as one
//! CBOR file. Saves write a sibling temp file and rename it over the
//! target, so a crash never leaves a half-written snapshot.

use crate::factory::PlatformConfig;
use crate::group::GroupState;
use crate::serialization::{from_cbor, to_cbor, SerializationError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Persisted factory state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorySnapshot {
    #[serde(default)]
    pub platform: Option<PlatformConfig>,
    #[serde(default)]
    pub groups: Vec<GroupState>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt snapshot {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: SerializationError,
    },
}

/// File-backed snapshot store.
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, or an empty one if the file does not exist yet.
    pub fn load(&self) -> Result<FactorySnapshot, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(FactorySnapshot::default())
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        from_cbor(&bytes).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, snapshot: &FactorySnapshot) -> Result<(), StoreError> {
        let bytes = to_cbor(snapshot).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("cbor.tmp");
        std::fs::write(&tmp, bytes).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        tracing::debug!(path = %self.path.display(), groups = snapshot.groups.len(), "snapshot saved");
        Ok(())
    }
}
