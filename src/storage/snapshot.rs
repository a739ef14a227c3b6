//! JSON snapshot of a [`MemoryStore`](super::MemoryStore) for the batch binary

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::StorageError;
use crate::alerts::DefinitionConfig;
use crate::data::{AlertRecord, Goal, Meter, NotificationRecord, Reading, RunMarker};

/// Everything a run reads or appends
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Schema version for compatibility
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub meters: Vec<Meter>,
    #[serde(default)]
    pub readings: Vec<Reading>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub definitions: Vec<DefinitionConfig>,
    #[serde(default)]
    pub alerts: Vec<AlertRecord>,
    #[serde(default)]
    pub notifications: Vec<NotificationRecord>,
    #[serde(default)]
    pub run_markers: Vec<RunMarker>,
}

fn default_schema_version() -> u32 {
    StoreSnapshot::SCHEMA_VERSION
}

impl StoreSnapshot {
    pub const SCHEMA_VERSION: u32 = 1;

    /// Load a snapshot, or an empty one if the file does not exist yet
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        if !path.exists() {
            return Ok(Self {
                schema_version: Self::SCHEMA_VERSION,
                ..Self::default()
            });
        }

        let bytes = std::fs::read(path)?;
        let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::Deserialization(e.to_string()))?;

        if snapshot.schema_version > Self::SCHEMA_VERSION {
            return Err(StorageError::Deserialization(format!(
                "unsupported schema version {} (max {})",
                snapshot.schema_version,
                Self::SCHEMA_VERSION
            )));
        }

        Ok(snapshot)
    }

    /// Write through a temporary file and rename over the target
    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
