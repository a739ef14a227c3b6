//! Storage collaborator
//!
//! [`AlertStore`] is the narrow contract the evaluation core needs from the
//! relational database: read readings, meters, goals and definitions; append
//! alerts, notification timestamps and run markers. [`MemoryStore`] is a
//! thread-safe implementation that the batch binary persists as a JSON
//! snapshot between runs.

pub mod memory;
pub mod snapshot;

pub use memory::MemoryStore;
pub use snapshot::StoreSnapshot;

use chrono::NaiveDateTime;

use crate::alerts::DefinitionConfig;
use crate::data::{Goal, Meter, Reading};

/// Reads and appends performed by one run.
///
/// Every call is a single statement; the core does no locking of its own.
pub trait AlertStore: Send + Sync {
    /// Readings of `meter_id` with `start <= timestamp < end`, oldest first
    fn fetch_readings(
        &self,
        meter_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Reading>, StorageError>;

    fn fetch_meter(&self, meter_id: i64) -> Result<Option<Meter>, StorageError>;

    fn fetch_goal(&self, meter_id: i64) -> Result<Option<Goal>, StorageError>;

    fn fetch_active_definitions(&self) -> Result<Vec<DefinitionConfig>, StorageError>;

    fn fetch_definition(&self, definition_id: i64) -> Result<Option<DefinitionConfig>, StorageError>;

    fn fetch_last_run_marker(&self) -> Result<Option<NaiveDateTime>, StorageError>;

    fn fetch_last_notification(
        &self,
        definition_id: i64,
        policy_id: i64,
    ) -> Result<Option<NaiveDateTime>, StorageError>;

    /// Returns the id of the new alert row
    fn append_alert(
        &self,
        definition_id: i64,
        meter_id: i64,
        data: f64,
        value: f64,
        timestamp: NaiveDateTime,
    ) -> Result<i64, StorageError>;

    fn append_notification_record(
        &self,
        definition_id: i64,
        policy_id: i64,
        timestamp: NaiveDateTime,
    ) -> Result<(), StorageError>;

    fn append_run_marker(&self, timestamp: NaiveDateTime) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Alert already recorded for definition {definition_id}, meter {meter_id} at {timestamp}")]
    Duplicate {
        definition_id: i64,
        meter_id: i64,
        timestamp: NaiveDateTime,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}
