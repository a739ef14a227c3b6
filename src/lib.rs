//! Meterwatch: batch alert evaluation over meter readings
//!
//! Each run loads the active alert definitions, aggregates every target
//! meter's readings over the definition's watching window, compares the
//! result to a literal, a stored goal or a historical aggregate, saves the
//! alerts that hold and mails them subject to a day/hour/elapsed-time
//! notification policy.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use meterwatch::alerts::{AlertManager, CalculatorConfig, DefinitionConfig, Notifier};
//! use meterwatch::data::{Meter, Reading};
//! use meterwatch::storage::MemoryStore;
//!
//! # async fn run() -> Result<(), meterwatch::AlertError> {
//! let now = chrono::Local::now().naive_local();
//! let store = Arc::new(MemoryStore::new());
//! store.insert_meter(Meter::new(1, "main board"));
//! store.insert_readings(vec![Reading::new(1, 12.0, now - chrono::Duration::hours(1))]);
//! store.insert_definition(
//!     DefinitionConfig::new(1, "peak power", CalculatorConfig::literal("MAX", "SUP", 10.0))
//!         .with_meters([1]),
//! );
//!
//! let manager = AlertManager::new(store.clone(), Arc::new(Notifier::log()));
//! let report = manager.run(now).await?;
//! println!("{} alerts saved", report.alerts_saved);
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod calc;
pub mod config;
pub mod data;
pub mod error;
pub mod period;
pub mod storage;

pub use alerts::{AlertManager, RunReport};
pub use config::RunnerConfig;
pub use error::AlertError;
pub use storage::{AlertStore, MemoryStore, StorageError};
