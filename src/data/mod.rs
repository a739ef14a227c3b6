//! Meter-side entities read by the evaluation core and rows appended by it

pub mod meter;
pub mod record;

pub use meter::{Goal, Meter, Reading};
pub use record::{AlertRecord, DefinitionStatus, Level, NotificationRecord, RunMarker};
