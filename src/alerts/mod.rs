//! Alert definitions, notification throttling and the batch manager
//!
//! Definitions are loaded from storage as raw [`DefinitionConfig`] rows,
//! validated into [`AlertDefinition`]s and run by the [`AlertManager`].
//! Triggered alerts are always saved; the [`NotificationGate`] decides
//! whether a [`Mailer`] is also asked to deliver a message.

pub mod config;
pub mod definition;
pub mod gate;
pub mod manager;
pub mod notifier;

pub use config::{CalculatorConfig, DefinitionConfig, NotificationConfig};
pub use definition::{AlertDefinition, MeterOutcome, NotificationOutcome};
pub use gate::{DayMask, HourMask, NotificationGate, NotificationPeriod};
pub use manager::{AlertManager, ManagerConfig, RunReport};
pub use notifier::{AlertSummary, EmailMessage, Mailer, Notifier, NotifierError, NotifyTarget};
