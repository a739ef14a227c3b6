//! Period arithmetic: calendar go-back per unit and window resolution
//!
//! A definition describes its watching window either relative to the last
//! completed run (`LAST_CHECK`) or as a go-back of N units from the run's
//! anchor (`USER_BASED`). Month and year go-backs clamp the day of month so
//! that e.g. March 30th minus one month lands on the last day of February.

pub mod resolver;
pub mod unit;

pub use resolver::{Period, PeriodMode, PeriodResolver, PeriodSpec};
pub use unit::{go_past, GoBack, PeriodUnit};
