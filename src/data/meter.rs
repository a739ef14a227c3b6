use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A physical or logical counter producing readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meter {
    pub id: i64,
    pub name: String,
    /// Raw readings are running totals and must be delta-converted
    #[serde(default)]
    pub is_counter: bool,
}

impl Meter {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_counter: false,
        }
    }

    pub fn with_counter(mut self, is_counter: bool) -> Self {
        self.is_counter = is_counter;
        self
    }
}

/// One sample for a meter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub meter_id: i64,
    pub value: f64,
    pub timestamp: NaiveDateTime,
}

impl Reading {
    pub fn new(meter_id: i64, value: f64, timestamp: NaiveDateTime) -> Self {
        Self {
            meter_id,
            value,
            timestamp,
        }
    }
}

/// Externally maintained objective for a meter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub meter_id: i64,
    pub value: f64,
    /// Unit the objective is expressed per (e.g. "YEAR"); parsed on use
    #[serde(default)]
    pub time_unit: Option<String>,
}
