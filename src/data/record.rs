use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::AlertError;

/// A persisted occurrence of a triggered definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: i64,
    pub definition_id: i64,
    pub meter_id: i64,
    pub data: f64,
    pub value: f64,
    pub status: u8,
    pub created_at: NaiveDateTime,
}

/// Timestamp of a successful notification for a (definition, policy) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub definition_id: i64,
    pub policy_id: i64,
    pub sent_at: NaiveDateTime,
}

/// Anchor of a completed manager run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMarker {
    pub launched_at: NaiveDateTime,
}

/// Severity of a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Low = 0,
    High = 1,
}

impl Level {
    pub fn from_code(code: u8) -> Result<Self, AlertError> {
        match code {
            0 => Ok(Level::Low),
            1 => Ok(Level::High),
            _ => Err(AlertError::enumeration("level", code.to_string(), "0 (LOW), 1 (HIGH)")),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "LOW",
            Level::High => "HIGH",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle flag of a definition; only `Active` ones are evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionStatus {
    Inactive = 0,
    Active = 1,
    Archive = 2,
}

impl DefinitionStatus {
    pub fn from_code(code: u8) -> Result<Self, AlertError> {
        match code {
            0 => Ok(DefinitionStatus::Inactive),
            1 => Ok(DefinitionStatus::Active),
            2 => Ok(DefinitionStatus::Archive),
            _ => Err(AlertError::enumeration(
                "status",
                code.to_string(),
                "0 (INACTIVE), 1 (ACTIVE), 2 (ARCHIVE)",
            )),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, DefinitionStatus::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_and_status_codes() {
        assert_eq!(Level::from_code(1).unwrap(), Level::High);
        assert_eq!(Level::High.to_string(), "HIGH");
        assert!(Level::from_code(2).is_err());

        assert!(DefinitionStatus::from_code(1).unwrap().is_active());
        assert!(!DefinitionStatus::from_code(2).unwrap().is_active());
        assert_eq!(DefinitionStatus::from_code(9).unwrap_err().kind(), "enum");
    }
}
