//! Raw definition configuration as stored next to the alert tables
//!
//! These types carry unvalidated strings and codes exactly as they are read
//! from storage. [`AlertDefinition::from_config`](super::AlertDefinition::from_config)
//! turns them into typed evaluators and gates.

use serde::{Deserialize, Serialize};

use crate::data::DefinitionStatus;

/// One configured monitoring rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionConfig {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// LOW = 0, HIGH = 1
    #[serde(default)]
    pub level: u8,
    /// INACTIVE = 0, ACTIVE = 1, ARCHIVE = 2
    #[serde(default = "default_status")]
    pub status: u8,
    pub meter_ids: Vec<i64>,
    #[serde(default)]
    pub notification: NotificationConfig,
    pub calculator: CalculatorConfig,
}

fn default_status() -> u8 {
    DefinitionStatus::Active as u8
}

impl DefinitionConfig {
    pub fn new(id: i64, name: impl Into<String>, calculator: CalculatorConfig) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            category: String::new(),
            level: 0,
            status: default_status(),
            meter_ids: Vec::new(),
            notification: NotificationConfig::default(),
            calculator,
        }
    }

    pub fn with_meters(mut self, meter_ids: impl IntoIterator<Item = i64>) -> Self {
        self.meter_ids.extend(meter_ids);
        self
    }

    pub fn with_notification(mut self, notification: NotificationConfig) -> Self {
        self.notification = notification;
        self
    }

    pub fn with_status(mut self, status: DefinitionStatus) -> Self {
        self.status = status as u8;
        self
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    /// Raw status check used by storage filters; unknown codes are not active
    pub fn is_active(&self) -> bool {
        self.status == DefinitionStatus::Active as u8
    }
}

/// Notification policy of a definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Policy id, keys the last-notification lookup together with the definition id
    #[serde(default)]
    pub id: i64,
    /// DAY, WEEK or MONTH
    #[serde(default = "default_period_unit")]
    pub period_unit: String,
    /// Minimum number of periods between two notifications
    #[serde(default = "default_period_quantity")]
    pub period_quantity: i64,
    #[serde(default)]
    pub email: String,
    /// Day-of-week bitmask, bit 0 = Monday
    #[serde(default = "default_days")]
    pub days: u32,
    /// Hour-of-day bitmask, bit n = hour n
    #[serde(default = "default_hours")]
    pub hours: u32,
}

fn default_period_unit() -> String {
    "DAY".to_string()
}

fn default_period_quantity() -> i64 {
    1
}

fn default_days() -> u32 {
    0x7F
}

fn default_hours() -> u32 {
    0x00FF_FFFF
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            id: 0,
            period_unit: default_period_unit(),
            period_quantity: default_period_quantity(),
            email: String::new(),
            days: default_days(),
            hours: default_hours(),
        }
    }
}

/// Calculator columns of a definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorConfig {
    /// MAX, MIN or AVERAGE
    pub operator: String,
    /// SUP, INF or EQUAL
    pub comparator: String,
    /// Apply `value_number` as a tolerance percent to the comparison value
    #[serde(default)]
    pub acceptable_diff: bool,
    /// LAST_CHECK or USER_BASED
    pub data_period_type: String,
    #[serde(default)]
    pub data_period_unit: Option<String>,
    #[serde(default)]
    pub data_period_quantity: Option<i64>,
    #[serde(default)]
    pub hour_start: Option<i64>,
    #[serde(default)]
    pub hour_end: Option<i64>,
    /// USER_BASED, SIMPLE_DB_BASED or PERIOD_BASED (`_VALUE` suffix accepted)
    pub value_type: String,
    #[serde(default)]
    pub value_number: f64,
    /// LAST_YEAR or LAST_DATA_PERIOD, for PERIOD_BASED values
    #[serde(default)]
    pub value_period_type: Option<String>,
}

impl CalculatorConfig {
    /// Literal comparison over the window since the last run
    pub fn literal(operator: &str, comparator: &str, value: f64) -> Self {
        Self {
            operator: operator.to_string(),
            comparator: comparator.to_string(),
            acceptable_diff: false,
            data_period_type: "LAST_CHECK".to_string(),
            data_period_unit: None,
            data_period_quantity: None,
            hour_start: None,
            hour_end: None,
            value_type: "USER_BASED".to_string(),
            value_number: value,
            value_period_type: None,
        }
    }

    pub fn with_go_back(mut self, unit: &str, quantity: i64) -> Self {
        self.data_period_type = "USER_BASED".to_string();
        self.data_period_unit = Some(unit.to_string());
        self.data_period_quantity = Some(quantity);
        self
    }

    pub fn with_hours(mut self, start: i64, end: i64) -> Self {
        self.hour_start = Some(start);
        self.hour_end = Some(end);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_from_json_with_defaults() {
        let json = r#"{
            "id": 3,
            "name": "night consumption",
            "meter_ids": [1, 2],
            "calculator": {
                "operator": "AVERAGE",
                "comparator": "SUP",
                "acceptable_diff": true,
                "data_period_type": "USER_BASED",
                "data_period_unit": "DAY",
                "data_period_quantity": 1,
                "hour_start": 20,
                "hour_end": 8,
                "value_type": "PERIOD_BASED_VALUE",
                "value_number": 10,
                "value_period_type": "LAST_YEAR"
            }
        }"#;

        let config: DefinitionConfig = serde_json::from_str(json).unwrap();
        assert!(config.is_active());
        assert_eq!(config.notification.period_unit, "DAY");
        assert_eq!(config.notification.days, 0x7F);
        assert_eq!(config.calculator.hour_start, Some(20));
        assert_eq!(config.calculator.value_number, 10.0);
    }

    #[test]
    fn test_builder() {
        let config = DefinitionConfig::new(1, "peak", CalculatorConfig::literal("MAX", "SUP", 10.0))
            .with_meters([4, 5])
            .with_status(DefinitionStatus::Archive);
        assert_eq!(config.meter_ids, vec![4, 5]);
        assert!(!config.is_active());
        assert_eq!(config.calculator.data_period_type, "LAST_CHECK");
    }
}
