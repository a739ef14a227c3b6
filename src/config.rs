//! Runner configuration from environment variables

use std::path::PathBuf;

use chrono::Duration;

use crate::alerts::{ManagerConfig, NotifyTarget};

/// Settings of one batch invocation
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// JSON store snapshot read at start and written back at the end
    pub snapshot_path: PathBuf,
    /// Mail relay; notifications are only logged when unset
    pub webhook_url: Option<String>,
    /// Evaluate this definition only
    pub definition_id: Option<i64>,
    pub first_run_lookback_hours: i64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("meterwatch.json"),
            webhook_url: None,
            definition_id: None,
            first_run_lookback_hours: 24,
        }
    }
}

impl RunnerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparsable values fall back to the defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            snapshot_path: lookup("METERWATCH_SNAPSHOT")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_path),
            webhook_url: lookup("METERWATCH_WEBHOOK_URL").filter(|u| !u.trim().is_empty()),
            definition_id: lookup("METERWATCH_DEFINITION_ID").and_then(|id| id.trim().parse().ok()),
            first_run_lookback_hours: lookup("METERWATCH_FIRST_RUN_LOOKBACK_HOURS")
                .and_then(|h| h.trim().parse().ok())
                .filter(|h: &i64| *h > 0 && Duration::try_hours(*h).is_some())
                .unwrap_or(defaults.first_run_lookback_hours),
        }
    }

    pub fn notify_target(&self) -> NotifyTarget {
        match &self.webhook_url {
            Some(url) => NotifyTarget::Webhook {
                url: url.clone(),
                headers: Default::default(),
            },
            None => NotifyTarget::Log,
        }
    }

    /// Out-of-range lookbacks fall back to the default manager settings
    pub fn manager_config(&self) -> ManagerConfig {
        match Duration::try_hours(self.first_run_lookback_hours) {
            Some(first_run_lookback) => ManagerConfig { first_run_lookback },
            None => {
                tracing::warn!(
                    hours = self.first_run_lookback_hours,
                    "First run lookback out of range, using the default"
                );
                ManagerConfig::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::from_lookup(lookup(&[]));
        assert_eq!(config.snapshot_path, PathBuf::from("meterwatch.json"));
        assert!(matches!(config.notify_target(), NotifyTarget::Log));
        assert_eq!(config.definition_id, None);
        assert_eq!(config.manager_config().first_run_lookback, Duration::hours(24));
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = RunnerConfig::from_lookup(lookup(&[
            ("METERWATCH_SNAPSHOT", "/var/lib/meterwatch/store.json"),
            ("METERWATCH_WEBHOOK_URL", "http://relay.local/mail"),
            ("METERWATCH_DEFINITION_ID", "42"),
            ("METERWATCH_FIRST_RUN_LOOKBACK_HOURS", "-3"),
        ]));
        assert_eq!(config.snapshot_path, PathBuf::from("/var/lib/meterwatch/store.json"));
        assert!(matches!(config.notify_target(), NotifyTarget::Webhook { ref url, .. } if url == "http://relay.local/mail"));
        assert_eq!(config.definition_id, Some(42));
        assert_eq!(config.first_run_lookback_hours, 24);

        let config = RunnerConfig::from_lookup(lookup(&[("METERWATCH_DEFINITION_ID", "abc")]));
        assert_eq!(config.definition_id, None);
    }

    #[test]
    fn test_out_of_range_lookback_uses_default() {
        let max = i64::MAX.to_string();
        let config = RunnerConfig::from_lookup(lookup(&[("METERWATCH_FIRST_RUN_LOOKBACK_HOURS", max.as_str())]));
        assert_eq!(config.first_run_lookback_hours, 24);
        assert_eq!(config.manager_config().first_run_lookback, Duration::hours(24));

        let config = RunnerConfig {
            first_run_lookback_hours: i64::MAX,
            ..RunnerConfig::default()
        };
        assert_eq!(config.manager_config().first_run_lookback, Duration::hours(24));

        let config = RunnerConfig::from_lookup(lookup(&[("METERWATCH_FIRST_RUN_LOOKBACK_HOURS", "72")]));
        assert_eq!(config.manager_config().first_run_lookback, Duration::hours(72));
    }
}
