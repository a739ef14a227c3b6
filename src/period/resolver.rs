use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};

use super::unit::{go_past, PeriodUnit};
use crate::error::AlertError;

/// How the watching window of a definition is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodMode {
    LastCheck,
    UserBased,
}

impl FromStr for PeriodMode {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LAST_CHECK" => Ok(PeriodMode::LastCheck),
            "USER_BASED" => Ok(PeriodMode::UserBased),
            _ => Err(AlertError::enumeration(
                "period mode",
                s,
                "LAST_CHECK, USER_BASED",
            )),
        }
    }
}

/// Unresolved period configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodSpec {
    /// `[last run, now]`
    LastCheck,
    /// `[now - quantity units, now]`
    GoBack { unit: PeriodUnit, quantity: u32 },
}

impl PeriodSpec {
    /// Build a spec from the raw configuration columns
    pub fn from_parts(
        mode: &str,
        unit: Option<&str>,
        quantity: Option<i64>,
    ) -> Result<Self, AlertError> {
        match mode.parse::<PeriodMode>()? {
            PeriodMode::LastCheck => Ok(PeriodSpec::LastCheck),
            PeriodMode::UserBased => {
                let unit = unit
                    .ok_or_else(|| AlertError::config("data_period_unit", "missing for USER_BASED period"))?
                    .parse::<PeriodUnit>()?;
                let quantity = match quantity {
                    Some(q) if q > 0 => u32::try_from(q)
                        .map_err(|_| AlertError::config("data_period_quantity", format!("{} is too large", q)))?,
                    Some(q) => {
                        return Err(AlertError::config(
                            "data_period_quantity",
                            format!("must be positive, got {}", q),
                        ))
                    }
                    None => {
                        return Err(AlertError::config(
                            "data_period_quantity",
                            "missing for USER_BASED period",
                        ))
                    }
                };
                Ok(PeriodSpec::GoBack { unit, quantity })
            }
        }
    }
}

/// A concrete `[start, end)` window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl Period {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, AlertError> {
        if start > end {
            return Err(AlertError::config(
                "period",
                format!("start {} is after end {}", start, end),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        self.start <= timestamp && timestamp < self.end
    }
}

/// Resolves period specs against the anchors of one run
#[derive(Debug, Clone, Copy)]
pub struct PeriodResolver {
    now: NaiveDateTime,
    last_check: NaiveDateTime,
}

impl PeriodResolver {
    pub fn new(now: NaiveDateTime, last_check: NaiveDateTime) -> Self {
        Self { now, last_check }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn last_check(&self) -> NaiveDateTime {
        self.last_check
    }

    pub fn resolve(&self, spec: &PeriodSpec) -> Result<Period, AlertError> {
        match *spec {
            PeriodSpec::LastCheck => Period::new(self.last_check, self.now),
            PeriodSpec::GoBack { unit, quantity } => {
                Period::new(go_past(self.now, unit, quantity)?, self.now)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_last_check_window() {
        let resolver = PeriodResolver::new(at(2019, 7, 29, 12), at(2019, 7, 28, 12));
        let period = resolver.resolve(&PeriodSpec::LastCheck).unwrap();
        assert_eq!(period.start(), at(2019, 7, 28, 12));
        assert_eq!(period.end(), at(2019, 7, 29, 12));
        assert_eq!(period.duration(), Duration::hours(24));
    }

    #[test]
    fn test_user_based_window() {
        let resolver = PeriodResolver::new(at(2012, 3, 30, 0), at(2012, 3, 29, 0));
        let spec = PeriodSpec::GoBack {
            unit: PeriodUnit::Month,
            quantity: 1,
        };
        let period = resolver.resolve(&spec).unwrap();
        assert_eq!(period.start(), at(2012, 2, 29, 0));
        assert_eq!(period.end(), at(2012, 3, 30, 0));
    }

    #[test]
    fn test_last_check_after_now_is_rejected() {
        let resolver = PeriodResolver::new(at(2019, 7, 28, 0), at(2019, 7, 29, 0));
        let err = resolver.resolve(&PeriodSpec::LastCheck).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_period_contains_is_half_open() {
        let period = Period::new(at(2019, 7, 28, 0), at(2019, 7, 29, 0)).unwrap();
        assert!(period.contains(at(2019, 7, 28, 0)));
        assert!(period.contains(at(2019, 7, 28, 23)));
        assert!(!period.contains(at(2019, 7, 29, 0)));
    }

    #[test]
    fn test_spec_from_parts() {
        assert_eq!(
            PeriodSpec::from_parts("LAST_CHECK", None, None).unwrap(),
            PeriodSpec::LastCheck
        );
        assert_eq!(
            PeriodSpec::from_parts("USER_BASED", Some("WEEK"), Some(2)).unwrap(),
            PeriodSpec::GoBack {
                unit: PeriodUnit::Week,
                quantity: 2
            }
        );

        let err = PeriodSpec::from_parts("USER_BASED", Some("DAY"), Some(0)).unwrap_err();
        assert_eq!(err.kind(), "config");
        let err = PeriodSpec::from_parts("USER_BASED", Some("DAY"), Some(-3)).unwrap_err();
        assert_eq!(err.kind(), "config");
        let err = PeriodSpec::from_parts("USER_BASED", Some("DAY"), None).unwrap_err();
        assert_eq!(err.kind(), "config");
        let err = PeriodSpec::from_parts("USER_BASED", Some("DECADE"), Some(1)).unwrap_err();
        assert_eq!(err.kind(), "enum");
        let err = PeriodSpec::from_parts("SOMETIMES", None, None).unwrap_err();
        assert_eq!(err.kind(), "enum");
    }
}
