//! Notification throttling
//!
//! A triggered alert is always saved; whether it is also mailed depends on
//! the definition's notification policy: the current weekday and hour must be
//! in the allow-lists, and enough whole periods must have elapsed since the
//! last notification of the same (definition, policy) pair.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};

use super::config::NotificationConfig;
use crate::error::AlertError;
use crate::storage::AlertStore;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

static EMAIL_REGEX: OnceLock<Result<regex::Regex, regex::Error>> = OnceLock::new();

/// Compiled once per process
fn email_regex() -> Result<&'static regex::Regex, AlertError> {
    EMAIL_REGEX
        .get_or_init(|| regex::Regex::new(EMAIL_PATTERN))
        .as_ref()
        .map_err(|e| AlertError::config("email", e.to_string()))
}

/// Allowed days of the week, bit 0 = Monday
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayMask(u8);

impl DayMask {
    pub const NONE: DayMask = DayMask(0);
    pub const MONDAY: DayMask = DayMask(1 << 0);
    pub const TUESDAY: DayMask = DayMask(1 << 1);
    pub const WEDNESDAY: DayMask = DayMask(1 << 2);
    pub const THURSDAY: DayMask = DayMask(1 << 3);
    pub const FRIDAY: DayMask = DayMask(1 << 4);
    pub const SATURDAY: DayMask = DayMask(1 << 5);
    pub const SUNDAY: DayMask = DayMask(1 << 6);
    pub const ALL: DayMask = DayMask(0x7F);

    const NAMES: [&'static str; 7] = [
        "MONDAY",
        "TUESDAY",
        "WEDNESDAY",
        "THURSDAY",
        "FRIDAY",
        "SATURDAY",
        "SUNDAY",
    ];

    /// Keep the 7 low bits; anything above is dropped with a warning
    pub fn from_bits(bits: u32) -> Self {
        if bits & !0x7F != 0 {
            tracing::warn!(bits = bits, "Day mask has bits outside Monday..Sunday, ignoring them");
        }
        DayMask((bits & 0x7F) as u8)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn weekday(day: Weekday) -> Self {
        DayMask(1 << day.num_days_from_monday())
    }

    pub fn by_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        Self::NAMES
            .iter()
            .position(|n| *n == upper)
            .map(|i| DayMask(1 << i))
    }

    /// Unknown names are skipped with a warning and grant nothing
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        names.into_iter().fold(DayMask::NONE, |mask, name| match Self::by_name(name) {
            Some(day) => mask | day,
            None => {
                tracing::warn!(day = %name, "Unknown day name in notification policy");
                mask
            }
        })
    }

    pub fn contains(&self, other: DayMask) -> bool {
        !other.is_empty() && self.0 & other.0 == other.0
    }

    pub fn allows(&self, day: Weekday) -> bool {
        self.contains(Self::weekday(day))
    }

    /// Membership by day name; an unknown name fails closed
    pub fn allows_name(&self, name: &str) -> bool {
        match Self::by_name(name) {
            Some(day) => self.contains(day),
            None => {
                tracing::warn!(day = %name, "Unknown day name, not allowed");
                false
            }
        }
    }
}

impl std::ops::BitOr for DayMask {
    type Output = DayMask;

    fn bitor(self, rhs: DayMask) -> DayMask {
        DayMask(self.0 | rhs.0)
    }
}

/// Allowed hours of the day, bit n = hour n
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HourMask(u32);

impl HourMask {
    pub const NONE: HourMask = HourMask(0);
    pub const ALL: HourMask = HourMask(0x00FF_FFFF);

    /// Single-hour mask; hours past 23 give the empty mask
    pub const fn hour(hour: u32) -> Self {
        if hour < 24 {
            HourMask(1 << hour)
        } else {
            HourMask(0)
        }
    }

    pub fn from_bits(bits: u32) -> Self {
        if bits & !Self::ALL.0 != 0 {
            tracing::warn!(bits = bits, "Hour mask has bits outside H_0..H_23, ignoring them");
        }
        HourMask(bits & Self::ALL.0)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// `H_0` .. `H_23`
    pub fn by_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        upper
            .strip_prefix("H_")
            .and_then(|n| n.parse::<u32>().ok())
            .filter(|h| *h < 24)
            .map(Self::hour)
    }

    pub fn from_hours(hours: impl IntoIterator<Item = u32>) -> Self {
        hours.into_iter().fold(HourMask::NONE, |mask, hour| {
            if hour >= 24 {
                tracing::warn!(hour = hour, "Hour outside 0..23 in notification policy");
            }
            mask | Self::hour(hour)
        })
    }

    pub fn contains(&self, other: HourMask) -> bool {
        !other.is_empty() && self.0 & other.0 == other.0
    }

    pub fn allows(&self, hour: u32) -> bool {
        self.contains(Self::hour(hour))
    }

    /// Membership by hour name; an unknown name fails closed
    pub fn allows_name(&self, name: &str) -> bool {
        match Self::by_name(name) {
            Some(hour) => self.contains(hour),
            None => {
                tracing::warn!(hour = %name, "Unknown hour name, not allowed");
                false
            }
        }
    }
}

impl std::ops::BitOr for HourMask {
    type Output = HourMask;

    fn bitor(self, rhs: HourMask) -> HourMask {
        HourMask(self.0 | rhs.0)
    }
}

/// Throttle period of a notification policy, valued in days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPeriod {
    Day = 1,
    Week = 7,
    Month = 30,
}

impl NotificationPeriod {
    pub fn days(&self) -> i64 {
        *self as i64
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationPeriod::Day => "DAY",
            NotificationPeriod::Week => "WEEK",
            NotificationPeriod::Month => "MONTH",
        }
    }
}

impl fmt::Display for NotificationPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationPeriod {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAY" => Ok(NotificationPeriod::Day),
            "WEEK" => Ok(NotificationPeriod::Week),
            "MONTH" => Ok(NotificationPeriod::Month),
            _ => Err(AlertError::enumeration("notification period", s, "DAY, WEEK, MONTH")),
        }
    }
}

/// Decides whether a triggered alert may be mailed at a given time
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationGate {
    policy_id: i64,
    email: String,
    days: DayMask,
    hours: HourMask,
    period: NotificationPeriod,
    quantity: u32,
}

impl NotificationGate {
    pub fn new(policy_id: i64, email: impl Into<String>, period: NotificationPeriod, quantity: u32) -> Self {
        Self {
            policy_id,
            email: email.into(),
            days: DayMask::ALL,
            hours: HourMask::ALL,
            period,
            quantity,
        }
    }

    pub fn with_days(mut self, days: DayMask) -> Self {
        self.days = days;
        self
    }

    pub fn with_hours(mut self, hours: HourMask) -> Self {
        self.hours = hours;
        self
    }

    pub fn from_config(config: &NotificationConfig) -> Result<Self, AlertError> {
        let period = config.period_unit.parse::<NotificationPeriod>()?;
        let quantity = u32::try_from(config.period_quantity).map_err(|_| {
            AlertError::config(
                "period_quantity",
                format!("must be a non-negative count, got {}", config.period_quantity),
            )
        })?;

        let email = config.email.trim();
        if !email.is_empty() {
            if !email_regex()?.is_match(email) {
                return Err(AlertError::config("email", format!("'{}' is not an email address", email)));
            }
        }

        Ok(Self::new(config.id, email, period, quantity)
            .with_days(DayMask::from_bits(config.days))
            .with_hours(HourMask::from_bits(config.hours)))
    }

    pub fn policy_id(&self) -> i64 {
        self.policy_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn days(&self) -> DayMask {
        self.days
    }

    pub fn hours(&self) -> HourMask {
        self.hours
    }

    pub fn is_allowed_day(&self, now: NaiveDateTime) -> bool {
        self.days.allows(now.weekday())
    }

    pub fn is_allowed_hour(&self, now: NaiveDateTime) -> bool {
        self.hours.allows(now.hour())
    }

    /// Whole periods since `last` must reach the configured quantity
    pub fn enough_elapsed(&self, last: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
        match last {
            None => true,
            Some(last) => {
                let periods = (now - last).num_days().div_euclid(self.period.days());
                periods >= i64::from(self.quantity)
            }
        }
    }

    /// Day and hour are checked first; the last notification is only looked
    /// up when both allow sending.
    pub fn is_allowed(
        &self,
        store: &dyn AlertStore,
        definition_id: i64,
        now: NaiveDateTime,
    ) -> Result<bool, AlertError> {
        if !self.is_allowed_day(now) || !self.is_allowed_hour(now) {
            return Ok(false);
        }

        let last = store.fetch_last_notification(definition_id, self.policy_id)?;
        Ok(self.enough_elapsed(last, now))
    }
}
