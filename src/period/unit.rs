use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::AlertError;

/// Unit of a period specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PeriodUnit {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl PeriodUnit {
    pub const NAMES: &'static str = "HOUR, DAY, WEEK, MONTH, YEAR";

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodUnit::Hour => "HOUR",
            PeriodUnit::Day => "DAY",
            PeriodUnit::Week => "WEEK",
            PeriodUnit::Month => "MONTH",
            PeriodUnit::Year => "YEAR",
        }
    }

    /// Hour-count conversion factor used to normalize objectives
    pub fn hours(&self) -> u32 {
        match self {
            PeriodUnit::Hour => 1,
            PeriodUnit::Day => 24,
            PeriodUnit::Week => 168,
            PeriodUnit::Month => 720,
            PeriodUnit::Year => 8760,
        }
    }

    /// Go-back implementation registered for this unit
    pub fn go_back(&self) -> &'static dyn GoBack {
        match self {
            PeriodUnit::Hour => &HOURS,
            PeriodUnit::Day => &DAYS,
            PeriodUnit::Week => &WEEKS,
            PeriodUnit::Month => &MONTHS,
            PeriodUnit::Year => &YEARS,
        }
    }
}

impl fmt::Display for PeriodUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodUnit {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HOUR" => Ok(PeriodUnit::Hour),
            "DAY" => Ok(PeriodUnit::Day),
            "WEEK" => Ok(PeriodUnit::Week),
            "MONTH" => Ok(PeriodUnit::Month),
            "YEAR" => Ok(PeriodUnit::Year),
            _ => Err(AlertError::enumeration("period unit", s, Self::NAMES)),
        }
    }
}

/// Moves an anchor back in time by a number of units.
///
/// Returns `None` when the result falls outside the representable calendar.
pub trait GoBack: Send + Sync {
    fn go_back(&self, anchor: NaiveDateTime, quantity: u32) -> Option<NaiveDateTime>;
}

/// Wall-clock subtraction of a fixed number of hours per unit
struct FixedStep {
    hours_per_unit: i64,
}

impl GoBack for FixedStep {
    fn go_back(&self, anchor: NaiveDateTime, quantity: u32) -> Option<NaiveDateTime> {
        let hours = self.hours_per_unit.checked_mul(i64::from(quantity))?;
        anchor.checked_sub_signed(Duration::try_hours(hours)?)
    }
}

struct CalendarMonths;

impl GoBack for CalendarMonths {
    fn go_back(&self, anchor: NaiveDateTime, quantity: u32) -> Option<NaiveDateTime> {
        let mut year = anchor.year();
        let mut quantity = i32::try_from(quantity).ok()?;
        if quantity >= 12 {
            year -= quantity / 12;
            quantity %= 12;
        }

        let mut month = anchor.month() as i32 - quantity;
        if month < 1 {
            year -= 1;
            month += 12;
        }

        let date = clamped_date(year, month as u32, anchor.day())?;
        Some(date.and_time(anchor.time()))
    }
}

struct CalendarYears;

impl GoBack for CalendarYears {
    fn go_back(&self, anchor: NaiveDateTime, quantity: u32) -> Option<NaiveDateTime> {
        let year = anchor.year().checked_sub(i32::try_from(quantity).ok()?)?;
        let date = clamped_date(year, anchor.month(), anchor.day())?;
        Some(date.and_time(anchor.time()))
    }
}

static HOURS: FixedStep = FixedStep { hours_per_unit: 1 };
static DAYS: FixedStep = FixedStep { hours_per_unit: 24 };
static WEEKS: FixedStep = FixedStep { hours_per_unit: 24 * 7 };
static MONTHS: CalendarMonths = CalendarMonths;
static YEARS: CalendarYears = CalendarYears;

fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .map(|d| d.day())
}

/// Date with the day clamped to the last day of the target month
fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let last = last_day_of_month(year, month)?;
    NaiveDate::from_ymd_opt(year, month, day.min(last))
}

/// Start of a window that ends at `anchor` and spans `quantity` units
pub fn go_past(anchor: NaiveDateTime, unit: PeriodUnit, quantity: u32) -> Result<NaiveDateTime, AlertError> {
    unit.go_back().go_back(anchor, quantity).ok_or_else(|| {
        AlertError::config(
            "period_quantity",
            format!("{} {} before {} is out of calendar range", quantity, unit, anchor),
        )
    })
}
