//! Comparison-value strategies

use std::str::FromStr;

use super::operator::Operator;
use super::resolver::aggregate_over;
use super::samples::HourWindow;
use super::EvalContext;
use crate::error::AlertError;
use crate::period::{go_past, Period, PeriodSpec, PeriodUnit};

/// Where a period-aggregate value window sits relative to the data window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuePeriod {
    /// The data window shifted one year back
    LastYear,
    /// The window of equal extent that ends where the data window starts
    LastDataPeriod,
}

impl FromStr for ValuePeriod {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LAST_YEAR" => Ok(ValuePeriod::LastYear),
            "LAST_DATA_PERIOD" => Ok(ValuePeriod::LastDataPeriod),
            _ => Err(AlertError::enumeration(
                "value period type",
                s,
                "LAST_YEAR, LAST_DATA_PERIOD",
            )),
        }
    }
}

/// How the comparison value is obtained
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueSpec {
    Literal(f64),
    Goal,
    PeriodAggregate(ValuePeriod),
}

impl ValueSpec {
    pub const NAMES: &'static str = "USER_BASED, SIMPLE_DB_BASED, PERIOD_BASED";

    pub fn from_parts(value_type: &str, value_number: f64, value_period: Option<&str>) -> Result<Self, AlertError> {
        let normalized = value_type.trim().to_ascii_uppercase();
        let kind = normalized.strip_suffix("_VALUE").unwrap_or(&normalized);
        match kind {
            "USER_BASED" => Ok(ValueSpec::Literal(value_number)),
            "SIMPLE_DB_BASED" => Ok(ValueSpec::Goal),
            "PERIOD_BASED" => {
                let period = value_period
                    .ok_or_else(|| AlertError::config("value_period_type", "missing for PERIOD_BASED value"))?
                    .parse::<ValuePeriod>()?;
                Ok(ValueSpec::PeriodAggregate(period))
            }
            _ => Err(AlertError::enumeration("value type", value_type, Self::NAMES)),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, ValueSpec::Literal(_))
    }

    /// Build the resolver for this spec; period aggregates reuse the data
    /// side's operator, window spec and hour filter.
    pub fn into_resolver(
        self,
        operator: Operator,
        data_period: PeriodSpec,
        hours: Option<HourWindow>,
    ) -> Box<dyn ValueResolver> {
        match self {
            ValueSpec::Literal(value) => Box::new(LiteralValue(value)),
            ValueSpec::Goal => Box::new(GoalValue),
            ValueSpec::PeriodAggregate(anchor) => Box::new(PeriodAggregateValue {
                anchor,
                operator,
                data_period,
                hours,
            }),
        }
    }
}

/// Resolves the value the observed data is compared against
pub trait ValueResolver: Send + Sync {
    fn resolve(&self, ctx: &EvalContext<'_>, meter_id: i64, data_period: &Period) -> Result<f64, AlertError>;
}

/// User supplied constant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiteralValue(pub f64);

impl ValueResolver for LiteralValue {
    fn resolve(&self, _ctx: &EvalContext<'_>, _meter_id: i64, _data_period: &Period) -> Result<f64, AlertError> {
        Ok(self.0)
    }
}

/// Stored objective of the meter, normalized per hour when it carries a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalValue;

impl ValueResolver for GoalValue {
    fn resolve(&self, ctx: &EvalContext<'_>, meter_id: i64, _data_period: &Period) -> Result<f64, AlertError> {
        let goal = ctx
            .store
            .fetch_goal(meter_id)?
            .ok_or_else(|| AlertError::NoDataFound(format!("meter {} has no goal", meter_id)))?;

        match goal.time_unit.as_deref() {
            Some(unit) => {
                let unit = unit.parse::<PeriodUnit>()?;
                Ok(goal.value / f64::from(unit.hours()))
            }
            None => Ok(goal.value),
        }
    }
}

/// Aggregate of the same meter over a historical window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodAggregateValue {
    anchor: ValuePeriod,
    operator: Operator,
    data_period: PeriodSpec,
    hours: Option<HourWindow>,
}

impl PeriodAggregateValue {
    pub fn new(anchor: ValuePeriod, operator: Operator, data_period: PeriodSpec) -> Self {
        Self {
            anchor,
            operator,
            data_period,
            hours: None,
        }
    }

    pub fn with_hours(mut self, hours: Option<HourWindow>) -> Self {
        self.hours = hours;
        self
    }

    pub fn value_period(&self, data_period: &Period) -> Result<Period, AlertError> {
        match self.anchor {
            ValuePeriod::LastYear => Period::new(
                go_past(data_period.start(), PeriodUnit::Year, 1)?,
                go_past(data_period.end(), PeriodUnit::Year, 1)?,
            ),
            ValuePeriod::LastDataPeriod => {
                let end = data_period.start();
                let start = match self.data_period {
                    PeriodSpec::GoBack { unit, quantity } => go_past(end, unit, quantity)?,
                    PeriodSpec::LastCheck => end
                        .checked_sub_signed(data_period.duration())
                        .ok_or_else(|| AlertError::config("period", "previous window is out of calendar range"))?,
                };
                Period::new(start, end)
            }
        }
    }
}

impl ValueResolver for PeriodAggregateValue {
    fn resolve(&self, ctx: &EvalContext<'_>, meter_id: i64, data_period: &Period) -> Result<f64, AlertError> {
        let period = self.value_period(data_period)?;
        aggregate_over(ctx.store, meter_id, &period, self.operator, self.hours)
    }
}
