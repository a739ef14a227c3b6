//! Observed-data side of an evaluation

use super::operator::Operator;
use super::samples::{collect_samples, HourWindow};
use super::EvalContext;
use crate::error::AlertError;
use crate::period::{Period, PeriodSpec};
use crate::storage::AlertStore;

/// Aggregates a meter's readings over the definition's watching window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataResolver {
    operator: Operator,
    period: PeriodSpec,
    hours: Option<HourWindow>,
}

impl DataResolver {
    pub fn new(operator: Operator, period: PeriodSpec) -> Self {
        Self {
            operator,
            period,
            hours: None,
        }
    }

    pub fn with_hours(mut self, hours: Option<HourWindow>) -> Self {
        self.hours = hours;
        self
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn period_spec(&self) -> PeriodSpec {
        self.period
    }

    pub fn hours(&self) -> Option<HourWindow> {
        self.hours
    }

    pub fn resolve_period(&self, ctx: &EvalContext<'_>) -> Result<Period, AlertError> {
        ctx.periods.resolve(&self.period)
    }

    pub fn resolve(&self, ctx: &EvalContext<'_>, meter_id: i64, period: &Period) -> Result<f64, AlertError> {
        aggregate_over(ctx.store, meter_id, period, self.operator, self.hours)
    }
}

/// Fetch, convert, filter and aggregate one meter over `period`
pub(crate) fn aggregate_over(
    store: &dyn AlertStore,
    meter_id: i64,
    period: &Period,
    operator: Operator,
    hours: Option<HourWindow>,
) -> Result<f64, AlertError> {
    let meter = store
        .fetch_meter(meter_id)?
        .ok_or_else(|| AlertError::NoDataFound(format!("meter {} is unknown", meter_id)))?;

    let readings = store.fetch_readings(meter_id, period.start(), period.end())?;
    let samples = collect_samples(&readings, meter.is_counter, hours);

    operator.apply(&samples).ok_or_else(|| {
        AlertError::NoDataFound(format!(
            "meter {} has no {} samples in [{}, {})",
            meter_id,
            operator,
            period.start(),
            period.end()
        ))
    })
}
