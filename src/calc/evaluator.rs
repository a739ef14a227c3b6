//! Per-meter alert decision

use super::comparator::Comparator;
use super::resolver::DataResolver;
use super::value::{ValueResolver, ValueSpec};
use super::EvalContext;
use crate::error::AlertError;

/// Result of one evaluation, kept for persistence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub data: f64,
    pub value: f64,
    pub is_alert: bool,
}

/// Combines the data side, the value side and a comparator
pub struct AlertEvaluator {
    data: DataResolver,
    value: Box<dyn ValueResolver>,
    comparator: Comparator,
    /// Percent applied to the comparison value when acceptable difference is on
    tolerance: Option<f64>,
    last: Option<Evaluation>,
}

impl AlertEvaluator {
    /// Tolerance together with a literal value is rejected: the literal
    /// column doubles as the tolerance percent.
    pub fn new(
        data: DataResolver,
        value: ValueSpec,
        comparator: Comparator,
        tolerance: Option<f64>,
    ) -> Result<Self, AlertError> {
        if tolerance.is_some() && value.is_literal() {
            return Err(AlertError::config(
                "acceptable_diff",
                "cannot be combined with a USER_BASED value",
            ));
        }

        Ok(Self {
            value: value.into_resolver(data.operator(), data.period_spec(), data.hours()),
            data,
            comparator,
            tolerance,
            last: None,
        })
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    pub fn data_resolver(&self) -> &DataResolver {
        &self.data
    }

    /// Resolve data and value for `meter_id` and compare them.
    ///
    /// `NoDataFound` from either side is returned as-is so the caller can
    /// skip the meter.
    pub fn evaluate(&mut self, ctx: &EvalContext<'_>, meter_id: i64) -> Result<Evaluation, AlertError> {
        self.last = None;

        let period = self.data.resolve_period(ctx)?;
        let data = self.data.resolve(ctx, meter_id, &period)?;
        let raw_value = self.value.resolve(ctx, meter_id, &period)?;

        let value = match self.tolerance {
            Some(percent) => self.comparator.adjust(raw_value, percent),
            None => raw_value,
        };

        let evaluation = Evaluation {
            data,
            value,
            is_alert: self.comparator.compare(data, value),
        };
        self.last = Some(evaluation);
        Ok(evaluation)
    }

    pub fn last(&self) -> Option<Evaluation> {
        self.last
    }

    pub fn last_data(&self) -> Option<f64> {
        self.last.map(|e| e.data)
    }

    pub fn last_value(&self) -> Option<f64> {
        self.last.map(|e| e.value)
    }
}

impl std::fmt::Debug for AlertEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertEvaluator")
            .field("data", &self.data)
            .field("comparator", &self.comparator)
            .field("tolerance", &self.tolerance)
            .field("last", &self.last)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::Operator;
    use crate::data::{Goal, Meter, Reading};
    use crate::period::{PeriodResolver, PeriodSpec};
    use crate::storage::MemoryStore;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 7, 29)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_meter(Meter::new(1, "meter_1"));
        let readings = [3.0, 2.0, 5.0, 1.0, 4.0]
            .iter()
            .enumerate()
            .map(|(i, v)| Reading::new(1, *v, now() - Duration::hours(5 - i as i64)))
            .collect();
        store.insert_readings(readings);
        store
    }

    fn evaluate(store: &MemoryStore, evaluator: &mut AlertEvaluator) -> Result<Evaluation, AlertError> {
        let ctx = EvalContext::new(store, PeriodResolver::new(now(), now() - Duration::days(1)));
        evaluator.evaluate(&ctx, 1)
    }

    fn max_last_check() -> DataResolver {
        DataResolver::new(Operator::Max, PeriodSpec::LastCheck)
    }

    #[test]
    fn test_literal_equal_triggers() {
        let store = seeded_store();
        let mut evaluator =
            AlertEvaluator::new(max_last_check(), ValueSpec::Literal(5.0), Comparator::Equal, None).unwrap();

        let evaluation = evaluate(&store, &mut evaluator).unwrap();
        assert!(evaluation.is_alert);
        assert_eq!(evaluator.last_data(), Some(5.0));
        assert_eq!(evaluator.last_value(), Some(5.0));
    }

    #[test]
    fn test_literal_sup_does_not_trigger() {
        let store = seeded_store();
        let mut evaluator =
            AlertEvaluator::new(max_last_check(), ValueSpec::Literal(10.0), Comparator::Sup, None).unwrap();

        let evaluation = evaluate(&store, &mut evaluator).unwrap();
        assert!(!evaluation.is_alert);
        assert_eq!(evaluation.value, 10.0);
    }

    #[test]
    fn test_tolerance_moves_goal() {
        let store = seeded_store();
        store.insert_goal(Goal {
            meter_id: 1,
            value: 4.8,
            time_unit: None,
        });

        // 5 > 4.8 but not > 4.8 * 1.10
        let mut strict =
            AlertEvaluator::new(max_last_check(), ValueSpec::Goal, Comparator::Sup, None).unwrap();
        assert!(evaluate(&store, &mut strict).unwrap().is_alert);

        let mut tolerant =
            AlertEvaluator::new(max_last_check(), ValueSpec::Goal, Comparator::Sup, Some(10.0)).unwrap();
        let evaluation = evaluate(&store, &mut tolerant).unwrap();
        assert!(!evaluation.is_alert);
        assert!((evaluation.value - 5.28).abs() < 1e-9);
    }

    #[test]
    fn test_tolerance_with_literal_is_rejected() {
        let err = AlertEvaluator::new(max_last_check(), ValueSpec::Literal(5.0), Comparator::Sup, Some(10.0))
            .unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_no_data_clears_last() {
        let store = seeded_store();
        let mut evaluator =
            AlertEvaluator::new(max_last_check(), ValueSpec::Goal, Comparator::Sup, None).unwrap();

        // data resolves but the goal is missing
        let err = evaluate(&store, &mut evaluator).unwrap_err();
        assert_eq!(err.kind(), "no_data");
        assert_eq!(evaluator.last(), None);
    }
}
