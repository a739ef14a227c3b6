//! Alert calculation: observed data vs comparison value
//!
//! The observed side ([`DataResolver`]) aggregates a meter's readings over
//! the watching window. The comparison side is one of three
//! [`ValueResolver`] strategies selected by [`ValueSpec`]. The
//! [`AlertEvaluator`] ties both together with a [`Comparator`].

pub mod comparator;
pub mod evaluator;
pub mod operator;
pub mod resolver;
pub mod samples;
pub mod value;

pub use comparator::{Comparator, Predicate};
pub use evaluator::{AlertEvaluator, Evaluation};
pub use operator::{Aggregator, Operator};
pub use resolver::DataResolver;
pub use samples::{collect_samples, HourWindow};
pub use value::{GoalValue, LiteralValue, PeriodAggregateValue, ValuePeriod, ValueResolver, ValueSpec};

use crate::period::PeriodResolver;
use crate::storage::AlertStore;

/// Everything a resolver needs for one run
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub store: &'a dyn AlertStore,
    pub periods: PeriodResolver,
}

impl<'a> EvalContext<'a> {
    pub fn new(store: &'a dyn AlertStore, periods: PeriodResolver) -> Self {
        Self { store, periods }
    }
}
