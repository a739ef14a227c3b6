use std::fmt;
use std::str::FromStr;

use crate::error::AlertError;

/// Reduces a sequence of readings to one scalar.
///
/// Returns `None` for an empty sequence; callers turn that into
/// `NoDataFound` rather than inventing a zero.
pub trait Aggregator: Send + Sync {
    fn aggregate(&self, values: &[f64]) -> Option<f64>;
}

struct MaxAggregator;

impl Aggregator for MaxAggregator {
    fn aggregate(&self, values: &[f64]) -> Option<f64> {
        values.iter().copied().reduce(f64::max)
    }
}

struct MinAggregator;

impl Aggregator for MinAggregator {
    fn aggregate(&self, values: &[f64]) -> Option<f64> {
        values.iter().copied().reduce(f64::min)
    }
}

struct AverageAggregator;

impl Aggregator for AverageAggregator {
    fn aggregate(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

static MAX: MaxAggregator = MaxAggregator;
static MIN: MinAggregator = MinAggregator;
static AVERAGE: AverageAggregator = AverageAggregator;

/// Aggregation operator of a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Max,
    Min,
    Average,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Max => "MAX",
            Operator::Min => "MIN",
            Operator::Average => "AVERAGE",
        }
    }

    pub fn aggregator(&self) -> &'static dyn Aggregator {
        match self {
            Operator::Max => &MAX,
            Operator::Min => &MIN,
            Operator::Average => &AVERAGE,
        }
    }

    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        self.aggregator().aggregate(values)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MAX" => Ok(Operator::Max),
            "MIN" => Ok(Operator::Min),
            "AVERAGE" => Ok(Operator::Average),
            _ => Err(AlertError::enumeration("operator", s, "MAX, MIN, AVERAGE")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: [f64; 6] = [3.0, 5.0, 10.0, 25.0, 36.0, 174.0];

    #[test]
    fn test_max_min_average() {
        assert_eq!(Operator::Max.apply(&SAMPLE), Some(174.0));
        assert_eq!(Operator::Min.apply(&SAMPLE), Some(3.0));

        let avg = Operator::Average.apply(&SAMPLE).unwrap();
        assert!((avg - 42.166_666).abs() < 1e-5);
    }

    #[test]
    fn test_empty_sequence_has_no_result() {
        assert_eq!(Operator::Max.apply(&[]), None);
        assert_eq!(Operator::Min.apply(&[]), None);
        assert_eq!(Operator::Average.apply(&[]), None);
    }

    #[test]
    fn test_parse_operator() {
        assert_eq!("MAX".parse::<Operator>().unwrap(), Operator::Max);
        assert_eq!("average".parse::<Operator>().unwrap(), Operator::Average);
        assert_eq!("MEDIAN".parse::<Operator>().unwrap_err().kind(), "enum");
    }
}
