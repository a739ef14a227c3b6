use std::fmt;
use std::str::FromStr;

use crate::error::AlertError;

/// Binary predicate over (data, value) with its tolerance transform
pub trait Predicate: Send + Sync {
    fn holds(&self, data: f64, value: f64) -> bool;

    /// Moves `value` by `percent` in the direction that widens the
    /// acceptable range
    fn adjust(&self, value: f64, percent: f64) -> f64;
}

struct Greater;

impl Predicate for Greater {
    fn holds(&self, data: f64, value: f64) -> bool {
        data > value
    }

    fn adjust(&self, value: f64, percent: f64) -> f64 {
        value * (1.0 + percent / 100.0)
    }
}

struct Lower;

impl Predicate for Lower {
    fn holds(&self, data: f64, value: f64) -> bool {
        data < value
    }

    fn adjust(&self, value: f64, percent: f64) -> f64 {
        value * (1.0 - percent / 100.0)
    }
}

struct Equal;

impl Predicate for Equal {
    fn holds(&self, data: f64, value: f64) -> bool {
        data == value
    }

    fn adjust(&self, value: f64, _percent: f64) -> f64 {
        value
    }
}

static SUP: Greater = Greater;
static INF: Lower = Lower;
static EQUAL: Equal = Equal;

/// Comparator of a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Sup,
    Inf,
    Equal,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Sup => "SUP",
            Comparator::Inf => "INF",
            Comparator::Equal => "EQUAL",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Sup => ">",
            Comparator::Inf => "<",
            Comparator::Equal => "==",
        }
    }

    pub fn predicate(&self) -> &'static dyn Predicate {
        match self {
            Comparator::Sup => &SUP,
            Comparator::Inf => &INF,
            Comparator::Equal => &EQUAL,
        }
    }

    pub fn compare(&self, data: f64, value: f64) -> bool {
        self.predicate().holds(data, value)
    }

    pub fn adjust(&self, value: f64, percent: f64) -> f64 {
        self.predicate().adjust(value, percent)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparator {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUP" => Ok(Comparator::Sup),
            "INF" => Ok(Comparator::Inf),
            "EQUAL" => Ok(Comparator::Equal),
            _ => Err(AlertError::enumeration("comparator", s, "SUP, INF, EQUAL")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare() {
        assert!(Comparator::Sup.compare(11.0, 10.0));
        assert!(!Comparator::Sup.compare(10.0, 10.0));
        assert!(Comparator::Inf.compare(9.0, 10.0));
        assert!(!Comparator::Inf.compare(10.0, 10.0));
        assert!(Comparator::Equal.compare(5.0, 5.0));
        assert!(!Comparator::Equal.compare(5.0, 5.5));
    }

    #[test]
    fn test_tolerance_adjust() {
        assert!((Comparator::Sup.adjust(100.0, 10.0) - 110.0).abs() < 1e-9);
        assert!((Comparator::Inf.adjust(100.0, 10.0) - 90.0).abs() < 1e-9);
        assert_eq!(Comparator::Equal.adjust(100.0, 10.0), 100.0);
    }

    #[test]
    fn test_parse_comparator() {
        assert_eq!("SUP".parse::<Comparator>().unwrap(), Comparator::Sup);
        assert_eq!("equal".parse::<Comparator>().unwrap(), Comparator::Equal);
        assert_eq!("GTE".parse::<Comparator>().unwrap_err().kind(), "enum");
    }
}
