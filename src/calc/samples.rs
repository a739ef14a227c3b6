use chrono::{NaiveDateTime, Timelike};

use crate::data::Reading;
use crate::error::AlertError;

/// Hour-of-day filter `[start, end)` with wraparound past midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourWindow {
    start: u32,
    end: u32,
}

impl HourWindow {
    pub fn new(start: u32, end: u32) -> Result<Self, AlertError> {
        if start > 23 {
            return Err(AlertError::config("hour_start", format!("{} is not an hour of day", start)));
        }
        if end > 23 {
            return Err(AlertError::config("hour_end", format!("{} is not an hour of day", end)));
        }
        Ok(Self { start, end })
    }

    /// Both bounds set, or neither
    pub fn from_parts(start: Option<i64>, end: Option<i64>) -> Result<Option<Self>, AlertError> {
        match (start, end) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => {
                let start = u32::try_from(start)
                    .map_err(|_| AlertError::config("hour_start", format!("{} is not an hour of day", start)))?;
                let end = u32::try_from(end)
                    .map_err(|_| AlertError::config("hour_end", format!("{} is not an hour of day", end)))?;
                Self::new(start, end).map(Some)
            }
            (Some(_), None) => Err(AlertError::config("hour_end", "missing while hour_start is set")),
            (None, Some(_)) => Err(AlertError::config("hour_start", "missing while hour_end is set")),
        }
    }

    pub fn contains(&self, hour: u32) -> bool {
        if self.start == self.end {
            true
        } else if self.start < self.end {
            self.start <= hour && hour < self.end
        } else {
            hour >= self.start || hour < self.end
        }
    }
}

/// Turns raw readings into the sequence fed to an aggregator.
///
/// Counter readings become consecutive deltas (the first reading is the
/// baseline); each delta keeps the timestamp of the later reading. The hour
/// filter runs after the conversion.
pub fn collect_samples(readings: &[Reading], is_counter: bool, hours: Option<HourWindow>) -> Vec<f64> {
    let points: Vec<(NaiveDateTime, f64)> = if is_counter {
        readings
            .windows(2)
            .map(|pair| (pair[1].timestamp, pair[1].value - pair[0].value))
            .collect()
    } else {
        readings.iter().map(|r| (r.timestamp, r.value)).collect()
    };

    points
        .into_iter()
        .filter(|(ts, _)| hours.map_or(true, |w| w.contains(ts.hour())))
        .map(|(_, value)| value)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn reading(value: f64, hour: u32) -> Reading {
        let ts = NaiveDate::from_ymd_opt(2019, 7, 29)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        Reading::new(1, value, ts)
    }

    #[test]
    fn test_counter_deltas() {
        let readings: Vec<Reading> = [10.0, 13.0, 19.0, 20.0, 24.0]
            .iter()
            .enumerate()
            .map(|(i, v)| reading(*v, i as u32))
            .collect();
        assert_eq!(collect_samples(&readings, true, None), vec![3.0, 6.0, 1.0, 4.0]);
        assert_eq!(
            collect_samples(&readings, false, None),
            vec![10.0, 13.0, 19.0, 20.0, 24.0]
        );
    }

    #[test]
    fn test_single_counter_reading_is_only_a_baseline() {
        assert!(collect_samples(&[reading(42.0, 3)], true, None).is_empty());
    }

    #[test]
    fn test_hour_window_wraparound() {
        let night = HourWindow::new(20, 8).unwrap();
        assert!(night.contains(22));
        assert!(night.contains(20));
        assert!(night.contains(0));
        assert!(night.contains(7));
        assert!(!night.contains(8));
        assert!(!night.contains(10));

        let day = HourWindow::new(8, 20).unwrap();
        assert!(day.contains(10));
        assert!(!day.contains(22));
        assert!(!day.contains(20));

        let all = HourWindow::new(5, 5).unwrap();
        assert!((0..24).all(|h| all.contains(h)));
    }

    #[test]
    fn test_filter_applies_after_delta() {
        let readings = vec![reading(10.0, 19), reading(15.0, 21), reading(30.0, 22), reading(31.0, 10)];
        let night = HourWindow::new(20, 8).unwrap();
        assert_eq!(collect_samples(&readings, false, Some(night)), vec![15.0, 30.0]);
        assert_eq!(collect_samples(&readings, true, Some(night)), vec![5.0, 15.0]);
    }

    #[test]
    fn test_hour_window_from_parts() {
        assert_eq!(HourWindow::from_parts(None, None).unwrap(), None);
        assert!(HourWindow::from_parts(Some(20), Some(8)).unwrap().is_some());
        assert_eq!(HourWindow::from_parts(Some(20), None).unwrap_err().kind(), "config");
        assert_eq!(HourWindow::from_parts(Some(24), Some(8)).unwrap_err().kind(), "config");
        assert_eq!(HourWindow::from_parts(Some(-1), Some(8)).unwrap_err().kind(), "config");
    }
}
