//! Screening criterion: "doubled off a recent low".
//!
//! A series passes when its all-time high is at least twice its all-time low
//! and that low was set within the most recent `low_window` observations.

use chrono::{DateTime, Utc};

use crate::domain::PriceSeries;

/// High/low summary of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceExtremes {
    pub high: f64,
    pub low: f64,
    /// Timestamp of the first (earliest) observation equal to `low`.
    pub time_of_low: DateTime<Utc>,
    pub index_of_low: usize,
}

/// Compute the high, the low and where the low occurred. `None` for an empty series.
pub fn price_extremes(series: &PriceSeries) -> Option<PriceExtremes> {
    let points = series.points();
    let first = points.first()?;

    let mut extremes = PriceExtremes {
        high: first.close,
        low: first.close,
        time_of_low: first.timestamp,
        index_of_low: 0,
    };

    for (i, point) in points.iter().enumerate().skip(1) {
        if point.close > extremes.high {
            extremes.high = point.close;
        }
        // Strict: a repeated low keeps the earlier timestamp.
        if point.close < extremes.low {
            extremes.low = point.close;
            extremes.time_of_low = point.timestamp;
            extremes.index_of_low = i;
        }
    }

    Some(extremes)
}

/// Evaluate the criterion over `series` with the given low-period window.
///
/// Returns `false` for an empty series and for any series with fewer than
/// `low_window` observations (including `low_window == 0`).
pub fn evaluate(series: &PriceSeries, low_window: usize) -> bool {
    if series.is_empty() {
        return false;
    }

    let len = series.len();
    if low_window == 0 || len < low_window {
        return false;
    }

    let Some(extremes) = price_extremes(series) else {
        return false;
    };

    let window_start = series.points()[len - low_window].timestamp;

    extremes.high >= extremes.low * 2.0 && extremes.time_of_low >= window_start
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PricePoint, Symbol};
    use chrono::{Duration, TimeZone};

    fn series_from(closes: &[f64]) -> PriceSeries {
        let base = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint::new(base + Duration::days(i as i64), c))
            .collect();
        PriceSeries::new(Symbol::parse("TEST").unwrap(), points)
    }

    #[test]
    fn empty_series_fails() {
        let series = PriceSeries::empty(Symbol::parse("TEST").unwrap());
        assert!(!evaluate(&series, 1));
        assert!(!evaluate(&series, 30));
        assert!(price_extremes(&series).is_none());
    }

    #[test]
    fn shorter_than_window_fails() {
        // Would pass with window 3, but only has 3 points for window 4.
        let series = series_from(&[4.0, 3.0, 1.0]);
        assert!(evaluate(&series, 3));
        assert!(!evaluate(&series, 4));
    }

    #[test]
    fn zero_window_fails() {
        let series = series_from(&[4.0, 1.0]);
        assert!(!evaluate(&series, 0));
    }

    #[test]
    fn recent_low_with_double_high_passes() {
        let series = series_from(&[5.0, 4.0, 3.0, 2.0, 1.0]);
        assert!(evaluate(&series, 2));
    }

    #[test]
    fn high_not_double_fails() {
        let series = series_from(&[1.9, 1.5, 1.0]);
        assert!(!evaluate(&series, 3));
    }

    #[test]
    fn exactly_double_passes() {
        let series = series_from(&[2.0, 1.5, 1.0]);
        assert!(evaluate(&series, 1));
    }

    #[test]
    fn low_outside_window_fails() {
        let series = series_from(&[1.0, 5.0, 4.0, 3.0]);
        assert!(!evaluate(&series, 3));
        assert!(evaluate(&series, 4));
    }

    #[test]
    fn window_boundary_is_inclusive() {
        // Low at index 2, window of 3 over 5 points starts at index 2.
        let series = series_from(&[5.0, 4.0, 1.0, 2.0, 3.0]);
        assert!(evaluate(&series, 3));
        assert!(!evaluate(&series, 2));
    }

    #[test]
    fn tie_break_uses_earliest_low() {
        // Low of 1.0 at index 1 and index 4: the earlier one is outside a
        // window of 2, so the series fails even though a later 1.0 is inside.
        let series = series_from(&[5.0, 1.0, 3.0, 4.0, 1.0]);
        let extremes = price_extremes(&series).unwrap();
        assert_eq!(extremes.index_of_low, 1);
        assert_eq!(extremes.time_of_low, series.points()[1].timestamp);
        assert!(!evaluate(&series, 2));
        assert!(evaluate(&series, 4));
    }

    #[test]
    fn zero_low_is_trivially_doubled() {
        let series = series_from(&[0.5, 0.0]);
        assert!(evaluate(&series, 1));
    }

    #[test]
    fn single_point_series() {
        // high == low; passes only when low is 0.
        assert!(!evaluate(&series_from(&[1.0]), 1));
        assert!(evaluate(&series_from(&[0.0]), 1));
    }
}
