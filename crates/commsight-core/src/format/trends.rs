//! Time-series helpers that need no model

use super::types::{DataPoint, Granularity, TrendDirection};

const HOUR_SECS: i64 = 3600;
const DAY_SECS: i64 = 24 * HOUR_SECS;

/// Half-over-half change beyond this percentage counts as a trend
pub const STABLE_THRESHOLD_PERCENT: f64 = 5.0;

/// Granularity from the gap between the first two points.
///
/// Under a day is hourly, exactly a day is daily, then weekly up to 7
/// days, monthly up to 31, quarterly beyond. Fewer than two points are
/// treated as daily.
pub fn detect_granularity(points: &[DataPoint]) -> Granularity {
    let [first, second, ..] = points else {
        return Granularity::Daily;
    };
    let gap = (second.timestamp - first.timestamp).num_seconds().abs();

    if gap < DAY_SECS {
        Granularity::Hourly
    } else if gap == DAY_SECS {
        Granularity::Daily
    } else if gap <= 7 * DAY_SECS {
        Granularity::Weekly
    } else if gap <= 31 * DAY_SECS {
        Granularity::Monthly
    } else {
        Granularity::Quarterly
    }
}

/// Percentage change from the first half's mean to the second half's
pub fn half_over_half_change(points: &[DataPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let mid = points.len() / 2;
    let first = mean(&points[..mid]);
    let second = mean(&points[mid..]);

    if first == 0.0 {
        return if second > 0.0 {
            100.0
        } else if second < 0.0 {
            -100.0
        } else {
            0.0
        };
    }
    (second - first) / first.abs() * 100.0
}

pub fn direction_for_change(change_percent: f64) -> TrendDirection {
    if change_percent > STABLE_THRESHOLD_PERCENT {
        TrendDirection::Increasing
    } else if change_percent < -STABLE_THRESHOLD_PERCENT {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

fn mean(points: &[DataPoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    points.iter().map(|p| p.value).sum::<f64>() / points.len() as f64
}

/// Points more than two standard deviations from the mean
pub fn outliers(points: &[DataPoint]) -> Vec<&DataPoint> {
    if points.len() < 3 {
        return Vec::new();
    }
    let avg = mean(points);
    let variance =
        points.iter().map(|p| (p.value - avg).powi(2)).sum::<f64>() / points.len() as f64;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return Vec::new();
    }
    points
        .iter()
        .filter(|p| (p.value - avg).abs() > 2.0 * std_dev)
        .collect()
}
