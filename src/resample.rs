// src/resample.rs

use crate::model::{max_into, SeriesRows};
use chrono::{DateTime, Duration, NaiveTime, Utc};

/// Floor a timestamp to its UTC calendar day, the left edge of the fixed
/// 24-hour bins used throughout.
pub(crate) fn day_floor(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Collapse a series to at most one sample per UTC calendar day, labeled by
/// that day's midnight. Each day's value is the per-field maximum of the
/// day's samples; days without samples produce no row. Maximum-within-bin is
/// a deliberate lossy simplification that is valid for both cumulative
/// counters and already-windowed rates. It is not a sum.
pub fn resample_to_daily(rows: &SeriesRows) -> SeriesRows {
    let mut out = SeriesRows::new();
    for (ts, values) in rows {
        out.entry(day_floor(*ts))
            .and_modify(|acc| max_into(acc, values))
            .or_insert_with(|| values.clone());
    }
    out
}

/// Reduce a series to a bounded number of points for storage and plotting.
///
/// Bin width is `ceil(span_hours / target_max_points)` hours, and bins are
/// anchored so the most recent input timestamp is the right edge (and label)
/// of the last bin. Anchoring to the newest sample keeps the final plotted
/// point from appearing to lie in the future. Bins reduce by per-field
/// maximum; empty bins are dropped. The output holds at most
/// `target_max_points + 1` rows (edge rounding can add one).
pub fn downsample_to_bounded_points(rows: &SeriesRows, target_max_points: usize) -> SeriesRows {
    let target = target_max_points.max(1);
    if rows.len() <= target {
        return rows.clone();
    }
    // At least two rows from here on.
    let (Some((&first, _)), Some((&last, _))) = (rows.iter().next(), rows.iter().next_back())
    else {
        return rows.clone();
    };

    let span_hours = (last - first).num_seconds() as f64 / 3600.0;
    let width_hours = (span_hours / target as f64).ceil().max(1.0) as i64;
    let width_secs = Duration::hours(width_hours).num_seconds();

    let mut out = SeriesRows::new();
    for (ts, values) in rows {
        // Bin k covers (last - (k+1)*w, last - k*w], labeled by its right
        // edge, so the newest sample lands exactly on the last label.
        let k = (last - *ts).num_seconds() / width_secs;
        let label = last - Duration::seconds(k * width_secs);
        out.entry(label)
            .and_modify(|acc| max_into(acc, values))
            .or_insert_with(|| values.clone());
    }
    out
}
