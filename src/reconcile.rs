// src/reconcile.rs

use crate::error::{Result, TrafficError};
use crate::model::{max_into, AggregateSeries, Fragment, SeriesRows};

/// Merge time series fragments, plus an optional previously persisted
/// aggregate, into one deduplicated series.
///
/// The upstream source reports a rolling 14-day window whose boundary
/// samples are truncated depending on the exact capture instant: a later
/// capture can show a smaller value for a calendar date that an earlier
/// capture had mid-window. No interior observation ever overestimates, so
/// for every timestamp the component-wise maximum across all observations
/// converges toward the true value as overlapping fragments accumulate.
///
/// The merge is idempotent (re-merging an already merged series changes
/// nothing) and commutative (fragment order does not matter).
pub fn merge(fragments: &[Fragment], previous: Option<&AggregateSeries>) -> Result<AggregateSeries> {
    let schema = match (fragments.first(), previous) {
        (Some(first), _) => first.schema.clone(),
        (None, Some(prev)) => prev.schema.clone(),
        (None, None) => return Err(TrafficError::NoData),
    };

    // Fragments of one run were parsed against one schema already; the
    // previous aggregate comes from an earlier run and is re-checked here.
    if let Some(prev) = previous {
        if prev.schema != schema {
            return Err(TrafficError::SchemaMismatch {
                origin: "previous aggregate".to_string(),
                expected: schema.describe(),
                found: prev.schema.describe(),
            });
        }
    }
    for fragment in fragments {
        if fragment.schema != schema {
            return Err(TrafficError::SchemaMismatch {
                origin: format!("fragment captured {}", fragment.capture_time),
                expected: schema.describe(),
                found: fragment.schema.describe(),
            });
        }
    }

    let mut rows = SeriesRows::new();
    let sources = previous
        .map(|prev| &prev.rows)
        .into_iter()
        .chain(fragments.iter().map(|f| &f.rows));
    for source in sources {
        for (&ts, values) in source {
            rows.entry(ts)
                .and_modify(|acc| max_into(acc, values))
                .or_insert_with(|| values.clone());
        }
    }

    Ok(AggregateSeries { schema, rows })
}
