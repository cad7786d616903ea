// src/model.rs

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Canonicalized set of metric field names. Names are kept sorted, so two
/// schemas compare equal exactly when they cover the same field set, and the
/// sorted order doubles as the column order of written CSV files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema(Vec<String>);

impl Schema {
    pub fn new(mut names: Vec<String>) -> Self {
        names.sort();
        names.dedup();
        Schema(names)
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of a field in the canonical order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.0.binary_search_by(|f| f.as_str().cmp(name)).ok()
    }

    /// Comma-joined field list, for error messages and logs.
    pub fn describe(&self) -> String {
        self.0.join(", ")
    }
}

/// Metric values for one timestamp, aligned to the schema's field order.
pub type MetricRow = Vec<u64>;

/// Timestamp-keyed series of metric rows. The BTreeMap keeps timestamps
/// unique and chronologically ordered.
pub type SeriesRows = BTreeMap<DateTime<Utc>, MetricRow>;

/// Component-wise maximum, folded into `acc`.
pub(crate) fn max_into(acc: &mut MetricRow, other: &[u64]) {
    for (a, &b) in acc.iter_mut().zip(other) {
        if b > *a {
            *a = b;
        }
    }
}

/// One capture's worth of rolling-window telemetry rows. Immutable after
/// parsing; consumed once by the reconciler.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Instant the fragment was fetched from the upstream API.
    pub capture_time: DateTime<Utc>,
    pub schema: Schema,
    pub rows: SeriesRows,
}

/// The reconciled full-history series: unique timestamps, chronological, and
/// for any timestamp reported by more than one input the component-wise
/// maximum across all observations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSeries {
    pub schema: Schema,
    pub rows: SeriesRows,
}

/// Classifier of a ranked-table snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Referrer,
    Path,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Referrer => "referrer",
            EntityKind::Path => "path",
        }
    }

    /// Canonical name of the entity column in snapshot CSV files.
    pub fn column(&self) -> &'static str {
        self.label()
    }
}

/// One row of a ranked entity table.
#[derive(Debug, Clone)]
pub struct EntityObservation {
    pub name: String,
    pub views_unique: u64,
    pub views_total: u64,
}

/// One ranked table captured at a point in time.
#[derive(Debug, Clone)]
pub struct EntitySnapshot {
    pub capture_time: DateTime<Utc>,
    pub kind: EntityKind,
    pub rows: Vec<EntityObservation>,
}

/// View counts for one entity within one 24-hour bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntityCount {
    pub views_unique: u64,
    pub views_total: u64,
}

/// Per-entity history, keyed by the left edge of a fixed UTC 24-hour bin.
/// Bins with no observation are absent.
pub type EntityTimeSeries = BTreeMap<DateTime<Utc>, EntityCount>;

/// Top-N entity names by a ranking statistic, plus the full statistic map
/// for presentation.
#[derive(Debug, Clone)]
pub struct RankingResult {
    pub top: Vec<String>,
    pub stats: BTreeMap<String, u64>,
}
