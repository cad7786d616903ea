// src/fragment.rs

use crate::error::{Result, TrafficError};
use crate::model::{
    max_into, EntityKind, EntityObservation, EntitySnapshot, Fragment, Schema, SeriesRows,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Canonical name of the timestamp column.
pub const TIME_COLUMN: &str = "time_iso8601";

/// Capture-time prefix of every input filename, e.g. `2020-12-15_235959`.
const CAPTURE_TIME_FORMAT: &str = "%Y-%m-%d_%H%M%S";

/// Filename suffixes produced by the fetch job, one per input kind.
const FRAGMENT_SUFFIX: &str = "_views_clones_series_fragment.csv";
const REFERRER_SUFFIX: &str = "_top_referrers_snapshot.csv";
const PATH_SUFFIX: &str = "_top_paths_snapshot.csv";

/// Legacy CSV header names, normalized to canonical ones during parsing.
const HEADER_ALIASES: &[(&str, &str)] = &[
    ("url_path", "path"),
    ("referrer_name", "referrer"),
    ("time", TIME_COLUMN),
];

/// What an input file contains, derived from its filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Fragment,
    Snapshot(EntityKind),
}

/// One discovered input file with its capture time parsed off the filename.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub path: PathBuf,
    pub capture_time: DateTime<Utc>,
    pub kind: InputKind,
}

/// List fragment and snapshot files in the data directory, ordered by
/// capture time. Files not matching the capture naming convention are
/// skipped with a warning.
pub fn scan_data_dir(dir: &Path) -> Result<Vec<InputFile>> {
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match classify(name) {
            Some((capture_time, kind)) => {
                debug!("discovered {:?} input: {}", kind, name);
                inputs.push(InputFile {
                    path,
                    capture_time,
                    kind,
                });
            }
            None => warn!("skipping file outside the capture naming convention: {name}"),
        }
    }
    inputs.sort_by_key(|i| i.capture_time);
    Ok(inputs)
}

fn classify(name: &str) -> Option<(DateTime<Utc>, InputKind)> {
    let suffixes = [
        (FRAGMENT_SUFFIX, InputKind::Fragment),
        (REFERRER_SUFFIX, InputKind::Snapshot(EntityKind::Referrer)),
        (PATH_SUFFIX, InputKind::Snapshot(EntityKind::Path)),
    ];
    for (suffix, kind) in suffixes {
        if let Some(prefix) = name.strip_suffix(suffix) {
            return parse_capture_time(prefix).map(|t| (t, kind));
        }
    }
    None
}

fn parse_capture_time(prefix: &str) -> Option<DateTime<Utc>> {
    // Capture timestamps are aligned to UTC by the fetch job.
    NaiveDateTime::parse_from_str(prefix, CAPTURE_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parses raw input files into uniform in-memory shapes, enforcing one
/// metric schema across all fragments of a run.
#[derive(Debug, Default)]
pub struct FragmentStore {
    schema_seen: Option<Schema>,
}

impl FragmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema established by the fragments parsed so far, if any.
    pub fn schema(&self) -> Option<&Schema> {
        self.schema_seen.as_ref()
    }

    pub fn parse_fragment_file(&mut self, input: &InputFile) -> Result<Fragment> {
        let origin = input.path.display().to_string();
        let mut rdr = csv::Reader::from_path(&input.path)?;
        self.parse_fragment(input.capture_time, &mut rdr, &origin)
    }

    /// Parse one record batch into a [`Fragment`].
    ///
    /// Validation, in order: zero rows is `EmptyFragment` (callers skip the
    /// input), a row timestamp later than the capture time is `ClockSkew`,
    /// and a field set differing from the schema established this run is
    /// `SchemaMismatch`. Missing cells read as zero; counts are whole and
    /// non-negative by domain rule.
    pub fn parse_fragment<R: Read>(
        &mut self,
        capture_time: DateTime<Utc>,
        rdr: &mut csv::Reader<R>,
        origin: &str,
    ) -> Result<Fragment> {
        let (schema, rows) = parse_metric_table(rdr, origin)?;

        if rows.is_empty() {
            return Err(TrafficError::EmptyFragment(origin.to_string()));
        }
        if let Some((&max_row_time, _)) = rows.iter().next_back() {
            if max_row_time > capture_time {
                return Err(TrafficError::ClockSkew {
                    origin: origin.to_string(),
                    capture_time,
                    max_row_time,
                });
            }
        }
        match &self.schema_seen {
            Some(seen) if *seen != schema => {
                return Err(TrafficError::SchemaMismatch {
                    origin: origin.to_string(),
                    expected: seen.describe(),
                    found: schema.describe(),
                });
            }
            Some(_) => {}
            None => self.schema_seen = Some(schema.clone()),
        }

        Ok(Fragment {
            capture_time,
            schema,
            rows,
        })
    }
}

/// Parse a timestamp-indexed metric table: a `time_iso8601` column plus one
/// column per metric. Duplicate timestamps within one table reduce to the
/// component-wise maximum, matching the reconciliation rule.
pub(crate) fn parse_metric_table<R: Read>(
    rdr: &mut csv::Reader<R>,
    origin: &str,
) -> Result<(Schema, SeriesRows)> {
    let headers = normalize_headers(rdr.headers()?);
    let Some(time_idx) = headers.iter().position(|h| h == TIME_COLUMN) else {
        return Err(TrafficError::SchemaMismatch {
            origin: origin.to_string(),
            expected: TIME_COLUMN.to_string(),
            found: headers.join(", "),
        });
    };

    let field_names: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != time_idx)
        .map(|(_, h)| h.clone())
        .collect();
    let schema = Schema::new(field_names);

    let mut rows = SeriesRows::new();
    for record in rdr.records() {
        let record = record?;
        let ts = parse_timestamp(record.get(time_idx).unwrap_or(""), origin)?;
        let mut values = vec![0u64; schema.len()];
        for (i, field) in headers.iter().enumerate() {
            if i == time_idx {
                continue;
            }
            if let Some(slot) = schema.index_of(field) {
                values[slot] = parse_count(record.get(i).unwrap_or(""), field, origin)?;
            }
        }
        rows.entry(ts)
            .and_modify(|acc| max_into(acc, &values))
            .or_insert(values);
    }

    Ok((schema, rows))
}

/// One row of a ranked entity table, after the entity column has been
/// renamed to `name`.
#[derive(Debug, Deserialize)]
struct SnapshotRow {
    name: String,
    views_unique: u64,
    views_total: u64,
}

pub fn parse_snapshot_file(input: &InputFile, kind: EntityKind) -> Result<EntitySnapshot> {
    let origin = input.path.display().to_string();
    let mut rdr = csv::Reader::from_path(&input.path)?;
    parse_snapshot(input.capture_time, kind, &mut rdr, &origin)
}

/// Parse one ranked entity table (top referrers or top paths) into an
/// [`EntitySnapshot`]. Zero rows is `EmptyFragment`, as for fragments.
pub fn parse_snapshot<R: Read>(
    capture_time: DateTime<Utc>,
    kind: EntityKind,
    rdr: &mut csv::Reader<R>,
    origin: &str,
) -> Result<EntitySnapshot> {
    // Rename the entity column to `name` so referrer and path tables
    // deserialize through one row shape.
    let headers: csv::StringRecord = normalize_headers(rdr.headers()?)
        .iter()
        .map(|h| if h == kind.column() { "name" } else { h.as_str() })
        .collect();

    let mut observations = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row: SnapshotRow = record.deserialize(Some(&headers))?;
        observations.push(EntityObservation {
            name: row.name,
            views_unique: row.views_unique,
            views_total: row.views_total,
        });
    }
    if observations.is_empty() {
        return Err(TrafficError::EmptyFragment(origin.to_string()));
    }

    Ok(EntitySnapshot {
        capture_time,
        kind,
        rows: observations,
    })
}

/// Apply the legacy alias table to a header row.
fn normalize_headers(headers: &csv::StringRecord) -> Vec<String> {
    headers
        .iter()
        .map(|h| {
            let h = h.trim();
            HEADER_ALIASES
                .iter()
                .find(|(legacy, _)| *legacy == h)
                .map(|(_, canonical)| (*canonical).to_string())
                .unwrap_or_else(|| h.to_string())
        })
        .collect()
}

/// Accepts RFC 3339 as written by this tool and the legacy
/// `2020-12-07 00:00:00+00:00` export format.
pub(crate) fn parse_timestamp(raw: &str, origin: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(dt.with_timezone(&Utc));
    }
    Err(TrafficError::BadTimestamp {
        origin: origin.to_string(),
        value: raw.to_string(),
    })
}

/// Counts are never fractional or negative. An empty cell is a missing
/// sample and reads as zero; a float-formatted whole number (seen in legacy
/// exports) is accepted and truncated to its integer value.
fn parse_count(raw: &str, field: &str, origin: &str) -> Result<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    if let Ok(v) = raw.parse::<u64>() {
        return Ok(v);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 => Ok(f as u64),
        _ => Err(TrafficError::BadCount {
            origin: origin.to_string(),
            field: field.to_string(),
            value: raw.to_string(),
        }),
    }
}
