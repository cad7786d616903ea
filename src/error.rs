// src/error.rs

use chrono::{DateTime, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrafficError>;

#[derive(Debug, Error)]
pub enum TrafficError {
    /// The field set of an input differs from the schema already established
    /// for this run. Fatal: mixing schemas would corrupt the aggregate that
    /// later runs build upon.
    #[error("schema mismatch in {origin}: expected fields [{expected}], found [{found}]")]
    SchemaMismatch {
        origin: String,
        expected: String,
        found: String,
    },

    /// A parsed fragment or snapshot has zero rows. Callers log and skip
    /// that one input.
    #[error("input has zero rows: {0}")]
    EmptyFragment(String),

    /// A fragment claims samples from after its own capture instant. Fatal:
    /// the input is corrupt or the capturing host's clock was wrong.
    #[error(
        "clock skew in {origin}: row timestamp {max_row_time} is later than capture time {capture_time}"
    )]
    ClockSkew {
        origin: String,
        capture_time: DateTime<Utc>,
        max_row_time: DateTime<Utc>,
    },

    /// Neither fresh fragments nor a previous aggregate are available.
    #[error("no fresh fragments and no previous aggregate, nothing to reconcile")]
    NoData,

    #[error("unparseable timestamp {value:?} in {origin}")]
    BadTimestamp { origin: String, value: String },

    #[error("unparseable count {value:?} for field {field} in {origin}")]
    BadCount {
        origin: String,
        field: String,
        value: String,
    },

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
