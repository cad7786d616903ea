// src/store.rs

use crate::error::{Result, TrafficError};
use crate::fragment::{parse_metric_table, TIME_COLUMN};
use crate::model::{AggregateSeries, EntityTimeSeries, Schema, SeriesRows};
use chrono::SecondsFormat;
use std::fs::File;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::warn;

/// Read a previously persisted aggregate. A missing file is the normal
/// "no prior history" state, not an error.
pub fn read_aggregate(path: &Path) -> Result<Option<AggregateSeries>> {
    if !path.exists() {
        return Ok(None);
    }
    let origin = path.display().to_string();
    let mut rdr = csv::Reader::from_path(path)?;
    let (schema, rows) = parse_metric_table(&mut rdr, &origin)?;
    if rows.is_empty() {
        warn!("previous aggregate has zero rows, treating as no prior history: {origin}");
        return Ok(None);
    }
    Ok(Some(AggregateSeries { schema, rows }))
}

/// Write the reconciled aggregate atomically.
pub fn write_aggregate(aggregate: &AggregateSeries, path: &Path) -> Result<()> {
    write_series(&aggregate.schema, &aggregate.rows, path)
}

/// Write a timestamp-indexed metric table: a `time_iso8601` column plus the
/// schema's fields in canonical order. The data goes to a temporary file in
/// the target's directory which is then renamed over the target, so a crash
/// mid-write never leaves a corrupt or truncated file in place.
pub fn write_series(schema: &Schema, rows: &SeriesRows, path: &Path) -> Result<()> {
    write_atomically(path, |wtr| {
        let mut header = Vec::with_capacity(schema.len() + 1);
        header.push(TIME_COLUMN);
        header.extend(schema.fields().iter().map(String::as_str));
        wtr.write_record(&header)?;

        for (ts, values) in rows {
            let mut record = Vec::with_capacity(schema.len() + 1);
            record.push(ts.to_rfc3339_opts(SecondsFormat::Secs, true));
            record.extend(values.iter().map(u64::to_string));
            wtr.write_record(&record)?;
        }
        Ok(())
    })
}

/// Write one entity's day-resolution series, atomically, with the same
/// layout as the snapshot inputs it was derived from.
pub fn write_entity_series(series: &EntityTimeSeries, path: &Path) -> Result<()> {
    write_atomically(path, |wtr| {
        wtr.write_record([TIME_COLUMN, "views_unique", "views_total"])?;
        for (ts, count) in series {
            wtr.write_record([
                ts.to_rfc3339_opts(SecondsFormat::Secs, true),
                count.views_unique.to_string(),
                count.views_total.to_string(),
            ])?;
        }
        Ok(())
    })
}

fn write_atomically(
    path: &Path,
    write_body: impl FnOnce(&mut csv::Writer<&File>) -> csv::Result<()>,
) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(parent)?;
    let mut wtr = csv::Writer::from_writer(tmp.as_file());
    write_body(&mut wtr)?;
    wtr.flush()?;
    drop(wtr);
    tmp.persist(path).map_err(|e| TrafficError::Io(e.error))?;
    Ok(())
}
