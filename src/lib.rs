// src/lib.rs

//! Batch reconciliation of repository traffic telemetry.
//!
//! The upstream API reports views/clones counters and ranked referrer/path
//! tables over a rolling 14-day window, so every capture is a short fragment
//! that overlaps and disagrees with its neighbors at the window boundaries.
//! This crate merges an open-ended stream of such fragments (plus an
//! optional previously persisted aggregate) into one deduplicated,
//! chronologically ordered series, reconstructs and ranks per-entity series
//! from the ranked tables, and downsamples derived series to a bounded
//! number of points for storage and plotting.

pub mod cli;
pub mod error;
pub mod fragment;
pub mod model;
pub mod rank;
pub mod reconcile;
pub mod resample;
pub mod store;
