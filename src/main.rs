// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use repo_traffic::cli::Args;
use repo_traffic::error::TrafficError;
use repo_traffic::fragment::{self, FragmentStore, InputKind};
use repo_traffic::model::{EntityKind, Fragment};
use repo_traffic::{rank, reconcile, resample, store};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level)
        .with_context(|| format!("invalid log level: {}", args.log_level))?;
    fmt().with_env_filter(filter).with_target(false).init();

    let start_time = Instant::now();
    run(&args)?;
    info!("total time: {:.2?}", start_time.elapsed());
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let inputs = fragment::scan_data_dir(&args.data_dir)
        .with_context(|| format!("scanning {}", args.data_dir.display()))?;
    info!("input files found in {}: {}", args.data_dir.display(), inputs.len());

    // Parse everything up front. Empty inputs are skipped; any other parse
    // failure aborts the run before an output file is touched.
    let mut fragment_store = FragmentStore::new();
    let mut fragments: Vec<Fragment> = Vec::new();
    let mut snapshots = Vec::new();
    for input in &inputs {
        match input.kind {
            InputKind::Fragment => match fragment_store.parse_fragment_file(input) {
                Ok(f) => fragments.push(f),
                Err(TrafficError::EmptyFragment(origin)) => {
                    warn!("skipping empty fragment: {origin}");
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("parsing {}", input.path.display()))
                }
            },
            InputKind::Snapshot(kind) => match fragment::parse_snapshot_file(input, kind) {
                Ok(s) => snapshots.push(s),
                Err(TrafficError::EmptyFragment(origin)) => {
                    warn!("skipping empty snapshot: {origin}");
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("parsing {}", input.path.display()))
                }
            },
        }
    }
    info!(
        "parsed {} fragments ({} samples) and {} snapshots",
        fragments.len(),
        fragments.iter().map(|f| f.rows.len()).sum::<usize>(),
        snapshots.len()
    );

    let previous_path = args.previous.as_deref().unwrap_or(&args.output);
    let previous = store::read_aggregate(previous_path)
        .with_context(|| format!("reading previous aggregate {}", previous_path.display()))?;
    match &previous {
        Some(prev) => info!(
            "previous aggregate loaded from {}: {} samples",
            previous_path.display(),
            prev.rows.len()
        ),
        None => info!(
            "no previous aggregate at {}, starting fresh",
            previous_path.display()
        ),
    }

    let aggregate = reconcile::merge(&fragments, previous.as_ref())?;
    info!("aggregated sample count: {}", aggregate.rows.len());

    store::write_aggregate(&aggregate, &args.output)
        .with_context(|| format!("writing aggregate {}", args.output.display()))?;
    info!("wrote aggregate: {}", args.output.display());

    let daily = resample::resample_to_daily(&aggregate.rows);
    let daily_path = derived_path(&args.output, "daily");
    store::write_series(&aggregate.schema, &daily, &daily_path)?;
    info!("wrote day-resolution series ({} rows): {}", daily.len(), daily_path.display());

    let bounded = resample::downsample_to_bounded_points(&daily, args.max_points);
    let plot_path = derived_path(&args.output, "plot");
    store::write_series(&aggregate.schema, &bounded, &plot_path)?;
    info!("wrote plot-resolution series ({} rows): {}", bounded.len(), plot_path.display());

    for kind in [EntityKind::Referrer, EntityKind::Path] {
        let series_map = rank::build_entity_series(&snapshots, kind);
        if series_map.is_empty() {
            info!("no {} snapshots, skipping ranking", kind.label());
            continue;
        }

        let ranking = rank::rank(&series_map, args.top_n, rank::peak_views_unique);
        info!("top {}s of {} observed:", kind.label(), series_map.len());
        for (i, name) in ranking.top.iter().enumerate() {
            info!(
                "  #{:<2} {} (peak {} unique views)",
                i + 1,
                name,
                ranking.stats[name.as_str()]
            );
        }

        if let Some(dir) = &args.resampled_dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
            for (name, series) in &series_map {
                let path = dir.join(entity_file_name(kind, name));
                store::write_entity_series(series, &path)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
            info!(
                "wrote {} per-{} series files under {}",
                series_map.len(),
                kind.label(),
                dir.display()
            );
        }
    }

    Ok(())
}

/// Sibling path of the aggregate for a derived series, e.g.
/// `views_clones_aggregate.csv` -> `views_clones_aggregate_daily.csv`.
fn derived_path(output: &Path, tag: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("aggregate");
    output.with_file_name(format!("{stem}_{tag}.csv"))
}

/// Entity names (domains, URL paths) are flattened into safe filenames.
fn entity_file_name(kind: EntityKind, name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{}_{}.csv", kind.label(), safe)
}
