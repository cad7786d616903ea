// tests/pipeline.rs
//
// End-to-end run over real files in a temporary directory: discovery,
// parsing, reconciliation, persistence, and entity ranking.

use repo_traffic::error::TrafficError;
use repo_traffic::fragment::{self, FragmentStore, InputKind};
use repo_traffic::model::{EntityKind, Fragment};
use repo_traffic::{rank, reconcile, resample, store};

use chrono::{TimeZone, Utc};
use std::fs;
use std::path::Path;

fn write_file(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

fn populate_data_dir(dir: &Path) {
    // Two overlapping fragments. Dec 7 sat mid-window in the first capture
    // (clones_total 73) and at the window boundary in the second (18).
    write_file(
        dir,
        "2020-12-15_235959_views_clones_series_fragment.csv",
        "time_iso8601,clones_total,clones_unique,views_total,views_unique\n\
         2020-12-06T00:00:00Z,10,2,100,30\n\
         2020-12-07T00:00:00Z,73,9,110,35\n",
    );
    write_file(
        dir,
        "2020-12-21_235959_views_clones_series_fragment.csv",
        "time_iso8601,clones_total,clones_unique,views_total,views_unique\n\
         2020-12-07T00:00:00Z,18,3,90,20\n\
         2020-12-08T00:00:00Z,40,7,95,25\n",
    );
    // An empty fragment: skipped, not fatal.
    write_file(
        dir,
        "2020-12-22_000000_views_clones_series_fragment.csv",
        "time_iso8601,clones_total,clones_unique,views_total,views_unique\n",
    );
    write_file(
        dir,
        "2020-12-15_235959_top_referrers_snapshot.csv",
        "referrer,views_total,views_unique\n\
         github.com,200,80\n\
         news.ycombinator.com,120,50\n",
    );
    // Legacy `url_path` header from older captures.
    write_file(
        dir,
        "2020-12-15_235959_top_paths_snapshot.csv",
        "url_path,views_total,views_unique\n\
         org/repo,90,40\n\
         org/repo/docs,30,10\n",
    );
    // Not part of the capture naming convention.
    write_file(dir, "notes.txt", "unrelated\n");
}

fn parse_all(dir: &Path) -> (Vec<Fragment>, Vec<repo_traffic::model::EntitySnapshot>) {
    let inputs = fragment::scan_data_dir(dir).unwrap();
    let mut fragment_store = FragmentStore::new();
    let mut fragments = Vec::new();
    let mut snapshots = Vec::new();
    for input in &inputs {
        match input.kind {
            InputKind::Fragment => match fragment_store.parse_fragment_file(input) {
                Ok(f) => fragments.push(f),
                Err(TrafficError::EmptyFragment(_)) => {}
                Err(e) => panic!("unexpected parse failure: {e}"),
            },
            InputKind::Snapshot(kind) => {
                snapshots.push(fragment::parse_snapshot_file(input, kind).unwrap());
            }
        }
    }
    (fragments, snapshots)
}

#[test]
fn full_run_reconciles_persists_and_ranks() {
    let workspace = tempfile::tempdir().unwrap();
    let data_dir = workspace.path().join("data");
    fs::create_dir(&data_dir).unwrap();
    populate_data_dir(&data_dir);

    let inputs = fragment::scan_data_dir(&data_dir).unwrap();
    // notes.txt is skipped, everything else classified.
    assert_eq!(inputs.len(), 5);

    let (fragments, snapshots) = parse_all(&data_dir);
    assert_eq!(fragments.len(), 2);
    assert_eq!(snapshots.len(), 2);

    // First run: no prior aggregate on disk.
    let aggregate_path = workspace.path().join("views_clones_aggregate.csv");
    let previous = store::read_aggregate(&aggregate_path).unwrap();
    assert!(previous.is_none());

    let aggregate = reconcile::merge(&fragments, previous.as_ref()).unwrap();
    let dec7 = Utc.with_ymd_and_hms(2020, 12, 7, 0, 0, 0).unwrap();
    let clones_total = aggregate.schema.index_of("clones_total").unwrap();
    assert_eq!(aggregate.rows.len(), 3);
    assert_eq!(aggregate.rows[&dec7][clones_total], 73);

    store::write_aggregate(&aggregate, &aggregate_path).unwrap();

    // Second run over the same inputs plus the persisted aggregate must be
    // a no-op: reconciliation is idempotent end to end.
    let previous = store::read_aggregate(&aggregate_path).unwrap().unwrap();
    let again = reconcile::merge(&fragments, Some(&previous)).unwrap();
    assert_eq!(again, aggregate);

    // Derived series stay within their bounds.
    let daily = resample::resample_to_daily(&aggregate.rows);
    assert_eq!(daily.len(), 3);
    let bounded = resample::downsample_to_bounded_points(&daily, 2);
    assert!(bounded.len() <= 3);
    assert_eq!(
        bounded.keys().next_back(),
        daily.keys().next_back(),
        "last plotted point must sit on the newest sample"
    );

    // Referrer ranking from the snapshot.
    let referrers = rank::build_entity_series(&snapshots, EntityKind::Referrer);
    let ranking = rank::rank(&referrers, 2, rank::peak_views_unique);
    assert_eq!(ranking.top, ["github.com", "news.ycombinator.com"]);

    // Path series come out prefix-stripped and root-canonicalized.
    let paths = rank::build_entity_series(&snapshots, EntityKind::Path);
    let names: Vec<&str> = paths.keys().map(String::as_str).collect();
    assert_eq!(names, ["/", "/docs"]);

    // Per-entity day-resolution persistence.
    let entity_path = workspace.path().join("path_root.csv");
    store::write_entity_series(&paths["/"], &entity_path).unwrap();
    let text = fs::read_to_string(&entity_path).unwrap();
    assert!(text.starts_with("time_iso8601,views_unique,views_total\n"));
    assert!(text.contains("2020-12-15T00:00:00Z,40,90"));
}

#[test]
fn mixed_schema_fragments_abort_the_run() {
    let workspace = tempfile::tempdir().unwrap();
    let data_dir = workspace.path().join("data");
    fs::create_dir(&data_dir).unwrap();

    write_file(
        &data_dir,
        "2020-12-15_235959_views_clones_series_fragment.csv",
        "time_iso8601,clones_total,clones_unique\n2020-12-06T00:00:00Z,10,2\n",
    );
    write_file(
        &data_dir,
        "2020-12-21_235959_views_clones_series_fragment.csv",
        "time_iso8601,views_total\n2020-12-07T00:00:00Z,18\n",
    );

    let inputs = fragment::scan_data_dir(&data_dir).unwrap();
    let mut fragment_store = FragmentStore::new();
    let mut result = Ok(());
    for input in &inputs {
        if let Err(e) = fragment_store.parse_fragment_file(input) {
            result = Err(e);
            break;
        }
    }
    assert!(matches!(result, Err(TrafficError::SchemaMismatch { .. })));
}
