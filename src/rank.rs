// src/rank.rs

use crate::model::{EntityCount, EntityKind, EntitySnapshot, EntityTimeSeries, RankingResult};
use crate::resample::day_floor;
use std::collections::BTreeMap;

/// Reduces one entity's series to a single comparable value.
pub type RankingStatistic = fn(&EntityTimeSeries) -> u64;

/// Default ranking statistic: the highest `views_unique` ever observed for
/// the entity. A single historical spike of the 14-day rolling metric can
/// outrank sustained recent traffic under this policy; swap in another
/// [`RankingStatistic`] to change it.
pub fn peak_views_unique(series: &EntityTimeSeries) -> u64 {
    series.values().map(|c| c.views_unique).max().unwrap_or(0)
}

/// Reconstruct per-entity time series from ranked-table snapshots of one
/// kind. Observations are indexed by capture time, bucketed into fixed UTC
/// 24-hour bins (label = left edge, closed on the left), and each non-empty
/// bin reduces to the per-field maximum. Bins without observations are
/// omitted; there is no interpolation or forward-fill.
///
/// Path names get the longest common prefix across all observed names
/// stripped, with an empty remainder canonicalized to `/`.
pub fn build_entity_series(
    snapshots: &[EntitySnapshot],
    kind: EntityKind,
) -> BTreeMap<String, EntityTimeSeries> {
    let mut by_name: BTreeMap<String, EntityTimeSeries> = BTreeMap::new();
    for snapshot in snapshots.iter().filter(|s| s.kind == kind) {
        let bin = day_floor(snapshot.capture_time);
        for obs in &snapshot.rows {
            let sample = by_name
                .entry(obs.name.clone())
                .or_default()
                .entry(bin)
                .or_default();
            sample.views_unique = sample.views_unique.max(obs.views_unique);
            sample.views_total = sample.views_total.max(obs.views_total);
        }
    }

    match kind {
        EntityKind::Path => canonicalize_paths(by_name),
        EntityKind::Referrer => by_name,
    }
}

/// Strip the longest common prefix across all observed path names. Stripping
/// a shared prefix is injective, so no two series collide; the fully
/// stripped name is the repository root `/`.
fn canonicalize_paths(
    by_name: BTreeMap<String, EntityTimeSeries>,
) -> BTreeMap<String, EntityTimeSeries> {
    let names: Vec<&str> = by_name.keys().map(String::as_str).collect();
    let prefix = longest_common_prefix(&names);
    if prefix.is_empty() {
        return by_name;
    }

    by_name
        .into_iter()
        .map(|(name, series)| {
            let stripped = name.strip_prefix(&prefix).unwrap_or(name.as_str());
            let canonical = if stripped.is_empty() {
                "/".to_string()
            } else {
                stripped.to_string()
            };
            (canonical, series)
        })
        .collect()
}

fn longest_common_prefix(names: &[&str]) -> String {
    let Some(first) = names.first() else {
        return String::new();
    };
    let mut end = first.len();
    for name in &names[1..] {
        let common: usize = first
            .chars()
            .zip(name.chars())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a.len_utf8())
            .sum();
        end = end.min(common);
    }
    first[..end].to_string()
}

/// Order entities descending by the statistic and return the first `top_n`
/// names plus the full statistic map. Entities with equal statistics order
/// lexicographically by name, so reruns produce stable rankings.
pub fn rank(
    series_map: &BTreeMap<String, EntityTimeSeries>,
    top_n: usize,
    statistic: RankingStatistic,
) -> RankingResult {
    let stats: BTreeMap<String, u64> = series_map
        .iter()
        .map(|(name, series)| (name.clone(), statistic(series)))
        .collect();

    let mut order: Vec<(String, u64)> = stats.iter().map(|(n, &v)| (n.clone(), v)).collect();
    order.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    RankingResult {
        top: order.into_iter().take(top_n).map(|(name, _)| name).collect(),
        stats,
    }
}
