//! Per-dataset preparation: upstream payloads in, renderer inputs out.
//!
//! Categorical colors always come from the shared [`ScaleRegistry`] over the
//! dataset's full key universe, so a cluster or manufacturer keeps its color
//! across every chart that shows it, whatever subset a chart happens to draw.

use crate::config::{OTHER_LABEL, OTHER_SHARE_THRESHOLD_PCT, OTHERS_LABEL, TOP_MANUFACTURERS};
use crate::geo::FeatureCollection;
use crate::interaction::ActiveSet;
use crate::models::{
    AccidentRow, BinRow, ClusterData, CountryCount, GroupKey, ManufacturerYearRow,
    parse_accident_date,
};
use crate::scales::{CategoryScale, Rgb, ScaleRegistry};
use crate::stats::{
    DatedEvent, KeyValue, Period, PeriodMode, PeriodSeries, Share, ShareBreakdown,
    aggregate_by_key, group_small_shares, hourly_counts, period_series, rank_desc,
    severity_buckets, summarize_groups, top_n,
};
use crate::viz::scatter::ScatterPoint;
use crate::viz::{
    Bar, BarInput, BoxPlotInput, ChoroplethInput, HistogramInput, LineInput, LineMode,
    Orientation, PieInput, ScatterInput,
};
use chrono::Datelike;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Single-series bars (engines, weight, wingspan, yearly line).
pub const PRIMARY_COLOR: Rgb = Rgb(0x3b, 0x82, 0xf6);
pub const HOURLY_COLOR: Rgb = Rgb(0x63, 0x66, 0xf1);
/// One color per fatality bucket, mild to severe.
pub const SEVERITY_COLORS: [Rgb; 6] = [
    Rgb(0x10, 0xb9, 0x81),
    Rgb(0xf6, 0xd1, 0x3b),
    Rgb(0xf5, 0x9e, 0x0b),
    Rgb(0xf9, 0x73, 0x16),
    Rgb(0xef, 0x44, 0x44),
    Rgb(0x99, 0x1b, 0x1b),
];

/// Ranking bars show at most this many countries.
pub const COUNTRY_RANKING_LEN: usize = 15;

/// Crew vs passengers aboard, per weight class.
pub fn aboard_box_plot(groups: &BTreeMap<GroupKey, Vec<f64>>, registry: &ScaleRegistry) -> BoxPlotInput {
    let colors = registry.color_scale_for(groups.keys().map(|k| k.category.as_str()));
    BoxPlotInput::new(summarize_groups(groups), colors)
}

pub fn wingspan_histogram(bins: &[BinRow]) -> HistogramInput {
    HistogramInput::new(bins).color(PRIMARY_COLOR).unit("m")
}

fn single_color_bars(rates: &[(String, f64)], color: Rgb) -> Vec<Bar> {
    rates
        .iter()
        .filter(|(_, v)| v.is_finite())
        .map(|(k, v)| Bar::new(k.clone(), *v, color))
        .collect()
}

/// Accidents by number of engines; keys arrive in display order.
pub fn engine_bars(rates: &[(String, f64)]) -> BarInput {
    BarInput::new(single_color_bars(rates, PRIMARY_COLOR)).with_value_labels()
}

/// Accidents by weight class, drawn horizontally.
pub fn weight_bars(rates: &[(String, f64)]) -> BarInput {
    BarInput::new(single_color_bars(rates, PRIMARY_COLOR))
        .orientation(Orientation::Horizontal)
        .with_value_labels()
}

pub fn country_choropleth(features: Arc<FeatureCollection>, counts: &[CountryCount]) -> ChoroplethInput {
    ChoroplethInput::new(features, counts.iter().map(|c| (c.country.as_str(), c.count)))
}

/// Top countries by accident count, largest first.
pub fn country_ranking(counts: &[CountryCount], registry: &ScaleRegistry) -> BarInput {
    let colors = registry.color_scale_for(counts.iter().map(|c| c.country.as_str()));
    let agg = aggregate_by_key(counts.iter().map(|c| (c.country.clone(), c.count)));
    let bars = top_n(&agg, COUNTRY_RANKING_LEN, None)
        .into_iter()
        .map(|kv| {
            let color = colors.color(&kv.key);
            Bar::new(kv.key, kv.value, color)
        })
        .collect();
    BarInput::new(bars)
        .orientation(Orientation::Horizontal)
        .with_value_labels()
}

/// Every cluster label that appears in the payload.
pub fn cluster_universe(data: &ClusterData) -> Vec<String> {
    let mut keys: BTreeSet<String> = data.points.iter().map(|p| p.cluster_label()).collect();
    keys.extend(data.kmeans.distribution.keys().cloned());
    keys.into_iter().collect()
}

/// The shared color scale for clusters.
pub fn cluster_colors(data: &ClusterData, registry: &ScaleRegistry) -> Arc<CategoryScale> {
    registry.color_scale_for(cluster_universe(data))
}

/// Cluster scatter. Points outside `active` are hidden; axes stay fixed.
pub fn cluster_scatter(data: &ClusterData, registry: &ScaleRegistry, active: Option<&ActiveSet>) -> ScatterInput {
    let points = data.points.iter().map(ScatterPoint::from).collect();
    let input = ScatterInput::new(points, cluster_colors(data, registry));
    match active {
        Some(a) => input.visible(a.active().clone()),
        None => input,
    }
}

/// Points per cluster: the upstream distribution when present, else counted.
pub fn cluster_counts(data: &ClusterData) -> BTreeMap<String, f64> {
    if !data.kmeans.distribution.is_empty() {
        return data.kmeans.distribution.clone();
    }
    aggregate_by_key(data.points.iter().map(|p| (p.cluster_label(), 1.0)))
}

/// Cluster sizes with multi-select; inactive clusters are de-emphasized.
pub fn cluster_distribution_bars(
    data: &ClusterData,
    registry: &ScaleRegistry,
    active: Option<&ActiveSet>,
) -> BarInput {
    let colors = cluster_colors(data, registry);
    let terms: BTreeMap<String, Vec<String>> = data
        .kmeans
        .clusters
        .iter()
        .map(|c| (c.interpretation.clone(), c.term_labels()))
        .collect();
    let mut entries: Vec<KeyValue> = cluster_counts(data)
        .into_iter()
        .map(|(k, v)| KeyValue::new(k, v))
        .collect();
    rank_desc(&mut entries);
    let bars = entries
        .into_iter()
        .map(|kv| {
            let mut bar = Bar::new(kv.key.clone(), kv.value, colors.color(&kv.key));
            if let Some(t) = terms.get(&kv.key).filter(|t| !t.is_empty()) {
                bar = bar.detail("Top terms", t.iter().take(5).cloned().collect::<Vec<_>>().join(", "));
            }
            bar
        })
        .collect();
    let input = BarInput::new(bars).with_legend().value_name("Points");
    match active {
        Some(a) => input.active(a.active().clone()),
        None => input,
    }
}

/// Countries ordered by clustered accident count, most first. `"Unknown"`
/// and missing countries are left out.
pub fn cluster_countries(data: &ClusterData) -> Vec<String> {
    let agg = aggregate_by_key(
        data.points
            .iter()
            .filter_map(|p| p.operator_country.as_deref())
            .filter(|c| *c != "Unknown")
            .map(|c| (c.to_string(), 1.0)),
    );
    top_n(&agg, agg.len(), None).into_iter().map(|kv| kv.key).collect()
}

/// Cluster mix for one country; small clusters fold into "Other".
pub fn country_cluster_pie(data: &ClusterData, country: &str, registry: &ScaleRegistry) -> PieInput {
    let entries: Vec<KeyValue> = aggregate_by_key(
        data.points
            .iter()
            .filter(|p| p.operator_country.as_deref() == Some(country))
            .map(|p| (p.cluster_label(), 1.0)),
    )
    .into_iter()
    .map(|(k, v)| KeyValue::new(k, v))
    .collect();
    let breakdown = group_small_shares(&entries, OTHER_SHARE_THRESHOLD_PCT, OTHER_LABEL);
    PieInput::new(breakdown, cluster_colors(data, registry))
}

/// Every manufacturer named in the payload.
pub fn manufacturer_universe(rows: &[ManufacturerYearRow]) -> Vec<String> {
    let keys: BTreeSet<&str> = rows.iter().flat_map(|r| r.counts.keys().map(String::as_str)).collect();
    keys.into_iter().map(str::to_string).collect()
}

pub fn manufacturer_years(rows: &[ManufacturerYearRow]) -> Vec<i32> {
    rows.iter().map(|r| r.year).collect()
}

/// Top manufacturers for one year plus an "Others" remainder slice.
pub fn manufacturer_share_pie(rows: &[ManufacturerYearRow], year: i32, registry: &ScaleRegistry) -> PieInput {
    let colors = registry.color_scale_for(manufacturer_universe(rows));
    let Some(row) = rows.iter().find(|r| r.year == year) else {
        return PieInput::new(ShareBreakdown::default(), colors);
    };
    let agg: BTreeMap<String, f64> = row
        .counts
        .iter()
        .filter(|(_, v)| v.is_finite() && **v > 0.0)
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    let total: f64 = agg.values().sum();
    if total <= 0.0 {
        return PieInput::new(ShareBreakdown::default(), colors);
    }
    let share = |kv: KeyValue| Share {
        percent: kv.value / total * 100.0,
        key: kv.key,
        value: kv.value,
    };
    let mut ranked: Vec<KeyValue> = agg.into_iter().map(|(k, v)| KeyValue::new(k, v)).collect();
    rank_desc(&mut ranked);
    let rest = ranked.split_off(ranked.len().min(TOP_MANUFACTURERS));
    let mut slices: Vec<Share> = ranked.into_iter().map(share).collect();
    let other: Vec<Share> = rest.into_iter().map(share).collect();
    let other_label = if other.is_empty() {
        None
    } else {
        let value: f64 = other.iter().map(|s| s.value).sum();
        slices.push(Share {
            key: OTHERS_LABEL.to_string(),
            value,
            percent: value / total * 100.0,
        });
        Some(OTHERS_LABEL.to_string())
    };
    PieInput::new(
        ShareBreakdown {
            slices,
            other,
            other_label,
            total,
        },
        colors,
    )
}

/// Accident totals per manufacturer over an inclusive year range, top `n`.
pub fn manufacturer_totals_bars(
    rows: &[ManufacturerYearRow],
    range: Option<(i32, i32)>,
    n: usize,
    registry: &ScaleRegistry,
) -> BarInput {
    let colors = registry.color_scale_for(manufacturer_universe(rows));
    let agg = aggregate_by_key(
        rows.iter()
            .filter(|r| range.is_none_or(|(lo, hi)| (lo..=hi).contains(&r.year)))
            .flat_map(|r| r.counts.iter().map(|(k, v)| (k.clone(), *v))),
    );
    let bars = top_n(&agg, n, None)
        .into_iter()
        .filter(|kv| kv.value > 0.0)
        .map(|kv| {
            let color = colors.color(&kv.key);
            Bar::new(kv.key, kv.value, color)
        })
        .collect();
    BarInput::new(bars).with_value_labels()
}

/// Accidents per manufacturer over the upstream year groups. `selected`
/// restricts the drawn series; colors stay those of the full universe.
pub fn manufacturer_trend_lines(
    rows: &[ManufacturerYearRow],
    selected: Option<&BTreeSet<String>>,
    mode: LineMode,
    registry: &ScaleRegistry,
) -> LineInput {
    let universe = manufacturer_universe(rows);
    let colors = registry.color_scale_for(&universe);
    let periods = rows
        .iter()
        .map(|r| Period {
            label: r.year.to_string(),
            x: r.year as f64,
        })
        .collect();
    let series = universe
        .iter()
        .filter(|m| selected.is_none_or(|s| s.contains(*m)))
        .map(|m| {
            let values = rows
                .iter()
                .map(|r| r.counts.get(m).copied().filter(|v| v.is_finite()).unwrap_or(0.0))
                .collect();
            (m.clone(), values)
        })
        .collect();
    LineInput::new(
        PeriodSeries {
            mode: PeriodMode::Yearly,
            periods,
            series,
            cumulative: false,
        },
        colors,
        mode,
    )
}

/// Clustered accidents over time, one series per active cluster.
///
/// Yearly and decade axes span every year in the payload, not only the
/// active clusters' years. Seasonal mode never accumulates.
pub fn temporal_trends(
    data: &ClusterData,
    active: Option<&ActiveSet>,
    mode: PeriodMode,
    cumulative: bool,
    line_mode: LineMode,
    registry: &ScaleRegistry,
) -> LineInput {
    let years = data.points.iter().filter_map(|p| p.year).filter(|y| *y != 0);
    let range = years.clone().min().zip(years.max());
    let events: Vec<DatedEvent> = data
        .points
        .iter()
        .filter(|p| active.is_none_or(|a| a.is_active(&p.cluster_label())))
        .filter_map(|p| {
            let year = p.year.filter(|y| *y != 0)?;
            let month = p
                .date
                .as_deref()
                .and_then(parse_accident_date)
                .map(|d| d.month());
            Some(DatedEvent::new(p.cluster_label(), year, month))
        })
        .collect();
    let mut series = period_series(&events, mode, range);
    if cumulative {
        series = series.cumulative();
    }
    LineInput::new(series, cluster_colors(data, registry), line_mode)
}

/// Accidents per year from raw rows, as a single series. Years without
/// accidents inside the covered range count as zero.
pub fn yearly_accidents(rows: &[AccidentRow], registry: &ScaleRegistry) -> LineInput {
    let key = "Accidents";
    let events: Vec<DatedEvent> = rows
        .iter()
        .filter_map(|r| r.effective_year())
        .map(|y| DatedEvent::new(key, y, None))
        .collect();
    LineInput::new(
        period_series(&events, PeriodMode::Yearly, None),
        registry.color_scale_for([key]),
        LineMode::Lines,
    )
}

/// Accidents per fatality bucket.
pub fn severity_bars(rows: &[AccidentRow]) -> BarInput {
    if rows.is_empty() {
        return BarInput::new(Vec::new());
    }
    let bars = severity_buckets(rows)
        .into_iter()
        .zip(SEVERITY_COLORS)
        .map(|(kv, c)| Bar::new(kv.key, kv.value, c))
        .collect();
    BarInput::new(bars).with_value_labels()
}

/// Accidents per hour of day, `00` through `23`.
pub fn hourly_bars(rows: &[AccidentRow]) -> BarInput {
    let counts = hourly_counts(rows);
    if counts.iter().all(|n| *n == 0) {
        return BarInput::new(Vec::new());
    }
    let bars = counts
        .iter()
        .enumerate()
        .map(|(h, n)| Bar::new(format!("{h:02}"), *n as f64, HOURLY_COLOR).label(format!("{h:02}:00")))
        .collect();
    BarInput::new(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClusterPoint;

    fn point(cluster: u32, label: &str, country: &str) -> ClusterPoint {
        ClusterPoint {
            x: cluster as f64,
            y: 0.0,
            kmeans_cluster: cluster,
            kmeans_interpretation: Some(label.to_string()),
            operator_country: Some(country.to_string()),
            ..ClusterPoint::default()
        }
    }

    #[test]
    fn country_order_skips_unknown() {
        let data = ClusterData {
            points: vec![
                point(0, "Weather", "France"),
                point(1, "Fire", "Unknown"),
                point(1, "Fire", "Unknown"),
                point(0, "Weather", "Spain"),
                point(1, "Fire", "Spain"),
            ],
            ..ClusterData::default()
        };
        assert_eq!(cluster_countries(&data), ["Spain", "France"]);
    }

    #[test]
    fn cluster_colors_ignore_subset() {
        let registry = ScaleRegistry::new();
        let data = ClusterData {
            points: vec![point(0, "Weather", "France"), point(1, "Fire", "Spain")],
            ..ClusterData::default()
        };
        let fr = country_cluster_pie(&data, "France", &registry);
        let es = country_cluster_pie(&data, "Spain", &registry);
        assert!(Arc::ptr_eq(&fr.colors, &es.colors));
        assert_ne!(fr.colors.color("Weather"), fr.colors.color("Fire"));
    }
}
