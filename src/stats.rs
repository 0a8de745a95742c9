//! Descriptive statistics for chart inputs: box-plot summaries, histogram
//! binning, keyed totals, top-N with remainder, percentage shares, and
//! zero-filled period series.
//!
//! Every function here is pure. Non-finite inputs are dropped before any
//! computation and reported as `excluded_count`.

use crate::config::{HEADLINE_TOP_N, OUTLIER_IQR_MULTIPLIER};
use crate::error::{ChartError, ChartResult};
use crate::models::{AccidentRow, GroupKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Five-number summary with Tukey fences.
///
/// Quartiles use linear interpolation between closest ranks (R-7,
/// `h = (n - 1)·p`), the same method as spreadsheet `QUANTILE.INC` and d3's
/// `quantile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub count: usize,
    pub excluded_count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
    /// `min` clamped into the outlier fences.
    pub whisker_min: f64,
    /// `max` clamped into the outlier fences.
    pub whisker_max: f64,
    /// Ascending.
    pub outliers: Vec<f64>,
}

impl Distribution {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    pub fn lower_fence(&self) -> f64 {
        self.q1 - OUTLIER_IQR_MULTIPLIER * self.iqr()
    }

    pub fn upper_fence(&self) -> f64 {
        self.q3 + OUTLIER_IQR_MULTIPLIER * self.iqr()
    }

    pub fn is_outlier(&self, v: f64) -> bool {
        v < self.lower_fence() || v > self.upper_fence()
    }
}

/// A [`Distribution`] for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub key: GroupKey,
    pub summary: Distribution,
}

/// Split `values` into sorted finite values and the number of dropped ones.
fn finite_sorted(values: &[f64]) -> (Vec<f64>, usize) {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    let excluded = values.len() - v.len();
    v.sort_by(f64::total_cmp);
    (v, excluded)
}

/// R-7 quantile over pre-sorted, non-empty data.
fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * p;
    let j = h.floor() as usize;
    let g = h - h.floor();
    if j + 1 >= n {
        sorted[n - 1]
    } else {
        (1.0 - g) * sorted[j] + g * sorted[j + 1]
    }
}

/// Summarize one observation set.
///
/// ### Errors
/// [`ChartError::EmptyInput`] when no finite value remains.
pub fn summarize_distribution(values: &[f64]) -> ChartResult<Distribution> {
    let (sorted, excluded) = finite_sorted(values);
    if sorted.is_empty() {
        return Err(ChartError::EmptyInput { excluded });
    }
    let n = sorted.len();
    let q1 = quantile_sorted(&sorted, 0.25);
    let median = quantile_sorted(&sorted, 0.5);
    let q3 = quantile_sorted(&sorted, 0.75);
    let iqr = q3 - q1;
    let lo = q1 - OUTLIER_IQR_MULTIPLIER * iqr;
    let hi = q3 + OUTLIER_IQR_MULTIPLIER * iqr;
    let min = sorted[0];
    let max = sorted[n - 1];
    let outliers: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|v| *v < lo || *v > hi)
        .collect();
    // sum in sorted order so the mean does not depend on input order
    let mean = sorted.iter().sum::<f64>() / n as f64;
    Ok(Distribution {
        count: n,
        excluded_count: excluded,
        min,
        q1,
        median,
        q3,
        max,
        mean,
        whisker_min: min.max(lo),
        whisker_max: max.min(hi),
        outliers,
    })
}

/// One record per group with at least one finite value, in key order.
/// Groups that are empty after filtering are omitted.
pub fn summarize_groups(groups: &BTreeMap<GroupKey, Vec<f64>>) -> Vec<SummaryRecord> {
    groups
        .iter()
        .filter_map(|(key, values)| match summarize_distribution(values) {
            Ok(summary) => Some(SummaryRecord {
                key: key.clone(),
                summary,
            }),
            Err(e) => {
                log::debug!("omitting group {key}: {e}");
                None
            }
        })
        .collect()
}

/// How to cut a value range into histogram bins.
#[derive(Debug, Clone, PartialEq)]
pub enum BinSpec {
    /// Explicit, strictly increasing edges (`n + 1` edges for `n` bins).
    Edges(Vec<f64>),
    /// Equal-width subdivision of `[min(values), max(values)]`.
    Count(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub bin_start: f64,
    pub bin_end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
    /// Non-finite values plus values outside explicit edges.
    pub excluded_count: usize,
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }
}

fn validate_edges(edges: &[f64]) -> ChartResult<()> {
    if edges.len() < 2 {
        return Err(ChartError::InvalidBins(format!(
            "need at least 2 edges, got {}",
            edges.len()
        )));
    }
    if edges.iter().any(|e| !e.is_finite()) {
        return Err(ChartError::InvalidBins("edges must be finite".into()));
    }
    if edges.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ChartError::InvalidBins(
            "edges must be strictly increasing".into(),
        ));
    }
    Ok(())
}

/// `count` equal-width edges over `[lo, hi]`, last edge exactly `hi`.
fn linear_edges(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    let (lo, hi) = if lo == hi { (lo - 0.5, hi + 0.5) } else { (lo, hi) };
    let n = count as f64;
    let step = (hi - lo) / n;
    let mut edges: Vec<f64> = if step.is_finite() {
        (0..count).map(|i| lo + step * i as f64).collect()
    } else {
        // span overflows f64; interpolate so every edge stays within [lo, hi]
        (0..count)
            .map(|i| {
                let t = i as f64 / n;
                lo * (1.0 - t) + hi * t
            })
            .collect()
    };
    edges.push(hi);
    edges
}

/// Bin `values`. Bins are half-open `[start, end)` except the last, which also
/// holds its upper edge; a value on an interior edge belongs to the bin that
/// starts there. Empty bins are kept.
///
/// ### Errors
/// - [`ChartError::InvalidBins`] for malformed edges or a zero count
/// - [`ChartError::EmptyInput`] for `Count` when no finite value exists
pub fn bin_values(values: &[f64], spec: &BinSpec) -> ChartResult<Histogram> {
    let (sorted, mut excluded) = finite_sorted(values);
    let edges = match spec {
        BinSpec::Edges(edges) => {
            validate_edges(edges)?;
            edges.clone()
        }
        BinSpec::Count(0) => return Err(ChartError::InvalidBins("bin count must be > 0".into())),
        BinSpec::Count(n) => {
            let (Some(lo), Some(hi)) = (sorted.first(), sorted.last()) else {
                return Err(ChartError::EmptyInput { excluded });
            };
            linear_edges(*lo, *hi, *n)
        }
    };

    let n_bins = edges.len() - 1;
    let first = edges[0];
    let last = edges[n_bins];
    let mut counts = vec![0usize; n_bins];
    for v in sorted {
        if v < first || v > last {
            excluded += 1;
            continue;
        }
        let idx = if v == last {
            n_bins - 1
        } else {
            edges
                .partition_point(|e| *e <= v)
                .saturating_sub(1)
                .min(n_bins - 1)
        };
        counts[idx] += 1;
    }

    let bins = edges
        .windows(2)
        .zip(counts)
        .map(|(w, count)| HistogramBin {
            bin_start: w[0],
            bin_end: w[1],
            count,
        })
        .collect();
    Ok(Histogram {
        bins,
        excluded_count: excluded,
    })
}

/// Sum values per key. Non-finite values are skipped. Each key's values are
/// summed in sorted order, so the result does not depend on input order.
pub fn aggregate_by_key<K, I>(records: I) -> BTreeMap<K, f64>
where
    K: Ord,
    I: IntoIterator<Item = (K, f64)>,
{
    let mut grouped: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for (k, v) in records {
        if v.is_finite() {
            grouped.entry(k).or_default().push(v);
        }
    }
    grouped
        .into_iter()
        .map(|(k, mut vals)| {
            vals.sort_by(f64::total_cmp);
            (k, vals.iter().sum())
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: f64,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Descending by value, ties by ascending key.
pub fn rank_desc(entries: &mut [KeyValue]) {
    entries.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.key.cmp(&b.key)));
}

/// The `n` largest entries. When more remain and `other_label` is given, one
/// synthetic entry carrying the remainder's sum is appended.
pub fn top_n(agg: &BTreeMap<String, f64>, n: usize, other_label: Option<&str>) -> Vec<KeyValue> {
    let mut all: Vec<KeyValue> = agg.iter().map(|(k, v)| KeyValue::new(k.clone(), *v)).collect();
    rank_desc(&mut all);
    if all.len() <= n {
        return all;
    }
    let rest = all.split_off(n);
    if let Some(label) = other_label {
        let mut tail: Vec<f64> = rest.iter().map(|kv| kv.value).collect();
        tail.sort_by(f64::total_cmp);
        all.push(KeyValue::new(label, tail.iter().sum()));
    }
    all
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub key: String,
    pub value: f64,
    pub percent: f64,
}

/// Pie input: the slices to draw, and the constituents of the "Other" slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShareBreakdown {
    pub slices: Vec<Share>,
    /// Entries folded into the "Other" slice, largest first.
    pub other: Vec<Share>,
    pub other_label: Option<String>,
    pub total: f64,
}

impl ShareBreakdown {
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

/// Fold entries whose share is below `threshold_pct` into one `other_label`
/// slice. Non-positive and non-finite values are dropped.
pub fn group_small_shares(
    entries: &[KeyValue],
    threshold_pct: f64,
    other_label: &str,
) -> ShareBreakdown {
    let mut kept: Vec<KeyValue> = entries
        .iter()
        .filter(|kv| kv.value.is_finite() && kv.value > 0.0)
        .cloned()
        .collect();
    rank_desc(&mut kept);
    let total: f64 = kept.iter().map(|kv| kv.value).sum();
    if total <= 0.0 {
        return ShareBreakdown::default();
    }
    let mut slices = Vec::new();
    let mut other = Vec::new();
    for kv in kept {
        let percent = kv.value / total * 100.0;
        let share = Share {
            key: kv.key,
            value: kv.value,
            percent,
        };
        if percent < threshold_pct {
            other.push(share);
        } else {
            slices.push(share);
        }
    }
    let other_label = if other.is_empty() {
        None
    } else {
        let value: f64 = other.iter().map(|s| s.value).sum();
        slices.push(Share {
            key: other_label.to_string(),
            value,
            percent: value / total * 100.0,
        });
        Some(other_label.to_string())
    };
    ShareBreakdown {
        slices,
        other,
        other_label,
        total,
    }
}

/// Period granularity for time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodMode {
    Yearly,
    Decade,
    Seasonal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Fall, Season::Winter];

    /// Mar–May spring, Jun–Aug summer, Sep–Nov fall, otherwise winter.
    pub fn from_month(month: u32) -> Season {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Fall,
            _ => Season::Winter,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
            Season::Winter => "Winter",
        }
    }
}

/// One counted event for a time series.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedEvent {
    pub key: String,
    pub year: i32,
    pub month: Option<u32>,
}

impl DatedEvent {
    pub fn new(key: impl Into<String>, year: i32, month: Option<u32>) -> Self {
        Self {
            key: key.into(),
            year,
            month,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub label: String,
    /// Position on the x axis: the year, the decade start, or the season index.
    pub x: f64,
}

/// Contiguous, zero-filled series over a shared period axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSeries {
    pub mode: PeriodMode,
    pub periods: Vec<Period>,
    /// `(key, values)` in key order; every `values` has `periods.len()` entries.
    pub series: Vec<(String, Vec<f64>)>,
    pub cumulative: bool,
}

impl PeriodSeries {
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty() || self.series.is_empty()
    }

    /// Running totals per series. Seasonal series have no time order, so they
    /// are returned unchanged.
    pub fn cumulative(&self) -> PeriodSeries {
        let mut out = self.clone();
        if self.mode == PeriodMode::Seasonal || self.cumulative {
            return out;
        }
        for (_, values) in out.series.iter_mut() {
            let mut acc = 0.0;
            for v in values.iter_mut() {
                acc += *v;
                *v = acc;
            }
        }
        out.cumulative = true;
        out
    }

    /// Largest per-period sum across series (the height of a stacked chart).
    pub fn stacked_max(&self) -> f64 {
        (0..self.periods.len())
            .map(|i| self.series.iter().map(|(_, v)| v[i]).sum::<f64>())
            .fold(0.0, f64::max)
    }
}

/// Count events per key and period. Yearly and decade periods span the full
/// year range of `events` (or `year_range` when given) and are zero-filled;
/// seasonal periods are always the four seasons, and events without a month
/// are skipped in that mode.
pub fn period_series(
    events: &[DatedEvent],
    mode: PeriodMode,
    year_range: Option<(i32, i32)>,
) -> PeriodSeries {
    let keys: BTreeSet<&str> = events.iter().map(|e| e.key.as_str()).collect();
    let range = year_range.or_else(|| {
        let lo = events.iter().map(|e| e.year).min()?;
        let hi = events.iter().map(|e| e.year).max()?;
        Some((lo, hi))
    });

    let periods: Vec<Period> = match (mode, range) {
        (PeriodMode::Seasonal, _) => Season::ALL
            .iter()
            .enumerate()
            .map(|(i, s)| Period {
                label: s.label().to_string(),
                x: i as f64,
            })
            .collect(),
        (_, None) => Vec::new(),
        (PeriodMode::Yearly, Some((lo, hi))) => (lo..=hi)
            .map(|y| Period {
                label: y.to_string(),
                x: y as f64,
            })
            .collect(),
        (PeriodMode::Decade, Some((lo, hi))) => {
            let (d0, d1) = (lo.div_euclid(10) * 10, hi.div_euclid(10) * 10);
            (d0..=d1)
                .step_by(10)
                .map(|d| Period {
                    label: format!("{d}s"),
                    x: d as f64,
                })
                .collect()
        }
    };

    let slot = |e: &DatedEvent| -> Option<usize> {
        match mode {
            PeriodMode::Seasonal => {
                let s = Season::from_month(e.month?);
                Season::ALL.iter().position(|x| *x == s)
            }
            PeriodMode::Yearly => {
                let (lo, hi) = range?;
                (lo..=hi).contains(&e.year).then(|| (e.year - lo) as usize)
            }
            PeriodMode::Decade => {
                let (lo, hi) = range?;
                if !(lo..=hi).contains(&e.year) {
                    return None;
                }
                Some((e.year.div_euclid(10) - lo.div_euclid(10)) as usize)
            }
        }
    };

    let mut series: Vec<(String, Vec<f64>)> = keys
        .iter()
        .map(|k| (k.to_string(), vec![0.0; periods.len()]))
        .collect();
    for e in events {
        let Some(i) = slot(e) else { continue };
        if let Ok(si) = series.binary_search_by(|(k, _)| k.as_str().cmp(e.key.as_str())) {
            series[si].1[i] += 1.0;
        }
    }

    PeriodSeries {
        mode,
        periods,
        series,
        cumulative: false,
    }
}

/// Accidents per hour of day, 24 zero-filled bins. Rows without a usable
/// `HHMM` time are ignored.
pub fn hourly_counts(rows: &[AccidentRow]) -> [usize; 24] {
    let mut out = [0usize; 24];
    for h in rows.iter().filter_map(AccidentRow::hour) {
        out[h as usize] += 1;
    }
    out
}

/// Fatality bucket labels in display order.
pub const SEVERITY_BUCKETS: [&str; 6] = ["0", "1-10", "11-50", "51-100", "101-200", "200+"];

fn severity_index(fatalities: u32) -> usize {
    match fatalities {
        0 => 0,
        1..=10 => 1,
        11..=50 => 2,
        51..=100 => 3,
        101..=200 => 4,
        _ => 5,
    }
}

/// Accident counts per fatality bucket, every bucket present.
pub fn severity_buckets(rows: &[AccidentRow]) -> Vec<KeyValue> {
    let mut counts = [0usize; 6];
    for r in rows {
        counts[severity_index(r.fatalities_count())] += 1;
    }
    SEVERITY_BUCKETS
        .iter()
        .zip(counts)
        .map(|(label, n)| KeyValue::new(*label, n as f64))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SurvivalStats {
    /// Percent of people aboard who survived.
    pub survival_rate: f64,
    pub total_aboard: u64,
    pub total_fatalities: u64,
    pub total_survivors: i64,
    /// Rows with a positive aboard count; only these contribute.
    pub accidents_with_data: usize,
}

pub fn survival_stats(rows: &[AccidentRow]) -> SurvivalStats {
    let mut aboard = 0u64;
    let mut fatal = 0u64;
    let mut with_data = 0usize;
    for r in rows {
        let a = r.aboard_count();
        if a > 0 {
            aboard += a as u64;
            fatal += r.fatalities_count() as u64;
            with_data += 1;
        }
    }
    let survivors = aboard as i64 - fatal as i64;
    SurvivalStats {
        survival_rate: if aboard > 0 {
            survivors as f64 / aboard as f64 * 100.0
        } else {
            0.0
        },
        total_aboard: aboard,
        total_fatalities: fatal,
        total_survivors: survivors,
        accidents_with_data: with_data,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadlineStats {
    pub total_accidents: usize,
    pub total_fatalities: u64,
    /// `(year, accidents)`; the earliest year wins a tie.
    pub peak_year: Option<(i32, usize)>,
    pub year_range: Option<(i32, i32)>,
    pub top_countries: Vec<KeyValue>,
    pub top_aircraft: Vec<KeyValue>,
    pub top_operators: Vec<KeyValue>,
}

/// Accidents per year.
pub fn year_counts(rows: &[AccidentRow]) -> BTreeMap<i32, usize> {
    let mut out = BTreeMap::new();
    for y in rows.iter().filter_map(AccidentRow::effective_year) {
        *out.entry(y).or_insert(0) += 1;
    }
    out
}

fn count_field<'a>(rows: &'a [AccidentRow], f: impl Fn(&'a AccidentRow) -> Option<&'a str>) -> Vec<KeyValue> {
    let counts = aggregate_by_key(rows.iter().filter_map(&f).map(|k| (k.to_string(), 1.0)));
    top_n(&counts, HEADLINE_TOP_N, None)
}

pub fn headline_stats(rows: &[AccidentRow]) -> HeadlineStats {
    let years = year_counts(rows);
    let peak_year = years
        .iter()
        .fold(None::<(i32, usize)>, |best, (y, n)| match best {
            Some((_, bn)) if bn >= *n => best,
            _ => Some((*y, *n)),
        });
    let year_range = match (years.keys().next(), years.keys().next_back()) {
        (Some(lo), Some(hi)) => Some((*lo, *hi)),
        _ => None,
    };
    HeadlineStats {
        total_accidents: rows.len(),
        total_fatalities: rows.iter().map(|r| r.fatalities_count() as u64).sum(),
        peak_year,
        year_range,
        top_countries: count_field(rows, |r| r.operator_country.as_deref()),
        top_aircraft: count_field(rows, |r| r.ac_type.as_deref()),
        top_operators: count_field(rows, |r| r.operator.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantiles_match_r7() {
        let s = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&s, 0.25), 1.75);
        assert_eq!(quantile_sorted(&s, 0.5), 2.5);
        assert_eq!(quantile_sorted(&s, 1.0), 4.0);
        assert_eq!(quantile_sorted(&[7.0], 0.75), 7.0);
    }

    #[test]
    fn linear_edges_widen_single_value() {
        assert_eq!(linear_edges(3.0, 3.0, 1), vec![2.5, 3.5]);
        let e = linear_edges(0.0, 1.0, 3);
        assert_eq!(e.len(), 4);
        assert_eq!(*e.last().unwrap(), 1.0);
    }

    #[test]
    fn severity_edges() {
        assert_eq!(severity_index(0), 0);
        assert_eq!(severity_index(10), 1);
        assert_eq!(severity_index(11), 2);
        assert_eq!(severity_index(200), 4);
        assert_eq!(severity_index(201), 5);
    }
}
