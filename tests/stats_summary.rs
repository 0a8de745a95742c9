use aviation_dash::error::ChartError;
use aviation_dash::models::{AccidentRow, GroupKey};
use aviation_dash::stats::{
    BinSpec, DatedEvent, KeyValue, PeriodMode, aggregate_by_key, bin_values, group_small_shares,
    headline_stats, hourly_counts, period_series, severity_buckets, summarize_distribution,
    summarize_groups, survival_stats, top_n,
};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn row(year: i32, date: &str, time: &str, country: &str, fatalities: &str, aboard: &str) -> AccidentRow {
    AccidentRow {
        year: Some(year),
        date: Some(date.into()),
        time: Some(time.into()),
        operator_country: Some(country.into()),
        fatalities: Some(fatalities.into()),
        aboard: Some(aboard.into()),
        ..Default::default()
    }
}

#[test]
fn quartiles_for_ten_values() {
    let v = [10.0, 12.0, 15.0, 8.0, 14.0, 11.0, 13.0, 9.0, 16.0, 12.0];
    let s = summarize_distribution(&v).unwrap();
    assert_eq!(s.count, 10);
    assert_eq!(s.median, 12.0);
    assert!((s.q1 - 10.25).abs() < 1e-12);
    assert!((s.q3 - 13.75).abs() < 1e-12);
    assert!(s.outliers.is_empty());
    assert_eq!((s.whisker_min, s.whisker_max), (8.0, 16.0));
    assert_eq!((s.min, s.max), (8.0, 16.0));
}

#[test]
fn extreme_value_is_an_outlier_and_whisker_is_clamped() {
    let s = summarize_distribution(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
    // q1 = 2, q3 = 4, IQR = 2, upper fence = 7
    assert_eq!(s.outliers, vec![100.0]);
    assert_eq!(s.whisker_max, 7.0);
    assert_eq!(s.whisker_min, 1.0);
    assert_eq!(s.max, 100.0);
}

#[test]
fn single_value_collapses_the_box() {
    let s = summarize_distribution(&[42.0]).unwrap();
    assert_eq!((s.min, s.q1, s.median, s.q3, s.max), (42.0, 42.0, 42.0, 42.0, 42.0));
    assert!(s.outliers.is_empty());
}

#[test]
fn non_finite_values_are_excluded_and_counted() {
    let s = summarize_distribution(&[1.0, f64::NAN, 3.0, f64::INFINITY]).unwrap();
    assert_eq!(s.count, 2);
    assert_eq!(s.excluded_count, 2);
    assert_eq!(s.median, 2.0);
}

#[test]
fn empty_input_is_an_error() {
    assert!(matches!(
        summarize_distribution(&[]),
        Err(ChartError::EmptyInput { excluded: 0 })
    ));
    assert!(matches!(
        summarize_distribution(&[f64::NAN]),
        Err(ChartError::EmptyInput { excluded: 1 })
    ));
}

#[test]
fn grouped_summaries_skip_empty_groups() {
    let mut groups = BTreeMap::new();
    groups.insert(GroupKey::new("crew", "Small"), vec![2.0, 3.0, 4.0]);
    groups.insert(GroupKey::new("crew", "Heavy"), vec![]);
    groups.insert(GroupKey::new("passengers", "Small"), vec![f64::NAN]);
    let got = summarize_groups(&groups);
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].key, GroupKey::new("crew", "Small"));
    assert_eq!(got[0].summary.median, 3.0);
}

#[test]
fn bins_are_half_open_with_closed_last_bin() {
    let h = bin_values(&[0.0, 5.0, 10.0, 15.0, 20.0], &BinSpec::Edges(vec![0.0, 10.0, 20.0])).unwrap();
    let counts: Vec<usize> = h.bins.iter().map(|b| b.count).collect();
    // 10 starts the second bin, 20 closes the last one
    assert_eq!(counts, vec![2, 3]);
    assert_eq!(h.excluded_count, 0);
}

#[test]
fn values_outside_edges_are_excluded() {
    let h = bin_values(&[-1.0, 1.0, 2.0, 30.0, f64::NAN], &BinSpec::Edges(vec![0.0, 5.0, 10.0])).unwrap();
    assert_eq!(h.total(), 2);
    assert_eq!(h.excluded_count, 3);
    assert_eq!(h.bins[1].count, 0);
}

#[test]
fn count_spec_covers_the_value_range() {
    let h = bin_values(&[1.0, 2.0, 3.0, 4.0], &BinSpec::Count(3)).unwrap();
    assert_eq!(h.bins.len(), 3);
    assert_eq!(h.bins[0].bin_start, 1.0);
    assert_eq!(h.bins[2].bin_end, 4.0);
    assert_eq!(h.total(), 4);
}

#[test]
fn count_spec_handles_extreme_finite_values() {
    let h = bin_values(&[-1e308, 1e308], &BinSpec::Count(2)).unwrap();
    let counts: Vec<usize> = h.bins.iter().map(|b| b.count).collect();
    assert_eq!(counts, [1, 1]);
    assert_eq!(h.bins[0].bin_start, -1e308);
    assert_eq!(h.bins[1].bin_end, 1e308);

    let h = bin_values(&[f64::MIN, 0.0, f64::MAX], &BinSpec::Count(3)).unwrap();
    assert_eq!(h.total(), 3);
    assert_eq!(h.excluded_count, 0);
    assert_eq!(h.bins[1].count, 1);
    for b in &h.bins {
        assert!(b.bin_start.is_finite() && b.bin_end.is_finite());
        assert!(b.bin_start < b.bin_end);
    }

    let h = bin_values(&[f64::MIN, f64::MAX], &BinSpec::Count(1)).unwrap();
    assert_eq!(h.bins[0].count, 2);
}

#[test]
fn malformed_bin_specs_are_rejected() {
    assert!(matches!(
        bin_values(&[1.0], &BinSpec::Edges(vec![1.0])),
        Err(ChartError::InvalidBins(_))
    ));
    assert!(matches!(
        bin_values(&[1.0], &BinSpec::Edges(vec![0.0, 2.0, 1.0])),
        Err(ChartError::InvalidBins(_))
    ));
    assert!(matches!(
        bin_values(&[1.0], &BinSpec::Count(0)),
        Err(ChartError::InvalidBins(_))
    ));
    assert!(matches!(
        bin_values(&[], &BinSpec::Count(4)),
        Err(ChartError::EmptyInput { .. })
    ));
}

#[test]
fn top_n_appends_remainder() {
    let agg: BTreeMap<String, f64> = [("A", 10.0), ("B", 8.0), ("C", 6.0), ("D", 4.0), ("E", 2.0), ("F", 1.0)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    let got = top_n(&agg, 5, Some("Other"));
    assert_eq!(got.len(), 6);
    assert_eq!(got[5], KeyValue::new("Other", 1.0));
    let sum: f64 = got.iter().map(|kv| kv.value).sum();
    assert_eq!(sum, 31.0);

    let plain = top_n(&agg, 2, None);
    assert_eq!(plain.iter().map(|kv| kv.key.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);
}

#[test]
fn top_n_ties_break_by_key() {
    let agg: BTreeMap<String, f64> = [("b", 1.0), ("a", 1.0), ("c", 2.0)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    let keys: Vec<String> = top_n(&agg, 3, None).into_iter().map(|kv| kv.key).collect();
    assert_eq!(keys, vec!["c", "a", "b"]);
}

#[test]
fn aggregate_skips_non_finite() {
    let agg = aggregate_by_key([("a", 1.0), ("a", f64::NAN), ("b", 2.0), ("a", 2.5)]);
    assert_eq!(agg["a"], 3.5);
    assert_eq!(agg["b"], 2.0);
}

#[test]
fn small_shares_fold_into_other() {
    let entries = vec![
        KeyValue::new("big", 90.0),
        KeyValue::new("mid", 9.0),
        KeyValue::new("tiny", 0.6),
        KeyValue::new("tinier", 0.4),
        KeyValue::new("zero", 0.0),
    ];
    let b = group_small_shares(&entries, 1.5, "Other");
    let keys: Vec<&str> = b.slices.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, vec!["big", "mid", "Other"]);
    assert_eq!(b.other_label.as_deref(), Some("Other"));
    assert_eq!(b.other.len(), 2);
    assert_eq!(b.other[0].key, "tiny");
    assert!((b.slices[2].value - 1.0).abs() < 1e-12);
    assert!((b.total - 100.0).abs() < 1e-9);
}

#[test]
fn yearly_series_is_zero_filled() {
    let events = vec![
        DatedEvent::new("A", 2000, Some(1)),
        DatedEvent::new("A", 2002, Some(7)),
        DatedEvent::new("B", 2002, None),
    ];
    let s = period_series(&events, PeriodMode::Yearly, None);
    let labels: Vec<&str> = s.periods.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec!["2000", "2001", "2002"]);
    assert_eq!(s.series[0], ("A".to_string(), vec![1.0, 0.0, 1.0]));
    assert_eq!(s.series[1], ("B".to_string(), vec![0.0, 0.0, 1.0]));

    let c = s.cumulative();
    assert_eq!(c.series[0].1, vec![1.0, 1.0, 2.0]);
    assert!(c.cumulative);
    assert_eq!(s.stacked_max(), 2.0);
}

#[test]
fn decade_and_season_periods() {
    let events = vec![
        DatedEvent::new("A", 1987, Some(4)),
        DatedEvent::new("A", 2003, Some(12)),
        DatedEvent::new("A", 1995, None),
    ];
    let d = period_series(&events, PeriodMode::Decade, None);
    let labels: Vec<&str> = d.periods.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec!["1980s", "1990s", "2000s"]);
    assert_eq!(d.series[0].1, vec![1.0, 1.0, 1.0]);

    let s = period_series(&events, PeriodMode::Seasonal, None);
    let labels: Vec<&str> = s.periods.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec!["Spring", "Summer", "Fall", "Winter"]);
    // the undated event is skipped
    assert_eq!(s.series[0].1, vec![1.0, 0.0, 0.0, 1.0]);
    // seasons have no order to accumulate over
    assert_eq!(s.cumulative(), s);
}

#[test]
fn explicit_year_range_widens_axis() {
    let events = vec![DatedEvent::new("A", 2001, None)];
    let s = period_series(&events, PeriodMode::Yearly, Some((1999, 2002)));
    assert_eq!(s.periods.len(), 4);
    assert_eq!(s.series[0].1, vec![0.0, 0.0, 1.0, 0.0]);
}

#[test]
fn raw_row_statistics() {
    let rows = vec![
        row(1970, "March 3, 1970", "1430", "France", "12 (passengers:10 crew:2)", "20 (passengers:16 crew:4)"),
        row(1970, "July 9, 1970", "?", "France", "0 (passengers:0 crew:0)", "5 (passengers:3 crew:2)"),
        row(1971, "May 1, 1971", "0905", "Germany", "250 (passengers:240 crew:10)", "250 (passengers:240 crew:10)"),
    ];
    let h = headline_stats(&rows);
    assert_eq!(h.total_accidents, 3);
    assert_eq!(h.total_fatalities, 262);
    assert_eq!(h.peak_year, Some((1970, 2)));
    assert_eq!(h.year_range, Some((1970, 1971)));
    assert_eq!(h.top_countries[0], KeyValue::new("France", 2.0));

    let s = survival_stats(&rows);
    assert_eq!(s.total_aboard, 275);
    assert_eq!(s.total_survivors, 13);
    assert_eq!(s.accidents_with_data, 3);

    let hours = hourly_counts(&rows);
    assert_eq!(hours[14], 1);
    assert_eq!(hours[9], 1);
    assert_eq!(hours.iter().sum::<usize>(), 2);

    let sev: Vec<f64> = severity_buckets(&rows).iter().map(|kv| kv.value).collect();
    assert_eq!(sev, vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
}

proptest! {
    #[test]
    fn summary_is_ordered_and_partitions_values(v in prop::collection::vec(-1e6f64..1e6, 1..200)) {
        let s = summarize_distribution(&v).unwrap();
        prop_assert!(s.min <= s.q1 && s.q1 <= s.median && s.median <= s.q3 && s.q3 <= s.max);
        let inside = v.iter().filter(|x| **x >= s.whisker_min && **x <= s.whisker_max).count();
        prop_assert_eq!(inside + s.outliers.len(), v.len());
    }

    #[test]
    fn summary_ignores_input_order(mut v in prop::collection::vec(-1e3f64..1e3, 1..100)) {
        let a = summarize_distribution(&v).unwrap();
        v.reverse();
        let b = summarize_distribution(&v).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn binning_conserves_values(
        v in prop::collection::vec(-100f64..100.0, 1..200),
        n in 1usize..30,
    ) {
        let h = bin_values(&v, &BinSpec::Count(n)).unwrap();
        prop_assert_eq!(h.total() + h.excluded_count, v.len());
        prop_assert_eq!(h.excluded_count, 0);
        for w in h.bins.windows(2) {
            prop_assert_eq!(w[0].bin_end, w[1].bin_start);
        }
    }

    #[test]
    fn top_n_preserves_total(
        m in prop::collection::btree_map("[a-h]{1,3}", 0u32..1000, 0..20),
        n in 0usize..10,
    ) {
        let agg: BTreeMap<String, f64> = m.into_iter().map(|(k, v)| (k, v as f64)).collect();
        let got = top_n(&agg, n, Some("Other"));
        let a: f64 = agg.values().sum();
        let b: f64 = got.iter().map(|kv| kv.value).sum();
        prop_assert!((a - b).abs() < 1e-6);
    }
}
