use aviation_dash::error::ChartError;
use aviation_dash::layout::{Margins, ResponsiveLayoutObserver, Size};
use aviation_dash::scales::{
    CATEGORY10, CategoryScale, ColorScaleKind, LOG_RAMP, LinearScale, NO_DATA_COLOR, ScaleRegistry,
    UNKNOWN_COLOR, linear_color_scale, log_color_scale, log_or_linear_color_scale,
};
use std::sync::Arc;

#[test]
fn registry_returns_the_same_scale_for_the_same_universe() {
    let registry = ScaleRegistry::new();
    let a = registry.color_scale_for(["Fire", "Weather", "Mechanical"]);
    let b = registry.color_scale_for(["Mechanical", "Fire", "Weather", "Fire"]);
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(registry.len(), 1);

    let c = registry.color_scale_for(["Fire", "Weather"]);
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(registry.len(), 2);

    registry.clear();
    assert!(registry.is_empty());
}

#[test]
fn key_colors_are_stable_across_calls() {
    let registry = ScaleRegistry::new();
    let universe = ["Weather", "Fire", "Pilot error", "Mechanical"];
    let first: Vec<_> = universe
        .iter()
        .map(|k| registry.color_scale_for(universe).color(k))
        .collect();
    let again: Vec<_> = universe
        .iter()
        .map(|k| registry.color_scale_for(universe.iter().rev()).color(k))
        .collect();
    assert_eq!(first, again);
    // distinct keys, distinct colors
    let mut dedup = first.clone();
    dedup.sort_by_key(|c| (c.0, c.1, c.2));
    dedup.dedup();
    assert_eq!(dedup.len(), first.len());
}

#[test]
fn colors_are_positional_over_sorted_keys() {
    let s = CategoryScale::new(["b", "a", "c"]);
    assert_eq!(s.keys(), ["a", "b", "c"]);
    assert_eq!(s.color("a"), CATEGORY10[0]);
    assert_eq!(s.color("c"), CATEGORY10[2]);
    assert_eq!(s.get("zzz"), None);
    assert_eq!(s.color("zzz"), UNKNOWN_COLOR);
}

#[test]
fn log_scale_requires_positive_domain() {
    assert!(matches!(
        log_color_scale(0.0, 100.0),
        Err(ChartError::InvalidDomain { .. })
    ));
    assert!(matches!(
        log_color_scale(10.0, 1.0),
        Err(ChartError::InvalidDomain { .. })
    ));
    let s = log_color_scale(1.0, 120.0).unwrap();
    assert_eq!(s.kind(), ColorScaleKind::Log);
    assert_eq!(s.color(120.0), LOG_RAMP[2]);
    assert_eq!(s.color(1.0), LOG_RAMP[0]);
    // log midpoint of [1, 100] is 10
    let mid = log_color_scale(1.0, 100.0).unwrap();
    assert!((mid.normalize(10.0) - 0.5).abs() < 1e-12);
    assert_eq!(mid.color(f64::NAN), NO_DATA_COLOR);
}

#[test]
fn unusable_log_domain_falls_back_to_linear() {
    let s = log_or_linear_color_scale(0.0, 50.0);
    assert_eq!(s.kind(), ColorScaleKind::Linear);
    assert_eq!(s.domain(), (0.0, 50.0));
    assert_eq!(linear_color_scale(9.0, 3.0).domain(), (3.0, 9.0));
}

#[test]
fn linear_scale_maps_and_inverts() {
    let s = LinearScale::new((0.0, 10.0), (500.0, 100.0));
    assert_eq!(s.map(0.0), 500.0);
    assert_eq!(s.map(5.0), 300.0);
    assert_eq!(s.invert(100.0), 10.0);
    let t = LinearScale::new((0.0, 1.0), (0.0, 1.0)).ticks(5);
    assert_eq!(t.len(), 6);
    assert_eq!(t.first().copied(), Some(0.0));
}

#[test]
fn margins_scale_within_bounds() {
    let base = Margins::new(40.0, 20.0, 40.0, 80.0);
    let small = base.scaled_to(Size::new(100.0, 100.0));
    assert_eq!(small.left, 60.0);
    assert_eq!(small.top, 30.0);
    let huge = base.scaled_to(Size::new(4000.0, 4000.0));
    assert_eq!(huge.left, 120.0);
    assert_eq!(huge.top, 60.0);
    let same = base.scaled_to(Size::new(800.0, 600.0));
    assert_eq!(same, base);
}

#[test]
fn inner_plot_never_collapses() {
    let plot = Margins::new(100.0, 100.0, 100.0, 100.0).inner(Size::new(150.0, 150.0));
    assert_eq!(plot.w, 1.0);
    assert_eq!(plot.h, 1.0);
}

#[test]
fn first_observation_applies_immediately() {
    let mut obs = ResponsiveLayoutObserver::default();
    assert_eq!(obs.observe(Size::new(800.0, 600.0), 0.0), Some(Size::new(800.0, 600.0)));
    assert_eq!(obs.current(), Some(Size::new(800.0, 600.0)));
}

#[test]
fn resize_burst_settles_once() {
    let mut obs = ResponsiveLayoutObserver::default();
    obs.observe(Size::new(800.0, 600.0), 0.0);
    for (i, w) in [700.0, 600.0, 500.0, 400.0].iter().enumerate() {
        assert_eq!(obs.observe(Size::new(*w, 300.0), 1.0 + i as f64 * 0.02), None);
        assert_eq!(obs.poll(1.0 + i as f64 * 0.02 + 0.01), None);
    }
    assert!(obs.is_settling());
    assert_eq!(obs.poll(1.2), Some(Size::new(400.0, 300.0)));
    assert_eq!(obs.poll(1.5), None);
    assert!(!obs.is_settling());
}

#[test]
fn unchanged_size_does_not_emit() {
    let mut obs = ResponsiveLayoutObserver::default();
    obs.observe(Size::new(800.0, 600.0), 0.0);
    obs.observe(Size::new(800.0, 600.0), 1.0);
    assert_eq!(obs.poll(2.0), None);
}

#[test]
fn tiny_containers_are_clamped_to_minimum() {
    let mut obs = ResponsiveLayoutObserver::default();
    assert_eq!(obs.observe(Size::new(10.0, f64::NAN), 0.0), Some(Size::MIN_CHART));
    obs.observe(Size::new(1200.0, 50.0), 0.5);
    assert_eq!(obs.poll(0.7), Some(Size::new(1200.0, 200.0)));
}
