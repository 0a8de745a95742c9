use aviation_dash::dashboard::{
    DashboardChart, PrepareContext, View, ViewData, ViewInput, ViewParams, prepare, render_view,
};
use aviation_dash::geo::FeatureCollection;
use aviation_dash::interaction::{ActiveSet, Redraw};
use aviation_dash::layout::Size;
use aviation_dash::pipeline::{LoadState, Snapshot};
use aviation_dash::scales::{INACTIVE_COLOR, NO_DATA_COLOR, UNKNOWN_COLOR};
use aviation_dash::stats::PeriodMode;
use aviation_dash::viz::scene::{EntityRef, Layer, Primitive};
use aviation_dash::viz::{ChartConfig, ChartRenderer, PieRenderer};
use aviation_dash::{FileSource, ScaleRegistry, Scene, views};
use std::path::PathBuf;
use std::sync::Arc;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn has_text(scene: &Scene, needle: &str) -> bool {
    scene
        .marks
        .iter()
        .any(|m| matches!(&m.primitive, Primitive::Text { text, .. } if text == needle))
}

#[test]
fn view_names_round_trip() {
    for v in View::ALL {
        assert_eq!(v.name().parse::<View>(), Ok(v));
        assert_eq!(v.to_string(), v.name());
    }
    assert_eq!(" Country-Ranking ".parse::<View>(), Ok(View::CountryRanking));
    let err = "pie".parse::<View>().unwrap_err();
    assert!(err.contains("expected one of"), "{err}");
}

#[test]
fn every_view_renders_from_fixtures() {
    let src = FileSource::new(fixtures());
    let features = Arc::new(FeatureCollection::from_path(fixtures().join("world.geojson")).unwrap());
    let registry = ScaleRegistry::new();
    let params = ViewParams::default();
    let ctx = PrepareContext {
        registry: &registry,
        features: Some(features),
        params: &params,
    };
    for v in View::ALL {
        let data = v.fetch(&src, &params).unwrap();
        let scene = render_view(v, &data, &ctx, Size::new(900.0, 600.0));
        assert!(!scene.is_placeholder(), "{v} rendered a placeholder");
        assert!(has_text(&scene, v.title()), "{v} lacks its title");
        let bound = scene
            .marks
            .iter()
            .filter(|m| m.layer == Layer::Data && m.entity.is_some())
            .count();
        assert!(bound > 0, "{v} has nothing to hover");
    }
}

#[test]
fn countries_without_boundaries_show_no_data() {
    let src = FileSource::new(fixtures());
    let registry = ScaleRegistry::new();
    let params = ViewParams::default();
    let ctx = PrepareContext {
        registry: &registry,
        features: None,
        params: &params,
    };
    let data = View::Countries.fetch(&src, &params).unwrap();
    let scene = render_view(View::Countries, &data, &ctx, Size::new(800.0, 600.0));
    assert_eq!(scene.placeholder.as_deref(), Some("No data available"));
}

#[test]
fn mismatched_payload_prepares_nothing() {
    let registry = ScaleRegistry::new();
    let params = ViewParams::default();
    let ctx = PrepareContext {
        registry: &registry,
        features: None,
        params: &params,
    };
    let data = ViewData::Bins(Vec::new());
    assert!(prepare(View::Engines, &data, &ctx).is_none());
    assert!(matches!(
        prepare(View::Wingspan, &data, &ctx),
        Some(ViewInput::Histogram(_))
    ));
    // a chart fed the wrong payload draws the empty state
    let scene = render_view(View::Engines, &data, &ctx, Size::new(800.0, 600.0));
    assert!(scene.is_placeholder());
}

#[test]
fn manufacturer_share_defaults_to_latest_year() {
    let src = FileSource::new(fixtures());
    let registry = ScaleRegistry::new();
    let params = ViewParams::default();
    let ctx = PrepareContext {
        registry: &registry,
        features: None,
        params: &params,
    };
    let data = View::ManufacturerShare.fetch(&src, &params).unwrap();
    let Some(ViewInput::Pie(pie)) = prepare(View::ManufacturerShare, &data, &ctx) else {
        panic!("expected a pie");
    };
    let keys: Vec<&str> = pie.breakdown.slices.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, ["Airbus", "Boeing", "Embraer"]);
    assert!((pie.breakdown.total - 27.0).abs() < 1e-9);
    assert_ne!(pie.color_of("Embraer"), UNKNOWN_COLOR);
}

#[test]
fn manufacturer_share_folds_the_tail_into_others() {
    let rows = vec![aviation_dash::models::ManufacturerYearRow {
        year: 2000,
        counts: (1..=7).map(|i| (format!("M{i}"), i as f64)).collect(),
    }];
    let registry = ScaleRegistry::new();
    let pie = views::manufacturer_share_pie(&rows, 2000, &registry);
    let keys: Vec<&str> = pie.breakdown.slices.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, ["M7", "M6", "M5", "M4", "M3", "Others"]);
    assert_eq!(pie.breakdown.slices[5].value, 3.0);
    assert_eq!(pie.color_of("Others"), NO_DATA_COLOR);

    let tip = PieRenderer::new(ChartConfig::titled("Share"))
        .tooltip(&pie, &EntityRef::Category("Others".into()))
        .unwrap();
    assert_eq!(tip.value_of("M2"), Some("2 (7.1%)"));
    assert_eq!(tip.value_of("M1"), Some("1 (3.6%)"));
    assert_eq!(tip.value_of("M3"), None);
}

#[test]
fn temporal_trends_follow_the_active_clusters() {
    let src = FileSource::new(fixtures());
    let data = View::TemporalTrends.fetch(&src, &ViewParams::default()).unwrap();
    let ViewData::Clusters(clusters) = &data else {
        panic!("expected cluster data");
    };
    let mut active = ActiveSet::all(views::cluster_universe(clusters));
    active.toggle("Weather");
    let params = ViewParams {
        period: PeriodMode::Decade,
        clusters: Some(active),
        ..ViewParams::default()
    };
    let registry = ScaleRegistry::new();
    let ctx = PrepareContext {
        registry: &registry,
        features: None,
        params: &params,
    };
    let Some(ViewInput::Line(line)) = prepare(View::TemporalTrends, &data, &ctx) else {
        panic!("expected lines");
    };
    let series: Vec<&str> = line.series.series.iter().map(|(k, _)| k.as_str()).collect();
    assert!(!series.contains(&"Weather"));
    // decades still span 1970..2001 from every cluster
    let labels: Vec<&str> = line.series.periods.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels.first().copied(), Some("1970s"));
    assert_eq!(labels.last().copied(), Some("2000s"));
}

#[test]
fn cluster_filter_change_rerenders_without_replaying_entry() {
    let src = FileSource::new(fixtures());
    let view = View::ClusterDistribution;
    let data = view.fetch(&src, &ViewParams::default()).unwrap();
    let universe = match &data {
        ViewData::Clusters(d) => views::cluster_universe(d),
        _ => panic!("expected cluster data"),
    };
    let state = LoadState::Ready(Snapshot {
        id: 7,
        data: Arc::new(data),
    });
    let registry = ScaleRegistry::new();
    let mut chart = DashboardChart::new(view, Size::new(800.0, 600.0), "en");

    let mut params = ViewParams {
        clusters: Some(ActiveSet::all(universe)),
        ..ViewParams::default()
    };
    let ctx = PrepareContext {
        registry: &registry,
        features: None,
        params: &params,
    };
    assert_eq!(chart.sync(view, &state, 0, &ctx, 0.0), Redraw::Full);
    assert!(chart.interactive().is_animating(0.1));
    assert_eq!(chart.sync(view, &state, 0, &ctx, 1.0), Redraw::None);

    if let Some(set) = params.clusters.as_mut() {
        set.toggle("Weather");
    }
    let ctx = PrepareContext {
        registry: &registry,
        features: None,
        params: &params,
    };
    assert_eq!(chart.sync(view, &state, 1, &ctx, 2.0), Redraw::Full);
    assert!(!chart.interactive().is_animating(2.0));
    let weather = chart
        .final_scene()
        .marks_for(&EntityRef::Category("Weather".into()))
        .find_map(|m| match &m.primitive {
            Primitive::Rect { fill, .. } if m.layer == Layer::Data => *fill,
            _ => None,
        })
        .unwrap();
    assert_eq!(weather.color, INACTIVE_COLOR);
    // one shared color scale across both renders
    assert_eq!(registry.len(), 1);
}

#[test]
fn yearly_accidents_fill_gap_years_with_zero() {
    let row = |y: i32| aviation_dash::models::AccidentRow {
        year: Some(y),
        ..Default::default()
    };
    let rows = [row(2000), row(2002), row(2002)];
    let registry = ScaleRegistry::new();
    let line = views::yearly_accidents(&rows, &registry);
    let labels: Vec<&str> = line.series.periods.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, ["2000", "2001", "2002"]);
    assert_eq!(line.series.series.len(), 1);
    assert_eq!(line.series.series[0].1, [1.0, 0.0, 2.0]);

    assert!(views::yearly_accidents(&[], &registry).series.is_empty());
}
