use aviation_dash::geo::FeatureCollection;
use aviation_dash::interaction::ViewportState;
use aviation_dash::layout::Size;
use aviation_dash::models::{BinRow, GroupKey};
use aviation_dash::scales::{CategoryScale, LOG_RAMP, NO_DATA_COLOR};
use aviation_dash::stats::{KeyValue, PeriodMode, group_small_shares, period_series, DatedEvent};
use aviation_dash::viz::scatter::ScatterPoint;
use aviation_dash::viz::scene::{EntityRef, Layer, Primitive};
use aviation_dash::viz::{
    Bar, BarInput, BarRenderer, BoxPlotInput, BoxPlotRenderer, ChartConfig, ChartRenderer,
    ChoroplethInput, ChoroplethRenderer, HistogramInput, HistogramRenderer, LineInput, LineMode,
    LineRenderer, PieInput, PieRenderer, ScatterInput, ScatterRenderer, render_svg_string,
    write_svg,
};
use aviation_dash::{ScaleRegistry, Scene, stats, views};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const WORLD: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"name": "France", "name_long": "French Republic"},
     "geometry": {"type": "Polygon", "coordinates": [[[0,44],[6,44],[6,50],[0,50],[0,44]]]}},
    {"type": "Feature", "properties": {"name": "Germany"},
     "geometry": {"type": "Polygon", "coordinates": [[[6,48],[14,48],[14,54],[6,54],[6,48]]]}},
    {"type": "Feature", "properties": {"name": "Spain"},
     "geometry": {"type": "MultiPolygon", "coordinates": [
        [[[-9,36],[3,36],[3,43],[-9,43],[-9,36]]],
        [[[2,39],[4,39],[4,40],[2,40],[2,39]]]
     ]}},
    {"type": "Feature", "properties": {"name": "Nowhere"}, "geometry": null}
  ]
}"#;

fn view(w: f64, h: f64) -> ViewportState {
    ViewportState::new(Size::new(w, h))
}

fn data_marks(scene: &Scene) -> usize {
    scene.marks.iter().filter(|m| m.layer == Layer::Data).count()
}

fn colors(keys: &[&str]) -> Arc<CategoryScale> {
    Arc::new(CategoryScale::new(keys.iter().copied()))
}

#[test]
fn empty_inputs_render_the_no_data_placeholder() {
    let v = view(800.0, 600.0);
    let scenes = [
        BoxPlotRenderer::new(ChartConfig::default()).render(&BoxPlotInput::default(), &v),
        BarRenderer::new(ChartConfig::default()).render(&BarInput::new(Vec::new()), &v),
        HistogramRenderer::new(ChartConfig::default())
            .render(&HistogramInput::new(std::iter::empty::<&BinRow>()), &v),
        PieRenderer::new(ChartConfig::default())
            .render(&PieInput::new(Default::default(), colors(&[])), &v),
        ScatterRenderer::new(ChartConfig::default())
            .render(&ScatterInput::new(Vec::new(), colors(&[])), &v),
    ];
    for s in &scenes {
        assert_eq!(s.placeholder.as_deref(), Some("No data available"));
        assert_eq!(data_marks(s), 0);
        assert!(s.hit_test(s.size.center()).is_none());
    }
}

#[test]
fn box_plot_draws_one_box_per_group() {
    let mut groups = BTreeMap::new();
    groups.insert(GroupKey::new("crew", "Heavy"), vec![4.0, 5.0, 6.0, 7.0, 30.0]);
    groups.insert(GroupKey::new("crew", "Small"), vec![1.0, 2.0, 2.0, 3.0]);
    groups.insert(GroupKey::new("passengers", "Small"), vec![10.0, 12.0, f64::NAN]);
    let registry = ScaleRegistry::new();
    let input = views::aboard_box_plot(&groups, &registry);
    let r = BoxPlotRenderer::new(ChartConfig::titled("Aboard"));
    let scene = r.render(&input, &view(800.0, 600.0));
    assert!(!scene.is_placeholder());
    assert!(scene.has_entry_animation());

    let boxes = scene
        .marks
        .iter()
        .filter(|m| matches!(m.entity, Some(EntityRef::Group(_))) && m.layer == Layer::Data)
        .count();
    assert_eq!(boxes, 3);
    // one outlier circle (30 in crew-Heavy)
    let circles = scene
        .marks
        .iter()
        .filter(|m| m.layer == Layer::Data && matches!(m.primitive, Primitive::Circle { .. }))
        .count();
    assert_eq!(circles, 1);

    let t = r
        .tooltip(&input, &EntityRef::Group(GroupKey::new("passengers", "Small")))
        .unwrap();
    assert_eq!(t.title, "passengers-Small");
    assert_eq!(t.value_of("Count"), Some("2"));
    assert_eq!(t.value_of("Median"), Some("11.0"));
    assert_eq!(t.value_of("Excluded"), Some("1"));
    let heavy = r
        .tooltip(&input, &EntityRef::Group(GroupKey::new("crew", "Heavy")))
        .unwrap();
    assert_eq!(heavy.value_of("Outliers"), Some("1"));
    assert_eq!(heavy.value_of("Excluded"), None);

    // box fills come from the shared category scale
    let shared = registry.color_scale_for(["passengers", "crew"]);
    assert_eq!(registry.len(), 1);
    let fill = scene
        .marks_for(&EntityRef::Group(GroupKey::new("crew", "Heavy")))
        .find_map(|m| match &m.primitive {
            Primitive::Rect { fill, .. } => *fill,
            _ => None,
        })
        .unwrap();
    assert_eq!(fill.color, shared.color("crew"));
    assert_ne!(shared.color("crew"), shared.color("passengers"));
}

#[test]
fn entry_animation_starts_collapsed_and_ends_settled() {
    let input = BarInput::new(vec![
        Bar::new("a", 10.0, LOG_RAMP[0]),
        Bar::new("b", 20.0, LOG_RAMP[1]),
    ]);
    let scene = BarRenderer::new(ChartConfig::default()).render(&input, &view(800.0, 600.0));
    let start = scene.at_progress(0.0);
    for m in start.marks_for(&EntityRef::Category("b".into())) {
        if let Primitive::Rect { rect, .. } = &m.primitive {
            assert_eq!(rect.h, 0.0);
        }
    }
    assert_eq!(scene.at_progress(1.0), scene);
}

#[test]
fn histogram_bins_are_hoverable_with_tooltips() {
    let rows = vec![
        BinRow {
            bin_start: 10.0,
            bin_end: 20.0,
            accident_count: 5.0,
        },
        BinRow {
            bin_start: 0.0,
            bin_end: 10.0,
            accident_count: 12.0,
        },
    ];
    let input = views::wingspan_histogram(&rows);
    assert_eq!(input.bins[0].start, 0.0);
    let r = HistogramRenderer::new(ChartConfig::default());
    let scene = r.render(&input, &view(800.0, 600.0));
    let bins: Vec<_> = scene
        .marks
        .iter()
        .filter_map(|m| match m.entity {
            Some(EntityRef::Bin(i)) => Some(i),
            _ => None,
        })
        .collect();
    assert_eq!(bins, vec![0, 1]);
    let t = r.tooltip(&input, &EntityRef::Bin(0)).unwrap();
    assert_eq!(t.title, "0.0–10.0 m");
    assert_eq!(t.value_of("Accidents"), Some("12"));
}

#[test]
fn vertical_bars_use_band_positions_in_input_order() {
    let input = BarInput::new(vec![
        Bar::new("x", 3.0, LOG_RAMP[0]),
        Bar::new("y", 9.0, LOG_RAMP[1]),
        Bar::new("z", 6.0, LOG_RAMP[2]),
    ]);
    let scene = BarRenderer::new(ChartConfig::default()).render(&input, &view(600.0, 400.0));
    let rect_of = |k: &str| {
        scene
            .marks_for(&EntityRef::Category(k.into()))
            .find_map(|m| match &m.primitive {
                Primitive::Rect { rect, .. } => Some(*rect),
                _ => None,
            })
            .unwrap()
    };
    let (x, y, z) = (rect_of("x"), rect_of("y"), rect_of("z"));
    assert!(x.x < y.x && y.x < z.x);
    assert!(y.h > z.h && z.h > x.h);
    // all bars share the baseline
    assert!((x.bottom() - y.bottom()).abs() < 1e-9);
    let hit = scene.hit_test(y.center());
    assert_eq!(hit, Some(&EntityRef::Category("y".into())));
}

#[test]
fn pie_folds_small_slices_and_explains_them() {
    let entries = vec![
        KeyValue::new("Weather", 60.0),
        KeyValue::new("Fire", 39.0),
        KeyValue::new("Sabotage", 1.0),
    ];
    let breakdown = group_small_shares(&entries, 1.5, "Other");
    let input = PieInput::new(breakdown, colors(&["Weather", "Fire", "Sabotage"]));
    assert_eq!(input.color_of("Other"), NO_DATA_COLOR);
    let r = PieRenderer::new(ChartConfig::default());
    let scene = r.render(&input, &view(800.0, 600.0));
    let slices: BTreeSet<String> = scene
        .marks
        .iter()
        .filter(|m| m.layer == Layer::Data)
        .filter_map(|m| match &m.entity {
            Some(EntityRef::Category(k)) => Some(k.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(slices.len(), 3);
    assert!(slices.contains("Other"));
    let t = r.tooltip(&input, &EntityRef::Category("Other".into())).unwrap();
    assert_eq!(t.value_of("Share"), Some("1.0%"));
    assert_eq!(t.value_of("Sabotage"), Some("1 (1.0%)"));
}

#[test]
fn stacked_area_tooltip_reports_the_period_total() {
    let events = vec![
        DatedEvent::new("A", 2000, None),
        DatedEvent::new("A", 2001, None),
        DatedEvent::new("B", 2001, None),
        DatedEvent::new("B", 2001, None),
    ];
    let series = period_series(&events, PeriodMode::Yearly, None);
    let input = LineInput::new(series, colors(&["A", "B"]), LineMode::StackedArea);
    let r = LineRenderer::new(ChartConfig::default());
    let scene = r.render(&input, &view(800.0, 600.0));
    let markers = scene
        .marks
        .iter()
        .filter(|m| matches!(m.entity, Some(EntityRef::SeriesPoint { .. })))
        .count();
    assert_eq!(markers, 4);
    let t = r
        .tooltip(
            &input,
            &EntityRef::SeriesPoint {
                series: "B".into(),
                period: 1,
            },
        )
        .unwrap();
    assert_eq!(t.title, "B · 2001");
    assert_eq!(t.value_of("Accidents"), Some("2"));
    assert_eq!(t.value_of("All series"), Some("3"));
}

#[test]
fn scatter_hides_inactive_points_but_keeps_axes() {
    let pts = vec![
        ScatterPoint::new(0.0, 0.0, "a"),
        ScatterPoint::new(1.0, 1.0, "b"),
        ScatterPoint::new(2.0, 4.0, "b"),
        ScatterPoint::new(f64::NAN, 1.0, "a"),
    ];
    let all = ScatterInput::new(pts, colors(&["a", "b"]));
    assert_eq!(all.points.len(), 3);
    let only_b = all.clone().visible(["b".to_string()].into_iter().collect());
    assert_eq!(all.domains(), only_b.domains());

    let r = ScatterRenderer::new(ChartConfig::default());
    let scene = r.render(&only_b, &view(800.0, 600.0));
    let shown = scene
        .marks
        .iter()
        .filter(|m| matches!(m.entity, Some(EntityRef::Point(_))))
        .count();
    assert_eq!(shown, 2);
    let footer = scene.marks.iter().any(|m| {
        matches!(&m.primitive, Primitive::Text { text, .. } if text == "Showing 2 of 3 data points")
    });
    assert!(footer);

    let none = all.visible(BTreeSet::new());
    assert!(r.render(&none, &view(800.0, 600.0)).is_placeholder());
    assert_eq!(r.zoom_extent(), Some((0.5, 20.0)));
    assert!(r.selectable());
}

#[test]
fn zoomed_points_outside_the_plot_are_clipped() {
    let pts = (0..10).map(|i| ScatterPoint::new(i as f64, i as f64, "a")).collect();
    let input = ScatterInput::new(pts, colors(&["a"]));
    let r = ScatterRenderer::new(ChartConfig::default());
    let mut v = view(800.0, 600.0);
    let plot = r.render(&input, &v).plot_area;
    let c = plot.center();
    // 3x around the plot center
    v.zoom.k = 3.0;
    v.zoom.x = c.x * -2.0;
    v.zoom.y = c.y * -2.0;
    let scene = r.render(&input, &v);
    let (inside, outside): (Vec<_>, Vec<_>) = scene
        .marks
        .iter()
        .filter(|m| m.layer == Layer::Data)
        .filter_map(|m| match m.primitive {
            Primitive::Circle { center, .. } => Some(center),
            _ => None,
        })
        .partition(|c| plot.contains(*c));
    assert!(!inside.is_empty());
    assert!(!outside.is_empty());
    // only the out-of-plot circles are dropped
    assert_eq!(scene.visible_primitives().len(), scene.marks.len() - outside.len());
    for c in outside {
        assert!(scene.hit_test(c).is_none());
    }
}

#[test]
fn choropleth_colors_by_log_count_and_greys_missing_countries() {
    let features = Arc::new(FeatureCollection::from_json_str(WORLD).unwrap());
    assert_eq!(features.features.len(), 3);
    let input = ChoroplethInput::new(
        Arc::clone(&features),
        [("france", 120.0), ("Germany", 30.0), ("Atlantis", 7.0)],
    );
    let scale = input.color_scale();
    let by_name = |n: &str| features.features.iter().find(|f| f.name == n).unwrap();
    assert_eq!(input.fill_for(by_name("France"), &scale), LOG_RAMP[2]);
    assert_eq!(input.fill_for(by_name("Spain"), &scale), NO_DATA_COLOR);
    let de = input.fill_for(by_name("Germany"), &scale);
    assert_ne!(de, LOG_RAMP[2]);
    assert_ne!(de, NO_DATA_COLOR);

    let r = ChoroplethRenderer::new(ChartConfig::titled("Countries"));
    let scene = r.render(&input, &view(800.0, 600.0));
    let regions: Vec<&EntityRef> = scene
        .marks
        .iter()
        .filter(|m| m.layer == Layer::Data)
        .filter_map(|m| m.entity.as_ref())
        .collect();
    assert_eq!(regions.len(), 3);
    let t = r.tooltip(&input, &EntityRef::Region("Spain".into())).unwrap();
    assert_eq!(t.value_of("Accidents"), Some("No data"));
    let t = r.tooltip(&input, &EntityRef::Region("France".into())).unwrap();
    assert_eq!(t.value_of("Accidents"), Some("120"));
}

#[test]
fn choropleth_without_boundaries_is_a_placeholder() {
    let input = ChoroplethInput::new(Arc::default(), [("France", 3.0)]);
    let scene = ChoroplethRenderer::new(ChartConfig::default()).render(&input, &view(800.0, 600.0));
    assert!(scene.is_placeholder());
}

#[test]
fn geojson_without_features_is_rejected() {
    assert!(FeatureCollection::from_json_str(r#"{"type": "Feature"}"#).is_err());
    assert!(FeatureCollection::from_json_str("not json").is_err());
}

#[test]
fn scenes_render_to_svg() {
    let input = views::severity_bars(&[]);
    let empty = BarRenderer::new(ChartConfig::default()).render(&input, &view(640.0, 480.0));
    let svg = render_svg_string(&empty).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains("No data available"));

    let h = stats::bin_values(&[1.0, 2.0, 2.5, 7.0], &stats::BinSpec::Count(3)).unwrap();
    let input = HistogramInput::new(&h.bins);
    let scene = HistogramRenderer::new(ChartConfig::titled("Values")).render(&input, &view(640.0, 480.0));
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("hist.svg");
    write_svg(&scene, &out).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("<svg"));
    assert!(text.contains("Values"));
}
