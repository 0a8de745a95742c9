//! Box plots: one box per `(category, subcategory)` summary.

use super::axis::{Frame, bottom_band_axis, left_axis};
use super::legend::{LegendItem, legend_marks};
use super::scene::{
    EntityRef, Enter, Fill, GrowAxis, Mark, Point, Primitive, Rect, Scene, Stroke,
};
use super::types::{ChartConfig, Tooltip};
use super::util::NumberFormat;
use super::{ChartRenderer, chart_size};
use crate::interaction::ViewportState;
use crate::models::{GroupKey, category_order};
use crate::scales::{BLACK, BandScale, CategoryScale, LinearScale, Rgb};
use crate::stats::SummaryRecord;
use std::sync::Arc;

const OUTLIER_RADIUS: f64 = 3.0;
/// Whisker cap width relative to the box.
const CAP_RATIO: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct BoxPlotInput {
    pub records: Vec<SummaryRecord>,
    /// Box color per category, shared with every other chart drawing the
    /// same categories.
    pub colors: Arc<CategoryScale>,
}

impl Default for BoxPlotInput {
    fn default() -> Self {
        Self::new(Vec::new(), Arc::new(CategoryScale::new(std::iter::empty::<&str>())))
    }
}

impl BoxPlotInput {
    pub fn new(records: Vec<SummaryRecord>, colors: Arc<CategoryScale>) -> Self {
        Self { records, colors }
    }

    /// Records in display order: subcategory (weight class) first, then category.
    fn ordered(&self) -> Vec<&SummaryRecord> {
        let mut out: Vec<&SummaryRecord> = self.records.iter().collect();
        out.sort_by(|a, b| {
            category_order(&a.key.subcategory, &b.key.subcategory)
                .then_with(|| a.key.category.cmp(&b.key.category))
        });
        out
    }

    fn categories(&self) -> Vec<String> {
        let mut cats: Vec<String> = self.records.iter().map(|r| r.key.category.clone()).collect();
        cats.sort();
        cats.dedup();
        cats
    }

    fn color_of(&self, category: &str) -> Rgb {
        self.colors.color(category)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BoxPlotRenderer {
    pub config: ChartConfig,
}

impl BoxPlotRenderer {
    pub fn new(config: ChartConfig) -> Self {
        Self { config }
    }
}

impl ChartRenderer for BoxPlotRenderer {
    type Input = BoxPlotInput;

    fn render(&self, input: &BoxPlotInput, view: &ViewportState) -> Scene {
        let size = chart_size(view);
        if input.records.is_empty() {
            return Scene::no_data(size);
        }
        let categories = input.categories();
        let legend_labels: Vec<&str> = categories.iter().map(String::as_str).collect();
        let frame = Frame::new(&self.config, size, &legend_labels);
        let plot = frame.plot;
        let records = input.ordered();

        let lo = records
            .iter()
            .map(|r| r.summary.min)
            .fold(f64::INFINITY, f64::min)
            .min(0.0);
        let hi = records
            .iter()
            .map(|r| r.summary.max)
            .fold(f64::NEG_INFINITY, f64::max);
        let y = LinearScale::new((lo, hi), (plot.bottom(), plot.y)).nice(self.config.ticks);
        let labels: Vec<String> = records.iter().map(|r| r.key.label()).collect();
        let band = BandScale::new(labels.clone(), (plot.x, plot.right())).padding(0.3, 0.2);

        let mut scene = Scene::new(size, plot);
        scene.extend(left_axis(&y, plot, self.config.ticks, &frame.fmt));
        scene.extend(bottom_band_axis(&band, plot, &labels));

        for (i, rec) in records.iter().enumerate() {
            let s = &rec.summary;
            let entity = EntityRef::Group(rec.key.clone());
            let hovered = view.is_hovered(&entity);
            let color = input.color_of(&rec.key.category);
            let x0 = band.band_start(i);
            let w = band.bandwidth();
            let cx = x0 + w / 2.0;
            let grow = Enter::Grow {
                axis: GrowAxis::Vertical,
                baseline: y.map(s.median),
            };
            let edge = Stroke::new(color.lerp(BLACK, 0.4), if hovered { 2.5 } else { 1.0 });

            scene.push(
                Mark::data(Primitive::Line {
                    from: Point::new(cx, y.map(s.whisker_min)),
                    to: Point::new(cx, y.map(s.whisker_max)),
                    stroke: edge,
                })
                .enter(grow),
            );
            for v in [s.whisker_min, s.whisker_max] {
                let half = w * CAP_RATIO / 2.0;
                scene.push(
                    Mark::data(Primitive::Line {
                        from: Point::new(cx - half, y.map(v)),
                        to: Point::new(cx + half, y.map(v)),
                        stroke: edge,
                    })
                    .enter(grow),
                );
            }
            scene.push(
                Mark::data(Primitive::Rect {
                    rect: Rect::from_corners(
                        Point::new(x0, y.map(s.q3)),
                        Point::new(x0 + w, y.map(s.q1)),
                    ),
                    fill: Some(Fill::with_opacity(color, if hovered { 0.95 } else { 0.75 })),
                    stroke: Some(edge),
                })
                .bound(entity)
                .enter(grow),
            );
            scene.push(
                Mark::data(Primitive::Line {
                    from: Point::new(x0, y.map(s.median)),
                    to: Point::new(x0 + w, y.map(s.median)),
                    stroke: Stroke::new(BLACK, 2.0),
                })
                .enter(grow),
            );
            for &o in &s.outliers {
                scene.push(
                    Mark::data(Primitive::Circle {
                        center: Point::new(cx, y.map(o)),
                        radius: OUTLIER_RADIUS,
                        fill: None,
                        stroke: Some(Stroke::new(color, 1.0)),
                    })
                    .enter(Enter::FadeIn),
                );
            }
        }

        scene.extend(frame.titles(&self.config));
        if let Some(area) = frame.legend {
            let items: Vec<LegendItem> = categories
                .iter()
                .map(|c| LegendItem::new(c.clone(), input.color_of(c)))
                .collect();
            scene.extend(legend_marks(
                &items,
                &self.config.legend_title,
                self.config.legend,
                area,
                plot.x,
            ));
        }
        scene
    }

    fn tooltip(&self, input: &BoxPlotInput, entity: &EntityRef) -> Option<Tooltip> {
        let EntityRef::Group(key) = entity else {
            return None;
        };
        let rec = input.records.iter().find(|r| &r.key == key)?;
        Some(group_tooltip(key, rec, &NumberFormat::for_tag(&self.config.locale)))
    }
}

fn group_tooltip(key: &GroupKey, rec: &SummaryRecord, fmt: &NumberFormat) -> Tooltip {
    let s = &rec.summary;
    let mut t = Tooltip::new(key.label())
        .row("Count", fmt.count(s.count as f64))
        .row("Min", fmt.decimal(s.min, 1))
        .row("Q1", fmt.decimal(s.q1, 1))
        .row("Median", fmt.decimal(s.median, 1))
        .row("Q3", fmt.decimal(s.q3, 1))
        .row("Max", fmt.decimal(s.max, 1))
        .row("Mean", fmt.decimal(s.mean, 1))
        .row("Outliers", fmt.count(s.outliers.len() as f64));
    if s.excluded_count > 0 {
        t = t.row("Excluded", fmt.count(s.excluded_count as f64));
    }
    t
}
