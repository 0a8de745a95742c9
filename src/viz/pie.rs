//! Pie and donut charts over a [`ShareBreakdown`].

use super::axis::Frame;
use super::legend::{LegendItem, legend_marks};
use super::scene::{Anchor, EntityRef, Enter, Fill, Mark, Point, Primitive, Scene, Stroke, TextStyle};
use super::types::{ChartConfig, Tooltip};
use super::util::NumberFormat;
use super::{ChartRenderer, chart_size};
use crate::config::PIE_HOVER_OFFSET;
use crate::interaction::ViewportState;
use crate::scales::{CategoryScale, NO_DATA_COLOR, Rgb, WHITE};
use crate::stats::ShareBreakdown;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::sync::Arc;

/// Slices smaller than this get no in-slice percentage label.
const MIN_LABELED_PCT: f64 = 5.0;
/// Arc flattening step in radians.
const ARC_STEP: f64 = 0.03;

#[derive(Debug, Clone, PartialEq)]
pub struct PieInput {
    pub breakdown: ShareBreakdown,
    /// Scale over the global key universe; the grouped remainder slice is
    /// drawn gray instead.
    pub colors: Arc<CategoryScale>,
    pub value_name: String,
}

impl PieInput {
    pub fn new(breakdown: ShareBreakdown, colors: Arc<CategoryScale>) -> Self {
        Self {
            breakdown,
            colors,
            value_name: "Accidents".to_string(),
        }
    }

    pub fn value_name(mut self, name: &str) -> Self {
        self.value_name = name.to_string();
        self
    }

    pub fn color_of(&self, key: &str) -> Rgb {
        if self.breakdown.other_label.as_deref() == Some(key) {
            NO_DATA_COLOR
        } else {
            self.colors.color(key)
        }
    }
}

#[derive(Debug, Clone)]
pub struct PieRenderer {
    pub config: ChartConfig,
    /// Inner radius as a fraction of the outer one; 0 draws a full pie.
    pub inner_ratio: f64,
}

impl PieRenderer {
    pub fn new(config: ChartConfig) -> Self {
        Self {
            config,
            inner_ratio: 0.0,
        }
    }

    pub fn donut(mut self, inner_ratio: f64) -> Self {
        self.inner_ratio = inner_ratio.clamp(0.0, 0.9);
        self
    }
}

fn polar(c: Point, r: f64, a: f64) -> Point {
    Point::new(c.x + r * a.cos(), c.y + r * a.sin())
}

/// Closed outline of an annular sector from `a0` to `a1` (screen angles).
fn sector(c: Point, r0: f64, r1: f64, a0: f64, a1: f64) -> Vec<Point> {
    let steps = (((a1 - a0) / ARC_STEP).ceil() as usize).max(1);
    let mut pts: Vec<Point> = (0..=steps)
        .map(|i| polar(c, r1, a0 + (a1 - a0) * i as f64 / steps as f64))
        .collect();
    if r0 > 0.0 {
        pts.extend((0..=steps).rev().map(|i| polar(c, r0, a0 + (a1 - a0) * i as f64 / steps as f64)));
    } else if a1 - a0 < TAU - 1e-9 {
        pts.push(c);
    }
    pts
}

impl ChartRenderer for PieRenderer {
    type Input = PieInput;

    fn render(&self, input: &PieInput, view: &ViewportState) -> Scene {
        let size = chart_size(view);
        let b = &input.breakdown;
        if b.is_empty() || b.total <= 0.0 {
            return Scene::no_data(size);
        }
        let fmt = NumberFormat::for_tag(&self.config.locale);
        let legend_labels: Vec<String> = b
            .slices
            .iter()
            .map(|s| format!("{} ({})", s.key, fmt.percent(s.percent)))
            .collect();
        let legend_refs: Vec<&str> = legend_labels.iter().map(String::as_str).collect();
        let frame = Frame::new(&self.config, size, &legend_refs);
        let plot = frame.plot;
        let center = plot.center();
        let outer = (plot.w.min(plot.h) / 2.0 * 0.9).max(1.0);
        let inner = outer * self.inner_ratio;

        let mut scene = Scene::new(size, plot);
        let mut angle = -FRAC_PI_2;
        for s in &b.slices {
            let sweep = s.value / b.total * TAU;
            let (a0, a1) = (angle, angle + sweep);
            angle = a1;
            let entity = EntityRef::Category(s.key.clone());
            let mid = (a0 + a1) / 2.0;
            let centroid_r = (inner + outer) / 2.0;
            let shift = if view.is_hovered(&entity) {
                Point::new(
                    centroid_r * mid.cos() * PIE_HOVER_OFFSET,
                    centroid_r * mid.sin() * PIE_HOVER_OFFSET,
                )
            } else {
                Point::new(0.0, 0.0)
            };
            let c = Point::new(center.x + shift.x, center.y + shift.y);
            scene.push(
                Mark::data(Primitive::Polygon {
                    rings: vec![sector(c, inner, outer, a0, a1)],
                    fill: Some(Fill::solid(input.color_of(&s.key))),
                    stroke: Some(Stroke::new(WHITE, 1.0)),
                })
                .bound(entity)
                .enter(Enter::FadeIn),
            );
            if s.percent >= MIN_LABELED_PCT {
                scene.push(
                    Mark::data(Primitive::Text {
                        at: polar(c, centroid_r, mid),
                        text: fmt.percent(s.percent),
                        style: TextStyle::new(11.0, WHITE).anchor(Anchor::Middle).bold(),
                    })
                    .enter(Enter::FadeIn),
                );
            }
        }

        scene.extend(frame.titles(&self.config));
        if let Some(area) = frame.legend {
            let items: Vec<LegendItem> = b
                .slices
                .iter()
                .zip(legend_labels)
                .map(|(s, label)| {
                    LegendItem::new(label, input.color_of(&s.key))
                        .bound(EntityRef::Category(s.key.clone()))
                })
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

    fn tooltip(&self, input: &PieInput, entity: &EntityRef) -> Option<Tooltip> {
        let EntityRef::Category(key) = entity else {
            return None;
        };
        let b = &input.breakdown;
        let slice = b.slices.iter().find(|s| &s.key == key)?;
        let fmt = NumberFormat::for_tag(&self.config.locale);
        let mut t = Tooltip::new(slice.key.clone())
            .row(input.value_name.clone(), fmt.count(slice.value))
            .row("Share", fmt.percent(slice.percent));
        if b.other_label.as_deref() == Some(key.as_str()) {
            for o in &b.other {
                t = t.row(o.key.clone(), format!("{} ({})", fmt.count(o.value), fmt.percent(o.percent)));
            }
        }
        Some(t)
    }
}
