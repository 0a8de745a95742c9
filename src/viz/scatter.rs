//! Scatterplot with a zoomable, clipped point layer and click-to-select.

use super::axis::{Frame, bottom_axis, left_axis};
use super::legend::{LegendItem, legend_marks};
use super::scene::{
    Anchor, EntityRef, Enter, Fill, Mark, Point, Primitive, Scene, Stroke, TextStyle,
};
use super::text::truncate;
use super::types::{ChartConfig, Tooltip};
use super::util::NumberFormat;
use super::{ChartRenderer, chart_size};
use crate::config::{
    POINT_OPACITY, POINT_RADIUS, POINT_RADIUS_HOVER, SCATTER_DOMAIN_PADDING,
    SCATTER_ZOOM_EXTENT, SELECTION_STROKE_WIDTH,
};
use crate::interaction::{ViewportState, ZoomTransform};
use crate::models::ClusterPoint;
use crate::scales::{AXIS_COLOR, BLACK, CategoryScale, LinearScale};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    /// Color key within the global universe (cluster label).
    pub key: String,
    pub title: String,
    pub details: Vec<(String, String)>,
}

impl ScatterPoint {
    pub fn new(x: f64, y: f64, key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            x,
            y,
            title: key.clone(),
            key,
            details: Vec::new(),
        }
    }
}

impl From<&ClusterPoint> for ScatterPoint {
    fn from(p: &ClusterPoint) -> Self {
        let mut details = vec![("Cluster".to_string(), p.cluster_label())];
        if let Some(c) = &p.operator_country {
            details.push(("Country".to_string(), c.clone()));
        }
        if let Some(y) = p.year {
            details.push(("Year".to_string(), y.to_string()));
        }
        if let Some(d) = &p.date {
            details.push(("Date".to_string(), d.clone()));
        }
        if let Some(f) = p.fatalities.filter(|f| f.is_finite()) {
            details.push(("Fatalities".to_string(), format!("{}", f.round() as i64)));
        }
        let title = match &p.summary {
            Some(s) => truncate(s, 12.0, 320.0),
            None => p.cluster_label(),
        };
        Self {
            x: p.x,
            y: p.y,
            key: p.cluster_label(),
            title,
            details,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterInput {
    /// Points with finite coordinates; the index is the point's identity.
    pub points: Vec<ScatterPoint>,
    pub colors: Arc<CategoryScale>,
    /// Keys currently shown; `None` shows everything.
    pub visible: Option<BTreeSet<String>>,
}

impl ScatterInput {
    pub fn new(points: Vec<ScatterPoint>, colors: Arc<CategoryScale>) -> Self {
        let points = points
            .into_iter()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
            .collect();
        Self {
            points,
            colors,
            visible: None,
        }
    }

    pub fn visible(mut self, keys: BTreeSet<String>) -> Self {
        self.visible = Some(keys);
        self
    }

    pub fn is_visible(&self, p: &ScatterPoint) -> bool {
        self.visible.as_ref().is_none_or(|v| v.contains(&p.key))
    }

    pub fn visible_count(&self) -> usize {
        self.points.iter().filter(|p| self.is_visible(p)).count()
    }

    /// Data extent of every point padded on both sides, so the axes do not
    /// jump when the visible set changes.
    pub fn domains(&self) -> ((f64, f64), (f64, f64)) {
        let ext = |f: fn(&ScatterPoint) -> f64| {
            let (lo, hi) = self
                .points
                .iter()
                .map(f)
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
            if lo.is_finite() {
                (lo - SCATTER_DOMAIN_PADDING, hi + SCATTER_DOMAIN_PADDING)
            } else {
                (-SCATTER_DOMAIN_PADDING, SCATTER_DOMAIN_PADDING)
            }
        };
        (ext(|p| p.x), ext(|p| p.y))
    }
}

/// Base scale as seen through a zoom along one axis.
fn zoomed(base: &LinearScale, k: f64, t: f64) -> LinearScale {
    let (r0, r1) = base.range();
    let d0 = base.invert((r0 - t) / k);
    let d1 = base.invert((r1 - t) / k);
    LinearScale::new((d0, d1), (r0, r1))
}

#[derive(Debug, Clone)]
pub struct ScatterRenderer {
    pub config: ChartConfig,
}

impl ScatterRenderer {
    pub fn new(config: ChartConfig) -> Self {
        Self { config }
    }
}

impl ChartRenderer for ScatterRenderer {
    type Input = ScatterInput;

    fn render(&self, input: &ScatterInput, view: &ViewportState) -> Scene {
        let size = chart_size(view);
        if input.visible_count() == 0 {
            return Scene::no_data(size);
        }
        let keys = input.colors.keys();
        let legend_labels: Vec<&str> = keys.iter().map(String::as_str).collect();
        let frame = Frame::new(&self.config, size, &legend_labels);
        let plot = frame.plot;
        let ticks = self.config.ticks;
        let (xd, yd) = input.domains();
        let bx = LinearScale::new(xd, (plot.x, plot.right()));
        let by = LinearScale::new(yd, (plot.bottom(), plot.y));
        let z: ZoomTransform = view.zoom;

        let mut scene = Scene::new(size, plot);
        scene.transform = z;
        scene.extend(left_axis(&zoomed(&by, z.k, z.y), plot, ticks, &frame.fmt));
        scene.extend(bottom_axis(&zoomed(&bx, z.k, z.x), plot, ticks, &frame.fmt));

        let mut front = Vec::new();
        for (i, p) in input.points.iter().enumerate() {
            if !input.is_visible(p) {
                continue;
            }
            let entity = EntityRef::Point(i);
            let hovered = view.is_hovered(&entity);
            let selected = view.is_selected(&entity);
            let mark = Mark::data(Primitive::Circle {
                center: z.apply(Point::new(bx.map(p.x), by.map(p.y))),
                radius: if hovered { POINT_RADIUS_HOVER } else { POINT_RADIUS },
                fill: Some(Fill::with_opacity(input.colors.color(&p.key), POINT_OPACITY)),
                stroke: selected.then(|| Stroke::new(BLACK, SELECTION_STROKE_WIDTH)),
            })
            .bound(entity)
            .enter(Enter::FadeIn);
            // hovered and selected points paint last
            if hovered || selected {
                front.push(mark);
            } else {
                scene.push(mark);
            }
        }
        scene.extend(front);

        scene.extend(frame.titles(&self.config));
        scene.push(Mark::overlay(Primitive::Text {
            at: Point::new(plot.right(), (plot.y - 8.0).max(8.0)),
            text: format!(
                "Showing {} of {} data points",
                frame.fmt.count(input.visible_count() as f64),
                frame.fmt.count(input.points.len() as f64)
            ),
            style: TextStyle::new(11.0, AXIS_COLOR).anchor(Anchor::End),
        }));
        if let Some(area) = frame.legend {
            let items: Vec<LegendItem> = keys
                .iter()
                .map(|k| {
                    let shown = input.visible.as_ref().is_none_or(|v| v.contains(k));
                    LegendItem::new(k.clone(), input.colors.color(k))
                        .bound(EntityRef::Category(k.clone()))
                        .dimmed(!shown)
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

    fn tooltip(&self, input: &ScatterInput, entity: &EntityRef) -> Option<Tooltip> {
        let EntityRef::Point(i) = entity else {
            return None;
        };
        let p = input.points.get(*i)?;
        let fmt = NumberFormat::for_tag(&self.config.locale);
        let mut t = Tooltip::new(p.title.clone())
            .row("x", fmt.decimal(p.x, 2))
            .row("y", fmt.decimal(p.y, 2));
        for (l, v) in &p.details {
            t = t.row(l.clone(), v.clone());
        }
        Some(t)
    }

    fn zoom_extent(&self) -> Option<(f64, f64)> {
        Some(SCATTER_ZOOM_EXTENT)
    }

    fn selectable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoomed_scale_tracks_transform() {
        let base = LinearScale::new((0.0, 10.0), (0.0, 100.0));
        let z = zoomed(&base, 2.0, -50.0);
        // screen 0 shows data that the base put at pixel 25
        assert!((z.domain().0 - 2.5).abs() < 1e-9);
        assert!((z.domain().1 - 7.5).abs() < 1e-9);
    }
}
