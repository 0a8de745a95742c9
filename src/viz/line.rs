//! Time series as lines, translucent areas, or stacked areas.

use super::axis::{Frame, bottom_axis_with, bottom_band_axis, left_axis};
use super::legend::{LegendItem, legend_marks};
use super::scene::{EntityRef, Enter, Fill, GrowAxis, Mark, Point, Primitive, Scene, Stroke};
use super::types::{ChartConfig, LineMode, Tooltip};
use super::util::NumberFormat;
use super::{ChartRenderer, chart_size};
use crate::interaction::ViewportState;
use crate::scales::{BandScale, CategoryScale, LinearScale, WHITE};
use crate::stats::{PeriodMode, PeriodSeries};
use std::sync::Arc;

const MARKER_RADIUS: f64 = 3.0;
const MARKER_RADIUS_HOVER: f64 = 5.0;
const AREA_OPACITY: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct LineInput {
    /// Zero-filled, contiguous series; already cumulative when requested.
    pub series: PeriodSeries,
    pub colors: Arc<CategoryScale>,
    pub mode: LineMode,
}

impl LineInput {
    pub fn new(series: PeriodSeries, colors: Arc<CategoryScale>, mode: LineMode) -> Self {
        Self {
            series,
            colors,
            mode,
        }
    }

    /// Per-series lower and upper bounds at every period.
    fn bands(&self) -> Vec<(Vec<f64>, Vec<f64>)> {
        let n = self.series.periods.len();
        let mut acc = vec![0.0; n];
        self.series
            .series
            .iter()
            .map(|(_, values)| {
                if self.mode == LineMode::StackedArea {
                    let lower = acc.clone();
                    for (a, v) in acc.iter_mut().zip(values) {
                        *a += v;
                    }
                    (lower, acc.clone())
                } else {
                    (vec![0.0; n], values.clone())
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct LineRenderer {
    pub config: ChartConfig,
}

impl LineRenderer {
    pub fn new(config: ChartConfig) -> Self {
        Self { config }
    }
}

impl ChartRenderer for LineRenderer {
    type Input = LineInput;

    fn render(&self, input: &LineInput, view: &ViewportState) -> Scene {
        let size = chart_size(view);
        let ps = &input.series;
        if ps.is_empty() {
            return Scene::no_data(size);
        }
        let keys: Vec<&str> = ps.series.iter().map(|(k, _)| k.as_str()).collect();
        let frame = Frame::new(&self.config, size, &keys);
        let plot = frame.plot;
        let ticks = self.config.ticks;
        let bands = input.bands();
        let max = bands
            .iter()
            .flat_map(|(_, upper)| upper.iter().copied())
            .fold(0.0, f64::max);
        let y = LinearScale::new((0.0, if max > 0.0 { max } else { 1.0 }), (plot.bottom(), plot.y))
            .nice(ticks);
        let base = y.map(0.0);

        let mut scene = Scene::new(size, plot);
        scene.extend(left_axis(&y, plot, ticks, &frame.fmt));
        let xs: Vec<f64> = if ps.mode == PeriodMode::Seasonal {
            let labels: Vec<String> = ps.periods.iter().map(|p| p.label.clone()).collect();
            let band = BandScale::new(labels.clone(), (plot.x, plot.right()));
            scene.extend(bottom_band_axis(&band, plot, &labels));
            (0..labels.len()).map(|i| band.center(i)).collect()
        } else {
            let lo = ps.periods.first().map(|p| p.x).unwrap_or(0.0);
            let hi = ps.periods.last().map(|p| p.x).unwrap_or(lo);
            let x = LinearScale::new((lo, hi), (plot.x, plot.right()));
            // years print without grouping separators
            scene.extend(bottom_axis_with(&x, plot, ticks, |v, _| format!("{}", v.round() as i64)));
            ps.periods.iter().map(|p| x.map(p.x)).collect()
        };

        let grow = Enter::Grow {
            axis: GrowAxis::Vertical,
            baseline: base,
        };
        for ((key, values), (lower, upper)) in ps.series.iter().zip(&bands) {
            let color = input.colors.color(key);
            let top: Vec<Point> = xs.iter().zip(upper).map(|(&x, &v)| Point::new(x, y.map(v))).collect();
            if input.mode != LineMode::Lines {
                let mut ring = top.clone();
                ring.extend(xs.iter().zip(lower).rev().map(|(&x, &v)| Point::new(x, y.map(v))));
                scene.push(
                    Mark::data(Primitive::Polygon {
                        rings: vec![ring],
                        fill: Some(Fill::with_opacity(color, AREA_OPACITY)),
                        stroke: None,
                    })
                    .enter(grow),
                );
            }
            scene.push(
                Mark::data(Primitive::Polyline {
                    points: top.clone(),
                    stroke: Stroke::new(color, 2.0),
                })
                .enter(grow),
            );
            for (i, (p, v)) in top.iter().zip(values).enumerate() {
                let entity = EntityRef::SeriesPoint {
                    series: key.clone(),
                    period: i,
                };
                let hovered = view.is_hovered(&entity);
                // zero periods stay hoverable but drawn quietly
                let r = if hovered {
                    MARKER_RADIUS_HOVER
                } else if *v == 0.0 {
                    MARKER_RADIUS - 1.0
                } else {
                    MARKER_RADIUS
                };
                scene.push(
                    Mark::data(Primitive::Circle {
                        center: *p,
                        radius: r,
                        fill: Some(Fill::solid(color)),
                        stroke: Some(Stroke::new(WHITE, 1.0)),
                    })
                    .bound(entity)
                    .enter(grow),
                );
            }
        }

        scene.extend(frame.titles(&self.config));
        if let Some(area) = frame.legend {
            let items: Vec<LegendItem> = keys
                .iter()
                .map(|k| LegendItem::new(*k, input.colors.color(k)))
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

    fn tooltip(&self, input: &LineInput, entity: &EntityRef) -> Option<Tooltip> {
        let EntityRef::SeriesPoint { series, period } = entity else {
            return None;
        };
        let ps = &input.series;
        let label = &ps.periods.get(*period)?.label;
        let (_, values) = ps.series.iter().find(|(k, _)| k == series)?;
        let fmt = NumberFormat::for_tag(&self.config.locale);
        let name = if ps.cumulative { "Cumulative accidents" } else { "Accidents" };
        let mut t = Tooltip::new(format!("{series} · {label}")).row(name, fmt.count(*values.get(*period)?));
        if input.mode == LineMode::StackedArea {
            let total: f64 = ps.series.iter().filter_map(|(_, v)| v.get(*period)).sum();
            t = t.row("All series", fmt.count(total));
        }
        Some(t)
    }
}
