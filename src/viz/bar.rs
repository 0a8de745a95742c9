//! Bar charts over categorical bands, and histograms over a continuous axis.

use super::axis::{Frame, bottom_axis, bottom_band_axis, left_axis, left_band_axis};
use super::legend::{LegendItem, legend_marks};
use super::scene::{
    Anchor, EntityRef, Enter, Fill, GrowAxis, Mark, Point, Primitive, Rect, Scene, Stroke,
    TextStyle,
};
use super::types::{ChartConfig, LegendMode, Orientation, Tooltip};
use super::util::NumberFormat;
use super::{ChartRenderer, chart_size};
use crate::config::{DEEMPHASIZED_OPACITY, SELECTION_STROKE_WIDTH};
use crate::interaction::ViewportState;
use crate::models::BinRow;
use crate::scales::{AXIS_COLOR, BLACK, BandScale, INACTIVE_COLOR, LinearScale, Rgb, palette_color};
use crate::stats::HistogramBin;
use std::collections::BTreeSet;

/// Width reserved for category labels on a horizontal bar chart.
const BAND_LABEL_ROOM: f64 = 110.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// Stable identity (cluster id, country name).
    pub key: String,
    pub label: String,
    pub value: f64,
    pub color: Rgb,
    /// Extra tooltip rows.
    pub details: Vec<(String, String)>,
}

impl Bar {
    pub fn new(key: impl Into<String>, value: f64, color: Rgb) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            value,
            color,
            details: Vec::new(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn detail(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((label.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarInput {
    /// Bars in display order.
    pub bars: Vec<Bar>,
    pub orientation: Orientation,
    /// Multi-select membership; `None` means every bar is active. Inactive
    /// bars keep their slot and are drawn de-emphasized.
    pub active: Option<BTreeSet<String>>,
    /// One legend entry per bar.
    pub legend: bool,
    /// Print each bar's value at its end.
    pub value_labels: bool,
    /// Name of the value in tooltips.
    pub value_name: String,
}

impl BarInput {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self {
            bars,
            orientation: Orientation::Vertical,
            active: None,
            legend: false,
            value_labels: false,
            value_name: "Accidents".to_string(),
        }
    }

    pub fn orientation(mut self, o: Orientation) -> Self {
        self.orientation = o;
        self
    }

    pub fn active(mut self, active: BTreeSet<String>) -> Self {
        self.active = Some(active);
        self
    }

    pub fn with_legend(mut self) -> Self {
        self.legend = true;
        self
    }

    pub fn with_value_labels(mut self) -> Self {
        self.value_labels = true;
        self
    }

    pub fn value_name(mut self, name: &str) -> Self {
        self.value_name = name.to_string();
        self
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.active.as_ref().is_none_or(|a| a.contains(key))
    }

    /// Percent of the active bars' total.
    pub fn share_of_active(&self, key: &str) -> f64 {
        if !self.is_active(key) {
            return 0.0;
        }
        let total: f64 = self
            .bars
            .iter()
            .filter(|b| self.is_active(&b.key))
            .map(|b| b.value)
            .sum();
        self.share(key, total)
    }

    /// Percent of all bars' total, selected or not.
    pub fn share_of_all(&self, key: &str) -> f64 {
        let total: f64 = self.bars.iter().map(|b| b.value).sum();
        self.share(key, total)
    }

    fn share(&self, key: &str, total: f64) -> f64 {
        match self.bars.iter().find(|b| b.key == key) {
            Some(b) if total > 0.0 => b.value / total * 100.0,
            _ => 0.0,
        }
    }
}

/// Fill for a bar given activity and hover.
fn bar_fill(color: Rgb, active: bool, hovered: bool) -> Fill {
    if !active {
        Fill::with_opacity(INACTIVE_COLOR, DEEMPHASIZED_OPACITY)
    } else if hovered {
        Fill::solid(color.lerp(BLACK, 0.2))
    } else {
        Fill::solid(color)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BarRenderer {
    pub config: ChartConfig,
    selectable: bool,
}

impl BarRenderer {
    pub fn new(config: ChartConfig) -> Self {
        Self {
            config,
            selectable: false,
        }
    }

    /// Clicking a bar selects it.
    pub fn with_selection(mut self) -> Self {
        self.selectable = true;
        self
    }
}

impl ChartRenderer for BarRenderer {
    type Input = BarInput;

    fn render(&self, input: &BarInput, view: &ViewportState) -> Scene {
        let size = chart_size(view);
        if input.bars.is_empty() {
            return Scene::no_data(size);
        }
        let labels: Vec<String> = input.bars.iter().map(|b| b.label.clone()).collect();
        let legend_labels: Vec<&str> = if input.legend {
            labels.iter().map(String::as_str).collect()
        } else {
            Vec::new()
        };
        let frame = Frame::new(&self.config, size, &legend_labels);
        let plot = frame.plot;
        let max = input
            .bars
            .iter()
            .map(|b| b.value)
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max);
        let hi = if max > 0.0 { max } else { 1.0 };
        let ticks = self.config.ticks;

        let mut scene = Scene::new(size, plot);
        let (band, value) = match input.orientation {
            Orientation::Vertical => {
                let band = BandScale::new(labels.clone(), (plot.x, plot.right()));
                let value = LinearScale::new((0.0, hi), (plot.bottom(), plot.y)).nice(ticks);
                scene.extend(left_axis(&value, plot, ticks, &frame.fmt));
                scene.extend(bottom_band_axis(&band, plot, &labels));
                (band, value)
            }
            Orientation::Horizontal => {
                let band = BandScale::new(labels.clone(), (plot.y, plot.bottom()));
                let value = LinearScale::new((0.0, hi), (plot.x, plot.right())).nice(ticks);
                scene.extend(bottom_axis(&value, plot, ticks, &frame.fmt));
                scene.extend(left_band_axis(&band, plot, &labels, BAND_LABEL_ROOM));
                (band, value)
            }
        };
        let base = value.map(0.0);

        for (i, bar) in input.bars.iter().enumerate() {
            let entity = EntityRef::Category(bar.key.clone());
            let active = input.is_active(&bar.key);
            let fill = bar_fill(bar.color, active, view.is_hovered(&entity));
            let stroke = view
                .is_selected(&entity)
                .then(|| Stroke::new(BLACK, SELECTION_STROKE_WIDTH));
            let v = if bar.value.is_finite() { bar.value.max(0.0) } else { 0.0 };
            let start = band.band_start(i);
            let (rect, enter, label_at, anchor) = match input.orientation {
                Orientation::Vertical => (
                    Rect::from_corners(
                        Point::new(start, value.map(v)),
                        Point::new(start + band.bandwidth(), base),
                    ),
                    Enter::Grow {
                        axis: GrowAxis::Vertical,
                        baseline: base,
                    },
                    Point::new(band.center(i), value.map(v) - 8.0),
                    Anchor::Middle,
                ),
                Orientation::Horizontal => (
                    Rect::from_corners(
                        Point::new(base, start),
                        Point::new(value.map(v), start + band.bandwidth()),
                    ),
                    Enter::Grow {
                        axis: GrowAxis::Horizontal,
                        baseline: base,
                    },
                    Point::new(value.map(v) + 4.0, band.center(i)),
                    Anchor::Start,
                ),
            };
            scene.push(
                Mark::data(Primitive::Rect {
                    rect,
                    fill: Some(fill),
                    stroke,
                })
                .bound(entity)
                .enter(enter),
            );
            if input.value_labels {
                let mut style = TextStyle::new(11.0, AXIS_COLOR).anchor(anchor);
                style.opacity = fill.opacity;
                scene.push(
                    Mark::overlay(Primitive::Text {
                        at: label_at,
                        text: frame.fmt.count(v),
                        style,
                    })
                    .enter(Enter::FadeIn),
                );
            }
        }

        scene.extend(frame.titles(&self.config));
        if let Some(area) = frame.legend {
            let items: Vec<LegendItem> = input
                .bars
                .iter()
                .map(|b| {
                    LegendItem::new(b.label.clone(), b.color)
                        .bound(EntityRef::Category(b.key.clone()))
                        .dimmed(!input.is_active(&b.key))
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

    fn tooltip(&self, input: &BarInput, entity: &EntityRef) -> Option<Tooltip> {
        let EntityRef::Category(key) = entity else {
            return None;
        };
        let bar = input.bars.iter().find(|b| &b.key == key)?;
        let fmt = NumberFormat::for_tag(&self.config.locale);
        let mut t = Tooltip::new(bar.label.clone()).row(input.value_name.clone(), fmt.count(bar.value));
        if input.active.is_some() {
            t = t
                .row("Share of selected", fmt.percent(input.share_of_active(key)))
                .row("Share of all", fmt.percent(input.share_of_all(key)));
        } else {
            t = t.row("Share", fmt.percent(input.share_of_all(key)));
        }
        for (l, v) in &bar.details {
            t = t.row(l.clone(), v.clone());
        }
        Some(t)
    }

    fn selectable(&self) -> bool {
        self.selectable
    }
}

/// One histogram bar over `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinBar {
    pub start: f64,
    pub end: f64,
    pub value: f64,
}

impl From<&HistogramBin> for BinBar {
    fn from(b: &HistogramBin) -> Self {
        Self {
            start: b.bin_start,
            end: b.bin_end,
            value: b.count as f64,
        }
    }
}

impl From<&BinRow> for BinBar {
    fn from(b: &BinRow) -> Self {
        Self {
            start: b.bin_start,
            end: b.bin_end,
            value: b.accident_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramInput {
    /// Contiguous bins in ascending order.
    pub bins: Vec<BinBar>,
    pub color: Rgb,
    pub unit: String,
}

impl HistogramInput {
    pub fn new<'a, B>(bins: impl IntoIterator<Item = &'a B>) -> Self
    where
        B: 'a,
        BinBar: From<&'a B>,
    {
        let mut bins: Vec<BinBar> = bins
            .into_iter()
            .map(BinBar::from)
            .filter(|b| b.start.is_finite() && b.end.is_finite() && b.end >= b.start)
            .collect();
        bins.sort_by(|a, b| a.start.total_cmp(&b.start));
        Self {
            bins,
            color: palette_color(0),
            unit: String::new(),
        }
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = unit.to_string();
        self
    }
}

#[derive(Debug, Clone)]
pub struct HistogramRenderer {
    pub config: ChartConfig,
}

impl HistogramRenderer {
    pub fn new(config: ChartConfig) -> Self {
        Self {
            config: ChartConfig {
                legend: LegendMode::Hidden,
                ..config
            },
        }
    }
}

impl ChartRenderer for HistogramRenderer {
    type Input = HistogramInput;

    fn render(&self, input: &HistogramInput, view: &ViewportState) -> Scene {
        let size = chart_size(view);
        let (Some(first), Some(last)) = (input.bins.first(), input.bins.last()) else {
            return Scene::no_data(size);
        };
        let frame = Frame::new(&self.config, size, &[]);
        let plot = frame.plot;
        let ticks = self.config.ticks;
        let x = LinearScale::new((first.start, last.end), (plot.x, plot.right()));
        let max = input.bins.iter().map(|b| b.value).fold(0.0, f64::max);
        let y = LinearScale::new((0.0, if max > 0.0 { max } else { 1.0 }), (plot.bottom(), plot.y))
            .nice(ticks);
        let base = y.map(0.0);

        let mut scene = Scene::new(size, plot);
        scene.extend(left_axis(&y, plot, ticks, &frame.fmt));
        scene.extend(bottom_axis(&x, plot, ticks, &frame.fmt));
        for (i, b) in input.bins.iter().enumerate() {
            let entity = EntityRef::Bin(i);
            let x0 = x.map(b.start);
            // 1px gap between neighbours
            let x1 = (x.map(b.end) - 1.0).max(x0 + 0.5);
            scene.push(
                Mark::data(Primitive::Rect {
                    rect: Rect::from_corners(Point::new(x0, y.map(b.value.max(0.0))), Point::new(x1, base)),
                    fill: Some(bar_fill(input.color, true, view.is_hovered(&entity))),
                    stroke: None,
                })
                .bound(entity)
                .enter(Enter::Grow {
                    axis: GrowAxis::Vertical,
                    baseline: base,
                }),
            );
        }
        scene.extend(frame.titles(&self.config));
        scene
    }

    fn tooltip(&self, input: &HistogramInput, entity: &EntityRef) -> Option<Tooltip> {
        let EntityRef::Bin(i) = entity else {
            return None;
        };
        let b = input.bins.get(*i)?;
        let fmt = NumberFormat::for_tag(&self.config.locale);
        let unit = if input.unit.is_empty() {
            String::new()
        } else {
            format!(" {}", input.unit)
        };
        Some(
            Tooltip::new(format!(
                "{}–{}{unit}",
                fmt.decimal(b.start, 1),
                fmt.decimal(b.end, 1)
            ))
            .row("Accidents", fmt.count(b.value)),
        )
    }
}
