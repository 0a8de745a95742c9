//! Chart frame: title, plot rectangle, legend area and axes.

use super::legend::{RIGHT_PANEL_WIDTH, band_height};
use super::scene::{Anchor, Mark, Point, Primitive, Rect, Stroke, TextStyle};
use super::text::truncate;
use super::types::{ChartConfig, LegendMode};
use super::util::NumberFormat;
use crate::layout::Size;
use crate::scales::{AXIS_COLOR, BandScale, GRID_COLOR, LinearScale, Rgb, tick_step};

const TICK_FONT_PX: f64 = 11.0;
const LABEL_FONT_PX: f64 = 12.0;
const TITLE_FONT_PX: f64 = 16.0;
const TICK_LEN: f64 = 5.0;

/// Resolved layout of one chart at one container size.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub size: Size,
    pub plot: Rect,
    pub legend: Option<Rect>,
    pub fmt: NumberFormat,
}

impl Frame {
    /// Scale the configured margins to `size` and carve out the legend.
    pub fn new(config: &ChartConfig, size: Size, legend_labels: &[&str]) -> Frame {
        let m = config.margins.scaled_to(size);
        let mut plot = m.inner(size);
        let legend = match config.legend {
            _ if legend_labels.is_empty() => None,
            LegendMode::Hidden => None,
            LegendMode::Right => {
                let w = RIGHT_PANEL_WIDTH.min(plot.w / 2.0);
                plot.w = (plot.w - w).max(1.0);
                Some(Rect::new(size.width - w, m.top, w, plot.h))
            }
            LegendMode::Bottom => {
                let has_title = !config.legend_title.trim().is_empty();
                let h = band_height(legend_labels, plot.x, size.width, has_title).min(plot.h / 2.0);
                plot.h = (plot.h - h).max(1.0);
                Some(Rect::new(0.0, size.height - h, size.width, h))
            }
        };
        Frame {
            size,
            plot,
            legend,
            fmt: NumberFormat::for_tag(&config.locale),
        }
    }

    /// Title and axis labels.
    pub fn titles(&self, config: &ChartConfig) -> Vec<Mark> {
        let mut out = Vec::new();
        if !config.title.is_empty() {
            out.push(Mark::overlay(Primitive::Text {
                at: Point::new(self.size.width / 2.0, (self.plot.y / 2.0).max(TITLE_FONT_PX / 2.0 + 2.0)),
                text: truncate(&config.title, TITLE_FONT_PX, self.size.width - 16.0),
                style: TextStyle::new(TITLE_FONT_PX, AXIS_COLOR)
                    .anchor(Anchor::Middle)
                    .bold(),
            }));
        }
        if !config.x_label.is_empty() {
            out.push(Mark::overlay(Primitive::Text {
                at: Point::new(self.plot.center().x, self.plot.bottom() + 36.0),
                text: config.x_label.clone(),
                style: TextStyle::new(LABEL_FONT_PX, AXIS_COLOR).anchor(Anchor::Middle),
            }));
        }
        if !config.y_label.is_empty() {
            out.push(Mark::overlay(Primitive::Text {
                at: Point::new((self.plot.x - 52.0).max(LABEL_FONT_PX), self.plot.center().y),
                text: config.y_label.clone(),
                style: TextStyle::new(LABEL_FONT_PX, AXIS_COLOR)
                    .anchor(Anchor::Middle)
                    .vertical(),
            }));
        }
        out
    }
}

fn line(from: Point, to: Point, color: Rgb) -> Mark {
    Mark::overlay(Primitive::Line {
        from,
        to,
        stroke: Stroke::new(color, 1.0),
    })
}

/// Left axis for a continuous y scale, with horizontal grid lines.
pub fn left_axis(scale: &LinearScale, plot: Rect, ticks: usize, fmt: &NumberFormat) -> Vec<Mark> {
    let (lo, hi) = scale.domain();
    let step = tick_step(lo.min(hi), lo.max(hi), ticks);
    let mut out = vec![line(
        Point::new(plot.x, plot.y),
        Point::new(plot.x, plot.bottom()),
        AXIS_COLOR,
    )];
    for v in scale.ticks(ticks) {
        let y = scale.map(v);
        if y < plot.y - 0.5 || y > plot.bottom() + 0.5 {
            continue;
        }
        out.push(line(Point::new(plot.x, y), Point::new(plot.right(), y), GRID_COLOR));
        out.push(line(Point::new(plot.x - TICK_LEN, y), Point::new(plot.x, y), AXIS_COLOR));
        out.push(Mark::overlay(Primitive::Text {
            at: Point::new(plot.x - TICK_LEN - 3.0, y),
            text: fmt.tick(v, step),
            style: TextStyle::new(TICK_FONT_PX, AXIS_COLOR).anchor(Anchor::End),
        }));
    }
    out
}

/// Bottom axis for a continuous x scale.
pub fn bottom_axis(scale: &LinearScale, plot: Rect, ticks: usize, fmt: &NumberFormat) -> Vec<Mark> {
    bottom_axis_with(scale, plot, ticks, |v, step| fmt.tick(v, step))
}

/// Bottom axis with a custom tick formatter (years print without grouping).
pub fn bottom_axis_with(
    scale: &LinearScale,
    plot: Rect,
    ticks: usize,
    label: impl Fn(f64, f64) -> String,
) -> Vec<Mark> {
    let (lo, hi) = scale.domain();
    let step = tick_step(lo.min(hi), lo.max(hi), ticks);
    let y0 = plot.bottom();
    let mut out = vec![line(Point::new(plot.x, y0), Point::new(plot.right(), y0), AXIS_COLOR)];
    for v in scale.ticks(ticks) {
        let x = scale.map(v);
        if x < plot.x - 0.5 || x > plot.right() + 0.5 {
            continue;
        }
        out.push(line(Point::new(x, y0), Point::new(x, y0 + TICK_LEN), AXIS_COLOR));
        out.push(Mark::overlay(Primitive::Text {
            at: Point::new(x, y0 + TICK_LEN + 9.0),
            text: label(v, step),
            style: TextStyle::new(TICK_FONT_PX, AXIS_COLOR).anchor(Anchor::Middle),
        }));
    }
    out
}

/// Bottom axis with one label per band, truncated to the band width.
pub fn bottom_band_axis(band: &BandScale, plot: Rect, labels: &[String]) -> Vec<Mark> {
    let y0 = plot.bottom();
    let mut out = vec![line(Point::new(plot.x, y0), Point::new(plot.right(), y0), AXIS_COLOR)];
    let room = (band.bandwidth() + 8.0).max(24.0);
    for (i, label) in labels.iter().enumerate() {
        let x = band.center(i);
        out.push(Mark::overlay(Primitive::Text {
            at: Point::new(x, y0 + TICK_LEN + 9.0),
            text: truncate(label, TICK_FONT_PX, room),
            style: TextStyle::new(TICK_FONT_PX, AXIS_COLOR).anchor(Anchor::Middle),
        }));
    }
    out
}

/// Left axis with one label per band.
pub fn left_band_axis(band: &BandScale, plot: Rect, labels: &[String], room: f64) -> Vec<Mark> {
    let mut out = vec![line(
        Point::new(plot.x, plot.y),
        Point::new(plot.x, plot.bottom()),
        AXIS_COLOR,
    )];
    for (i, label) in labels.iter().enumerate() {
        out.push(Mark::overlay(Primitive::Text {
            at: Point::new(plot.x - TICK_LEN - 3.0, band.center(i)),
            text: truncate(label, TICK_FONT_PX, room),
            style: TextStyle::new(TICK_FONT_PX, AXIS_COLOR).anchor(Anchor::End),
        }));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Margins;

    #[test]
    fn bottom_legend_shrinks_plot() {
        let cfg = ChartConfig::default().margins(Margins::new(40.0, 20.0, 40.0, 60.0));
        let size = Size::new(800.0, 600.0);
        let without = Frame::new(&cfg, size, &[]);
        let with = Frame::new(&cfg, size, &["Small", "Heavy"]);
        assert!(with.plot.h < without.plot.h);
        let legend = with.legend.unwrap();
        assert!((legend.bottom() - 600.0).abs() < 1e-9);
    }
}
