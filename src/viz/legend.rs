//! Legend layout: a single column in a right panel, or a table-like band
//! below the plot whose columns line up across rows.
//!
//! [`band_height`] and [`legend_marks`] share one layout pass, so the space
//! reserved for a bottom legend always matches what gets drawn.

use super::scene::{Anchor, EntityRef, Fill, Mark, Point, Primitive, Rect, TextStyle};
use super::text::{text_width, wrap};
use super::types::LegendMode;
use super::util::NumberFormat;
use crate::config::DEEMPHASIZED_OPACITY;
use crate::scales::{AXIS_COLOR, ContinuousColorScale, Rgb};

const FONT_PX: f64 = 12.0;
const TITLE_FONT_PX: f64 = 13.0;
const LINE_H: f64 = FONT_PX + 2.0;
const ROW_GAP: f64 = 4.0;
const PAD_SMALL: f64 = 6.0;
const PAD_BAND: f64 = 8.0;
const MARKER_RADIUS: f64 = 4.0;
const MARKER_TO_TEXT_GAP: f64 = 12.0;
const TRAILING_GAP: f64 = 12.0;
const MIN_SLOT: f64 = 60.0;
/// Fixed width of the right-hand legend panel.
pub const RIGHT_PANEL_WIDTH: f64 = 150.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LegendItem {
    pub label: String,
    pub color: Rgb,
    pub entity: Option<EntityRef>,
    /// Drawn faded (inactive in a multi-select).
    pub dimmed: bool,
}

impl LegendItem {
    pub fn new(label: impl Into<String>, color: Rgb) -> Self {
        Self {
            label: label.into(),
            color,
            entity: None,
            dimmed: false,
        }
    }

    pub fn bound(mut self, entity: EntityRef) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn dimmed(mut self, dimmed: bool) -> Self {
        self.dimmed = dimmed;
        self
    }
}

struct Cell {
    item: usize,
    text_x: f64,
    center_y: f64,
    lines: Vec<String>,
}

struct Layout {
    cells: Vec<Cell>,
    height: f64,
}

fn block_overhead() -> f64 {
    MARKER_TO_TEXT_GAP + MARKER_RADIUS + TRAILING_GAP
}

fn max_line_width(lines: &[String]) -> f64 {
    lines
        .iter()
        .map(|l| text_width(l, FONT_PX))
        .fold(0.0, f64::max)
}

fn title_offset(has_title: bool) -> f64 {
    if has_title {
        PAD_BAND + TITLE_FONT_PX + 8.0
    } else {
        PAD_BAND + 8.0
    }
}

/// Greedy row packing, then per-column widths from the longest label in each
/// column; uniform slots (with wrapping) when those do not fit the band.
fn band_layout(labels: &[&str], start_x: f64, total_w: f64, has_title: bool) -> Layout {
    let usable = total_w - PAD_SMALL;
    let per_item_cap = ((usable - start_x) * 0.35).max(140.0);
    let pack_width = |label: &str, cap: f64| {
        block_overhead() + max_line_width(&wrap(label, FONT_PX, cap.max(40.0)))
    };

    let mut rows: Vec<Vec<usize>> = Vec::new();
    let mut cur: Vec<usize> = Vec::new();
    let mut x = start_x;
    for (i, label) in labels.iter().enumerate() {
        let cap_now = ((usable - x).max(40.0) - block_overhead()).min(per_item_cap);
        let mut w = pack_width(label, cap_now);
        if x + w > usable && !cur.is_empty() {
            rows.push(std::mem::take(&mut cur));
            x = start_x;
            w = pack_width(label, (usable - start_x - block_overhead()).min(per_item_cap));
        }
        x += w;
        cur.push(i);
    }
    if !cur.is_empty() {
        rows.push(cur);
    }

    let k = rows.iter().map(Vec::len).max().unwrap_or(1);
    let mut col_w = vec![MIN_SLOT; k];
    for row in &rows {
        for (ci, &i) in row.iter().enumerate() {
            col_w[ci] = col_w[ci].max(block_overhead() + text_width(labels[i], FONT_PX));
        }
    }
    if start_x + col_w.iter().sum::<f64>() > usable {
        col_w = vec![((usable - start_x) / k as f64).max(MIN_SLOT); k];
    }
    let col_x: Vec<f64> = col_w
        .iter()
        .scan(start_x, |acc, w| {
            let x = *acc;
            *acc += w;
            Some(x)
        })
        .collect();

    let mut y = title_offset(has_title);
    let mut cells = Vec::with_capacity(labels.len());
    for (ri, row) in rows.iter().enumerate() {
        let wrapped: Vec<Vec<String>> = row
            .iter()
            .enumerate()
            .map(|(ci, &i)| wrap(labels[i], FONT_PX, (col_w[ci] - block_overhead()).max(40.0)))
            .collect();
        let row_h = wrapped
            .iter()
            .map(|l| l.len().max(1) as f64 * LINE_H)
            .fold(LINE_H, f64::max);
        for ((ci, &i), lines) in row.iter().enumerate().zip(wrapped) {
            cells.push(Cell {
                item: i,
                text_x: col_x[ci],
                center_y: y + row_h / 2.0,
                lines,
            });
        }
        y += row_h;
        if ri + 1 < rows.len() {
            y += ROW_GAP;
        }
    }
    Layout {
        cells,
        height: y + PAD_BAND,
    }
}

fn column_layout(labels: &[&str], width: f64, has_title: bool) -> Layout {
    let text_x = PAD_SMALL + 24.0;
    let cap = (width - text_x - PAD_SMALL).max(40.0);
    let mut y = if has_title {
        PAD_SMALL + TITLE_FONT_PX + 8.0
    } else {
        PAD_SMALL + 6.0
    };
    let mut cells = Vec::with_capacity(labels.len());
    for (i, label) in labels.iter().enumerate() {
        let lines = wrap(label, FONT_PX, cap);
        let h = lines.len().max(1) as f64 * LINE_H;
        cells.push(Cell {
            item: i,
            text_x,
            center_y: y + h / 2.0,
            lines,
        });
        y += h + ROW_GAP;
    }
    Layout { cells, height: y }
}

/// Height a bottom legend band needs for `labels` across `total_w` pixels.
pub fn band_height(labels: &[&str], start_x: f64, total_w: f64, has_title: bool) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    band_layout(labels, start_x, total_w, has_title).height
}

/// Legend marks inside `area`. Bottom bands align their first column with
/// `axis_x` (the plot's left edge).
pub fn legend_marks(
    items: &[LegendItem],
    title: &str,
    mode: LegendMode,
    area: Rect,
    axis_x: f64,
) -> Vec<Mark> {
    if items.is_empty() || mode == LegendMode::Hidden {
        return Vec::new();
    }
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    let has_title = !title.trim().is_empty();
    let layout = match mode {
        LegendMode::Right => column_layout(&labels, area.w, has_title),
        _ => band_layout(&labels, axis_x - area.x, area.w, has_title),
    };

    let mut marks = Vec::new();
    if has_title {
        let tx = match mode {
            LegendMode::Right => area.x + PAD_SMALL,
            _ => axis_x,
        };
        marks.push(Mark::overlay(Primitive::Text {
            at: Point::new(tx, area.y + PAD_SMALL + TITLE_FONT_PX / 2.0),
            text: title.to_string(),
            style: TextStyle::new(TITLE_FONT_PX, AXIS_COLOR).bold(),
        }));
    }
    for cell in layout.cells {
        let item = &items[cell.item];
        let opacity = if item.dimmed { DEEMPHASIZED_OPACITY } else { 1.0 };
        let marker_x = area.x + (cell.text_x - MARKER_TO_TEXT_GAP).max(MARKER_RADIUS);
        let marker_x = if mode == LegendMode::Right {
            area.x + PAD_SMALL + 12.0
        } else {
            marker_x
        };
        let cy = area.y + cell.center_y;
        let mut dot = Mark::overlay(Primitive::Circle {
            center: Point::new(marker_x, cy),
            radius: MARKER_RADIUS,
            fill: Some(Fill::with_opacity(item.color, opacity)),
            stroke: None,
        });
        if let Some(e) = &item.entity {
            dot = dot.bound(e.clone());
        }
        marks.push(dot);

        let block_h = cell.lines.len().max(1) as f64 * LINE_H;
        let top = cy - block_h / 2.0;
        for (i, line) in cell.lines.iter().enumerate() {
            let mut style = TextStyle::new(FONT_PX, AXIS_COLOR);
            style.opacity = opacity;
            marks.push(Mark::overlay(Primitive::Text {
                at: Point::new(area.x + cell.text_x, top + i as f64 * LINE_H + LINE_H / 2.0),
                text: line.clone(),
                style,
            }));
        }
    }
    marks
}

/// Horizontal gradient bar with its domain bounds underneath.
pub fn gradient_marks(scale: &ContinuousColorScale, area: Rect, fmt: &NumberFormat) -> Vec<Mark> {
    const STEPS: usize = 32;
    let bar_h = (area.h - FONT_PX - 4.0).clamp(6.0, 12.0);
    let step_w = area.w / STEPS as f64;
    let mut marks: Vec<Mark> = (0..STEPS)
        .map(|i| {
            let t = (i as f64 + 0.5) / STEPS as f64;
            let stops = scale.stops();
            let segments = (stops.len() - 1) as f64;
            let pos = t * segments;
            let j = (pos.floor() as usize).min(stops.len() - 2);
            let color = stops[j].lerp(stops[j + 1], pos - j as f64);
            Mark::overlay(Primitive::Rect {
                rect: Rect::new(area.x + i as f64 * step_w, area.y, step_w + 0.5, bar_h),
                fill: Some(Fill::solid(color)),
                stroke: None,
            })
        })
        .collect();
    let (lo, hi) = scale.domain();
    let label_y = area.y + bar_h + 4.0 + FONT_PX / 2.0;
    marks.push(Mark::overlay(Primitive::Text {
        at: Point::new(area.x, label_y),
        text: fmt.count(lo),
        style: TextStyle::new(FONT_PX - 1.0, AXIS_COLOR),
    }));
    marks.push(Mark::overlay(Primitive::Text {
        at: Point::new(area.right(), label_y),
        text: fmt.count(hi),
        style: TextStyle::new(FONT_PX - 1.0, AXIS_COLOR).anchor(Anchor::End),
    }));
    marks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_height_grows_with_rows() {
        let few = ["A", "B"];
        let many: Vec<String> = (0..40).map(|i| format!("Manufacturer {i}")).collect();
        let many: Vec<&str> = many.iter().map(String::as_str).collect();
        let h1 = band_height(&few, 60.0, 600.0, false);
        let h2 = band_height(&many, 60.0, 600.0, false);
        assert!(h2 > h1);
        assert_eq!(band_height(&[], 60.0, 600.0, true), 0.0);
    }

    #[test]
    fn every_item_gets_a_marker() {
        let items: Vec<LegendItem> = ["crew", "passengers"]
            .iter()
            .map(|l| LegendItem::new(*l, AXIS_COLOR).bound(EntityRef::Category(l.to_string())))
            .collect();
        let marks = legend_marks(
            &items,
            "",
            LegendMode::Bottom,
            Rect::new(0.0, 500.0, 800.0, 40.0),
            60.0,
        );
        let bound = marks.iter().filter(|m| m.entity.is_some()).count();
        assert_eq!(bound, 2);
    }
}
