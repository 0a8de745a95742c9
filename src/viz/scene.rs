//! Backend-independent scene graph.
//!
//! A renderer turns `(data, viewport)` into a [`Scene`]: a flat, ordered list
//! of primitives in pixel coordinates. Painters (SVG through plotters, egui in
//! the desktop viewer) only walk the list. Marks bound to data carry an
//! [`EntityRef`] so the interaction layer can hit-test them.

use crate::config::{ENTRY_ANIMATION_SECS, NO_DATA_MESSAGE};
use crate::interaction::ZoomTransform;
use crate::layout::Size;
use crate::models::GroupKey;
use crate::scales::Rgb;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle spanning two corners in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::new(a.x.min(b.x), a.y.min(b.y), (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        (x1 >= x0 && y1 >= y0).then(|| Rect::new(x0, y0, x1 - x0, y1 - y0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub color: Rgb,
    pub opacity: f64,
}

impl Fill {
    pub fn solid(color: Rgb) -> Self {
        Self {
            color,
            opacity: 1.0,
        }
    }

    pub fn with_opacity(color: Rgb, opacity: f64) -> Self {
        Self { color, opacity }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Rgb,
    pub width: f64,
    pub opacity: f64,
}

impl Stroke {
    pub fn new(color: Rgb, width: f64) -> Self {
        Self {
            color,
            width,
            opacity: 1.0,
        }
    }
}

/// Horizontal text anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub size: f64,
    pub color: Rgb,
    pub anchor: Anchor,
    pub bold: bool,
    /// Rotated 90° counter-clockwise (vertical axis titles).
    pub vertical: bool,
    pub opacity: f64,
}

impl TextStyle {
    pub fn new(size: f64, color: Rgb) -> Self {
        Self {
            size,
            color,
            anchor: Anchor::Start,
            bold: false,
            vertical: false,
            opacity: 1.0,
        }
    }

    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn vertical(mut self) -> Self {
        self.vertical = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    Rect {
        rect: Rect,
        fill: Option<Fill>,
        stroke: Option<Stroke>,
    },
    Line {
        from: Point,
        to: Point,
        stroke: Stroke,
    },
    Circle {
        center: Point,
        radius: f64,
        fill: Option<Fill>,
        stroke: Option<Stroke>,
    },
    /// Filled area made of one or more closed rings (even-odd rule).
    Polygon {
        rings: Vec<Vec<Point>>,
        fill: Option<Fill>,
        stroke: Option<Stroke>,
    },
    Polyline {
        points: Vec<Point>,
        stroke: Stroke,
    },
    /// `at` is the anchor point, vertically centered on the text.
    Text {
        at: Point,
        text: String,
        style: TextStyle,
    },
}

impl Primitive {
    /// Whether `p` falls on the primitive (strokes get a few pixels of slack).
    pub fn contains(&self, p: Point) -> bool {
        const SLACK: f64 = 3.0;
        match self {
            Primitive::Rect { rect, .. } => {
                // keep thin bars hoverable
                let r = Rect::new(
                    rect.x - (1.0 - rect.w).max(0.0) / 2.0,
                    rect.y - (1.0 - rect.h).max(0.0) / 2.0,
                    rect.w.max(1.0),
                    rect.h.max(1.0),
                );
                r.contains(p)
            }
            Primitive::Circle { center, radius, .. } => center.distance(p) <= radius + 1.0,
            Primitive::Polygon { rings, .. } => {
                rings.iter().filter(|r| point_in_ring(p, r)).count() % 2 == 1
            }
            Primitive::Line { from, to, stroke } => {
                segment_distance(p, *from, *to) <= stroke.width / 2.0 + SLACK
            }
            Primitive::Polyline { points, stroke } => points
                .windows(2)
                .any(|w| segment_distance(p, w[0], w[1]) <= stroke.width / 2.0 + SLACK),
            Primitive::Text { .. } => false,
        }
    }

    /// Multiply fill, stroke and text opacity by `f`.
    fn fade(&mut self, f: f64) {
        let fade_fill = |fill: &mut Option<Fill>| {
            if let Some(x) = fill.as_mut() {
                x.opacity *= f;
            }
        };
        let fade_stroke = |stroke: &mut Option<Stroke>| {
            if let Some(s) = stroke.as_mut() {
                s.opacity *= f;
            }
        };
        match self {
            Primitive::Rect { fill, stroke, .. }
            | Primitive::Circle { fill, stroke, .. }
            | Primitive::Polygon { fill, stroke, .. } => {
                fade_fill(fill);
                fade_stroke(stroke);
            }
            Primitive::Line { stroke, .. } | Primitive::Polyline { stroke, .. } => {
                stroke.opacity *= f
            }
            Primitive::Text { style, .. } => style.opacity *= f,
        }
    }

    /// Collapse every coordinate along `axis` toward `baseline` by `1 - t`.
    fn grow(&mut self, axis: GrowAxis, baseline: f64, t: f64) {
        let lerp = |v: f64| baseline + (v - baseline) * t;
        let map = |p: &mut Point| match axis {
            GrowAxis::Vertical => p.y = lerp(p.y),
            GrowAxis::Horizontal => p.x = lerp(p.x),
        };
        match self {
            Primitive::Rect { rect, .. } => {
                let mut a = Point::new(rect.x, rect.y);
                let mut b = Point::new(rect.right(), rect.bottom());
                map(&mut a);
                map(&mut b);
                *rect = Rect::from_corners(a, b);
            }
            Primitive::Line { from, to, .. } => {
                map(from);
                map(to);
            }
            Primitive::Circle { center, .. } => map(center),
            Primitive::Polygon { rings, .. } => rings.iter_mut().flatten().for_each(map),
            Primitive::Polyline { points, .. } => points.iter_mut().for_each(map),
            Primitive::Text { at, .. } => map(at),
        }
    }
}

fn point_in_ring(p: Point, ring: &[Point]) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Clip `p` to `clip`. Lines are cut (Liang–Barsky), polygon rings are cut
/// (Sutherland–Hodgman); circles and text are dropped when their anchor is
/// outside.
pub fn clip_primitive(p: &Primitive, clip: Rect) -> Vec<Primitive> {
    match p {
        Primitive::Rect { rect, fill, stroke } => rect
            .intersect(&clip)
            .map(|r| Primitive::Rect {
                rect: r,
                fill: *fill,
                stroke: *stroke,
            })
            .into_iter()
            .collect(),
        Primitive::Line { from, to, stroke } => clip_segment(*from, *to, clip)
            .map(|(a, b)| Primitive::Line {
                from: a,
                to: b,
                stroke: *stroke,
            })
            .into_iter()
            .collect(),
        Primitive::Polyline { points, stroke } => {
            let mut runs: Vec<Vec<Point>> = Vec::new();
            for w in points.windows(2) {
                let Some((a, b)) = clip_segment(w[0], w[1], clip) else {
                    continue;
                };
                match runs.last_mut() {
                    Some(run) if run.last() == Some(&a) => run.push(b),
                    _ => runs.push(vec![a, b]),
                }
            }
            runs.into_iter()
                .map(|points| Primitive::Polyline {
                    points,
                    stroke: *stroke,
                })
                .collect()
        }
        Primitive::Polygon {
            rings,
            fill,
            stroke,
        } => {
            let rings: Vec<Vec<Point>> = rings
                .iter()
                .map(|r| clip_ring(r, clip))
                .filter(|r| r.len() >= 3)
                .collect();
            if rings.is_empty() {
                return Vec::new();
            }
            vec![Primitive::Polygon {
                rings,
                fill: *fill,
                stroke: *stroke,
            }]
        }
        Primitive::Circle { center, .. } | Primitive::Text { at: center, .. } => {
            if clip.contains(*center) {
                vec![p.clone()]
            } else {
                Vec::new()
            }
        }
    }
}

fn clip_segment(a: Point, b: Point, r: Rect) -> Option<(Point, Point)> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    for (p, q) in [
        (-dx, a.x - r.x),
        (dx, r.right() - a.x),
        (-dy, a.y - r.y),
        (dy, r.bottom() - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((
        Point::new(a.x + t0 * dx, a.y + t0 * dy),
        Point::new(a.x + t1 * dx, a.y + t1 * dy),
    ))
}

fn clip_ring(ring: &[Point], r: Rect) -> Vec<Point> {
    // intersection of segment a-b with a vertical / horizontal line
    fn at_x(a: Point, b: Point, x: f64) -> Point {
        Point::new(x, a.y + (b.y - a.y) * (x - a.x) / (b.x - a.x))
    }
    fn at_y(a: Point, b: Point, y: f64) -> Point {
        Point::new(a.x + (b.x - a.x) * (y - a.y) / (b.y - a.y), y)
    }
    type Edge = (fn(Point, Rect) -> bool, fn(Point, Point, Rect) -> Point);
    let edges: [Edge; 4] = [
        (|p, r| p.x >= r.x, |a, b, r| at_x(a, b, r.x)),
        (|p, r| p.x <= r.right(), |a, b, r| at_x(a, b, r.right())),
        (|p, r| p.y >= r.y, |a, b, r| at_y(a, b, r.y)),
        (|p, r| p.y <= r.bottom(), |a, b, r| at_y(a, b, r.bottom())),
    ];
    let mut out: Vec<Point> = ring.to_vec();
    for (inside, cut) in edges {
        let Some(&last) = out.last() else { break };
        let input = std::mem::take(&mut out);
        let mut prev = last;
        for &cur in &input {
            match (inside(cur, r), inside(prev, r)) {
                (true, true) => out.push(cur),
                (true, false) => {
                    out.push(cut(prev, cur, r));
                    out.push(cur);
                }
                (false, true) => out.push(cut(prev, cur, r)),
                (false, false) => {}
            }
            prev = cur;
        }
    }
    out
}

/// What a mark stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    /// Box of a box plot.
    Group(GroupKey),
    /// Histogram bin by index.
    Bin(usize),
    /// Bar, pie slice or legend entry.
    Category(String),
    /// Choropleth region by feature name.
    Region(String),
    /// Scatter point by index into the input.
    Point(usize),
    /// Marker on a time series.
    SeriesPoint { series: String, period: usize },
}

/// Data marks are zoomed and clipped to the plot area; overlay marks (axes,
/// title, legend, footer) are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layer {
    Data,
    Overlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrowAxis {
    Vertical,
    Horizontal,
}

/// How a freshly drawn mark enters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Enter {
    Static,
    /// Grow out of a pixel baseline (bar bottom, box median).
    Grow { axis: GrowAxis, baseline: f64 },
    FadeIn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub primitive: Primitive,
    pub layer: Layer,
    pub entity: Option<EntityRef>,
    pub enter: Enter,
}

impl Mark {
    pub fn data(primitive: Primitive) -> Self {
        Self {
            primitive,
            layer: Layer::Data,
            entity: None,
            enter: Enter::Static,
        }
    }

    pub fn overlay(primitive: Primitive) -> Self {
        Self {
            primitive,
            layer: Layer::Overlay,
            entity: None,
            enter: Enter::Static,
        }
    }

    pub fn bound(mut self, entity: EntityRef) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn enter(mut self, enter: Enter) -> Self {
        self.enter = enter;
        self
    }
}

/// `1 - (1 - t)^3`
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub size: Size,
    /// Clip rectangle of the data layer.
    pub plot_area: Rect,
    pub marks: Vec<Mark>,
    /// Zoom the data layer was drawn with.
    pub transform: ZoomTransform,
    /// Message of a placeholder scene.
    pub placeholder: Option<String>,
    pub entry_secs: f64,
}

impl Scene {
    pub fn new(size: Size, plot_area: Rect) -> Self {
        Self {
            size,
            plot_area,
            marks: Vec::new(),
            transform: ZoomTransform::IDENTITY,
            placeholder: None,
            entry_secs: ENTRY_ANIMATION_SECS,
        }
    }

    /// A scene holding only a centered message.
    pub fn placeholder(size: Size, message: &str) -> Self {
        let mut s = Scene::new(size, Rect::new(0.0, 0.0, size.width, size.height));
        s.push(Mark::overlay(Primitive::Text {
            at: size.center(),
            text: message.to_string(),
            style: TextStyle::new(16.0, Rgb(0x6b, 0x72, 0x80)).anchor(Anchor::Middle),
        }));
        s.placeholder = Some(message.to_string());
        s
    }

    pub fn no_data(size: Size) -> Self {
        Self::placeholder(size, NO_DATA_MESSAGE)
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder.is_some()
    }

    pub fn push(&mut self, mark: Mark) {
        self.marks.push(mark);
    }

    pub fn extend(&mut self, marks: impl IntoIterator<Item = Mark>) {
        self.marks.extend(marks);
    }

    pub fn has_entry_animation(&self) -> bool {
        self.marks.iter().any(|m| m.enter != Enter::Static)
    }

    /// Marks bound to `entity`.
    pub fn marks_for<'a>(&'a self, entity: &'a EntityRef) -> impl Iterator<Item = &'a Mark> + 'a {
        self.marks
            .iter()
            .filter(move |m| m.entity.as_ref() == Some(entity))
    }

    /// Topmost bound mark under `p`. Data marks outside the plot area are
    /// clipped away and cannot be hit.
    pub fn hit_test(&self, p: Point) -> Option<&EntityRef> {
        self.marks.iter().rev().find_map(|m| {
            let entity = m.entity.as_ref()?;
            if m.layer == Layer::Data && !self.plot_area.contains(p) {
                return None;
            }
            m.primitive.contains(p).then_some(entity)
        })
    }

    /// Primitives in paint order with the data layer clipped to the plot area.
    pub fn visible_primitives(&self) -> Vec<Primitive> {
        let mut out = Vec::with_capacity(self.marks.len());
        for m in &self.marks {
            match m.layer {
                Layer::Overlay => out.push(m.primitive.clone()),
                Layer::Data => out.extend(clip_primitive(&m.primitive, self.plot_area)),
            }
        }
        out
    }

    /// The scene as it looks `progress` (0..1) into its entry animation.
    pub fn at_progress(&self, progress: f64) -> Scene {
        if progress >= 1.0 {
            return self.clone();
        }
        let t = ease_out_cubic(progress);
        let mut out = self.clone();
        for m in out.marks.iter_mut() {
            match m.enter {
                Enter::Static => {}
                Enter::FadeIn => m.primitive.fade(t),
                Enter::Grow { axis, baseline } => m.primitive.grow(axis, baseline, t),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grow_collapses_to_baseline_at_start() {
        let mut s = Scene::new(Size::new(100.0, 100.0), Rect::new(0.0, 0.0, 100.0, 100.0));
        s.push(
            Mark::data(Primitive::Rect {
                rect: Rect::new(10.0, 20.0, 10.0, 60.0),
                fill: None,
                stroke: None,
            })
            .enter(Enter::Grow {
                axis: GrowAxis::Vertical,
                baseline: 80.0,
            }),
        );
        let start = s.at_progress(0.0);
        match &start.marks[0].primitive {
            Primitive::Rect { rect, .. } => {
                assert_eq!(rect.h, 0.0);
                assert_eq!(rect.y, 80.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(s.at_progress(1.0), s);
    }

    #[test]
    fn polygon_hit_uses_even_odd() {
        let square = |o: f64, w: f64| {
            vec![
                Point::new(o, o),
                Point::new(o + w, o),
                Point::new(o + w, o + w),
                Point::new(o, o + w),
            ]
        };
        let p = Primitive::Polygon {
            rings: vec![square(0.0, 10.0), square(3.0, 4.0)],
            fill: None,
            stroke: None,
        };
        assert!(p.contains(Point::new(1.0, 1.0)));
        assert!(!p.contains(Point::new(5.0, 5.0)));
    }
}
