//! Hover, selection and zoom state per chart instance.
//!
//! The controller owns a [`ViewportState`] and turns pointer events into
//! state changes plus a [`Redraw`] hint. It never draws: the owner re-renders
//! with the new viewport when asked to.

use crate::config::{ENTRY_ANIMATION_SECS, WHEEL_ZOOM_SENSITIVITY, ZOOM_IN_FACTOR, ZOOM_OUT_FACTOR};
use crate::layout::Size;
use crate::viz::scene::{EntityRef, Point, Rect, Scene};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Affine zoom `p -> p·k + (x, y)` applied to a chart's data layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomTransform {
    pub k: f64,
    pub x: f64,
    pub y: f64,
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ZoomTransform {
    pub const IDENTITY: ZoomTransform = ZoomTransform {
        k: 1.0,
        x: 0.0,
        y: 0.0,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(self.apply_x(p.x), self.apply_y(p.y))
    }

    pub fn apply_x(&self, x: f64) -> f64 {
        x * self.k + self.x
    }

    pub fn apply_y(&self, y: f64) -> f64 {
        y * self.k + self.y
    }

    pub fn invert(&self, p: Point) -> Point {
        Point::new((p.x - self.x) / self.k, (p.y - self.y) / self.k)
    }

    /// Scale to `k` keeping the screen point `anchor` fixed.
    fn rescale(&self, k: f64, anchor: Point) -> ZoomTransform {
        let world = self.invert(anchor);
        ZoomTransform {
            k,
            x: anchor.x - world.x * k,
            y: anchor.y - world.y * k,
        }
    }
}

/// Zoom limits of one chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomBehavior {
    pub extent: (f64, f64),
}

impl ZoomBehavior {
    pub fn new(extent: (f64, f64)) -> Self {
        Self { extent }
    }

    /// Multiply the scale by `factor` around `anchor`, clamped to the extent.
    pub fn scale_by(&self, t: ZoomTransform, factor: f64, anchor: Point) -> ZoomTransform {
        let k = (t.k * factor).clamp(self.extent.0, self.extent.1);
        t.rescale(k, anchor)
    }

    pub fn translate_by(&self, t: ZoomTransform, dx: f64, dy: f64) -> ZoomTransform {
        ZoomTransform {
            x: t.x + dx,
            y: t.y + dy,
            ..t
        }
    }

    /// Scale factor of one wheel event; positive `delta_y` zooms out.
    pub fn wheel_factor(delta_y: f64) -> f64 {
        2f64.powf(-delta_y * WHEEL_ZOOM_SENSITIVITY)
    }

    /// Wheel delta that [`wheel_factor`](Self::wheel_factor) maps to `factor`.
    pub fn wheel_delta_for(factor: f64) -> f64 {
        -factor.log2() / WHEEL_ZOOM_SENSITIVITY
    }
}

/// Everything a renderer needs to know about the viewer's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub size: Size,
    pub hovered: Option<EntityRef>,
    pub pointer: Option<Point>,
    pub selected: Option<EntityRef>,
    pub zoom: ZoomTransform,
}

impl ViewportState {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            hovered: None,
            pointer: None,
            selected: None,
            zoom: ZoomTransform::IDENTITY,
        }
    }

    pub fn is_hovered(&self, e: &EntityRef) -> bool {
        self.hovered.as_ref() == Some(e)
    }

    pub fn is_selected(&self, e: &EntityRef) -> bool {
        self.selected.as_ref() == Some(e)
    }
}

/// How much of a chart must be redrawn after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Redraw {
    None,
    /// Tooltip moved; marks unchanged.
    Overlay,
    /// Mark styling or zoom changed; re-render the scene, no entry animation.
    Scene,
    /// Container changed; layout and scales are recomputed.
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct EntryAnimation {
    start: f64,
    secs: f64,
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    view: ViewportState,
    zoom: Option<ZoomBehavior>,
    selectable: bool,
    animation: Option<EntryAnimation>,
    drag_from: Option<Point>,
}

impl InteractionController {
    pub fn new(size: Size) -> Self {
        Self {
            view: ViewportState::new(size),
            zoom: None,
            selectable: false,
            animation: None,
            drag_from: None,
        }
    }

    pub fn with_zoom(mut self, extent: (f64, f64)) -> Self {
        self.zoom = Some(ZoomBehavior::new(extent));
        self
    }

    pub fn selectable(mut self) -> Self {
        self.selectable = true;
        self
    }

    pub fn view(&self) -> &ViewportState {
        &self.view
    }

    pub fn zoom_behavior(&self) -> Option<ZoomBehavior> {
        self.zoom
    }

    /// Fresh marks were drawn at `now`; input is ignored until they settle.
    pub fn begin_entry_animation(&mut self, now: f64) {
        self.begin_entry_animation_for(now, ENTRY_ANIMATION_SECS);
    }

    pub fn begin_entry_animation_for(&mut self, now: f64, secs: f64) {
        self.view.hovered = None;
        self.drag_from = None;
        self.animation = (secs > 0.0).then_some(EntryAnimation { start: now, secs });
    }

    /// Entry animation progress in `[0, 1]`; 1 when none is running.
    pub fn animation_progress(&self, now: f64) -> f64 {
        match self.animation {
            Some(a) => ((now - a.start) / a.secs).clamp(0.0, 1.0),
            None => 1.0,
        }
    }

    pub fn is_animating(&self, now: f64) -> bool {
        self.animation_progress(now) < 1.0
    }

    pub fn pointer_move(&mut self, scene: &Scene, p: Point, now: f64) -> Redraw {
        if self.is_animating(now) {
            return Redraw::None;
        }
        self.view.pointer = Some(p);
        let hit = scene.hit_test(p).cloned();
        if hit != self.view.hovered {
            self.view.hovered = hit;
            Redraw::Scene
        } else if self.view.hovered.is_some() {
            Redraw::Overlay
        } else {
            Redraw::None
        }
    }

    pub fn pointer_leave(&mut self) -> Redraw {
        self.view.pointer = None;
        self.drag_from = None;
        if self.view.hovered.take().is_some() {
            Redraw::Scene
        } else {
            Redraw::None
        }
    }

    /// Toggle selection of the entity under `p`. Clicking empty space keeps
    /// the current selection.
    pub fn click(&mut self, scene: &Scene, p: Point, now: f64) -> Redraw {
        if !self.selectable || self.is_animating(now) {
            return Redraw::None;
        }
        let Some(hit) = scene.hit_test(p).cloned() else {
            return Redraw::None;
        };
        if self.view.selected.as_ref() == Some(&hit) {
            log::debug!("deselect {hit:?}");
            self.view.selected = None;
        } else {
            log::debug!("select {hit:?}");
            self.view.selected = Some(hit);
        }
        Redraw::Scene
    }

    pub fn clear_selection(&mut self) -> Redraw {
        if self.view.selected.take().is_some() {
            Redraw::Scene
        } else {
            Redraw::None
        }
    }

    fn set_zoom(&mut self, t: ZoomTransform) -> Redraw {
        if t == self.view.zoom {
            return Redraw::None;
        }
        self.view.zoom = t;
        Redraw::Scene
    }

    /// Scale by `factor` around `anchor`, as a wheel gesture would.
    pub fn zoom_by(&mut self, factor: f64, anchor: Point, now: f64) -> Redraw {
        let Some(z) = self.zoom else {
            return Redraw::None;
        };
        if self.is_animating(now) {
            return Redraw::None;
        }
        self.set_zoom(z.scale_by(self.view.zoom, factor, anchor))
    }

    /// Step zoom in, anchored at the plot center.
    pub fn zoom_in(&mut self, plot: Rect, now: f64) -> Redraw {
        self.zoom_by(ZOOM_IN_FACTOR, plot.center(), now)
    }

    pub fn zoom_out(&mut self, plot: Rect, now: f64) -> Redraw {
        self.zoom_by(ZOOM_OUT_FACTOR, plot.center(), now)
    }

    pub fn reset_zoom(&mut self, now: f64) -> Redraw {
        if self.zoom.is_none() || self.is_animating(now) {
            return Redraw::None;
        }
        self.set_zoom(ZoomTransform::IDENTITY)
    }

    /// Mouse wheel over the plot; zooms around the pointer.
    pub fn wheel(&mut self, plot: Rect, p: Point, delta_y: f64, now: f64) -> Redraw {
        if !plot.contains(p) {
            return Redraw::None;
        }
        self.zoom_by(ZoomBehavior::wheel_factor(delta_y), p, now)
    }

    pub fn drag_start(&mut self, plot: Rect, p: Point, now: f64) {
        if self.zoom.is_some() && plot.contains(p) && !self.is_animating(now) {
            self.drag_from = Some(p);
        }
    }

    pub fn drag_to(&mut self, p: Point, now: f64) -> Redraw {
        let (Some(z), Some(from)) = (self.zoom, self.drag_from) else {
            return Redraw::None;
        };
        if self.is_animating(now) {
            return Redraw::None;
        }
        self.drag_from = Some(p);
        self.set_zoom(z.translate_by(self.view.zoom, p.x - from.x, p.y - from.y))
    }

    pub fn drag_end(&mut self) {
        self.drag_from = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_from.is_some()
    }

    /// New container size. Hover refers to the old layout and is dropped.
    pub fn resize(&mut self, size: Size) -> Redraw {
        if size == self.view.size {
            return Redraw::None;
        }
        self.view.size = size;
        self.view.hovered = None;
        self.view.pointer = None;
        Redraw::Full
    }
}

/// Multi-select membership over a fixed key universe (cluster checkboxes).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActiveSet {
    universe: Vec<String>,
    active: BTreeSet<String>,
}

impl ActiveSet {
    /// Every key starts active. Repeated keys are kept once, at their first
    /// position.
    pub fn all<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = AHashSet::new();
        let universe: Vec<String> = keys
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| seen.insert(k.clone()))
            .collect();
        let active = universe.iter().cloned().collect();
        Self { universe, active }
    }

    pub fn universe(&self) -> &[String] {
        &self.universe
    }

    pub fn active(&self) -> &BTreeSet<String> {
        &self.active
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.active.contains(key)
    }

    /// Flip one key. Keys outside the universe are ignored.
    pub fn toggle(&mut self, key: &str) {
        if !self.universe.iter().any(|k| k == key) {
            return;
        }
        if !self.active.remove(key) {
            self.active.insert(key.to_string());
        }
    }

    pub fn select_all(&mut self) {
        self.active = self.universe.iter().cloned().collect();
    }

    pub fn clear_all(&mut self) {
        self.active.clear();
    }

    /// Percent of the active total contributed by `key`; 0 when `key` is
    /// inactive or nothing is active.
    pub fn share_of_active(&self, key: &str, value_of: impl Fn(&str) -> f64) -> f64 {
        if !self.is_active(key) {
            return 0.0;
        }
        let total: f64 = self.active.iter().map(|k| value_of(k)).sum();
        if total > 0.0 {
            value_of(key) / total * 100.0
        } else {
            0.0
        }
    }

    /// Percent of the whole universe contributed by `key`.
    pub fn share_of_all(&self, key: &str, value_of: impl Fn(&str) -> f64) -> f64 {
        let total: f64 = self.universe.iter().map(|k| value_of(k)).sum();
        if total > 0.0 {
            value_of(key) / total * 100.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescale_keeps_anchor_fixed() {
        let t = ZoomTransform {
            k: 2.0,
            x: 10.0,
            y: -4.0,
        };
        let anchor = Point::new(120.0, 80.0);
        let z = ZoomBehavior::new((0.5, 20.0)).scale_by(t, 1.5, anchor);
        let before = t.invert(anchor);
        let after = z.invert(anchor);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
        assert_eq!(z.k, 3.0);
    }

    #[test]
    fn wheel_delta_inverts_factor() {
        let d = ZoomBehavior::wheel_delta_for(1.5);
        assert!((ZoomBehavior::wheel_factor(d) - 1.5).abs() < 1e-12);
    }
}
