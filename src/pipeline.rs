//! fetch → summarize → scale → render, as explicit stages.
//!
//! [`DataStage`] owns the fetched snapshot and drops responses that were
//! superseded by a newer request. [`ChartPipeline`] derives a renderer input
//! from one snapshot plus the view parameters, and recomputes it only when
//! either of those changes. The entry animation replays only when the
//! snapshot itself changed, never for viewport changes.

use crate::config::LOADING_MESSAGE;
use crate::error::FetchError;
use crate::interaction::{InteractionController, Redraw, ViewportState};
use crate::layout::{ResponsiveLayoutObserver, Size};
use crate::viz::scene::{Point, Rect, Scene};
use crate::viz::{ChartRenderer, Tooltip};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// Hands out increasing tickets; only the latest one is current.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: u64,
}

impl RequestSequencer {
    pub fn issue(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    pub fn is_current(&self, t: Ticket) -> bool {
        t.0 == self.latest
    }
}

static NEXT_SNAPSHOT_ID: AtomicU64 = AtomicU64::new(1);

/// Fetched data with a process-unique identity.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub id: u64,
    pub data: Arc<T>,
}

impl<T> Snapshot<T> {
    /// Wrap `data` under a fresh id, never reused within the process.
    pub fn new(data: T) -> Self {
        Self {
            id: NEXT_SNAPSHOT_ID.fetch_add(1, Ordering::Relaxed),
            data: Arc::new(data),
        }
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            data: Arc::clone(&self.data),
        }
    }
}

#[derive(Debug, Clone)]
pub enum LoadState<T> {
    Idle,
    Loading,
    Ready(Snapshot<T>),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn snapshot(&self) -> Option<&Snapshot<T>> {
        match self {
            LoadState::Ready(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

/// Fetch stage of one page.
#[derive(Debug)]
pub struct DataStage<T> {
    sequencer: RequestSequencer,
    state: LoadState<T>,
}

impl<T> Default for DataStage<T> {
    fn default() -> Self {
        Self {
            sequencer: RequestSequencer::default(),
            state: LoadState::Idle,
        }
    }
}

impl<T> DataStage<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LoadState<T> {
        &self.state
    }

    /// Start a request. Data from earlier requests is discarded so nothing
    /// stale stays on screen while the new one is in flight.
    pub fn begin(&mut self) -> Ticket {
        self.state = LoadState::Loading;
        self.sequencer.issue()
    }

    /// Settle the request behind `ticket`. Returns false, and changes
    /// nothing, when a newer request has been issued since.
    pub fn complete(&mut self, ticket: Ticket, result: Result<T, FetchError>) -> bool {
        if !self.sequencer.is_current(ticket) {
            log::info!("dropping superseded response {ticket:?}");
            return false;
        }
        self.state = match result {
            Ok(data) => LoadState::Ready(Snapshot::new(data)),
            Err(e) => {
                log::warn!("fetch failed: {e}");
                LoadState::Failed(e.to_string())
            }
        };
        true
    }
}

/// Input identity: which snapshot, under which view parameters.
type InputKey = (u64, u64);

/// One chart instance: renderer, cached input and scene, interaction state.
pub struct ChartPipeline<R: ChartRenderer> {
    renderer: R,
    controller: InteractionController,
    observer: ResponsiveLayoutObserver,
    key: Option<InputKey>,
    input: Option<Arc<R::Input>>,
    message: Option<String>,
    scene: Scene,
    renders: usize,
}

impl<R: ChartRenderer> ChartPipeline<R> {
    pub fn new(renderer: R, size: Size) -> Self {
        let mut controller = InteractionController::new(size.clamp_min(Size::MIN_CHART));
        if let Some(extent) = renderer.zoom_extent() {
            controller = controller.with_zoom(extent);
        }
        if renderer.selectable() {
            controller = controller.selectable();
        }
        let scene = Scene::placeholder(controller.view().size, "");
        Self {
            renderer,
            controller,
            observer: ResponsiveLayoutObserver::default(),
            key: None,
            input: None,
            message: None,
            scene,
            renders: 0,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn view(&self) -> &ViewportState {
        self.controller.view()
    }

    pub fn input(&self) -> Option<&R::Input> {
        self.input.as_deref()
    }

    /// Number of scenes built so far.
    pub fn render_count(&self) -> usize {
        self.renders
    }

    fn rerender(&mut self) {
        self.renders += 1;
        let size = self.controller.view().size;
        self.scene = match (&self.input, &self.message) {
            (_, Some(msg)) => Scene::placeholder(size, msg),
            (Some(input), None) => self.renderer.render(input, self.controller.view()),
            (None, None) => Scene::placeholder(size, ""),
        };
    }

    /// Bring the chart in line with the page's load state. `prepare` derives
    /// the renderer input from the snapshot and runs only when the snapshot
    /// or `params_rev` changed.
    pub fn sync<T>(
        &mut self,
        state: &LoadState<T>,
        params_rev: u64,
        now: f64,
        prepare: impl FnOnce(&T) -> R::Input,
    ) -> Redraw {
        let message = match state {
            LoadState::Idle => Some(String::new()),
            LoadState::Loading => Some(LOADING_MESSAGE.to_string()),
            LoadState::Failed(e) => Some(format!("Failed to load data: {e}")),
            LoadState::Ready(_) => None,
        };
        let Some(snap) = state.snapshot() else {
            if message == self.message {
                return Redraw::None;
            }
            self.key = None;
            self.input = None;
            self.message = message;
            self.rerender();
            return Redraw::Full;
        };
        let key = (snap.id, params_rev);
        if self.key == Some(key) && self.message.is_none() {
            return Redraw::None;
        }
        let data_changed = self.key.map(|(id, _)| id) != Some(snap.id);
        self.set_input(prepare(&snap.data), data_changed, now);
        self.key = Some(key);
        Redraw::Full
    }

    /// Replace the input directly. Animates entry when `data_changed`.
    pub fn set_input(&mut self, input: R::Input, data_changed: bool, now: f64) {
        self.input = Some(Arc::new(input));
        self.message = None;
        if data_changed {
            self.controller.clear_selection();
            self.controller.begin_entry_animation(now);
        }
        self.rerender();
    }

    /// The scene to paint at `now`, mid-animation when one is running.
    pub fn scene(&self, now: f64) -> Scene {
        let progress = self.controller.animation_progress(now);
        if progress < 1.0 && self.scene.has_entry_animation() {
            self.scene.at_progress(progress)
        } else {
            self.scene.clone()
        }
    }

    /// The settled scene, without animation.
    pub fn final_scene(&self) -> &Scene {
        &self.scene
    }

    pub fn is_animating(&self, now: f64) -> bool {
        self.controller.is_animating(now)
    }

    pub fn plot_area(&self) -> Rect {
        self.scene.plot_area
    }

    /// Tooltip for the hovered mark, computed fresh from the current input.
    pub fn tooltip(&self) -> Option<Tooltip> {
        let input = self.input.as_ref()?;
        let entity = self.controller.view().hovered.as_ref()?;
        self.renderer.tooltip(input, entity)
    }

    fn after(&mut self, redraw: Redraw) -> Redraw {
        if redraw >= Redraw::Scene {
            self.rerender();
        }
        redraw
    }

    pub fn pointer_move(&mut self, p: Point, now: f64) -> Redraw {
        let r = self.controller.pointer_move(&self.scene, p, now);
        self.after(r)
    }

    pub fn pointer_leave(&mut self) -> Redraw {
        let r = self.controller.pointer_leave();
        self.after(r)
    }

    pub fn click(&mut self, p: Point, now: f64) -> Redraw {
        let r = self.controller.click(&self.scene, p, now);
        self.after(r)
    }

    pub fn clear_selection(&mut self) -> Redraw {
        let r = self.controller.clear_selection();
        self.after(r)
    }

    pub fn zoom_in(&mut self, now: f64) -> Redraw {
        let r = self.controller.zoom_in(self.scene.plot_area, now);
        self.after(r)
    }

    pub fn zoom_out(&mut self, now: f64) -> Redraw {
        let r = self.controller.zoom_out(self.scene.plot_area, now);
        self.after(r)
    }

    pub fn reset_zoom(&mut self, now: f64) -> Redraw {
        let r = self.controller.reset_zoom(now);
        self.after(r)
    }

    pub fn wheel(&mut self, p: Point, delta_y: f64, now: f64) -> Redraw {
        let r = self.controller.wheel(self.scene.plot_area, p, delta_y, now);
        self.after(r)
    }

    pub fn drag_start(&mut self, p: Point, now: f64) {
        self.controller.drag_start(self.scene.plot_area, p, now);
    }

    pub fn drag_to(&mut self, p: Point, now: f64) -> Redraw {
        let r = self.controller.drag_to(p, now);
        self.after(r)
    }

    pub fn drag_end(&mut self) {
        self.controller.drag_end();
    }

    /// Raw container-size notification.
    pub fn observe_size(&mut self, raw: Size, now: f64) -> Redraw {
        match self.observer.observe(raw, now) {
            Some(size) => {
                let r = self.controller.resize(size);
                self.after(r)
            }
            None => Redraw::None,
        }
    }

    /// Advance timers: applies a settled resize.
    pub fn tick(&mut self, now: f64) -> Redraw {
        match self.observer.poll(now) {
            Some(size) => {
                let r = self.controller.resize(size);
                self.after(r)
            }
            None => Redraw::None,
        }
    }
}

/// Object-safe face of a [`ChartPipeline`] for hosts juggling several charts.
pub trait InteractiveChart {
    fn scene(&self, now: f64) -> Scene;
    fn tooltip(&self) -> Option<Tooltip>;
    fn plot_area(&self) -> Rect;
    fn is_animating(&self, now: f64) -> bool;
    fn supports_zoom(&self) -> bool;
    fn pointer_move(&mut self, p: Point, now: f64) -> Redraw;
    fn pointer_leave(&mut self) -> Redraw;
    fn click(&mut self, p: Point, now: f64) -> Redraw;
    fn clear_selection(&mut self) -> Redraw;
    fn zoom_in(&mut self, now: f64) -> Redraw;
    fn zoom_out(&mut self, now: f64) -> Redraw;
    fn reset_zoom(&mut self, now: f64) -> Redraw;
    fn wheel(&mut self, p: Point, delta_y: f64, now: f64) -> Redraw;
    fn drag_start(&mut self, p: Point, now: f64);
    fn drag_to(&mut self, p: Point, now: f64) -> Redraw;
    fn drag_end(&mut self);
    fn observe_size(&mut self, raw: Size, now: f64) -> Redraw;
    fn tick(&mut self, now: f64) -> Redraw;
}

impl<R: ChartRenderer> InteractiveChart for ChartPipeline<R> {
    fn scene(&self, now: f64) -> Scene {
        ChartPipeline::scene(self, now)
    }
    fn tooltip(&self) -> Option<Tooltip> {
        ChartPipeline::tooltip(self)
    }
    fn plot_area(&self) -> Rect {
        ChartPipeline::plot_area(self)
    }
    fn is_animating(&self, now: f64) -> bool {
        ChartPipeline::is_animating(self, now)
    }
    fn supports_zoom(&self) -> bool {
        self.renderer.zoom_extent().is_some()
    }
    fn pointer_move(&mut self, p: Point, now: f64) -> Redraw {
        ChartPipeline::pointer_move(self, p, now)
    }
    fn pointer_leave(&mut self) -> Redraw {
        ChartPipeline::pointer_leave(self)
    }
    fn click(&mut self, p: Point, now: f64) -> Redraw {
        ChartPipeline::click(self, p, now)
    }
    fn clear_selection(&mut self) -> Redraw {
        ChartPipeline::clear_selection(self)
    }
    fn zoom_in(&mut self, now: f64) -> Redraw {
        ChartPipeline::zoom_in(self, now)
    }
    fn zoom_out(&mut self, now: f64) -> Redraw {
        ChartPipeline::zoom_out(self, now)
    }
    fn reset_zoom(&mut self, now: f64) -> Redraw {
        ChartPipeline::reset_zoom(self, now)
    }
    fn wheel(&mut self, p: Point, delta_y: f64, now: f64) -> Redraw {
        ChartPipeline::wheel(self, p, delta_y, now)
    }
    fn drag_start(&mut self, p: Point, now: f64) {
        ChartPipeline::drag_start(self, p, now)
    }
    fn drag_to(&mut self, p: Point, now: f64) -> Redraw {
        ChartPipeline::drag_to(self, p, now)
    }
    fn drag_end(&mut self) {
        ChartPipeline::drag_end(self)
    }
    fn observe_size(&mut self, raw: Size, now: f64) -> Redraw {
        ChartPipeline::observe_size(self, raw, now)
    }
    fn tick(&mut self, now: f64) -> Redraw {
        ChartPipeline::tick(self, now)
    }
}
