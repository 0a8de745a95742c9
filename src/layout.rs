//! Container sizing: chart dimensions, proportional margins, and the
//! debounced resize observer that decides when a chart must re-render.

use crate::config::{MIN_CHART_HEIGHT, MIN_CHART_WIDTH, RESIZE_DEBOUNCE_SECS};
use crate::viz::scene::{Point, Rect};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const MIN_CHART: Size = Size {
        width: MIN_CHART_WIDTH,
        height: MIN_CHART_HEIGHT,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Each dimension raised to at least `min`'s; non-finite dimensions become the minimum.
    pub fn clamp_min(self, min: Size) -> Size {
        let fix = |v: f64, lo: f64| if v.is_finite() { v.max(lo) } else { lo };
        Size::new(fix(self.width, min.width), fix(self.height, min.height))
    }

    pub fn center(self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Size the base margins are designed for.
pub const REFERENCE_SIZE: Size = Size {
    width: 800.0,
    height: 600.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    pub const fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Margins scaled with the container relative to [`REFERENCE_SIZE`].
    /// The factor is kept within `[0.75, 1.5]` so labels stay legible.
    pub fn scaled_to(self, size: Size) -> Margins {
        let fx = (size.width / REFERENCE_SIZE.width).clamp(0.75, 1.5);
        let fy = (size.height / REFERENCE_SIZE.height).clamp(0.75, 1.5);
        Margins {
            top: self.top * fy,
            right: self.right * fx,
            bottom: self.bottom * fy,
            left: self.left * fx,
        }
    }

    /// Plot rectangle inside `size`, never narrower or shorter than 1px.
    pub fn inner(self, size: Size) -> Rect {
        Rect::new(
            self.left,
            self.top,
            (size.width - self.left - self.right).max(1.0),
            (size.height - self.top - self.bottom).max(1.0),
        )
    }
}

/// Turns a stream of raw container-size notifications into re-render triggers.
///
/// The first measurement applies immediately. Later ones are batched: a new
/// size is emitted once no further notification arrived for the debounce
/// interval, and only when the clamped size actually changed.
#[derive(Debug, Clone)]
pub struct ResponsiveLayoutObserver {
    min: Size,
    debounce_secs: f64,
    current: Option<Size>,
    pending: Option<(Size, f64)>,
}

impl Default for ResponsiveLayoutObserver {
    fn default() -> Self {
        Self::new(Size::MIN_CHART)
    }
}

impl ResponsiveLayoutObserver {
    pub fn new(min: Size) -> Self {
        Self {
            min,
            debounce_secs: RESIZE_DEBOUNCE_SECS,
            current: None,
            pending: None,
        }
    }

    pub fn with_debounce(mut self, secs: f64) -> Self {
        self.debounce_secs = secs.max(0.0);
        self
    }

    pub fn current(&self) -> Option<Size> {
        self.current
    }

    /// True while a notification waits for its debounce interval.
    pub fn is_settling(&self) -> bool {
        self.pending.is_some()
    }

    /// Record a size notification at time `now` (seconds). Returns the size to
    /// render with when this is the first measurement.
    pub fn observe(&mut self, raw: Size, now: f64) -> Option<Size> {
        if self.current.is_none() {
            let size = raw.clamp_min(self.min);
            self.current = Some(size);
            self.pending = None;
            return Some(size);
        }
        self.pending = Some((raw, now + self.debounce_secs));
        None
    }

    /// Emit the settled size once the debounce interval has elapsed.
    pub fn poll(&mut self, now: f64) -> Option<Size> {
        let (raw, deadline) = self.pending?;
        if now < deadline {
            return None;
        }
        self.pending = None;
        let size = raw.clamp_min(self.min);
        if self.current == Some(size) {
            return None;
        }
        log::debug!(
            "container resized to {:.0}x{:.0}",
            size.width,
            size.height
        );
        self.current = Some(size);
        Some(size)
    }
}
