//! Chart renderers: pure `(input, viewport) -> Scene` functions.
//!
//! - Box plot, histogram, bar (vertical or horizontal, with multi-select
//!   de-emphasis), pie, line/area/stacked area, scatter and choropleth
//! - Locale-aware tick labels (`30,000` vs `30.000`)
//! - Legend placement: `Right` panel or `Bottom` band, never overlapping the plot
//! - Entry animations encoded on the marks, replayed with [`Scene::at_progress`]
//! - SVG output through plotters ([`svg`])
//!
//! Every renderer is idempotent: the scene is rebuilt from scratch on each
//! call, and an empty input yields the "No data available" placeholder.

pub mod axis;
pub mod bar;
pub mod boxplot;
pub mod choropleth;
pub mod legend;
pub mod line;
pub mod pie;
pub mod scatter;
pub mod scene;
pub mod svg;
pub mod text;
pub mod types;
pub mod util;

pub use bar::{Bar, BarInput, BarRenderer, HistogramInput, HistogramRenderer};
pub use boxplot::{BoxPlotInput, BoxPlotRenderer};
pub use choropleth::{ChoroplethInput, ChoroplethRenderer};
pub use line::{LineInput, LineRenderer};
pub use pie::{PieInput, PieRenderer};
pub use scatter::{ScatterInput, ScatterRenderer};
pub use scene::{EntityRef, Scene};
pub use svg::{render_svg_string, write_svg};
pub use types::{ChartConfig, DEFAULT_LEGEND_MODE, LegendMode, LineMode, Orientation, Tooltip};

use crate::interaction::ViewportState;
use crate::layout::Size;

/// One chart family.
pub trait ChartRenderer {
    /// Summaries and scales the chart draws, derived from one data snapshot.
    type Input;

    /// Build the complete scene for `input` at the viewport's size, hover,
    /// selection and zoom.
    fn render(&self, input: &Self::Input, view: &ViewportState) -> Scene;

    /// Tooltip for a hovered mark, computed from `input` on demand.
    fn tooltip(&self, input: &Self::Input, entity: &EntityRef) -> Option<Tooltip>;

    /// Zoom limits when the chart supports pan/zoom.
    fn zoom_extent(&self) -> Option<(f64, f64)> {
        None
    }

    /// Whether clicking a mark selects it.
    fn selectable(&self) -> bool {
        false
    }
}

/// Container size clamped to the chart minimum.
pub(crate) fn chart_size(view: &ViewportState) -> Size {
    view.size.clamp_min(Size::MIN_CHART)
}
