//! aviation_dash
//!
//! Analytics core for an aviation accident dashboard, built as an explicit
//! summarize → scale → render → interact pipeline. Pairs with the `avdash`
//! CLI and the `avdash-gui` desktop viewer.
//!
//! ### Features
//! - Descriptive statistics: five-number summaries with Tukey outliers,
//!   histogram binning, top-N with remainder, share grouping, period series
//! - Stable categorical colors shared across charts through a [`ScaleRegistry`]
//! - Box plot, histogram, bar, pie, line/area, scatter and choropleth
//!   renderers producing a toolkit-free [`Scene`], written to SVG via plotters
//! - Hover, click selection, multi-select, zoom and pan with entry-animation gating
//! - Debounced responsive relayout
//!
//! ### Example
//! ```no_run
//! use aviation_dash::api::{DataSource, FileSource};
//! use aviation_dash::viz::{BoxPlotRenderer, ChartConfig, ChartRenderer};
//! use aviation_dash::interaction::ViewportState;
//! use aviation_dash::layout::Size;
//! use aviation_dash::scales::ScaleRegistry;
//!
//! let source = FileSource::new("fixtures");
//! let registry = ScaleRegistry::new();
//! let input = aviation_dash::views::aboard_box_plot(&source.aboard_distribution()?, &registry);
//! let renderer = BoxPlotRenderer::new(ChartConfig::titled("People aboard"));
//! let scene = renderer.render(&input, &ViewportState::new(Size::new(800.0, 600.0)));
//! aviation_dash::viz::write_svg(&scene, "aboard.svg")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod geo;
pub mod interaction;
pub mod layout;
pub mod models;
pub mod pipeline;
pub mod scales;
pub mod stats;
pub mod views;
pub mod viz;

pub use api::{Client, DataSource, FileSource};
pub use error::{ChartError, FetchError};
pub use interaction::{InteractionController, ViewportState};
pub use layout::{ResponsiveLayoutObserver, Size};
pub use models::GroupKey;
pub use scales::ScaleRegistry;
pub use viz::{ChartRenderer, Scene};
