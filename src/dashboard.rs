//! The dashboard's views: what each one fetches, how it is prepared, and
//! which renderer draws it.
//!
//! [`View::fetch`] runs the fetch stage, [`DashboardChart`] holds the
//! [`ChartPipeline`] for the view and re-prepares its input whenever the
//! snapshot or the [`ViewParams`] revision changes.

use crate::api::{DataSource, DateRange};
use crate::error::FetchError;
use crate::geo::FeatureCollection;
use crate::interaction::{ActiveSet, Redraw};
use crate::layout::Size;
use crate::models::{AccidentRow, BinRow, ClusterData, CountryCount, GroupKey, ManufacturerYearRow};
use crate::pipeline::{ChartPipeline, InteractiveChart, LoadState, Snapshot};
use crate::scales::{CategoryScale, ScaleRegistry};
use crate::stats::{PeriodMode, PeriodSeries, ShareBreakdown};
use crate::viz::scene::Scene;
use crate::viz::{
    BarInput, BarRenderer, BoxPlotInput, BoxPlotRenderer, ChartConfig, ChoroplethInput,
    ChoroplethRenderer, HistogramInput, HistogramRenderer, LegendMode, LineInput, LineMode,
    LineRenderer, PieInput, PieRenderer, ScatterInput, ScatterRenderer,
};
use crate::views;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Aboard,
    Wingspan,
    Engines,
    Weight,
    Countries,
    CountryRanking,
    Clusters,
    ClusterDistribution,
    CountryClusters,
    ManufacturerShare,
    ManufacturerTotals,
    ManufacturerTrends,
    TemporalTrends,
    Yearly,
    Severity,
    Hourly,
}

impl View {
    pub const ALL: [View; 16] = [
        View::Aboard,
        View::Wingspan,
        View::Engines,
        View::Weight,
        View::Countries,
        View::CountryRanking,
        View::Clusters,
        View::ClusterDistribution,
        View::CountryClusters,
        View::ManufacturerShare,
        View::ManufacturerTotals,
        View::ManufacturerTrends,
        View::TemporalTrends,
        View::Yearly,
        View::Severity,
        View::Hourly,
    ];

    pub fn name(self) -> &'static str {
        match self {
            View::Aboard => "aboard",
            View::Wingspan => "wingspan",
            View::Engines => "engines",
            View::Weight => "weight",
            View::Countries => "countries",
            View::CountryRanking => "country-ranking",
            View::Clusters => "clusters",
            View::ClusterDistribution => "cluster-distribution",
            View::CountryClusters => "country-clusters",
            View::ManufacturerShare => "manufacturer-share",
            View::ManufacturerTotals => "manufacturer-totals",
            View::ManufacturerTrends => "manufacturer-trends",
            View::TemporalTrends => "temporal-trends",
            View::Yearly => "yearly",
            View::Severity => "severity",
            View::Hourly => "hourly",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            View::Aboard => "People Aboard by Weight Class",
            View::Wingspan => "Accident Rate by Wingspan Bins",
            View::Engines => "Amount of Accidents by Number of Engines",
            View::Weight => "Accident Rate by Weight Class",
            View::Countries => "Accidents by Operator Country",
            View::CountryRanking => "Countries with the Most Accidents",
            View::Clusters => "Accident Clusters",
            View::ClusterDistribution => "Accidents per Cluster",
            View::CountryClusters => "Accident Types by Country",
            View::ManufacturerShare => "Manufacturer Share of Accidents",
            View::ManufacturerTotals => "Total Accidents per Manufacturer",
            View::ManufacturerTrends => "Accidents per Manufacturer over Time",
            View::TemporalTrends => "Accident Types over Time",
            View::Yearly => "Accidents per Year",
            View::Severity => "Accidents by Fatality Range",
            View::Hourly => "Accidents by Hour of Day",
        }
    }

    fn config(self, locale: &str) -> ChartConfig {
        let (x, y) = match self {
            View::Aboard => ("Role and weight class", "People aboard"),
            View::Wingspan => ("Wingspan Bin", "Amount of Accidents"),
            View::Engines => ("Number of Engines", "Amount of Accidents"),
            View::Weight => ("Amount of Accidents", "Weight Class"),
            View::CountryRanking => ("Accidents", "Operator country"),
            View::ClusterDistribution => ("Cluster", "Points"),
            View::ManufacturerTotals => ("Manufacturer", "Accidents"),
            View::ManufacturerTrends | View::Yearly => ("Year", "Number of accidents"),
            View::TemporalTrends => ("Period", "Number of accidents"),
            View::Severity => ("Fatality Range", "Number of Accidents"),
            View::Hourly => ("Hour of Day", "Number of Accidents"),
            View::Clusters => ("Component 1", "Component 2"),
            View::Countries | View::CountryClusters | View::ManufacturerShare => ("", ""),
        };
        let legend = match self {
            View::Aboard
            | View::Clusters
            | View::CountryClusters
            | View::ManufacturerShare
            | View::ManufacturerTrends
            | View::TemporalTrends => LegendMode::Right,
            View::ClusterDistribution => LegendMode::Bottom,
            _ => LegendMode::Hidden,
        };
        let cfg = ChartConfig::titled(self.title())
            .axes(x, y)
            .legend(legend)
            .locale(locale);
        match self {
            View::Clusters | View::ClusterDistribution | View::TemporalTrends => {
                cfg.legend_title("Accident Types:")
            }
            _ => cfg,
        }
    }

    /// Run the fetch stage for this view.
    pub fn fetch(self, source: &dyn DataSource, params: &ViewParams) -> Result<ViewData, FetchError> {
        Ok(match self {
            View::Aboard => ViewData::Aboard(source.aboard_distribution()?),
            View::Wingspan => ViewData::Bins(source.wingspan_bins()?),
            View::Engines => ViewData::Categories(source.engine_rates()?),
            View::Weight => ViewData::Categories(source.weight_rates()?),
            View::Countries | View::CountryRanking => {
                ViewData::Countries(source.operator_countries(params.date_range)?)
            }
            View::Clusters
            | View::ClusterDistribution
            | View::CountryClusters
            | View::TemporalTrends => ViewData::Clusters(source.cluster_data()?),
            View::ManufacturerShare | View::ManufacturerTotals | View::ManufacturerTrends => {
                ViewData::Manufacturers(source.manufacturer_years()?)
            }
            View::Yearly | View::Severity | View::Hourly => ViewData::Accidents(source.accidents()?),
        })
    }

    /// Whether the cluster multi-select applies.
    pub fn uses_clusters(self) -> bool {
        matches!(
            self,
            View::Clusters | View::ClusterDistribution | View::TemporalTrends
        )
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        View::ALL
            .iter()
            .copied()
            .find(|v| v.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = View::ALL.iter().map(|v| v.name()).collect();
                format!("unknown view '{s}', expected one of: {}", names.join(", "))
            })
    }
}

/// Payload fetched for one view.
#[derive(Debug, Clone)]
pub enum ViewData {
    Aboard(BTreeMap<GroupKey, Vec<f64>>),
    Bins(Vec<BinRow>),
    Categories(Vec<(String, f64)>),
    Countries(Vec<CountryCount>),
    Clusters(ClusterData),
    Manufacturers(Vec<ManufacturerYearRow>),
    Accidents(Vec<AccidentRow>),
}

/// User-adjustable parameters. Changing any of them bumps the chart's
/// params revision, which re-prepares the input without re-animating.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewParams {
    /// Manufacturer share pie year; the latest year when unset.
    pub year: Option<i32>,
    /// Manufacturer totals year range, inclusive.
    pub year_range: Option<(i32, i32)>,
    pub top_n: usize,
    /// Manufacturer trend series to draw; all when unset.
    pub manufacturers: Option<BTreeSet<String>>,
    /// Country cluster pie; the country with most accidents when unset.
    pub country: Option<String>,
    pub period: PeriodMode,
    pub cumulative: bool,
    pub line_mode: LineMode,
    /// Active clusters for the multi-select views.
    pub clusters: Option<ActiveSet>,
    /// Operator-country fetch range.
    pub date_range: Option<DateRange>,
    pub locale: String,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            year: None,
            year_range: None,
            top_n: 10,
            manufacturers: None,
            country: None,
            period: PeriodMode::Yearly,
            cumulative: false,
            line_mode: LineMode::Lines,
            clusters: None,
            date_range: None,
            locale: "en".to_string(),
        }
    }
}

/// Everything preparation reads besides the snapshot.
pub struct PrepareContext<'a> {
    pub registry: &'a ScaleRegistry,
    pub features: Option<Arc<FeatureCollection>>,
    pub params: &'a ViewParams,
}

/// Prepared renderer input, one variant per renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewInput {
    BoxPlot(BoxPlotInput),
    Histogram(HistogramInput),
    Bars(BarInput),
    Pie(PieInput),
    Line(LineInput),
    Scatter(ScatterInput),
    Map(ChoroplethInput),
}

/// Derive the renderer input for `view`. `None` when the payload does not
/// belong to the view.
pub fn prepare(view: View, data: &ViewData, ctx: &PrepareContext) -> Option<ViewInput> {
    let p = ctx.params;
    let reg = ctx.registry;
    let active = p.clusters.as_ref();
    let input = match (view, data) {
        (View::Aboard, ViewData::Aboard(g)) => ViewInput::BoxPlot(views::aboard_box_plot(g, reg)),
        (View::Wingspan, ViewData::Bins(b)) => ViewInput::Histogram(views::wingspan_histogram(b)),
        (View::Engines, ViewData::Categories(c)) => ViewInput::Bars(views::engine_bars(c)),
        (View::Weight, ViewData::Categories(c)) => ViewInput::Bars(views::weight_bars(c)),
        (View::Countries, ViewData::Countries(c)) => {
            let features = ctx.features.clone().unwrap_or_default();
            ViewInput::Map(views::country_choropleth(features, c))
        }
        (View::CountryRanking, ViewData::Countries(c)) => ViewInput::Bars(views::country_ranking(c, reg)),
        (View::Clusters, ViewData::Clusters(d)) => {
            ViewInput::Scatter(views::cluster_scatter(d, reg, active))
        }
        (View::ClusterDistribution, ViewData::Clusters(d)) => {
            ViewInput::Bars(views::cluster_distribution_bars(d, reg, active))
        }
        (View::CountryClusters, ViewData::Clusters(d)) => {
            let country = p
                .country
                .clone()
                .or_else(|| views::cluster_countries(d).into_iter().next());
            match country {
                Some(c) => ViewInput::Pie(views::country_cluster_pie(d, &c, reg)),
                None => ViewInput::Pie(PieInput::new(
                    ShareBreakdown::default(),
                    views::cluster_colors(d, reg),
                )),
            }
        }
        (View::TemporalTrends, ViewData::Clusters(d)) => ViewInput::Line(views::temporal_trends(
            d,
            active,
            p.period,
            p.cumulative,
            p.line_mode,
            reg,
        )),
        (View::ManufacturerShare, ViewData::Manufacturers(rows)) => {
            let year = p
                .year
                .or_else(|| views::manufacturer_years(rows).into_iter().max())
                .unwrap_or_default();
            ViewInput::Pie(views::manufacturer_share_pie(rows, year, reg))
        }
        (View::ManufacturerTotals, ViewData::Manufacturers(rows)) => ViewInput::Bars(
            views::manufacturer_totals_bars(rows, p.year_range, p.top_n, reg),
        ),
        (View::ManufacturerTrends, ViewData::Manufacturers(rows)) => ViewInput::Line(
            views::manufacturer_trend_lines(rows, p.manufacturers.as_ref(), p.line_mode, reg),
        ),
        (View::Yearly, ViewData::Accidents(rows)) => ViewInput::Line(views::yearly_accidents(rows, reg)),
        (View::Severity, ViewData::Accidents(rows)) => ViewInput::Bars(views::severity_bars(rows)),
        (View::Hourly, ViewData::Accidents(rows)) => ViewInput::Bars(views::hourly_bars(rows)),
        _ => {
            log::warn!("payload does not match view {view}");
            return None;
        }
    };
    Some(input)
}

fn no_colors() -> Arc<CategoryScale> {
    Arc::new(CategoryScale::new(std::iter::empty::<&str>()))
}

/// A view's chart pipeline, typed by renderer.
pub enum DashboardChart {
    BoxPlot(ChartPipeline<BoxPlotRenderer>),
    Histogram(ChartPipeline<HistogramRenderer>),
    Bars(ChartPipeline<BarRenderer>),
    Pie(ChartPipeline<PieRenderer>),
    Line(ChartPipeline<LineRenderer>),
    Scatter(ChartPipeline<ScatterRenderer>),
    Map(ChartPipeline<ChoroplethRenderer>),
}

macro_rules! with_pipeline {
    ($chart:expr, $p:ident => $body:expr) => {
        match $chart {
            DashboardChart::BoxPlot($p) => $body,
            DashboardChart::Histogram($p) => $body,
            DashboardChart::Bars($p) => $body,
            DashboardChart::Pie($p) => $body,
            DashboardChart::Line($p) => $body,
            DashboardChart::Scatter($p) => $body,
            DashboardChart::Map($p) => $body,
        }
    };
}

impl DashboardChart {
    pub fn new(view: View, size: Size, locale: &str) -> Self {
        let cfg = view.config(locale);
        match view {
            View::Aboard => DashboardChart::BoxPlot(ChartPipeline::new(BoxPlotRenderer::new(cfg), size)),
            View::Wingspan => {
                DashboardChart::Histogram(ChartPipeline::new(HistogramRenderer::new(cfg), size))
            }
            View::Countries => DashboardChart::Map(ChartPipeline::new(ChoroplethRenderer::new(cfg), size)),
            View::Clusters => DashboardChart::Scatter(ChartPipeline::new(ScatterRenderer::new(cfg), size)),
            View::CountryClusters => {
                DashboardChart::Pie(ChartPipeline::new(PieRenderer::new(cfg), size))
            }
            View::ManufacturerShare => {
                DashboardChart::Pie(ChartPipeline::new(PieRenderer::new(cfg).donut(0.5), size))
            }
            View::ManufacturerTrends | View::TemporalTrends | View::Yearly => {
                DashboardChart::Line(ChartPipeline::new(LineRenderer::new(cfg), size))
            }
            View::ClusterDistribution => {
                DashboardChart::Bars(ChartPipeline::new(BarRenderer::new(cfg).with_selection(), size))
            }
            View::Engines
            | View::Weight
            | View::CountryRanking
            | View::ManufacturerTotals
            | View::Severity
            | View::Hourly => DashboardChart::Bars(ChartPipeline::new(BarRenderer::new(cfg), size)),
        }
    }

    /// Bring the chart in line with the page state; see [`ChartPipeline::sync`].
    pub fn sync(
        &mut self,
        view: View,
        state: &LoadState<ViewData>,
        params_rev: u64,
        ctx: &PrepareContext,
        now: f64,
    ) -> Redraw {
        macro_rules! arm {
            ($p:expr, $variant:ident, $empty:expr) => {
                $p.sync(state, params_rev, now, |d| match prepare(view, d, ctx) {
                    Some(ViewInput::$variant(input)) => input,
                    _ => $empty,
                })
            };
        }
        match self {
            DashboardChart::BoxPlot(p) => arm!(p, BoxPlot, BoxPlotInput::default()),
            DashboardChart::Histogram(p) => {
                arm!(p, Histogram, HistogramInput::new(std::iter::empty::<&BinRow>()))
            }
            DashboardChart::Bars(p) => arm!(p, Bars, BarInput::new(Vec::new())),
            DashboardChart::Pie(p) => arm!(p, Pie, PieInput::new(ShareBreakdown::default(), no_colors())),
            DashboardChart::Line(p) => arm!(
                p,
                Line,
                LineInput::new(
                    PeriodSeries {
                        mode: PeriodMode::Yearly,
                        periods: Vec::new(),
                        series: Vec::new(),
                        cumulative: false,
                    },
                    no_colors(),
                    LineMode::Lines
                )
            ),
            DashboardChart::Scatter(p) => arm!(p, Scatter, ScatterInput::new(Vec::new(), no_colors())),
            DashboardChart::Map(p) => arm!(
                p,
                Map,
                ChoroplethInput::new(Arc::default(), std::iter::empty::<(&str, f64)>())
            ),
        }
    }

    pub fn interactive(&self) -> &dyn InteractiveChart {
        with_pipeline!(self, p => p as &dyn InteractiveChart)
    }

    pub fn interactive_mut(&mut self) -> &mut dyn InteractiveChart {
        with_pipeline!(self, p => p as &mut dyn InteractiveChart)
    }

    /// The settled scene, without animation.
    pub fn final_scene(&self) -> &Scene {
        with_pipeline!(self, p => p.final_scene())
    }

    pub fn render_count(&self) -> usize {
        with_pipeline!(self, p => p.render_count())
    }
}

/// Fetch-free one-shot: prepare `data` for `view` and build its scene.
pub fn render_view(view: View, data: &ViewData, ctx: &PrepareContext, size: Size) -> Scene {
    let mut chart = DashboardChart::new(view, size, &ctx.params.locale);
    let state = LoadState::Ready(Snapshot::new(data.clone()));
    chart.sync(view, &state, 0, ctx, 0.0);
    chart.final_scene().clone()
}
