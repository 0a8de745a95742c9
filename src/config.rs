//! Named thresholds and the upstream API configuration.

use std::time::Duration;

/// Values beyond `q1 - k·IQR` or `q3 + k·IQR` are outliers.
pub const OUTLIER_IQR_MULTIPLIER: f64 = 1.5;

/// Pie slices below this share (percent) are folded into one "Other" slice.
pub const OTHER_SHARE_THRESHOLD_PCT: f64 = 1.5;

pub const OTHER_LABEL: &str = "Other";
pub const OTHERS_LABEL: &str = "Others";

/// Manufacturer share pie: named slices before "Others".
pub const TOP_MANUFACTURERS: usize = 5;

/// Length of the ranked lists in headline statistics.
pub const HEADLINE_TOP_N: usize = 5;

/// Entry animation (box growth, bar growth, fade-in), seconds.
pub const ENTRY_ANIMATION_SECS: f64 = 0.7;

/// Resize notifications closer together than this are batched, seconds.
pub const RESIZE_DEBOUNCE_SECS: f64 = 0.1;

pub const MIN_CHART_WIDTH: f64 = 300.0;
pub const MIN_CHART_HEIGHT: f64 = 200.0;

/// Scale bounds for the scatterplot point layer.
pub const SCATTER_ZOOM_EXTENT: (f64, f64) = (0.5, 20.0);
/// Scale bounds for the choropleth map layer.
pub const MAP_ZOOM_EXTENT: (f64, f64) = (1.0, 8.0);

pub const ZOOM_IN_FACTOR: f64 = 1.5;
pub const ZOOM_OUT_FACTOR: f64 = 0.75;
/// Wheel zoom factor is `2^(-delta_y * WHEEL_ZOOM_SENSITIVITY)`.
pub const WHEEL_ZOOM_SENSITIVITY: f64 = 0.002;

/// Opacity of bars outside the active set.
pub const DEEMPHASIZED_OPACITY: f64 = 0.3;

pub const POINT_RADIUS: f64 = 5.0;
pub const POINT_RADIUS_HOVER: f64 = 8.0;
pub const POINT_OPACITY: f64 = 0.7;
pub const SELECTION_STROKE_WIDTH: f64 = 2.0;

/// Hovered pie slices move outward by this fraction of their centroid.
pub const PIE_HOVER_OFFSET: f64 = 0.1;

/// Scatter axes extend this far beyond the data extent.
pub const SCATTER_DOMAIN_PADDING: f64 = 0.5;

pub const NO_DATA_MESSAGE: &str = "No data available";
pub const LOADING_MESSAGE: &str = "Loading…";

/// Where and how to reach the accident statistics API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Sleep before each retry of a transient failure.
    pub retry_backoff_ms: Vec<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".into(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            retry_backoff_ms: vec![100, 300, 700],
        }
    }
}

impl ApiConfig {
    /// Defaults, overridden by `AVDASH_API_URL` and `AVDASH_TIMEOUT_SECS` when set.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(url) = std::env::var("AVDASH_API_URL") {
            let url = url.trim().trim_end_matches('/');
            if !url.is_empty() {
                cfg.base_url = url.to_string();
            }
        }
        if let Some(secs) = std::env::var("AVDASH_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
        {
            cfg.timeout = Duration::from_secs(secs.max(1));
        }
        cfg
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim().trim_end_matches('/').to_string();
        self
    }
}
