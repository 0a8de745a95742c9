//! Public types shared by the chart renderers.

use crate::layout::Margins;
use serde::{Deserialize, Serialize};

/// Legend placement options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegendMode {
    /// No legend.
    Hidden,
    /// Separate, non-overlapping legend panel on the right side.
    Right,
    /// Separate, non-overlapping legend band at the bottom.
    Bottom,
}

/// Horizontal legend below the chart keeps labels close to the x-axis start.
pub const DEFAULT_LEGEND_MODE: LegendMode = LegendMode::Bottom;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// Bars grow upward from the x axis.
    Vertical,
    /// Bars grow rightward from the y axis; categories run top to bottom.
    Horizontal,
}

/// Time-series drawing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineMode {
    Lines,
    /// Each series filled down to zero, drawn translucent.
    Area,
    /// Series stacked on top of each other.
    StackedArea,
}

/// Per-chart presentation settings: labels, margins, legend and locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Margins at the reference size; scaled with the container.
    pub margins: Margins,
    pub legend: LegendMode,
    pub legend_title: String,
    pub locale: String,
    /// Approximate number of ticks on a continuous axis.
    pub ticks: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            x_label: String::new(),
            y_label: String::new(),
            margins: Margins::new(48.0, 24.0, 56.0, 72.0),
            legend: DEFAULT_LEGEND_MODE,
            legend_title: String::new(),
            locale: "en".to_string(),
            ticks: 6,
        }
    }
}

impl ChartConfig {
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub fn axes(mut self, x: &str, y: &str) -> Self {
        self.x_label = x.to_string();
        self.y_label = y.to_string();
        self
    }

    pub fn legend(mut self, mode: LegendMode) -> Self {
        self.legend = mode;
        self
    }

    pub fn legend_title(mut self, title: &str) -> Self {
        self.legend_title = title.to_string();
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    pub fn locale(mut self, tag: &str) -> Self {
        self.locale = tag.to_string();
        self
    }
}

/// Tooltip content, computed from the hovered datum when it is needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tooltip {
    pub title: String,
    pub rows: Vec<(String, String)>,
}

impl Tooltip {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.rows.push((label.into(), value.into()));
        self
    }

    pub fn value_of(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }
}
