//! Error types.
//!
//! Statistical and scale failures ([`ChartError`]) are recovered inside the
//! component that raised them: renderers turn them into placeholder scenes or
//! fall back to a linear color scale. Fetch failures ([`FetchError`]) travel up
//! to whatever owns the page state and are shown to the user.

use std::path::PathBuf;
use thiserror::Error;

/// Recoverable failures raised by the summarize and scale stages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    /// A statistic was requested over zero valid observations.
    #[error("no valid observations ({excluded} non-finite values excluded)")]
    EmptyInput { excluded: usize },
    /// A logarithmic scale was requested with a non-positive lower bound.
    #[error("invalid log domain [{min}, {max}]: lower bound must be > 0")]
    InvalidDomain { min: f64, max: f64 },
    /// Bin edges were not finite and strictly increasing, or a zero bin count was given.
    #[error("invalid bin specification: {0}")]
    InvalidBins(String),
}

pub type ChartResult<T> = std::result::Result<T, ChartError>;

/// Upstream request failed or returned something unusable.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url} failed with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("GET {url}: network error: {message}")]
    Network { url: String, message: String },
    #[error("decode {url}: {message}")]
    Decode { url: String, message: String },
    #[error("read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// True for failures worth retrying (server errors and transport errors).
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => *status >= 500,
            FetchError::Network { .. } => true,
            FetchError::Decode { .. } | FetchError::Io { .. } => false,
        }
    }
}
