//! Error types for anomaly injection and the surrounding I/O.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InjectError {
    /// The requested count/length combination cannot be placed in the series.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid domain '{0}': expected \"power\" or \"energy\"")]
    InvalidDomain(String),

    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    #[error("Parse error at row {row}, column '{column}': {reason}")]
    Parse {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Plot error: {0}")]
    Plot(String),
}

impl InjectError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invalid_series(msg: impl Into<String>) -> Self {
        Self::InvalidSeries(msg.into())
    }
}

impl From<rand::distr::uniform::Error> for InjectError {
    fn from(err: rand::distr::uniform::Error) -> Self {
        Self::Configuration(format!("invalid sampling range: {err}"))
    }
}

impl From<rand_distr::NormalError> for InjectError {
    fn from(err: rand_distr::NormalError) -> Self {
        Self::Configuration(format!("invalid normal distribution: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, InjectError>;
