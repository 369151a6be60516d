use chrono::{Duration, NaiveDateTime};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use tracing::warn;

use crate::error::{InjectError, Result};

/// Per-timestep anomaly code. 0 means untouched.
pub type LabelCode = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Power,    // per-step power readings
    Energy,   // cumulative meter readings
}

impl FromStr for Domain {
    type Err = InjectError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "power" => Ok(Self::Power),
            "energy" => Ok(Self::Energy),
            _ => Err(InjectError::InvalidDomain(raw.to_string())),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Power => write!(f, "power"),
            Domain::Energy => write!(f, "energy"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnomalyType {
    Type1,   // power: neg spike, zeros, pos spike | energy: drop to zero, jump back
    Type2,   // power: drop then pos spike        | energy: gradient stagnation
    Type3,   // power: neg spike                  | energy: sudden dip
    Type4,   // power: pos spike                  | energy: gradient increase
}

// Nice short names for logs and reports
pub fn anom_slug(t: AnomalyType) -> &'static str {
    match t {
        AnomalyType::Type1 => "type1",
        AnomalyType::Type2 => "type2",
        AnomalyType::Type3 => "type3",
        AnomalyType::Type4 => "type4",
    }
}

/// Number of windows to inject, either absolute or relative to the series length.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnomalyCount {
    Absolute(usize),
    Fraction(f64),
}

impl FromStr for AnomalyCount {
    type Err = InjectError;

    // integer text first, float text second
    fn from_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if let Ok(n) = raw.parse::<usize>() {
            return Ok(Self::Absolute(n));
        }
        let frac = raw.parse::<f64>().map_err(|_| {
            InjectError::configuration(format!("count '{raw}' is neither an integer nor a float"))
        })?;
        if !(0.0..=1.0).contains(&frac) {
            return Err(InjectError::configuration(format!(
                "fractional count must lie in [0, 1], got {frac}"
            )));
        }
        Ok(Self::Fraction(frac))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthDistribution {
    #[default]
    Uniform,
    Normal,
    Fixed,
}

/// Window length distribution, bounds inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthParams {
    pub distribution: LengthDistribution,
    pub min: usize,
    pub max: usize,
}

impl LengthParams {
    pub fn uniform(min: usize, max: usize) -> Self {
        Self { distribution: LengthDistribution::Uniform, min, max }
    }

    pub fn fixed(len: usize) -> Self {
        Self { distribution: LengthDistribution::Fixed, min: len, max: len }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnomalyParams {
    pub range_r: (f64, f64),
    pub is_extreme: bool,
    pub k: f64,         // energy offset
    pub softstart: bool,
}

impl Default for AnomalyParams {
    fn default() -> Self {
        Self { range_r: (1.0, 1.0), is_extreme: false, k: 0.0, softstart: false }
    }
}

/// One stage of an injection pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnomalySpec {
    pub anomaly: AnomalyType,
    pub count: AnomalyCount,
    pub label: LabelCode,
    pub seed: u64,
    /// `None` lets the sampler pick the per-type default.
    pub length: Option<LengthParams>,
    pub params: AnomalyParams,
}

/// Half-open index interval `[start, start + len)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub start: usize,
    pub len: usize,
}

impl Window {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    pub fn overlaps(&self, other: &Window) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

const TIME_LABEL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamped numeric series; timestamps strictly increasing.
#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    pub timestamps: Vec<NaiveDateTime>,
    /// Time index as written back to output files.
    pub time_labels: Vec<String>,
    pub values: Array1<f64>,
}

impl Series {
    pub fn new(timestamps: Vec<NaiveDateTime>, values: Array1<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(InjectError::invalid_series("series is empty"));
        }
        if timestamps.len() != values.len() {
            return Err(InjectError::invalid_series(format!(
                "timestamp count {} does not match value count {}",
                timestamps.len(),
                values.len()
            )));
        }
        if let Some(i) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(InjectError::invalid_series(format!(
                "timestamps not strictly increasing at row {} ({} -> {})",
                i + 1,
                timestamps[i],
                timestamps[i + 1]
            )));
        }

        let time_labels = timestamps.iter().map(|t| t.format(TIME_LABEL_FORMAT).to_string()).collect();
        let series = Self { timestamps, time_labels, values };
        if series.len() > 1 && series.interval().is_none() {
            warn!("series sampling interval is not uniform");
        }
        Ok(series)
    }

    /// Keep the time index exactly as it was read, e.g. with offsets or sub-second digits.
    pub fn with_time_labels(mut self, labels: Vec<String>) -> Result<Self> {
        if labels.len() != self.len() {
            return Err(InjectError::invalid_series(format!(
                "time label count {} does not match value count {}",
                labels.len(),
                self.len()
            )));
        }
        self.time_labels = labels;
        Ok(self)
    }

    /// Regular series starting at `t0`, handy for synthetic inputs.
    pub fn regular(t0: NaiveDateTime, step: Duration, values: Array1<f64>) -> Result<Self> {
        let timestamps = (0..values.len()).map(|i| t0 + step * i as i32).collect();
        Self::new(timestamps, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sampling interval if every step is the same.
    pub fn interval(&self) -> Option<Duration> {
        let mut steps = self.timestamps.windows(2).map(|w| w[1] - w[0]);
        let first = steps.next()?;
        steps.all(|d| d == first).then_some(first)
    }
}
