use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::data_structures::AnomalyCount;
use crate::error::Result;

/// Every knob of a generation run. Defaults match the command line defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub type1: AnomalyCount,
    pub type1_len_min: usize,
    pub type1_len_max: usize,

    pub type2: AnomalyCount,
    pub type2_len_min: usize,
    pub type2_len_max: usize,
    pub type2_softstart: bool,

    pub type3: AnomalyCount,
    pub type3_r_min: f64,
    pub type3_r_max: f64,
    pub type3_extreme: bool,

    pub type4: AnomalyCount,
    pub type4_r_min: f64,
    pub type4_r_max: f64,

    /// Energy offset for type 1 (power) and extreme type 3.
    pub k: f64,
    pub seed: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            type1: AnomalyCount::Absolute(3),
            type1_len_min: 6,
            type1_len_max: 10,
            type2: AnomalyCount::Absolute(3),
            type2_len_min: 6,
            type2_len_max: 10,
            type2_softstart: false,
            type3: AnomalyCount::Absolute(4),
            type3_r_min: 0.01,
            type3_r_max: 3.99,
            type3_extreme: false,
            type4: AnomalyCount::Absolute(10),
            type4_r_min: 2.0,
            type4_r_max: 5.0,
            k: 0.0,
            seed: 42,
        }
    }
}

impl GenerationConfig {
    /// Load from a TOML file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let cfg: Self = toml::from_str(&raw)?;
        debug!(path = %path.display(), "loaded generation config");
        Ok(cfg)
    }
}

/// How the input CSV is laid out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvOptions {
    pub value_column: String,
    /// `None` picks the first column.
    pub time_column: Option<String>,
    pub delimiter: u8,
    pub decimal: char,
}

impl CsvOptions {
    pub fn new(value_column: impl Into<String>) -> Self {
        Self {
            value_column: value_column.into(),
            time_column: None,
            delimiter: b';',
            decimal: ',',
        }
    }
}
