use chrono::NaiveDateTime;
use ndarray::Array1;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::anomaly::apply_anomaly;
use crate::config::GenerationConfig;
use crate::data_structures::{
    anom_slug, AnomalyParams, AnomalySpec, AnomalyType, Domain, LabelCode, LengthParams, Series,
    Window,
};
use crate::error::{InjectError, Result};
use crate::sampler::{effective_bounds, resolve_count, sample_windows};
use crate::utils::{shaper_rng, window_rng};

// extreme type-3 power draws always use the full ratio range
const EXTREME_RANGE_R: (f64, f64) = (0.01, 3.99);

/// What one stage did to the series.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StageReport {
    pub anomaly: AnomalyType,
    pub label: LabelCode,
    pub seed: u64,
    pub windows: Vec<Window>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InjectionResult {
    pub timestamps: Vec<NaiveDateTime>,
    pub time_labels: Vec<String>,
    pub y: Array1<f64>,
    pub y_hat: Array1<f64>,
    pub labels: Array1<LabelCode>,
    pub stages: Vec<StageReport>,
}

impl InjectionResult {
    pub fn anomalous_steps(&self) -> usize {
        self.labels.iter().filter(|&&l| l != 0).count()
    }
}

/// Ordered stages for a domain. Order and labels are part of the output contract.
pub fn build_stages(domain: Domain, cfg: &GenerationConfig) -> Vec<AnomalySpec> {
    let seed = cfg.seed;
    let type1_len = LengthParams::uniform(cfg.type1_len_min, cfg.type1_len_max);
    let type2_len = LengthParams::uniform(cfg.type2_len_min, cfg.type2_len_max);
    let type4_params = AnomalyParams {
        range_r: (cfg.type4_r_min, cfg.type4_r_max),
        ..AnomalyParams::default()
    };

    match domain {
        Domain::Power => {
            let type3 = if cfg.type3_extreme {
                AnomalySpec {
                    anomaly: AnomalyType::Type3,
                    count: cfg.type3,
                    label: 32,
                    seed: seed.wrapping_add(4),
                    length: None,
                    params: AnomalyParams {
                        range_r: EXTREME_RANGE_R,
                        is_extreme: true,
                        k: cfg.k,
                        ..AnomalyParams::default()
                    },
                }
            } else {
                AnomalySpec {
                    anomaly: AnomalyType::Type3,
                    count: cfg.type3,
                    label: 31,
                    seed: seed.wrapping_add(3),
                    length: None,
                    params: AnomalyParams {
                        range_r: (cfg.type3_r_min, cfg.type3_r_max),
                        ..AnomalyParams::default()
                    },
                }
            };
            vec![
                AnomalySpec {
                    anomaly: AnomalyType::Type1,
                    count: cfg.type1,
                    label: 1,
                    seed: seed.wrapping_add(1),
                    length: Some(type1_len),
                    params: AnomalyParams { k: cfg.k, ..AnomalyParams::default() },
                },
                AnomalySpec {
                    anomaly: AnomalyType::Type2,
                    count: cfg.type2,
                    label: 2,
                    seed: seed.wrapping_add(2),
                    length: Some(type2_len),
                    params: AnomalyParams { softstart: cfg.type2_softstart, ..AnomalyParams::default() },
                },
                type3,
                AnomalySpec {
                    anomaly: AnomalyType::Type4,
                    count: cfg.type4,
                    label: 4,
                    seed: seed.wrapping_add(5),
                    length: None,
                    params: type4_params,
                },
            ]
        }
        Domain::Energy => vec![
            AnomalySpec {
                anomaly: AnomalyType::Type3,
                count: cfg.type3,
                label: 3,
                seed: seed.wrapping_add(1),
                length: None,
                params: AnomalyParams {
                    range_r: (cfg.type3_r_min, cfg.type3_r_max),
                    is_extreme: cfg.type3_extreme,
                    ..AnomalyParams::default()
                },
            },
            AnomalySpec {
                anomaly: AnomalyType::Type4,
                count: cfg.type4,
                label: 4,
                seed: seed.wrapping_add(3),
                length: None,
                params: type4_params,
            },
            AnomalySpec {
                anomaly: AnomalyType::Type1,
                count: cfg.type1,
                label: 1,
                seed: seed.wrapping_add(4),
                length: Some(type1_len),
                params: AnomalyParams::default(),
            },
            AnomalySpec {
                anomaly: AnomalyType::Type2,
                count: cfg.type2,
                label: 2,
                seed: seed.wrapping_add(5),
                length: Some(type2_len),
                params: AnomalyParams { softstart: cfg.type2_softstart, ..AnomalyParams::default() },
            },
        ],
    }
}

/// Run one stage over `values`, returning the distorted values, merged labels
/// and the windows it placed. `labels` from earlier stages are carried forward
/// unchanged outside the new windows.
pub fn inject(
    domain: Domain,
    spec: &AnomalySpec,
    values: &Array1<f64>,
    labels: Option<&Array1<LabelCode>>,
) -> Result<(Array1<f64>, Array1<LabelCode>, Vec<Window>)> {
    let n = values.len();
    if spec.label == 0 {
        return Err(InjectError::configuration("label code 0 is reserved for clean steps"));
    }
    let mut merged = match labels {
        Some(l) if l.len() != n => {
            return Err(InjectError::invalid_series(format!(
                "label length {} does not match series length {n}",
                l.len()
            )))
        }
        Some(l) => l.clone(),
        None => Array1::zeros(n),
    };

    let count = resolve_count(spec.count, n)?;
    let length = effective_bounds(spec.anomaly, spec.length)?;

    let mut placement = window_rng(spec.seed);
    let windows = sample_windows(&mut placement, n, count, &length, Some(merged.view()))?;

    let mut shaping = shaper_rng(spec.seed);
    let mut out = values.clone();
    for w in &windows {
        apply_anomaly(&mut shaping, &mut out, *w, domain, spec.anomaly, &spec.params)?;
        merged.slice_mut(ndarray::s![w.range()]).fill(spec.label);
    }

    debug!(
        anomaly = anom_slug(spec.anomaly),
        label = spec.label,
        windows = windows.len(),
        "stage injected"
    );
    Ok((out, merged, windows))
}

/// Chain every stage for `domain` over one series.
pub fn run_stages(series: &Series, domain: Domain, stages: &[AnomalySpec]) -> Result<InjectionResult> {
    let mut y_hat = series.values.clone();
    let mut labels = Array1::<LabelCode>::zeros(series.len());
    let mut reports = Vec::with_capacity(stages.len());

    for spec in stages {
        let (next, merged, windows) = inject(domain, spec, &y_hat, Some(&labels))?;
        y_hat = next;
        labels = merged;
        reports.push(StageReport {
            anomaly: spec.anomaly,
            label: spec.label,
            seed: spec.seed,
            windows,
        });
    }

    Ok(InjectionResult {
        timestamps: series.timestamps.clone(),
        time_labels: series.time_labels.clone(),
        y: series.values.clone(),
        y_hat,
        labels,
        stages: reports,
    })
}

pub fn run_pipeline(series: &Series, domain: Domain, cfg: &GenerationConfig) -> Result<InjectionResult> {
    let stages = build_stages(domain, cfg);
    let result = run_stages(series, domain, &stages)?;
    info!(
        domain = %domain,
        n = series.len(),
        anomalous = result.anomalous_steps(),
        "anomaly generation finished"
    );
    Ok(result)
}

/// Independent series in parallel; each gets its own generators.
pub fn run_batch(
    series: &[Series],
    domain: Domain,
    cfg: &GenerationConfig,
) -> Result<Vec<InjectionResult>> {
    let stages = build_stages(domain, cfg);
    series
        .par_iter()
        .map(|s| run_stages(s, domain, &stages))
        .collect()
}
