use ndarray::{s, Array1};
use rand::rngs::StdRng;
use rand_distr::{Distribution, Uniform};

use crate::data_structures::{AnomalyParams, AnomalyType, Domain, Window};
use crate::error::{InjectError, Result};
use crate::utils::{local_gradient, softstart_factor};

/// Extreme type-3 draws widen the upper ratio bound by this factor.
pub const EXTREME_R_SCALE: f64 = 10.0;

// residual fraction kept during a type-2 drop
const POWER_DROP_RANGE: (f64, f64) = (0.0, 0.3);
const ENERGY_STAGNATION_RANGE: (f64, f64) = (0.0, 0.5);

/// Distort `values[window]` in place.
pub fn apply_anomaly(
    rng: &mut StdRng,
    values: &mut Array1<f64>,
    window: Window,
    domain: Domain,
    kind: AnomalyType,
    params: &AnomalyParams,
) -> Result<()> {
    if window.len == 0 || window.end() > values.len() {
        return Err(InjectError::configuration(format!(
            "window {}..{} outside series of length {}",
            window.start,
            window.end(),
            values.len()
        )));
    }

    match (domain, kind) {
        (Domain::Power, AnomalyType::Type1) => power_type1(values, window, params),
        (Domain::Power, AnomalyType::Type2) => power_type2(rng, values, window, params),
        (Domain::Power, AnomalyType::Type3) => power_type3(rng, values, window, params),
        (Domain::Power, AnomalyType::Type4) => power_type4(rng, values, window, params),
        (Domain::Energy, AnomalyType::Type1) => energy_type1(values, window),
        (Domain::Energy, AnomalyType::Type2) => energy_type2(rng, values, window, params),
        (Domain::Energy, AnomalyType::Type3) => energy_type3(rng, values, window, params),
        (Domain::Energy, AnomalyType::Type4) => energy_type4(rng, values, window, params),
    }
}

pub fn draw_ratio(rng: &mut StdRng, params: &AnomalyParams, widen: bool) -> Result<f64> {
    let (lo, hi) = params.range_r;
    let hi = if widen && params.is_extreme { hi * EXTREME_R_SCALE } else { hi };
    if !(lo.is_finite() && hi.is_finite()) || lo > hi {
        return Err(InjectError::configuration(format!("invalid ratio range ({lo}, {hi})")));
    }
    Ok(Uniform::new_inclusive(lo, hi)?.sample(rng))
}

fn draw_in(rng: &mut StdRng, range: (f64, f64)) -> Result<f64> {
    Ok(Uniform::new(range.0, range.1)?.sample(rng))
}

fn require_len(window: Window, min: usize, kind: AnomalyType) -> Result<()> {
    if window.len < min {
        return Err(InjectError::configuration(format!(
            "{kind:?} needs windows of at least {min} steps, got {}",
            window.len
        )));
    }
    Ok(())
}

// ------------------------ power ------------------------

// negative spike, zeros, positive spike; window sum conserved
fn power_type1(values: &mut Array1<f64>, window: Window, params: &AnomalyParams) -> Result<()> {
    require_len(window, 3, AnomalyType::Type1)?;
    let mut w = values.slice_mut(s![window.range()]);
    let l = w.len();
    let energy = w.sum();
    let neg = -((energy / l as f64).abs() + params.k);

    w.fill(0.0);
    w[0] = neg;
    w[l - 1] = energy - neg;
    Ok(())
}

// drop toward zero then release the withheld energy in one spike
fn power_type2(
    rng: &mut StdRng,
    values: &mut Array1<f64>,
    window: Window,
    params: &AnomalyParams,
) -> Result<()> {
    require_len(window, 2, AnomalyType::Type2)?;
    let q = draw_in(rng, POWER_DROP_RANGE)?;
    let mut w = values.slice_mut(s![window.range()]);
    let l = w.len();
    let ramp = if params.softstart { ((l - 1) / 2).max(1) } else { 0 };

    let mut withheld = 0.0;
    for i in 0..l - 1 {
        let f = softstart_factor(i, ramp, q);
        let v = w[i];
        w[i] = v * f;
        withheld += v - w[i];
    }
    w[l - 1] += withheld;
    Ok(())
}

// sudden drop, value reduced by ratio r: v * (1 - r) - k
fn power_type3(
    rng: &mut StdRng,
    values: &mut Array1<f64>,
    window: Window,
    params: &AnomalyParams,
) -> Result<()> {
    let r = draw_ratio(rng, params, true)?;
    let k = params.k;
    values.slice_mut(s![window.range()]).mapv_inplace(|v| v * (1.0 - r) - k);
    Ok(())
}

// sudden positive spike: v * r
fn power_type4(
    rng: &mut StdRng,
    values: &mut Array1<f64>,
    window: Window,
    params: &AnomalyParams,
) -> Result<()> {
    let r = draw_ratio(rng, params, false)?;
    values.slice_mut(s![window.range()]).mapv_inplace(|v| v * r);
    Ok(())
}

// ------------------------ energy ------------------------

// meter reads zero, then jumps back onto its trajectory
fn energy_type1(values: &mut Array1<f64>, window: Window) -> Result<()> {
    require_len(window, 2, AnomalyType::Type1)?;
    values.slice_mut(s![window.start..window.end() - 1]).fill(0.0);
    Ok(())
}

// gradient reduced by q, last step returns to the true trajectory
fn energy_type2(
    rng: &mut StdRng,
    values: &mut Array1<f64>,
    window: Window,
    params: &AnomalyParams,
) -> Result<()> {
    require_len(window, 2, AnomalyType::Type2)?;
    let q = draw_in(rng, ENERGY_STAGNATION_RANGE)?;
    let l = window.len;
    let ramp = if params.softstart { ((l - 1) / 2).max(1) } else { 0 };

    let steps: Vec<f64> = window.range().map(|i| local_gradient(values.view(), i)).collect();
    let mut level = if window.start > 0 {
        values[window.start - 1]
    } else {
        values[0] - steps[0]
    };
    for (j, i) in window.range().take(l - 1).enumerate() {
        level += steps[j] * softstart_factor(j, ramp, q);
        values[i] = level;
    }
    Ok(())
}

// sudden dip: v - |r - 1| * g_ref - k
fn energy_type3(
    rng: &mut StdRng,
    values: &mut Array1<f64>,
    window: Window,
    params: &AnomalyParams,
) -> Result<()> {
    let r = draw_ratio(rng, params, true)?;
    shift_by_gradient(values, window, -(r - 1.0).abs(), -params.k);
    Ok(())
}

// sudden gradient increase: v + |r - 1| * g_ref
fn energy_type4(
    rng: &mut StdRng,
    values: &mut Array1<f64>,
    window: Window,
    params: &AnomalyParams,
) -> Result<()> {
    let r = draw_ratio(rng, params, false)?;
    shift_by_gradient(values, window, (r - 1.0).abs(), 0.0);
    Ok(())
}

// g_ref is the local |g|, else the mean |g| of the series, else |v|
fn shift_by_gradient(values: &mut Array1<f64>, window: Window, scale: f64, offset: f64) {
    let view = values.view();
    let mean_step = mean_abs_gradient(values);
    let steps: Vec<f64> = window
        .range()
        .map(|i| {
            let g = local_gradient(view, i).abs();
            if g > 0.0 {
                g
            } else if mean_step > 0.0 {
                mean_step
            } else {
                view[i].abs()
            }
        })
        .collect();
    for (j, i) in window.range().enumerate() {
        values[i] += scale * steps[j] + offset;
    }
}

fn mean_abs_gradient(values: &Array1<f64>) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let total: f64 = values.windows(2).into_iter().map(|w| (w[1] - w[0]).abs()).sum();
    total / (n - 1) as f64
}
