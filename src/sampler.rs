use ndarray::ArrayView1;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal, Uniform};
use tracing::debug;

use crate::data_structures::{
    AnomalyCount, AnomalyType, LabelCode, LengthDistribution, LengthParams, Window,
};
use crate::error::{InjectError, Result};
use crate::utils::round_half_up;

/// Rejection-sampling attempts allowed per requested window.
pub const MAX_ATTEMPTS_PER_WINDOW: usize = 1000;

// type-specific clamps
const TYPE1_MIN_LEN: usize = 3;
const TYPE1_MAX_LEN: usize = 96;
const TYPE1_MIN_CEILING: usize = TYPE1_MAX_LEN - 4;
const TYPE2_MIN_LEN: usize = 2;
const TYPE2_MAX_LEN: usize = 48;
const SPIKE_MAX_LEN: usize = 96;

pub fn resolve_count(count: AnomalyCount, n: usize) -> Result<usize> {
    match count {
        AnomalyCount::Absolute(c) => Ok(c),
        AnomalyCount::Fraction(f) => {
            if !(0.0..=1.0).contains(&f) {
                return Err(InjectError::configuration(format!(
                    "fractional count must lie in [0, 1], got {f}"
                )));
            }
            Ok(round_half_up(f * n as f64))
        }
    }
}

/// Apply the per-type safety clamps to the requested length bounds.
pub fn effective_bounds(anomaly: AnomalyType, length: Option<LengthParams>) -> Result<LengthParams> {
    let out = match (anomaly, length) {
        (AnomalyType::Type1, Some(lp)) => {
            let min = if lp.min < TYPE1_MIN_CEILING { lp.min.max(TYPE1_MIN_LEN) } else { TYPE1_MIN_CEILING };
            LengthParams { min, max: lp.max.min(TYPE1_MAX_LEN), ..lp }
        }
        (AnomalyType::Type1, None) => LengthParams::uniform(TYPE1_MIN_LEN, TYPE1_MAX_LEN),
        (AnomalyType::Type2, Some(lp)) => LengthParams {
            min: lp.min.max(TYPE2_MIN_LEN),
            max: lp.max.min(TYPE2_MAX_LEN),
            ..lp
        },
        (AnomalyType::Type2, None) => LengthParams::uniform(TYPE2_MIN_LEN, TYPE2_MAX_LEN),
        (AnomalyType::Type3 | AnomalyType::Type4, Some(lp)) => LengthParams {
            min: lp.min.max(1),
            max: lp.max.min(SPIKE_MAX_LEN),
            ..lp
        },
        // sudden spikes are single steps
        (AnomalyType::Type3 | AnomalyType::Type4, None) => LengthParams::fixed(1),
    };

    if out.min > out.max {
        return Err(InjectError::configuration(format!(
            "window length bounds for {anomaly:?} are empty after clamping: min {} > max {}",
            out.min, out.max
        )));
    }
    Ok(out)
}

fn draw_length(rng: &mut StdRng, lp: &LengthParams) -> Result<usize> {
    let len = match lp.distribution {
        LengthDistribution::Fixed => lp.min,
        LengthDistribution::Uniform => Uniform::new_inclusive(lp.min, lp.max)?.sample(rng),
        LengthDistribution::Normal => {
            let mean = (lp.min + lp.max) as f64 / 2.0;
            let sd = ((lp.max - lp.min) as f64 / 4.0).max(1e-9);
            let x: f64 = Normal::new(mean, sd)?.sample(rng);
            (x.round().max(0.0) as usize).clamp(lp.min, lp.max)
        }
    };
    Ok(len)
}

/// Draw `count` disjoint windows in `[0, n)` that avoid every index already
/// carrying a non-zero label in `occupied`. Windows come back in acceptance
/// order.
pub fn sample_windows(
    rng: &mut StdRng,
    n: usize,
    count: usize,
    length: &LengthParams,
    occupied: Option<ArrayView1<LabelCode>>,
) -> Result<Vec<Window>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if length.min == 0 {
        return Err(InjectError::configuration("window length must be at least 1"));
    }
    if length.min > n {
        return Err(InjectError::configuration(format!(
            "minimum window length {} exceeds series length {n}",
            length.min
        )));
    }
    if let Some(occ) = occupied {
        if occ.len() != n {
            return Err(InjectError::invalid_series(format!(
                "label length {} does not match series length {n}",
                occ.len()
            )));
        }
    }

    // claimed[i] is true once any pass (earlier or this one) owns index i
    let mut claimed: Vec<bool> = match occupied {
        Some(occ) => occ.iter().map(|&l| l != 0).collect(),
        None => vec![false; n],
    };

    let max_attempts = MAX_ATTEMPTS_PER_WINDOW.saturating_mul(count);
    let mut windows = Vec::with_capacity(count);
    let mut attempts = 0usize;

    while windows.len() < count {
        if attempts >= max_attempts {
            return Err(InjectError::configuration(format!(
                "placed only {} of {count} windows (length {}..={}) in a series of {n} after {attempts} attempts",
                windows.len(),
                length.min,
                length.max
            )));
        }
        attempts += 1;

        let len = draw_length(rng, length)?.min(n);
        let start = Uniform::new_inclusive(0, n - len)?.sample(rng);
        let cand = Window::new(start, len);

        if claimed[cand.range()].iter().any(|&c| c) {
            continue;
        }
        claimed[cand.range()].iter_mut().for_each(|c| *c = true);
        windows.push(cand);
    }

    debug!(count, attempts, "sampled windows");
    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::window_rng;
    use ndarray::Array1;

    #[test]
    fn fraction_rounds_half_up() {
        assert_eq!(resolve_count(AnomalyCount::Fraction(0.1), 1000).unwrap(), 100);
        // 0.0625 * 40 = 2.5 exactly
        assert_eq!(resolve_count(AnomalyCount::Fraction(0.0625), 40).unwrap(), 3);
        // 0.375 * 4 = 1.5 exactly
        assert_eq!(resolve_count(AnomalyCount::Fraction(0.375), 4).unwrap(), 2);
        assert_eq!(resolve_count(AnomalyCount::Fraction(0.25), 10).unwrap(), 3);
        assert_eq!(resolve_count(AnomalyCount::Absolute(7), 10).unwrap(), 7);
        assert!(resolve_count(AnomalyCount::Fraction(1.2), 10).is_err());
    }

    #[test]
    fn type1_bounds_are_clamped() {
        let lp = effective_bounds(AnomalyType::Type1, Some(LengthParams::uniform(1, 200))).unwrap();
        assert_eq!((lp.min, lp.max), (3, 96));
        let lp = effective_bounds(AnomalyType::Type1, Some(LengthParams::uniform(95, 200))).unwrap();
        assert_eq!((lp.min, lp.max), (92, 96));
    }

    #[test]
    fn type2_bounds_are_clamped() {
        let lp = effective_bounds(AnomalyType::Type2, Some(LengthParams::uniform(0, 60))).unwrap();
        assert_eq!((lp.min, lp.max), (2, 48));
        assert!(effective_bounds(AnomalyType::Type2, Some(LengthParams::uniform(50, 60))).is_err());
    }

    #[test]
    fn spikes_default_to_single_step() {
        let lp = effective_bounds(AnomalyType::Type3, None).unwrap();
        assert_eq!((lp.min, lp.max), (1, 1));
        assert_eq!(lp.distribution, LengthDistribution::Fixed);
    }

    #[test]
    fn windows_are_disjoint_and_in_bounds() {
        let mut rng = window_rng(42);
        let lp = LengthParams::uniform(6, 10);
        let ws = sample_windows(&mut rng, 500, 20, &lp, None).unwrap();
        assert_eq!(ws.len(), 20);
        for (i, a) in ws.iter().enumerate() {
            assert!(a.end() <= 500);
            assert!((6..=10).contains(&a.len));
            for b in &ws[i + 1..] {
                assert!(!a.overlaps(b));
            }
        }
    }

    #[test]
    fn same_seed_same_windows() {
        let lp = LengthParams::uniform(3, 8);
        let a = sample_windows(&mut window_rng(9), 300, 10, &lp, None).unwrap();
        let b = sample_windows(&mut window_rng(9), 300, 10, &lp, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn occupied_indices_are_avoided() {
        let mut labels = Array1::<LabelCode>::zeros(100);
        labels.slice_mut(ndarray::s![0..90]).fill(1);
        let lp = LengthParams::fixed(2);
        let ws = sample_windows(&mut window_rng(1), 100, 5, &lp, Some(labels.view())).unwrap();
        for w in ws {
            assert!(w.start >= 90);
        }
    }

    #[test]
    fn impossible_request_fails_instead_of_looping() {
        let lp = LengthParams::fixed(10);
        let err = sample_windows(&mut window_rng(3), 50, 6, &lp, None).unwrap_err();
        assert!(matches!(err, InjectError::Configuration(_)));
    }

    #[test]
    fn window_longer_than_series_fails() {
        let lp = LengthParams::uniform(20, 30);
        assert!(sample_windows(&mut window_rng(3), 10, 1, &lp, None).is_err());
    }

    #[test]
    fn normal_lengths_stay_in_bounds() {
        let lp = LengthParams { distribution: LengthDistribution::Normal, min: 4, max: 12 };
        let ws = sample_windows(&mut window_rng(5), 2000, 50, &lp, None).unwrap();
        assert!(ws.iter().all(|w| (4..=12).contains(&w.len)));
    }
}
