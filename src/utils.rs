use ndarray::ArrayView1;
use rand::{rngs::StdRng, SeedableRng};

// Stream constant separating the shaper generator from the window generator.
const SHAPER_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

// ------------------------ helpers ------------------------

/// Round half up; inputs are non-negative counts.
pub fn round_half_up(x: f64) -> usize {
    (x + 0.5).floor().max(0.0) as usize
}

/// Generator for window placement of one stage.
pub fn window_rng(stage_seed: u64) -> StdRng {
    StdRng::seed_from_u64(stage_seed)
}

/// Generator for distortion magnitudes of one stage, independent of placement.
pub fn shaper_rng(stage_seed: u64) -> StdRng {
    StdRng::seed_from_u64(stage_seed ^ SHAPER_STREAM)
}

/// Step into index `i`; forward difference at the series start.
pub fn local_gradient(values: ArrayView1<f64>, i: usize) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    if i == 0 {
        values[1] - values[0]
    } else {
        values[i] - values[i - 1]
    }
}

/// Linear ramp from 1 to `target` over `ramp` steps, then flat at `target`.
pub fn softstart_factor(step: usize, ramp: usize, target: f64) -> f64 {
    if step >= ramp {
        return target;
    }
    let a = (step + 1) as f64 / (ramp + 1) as f64;
    1.0 - (1.0 - target) * a
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;
    use rand::Rng;

    #[test]
    fn round_half_up_boundaries() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.4999), 2);
        assert_eq!(round_half_up(0.0), 0);
        assert_eq!(round_half_up(100.0), 100);
    }

    #[test]
    fn gradient_uses_forward_difference_at_start() {
        let v = arr1(&[1.0, 3.0, 6.0]);
        assert_eq!(local_gradient(v.view(), 0), 2.0);
        assert_eq!(local_gradient(v.view(), 2), 3.0);
        assert_eq!(local_gradient(arr1(&[5.0]).view(), 0), 0.0);
    }

    #[test]
    fn softstart_reaches_target() {
        assert!(softstart_factor(0, 3, 0.0) < 1.0);
        assert!(softstart_factor(0, 3, 0.0) > softstart_factor(1, 3, 0.0));
        assert_eq!(softstart_factor(3, 3, 0.2), 0.2);
    }

    #[test]
    fn streams_differ_for_same_seed() {
        let a: u64 = window_rng(7).random();
        let b: u64 = shaper_rng(7).random();
        assert_ne!(a, b);
        let c: u64 = window_rng(7).random();
        assert_eq!(a, c);
    }
}
