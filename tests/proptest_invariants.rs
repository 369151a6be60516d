use energy_anomaly_gen::*;
use ndarray::Array1;
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

const MIN_PROPTEST_CASES: u32 = 256;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

// (n, count, min_len, max_len) that always fit: count * max_len <= n / 2
fn feasible_request() -> impl Strategy<Value = (usize, usize, usize, usize)> {
    (1usize..=8, 0usize..=6).prop_flat_map(|(min_len, extra)| {
        let max_len = min_len + extra;
        (Just(max_len), 0usize..=10).prop_flat_map(move |(max_len, count)| {
            let lo = (2 * count * max_len).max(max_len);
            (lo..=lo + 400, Just(count), Just(min_len), Just(max_len))
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(proptest_cases()))]

    #[test]
    fn sampler_is_deterministic(
        seed in any::<u64>(),
        (n, count, min_len, max_len) in feasible_request(),
    ) {
        let lp = LengthParams::uniform(min_len, max_len);
        let a = sample_windows(&mut window_rng(seed), n, count, &lp, None).unwrap();
        let b = sample_windows(&mut window_rng(seed), n, count, &lp, None).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn windows_are_disjoint_and_in_bounds(
        seed in any::<u64>(),
        (n, count, min_len, max_len) in feasible_request(),
    ) {
        let lp = LengthParams::uniform(min_len, max_len);
        let ws = sample_windows(&mut window_rng(seed), n, count, &lp, None).unwrap();
        prop_assert_eq!(ws.len(), count);
        for (i, a) in ws.iter().enumerate() {
            prop_assert!(a.end() <= n);
            prop_assert!(a.len >= min_len && a.len <= max_len);
            for b in &ws[i + 1..] {
                prop_assert!(!a.overlaps(b));
            }
        }
    }

    #[test]
    fn energy_spikes_are_identity_with_neutral_params(
        seed in any::<u64>(),
        steps in prop::collection::vec(0.0f64..10.0, 4..64),
        start_frac in 0.0f64..1.0,
        kind in prop_oneof![Just(AnomalyType::Type3), Just(AnomalyType::Type4)],
    ) {
        // cumulative meter readings
        let mut acc = 0.0;
        let values: Array1<f64> = steps.iter().map(|s| { acc += s; acc }).collect();
        let n = values.len();
        let start = ((n - 1) as f64 * start_frac) as usize;
        let window = Window::new(start, 1);
        let neutral = AnomalyParams { range_r: (1.0, 1.0), k: 0.0, ..AnomalyParams::default() };

        let mut out = values.clone();
        apply_anomaly(&mut shaper_rng(seed), &mut out, window, Domain::Energy, kind, &neutral).unwrap();
        prop_assert_eq!(out, values);
    }

    #[test]
    fn later_stage_keeps_earlier_labels(
        seed in any::<u64>(),
        n in 200usize..600,
    ) {
        let values = Array1::from_elem(n, 20.0);
        let first = AnomalySpec {
            anomaly: AnomalyType::Type1,
            count: AnomalyCount::Absolute(3),
            label: 1,
            seed,
            length: Some(LengthParams::uniform(3, 8)),
            params: AnomalyParams::default(),
        };
        let second = AnomalySpec {
            anomaly: AnomalyType::Type4,
            count: AnomalyCount::Absolute(10),
            label: 4,
            seed: seed.wrapping_add(1),
            length: None,
            params: AnomalyParams { range_r: (2.0, 5.0), ..AnomalyParams::default() },
        };

        let (v1, l1, _) = inject(Domain::Power, &first, &values, None).unwrap();
        let (_, l2, w2) = inject(Domain::Power, &second, &v1, Some(&l1)).unwrap();
        for i in 0..n {
            let in_new = w2.iter().any(|w| w.range().contains(&i));
            if in_new {
                prop_assert_eq!(l1[i], 0);
                prop_assert_eq!(l2[i], 4);
            } else {
                prop_assert_eq!(l2[i], l1[i]);
            }
        }
    }

    #[test]
    fn placement_does_not_change_magnitudes(
        seed in any::<u64>(),
        n in 100usize..400,
    ) {
        // same stage seed on two lengths: ratio draws must match window by window
        let spec = AnomalySpec {
            anomaly: AnomalyType::Type4,
            count: AnomalyCount::Absolute(5),
            label: 4,
            seed,
            length: None,
            params: AnomalyParams { range_r: (2.0, 5.0), ..AnomalyParams::default() },
        };
        let a = Array1::from_elem(n, 1.0);
        let b = Array1::from_elem(n + 37, 1.0);
        let (ya, _, wa) = inject(Domain::Power, &spec, &a, None).unwrap();
        let (yb, _, wb) = inject(Domain::Power, &spec, &b, None).unwrap();
        for (x, y) in wa.iter().zip(&wb) {
            prop_assert_eq!(ya[x.start], yb[y.start]);
        }
    }
}
