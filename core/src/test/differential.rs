//! Randomized differential checks against the host FPU.
//!
//! The host is assumed to be a standard IEEE 754 machine in
//! round-to-nearest-even, which every Rust target we care about is. Results
//! are compared bit for bit, except NaNs: payload propagation is a
//! platform choice, so a NaN result only has to be a NaN.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::env::{FpEnv, Rounding};
use crate::repr::{F32, F64};

const ROUNDS: usize = 50_000;

/// Random f32 pattern biased toward the interesting exponent ranges:
/// uniform bits rarely hit subnormals, near-1.0 alignments or specials.
fn f32_bits(rng: &mut StdRng) -> u32 {
    let frac = rng.random::<u32>() & 0x007F_FFFF;
    let exp: u32 = match rng.random_range(0..8) {
        0 => 0,
        1 => 0xFF,
        2 | 3 => rng.random_range(112..=142),
        _ => rng.random_range(0..=0xFF),
    };
    (u32::from(rng.random::<bool>()) << 31) | (exp << 23) | frac
}

fn f64_bits(rng: &mut StdRng) -> u64 {
    let frac = rng.random::<u64>() & ((1 << 52) - 1);
    let exp: u64 = match rng.random_range(0..8) {
        0 => 0,
        1 => 0x7FF,
        2 | 3 => rng.random_range(0x3F0..=0x40F),
        _ => rng.random_range(0..=0x7FF),
    };
    (u64::from(rng.random::<bool>()) << 63) | (exp << 52) | frac
}

fn agree32(ours: F32, host: f32) -> bool {
    if host.is_nan() {
        ours.is_nan()
    } else {
        ours.to_bits() == host.to_bits()
    }
}

fn agree64(ours: F64, host: f64) -> bool {
    if host.is_nan() {
        ours.is_nan()
    } else {
        ours.to_bits() == host.to_bits()
    }
}

#[test]
fn f32_arithmetic_matches_host() {
    let mut rng = StdRng::seed_from_u64(0x5EED_0001);
    for _ in 0..ROUNDS {
        let (ab, bb) = (f32_bits(&mut rng), f32_bits(&mut rng));
        let (x, y) = (f32::from_bits(ab), f32::from_bits(bb));
        let (a, b) = (F32::from_bits(ab), F32::from_bits(bb));
        let mut env = FpEnv::default();

        assert!(agree32(a.add(b, &mut env), x + y), "{ab:#010x} + {bb:#010x}");
        assert!(agree32(a.sub(b, &mut env), x - y), "{ab:#010x} - {bb:#010x}");
        assert!(agree32(a.mul(b, &mut env), x * y), "{ab:#010x} * {bb:#010x}");
        assert!(agree32(a.div(b, &mut env), x / y), "{ab:#010x} / {bb:#010x}");
    }
}

#[test]
fn f32_sqrt_matches_host() {
    let mut rng = StdRng::seed_from_u64(0x5EED_0002);
    for _ in 0..ROUNDS {
        let ab = f32_bits(&mut rng);
        let mut env = FpEnv::default();
        let z = F32::from_bits(ab).sqrt(&mut env);
        assert!(agree32(z, f32::from_bits(ab).sqrt()), "sqrt {ab:#010x}");
    }
}

#[test]
fn f64_arithmetic_matches_host() {
    let mut rng = StdRng::seed_from_u64(0x5EED_0003);
    for _ in 0..ROUNDS {
        let (ab, bb) = (f64_bits(&mut rng), f64_bits(&mut rng));
        let (x, y) = (f64::from_bits(ab), f64::from_bits(bb));
        let (a, b) = (F64::from_bits(ab), F64::from_bits(bb));
        let mut env = FpEnv::default();

        assert!(agree64(a.add(b, &mut env), x + y), "{ab:#018x} + {bb:#018x}");
        assert!(agree64(a.sub(b, &mut env), x - y), "{ab:#018x} - {bb:#018x}");
        assert!(agree64(a.mul(b, &mut env), x * y), "{ab:#018x} * {bb:#018x}");
        assert!(agree64(a.div(b, &mut env), x / y), "{ab:#018x} / {bb:#018x}");
    }
}

#[test]
fn f64_sqrt_matches_host() {
    let mut rng = StdRng::seed_from_u64(0x5EED_0004);
    for _ in 0..ROUNDS {
        let ab = f64_bits(&mut rng);
        let mut env = FpEnv::default();
        let z = F64::from_bits(ab).sqrt(&mut env);
        assert!(agree64(z, f64::from_bits(ab).sqrt()), "sqrt {ab:#018x}");
    }
}

#[test]
fn comparisons_match_host() {
    let mut rng = StdRng::seed_from_u64(0x5EED_0005);
    for _ in 0..ROUNDS {
        let (ab, bb) = (f64_bits(&mut rng), f64_bits(&mut rng));
        let (x, y) = (f64::from_bits(ab), f64::from_bits(bb));
        let (a, b) = (F64::from_bits(ab), F64::from_bits(bb));
        let mut env = FpEnv::default();

        assert_eq!(a.eq(b, &mut env), x == y, "{ab:#018x} == {bb:#018x}");
        assert_eq!(a.lt(b, &mut env), x < y, "{ab:#018x} < {bb:#018x}");
        assert_eq!(a.le(b, &mut env), x <= y, "{ab:#018x} <= {bb:#018x}");
    }
}

#[test]
fn format_conversions_match_host() {
    let mut rng = StdRng::seed_from_u64(0x5EED_0006);
    for _ in 0..ROUNDS {
        let ab = f64_bits(&mut rng);
        let mut env = FpEnv::default();
        let narrowed = F64::from_bits(ab).to_f32(&mut env);
        assert!(agree32(narrowed, f64::from_bits(ab) as f32), "{ab:#018x}");

        let sb = f32_bits(&mut rng);
        let widened = F32::from_bits(sb).to_f64(&mut env);
        assert!(agree64(widened, f64::from(f32::from_bits(sb))), "{sb:#010x}");
    }
}

#[test]
fn int_conversions_match_host() {
    let mut rng = StdRng::seed_from_u64(0x5EED_0007);
    for _ in 0..ROUNDS {
        let i: i32 = rng.random();
        let mut env = FpEnv::default();
        assert_eq!(F32::from_i32(&mut env, i).to_bits(), (i as f32).to_bits());
        assert_eq!(F64::from_i32(&mut env, i).to_bits(), (f64::from(i)).to_bits());

        let u: u64 = rng.random();
        assert_eq!(F64::from_u64(&mut env, u).to_bits(), (u as f64).to_bits());

        // Truncating conversion, restricted to the host cast's exact range.
        let x = f64::from_bits(f64_bits(&mut rng));
        if x.is_finite() && x.abs() < 2e9 {
            let mut env = FpEnv::new(Rounding::MinMag);
            assert_eq!(
                F64::from_bits(x.to_bits()).to_i32(&mut env, true),
                x as i32,
                "{x}"
            );
        }
    }
}
