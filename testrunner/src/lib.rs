//! Differential sweep harness for the soft-float core.
//!
//! Sweeps randomized operand patterns through the software arithmetic and
//! through the host FPU, which is trusted to be a correctly rounding
//! IEEE 754 machine in round-to-nearest-even, and records every bit-level
//! disagreement. The formats the host cannot compute natively (half,
//! extended, quadruple) are checked through exact round-trip identities
//! instead.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use firn_core::{ExtF80, FpEnv, Rounding, F16, F32, F64};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Sqrt,
    Compare,
    RoundToInt,
    ToInt,
    FromInt,
    Narrow,
    RoundTrip,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Format {
    F16,
    F32,
    F64,
    ExtF80,
    F128,
}

impl Op {
    /// Host-differential ops need a native reference implementation; the
    /// wide formats only support the identity sweeps.
    pub fn supports(self, format: Format) -> bool {
        match self {
            Self::RoundTrip => matches!(format, Format::F16 | Format::ExtF80 | Format::F128),
            Self::Narrow => format == Format::F64,
            _ => matches!(format, Format::F32 | Format::F64),
        }
    }
}

/// One recorded disagreement. Operands and results are raw encodings in hex.
#[derive(Debug, Serialize, Deserialize)]
pub struct Mismatch {
    pub a: String,
    pub b: String,
    pub ours: String,
    pub host: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub op: Op,
    pub format: Format,
    pub seed: u64,
    pub rounds: u64,
    pub failures: u64,
    /// First few mismatches, for reproduction; `failures` has the total.
    pub sample: Vec<Mismatch>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct TestReport {
    pub runs: Vec<RunSummary>,
}

impl RunSummary {
    pub fn passed(&self) -> bool {
        self.failures == 0
    }
}

/// Every valid (op, format) pair.
pub fn matrix() -> Vec<(Op, Format)> {
    let mut combos = vec![];
    for op in Op::iter() {
        for format in Format::iter() {
            if op.supports(format) {
                combos.push((op, format));
            }
        }
    }
    combos
}

const SAMPLE_LIMIT: usize = 20;

struct Recorder {
    failures: u64,
    sample: Vec<Mismatch>,
}

impl Recorder {
    fn record(&mut self, a: String, b: String, ours: String, host: String) {
        self.failures += 1;
        if self.sample.len() < SAMPLE_LIMIT {
            self.sample.push(Mismatch { a, b, ours, host });
        }
    }
}

/// Random f32 pattern biased toward subnormals, specials and the exponent
/// range where operand alignment is interesting.
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

/// Runs one sweep and summarizes it. Deterministic for a given seed.
pub fn run_sweep(op: Op, format: Format, seed: u64, rounds: u64) -> RunSummary {
    assert!(op.supports(format), "{op} not supported for {format}");
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rec = Recorder {
        failures: 0,
        sample: vec![],
    };

    for _ in 0..rounds {
        match format {
            Format::F32 => sweep_f32(op, &mut rng, &mut rec),
            Format::F64 => sweep_f64(op, &mut rng, &mut rec),
            Format::F16 => sweep_f16_identity(&mut rng, &mut rec),
            Format::ExtF80 => sweep_ext_identity(&mut rng, &mut rec),
            Format::F128 => sweep_quad_identity(&mut rng, &mut rec),
        }
    }

    RunSummary {
        op,
        format,
        seed,
        rounds,
        failures: rec.failures,
        sample: rec.sample,
    }
}

fn sweep_f32(op: Op, rng: &mut StdRng, rec: &mut Recorder) {
    let (ab, bb) = (f32_bits(rng), f32_bits(rng));
    let (x, y) = (f32::from_bits(ab), f32::from_bits(bb));
    let (a, b) = (F32::from_bits(ab), F32::from_bits(bb));
    let mut env = FpEnv::default();

    let binop = |ours: F32, host: f32, rec: &mut Recorder| {
        if !agree32(ours, host) {
            rec.record(
                format!("{ab:#010x}"),
                format!("{bb:#010x}"),
                format!("{:#010x}", ours.to_bits()),
                format!("{:#010x}", host.to_bits()),
            );
        }
    };

    match op {
        Op::Add => binop(a.add(b, &mut env), x + y, rec),
        Op::Sub => binop(a.sub(b, &mut env), x - y, rec),
        Op::Mul => binop(a.mul(b, &mut env), x * y, rec),
        Op::Div => binop(a.div(b, &mut env), x / y, rec),
        Op::Sqrt => binop(a.sqrt(&mut env), x.sqrt(), rec),
        Op::RoundToInt => binop(a.round_to_int(&mut env, true), x.round_ties_even(), rec),
        Op::Compare => {
            let ours = (a.eq(b, &mut env), a.lt(b, &mut env), a.le(b, &mut env));
            let host = (x == y, x < y, x <= y);
            if ours != host {
                rec.record(
                    format!("{ab:#010x}"),
                    format!("{bb:#010x}"),
                    format!("{ours:?}"),
                    format!("{host:?}"),
                );
            }
        }
        Op::ToInt => {
            // The host cast truncates and only matches the saturating
            // semantics inside the representable range.
            if x.is_finite() && x.abs() < 2e9 {
                let mut env = FpEnv::new(Rounding::MinMag);
                let ours = a.to_i32(&mut env, true);
                let host = x as i32;
                if ours != host {
                    rec.record(
                        format!("{ab:#010x}"),
                        String::new(),
                        format!("{ours}"),
                        format!("{host}"),
                    );
                }
            }
        }
        Op::FromInt => {
            let i: i32 = rng.random();
            let ours = F32::from_i32(&mut env, i);
            if ours.to_bits() != (i as f32).to_bits() {
                rec.record(
                    format!("{i}"),
                    String::new(),
                    format!("{:#010x}", ours.to_bits()),
                    format!("{:#010x}", (i as f32).to_bits()),
                );
            }
        }
        Op::Narrow | Op::RoundTrip => unreachable!(),
    }
}

fn sweep_f64(op: Op, rng: &mut StdRng, rec: &mut Recorder) {
    let (ab, bb) = (f64_bits(rng), f64_bits(rng));
    let (x, y) = (f64::from_bits(ab), f64::from_bits(bb));
    let (a, b) = (F64::from_bits(ab), F64::from_bits(bb));
    let mut env = FpEnv::default();

    let binop = |ours: F64, host: f64, rec: &mut Recorder| {
        if !agree64(ours, host) {
            rec.record(
                format!("{ab:#018x}"),
                format!("{bb:#018x}"),
                format!("{:#018x}", ours.to_bits()),
                format!("{:#018x}", host.to_bits()),
            );
        }
    };

    match op {
        Op::Add => binop(a.add(b, &mut env), x + y, rec),
        Op::Sub => binop(a.sub(b, &mut env), x - y, rec),
        Op::Mul => binop(a.mul(b, &mut env), x * y, rec),
        Op::Div => binop(a.div(b, &mut env), x / y, rec),
        Op::Sqrt => binop(a.sqrt(&mut env), x.sqrt(), rec),
        Op::RoundToInt => binop(a.round_to_int(&mut env, true), x.round_ties_even(), rec),
        Op::Compare => {
            let ours = (a.eq(b, &mut env), a.lt(b, &mut env), a.le(b, &mut env));
            let host = (x == y, x < y, x <= y);
            if ours != host {
                rec.record(
                    format!("{ab:#018x}"),
                    format!("{bb:#018x}"),
                    format!("{ours:?}"),
                    format!("{host:?}"),
                );
            }
        }
        Op::Narrow => {
            let ours = a.to_f32(&mut env);
            let host = x as f32;
            if !agree32(ours, host) {
                rec.record(
                    format!("{ab:#018x}"),
                    String::new(),
                    format!("{:#010x}", ours.to_bits()),
                    format!("{:#010x}", host.to_bits()),
                );
            }
        }
        Op::ToInt => {
            if x.is_finite() && x.abs() < 9.2e18 {
                let mut env = FpEnv::new(Rounding::MinMag);
                let ours = a.to_i64(&mut env, true);
                let host = x as i64;
                if ours != host {
                    rec.record(
                        format!("{ab:#018x}"),
                        String::new(),
                        format!("{ours}"),
                        format!("{host}"),
                    );
                }
            }
        }
        Op::FromInt => {
            let i: i64 = rng.random();
            let ours = F64::from_i64(&mut env, i);
            if ours.to_bits() != (i as f64).to_bits() {
                rec.record(
                    format!("{i}"),
                    String::new(),
                    format!("{:#018x}", ours.to_bits()),
                    format!("{:#018x}", (i as f64).to_bits()),
                );
            }
        }
        Op::RoundTrip => unreachable!(),
    }
}

/// Half round trips through every wider format.
fn sweep_f16_identity(rng: &mut StdRng, rec: &mut Recorder) {
    let hb: u16 = rng.random();
    let h = F16::from_bits(hb);
    if h.is_signaling_nan() {
        // Quieted on the way through by the NaN bridging rules.
        return;
    }
    let mut env = FpEnv::default();
    for back in [
        h.to_f32(&mut env).to_f16(&mut env),
        h.to_f64(&mut env).to_f16(&mut env),
        h.to_f128(&mut env).to_f16(&mut env),
    ] {
        if back.to_bits() != hb {
            rec.record(
                format!("{hb:#06x}"),
                String::new(),
                format!("{:#06x}", back.to_bits()),
                format!("{hb:#06x}"),
            );
        }
    }
}

/// Extended values survive the quadruple significand unchanged.
fn sweep_ext_identity(rng: &mut StdRng, rec: &mut Recorder) {
    let exp: u16 = match rng.random_range(0..6) {
        0 => 0,
        _ => rng.random_range(1..0x7FFF),
    };
    let sig = if exp != 0 {
        rng.random::<u64>() | (1 << 63)
    } else {
        rng.random::<u64>() >> 1
    };
    let e = ExtF80::from_parts((u16::from(rng.random::<bool>()) << 15) | exp, sig);
    let mut env = FpEnv::default();
    let back = e.to_f128(&mut env).to_extf80(&mut env);
    if back != e {
        rec.record(
            format!("{:#06x}:{:#018x}", e.se(), e.sig()),
            String::new(),
            format!("{:#06x}:{:#018x}", back.se(), back.sig()),
            format!("{:#06x}:{:#018x}", e.se(), e.sig()),
        );
    }
}

/// Doubles survive widening to quadruple and back.
fn sweep_quad_identity(rng: &mut StdRng, rec: &mut Recorder) {
    let ab = f64_bits(rng);
    let a = F64::from_bits(ab);
    if a.is_signaling_nan() {
        return;
    }
    let mut env = FpEnv::default();
    let back = a.to_f128(&mut env).to_f64(&mut env);
    if back.to_bits() != ab {
        rec.record(
            format!("{ab:#018x}"),
            String::new(),
            format!("{:#018x}", back.to_bits()),
            format!("{ab:#018x}"),
        );
    }
}
