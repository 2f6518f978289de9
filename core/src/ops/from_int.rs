//! Conversions from 32- and 64-bit integers.

use crate::env::FpEnv;
use crate::prim::shift_right_jam64;
use crate::repr::{FloatFormat, Fp};
use crate::round::{norm_round_pack, round_pack};

/// Shared magnitude path: the absolute value as a `u64`, plus the sign.
fn from_mag<F: FloatFormat>(env: &mut FpEnv, sign: bool, mag: u64) -> Fp<F> {
    if mag == 0 {
        return Fp::zero(sign);
    }
    let exp0 = F::BIAS + F::SIG_BITS as i32 + 6;
    let shift_dist = mag.leading_zeros() as i32 - (56 - F::SIG_BITS as i32);
    if shift_dist >= 0 {
        norm_round_pack(env, sign, exp0, mag)
    } else {
        // Wider than the rounding register: jam down first.
        round_pack(
            env,
            sign,
            exp0 - shift_dist,
            shift_right_jam64(mag, (-shift_dist) as u32),
        )
    }
}

impl<F: FloatFormat> Fp<F> {
    pub fn from_i32(env: &mut FpEnv, a: i32) -> Self {
        from_mag(env, a < 0, u64::from(a.unsigned_abs()))
    }

    pub fn from_u32(env: &mut FpEnv, a: u32) -> Self {
        from_mag(env, false, u64::from(a))
    }

    pub fn from_i64(env: &mut FpEnv, a: i64) -> Self {
        from_mag(env, a < 0, a.unsigned_abs())
    }

    pub fn from_u64(env: &mut FpEnv, a: u64) -> Self {
        from_mag(env, false, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::{F16, F32, F64};

    #[test]
    fn exact_small_integers() {
        let mut env = FpEnv::default();
        assert_eq!(F32::from_i32(&mut env, 3).to_bits(), 3.0f32.to_bits());
        assert_eq!(
            F32::from_i32(&mut env, -16777215).to_bits(),
            (-16777215.0f32).to_bits()
        );
        assert_eq!(F64::from_u32(&mut env, u32::MAX).to_bits(), 4294967295.0f64.to_bits());
        assert_eq!(F32::from_u32(&mut env, 0).to_bits(), 0);
        assert!(env.flags.is_empty());
    }

    #[test]
    fn rounding_wide_integers() {
        let mut env = FpEnv::default();
        // 2^24 + 1 does not fit f32; ties to even 2^24.
        let z = F32::from_i32(&mut env, 16777217);
        assert_eq!(z.to_bits(), 16777216.0f32.to_bits());
        assert!(env.flags.inexact());
    }

    #[test]
    fn i64_extremes() {
        let mut env = FpEnv::default();
        assert_eq!(
            F64::from_i64(&mut env, i64::MIN).to_bits(),
            (-9.223372036854776e18f64).to_bits()
        );
        assert!(env.flags.is_empty(), "-2^63 is exact");
        let mut env = FpEnv::default();
        let z = F64::from_u64(&mut env, u64::MAX);
        assert_eq!(z.to_bits(), (u64::MAX as f64).to_bits());
        assert!(env.flags.inexact());
    }

    #[test]
    fn narrow_formats_saturate_via_rounding() {
        let mut env = FpEnv::default();
        // 100000 overflows f16 to infinity.
        let z = F16::from_i32(&mut env, 100_000);
        assert!(z.is_inf());
        assert!(env.flags.overflow());
    }
}
