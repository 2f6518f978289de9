//! Conversions between the quadruple format, the other formats, and
//! integers.
//!
//! Widening into the 113-bit significand is always exact, for the
//! interchange formats and for the 80-bit extended format alike. Narrowing
//! and the integer conversions round through the shared funnels.

use crate::env::FpEnv;
use crate::extf80::{self, ExtF80, EXT_BIAS, EXT_EXP_INF};
use crate::nan::CommonNan;
use crate::ops;
use crate::prim::{Sig128, Wide128};
use crate::repr::{Binary16, Binary32, Binary64, FloatFormat, Fp, F16, F32, F64};
use crate::round::{
    round_pack, round_to_i32, round_to_i64, round_to_u32, round_to_u64, I32_NEG_OVERFLOW,
    I32_POS_OVERFLOW, I64_NEG_OVERFLOW, I64_POS_OVERFLOW, U32_NEG_OVERFLOW, U32_POS_OVERFLOW,
    U64_NEG_OVERFLOW, U64_POS_OVERFLOW,
};

use super::{norm_subnormal, with_implicit, F128, QUAD_BIAS, QUAD_EXP_INF, QUAD_SIG_BITS};

fn to_quad<F: FloatFormat>(env: &mut FpEnv, a: Fp<F>) -> F128 {
    let sign = a.sign();
    if a.raw_exp() == F::EXP_INF {
        if a.frac() != 0 {
            return CommonNan::from_fp(env, a).to_quad();
        }
        return F128::infinity(sign);
    }
    if a.is_zero() {
        return F128::zero(sign);
    }
    let (exp, frac) = if a.raw_exp() == 0 {
        ops::norm_subnormal::<F>(a.frac())
    } else {
        (a.raw_exp(), a.frac())
    };
    let sig = Sig128::from_halves(0, frac | F::IMPLICIT_BIT).shl(QUAD_SIG_BITS - F::SIG_BITS);
    F128::pack(sign, exp - F::BIAS + QUAD_BIAS - 1, sig)
}

fn from_quad<F: FloatFormat>(env: &mut FpEnv, a: F128) -> Fp<F> {
    let sign = a.sign();
    if a.raw_exp() == QUAD_EXP_INF {
        if !a.frac().is_zero() {
            return CommonNan::from_quad(env, a).to_fp();
        }
        return Fp::infinity(sign);
    }
    if a.is_zero() {
        return Fp::zero(sign);
    }
    let (exp, frac) = if a.raw_exp() == 0 {
        norm_subnormal(a.frac())
    } else {
        (a.raw_exp(), a.frac())
    };
    // Drop onto the 7-extra-bit rounding register of the target format.
    let sig_reg = with_implicit(frac)
        .shr_jam(QUAD_SIG_BITS - 7 - F::SIG_BITS)
        .lo();
    round_pack(env, sign, exp - QUAD_BIAS + F::BIAS - 1, sig_reg)
}

impl F16 {
    pub fn to_f128(self, env: &mut FpEnv) -> F128 {
        to_quad::<Binary16>(env, self)
    }
}

impl F32 {
    pub fn to_f128(self, env: &mut FpEnv) -> F128 {
        to_quad::<Binary32>(env, self)
    }
}

impl F64 {
    pub fn to_f128(self, env: &mut FpEnv) -> F128 {
        to_quad::<Binary64>(env, self)
    }
}

impl ExtF80 {
    pub fn to_f128(self, env: &mut FpEnv) -> F128 {
        let sign = self.sign();
        if self.exp() as i32 == EXT_EXP_INF {
            if self.frac() != 0 {
                return CommonNan::from_ext(env, self).to_quad();
            }
            return F128::infinity(sign);
        }
        if self.sig() == 0 {
            return F128::zero(sign);
        }
        let (exp, sig) = if self.exp() == 0 {
            extf80::norm_subnormal(self.sig())
        } else {
            (self.exp() as i32, self.sig())
        };
        // Exact even when the result lands in the quadruple subnormal
        // range: the register carries at least 56 trailing zero bits.
        super::round_pack(
            env,
            sign,
            exp - EXT_BIAS + QUAD_BIAS - 1,
            Sig128::from_halves(0, sig).shl(56),
        )
    }
}

impl F128 {
    pub fn to_f16(self, env: &mut FpEnv) -> F16 {
        from_quad::<Binary16>(env, self)
    }

    pub fn to_f32(self, env: &mut FpEnv) -> F32 {
        from_quad::<Binary32>(env, self)
    }

    pub fn to_f64(self, env: &mut FpEnv) -> F64 {
        from_quad::<Binary64>(env, self)
    }

    pub fn to_extf80(self, env: &mut FpEnv) -> ExtF80 {
        let sign = self.sign();
        if self.raw_exp() == QUAD_EXP_INF {
            if !self.frac().is_zero() {
                return CommonNan::from_quad(env, self).to_ext();
            }
            return ExtF80::infinity(sign);
        }
        if self.is_zero() {
            return ExtF80::zero(sign);
        }
        let (exp, frac) = if self.raw_exp() == 0 {
            norm_subnormal(self.frac())
        } else {
            (self.raw_exp(), self.frac())
        };
        // The biases agree, so the exponent passes through; the low 49
        // significand bits become the extended format's rounding word.
        let sig = with_implicit(frac).shl(15);
        extf80::round_pack(env, sign, exp - QUAD_BIAS + EXT_BIAS, sig.hi(), sig.lo())
    }

    /// Significand as a 52.12 fixed-point magnitude, or None when the value
    /// is too large for that register (including NaN and infinity).
    fn fixed_12(self) -> Option<(bool, u64)> {
        let exp = self.raw_exp();
        if exp == QUAD_EXP_INF {
            return None;
        }
        let sig = if exp != 0 {
            with_implicit(self.frac())
        } else {
            self.frac()
        };
        let shift_dist = QUAD_BIAS + 100 - exp;
        if shift_dist < 49 {
            return None;
        }
        Some((self.sign(), sig.shr_jam(shift_dist as u32).lo()))
    }

    pub fn to_i32(self, env: &mut FpEnv, exact: bool) -> i32 {
        match self.fixed_12() {
            Some((sign, sig)) => round_to_i32(env, sign, sig, exact),
            None => {
                env.raise_invalid();
                if self.is_nan() || !self.sign() {
                    I32_POS_OVERFLOW
                } else {
                    I32_NEG_OVERFLOW
                }
            }
        }
    }

    pub fn to_u32(self, env: &mut FpEnv, exact: bool) -> u32 {
        match self.fixed_12() {
            Some((sign, sig)) => round_to_u32(env, sign, sig, exact),
            None => {
                env.raise_invalid();
                if self.is_nan() || !self.sign() {
                    U32_POS_OVERFLOW
                } else {
                    U32_NEG_OVERFLOW
                }
            }
        }
    }

    /// Significand as a 64-bit integer part plus 64 fraction bits.
    fn fixed_64_extra(self) -> Option<(bool, u64, u64)> {
        let exp = self.raw_exp();
        if exp == QUAD_EXP_INF {
            return None;
        }
        let sig = if exp != 0 {
            with_implicit(self.frac())
        } else {
            self.frac()
        };
        let dist = exp - (QUAD_BIAS + 48);
        if dist > 15 {
            return None;
        }
        let fixed = if dist >= 0 {
            sig.shl(dist as u32)
        } else {
            sig.shr_jam((-dist) as u32)
        };
        Some((self.sign(), fixed.hi(), fixed.lo()))
    }

    pub fn to_i64(self, env: &mut FpEnv, exact: bool) -> i64 {
        match self.fixed_64_extra() {
            Some((sign, sig, extra)) => round_to_i64(env, sign, sig, extra, exact),
            None => {
                env.raise_invalid();
                if self.is_nan() || !self.sign() {
                    I64_POS_OVERFLOW
                } else {
                    I64_NEG_OVERFLOW
                }
            }
        }
    }

    pub fn to_u64(self, env: &mut FpEnv, exact: bool) -> u64 {
        match self.fixed_64_extra() {
            Some((sign, sig, extra)) => round_to_u64(env, sign, sig, extra, exact),
            None => {
                env.raise_invalid();
                if self.is_nan() || !self.sign() {
                    U64_POS_OVERFLOW
                } else {
                    U64_NEG_OVERFLOW
                }
            }
        }
    }

    /// Every 64-bit integer is exactly representable, so the integer
    /// constructors never touch the environment.
    pub fn from_u64(v: u64) -> Self {
        from_mag(false, v)
    }

    pub fn from_i64(v: i64) -> Self {
        from_mag(v < 0, v.unsigned_abs())
    }

    pub fn from_u32(v: u32) -> Self {
        from_mag(false, u64::from(v))
    }

    pub fn from_i32(v: i32) -> Self {
        from_mag(v < 0, u64::from(v.unsigned_abs()))
    }
}

fn from_mag(sign: bool, mag: u64) -> F128 {
    if mag == 0 {
        return F128::zero(false);
    }
    let top = 63 - mag.leading_zeros() as i32;
    F128::pack(
        sign,
        QUAD_BIAS - 1 + top,
        Sig128::from_halves(0, mag).shl((QUAD_SIG_BITS as i32 - top) as u32),
    )
}

#[cfg(test)]
#[cfg(not(feature = "legacy-snan"))]
mod tests {
    use super::*;
    use crate::env::Rounding;

    fn f64b(v: f64) -> F64 {
        F64::from_bits(v.to_bits())
    }

    #[test]
    fn widening_is_exact() {
        let mut env = FpEnv::default();
        for x in [1.0f64, -2.5, 0.1, 1.0e-300, 6.25e17, f64::MIN_POSITIVE / 1024.0] {
            let q = f64b(x).to_f128(&mut env);
            assert_eq!(q.to_f64(&mut env).to_bits(), x.to_bits(), "{x}");
        }
        assert!(env.flags.is_empty());

        let q = F32::from_bits(1.5f32.to_bits()).to_f128(&mut env);
        assert_eq!((q.exp(), q.frac_hi()), (0x3FFF, 1 << 47));

        let h = F16::from_bits(0x3C00).to_f128(&mut env);
        assert_eq!((h.exp(), h.frac()), (0x3FFF, Sig128::ZERO));
        assert!(env.flags.is_empty());
    }

    #[test]
    fn narrowing_rounds() {
        // 1 + 2^-40 fits f64 but not f32.
        let mut env = FpEnv::default();
        let q = F128::from_bits((0x3FFF_u128 << 112) | (1 << 72));
        assert_eq!(
            q.to_f64(&mut env).to_bits(),
            (1.0f64 + 2.0f64.powi(-40)).to_bits()
        );
        assert!(env.flags.is_empty());
        assert_eq!(q.to_f32(&mut env).to_bits(), 1.0f32.to_bits());
        assert!(env.flags.inexact());
    }

    #[test]
    fn narrowing_overflows_and_underflows() {
        let mut env = FpEnv::default();
        let huge = F128::from_bits(0x43FF << 112);
        assert!(huge.to_f64(&mut env).is_inf());
        assert!(env.flags.overflow());

        // An exact f64 subnormal stays flag-free.
        let mut env = FpEnv::default();
        let tiny = F128::from_bits((1_u128 << 127) | ((0x3FFF - 1050) as u128) << 112);
        let z = tiny.to_f64(&mut env);
        assert!(z.is_subnormal() && z.sign());
        assert!(env.flags.is_empty());

        let mut env = FpEnv::default();
        let z = F128::from_bits(((0x3FFF - 2000) as u128) << 112).to_f64(&mut env);
        assert!(z.is_zero());
        assert!(env.flags.underflow() && env.flags.inexact());
    }

    #[test]
    fn extended_round_trips_exactly() {
        let mut env = FpEnv::default();
        for sig in [1_u64 << 63, u64::MAX, 0xC90F_DAA2_2168_C235] {
            let e = ExtF80::pack(false, EXT_BIAS + 7, sig);
            let back = e.to_f128(&mut env).to_extf80(&mut env);
            assert_eq!(back, e, "{sig:#x}");
        }
        // The smallest extended subnormal maps to a quadruple subnormal and
        // back without loss.
        let sub = ExtF80::from_parts(0, 1);
        let q = sub.to_f128(&mut env);
        assert!(q.is_subnormal());
        assert_eq!(q.to_extf80(&mut env), sub);
        assert!(env.flags.is_empty());
    }

    #[test]
    fn quad_to_extended_rounds() {
        // 1 + 2^-80 has no 64-bit significand encoding.
        let mut env = FpEnv::default();
        let q = F128::from_bits((0x3FFF_u128 << 112) | (1 << 32));
        let e = q.to_extf80(&mut env);
        assert_eq!((e.exp() as i32, e.sig()), (EXT_BIAS, 1 << 63));
        assert!(env.flags.inexact());
    }

    #[test]
    fn nan_crossing_keeps_payload() {
        let mut env = FpEnv::default();
        let nan = f64b(f64::from_bits(0x7FF8_1234_5678_9ABC));
        let q = nan.to_f128(&mut env);
        assert!(q.is_nan() && !q.is_signaling_nan());
        assert_eq!(q.to_f64(&mut env).to_bits(), 0x7FF8_1234_5678_9ABC);
        assert_eq!(q.to_extf80(&mut env).to_f64(&mut env).to_bits(), 0x7FF8_1234_5678_9ABC);
        assert!(env.flags.is_empty());

        let snan = F32::from_bits(0x7F80_0001);
        let q = snan.to_f128(&mut env);
        assert!(env.flags.invalid());
        assert!(q.is_nan() && !q.is_signaling_nan());
    }

    #[test]
    fn to_int_rounds_and_saturates() {
        let mut env = FpEnv::default();
        let f = |v: f64| {
            let mut e = FpEnv::default();
            f64b(v).to_f128(&mut e)
        };
        assert_eq!(f(2.5).to_i32(&mut env, true), 2);
        assert_eq!(f(3.5).to_i32(&mut env, true), 4);
        assert_eq!(f(-2.5).to_i32(&mut env, true), -2);
        assert!(env.flags.inexact());

        let mut env = FpEnv::default();
        assert_eq!(f(2147483647.0).to_i32(&mut env, true), i32::MAX);
        assert!(env.flags.is_empty());
        assert_eq!(f(2147483648.0).to_i32(&mut env, true), i32::MAX);
        assert!(env.flags.invalid());

        let mut env = FpEnv::default();
        assert_eq!(f(-1.0).to_u32(&mut env, true), 0);
        assert!(env.flags.invalid());

        let mut env = FpEnv::default();
        assert_eq!(F128::from_u64(u64::MAX).to_u64(&mut env, true), u64::MAX);
        assert_eq!(F128::from_i64(i64::MIN).to_i64(&mut env, true), i64::MIN);
        assert!(env.flags.is_empty());
        assert_eq!(f(9.3e18).to_i64(&mut env, true), i64::MAX);
        assert!(env.flags.invalid());

        let mut env = FpEnv::default();
        assert_eq!(F128::default_nan().to_i32(&mut env, true), i32::MAX);
        assert!(env.flags.invalid());
        let mut env = FpEnv::default();
        assert_eq!(F128::infinity(true).to_i64(&mut env, true), i64::MIN);
        assert!(env.flags.invalid());
    }

    #[test]
    fn to_int_directed_modes() {
        let f = |v: f64| {
            let mut e = FpEnv::default();
            f64b(v).to_f128(&mut e)
        };
        let mut env = FpEnv::new(Rounding::Min);
        assert_eq!(f(2.9).to_i32(&mut env, true), 2);
        assert_eq!(f(-2.1).to_i32(&mut env, true), -3);
        let mut env = FpEnv::new(Rounding::Max);
        assert_eq!(f(2.1).to_i64(&mut env, true), 3);
        assert_eq!(f(-2.9).to_i64(&mut env, true), -2);
    }

    #[test]
    fn from_int_is_exact() {
        let mut env = FpEnv::default();
        assert_eq!(F128::from_i32(-7).to_i32(&mut env, true), -7);
        assert_eq!(F128::from_u32(u32::MAX).to_u32(&mut env, true), u32::MAX);
        // 2^64 - 1 needs all 64 bits, well within the 113-bit significand.
        let z = F128::from_u64(u64::MAX);
        assert_eq!(z.exp(), 0x3FFF + 63);
        assert!(F128::from_u64(0).is_zero());
        assert!(env.flags.is_empty());
    }
}
