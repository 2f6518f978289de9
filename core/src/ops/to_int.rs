//! Conversions to 32- and 64-bit integers.
//!
//! NaN converts like a positive overflow: Invalid plus the positive
//! saturation value.

use crate::env::FpEnv;
use crate::prim::{shift_right_jam64, shift_right_jam64_extra};
use crate::repr::{FloatFormat, Fp};
use crate::round::{
    round_to_i32, round_to_i64, round_to_u32, round_to_u64, I32_NEG_OVERFLOW, I32_POS_OVERFLOW,
    I64_NEG_OVERFLOW, I64_POS_OVERFLOW, U32_NEG_OVERFLOW, U32_POS_OVERFLOW, U64_NEG_OVERFLOW,
    U64_POS_OVERFLOW,
};

impl<F: FloatFormat> Fp<F> {
    /// Significand as a 52.12 fixed-point magnitude, or None when the value
    /// is too large for that register (including NaN and infinity).
    fn fixed_12(self) -> Option<(bool, u64)> {
        let exp = self.raw_exp();
        let mut sig = self.frac();
        if exp == F::EXP_INF {
            return None;
        }
        if exp != 0 {
            sig |= F::IMPLICIT_BIT;
        }
        // Pre-shift to a uniform 52-bit significand position.
        let sig = sig << (52 - F::SIG_BITS);
        let shift_dist = 40 + F::BIAS - exp;
        if shift_dist <= 0 {
            return None;
        }
        Some((self.sign(), shift_right_jam64(sig, shift_dist as u32)))
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
        let mut sig = self.frac();
        if exp == F::EXP_INF {
            return None;
        }
        if exp != 0 {
            sig |= F::IMPLICIT_BIT;
        }
        let sig = sig << (63 - F::SIG_BITS);
        let shift_dist = 63 + F::BIAS - exp;
        // At distance zero the value sits exactly in [2^63, 2^64), which
        // still fits an unsigned result.
        if shift_dist < 0 {
            return None;
        }
        let (sig, extra) = shift_right_jam64_extra(sig, 0, shift_dist as u32);
        Some((self.sign(), sig, extra))
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
}
