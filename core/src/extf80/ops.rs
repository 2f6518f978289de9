//! Arithmetic and comparison on the 80-bit extended format.
//!
//! The significand occupies a full 64-bit word, so sums, quotients and roots
//! are carried as (significand, extra) pairs and every inexact result goes
//! through the extended round-and-pack with its precision control.

use std::cmp::Ordering;

use crate::env::{Exceptions, FpEnv, Rounding};
use crate::extf80::{
    norm_round_pack, norm_subnormal, propagate, round_pack, ExtF80, EXT_BIAS, EXT_EXP_INF,
};
use crate::prim::{
    shift_right_jam64_extra, short_shift_right_jam64_extra, Sig128, Wide128,
};
use crate::recip::isqrt;

const INT_BIT: u64 = 1 << 63;

/// Unpacks the exponent and significand, normalizing subnormal-coded values.
/// Only meaningful for finite nonzero operands.
fn unpack_norm(a: ExtF80) -> (i32, u64) {
    if a.exp() == 0 {
        norm_subnormal(a.sig())
    } else {
        (a.exp() as i32, a.sig())
    }
}

impl ExtF80 {
    pub fn add(self, b: Self, env: &mut FpEnv) -> Self {
        if self.sign() == b.sign() {
            add_mags(env, self, b, self.sign())
        } else {
            sub_mags(env, self, b, self.sign())
        }
    }

    pub fn sub(self, b: Self, env: &mut FpEnv) -> Self {
        if self.sign() == b.sign() {
            sub_mags(env, self, b, self.sign())
        } else {
            add_mags(env, self, b, self.sign())
        }
    }

    pub fn mul(self, b: Self, env: &mut FpEnv) -> Self {
        let (a, sign) = (self, self.sign() != b.sign());
        let (exp_a, exp_b) = (a.exp() as i32, b.exp() as i32);

        if exp_a == EXT_EXP_INF || exp_b == EXT_EXP_INF {
            if a.is_nan() || b.is_nan() {
                return propagate(env, a, b);
            }
            if a.is_zero() || b.is_zero() {
                env.raise_invalid();
                return Self::default_nan();
            }
            return Self::infinity(sign);
        }
        if a.is_zero() || b.is_zero() {
            return Self::zero(sign);
        }

        let (exp_a, sig_a) = unpack_norm(a);
        let (exp_b, sig_b) = unpack_norm(b);
        let mut exp_z = exp_a + exp_b - (EXT_BIAS - 1);
        let p = Sig128::mul_64(sig_a, sig_b);
        let (mut hi, mut lo) = (p.hi(), p.lo());
        if hi & INT_BIT == 0 {
            exp_z -= 1;
            hi = (hi << 1) | (lo >> 63);
            lo <<= 1;
        }
        round_pack(env, sign, exp_z, hi, lo)
    }

    pub fn div(self, b: Self, env: &mut FpEnv) -> Self {
        let (a, sign) = (self, self.sign() != b.sign());
        let (exp_a, exp_b) = (a.exp() as i32, b.exp() as i32);

        if exp_a == EXT_EXP_INF || exp_b == EXT_EXP_INF {
            if a.is_nan() || b.is_nan() {
                return propagate(env, a, b);
            }
            if exp_a == EXT_EXP_INF {
                if exp_b == EXT_EXP_INF {
                    env.raise_invalid();
                    return Self::default_nan();
                }
                return Self::infinity(sign);
            }
            return Self::zero(sign);
        }
        if b.is_zero() {
            if a.is_zero() {
                env.raise_invalid();
                return Self::default_nan();
            }
            env.raise(Exceptions::INFINITE);
            return Self::infinity(sign);
        }
        if a.is_zero() {
            return Self::zero(sign);
        }

        let (exp_a, sig_a) = unpack_norm(a);
        let (exp_b, sig_b) = unpack_norm(b);
        let mut exp_z = exp_a - exp_b + EXT_BIAS;
        let num = if sig_a < sig_b {
            exp_z -= 1;
            u128::from(sig_a) << 64
        } else {
            u128::from(sig_a) << 63
        };
        let div = u128::from(sig_b);
        let q = (num / div) as u64;
        let r = num - u128::from(q) * div;
        // Second division digit supplies the full extra word; a leftover
        // remainder only matters as stickiness.
        let num2 = r << 64;
        let e = (num2 / div) as u64;
        let r2 = num2 - u128::from(e) * div;
        round_pack(env, sign, exp_z, q, e | u64::from(r2 != 0))
    }

    /// IEEE remainder: `self - n * b` with `n` the nearest integer quotient
    /// (even on ties). Always exact.
    pub fn rem(self, b: Self, env: &mut FpEnv) -> Self {
        let a = self;
        let sign_a = a.sign();
        let (exp_a, exp_b) = (a.exp() as i32, b.exp() as i32);

        if exp_a == EXT_EXP_INF || exp_b == EXT_EXP_INF {
            if a.is_nan() || b.is_nan() {
                return propagate(env, a, b);
            }
            if exp_a == EXT_EXP_INF {
                env.raise_invalid();
                return Self::default_nan();
            }
            return a;
        }
        if b.is_zero() {
            env.raise_invalid();
            return Self::default_nan();
        }
        if a.is_zero() {
            return a;
        }

        let (exp_a, sig_a) = unpack_norm(a);
        let (exp_b, sig_b) = unpack_norm(b);
        let exp_diff = exp_a - exp_b;
        if exp_diff < -1 {
            return a;
        }

        // Reduce sig_a * 2^(exp_diff+1) modulo 2*sig_b, keeping the parity
        // of the last quotient digit for the nearest-adjust below.
        let div = u128::from(sig_b) << 1;
        let mut rem = u128::from(sig_a);
        let mut q_parity = 0u64;
        let mut left = exp_diff + 1;
        while left > 0 {
            let c = left.min(62);
            rem <<= c;
            q_parity = (rem / div) as u64;
            rem %= div;
            left -= c;
        }

        let mut sign_z = sign_a;
        let mut mag = rem;
        if mag > u128::from(sig_b) || (mag == u128::from(sig_b) && q_parity & 1 == 1) {
            sign_z = !sign_z;
            mag = div - mag;
        }
        if mag == 0 {
            return Self::zero(sign_a);
        }
        norm_round_pack(env, sign_z, exp_b - 1, mag as u64, 0)
    }

    pub fn sqrt(self, env: &mut FpEnv) -> Self {
        let a = self;
        let sign = a.sign();

        if a.exp() as i32 == EXT_EXP_INF {
            if a.frac() != 0 {
                return propagate(env, a, a);
            }
            if !sign {
                return a;
            }
            env.raise_invalid();
            return Self::default_nan();
        }
        if a.is_zero() {
            return a;
        }
        if sign {
            env.raise_invalid();
            return Self::default_nan();
        }

        let (exp_a, sig_a) = unpack_norm(a);
        let exp_z = ((exp_a - EXT_BIAS) >> 1) + EXT_BIAS;
        let odd_exp = (exp_a - EXT_BIAS) & 1;

        // The root of sig * 2^(63+odd) carries exactly 64 bits; the next 64
        // bits come from the remainder by division, then snap to the exact
        // digit with a squared-candidate check.
        let radicand = u128::from(sig_a) << (63 + odd_exp);
        let q = isqrt(radicand);
        let rem = radicand - u128::from(q) * u128::from(q);
        let est = ((rem << 63) / u128::from(q)).min(u128::from(u64::MAX)) as u64;

        let n = Sig128::from_halves((radicand >> 64) as u64, radicand as u64);
        let mut extra = 0;
        let mut exact = false;
        for c in (est.saturating_sub(2)..=est).rev() {
            let root = Sig128::from_halves(q, c);
            let (p_hi, p_lo) = root.widening_mul(root);
            match p_hi.cmp_mag(n) {
                Ordering::Less => {
                    extra = c;
                    exact = false;
                    break;
                }
                Ordering::Equal if p_lo.is_zero() => {
                    extra = c;
                    exact = true;
                    break;
                }
                _ => {}
            }
        }
        round_pack(env, false, exp_z, q, extra | u64::from(!exact))
    }

    /// Rounds to an integral value in the same format. `exact` controls
    /// whether a discarded fraction raises the inexact flag.
    pub fn round_to_int(self, env: &mut FpEnv, exact: bool) -> Self {
        let exp = self.exp() as i32;
        let sign = self.sign();

        if exp >= EXT_BIAS + 63 {
            if exp == EXT_EXP_INF && self.frac() != 0 {
                return propagate(env, self, self);
            }
            return self;
        }
        if exp <= EXT_BIAS - 1 {
            if self.is_zero() {
                return self;
            }
            if exact {
                env.raise_inexact();
            }
            let one = Self::pack(sign, EXT_BIAS, INT_BIT);
            return match env.rounding {
                Rounding::NearEven => {
                    if exp == EXT_BIAS - 1 && self.frac() != 0 {
                        one
                    } else {
                        Self::zero(sign)
                    }
                }
                Rounding::NearMaxMag => {
                    if exp == EXT_BIAS - 1 {
                        one
                    } else {
                        Self::zero(sign)
                    }
                }
                Rounding::MinMag => Self::zero(sign),
                Rounding::Min => {
                    if sign {
                        one
                    } else {
                        Self::zero(sign)
                    }
                }
                Rounding::Max => {
                    if sign {
                        Self::zero(sign)
                    } else {
                        one
                    }
                }
                #[cfg(feature = "round-odd")]
                Rounding::Odd => one,
            };
        }

        let last_mask: u64 = 1 << (EXT_BIAS + 63 - exp);
        let round_bits_mask = last_mask - 1;
        let round_bits = self.sig() & round_bits_mask;
        if round_bits == 0 {
            return self;
        }
        if exact {
            env.raise_inexact();
        }
        let mut wide = u128::from(self.sig());
        match env.rounding {
            Rounding::NearEven | Rounding::NearMaxMag => {
                wide += u128::from(last_mask >> 1);
                if env.rounding == Rounding::NearEven && round_bits == last_mask >> 1 {
                    wide &= !u128::from(last_mask);
                }
            }
            Rounding::Min if sign => wide += u128::from(round_bits_mask),
            Rounding::Max if !sign => wide += u128::from(round_bits_mask),
            Rounding::MinMag | Rounding::Min | Rounding::Max => {}
            #[cfg(feature = "round-odd")]
            Rounding::Odd => wide |= u128::from(last_mask),
        }
        wide &= !u128::from(round_bits_mask);
        if wide >> 64 != 0 {
            return Self::pack(sign, exp + 1, INT_BIT);
        }
        Self::pack(sign, exp, wide as u64)
    }

    /// Quiet equality; signaling NaNs raise Invalid.
    pub fn eq(self, b: Self, env: &mut FpEnv) -> bool {
        if self.is_nan() || b.is_nan() {
            if self.is_signaling_nan() || b.is_signaling_nan() {
                env.raise_invalid();
            }
            return false;
        }
        ordered_eq(self, b)
    }

    /// Equality that raises Invalid on any NaN operand.
    pub fn eq_signaling(self, b: Self, env: &mut FpEnv) -> bool {
        if self.is_nan() || b.is_nan() {
            env.raise_invalid();
            return false;
        }
        ordered_eq(self, b)
    }

    /// Less-than; any NaN operand raises Invalid and compares unordered.
    pub fn lt(self, b: Self, env: &mut FpEnv) -> bool {
        if self.is_nan() || b.is_nan() {
            env.raise_invalid();
            return false;
        }
        ordered_lt(self, b)
    }

    /// Less-or-equal; any NaN operand raises Invalid and compares unordered.
    pub fn le(self, b: Self, env: &mut FpEnv) -> bool {
        if self.is_nan() || b.is_nan() {
            env.raise_invalid();
            return false;
        }
        ordered_lt(self, b) || ordered_eq(self, b)
    }

    /// Less-than that stays quiet on quiet NaNs.
    pub fn lt_quiet(self, b: Self, env: &mut FpEnv) -> bool {
        if self.is_nan() || b.is_nan() {
            if self.is_signaling_nan() || b.is_signaling_nan() {
                env.raise_invalid();
            }
            return false;
        }
        ordered_lt(self, b)
    }

    /// Less-or-equal that stays quiet on quiet NaNs.
    pub fn le_quiet(self, b: Self, env: &mut FpEnv) -> bool {
        if self.is_nan() || b.is_nan() {
            if self.is_signaling_nan() || b.is_signaling_nan() {
                env.raise_invalid();
            }
            return false;
        }
        ordered_lt(self, b) || ordered_eq(self, b)
    }
}

fn ordered_eq(a: ExtF80, b: ExtF80) -> bool {
    (a.is_zero() && b.is_zero()) || (a.se() == b.se() && a.sig() == b.sig())
}

/// Magnitude order of finite canonical values: exponent first, significand
/// second (the subnormal range sorts below every normal by construction).
fn lt_mag(a: ExtF80, b: ExtF80) -> bool {
    (a.exp(), a.sig()) < (b.exp(), b.sig())
}

fn ordered_lt(a: ExtF80, b: ExtF80) -> bool {
    if a.sign() != b.sign() {
        a.sign() && !(a.is_zero() && b.is_zero())
    } else if a.sign() {
        lt_mag(b, a)
    } else {
        lt_mag(a, b)
    }
}

fn add_mags(env: &mut FpEnv, a: ExtF80, b: ExtF80, sign: bool) -> ExtF80 {
    let (exp_a, sig_a) = (a.exp() as i32, a.sig());
    let (exp_b, sig_b) = (b.exp() as i32, b.sig());
    let exp_diff = exp_a - exp_b;

    if exp_diff == 0 {
        if exp_a == EXT_EXP_INF {
            if a.is_nan() || b.is_nan() {
                return propagate(env, a, b);
            }
            return a;
        }
        if exp_a == 0 {
            // Same subnormal scale: the sum is exact and may carry into the
            // integer bit, which is the smallest normal. Two pseudo-denormal
            // operands carry past the integer bit to weight two.
            let (sig_z, carry) = sig_a.overflowing_add(sig_b);
            if carry {
                return round_pack(env, sign, 2, INT_BIT | (sig_z >> 1), sig_z << 63);
            }
            return ExtF80::pack(sign, i32::from(sig_z & INT_BIT != 0), sig_z);
        }
        let sum = sig_a.wrapping_add(sig_b);
        // Both integer bits set, so the sum always carries one place.
        return round_pack(env, sign, exp_a + 1, INT_BIT | (sum >> 1), sum << 63);
    }

    let (exp_z, sig_big, sig_small, mut shift) = if exp_diff < 0 {
        if exp_b == EXT_EXP_INF {
            if b.is_nan() {
                return propagate(env, a, b);
            }
            return ExtF80::infinity(sign);
        }
        (exp_b, sig_b, sig_a, -exp_diff)
    } else {
        if exp_a == EXT_EXP_INF {
            if a.is_nan() {
                return propagate(env, a, b);
            }
            return a;
        }
        (exp_a, sig_a, sig_b, exp_diff)
    };
    // A subnormal-coded operand sits one exponent step closer than its field
    // says.
    if (if exp_diff < 0 { exp_a } else { exp_b }) == 0 {
        shift -= 1;
    }
    let (sig_small, extra) = shift_right_jam64_extra(sig_small, 0, shift as u32);

    let (sig_z, carry) = sig_big.overflowing_add(sig_small);
    if carry {
        let (s, x) = short_shift_right_jam64_extra(sig_z, extra, 1);
        return round_pack(env, sign, exp_z + 1, INT_BIT | s, x);
    }
    if sig_z & INT_BIT == 0 {
        return norm_round_pack(env, sign, exp_z, sig_z, extra);
    }
    round_pack(env, sign, exp_z, sig_z, extra)
}

fn sub_mags(env: &mut FpEnv, a: ExtF80, b: ExtF80, mut sign: bool) -> ExtF80 {
    let (exp_a, sig_a) = (a.exp() as i32, a.sig());
    let (exp_b, sig_b) = (b.exp() as i32, b.sig());
    let exp_diff = exp_a - exp_b;

    if exp_diff == 0 {
        if exp_a == EXT_EXP_INF {
            if a.is_nan() || b.is_nan() {
                return propagate(env, a, b);
            }
            env.raise_invalid();
            return ExtF80::default_nan();
        }
        // Same scale: the difference is exact.
        let diff = match sig_a.cmp(&sig_b) {
            Ordering::Greater => sig_a - sig_b,
            Ordering::Less => {
                sign = !sign;
                sig_b - sig_a
            }
            Ordering::Equal => {
                return ExtF80::zero(env.rounding == Rounding::Min);
            }
        };
        return norm_round_pack(env, sign, exp_a.max(1), diff, 0);
    }

    let (exp_z, sig_big, sig_small, mut shift) = if exp_diff < 0 {
        if exp_b == EXT_EXP_INF {
            if b.is_nan() {
                return propagate(env, a, b);
            }
            return ExtF80::infinity(!sign);
        }
        sign = !sign;
        (exp_b, sig_b, sig_a, -exp_diff)
    } else {
        if exp_a == EXT_EXP_INF {
            if a.is_nan() {
                return propagate(env, a, b);
            }
            return a;
        }
        (exp_a, sig_a, sig_b, exp_diff)
    };
    if (if exp_diff < 0 { exp_a } else { exp_b }) == 0 {
        shift -= 1;
    }
    let (sig_small, extra) = shift_right_jam64_extra(sig_small, 0, shift as u32);

    // 128-bit borrow subtract of the aligned pair.
    let extra_z = 0u64.wrapping_sub(extra);
    let sig_z = sig_big - sig_small - u64::from(extra != 0);
    norm_round_pack(env, sign, exp_z, sig_z, extra_z)
}
