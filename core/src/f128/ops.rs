//! Quadruple-precision arithmetic.
//!
//! The structure mirrors the narrow formats, with the `u64` significand
//! register replaced by [`Sig128`]. Division and remainder cannot lean on a
//! native double-word divide at this width, so both produce 30-bit quotient
//! digits from a fixed-point reciprocal estimate and correct each digit
//! exactly against the remainder.

use std::cmp::Ordering;

use crate::env::{Exceptions, FpEnv, Rounding};
use crate::f128::{
    norm_round_pack, norm_subnormal, propagate, round_pack, with_implicit, F128, QUAD_BIAS,
    QUAD_EXP_INF, QUAD_SIG_BITS, SIGN_MASK,
};
use crate::prim::{Sig128, Wide128};
use crate::recip::{approx_recip_32_1, isqrt};

/// `a * b` modulo 2^128 for a small multiplier
fn mul_by_u32(a: Sig128, b: u32) -> Sig128 {
    let lo = Sig128::mul_64(a.lo(), u64::from(b));
    Sig128::from_halves(
        a.hi().wrapping_mul(u64::from(b)).wrapping_add(lo.hi()),
        lo.lo(),
    )
}

/// Sign of a wrapped difference whose true magnitude stays far below 2^127
fn is_negative(v: Sig128) -> bool {
    v.hi() >> 63 != 0
}

impl F128 {
    pub fn add(self, rhs: Self, env: &mut FpEnv) -> Self {
        if self.sign() == rhs.sign() {
            add_mags(env, self, rhs)
        } else {
            sub_mags(env, self, rhs)
        }
    }

    pub fn sub(self, rhs: Self, env: &mut FpEnv) -> Self {
        if self.sign() == rhs.sign() {
            sub_mags(env, self, rhs)
        } else {
            add_mags(env, self, rhs)
        }
    }

    pub fn mul(self, rhs: Self, env: &mut FpEnv) -> Self {
        let (a, b) = (self, rhs);
        let (mut exp_a, mut frac_a) = (a.raw_exp(), a.frac());
        let (mut exp_b, mut frac_b) = (b.raw_exp(), b.frac());
        let sign_z = a.sign() ^ b.sign();

        if exp_a == QUAD_EXP_INF || exp_b == QUAD_EXP_INF {
            if a.is_nan() || b.is_nan() {
                return propagate(env, a, b);
            }
            if (exp_a == QUAD_EXP_INF && b.is_zero()) || (exp_b == QUAD_EXP_INF && a.is_zero()) {
                env.raise_invalid();
                return Self::default_nan();
            }
            return Self::infinity(sign_z);
        }
        if exp_a == 0 {
            if frac_a.is_zero() {
                return Self::zero(sign_z);
            }
            (exp_a, frac_a) = norm_subnormal(frac_a);
        }
        if exp_b == 0 {
            if frac_b.is_zero() {
                return Self::zero(sign_z);
            }
            (exp_b, frac_b) = norm_subnormal(frac_b);
        }

        let mut exp_z = exp_a + exp_b - QUAD_BIAS;
        let sig_a = with_implicit(frac_a).shl(7);
        let sig_b = with_implicit(frac_b).shl(8);
        let (hi, lo) = sig_a.widening_mul(sig_b);
        // Jam the 241-bit product down to the rounding register width.
        let dist = QUAD_SIG_BITS + 9;
        let mut sig_z = hi
            .shl(128 - dist)
            .add(lo.shr(dist))
            .jam_bit(!lo.shl(128 - dist).is_zero());
        if sig_z.cmp_mag(Sig128::from_halves(1 << 55, 0)) == Ordering::Less {
            exp_z -= 1;
            sig_z = sig_z.shl(1);
        }
        round_pack(env, sign_z, exp_z, sig_z)
    }

    pub fn div(self, rhs: Self, env: &mut FpEnv) -> Self {
        let (a, b) = (self, rhs);
        let (mut exp_a, mut frac_a) = (a.raw_exp(), a.frac());
        let (mut exp_b, mut frac_b) = (b.raw_exp(), b.frac());
        let sign_z = a.sign() ^ b.sign();

        if exp_a == QUAD_EXP_INF {
            if a.is_nan() {
                return propagate(env, a, b);
            }
            if exp_b == QUAD_EXP_INF {
                if b.is_nan() {
                    return propagate(env, a, b);
                }
                env.raise_invalid();
                return Self::default_nan();
            }
            return Self::infinity(sign_z);
        }
        if exp_b == QUAD_EXP_INF {
            if b.is_nan() {
                return propagate(env, a, b);
            }
            return Self::zero(sign_z);
        }
        if exp_b == 0 {
            if frac_b.is_zero() {
                if exp_a == 0 && frac_a.is_zero() {
                    env.raise_invalid();
                    return Self::default_nan();
                }
                env.raise(Exceptions::INFINITE);
                return Self::infinity(sign_z);
            }
            (exp_b, frac_b) = norm_subnormal(frac_b);
        }
        if exp_a == 0 {
            if frac_a.is_zero() {
                return Self::zero(sign_z);
            }
            (exp_a, frac_a) = norm_subnormal(frac_a);
        }

        let mut exp_z = exp_a - exp_b + QUAD_BIAS - 1;
        let sig_a = with_implicit(frac_a);
        let sig_b = with_implicit(frac_b);
        // The quotient register is sig_a * 2^120 over the divisor; doubling
        // the divisor when sig_a >= sig_b keeps it in [2^119, 2^120).
        let (divisor, top_shift) = if sig_a.cmp_mag(sig_b) == Ordering::Less {
            exp_z -= 1;
            (sig_b, 49)
        } else {
            (sig_b.shl(1), 50)
        };
        let recip = approx_recip_32_1(sig_b.shr(81).lo() as u32);

        // Four 30-bit digits, each estimated from the remainder's top word
        // and corrected exactly. The remainder stays in [0, divisor).
        let mut q = Sig128::ZERO;
        let mut rem = sig_a;
        for _ in 0..4 {
            let top = rem.shr(top_shift).lo();
            let mut digit = ((u128::from(top) * u128::from(recip)) >> 65) as u32;
            rem = rem.shl(30).sub(mul_by_u32(divisor, digit));
            while is_negative(rem) {
                digit = digit.wrapping_sub(1);
                rem = rem.add(divisor);
            }
            while rem.cmp_mag(divisor) != Ordering::Less {
                digit += 1;
                rem = rem.sub(divisor);
            }
            q = q.shl(30).add(Sig128::from_halves(0, u64::from(digit)));
        }

        round_pack(env, sign_z, exp_z, q.jam_bit(!rem.is_zero()))
    }

    pub fn rem(self, rhs: Self, env: &mut FpEnv) -> Self {
        let (a, b) = (self, rhs);
        let (mut exp_a, mut frac_a) = (a.raw_exp(), a.frac());
        let (mut exp_b, mut frac_b) = (b.raw_exp(), b.frac());
        let sign_a = a.sign();

        if exp_a == QUAD_EXP_INF {
            if a.is_nan() || b.is_nan() {
                return propagate(env, a, b);
            }
            env.raise_invalid();
            return Self::default_nan();
        }
        if exp_b == QUAD_EXP_INF {
            if b.is_nan() {
                return propagate(env, a, b);
            }
            // Finite rem infinity is the dividend, exactly.
            return a;
        }
        if exp_b == 0 {
            if frac_b.is_zero() {
                env.raise_invalid();
                return Self::default_nan();
            }
            (exp_b, frac_b) = norm_subnormal(frac_b);
        }
        if exp_a == 0 {
            if frac_a.is_zero() {
                return a;
            }
            (exp_a, frac_a) = norm_subnormal(frac_a);
        }

        let sig_a = with_implicit(frac_a);
        let sig_b = with_implicit(frac_b);
        let exp_diff = exp_a - exp_b;
        if exp_diff < -1 {
            // |a| < |b| / 2: the quotient rounds to zero.
            return a;
        }

        // Reduce sig_a * 2^(exp_diff + 1) modulo 2 * sig_b in 30-bit digit
        // steps, keeping the parity of the truncated quotient. Only the last
        // digit can affect the parity.
        let divisor = sig_b.shl(1);
        let recip = approx_recip_32_1(sig_b.shr(81).lo() as u32);
        let mut rem = sig_a;
        let mut shift_left = exp_diff + 1;
        let mut q_parity = 0_u64;
        while shift_left > 0 {
            let c = (shift_left as u32).min(30);
            let top = rem.shr(50).lo();
            let mut digit = ((u128::from(top) * u128::from(recip)) >> (95 - c)) as u32;
            rem = rem.shl(c).sub(mul_by_u32(divisor, digit));
            while is_negative(rem) {
                digit = digit.wrapping_sub(1);
                rem = rem.add(divisor);
            }
            while rem.cmp_mag(divisor) != Ordering::Less {
                digit += 1;
                rem = rem.sub(divisor);
            }
            q_parity = u64::from(digit & 1);
            shift_left -= c as i32;
        }

        // Nearest adjustment: rem is in [0, 2*sig_b) at scale exp_b - 1.
        let tie = rem == sig_b && q_parity == 1;
        let (sign_z, mag) = if rem.cmp_mag(sig_b) == Ordering::Greater || tie {
            (!sign_a, divisor.sub(rem))
        } else {
            (sign_a, rem)
        };
        if mag.is_zero() {
            // A zero remainder keeps the dividend's sign.
            return Self::zero(sign_a);
        }
        norm_round_pack(env, sign_z, exp_b + 5, mag)
    }

    pub fn sqrt(self, env: &mut FpEnv) -> Self {
        let a = self;
        let (mut exp_a, mut frac_a) = (a.raw_exp(), a.frac());
        let sign = a.sign();

        if exp_a == QUAD_EXP_INF {
            if a.is_nan() {
                return propagate(env, a, a);
            }
            if !sign {
                return a;
            }
            env.raise_invalid();
            return Self::default_nan();
        }
        if sign {
            if a.is_zero() {
                return a;
            }
            env.raise_invalid();
            return Self::default_nan();
        }
        if exp_a == 0 {
            if frac_a.is_zero() {
                return a;
            }
            (exp_a, frac_a) = norm_subnormal(frac_a);
        }

        let exp_z = ((exp_a - QUAD_BIAS) >> 1) + QUAD_BIAS - 1;
        let odd = ((exp_a - QUAD_BIAS) & 1) as u32;
        let sig = with_implicit(frac_a);

        // Radicand sig * 2^(126 + odd) as a 256-bit value; its root is the
        // 120-bit rounding register directly.
        let n_hi = sig.shr(2 - odd);
        let n_lo = sig.shl(126 + odd);

        // Root of the top 128 bits gives the high 64 root bits exactly; the
        // remainder then prices the low 56 bits as a division, with a short
        // exact search absorbing the estimate error.
        let n_top = n_hi.shl(16).add(n_lo.shr(112));
        let q0 = isqrt((u128::from(n_top.hi()) << 64) | u128::from(n_top.lo()));
        let q0_sq = Sig128::mul_64(q0, q0);
        let (rem_hi, rem_lo) = wide_sub(n_hi, n_lo, q0_sq.shr(16), q0_sq.shl(112));

        let shifted = rem_hi.shl(71).add(rem_lo.shr(57));
        let est_num = (u128::from(shifted.hi()) << 64) | u128::from(shifted.lo());
        let est = (est_num / u128::from(q0)) as u64;

        let base = Sig128::from_halves(q0 >> 8, q0 << 56);
        let mut root = Sig128::ZERO;
        let mut exact = false;
        for c in (est.saturating_sub(3)..=est + 3).rev() {
            let cand = base.add(Sig128::from_halves(0, c));
            let (sq_hi, sq_lo) = cand.widening_mul(cand);
            match (sq_hi.cmp_mag(n_hi), sq_lo.cmp_mag(n_lo)) {
                (Ordering::Greater, _) | (Ordering::Equal, Ordering::Greater) => continue,
                (hi, lo) => {
                    root = cand;
                    exact = hi == Ordering::Equal && lo == Ordering::Equal;
                    break;
                }
            }
        }
        debug_assert!(!root.is_zero());

        round_pack(env, false, exp_z, root.jam_bit(!exact))
    }

    /// Rounds to a nearby integer, staying in the format. `exact` controls
    /// whether a changed value raises Inexact.
    pub fn round_to_int(self, env: &mut FpEnv, exact: bool) -> Self {
        let exp = self.raw_exp();
        let rounding = env.rounding;

        // |a| < 1: the result is 0 or +-1, decided directly.
        if exp <= QUAD_BIAS - 1 {
            if self.is_zero() {
                return self;
            }
            if exact {
                env.raise_inexact();
            }
            let sign = self.sign();
            let one = Self(
                (u128::from(sign) << 127) | ((QUAD_BIAS as u128) << QUAD_SIG_BITS),
            );
            let rounds_to_one = match rounding {
                Rounding::NearEven => exp == QUAD_BIAS - 1 && !self.frac().is_zero(),
                Rounding::NearMaxMag => exp == QUAD_BIAS - 1,
                Rounding::MinMag => false,
                Rounding::Min => sign,
                Rounding::Max => !sign,
                #[cfg(feature = "round-odd")]
                Rounding::Odd => true,
            };
            return if rounds_to_one { one } else { Self::zero(sign) };
        }

        // Already integral (or infinity); NaNs still get quieted.
        if exp >= QUAD_BIAS + QUAD_SIG_BITS as i32 {
            if exp == QUAD_EXP_INF && !self.frac().is_zero() {
                return propagate(env, self, self);
            }
            return self;
        }

        let last_bit_mask = 1_u128 << (QUAD_BIAS + QUAD_SIG_BITS as i32 - exp);
        let round_bits_mask = last_bit_mask - 1;
        let ui_a = self.0;
        let mut ui_z = ui_a;
        match rounding {
            Rounding::NearMaxMag => ui_z += last_bit_mask >> 1,
            Rounding::NearEven => {
                ui_z += last_bit_mask >> 1;
                if ui_z & round_bits_mask == 0 {
                    ui_z &= !last_bit_mask;
                }
            }
            Rounding::Min if self.sign() => ui_z += round_bits_mask,
            Rounding::Max if !self.sign() => ui_z += round_bits_mask,
            _ => {}
        }
        ui_z &= !round_bits_mask;
        if ui_z != ui_a {
            #[cfg(feature = "round-odd")]
            if rounding == Rounding::Odd {
                ui_z |= last_bit_mask;
            }
            if exact {
                env.raise_inexact();
            }
        }
        Self(ui_z)
    }

    fn cmp_nan(self, rhs: Self, env: &mut FpEnv, signal_quiet: bool) {
        if signal_quiet || self.is_signaling_nan() || rhs.is_signaling_nan() {
            env.raise_invalid();
        }
    }

    /// Both operands are zero, possibly of different sign.
    fn both_zero(self, rhs: Self) -> bool {
        (self.0 | rhs.0) & !SIGN_MASK == 0
    }

    pub fn eq(self, rhs: Self, env: &mut FpEnv) -> bool {
        if self.is_nan() || rhs.is_nan() {
            self.cmp_nan(rhs, env, false);
            return false;
        }
        self.0 == rhs.0 || self.both_zero(rhs)
    }

    pub fn eq_signaling(self, rhs: Self, env: &mut FpEnv) -> bool {
        if self.is_nan() || rhs.is_nan() {
            self.cmp_nan(rhs, env, true);
            return false;
        }
        self.0 == rhs.0 || self.both_zero(rhs)
    }

    pub fn lt(self, rhs: Self, env: &mut FpEnv) -> bool {
        if self.is_nan() || rhs.is_nan() {
            self.cmp_nan(rhs, env, true);
            return false;
        }
        self.lt_mag(rhs)
    }

    pub fn le(self, rhs: Self, env: &mut FpEnv) -> bool {
        if self.is_nan() || rhs.is_nan() {
            self.cmp_nan(rhs, env, true);
            return false;
        }
        !rhs.lt_mag(self)
    }

    pub fn lt_quiet(self, rhs: Self, env: &mut FpEnv) -> bool {
        if self.is_nan() || rhs.is_nan() {
            self.cmp_nan(rhs, env, false);
            return false;
        }
        self.lt_mag(rhs)
    }

    pub fn le_quiet(self, rhs: Self, env: &mut FpEnv) -> bool {
        if self.is_nan() || rhs.is_nan() {
            self.cmp_nan(rhs, env, false);
            return false;
        }
        !rhs.lt_mag(self)
    }

    /// Numeric `<` on non-NaN encodings.
    fn lt_mag(self, rhs: Self) -> bool {
        if self.sign() != rhs.sign() {
            self.sign() && !self.both_zero(rhs)
        } else {
            self.0 != rhs.0 && (self.sign() ^ (self.0 < rhs.0))
        }
    }
}

/// 256-bit subtraction as (hi, lo) kernel pairs
fn wide_sub(a_hi: Sig128, a_lo: Sig128, b_hi: Sig128, b_lo: Sig128) -> (Sig128, Sig128) {
    let borrow = a_lo.cmp_mag(b_lo) == Ordering::Less;
    let hi = if borrow {
        a_hi.sub(b_hi).sub(Sig128::ONE)
    } else {
        a_hi.sub(b_hi)
    };
    (hi, a_lo.sub(b_lo))
}

/// `|a| + |b|` with the sign of `a`.
fn add_mags(env: &mut FpEnv, a: F128, b: F128) -> F128 {
    let (exp_a, frac_a) = (a.raw_exp(), a.frac());
    let (exp_b, frac_b) = (b.raw_exp(), b.frac());
    let sign_z = a.sign();
    let exp_diff = exp_a - exp_b;

    if exp_diff == 0 {
        if exp_a == 0 {
            // Both subnormal or zero: the field-wise sum is exact, and a
            // carry into the exponent field is exactly the normalization.
            return F128(a.0 + ((u128::from(frac_b.hi()) << 64) | u128::from(frac_b.lo())));
        }
        if exp_a == QUAD_EXP_INF {
            if !frac_a.is_zero() || !frac_b.is_zero() {
                return propagate(env, a, b);
            }
            return a;
        }
        let sig_z = Sig128::from_halves(1 << 49, 0).add(frac_a).add(frac_b);
        if !sig_z.bit(0) && exp_a < QUAD_EXP_INF - 1 {
            return F128::pack(sign_z, exp_a, sig_z.shr(1));
        }
        round_pack(env, sign_z, exp_a, sig_z.shl(6))
    } else {
        let mut sig_a = frac_a.shl(6);
        let mut sig_b = frac_b.shl(6);
        let int_bit = Sig128::from_halves(1 << 54, 0);
        let exp_z;
        if exp_diff < 0 {
            if exp_b == QUAD_EXP_INF {
                if !frac_b.is_zero() {
                    return propagate(env, a, b);
                }
                return F128::infinity(sign_z);
            }
            exp_z = exp_b;
            sig_a = if exp_a != 0 {
                sig_a.add(int_bit)
            } else {
                sig_a.add(sig_a)
            };
            sig_a = sig_a.shr_jam((-exp_diff) as u32);
        } else {
            if exp_a == QUAD_EXP_INF {
                if !frac_a.is_zero() {
                    return propagate(env, a, b);
                }
                return a;
            }
            exp_z = exp_a;
            sig_b = if exp_b != 0 {
                sig_b.add(int_bit)
            } else {
                sig_b.add(sig_b)
            };
            sig_b = sig_b.shr_jam(exp_diff as u32);
        }
        let mut exp_z = exp_z;
        let mut sig_z = int_bit.add(sig_a).add(sig_b);
        if sig_z.cmp_mag(Sig128::from_halves(1 << 55, 0)) == Ordering::Less {
            exp_z -= 1;
            sig_z = sig_z.shl(1);
        }
        round_pack(env, sign_z, exp_z, sig_z)
    }
}

/// `|a| - |b|` with the sign of `a`, flipped if `|b|` is larger.
fn sub_mags(env: &mut FpEnv, a: F128, b: F128) -> F128 {
    let (exp_a, frac_a) = (a.raw_exp(), a.frac());
    let (exp_b, frac_b) = (b.raw_exp(), b.frac());
    let exp_diff = exp_a - exp_b;

    if exp_diff == 0 {
        if exp_a == QUAD_EXP_INF {
            if !frac_a.is_zero() || !frac_b.is_zero() {
                return propagate(env, a, b);
            }
            // Magnitude subtraction of infinities.
            env.raise_invalid();
            return F128::default_nan();
        }
        let (sign_z, sig) = match frac_a.cmp_mag(frac_b) {
            Ordering::Equal => {
                // Exact cancellation: zero whose sign depends on the
                // rounding direction.
                return F128::zero(env.rounding == Rounding::Min);
            }
            Ordering::Greater => (a.sign(), frac_a.sub(frac_b)),
            Ordering::Less => (!a.sign(), frac_b.sub(frac_a)),
        };
        let exp = if exp_a != 0 { exp_a - 1 } else { 0 };
        let mut shift_dist = sig.leading_zeros() as i32 - 15;
        let mut exp_z = exp - shift_dist;
        if exp_z < 0 {
            shift_dist = exp;
            exp_z = 0;
        }
        // The difference of aligned significands is exact.
        F128::pack(sign_z, exp_z, sig.shl(shift_dist as u32))
    } else {
        let sig_a = frac_a.shl(7);
        let sig_b = frac_b.shl(7);
        let int_bit = Sig128::from_halves(1 << 55, 0);
        let sign_z;
        let exp_z;
        let sig_x;
        let sig_y;
        let dist;
        if exp_diff < 0 {
            sign_z = !a.sign();
            if exp_b == QUAD_EXP_INF {
                if !frac_b.is_zero() {
                    return propagate(env, a, b);
                }
                return F128::infinity(sign_z);
            }
            exp_z = exp_b - 1;
            sig_x = sig_b.add(int_bit);
            sig_y = if exp_a != 0 {
                sig_a.add(int_bit)
            } else {
                sig_a.add(sig_a)
            };
            dist = -exp_diff;
        } else {
            sign_z = a.sign();
            if exp_a == QUAD_EXP_INF {
                if !frac_a.is_zero() {
                    return propagate(env, a, b);
                }
                return a;
            }
            exp_z = exp_a - 1;
            sig_x = sig_a.add(int_bit);
            sig_y = if exp_b != 0 {
                sig_b.add(int_bit)
            } else {
                sig_b.add(sig_b)
            };
            dist = exp_diff;
        }
        norm_round_pack(env, sign_z, exp_z, sig_x.sub(sig_y.shr_jam(dist as u32)))
    }
}

#[cfg(test)]
#[cfg(not(feature = "legacy-snan"))]
mod tests {
    use super::*;
    use crate::repr::F64;

    fn quad(v: f64) -> F128 {
        F64::from_bits(v.to_bits()).to_f128(&mut FpEnv::default())
    }

    fn host(a: F128) -> f64 {
        f64::from_bits(a.to_f64(&mut FpEnv::default()).to_bits())
    }

    fn bits(exp: u128, frac_hi: u64, frac_lo: u64) -> F128 {
        F128::from_bits((exp << 112) | (u128::from(frac_hi) << 64) | u128::from(frac_lo))
    }

    #[test]
    fn add_sub_exact_cases() {
        let mut env = FpEnv::default();
        for (x, y) in [(1.5, 2.25), (1.0e300, 2.5e284), (-7.0, 7.0), (0.1, 0.2)] {
            let z = quad(x).add(quad(y), &mut env);
            // Both operands widen exactly, and the quad sum of two f64
            // values is itself exact.
            assert_eq!(host(z), x + y, "{x} + {y}");
            let z = quad(x).sub(quad(y), &mut env);
            assert_eq!(host(z), x - y, "{x} - {y}");
        }
        assert!(env.flags.is_empty());
    }

    #[test]
    fn add_rounds_distant_operands() {
        // 1 + 2^-112 is exact; 1 + 2^-113 ties to even, back to 1.
        let one = bits(0x3FFF, 0, 0);
        let mut env = FpEnv::default();
        let z = one.add(bits(0x3FFF - 112, 0, 0), &mut env);
        assert_eq!((z.exp(), z.frac_hi(), z.frac_lo()), (0x3FFF, 0, 1));
        assert!(env.flags.is_empty());

        let mut env = FpEnv::default();
        let z = one.add(bits(0x3FFF - 113, 0, 0), &mut env);
        assert_eq!(z, one);
        assert!(env.flags.inexact());
    }

    #[test]
    fn cancellation_and_signed_zero() {
        let mut env = FpEnv::default();
        let z = quad(1.5).sub(quad(1.5), &mut env);
        assert_eq!(z, F128::zero(false));

        let mut env = FpEnv::new(Rounding::Min);
        let z = quad(1.5).sub(quad(1.5), &mut env);
        assert_eq!(z, F128::zero(true));

        // Near-total cancellation is exact.
        let mut env = FpEnv::default();
        let z = bits(0x3FFF, 0, 1).sub(bits(0x3FFF, 0, 0), &mut env);
        assert_eq!((z.exp(), z.frac_lo()), (0x3FFF - 112, 0));
        assert!(env.flags.is_empty());
    }

    #[test]
    fn inf_arithmetic() {
        let inf = F128::infinity(false);
        let mut env = FpEnv::default();
        assert_eq!(inf.add(quad(1.0), &mut env), inf);
        assert_eq!(quad(1.0).sub(inf, &mut env), F128::infinity(true));
        assert!(env.flags.is_empty());
        let z = inf.sub(inf, &mut env);
        assert!(z.is_nan());
        assert!(env.flags.invalid());
    }

    #[test]
    fn mul_exact_products() {
        let mut env = FpEnv::default();
        for (x, y) in [(1.5, 2.0), (3.0, 7.0), (0.375, -8.0), (-2.5, 4.0)] {
            let z = quad(x).mul(quad(y), &mut env);
            assert_eq!(host(z), x * y, "{x} * {y}");
        }
        // A full double-width product still fits the quad significand:
        // (1 + 2^-56)^2 = 1 + 2^-55 + 2^-112 exactly.
        let a = bits(0x3FFF, 0, 1 << 56);
        let z = a.mul(a, &mut env);
        assert_eq!((z.exp(), z.frac_hi(), z.frac_lo()), (0x3FFF, 0, (1 << 57) | 1));
        assert!(env.flags.is_empty());

        let mut env = FpEnv::default();
        let z = F128::zero(false).mul(F128::infinity(true), &mut env);
        assert!(z.is_nan());
        assert!(env.flags.invalid());
    }

    #[test]
    fn mul_overflow_and_underflow() {
        let mut env = FpEnv::default();
        let big = bits(0x7FFE, 0, 0);
        let z = big.mul(quad(2.0), &mut env);
        assert!(z.is_inf());
        assert!(env.flags.overflow() && env.flags.inexact());

        let mut env = FpEnv::default();
        let tiny = bits(1, 0, 0);
        let z = tiny.mul(quad(0.25), &mut env);
        assert!(z.is_subnormal());
        assert!(env.flags.is_empty(), "exact subnormal product");
    }

    #[test]
    fn div_digit_loop_bits() {
        // 1/3 and 1/10, checked against the known quad encodings.
        let mut env = FpEnv::default();
        let z = quad(1.0).div(quad(3.0), &mut env);
        assert_eq!(
            (z.exp(), z.frac_hi(), z.frac_lo()),
            (0x3FFD, 0x5555_5555_5555, 0x5555_5555_5555_5555)
        );
        assert!(env.flags.inexact());

        let mut env = FpEnv::default();
        let z = quad(1.0).div(quad(10.0), &mut env);
        assert_eq!(
            (z.exp(), z.frac_hi(), z.frac_lo()),
            (0x3FFB, 0x9999_9999_9999, 0x9999_9999_9999_999A)
        );

        let mut env = FpEnv::default();
        let z = quad(6.0).div(quad(2.0), &mut env);
        assert_eq!(host(z), 3.0);
        assert!(env.flags.is_empty());
    }

    #[test]
    fn div_specials() {
        let mut env = FpEnv::default();
        let z = quad(1.0).div(F128::zero(false), &mut env);
        assert_eq!(z, F128::infinity(false));
        assert!(env.flags.infinite() && !env.flags.invalid());

        for (x, y) in [
            (F128::zero(false), F128::zero(true)),
            (F128::infinity(false), F128::infinity(false)),
        ] {
            let mut env = FpEnv::default();
            let z = x.div(y, &mut env);
            assert!(z.is_nan());
            assert!(env.flags.invalid());
        }
    }

    #[test]
    fn rem_nearest_quotient() {
        let mut env = FpEnv::default();
        assert_eq!(host(quad(5.0).rem(quad(3.0), &mut env)), -1.0);
        assert_eq!(host(quad(7.0).rem(quad(2.0), &mut env)), -1.0);
        assert_eq!(host(quad(5.0).rem(quad(2.0), &mut env)), 1.0);
        assert_eq!(host(quad(10.5).rem(quad(3.25), &mut env)), 0.75);
        assert!(env.flags.is_empty(), "remainder is always exact");

        let z = quad(-6.0).rem(quad(3.0), &mut env);
        assert!(z.is_zero() && z.sign());

        let z = quad(0.25).rem(quad(128.0), &mut env);
        assert_eq!(host(z), 0.25);

        let mut env = FpEnv::default();
        let z = quad(1.0).rem(F128::zero(false), &mut env);
        assert!(z.is_nan());
        assert!(env.flags.invalid());
    }

    #[test]
    fn rem_wide_exponent_gap() {
        // 2^200 rem 3: 2^200 mod 3 = 1, quotient rounds to nearest.
        let mut env = FpEnv::default();
        let z = quad(2f64.powi(200)).rem(quad(3.0), &mut env);
        assert_eq!(host(z), 1.0);
        assert!(env.flags.is_empty());
    }

    #[test]
    fn sqrt_known_roots() {
        let mut env = FpEnv::default();
        for (x, r) in [(4.0, 2.0), (2.25, 1.5), (1.0, 1.0), (0.25, 0.5)] {
            let z = quad(x).sqrt(&mut env);
            assert_eq!(host(z), r, "sqrt({x})");
        }
        assert!(env.flags.is_empty());

        // sqrt(2) against its published quad encoding.
        let z = quad(2.0).sqrt(&mut env);
        assert_eq!(
            (z.exp(), z.frac_hi(), z.frac_lo()),
            (0x3FFF, 0x6A09_E667_F3BC, 0xC908_B2FB_1366_EA95)
        );
        assert!(env.flags.inexact());
    }

    #[test]
    fn sqrt_rejects_negatives() {
        let mut env = FpEnv::default();
        let z = quad(-1.0).sqrt(&mut env);
        assert!(z.is_nan());
        assert!(env.flags.invalid());

        let mut env = FpEnv::default();
        let z = F128::zero(true).sqrt(&mut env);
        assert!(z.is_zero() && z.sign());
        assert!(env.flags.is_empty());
    }

    #[test]
    fn round_to_int_modes() {
        let mut env = FpEnv::default();
        for (x, expect) in [(2.5, 2.0), (3.5, 4.0), (-2.5, -2.0), (0.49, 0.0)] {
            let z = quad(x).round_to_int(&mut env, true);
            assert_eq!(host(z), expect, "rint({x})");
        }
        assert!(env.flags.inexact());

        let mut env = FpEnv::new(Rounding::Min);
        assert_eq!(host(quad(-1.2).round_to_int(&mut env, false)), -2.0);
        let mut env = FpEnv::new(Rounding::Max);
        assert_eq!(host(quad(0.3).round_to_int(&mut env, false)), 1.0);
        assert!(env.flags.is_empty());

        // Sign of zero survives.
        let mut env = FpEnv::default();
        let z = quad(-0.3).round_to_int(&mut env, false);
        assert!(z.is_zero() && z.sign());
    }

    #[test]
    fn comparisons() {
        let mut env = FpEnv::default();
        let vals = [-3.5, -0.0, 0.0, 2.25, 1.0e300];
        for &x in &vals {
            for &y in &vals {
                assert_eq!(quad(x).eq(quad(y), &mut env), x == y, "{x} == {y}");
                assert_eq!(quad(x).lt(quad(y), &mut env), x < y, "{x} < {y}");
                assert_eq!(quad(x).le(quad(y), &mut env), x <= y, "{x} <= {y}");
            }
        }
        assert!(env.flags.is_empty());

        let nan = F128::default_nan();
        assert!(!nan.eq(quad(1.0), &mut env));
        assert!(env.flags.is_empty());
        assert!(!nan.lt(quad(1.0), &mut env));
        assert!(env.flags.invalid());
    }
}
