//! IEEE remainder: `a - n*b` with `n` the quotient rounded to nearest,
//! ties to even.
//!
//! The reduction runs at half the divisor's scale so the nearest/tie
//! decision is a plain compare of the partial remainder against the
//! divisor significand.

use crate::env::FpEnv;
use crate::nan;
use crate::ops::norm_subnormal;
use crate::repr::{FloatFormat, Fp};
use crate::round::norm_round_pack;

impl<F: FloatFormat> Fp<F> {
    pub fn rem(self, rhs: Self, env: &mut FpEnv) -> Self {
        let (a, b) = (self, rhs);
        let (mut exp_a, mut frac_a) = (a.raw_exp(), a.frac());
        let (mut exp_b, mut frac_b) = (b.raw_exp(), b.frac());
        let sign_a = a.sign();

        if exp_a == F::EXP_INF {
            if frac_a != 0 || b.is_nan() {
                return nan::propagate(env, a, b);
            }
            env.raise_invalid();
            return Self::default_nan();
        }
        if exp_b == F::EXP_INF {
            if frac_b != 0 {
                return nan::propagate(env, a, b);
            }
            // Finite rem infinity is the dividend, exactly.
            return a;
        }
        if exp_b == 0 {
            if frac_b == 0 {
                env.raise_invalid();
                return Self::default_nan();
            }
            (exp_b, frac_b) = norm_subnormal::<F>(frac_b);
        }
        if exp_a == 0 {
            if frac_a == 0 {
                return a;
            }
            (exp_a, frac_a) = norm_subnormal::<F>(frac_a);
        }

        let sig_a = frac_a | F::IMPLICIT_BIT;
        let sig_b = frac_b | F::IMPLICIT_BIT;
        let exp_diff = exp_a - exp_b;
        if exp_diff < -1 {
            // |a| < |b| / 2: the quotient rounds to zero.
            return a;
        }

        // Reduce sig_a * 2^(exp_diff + 1) modulo 2 * sig_b, keeping the
        // parity of the truncated quotient. Only the last chunk's quotient
        // bit can affect the parity.
        let divisor = sig_b << 1;
        let chunk = 62 - F::SIG_BITS;
        let mut rem = sig_a;
        let mut shift_left = exp_diff + 1;
        let mut q_parity = 0_u64;
        while shift_left > 0 {
            let c = (shift_left as u32).min(chunk);
            rem <<= c;
            q_parity = rem / divisor;
            rem %= divisor;
            shift_left -= c as i32;
        }
        q_parity &= 1;

        // Nearest adjustment: rem is in [0, 2*sig_b) at scale exp_b - 1.
        let (sign_z, mag) = if rem > sig_b || (rem == sig_b && q_parity == 1) {
            (!sign_a, divisor - rem)
        } else {
            (sign_a, rem)
        };
        if mag == 0 {
            // A zero remainder keeps the dividend's sign.
            return Self::zero(sign_a);
        }
        norm_round_pack(env, sign_z, exp_b + 5, mag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::{F32, F64};

    fn f32b(v: f32) -> F32 {
        F32::from_bits(v.to_bits())
    }

    #[test]
    fn nearest_remainder_semantics() {
        let mut env = FpEnv::default();
        // 5 rem 3: quotient rounds to 2, remainder -1.
        let z = f32b(5.0).rem(f32b(3.0), &mut env);
        assert_eq!(z.to_bits(), (-1.0f32).to_bits());
        // 7 rem 2: quotient 3.5 ties to 4, remainder -1.
        let z = f32b(7.0).rem(f32b(2.0), &mut env);
        assert_eq!(z.to_bits(), (-1.0f32).to_bits());
        // 5 rem 2: quotient 2.5 ties to even 2, remainder 1.
        let z = f32b(5.0).rem(f32b(2.0), &mut env);
        assert_eq!(z.to_bits(), 1.0f32.to_bits());
        assert!(env.flags.is_empty(), "remainder is always exact");
    }

    #[test]
    fn matches_host_ieee_rem() {
        let mut env = FpEnv::default();
        // Pairs chosen so the host-side reconstruction is itself exact.
        for (x, y) in [
            (10.5f64, 3.25f64),
            (-17.0, 5.0),
            (2.5e8, 7.0),
            (0.375, 0.5),
            (9007.0, 0.125),
        ] {
            let z = F64::from_bits(x.to_bits()).rem(F64::from_bits(y.to_bits()), &mut env);
            let host = x - (x / y).round_ties_even() * y;
            assert_eq!(z.to_bits(), host.to_bits(), "{x} rem {y}");
        }
    }

    #[test]
    fn small_dividend_passes_through() {
        let mut env = FpEnv::default();
        let z = f32b(0.25).rem(f32b(4.0), &mut env);
        assert_eq!(z.to_bits(), 0.25f32.to_bits());
    }

    #[test]
    fn zero_divisor_invalid() {
        let mut env = FpEnv::default();
        let z = f32b(1.0).rem(F32::zero(false), &mut env);
        assert!(z.is_nan());
        assert!(env.flags.invalid());
    }

    #[test]
    fn zero_remainder_keeps_dividend_sign() {
        let mut env = FpEnv::default();
        let z = f32b(-6.0).rem(f32b(3.0), &mut env);
        assert_eq!(z.to_bits(), 0x8000_0000);
    }
}
