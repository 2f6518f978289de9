//! Square root.
//!
//! The significand root is the exact integer square root of the radicand
//! scaled onto the rounding register, with a sticky bit for any discarded
//! remainder. The integer root starts from the reciprocal-square-root
//! estimate and is finished with Newton steps plus a final correction, so
//! the digit is exact no matter the seed.

use crate::env::FpEnv;
use crate::nan;
use crate::ops::norm_subnormal;
use crate::recip::isqrt;
use crate::repr::{FloatFormat, Fp};
use crate::round::round_pack;

impl<F: FloatFormat> Fp<F> {
    pub fn sqrt(self, env: &mut FpEnv) -> Self {
        let a = self;
        let (mut exp_a, mut frac_a) = (a.raw_exp(), a.frac());
        let sign_a = a.sign();

        if exp_a == F::EXP_INF {
            if frac_a != 0 {
                return nan::propagate(env, a, a);
            }
            if !sign_a {
                return a;
            }
            env.raise_invalid();
            return Self::default_nan();
        }
        if a.is_zero() {
            // sqrt(-0) is -0.
            return a;
        }
        if sign_a {
            env.raise_invalid();
            return Self::default_nan();
        }
        if exp_a == 0 {
            (exp_a, frac_a) = norm_subnormal::<F>(frac_a);
        }

        // value = sig * 2^(exp_a - BIAS - SIG_BITS), sig in [2^S, 2^(S+1)).
        let exp_z = ((exp_a - F::BIAS) >> 1) + F::BIAS - 1;
        let odd_exp = (exp_a - F::BIAS) & 1;
        let sig = frac_a | F::IMPLICIT_BIT;
        // Scale the radicand so its root carries SIG_BITS + 8 bits; an odd
        // exponent contributes one extra doubling.
        let scaled = u128::from(sig) << (F::SIG_BITS + 14 + odd_exp as u32);
        let root = isqrt(scaled);
        let rem = scaled - u128::from(root) * u128::from(root);
        let sig_z = root | u64::from(rem != 0);
        round_pack(env, false, exp_z, sig_z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::{F32, F64};

    #[test]
    fn matches_host() {
        let mut env = FpEnv::default();
        for x in [2.0f32, 3.0, 0.5, 1.0e30, 1.0e-30, 152.4, 2147483647.0] {
            let z = F32::from_bits(x.to_bits()).sqrt(&mut env);
            assert_eq!(z.to_bits(), x.sqrt().to_bits(), "sqrt({x})");
        }
        for x in [2.0f64, 1.0e300, 4.9e-324] {
            let z = F64::from_bits(x.to_bits()).sqrt(&mut env);
            assert_eq!(z.to_bits(), x.sqrt().to_bits(), "sqrt({x})");
        }
    }

    #[test]
    fn perfect_squares_are_exact() {
        let mut env = FpEnv::default();
        let z = F32::from_bits(9.0f32.to_bits()).sqrt(&mut env);
        assert_eq!(z.to_bits(), 3.0f32.to_bits());
        assert!(env.flags.is_empty());
    }

    #[test]
    fn negative_and_special_operands() {
        let mut env = FpEnv::default();
        let z = F32::from_bits((-4.0f32).to_bits()).sqrt(&mut env);
        assert!(z.is_nan());
        assert!(env.flags.invalid());

        let mut env = FpEnv::default();
        assert_eq!(F32::zero(true).sqrt(&mut env).to_bits(), 0x8000_0000);
        assert_eq!(F32::infinity(false).sqrt(&mut env), F32::infinity(false));
        assert!(env.flags.is_empty());
    }
}
