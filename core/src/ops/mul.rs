//! Multiplication.

use crate::env::FpEnv;
use crate::nan;
use crate::ops::norm_subnormal;
use crate::repr::{FloatFormat, Fp};
use crate::round::round_pack;

impl<F: FloatFormat> Fp<F> {
    pub fn mul(self, rhs: Self, env: &mut FpEnv) -> Self {
        let (a, b) = (self, rhs);
        let (mut exp_a, mut frac_a) = (a.raw_exp(), a.frac());
        let (mut exp_b, mut frac_b) = (b.raw_exp(), b.frac());
        let sign_z = a.sign() ^ b.sign();

        if exp_a == F::EXP_INF || exp_b == F::EXP_INF {
            if a.is_nan() || b.is_nan() {
                return nan::propagate(env, a, b);
            }
            // Infinity times zero has no useful interpretation.
            if (exp_a == F::EXP_INF && b.is_zero()) || (exp_b == F::EXP_INF && a.is_zero()) {
                env.raise_invalid();
                return Self::default_nan();
            }
            return Self::infinity(sign_z);
        }
        if exp_a == 0 {
            if frac_a == 0 {
                return Self::zero(sign_z);
            }
            (exp_a, frac_a) = norm_subnormal::<F>(frac_a);
        }
        if exp_b == 0 {
            if frac_b == 0 {
                return Self::zero(sign_z);
            }
            (exp_b, frac_b) = norm_subnormal::<F>(frac_b);
        }

        let mut exp_z = exp_a + exp_b - F::BIAS;
        let sig_a = (frac_a | F::IMPLICIT_BIT) << 7;
        let sig_b = (frac_b | F::IMPLICIT_BIT) << 8;
        let product = u128::from(sig_a) * u128::from(sig_b);
        // Jam the product down to the rounding register width.
        let dist = F::SIG_BITS + 9;
        let mut sig_z =
            (product >> dist) as u64 | u64::from(product & ((1 << dist) - 1) != 0);
        if sig_z < (1 << (F::SIG_BITS + 7)) {
            exp_z -= 1;
            sig_z <<= 1;
        }
        round_pack(env, sign_z, exp_z, sig_z)
    }
}
