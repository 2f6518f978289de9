//! Division.
//!
//! The quotient comes from one native double-word division; the low bits of
//! the result are then patched with an exactness check so the sticky bit is
//! never wrong.

use crate::env::{Exceptions, FpEnv};
use crate::nan;
use crate::ops::norm_subnormal;
use crate::repr::{FloatFormat, Fp};
use crate::round::round_pack;

impl<F: FloatFormat> Fp<F> {
    pub fn div(self, rhs: Self, env: &mut FpEnv) -> Self {
        let (a, b) = (self, rhs);
        let (mut exp_a, mut frac_a) = (a.raw_exp(), a.frac());
        let (mut exp_b, mut frac_b) = (b.raw_exp(), b.frac());
        let sign_z = a.sign() ^ b.sign();

        if exp_a == F::EXP_INF {
            if frac_a != 0 {
                return nan::propagate(env, a, b);
            }
            if exp_b == F::EXP_INF {
                if frac_b != 0 {
                    return nan::propagate(env, a, b);
                }
                env.raise_invalid();
                return Self::default_nan();
            }
            return Self::infinity(sign_z);
        }
        if exp_b == F::EXP_INF {
            if frac_b != 0 {
                return nan::propagate(env, a, b);
            }
            return Self::zero(sign_z);
        }
        if exp_b == 0 {
            if frac_b == 0 {
                if exp_a == 0 && frac_a == 0 {
                    env.raise_invalid();
                    return Self::default_nan();
                }
                env.raise(Exceptions::INFINITE);
                return Self::infinity(sign_z);
            }
            (exp_b, frac_b) = norm_subnormal::<F>(frac_b);
        }
        if exp_a == 0 {
            if frac_a == 0 {
                return Self::zero(sign_z);
            }
            (exp_a, frac_a) = norm_subnormal::<F>(frac_a);
        }

        let mut exp_z = exp_a - exp_b + F::BIAS - 1;
        let sig_a = frac_a | F::IMPLICIT_BIT;
        let sig_b = frac_b | F::IMPLICIT_BIT;
        // Position the numerator so the quotient lands on the rounding
        // register with its integer bit at SIG_BITS + 7.
        let num = if sig_a < sig_b {
            exp_z -= 1;
            u128::from(sig_a) << (F::SIG_BITS + 8)
        } else {
            u128::from(sig_a) << (F::SIG_BITS + 7)
        };
        let mut sig_z = (num / u128::from(sig_b)) as u64;
        if sig_z & 0x3F == 0 {
            sig_z |= u64::from(u128::from(sig_b) * u128::from(sig_z) != num);
        }
        round_pack(env, sign_z, exp_z, sig_z)
    }
}
