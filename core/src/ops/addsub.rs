//! Addition and subtraction.
//!
//! Both public entry points reduce to a magnitude-add or magnitude-subtract
//! on the operands' raw encodings; the result sign rides on the first
//! operand so NaN payloads pass through unmodified.

use crate::env::{FpEnv, Rounding};
use crate::nan;
use crate::prim::shift_right_jam64;
use crate::repr::{FloatFormat, Fp};
use crate::round::{norm_round_pack, round_pack};

impl<F: FloatFormat> Fp<F> {
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
}

/// `|a| + |b|` with the sign of `a`.
fn add_mags<F: FloatFormat>(env: &mut FpEnv, a: Fp<F>, b: Fp<F>) -> Fp<F> {
    let (exp_a, frac_a) = (a.raw_exp(), a.frac());
    let (exp_b, frac_b) = (b.raw_exp(), b.frac());
    let sign_z = a.sign();
    let exp_diff = exp_a - exp_b;

    if exp_diff == 0 {
        if exp_a == 0 {
            // Both subnormal or zero: the field-wise sum is exact, and a
            // carry into the exponent field is exactly the normalization.
            return Fp::from_raw(a.raw() + frac_b);
        }
        if exp_a == F::EXP_INF {
            if frac_a | frac_b != 0 {
                return nan::propagate(env, a, b);
            }
            return a;
        }
        let sig_z = (2 << F::SIG_BITS) + frac_a + frac_b;
        if sig_z & 1 == 0 && exp_a < F::EXP_INF - 1 {
            return Fp::pack(sign_z, exp_a, sig_z >> 1);
        }
        round_pack(env, sign_z, exp_a, sig_z << 6)
    } else {
        let mut sig_a = frac_a << 6;
        let mut sig_b = frac_b << 6;
        let exp_z;
        if exp_diff < 0 {
            if exp_b == F::EXP_INF {
                if frac_b != 0 {
                    return nan::propagate(env, a, b);
                }
                return Fp::infinity(sign_z);
            }
            exp_z = exp_b;
            sig_a += if exp_a != 0 {
                1 << (F::SIG_BITS + 6)
            } else {
                sig_a
            };
            sig_a = shift_right_jam64(sig_a, (-exp_diff) as u32);
        } else {
            if exp_a == F::EXP_INF {
                if frac_a != 0 {
                    return nan::propagate(env, a, b);
                }
                return a;
            }
            exp_z = exp_a;
            sig_b += if exp_b != 0 {
                1 << (F::SIG_BITS + 6)
            } else {
                sig_b
            };
            sig_b = shift_right_jam64(sig_b, exp_diff as u32);
        }
        let mut exp_z = exp_z;
        let mut sig_z = (1 << (F::SIG_BITS + 6)) + sig_a + sig_b;
        if sig_z < (1 << (F::SIG_BITS + 7)) {
            exp_z -= 1;
            sig_z <<= 1;
        }
        round_pack(env, sign_z, exp_z, sig_z)
    }
}

/// `|a| - |b|` with the sign of `a`, flipped if `|b|` is larger.
fn sub_mags<F: FloatFormat>(env: &mut FpEnv, a: Fp<F>, b: Fp<F>) -> Fp<F> {
    let (exp_a, frac_a) = (a.raw_exp(), a.frac());
    let (exp_b, frac_b) = (b.raw_exp(), b.frac());
    let exp_diff = exp_a - exp_b;

    if exp_diff == 0 {
        if exp_a == F::EXP_INF {
            if frac_a | frac_b != 0 {
                return nan::propagate(env, a, b);
            }
            // Magnitude subtraction of infinities.
            env.raise_invalid();
            return Fp::default_nan();
        }
        let sig_diff = frac_a as i64 - frac_b as i64;
        if sig_diff == 0 {
            // Exact cancellation: zero whose sign depends on the rounding
            // direction.
            return Fp::zero(env.rounding == Rounding::Min);
        }
        let exp = if exp_a != 0 { exp_a - 1 } else { 0 };
        let sign_z = if sig_diff < 0 { !a.sign() } else { a.sign() };
        let sig = sig_diff.unsigned_abs();
        let mut shift_dist = sig.leading_zeros() as i32 - (63 - F::SIG_BITS as i32);
        let mut exp_z = exp - shift_dist;
        if exp_z < 0 {
            shift_dist = exp;
            exp_z = 0;
        }
        // The difference of aligned significands is exact.
        Fp::pack(sign_z, exp_z, sig << shift_dist)
    } else {
        let sig_a = frac_a << 7;
        let sig_b = frac_b << 7;
        let sign_z;
        let exp_z;
        let sig_x;
        let sig_y;
        let dist;
        if exp_diff < 0 {
            sign_z = !a.sign();
            if exp_b == F::EXP_INF {
                if frac_b != 0 {
                    return nan::propagate(env, a, b);
                }
                return Fp::infinity(sign_z);
            }
            exp_z = exp_b - 1;
            sig_x = sig_b | (1 << (F::SIG_BITS + 7));
            sig_y = sig_a
                + if exp_a != 0 {
                    1 << (F::SIG_BITS + 7)
                } else {
                    sig_a
                };
            dist = -exp_diff;
        } else {
            sign_z = a.sign();
            if exp_a == F::EXP_INF {
                if frac_a != 0 {
                    return nan::propagate(env, a, b);
                }
                return a;
            }
            exp_z = exp_a - 1;
            sig_x = sig_a | (1 << (F::SIG_BITS + 7));
            sig_y = sig_b
                + if exp_b != 0 {
                    1 << (F::SIG_BITS + 7)
                } else {
                    sig_b
                };
            dist = exp_diff;
        }
        norm_round_pack(env, sign_z, exp_z, sig_x - shift_right_jam64(sig_y, dist as u32))
    }
}
