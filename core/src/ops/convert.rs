//! Conversions between the single-word formats.
//!
//! One generic path serves every pair: NaNs cross through [`CommonNan`],
//! everything else realigns the significand onto the target's rounding
//! register and lets round-and-pack sort out range.

use crate::env::FpEnv;
use crate::nan::CommonNan;
use crate::ops::norm_subnormal;
use crate::prim::shift_right_jam64;
use crate::repr::{Binary16, Binary32, Binary64, FloatFormat, Fp, F16, F32, F64};
use crate::round::round_pack;

pub(crate) fn convert<F: FloatFormat, G: FloatFormat>(env: &mut FpEnv, a: Fp<F>) -> Fp<G> {
    let (mut exp, mut frac) = (a.raw_exp(), a.frac());
    let sign = a.sign();

    if exp == F::EXP_INF {
        if frac != 0 {
            return CommonNan::from_fp(env, a).to_fp::<G>();
        }
        return Fp::infinity(sign);
    }
    if exp == 0 {
        if frac == 0 {
            return Fp::zero(sign);
        }
        (exp, frac) = norm_subnormal::<F>(frac);
    }

    let sig = frac | F::IMPLICIT_BIT;
    let delta = G::SIG_BITS as i32 + 7 - F::SIG_BITS as i32;
    let sig_g = if delta >= 0 {
        sig << delta
    } else {
        shift_right_jam64(sig, (-delta) as u32)
    };
    round_pack(env, sign, exp - F::BIAS + G::BIAS - 1, sig_g)
}

impl F16 {
    pub fn to_f32(self, env: &mut FpEnv) -> F32 {
        convert::<Binary16, Binary32>(env, self)
    }

    pub fn to_f64(self, env: &mut FpEnv) -> F64 {
        convert::<Binary16, Binary64>(env, self)
    }
}

impl F32 {
    pub fn to_f16(self, env: &mut FpEnv) -> F16 {
        convert::<Binary32, Binary16>(env, self)
    }

    pub fn to_f64(self, env: &mut FpEnv) -> F64 {
        convert::<Binary32, Binary64>(env, self)
    }
}

impl F64 {
    pub fn to_f16(self, env: &mut FpEnv) -> F16 {
        convert::<Binary64, Binary16>(env, self)
    }

    pub fn to_f32(self, env: &mut FpEnv) -> F32 {
        convert::<Binary64, Binary32>(env, self)
    }
}
