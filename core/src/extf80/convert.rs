//! Conversions between the extended format, the interchange formats, and
//! integers.
//!
//! Widening a 16-, 32- or 64-bit float is always exact: the significand
//! slots into the top of the 64-bit word with room to spare. Narrowing and
//! the integer conversions round through the shared funnels.

use crate::env::FpEnv;
use crate::extf80::{norm_subnormal, ExtF80, EXT_BIAS, EXT_EXP_INF};
use crate::nan::CommonNan;
use crate::ops;
use crate::prim::{shift_right_jam64, shift_right_jam64_extra};
use crate::repr::{Binary16, Binary32, Binary64, FloatFormat, Fp, F16, F32, F64};
use crate::round::{
    round_pack, round_to_i32, round_to_i64, round_to_u32, round_to_u64, I32_NEG_OVERFLOW,
    I32_POS_OVERFLOW, I64_NEG_OVERFLOW, I64_POS_OVERFLOW, U32_NEG_OVERFLOW, U32_POS_OVERFLOW,
    U64_NEG_OVERFLOW, U64_POS_OVERFLOW,
};

fn to_ext<F: FloatFormat>(env: &mut FpEnv, a: Fp<F>) -> ExtF80 {
    let sign = a.sign();
    if a.raw_exp() == F::EXP_INF {
        if a.frac() != 0 {
            return CommonNan::from_fp(env, a).to_ext();
        }
        return ExtF80::infinity(sign);
    }
    if a.is_zero() {
        return ExtF80::zero(sign);
    }
    let (exp, frac) = if a.raw_exp() == 0 {
        ops::norm_subnormal::<F>(a.frac())
    } else {
        (a.raw_exp(), a.frac())
    };
    let sig = (frac | F::IMPLICIT_BIT) << (63 - F::SIG_BITS);
    ExtF80::pack(sign, exp - F::BIAS + EXT_BIAS, sig)
}

fn from_ext<F: FloatFormat>(env: &mut FpEnv, a: ExtF80) -> Fp<F> {
    let sign = a.sign();
    if a.exp() as i32 == EXT_EXP_INF {
        if a.frac() != 0 {
            return CommonNan::from_ext(env, a).to_fp();
        }
        return Fp::infinity(sign);
    }
    if a.sig() == 0 {
        return Fp::zero(sign);
    }
    let (exp, sig) = if a.exp() == 0 {
        norm_subnormal(a.sig())
    } else {
        (a.exp() as i32, a.sig())
    };
    // Drop onto the 7-extra-bit rounding register of the target format.
    let sig_reg = shift_right_jam64(sig, 56 - F::SIG_BITS);
    round_pack(env, sign, exp - EXT_BIAS + F::BIAS - 1, sig_reg)
}

impl F16 {
    pub fn to_extf80(self, env: &mut FpEnv) -> ExtF80 {
        to_ext::<Binary16>(env, self)
    }
}

impl F32 {
    pub fn to_extf80(self, env: &mut FpEnv) -> ExtF80 {
        to_ext::<Binary32>(env, self)
    }
}

impl F64 {
    pub fn to_extf80(self, env: &mut FpEnv) -> ExtF80 {
        to_ext::<Binary64>(env, self)
    }
}

impl ExtF80 {
    pub fn to_f16(self, env: &mut FpEnv) -> F16 {
        from_ext::<Binary16>(env, self)
    }

    pub fn to_f32(self, env: &mut FpEnv) -> F32 {
        from_ext::<Binary32>(env, self)
    }

    pub fn to_f64(self, env: &mut FpEnv) -> F64 {
        from_ext::<Binary64>(env, self)
    }

    pub fn to_i32(self, env: &mut FpEnv, exact: bool) -> i32 {
        let (sign, exp) = (self.sign(), self.exp() as i32);
        if exp == EXT_EXP_INF {
            env.raise_invalid();
            return if self.frac() != 0 || !sign {
                I32_POS_OVERFLOW
            } else {
                I32_NEG_OVERFLOW
            };
        }
        let shift_dist = EXT_BIAS + 51 - exp;
        if shift_dist <= 0 {
            env.raise_invalid();
            return if sign { I32_NEG_OVERFLOW } else { I32_POS_OVERFLOW };
        }
        let fixed = shift_right_jam64(self.sig(), shift_dist as u32);
        round_to_i32(env, sign, fixed, exact)
    }

    pub fn to_u32(self, env: &mut FpEnv, exact: bool) -> u32 {
        let (sign, exp) = (self.sign(), self.exp() as i32);
        if exp == EXT_EXP_INF {
            env.raise_invalid();
            return if self.frac() != 0 || !sign {
                U32_POS_OVERFLOW
            } else {
                U32_NEG_OVERFLOW
            };
        }
        let shift_dist = EXT_BIAS + 51 - exp;
        if shift_dist <= 0 {
            env.raise_invalid();
            return if sign { U32_NEG_OVERFLOW } else { U32_POS_OVERFLOW };
        }
        let fixed = shift_right_jam64(self.sig(), shift_dist as u32);
        round_to_u32(env, sign, fixed, exact)
    }

    pub fn to_i64(self, env: &mut FpEnv, exact: bool) -> i64 {
        let (sign, exp) = (self.sign(), self.exp() as i32);
        if exp == EXT_EXP_INF {
            env.raise_invalid();
            return if self.frac() != 0 || !sign {
                I64_POS_OVERFLOW
            } else {
                I64_NEG_OVERFLOW
            };
        }
        let shift_dist = EXT_BIAS + 63 - exp;
        if shift_dist < 0 {
            env.raise_invalid();
            return if sign { I64_NEG_OVERFLOW } else { I64_POS_OVERFLOW };
        }
        let (sig, extra) = shift_right_jam64_extra(self.sig(), 0, shift_dist as u32);
        round_to_i64(env, sign, sig, extra, exact)
    }

    pub fn to_u64(self, env: &mut FpEnv, exact: bool) -> u64 {
        let (sign, exp) = (self.sign(), self.exp() as i32);
        if exp == EXT_EXP_INF {
            env.raise_invalid();
            return if self.frac() != 0 || !sign {
                U64_POS_OVERFLOW
            } else {
                U64_NEG_OVERFLOW
            };
        }
        let shift_dist = EXT_BIAS + 63 - exp;
        if shift_dist < 0 {
            env.raise_invalid();
            return if sign { U64_NEG_OVERFLOW } else { U64_POS_OVERFLOW };
        }
        let (sig, extra) = shift_right_jam64_extra(self.sig(), 0, shift_dist as u32);
        round_to_u64(env, sign, sig, extra, exact)
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

fn from_mag(sign: bool, mag: u64) -> ExtF80 {
    if mag == 0 {
        return ExtF80::zero(false);
    }
    let shift = mag.leading_zeros();
    ExtF80::pack(sign, EXT_BIAS + 63 - shift as i32, mag << shift)
}
