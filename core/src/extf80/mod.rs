//! 80-bit double-extended format.
//!
//! Unlike the interchange formats, the integer bit is stored explicitly and
//! the significand fills a full 64-bit word, so results round on a separate
//! extra word instead of in-register rounding bits. Results can also be
//! rounded to a reduced (53- or 24-bit) significand while keeping the
//! extended exponent range, mirroring the x87 precision-control field.

use proc_bitfield::bitfield;
use serde::{Deserialize, Serialize};

use crate::env::{Exceptions, ExtPrecision, FpEnv, Rounding, Tininess};
use crate::nan::CommonNan;
use crate::prim::{shift_right_jam64, shift_right_jam64_extra};

mod convert;
mod ops;

pub(crate) const EXT_BIAS: i32 = 0x3FFF;
pub(crate) const EXT_EXP_INF: i32 = 0x7FFF;
const EXT_QUIET_BIT: u64 = 1 << 62;
const EXT_INT_BIT: u64 = 1 << 63;

bitfield! {
    /// Storage representation of the 80-bit double-extended format.
    #[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct ExtF80(pub u128): Debug, FromStorage, IntoStorage, DerefStorage {
        /// Trailing significand (below the integer bit)
        pub frac: u64 @ 0..=62,

        /// Explicit integer bit
        pub int_bit: bool @ 63,

        /// Full 64-bit significand including the integer bit
        pub sig: u64 @ 0..=63,

        /// Biased exponent
        pub exp: u16 @ 64..=78,

        /// Sign bit
        pub sign: bool @ 79,

        /// Combined sign and exponent halfword
        pub se: u16 @ 64..=79,
    }
}

impl ExtF80 {
    pub fn from_parts(se: u16, sig: u64) -> Self {
        Self::default().with_se(se).with_sig(sig)
    }

    pub(crate) fn pack(sign: bool, exp: i32, sig: u64) -> Self {
        Self::default()
            .with_sign(sign)
            .with_exp(exp as u16)
            .with_sig(sig)
    }

    pub fn zero(sign: bool) -> Self {
        Self::pack(sign, 0, 0)
    }

    pub fn infinity(sign: bool) -> Self {
        Self::pack(sign, EXT_EXP_INF, EXT_INT_BIT)
    }

    #[cfg(not(feature = "legacy-snan"))]
    pub fn default_nan() -> Self {
        Self::pack(true, EXT_EXP_INF, EXT_INT_BIT | EXT_QUIET_BIT)
    }

    #[cfg(feature = "legacy-snan")]
    pub fn default_nan() -> Self {
        Self::pack(false, EXT_EXP_INF, EXT_INT_BIT | (EXT_QUIET_BIT - 1))
    }

    pub fn is_nan(self) -> bool {
        self.exp() as i32 == EXT_EXP_INF && self.frac() != 0
    }

    #[cfg(not(feature = "legacy-snan"))]
    pub fn is_signaling_nan(self) -> bool {
        self.is_nan() && self.sig() & EXT_QUIET_BIT == 0
    }

    #[cfg(feature = "legacy-snan")]
    pub fn is_signaling_nan(self) -> bool {
        self.is_nan() && self.sig() & EXT_QUIET_BIT != 0
    }

    pub fn is_inf(self) -> bool {
        self.exp() as i32 == EXT_EXP_INF && self.frac() == 0
    }

    pub fn is_zero(self) -> bool {
        self.exp() == 0 && self.sig() == 0
    }

    pub fn is_subnormal(self) -> bool {
        self.exp() == 0 && self.sig() != 0
    }

    pub fn is_finite(self) -> bool {
        self.exp() as i32 != EXT_EXP_INF
    }

    pub fn negate(self) -> Self {
        self.with_sign(!self.sign())
    }

    pub fn abs(self) -> Self {
        self.with_sign(false)
    }

    #[cfg(not(feature = "legacy-snan"))]
    pub(crate) fn quieted(self) -> Self {
        self.with_sig(self.sig() | EXT_QUIET_BIT)
    }

    #[cfg(feature = "legacy-snan")]
    pub(crate) fn quieted(self) -> Self {
        let frac = self.sig() & !EXT_QUIET_BIT;
        if frac & (EXT_QUIET_BIT - 1) == 0 {
            self.with_sig(EXT_INT_BIT | (EXT_QUIET_BIT >> 1))
        } else {
            self.with_sig(frac)
        }
    }

}

impl CommonNan {
    pub(crate) fn from_ext(env: &mut FpEnv, a: ExtF80) -> Self {
        if a.is_signaling_nan() {
            env.raise_invalid();
        }
        Self {
            sign: a.sign(),
            // 62 payload bits below the quiet bit, left-aligned.
            payload: u128::from(a.sig() & (EXT_QUIET_BIT - 1)) << 66,
        }
    }

    pub(crate) fn to_ext(self) -> ExtF80 {
        let frac = (self.payload >> 66) as u64;
        ExtF80::pack(self.sign, EXT_EXP_INF, EXT_INT_BIT | frac).quieted()
    }
}

/// Combines the NaN operand(s) of a binary operation into the result NaN,
/// with the same selection rule as the interchange formats.
pub(crate) fn propagate(env: &mut FpEnv, a: ExtF80, b: ExtF80) -> ExtF80 {
    debug_assert!(a.is_nan() || b.is_nan());
    if a.is_signaling_nan() || b.is_signaling_nan() {
        env.raise_invalid();
    }
    match (a.is_nan(), b.is_nan()) {
        (true, false) => a.quieted(),
        (false, true) => b.quieted(),
        _ => {
            let mag_a = a.0 & !(1u128 << 79);
            let mag_b = b.0 & !(1u128 << 79);
            if mag_b > mag_a { b.quieted() } else { a.quieted() }
        }
    }
}

/// Normalizes a subnormal-coded significand; the returned exponent is on the
/// normal scale where the smallest normal has exponent 1.
pub(crate) fn norm_subnormal(sig: u64) -> (i32, u64) {
    debug_assert!(sig != 0);
    let shift_dist = sig.leading_zeros();
    (1 - shift_dist as i32, sig << shift_dist)
}

/// Whether rounding moves the magnitude up, judged on a full extra word.
fn round_up(rounding: Rounding, sign: bool, extra: u64) -> bool {
    match rounding {
        Rounding::NearEven | Rounding::NearMaxMag => extra & (1 << 63) != 0,
        Rounding::MinMag => false,
        Rounding::Min => sign && extra != 0,
        Rounding::Max => !sign && extra != 0,
        #[cfg(feature = "round-odd")]
        Rounding::Odd => false,
    }
}

fn overflow_to_inf(rounding: Rounding, sign: bool) -> bool {
    match rounding {
        Rounding::NearEven | Rounding::NearMaxMag => true,
        Rounding::MinMag => false,
        Rounding::Min => sign,
        Rounding::Max => !sign,
        #[cfg(feature = "round-odd")]
        Rounding::Odd => false,
    }
}

/// Rounds a (significand, extra) pair and packs an extended result, honoring
/// the environment's rounding precision control.
///
/// `exp` is the final biased exponent; finite results need the significand's
/// integer bit set and the exponent in `1..=0x7FFE` on entry, except when
/// falling into the subnormal range.
pub(crate) fn round_pack(
    env: &mut FpEnv,
    sign: bool,
    exp: i32,
    sig: u64,
    sig_extra: u64,
) -> ExtF80 {
    let (round_increment, round_mask) = match env.ext_precision {
        ExtPrecision::Extended => return round_pack_full(env, sign, exp, sig, sig_extra),
        ExtPrecision::Double => (0x400u64, 0x7FFu64),
        ExtPrecision::Single => (0x80_0000_0000u64, 0xFF_FFFF_FFFFu64),
    };
    round_pack_reduced(env, sign, exp, sig, sig_extra, round_increment, round_mask)
}

/// Full 64-bit precision: the rounding decision lives entirely in the extra
/// word.
fn round_pack_full(
    env: &mut FpEnv,
    sign: bool,
    mut exp: i32,
    mut sig: u64,
    mut sig_extra: u64,
) -> ExtF80 {
    let rounding = env.rounding;
    let inc = round_up(rounding, sign, sig_extra);

    if exp <= 0 || exp >= EXT_EXP_INF - 1 {
        if exp <= 0 {
            let is_tiny = env.tininess == Tininess::BeforeRounding
                || exp < 0
                || !inc
                || sig < u64::MAX;
            (sig, sig_extra) = shift_right_jam64_extra(sig, sig_extra, (1 - exp) as u32);
            if sig_extra != 0 {
                if is_tiny {
                    env.raise(Exceptions::UNDERFLOW);
                }
                env.raise(Exceptions::INEXACT);
                #[cfg(feature = "round-odd")]
                if rounding == Rounding::Odd {
                    return ExtF80::pack(sign, 0, sig | 1);
                }
            }
            if round_up(rounding, sign, sig_extra) {
                sig += 1;
                if rounding == Rounding::NearEven && sig_extra == 1 << 63 {
                    sig &= !1;
                }
            }
            // A round up to the integer bit lands on the smallest normal.
            let exp_z = i32::from(sig & EXT_INT_BIT != 0);
            return ExtF80::pack(sign, exp_z, sig);
        }
        if exp > EXT_EXP_INF - 1 || (sig == u64::MAX && inc) {
            env.raise(Exceptions::OVERFLOW.union(Exceptions::INEXACT));
            return if overflow_to_inf(rounding, sign) {
                ExtF80::infinity(sign)
            } else {
                ExtF80::pack(sign, EXT_EXP_INF - 1, u64::MAX)
            };
        }
    }

    if sig_extra != 0 {
        env.raise(Exceptions::INEXACT);
        #[cfg(feature = "round-odd")]
        if rounding == Rounding::Odd {
            return ExtF80::pack(sign, exp, sig | 1);
        }
    }
    if inc {
        let (new_sig, carry) = sig.overflowing_add(1);
        sig = new_sig;
        if carry {
            exp += 1;
            sig = EXT_INT_BIT;
        } else if rounding == Rounding::NearEven && sig_extra == 1 << 63 {
            sig &= !1;
        }
    }
    ExtF80::pack(sign, exp, sig)
}

/// Reduced (53- or 24-bit) precision: the extra word collapses to a sticky
/// bit and the rounding bits live in the low significand.
fn round_pack_reduced(
    env: &mut FpEnv,
    sign: bool,
    mut exp: i32,
    mut sig: u64,
    sig_extra: u64,
    round_increment: u64,
    round_mask: u64,
) -> ExtF80 {
    let rounding = env.rounding;
    sig |= u64::from(sig_extra != 0);
    let inc = match rounding {
        Rounding::NearEven | Rounding::NearMaxMag => round_increment,
        Rounding::MinMag => 0,
        Rounding::Min => {
            if sign {
                round_mask
            } else {
                0
            }
        }
        Rounding::Max => {
            if sign {
                0
            } else {
                round_mask
            }
        }
        #[cfg(feature = "round-odd")]
        Rounding::Odd => 0,
    };
    let mut round_bits = sig & round_mask;

    if exp <= 0 || exp >= EXT_EXP_INF - 1 {
        if exp <= 0 {
            let is_tiny = env.tininess == Tininess::BeforeRounding
                || exp < 0
                || !sig.overflowing_add(inc).1;
            sig = shift_right_jam64(sig, (1 - exp) as u32);
            round_bits = sig & round_mask;
            if round_bits != 0 {
                if is_tiny {
                    env.raise(Exceptions::UNDERFLOW);
                }
                env.raise(Exceptions::INEXACT);
                #[cfg(feature = "round-odd")]
                if rounding == Rounding::Odd {
                    return ExtF80::pack(sign, 0, (sig & !round_mask) | (round_mask + 1));
                }
            }
            sig += inc;
            let exp_z = i32::from(sig & EXT_INT_BIT != 0);
            if rounding == Rounding::NearEven && round_bits << 1 == round_mask + 1 {
                sig &= !(round_mask + 1);
            }
            return ExtF80::pack(sign, exp_z, sig & !round_mask);
        }
        if exp > EXT_EXP_INF - 1 || (exp == EXT_EXP_INF - 1 && sig.overflowing_add(inc).1) {
            env.raise(Exceptions::OVERFLOW.union(Exceptions::INEXACT));
            return if overflow_to_inf(rounding, sign) {
                ExtF80::infinity(sign)
            } else {
                ExtF80::pack(sign, EXT_EXP_INF - 1, !round_mask)
            };
        }
    }

    if round_bits != 0 {
        env.raise(Exceptions::INEXACT);
        #[cfg(feature = "round-odd")]
        if rounding == Rounding::Odd {
            return ExtF80::pack(sign, exp, (sig & !round_mask) | (round_mask + 1));
        }
    }
    let (new_sig, carry) = sig.overflowing_add(inc);
    sig = new_sig;
    if carry {
        exp += 1;
        sig = EXT_INT_BIT;
    } else if rounding == Rounding::NearEven && round_bits << 1 == round_mask + 1 {
        sig &= !(round_mask + 1);
    }
    ExtF80::pack(sign, exp, sig & !round_mask)
}

/// Normalizes an unnormalized (significand, extra) pair, then rounds and
/// packs.
pub(crate) fn norm_round_pack(
    env: &mut FpEnv,
    sign: bool,
    mut exp: i32,
    mut sig: u64,
    mut sig_extra: u64,
) -> ExtF80 {
    if sig == 0 {
        exp -= 64;
        sig = sig_extra;
        sig_extra = 0;
        if sig == 0 {
            return ExtF80::zero(env.rounding == Rounding::Min);
        }
    }
    let shift_dist = sig.leading_zeros();
    exp -= shift_dist as i32;
    if shift_dist != 0 {
        sig = (sig << shift_dist) | (sig_extra >> (64 - shift_dist));
        sig_extra <<= shift_dist;
    }
    round_pack(env, sign, exp, sig, sig_extra)
}
