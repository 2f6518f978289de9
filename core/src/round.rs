//! Round-and-pack: the single funnel through which every inexact result
//! passes.
//!
//! Significands arrive here carrying 7 extra bits below the target
//! precision; the exponent convention is one below the final biased field so
//! that the pack addition absorbs the integer bit (and a rounding carry out
//! of an all-ones significand rolls the exponent by itself).

use crate::env::{Exceptions, FpEnv, Rounding, Tininess};
use crate::prim::shift_right_jam64;
use crate::repr::{FloatFormat, Fp};

/// Saturation results for invalid integer conversions
pub(crate) const I32_POS_OVERFLOW: i32 = i32::MAX;
pub(crate) const I32_NEG_OVERFLOW: i32 = i32::MIN;
pub(crate) const I64_POS_OVERFLOW: i64 = i64::MAX;
pub(crate) const I64_NEG_OVERFLOW: i64 = i64::MIN;
pub(crate) const U32_POS_OVERFLOW: u32 = u32::MAX;
pub(crate) const U32_NEG_OVERFLOW: u32 = 0;
pub(crate) const U64_POS_OVERFLOW: u64 = u64::MAX;
pub(crate) const U64_NEG_OVERFLOW: u64 = 0;

/// Value added below the kept bits before truncation. 0x40 is the halfway
/// point of the 7 discarded bits; directed modes add all-ones or nothing.
fn round_increment(rounding: Rounding, sign: bool) -> u64 {
    match rounding {
        Rounding::NearEven | Rounding::NearMaxMag => 0x40,
        Rounding::MinMag => 0,
        Rounding::Min => {
            if sign {
                0x7F
            } else {
                0
            }
        }
        Rounding::Max => {
            if sign {
                0
            } else {
                0x7F
            }
        }
        #[cfg(feature = "round-odd")]
        Rounding::Odd => 0,
    }
}

/// Rounds a significand with 7 extra bits and packs the result, handling
/// overflow, underflow and the subnormal range.
pub(crate) fn round_pack<F: FloatFormat>(
    env: &mut FpEnv,
    sign: bool,
    mut exp: i32,
    mut sig: u64,
) -> Fp<F> {
    let rounding = env.rounding;
    let round_increment = round_increment(rounding, sign);
    let mut round_bits = sig & 0x7F;

    if exp < 0 || exp >= F::EXP_INF - 2 {
        if exp < 0 {
            let is_tiny = env.tininess == Tininess::BeforeRounding
                || exp < -1
                || sig + round_increment < (1 << (F::SIG_BITS + 8));
            sig = shift_right_jam64(sig, (-exp) as u32);
            exp = 0;
            round_bits = sig & 0x7F;
            if is_tiny && round_bits != 0 {
                env.raise(Exceptions::UNDERFLOW);
            }
        } else if exp > F::EXP_INF - 2 || sig + round_increment >= (1 << (F::SIG_BITS + 8)) {
            env.raise(Exceptions::OVERFLOW.union(Exceptions::INEXACT));
            // Directed modes that cannot round away from zero stop at the
            // largest finite value instead of infinity.
            return Fp::from_raw(
                Fp::<F>::pack_raw(sign, F::EXP_INF, 0) - u64::from(round_increment == 0),
            );
        }
    }

    sig = (sig + round_increment) >> 7;
    if round_bits != 0 {
        env.raise(Exceptions::INEXACT);
        #[cfg(feature = "round-odd")]
        if rounding == Rounding::Odd {
            return Fp::pack(sign, exp, sig | 1);
        }
    }
    if round_bits == 0x40 && rounding == Rounding::NearEven {
        sig &= !1;
    }
    if sig == 0 {
        exp = 0;
    }
    Fp::pack(sign, exp, sig)
}

/// Normalizes an unnormalized significand, then rounds and packs.
///
/// Exact results that need no rounding (the significand fits with room to
/// spare) are packed directly.
pub(crate) fn norm_round_pack<F: FloatFormat>(
    env: &mut FpEnv,
    sign: bool,
    mut exp: i32,
    sig: u64,
) -> Fp<F> {
    debug_assert!(sig != 0);
    let shift_dist = sig.leading_zeros() as i32 - (56 - F::SIG_BITS as i32);
    exp -= shift_dist;
    if shift_dist >= 7 && (0..F::EXP_INF - 2).contains(&exp) {
        Fp::pack(sign, exp, sig << (shift_dist - 7))
    } else {
        debug_assert!(shift_dist >= 0);
        round_pack(env, sign, exp, sig << shift_dist)
    }
}

/// Rounds a 52.12 fixed-point magnitude to `i32`.
pub(crate) fn round_to_i32(env: &mut FpEnv, sign: bool, mut sig: u64, exact: bool) -> i32 {
    let rounding = env.rounding;
    let round_increment: u64 = match rounding {
        Rounding::NearEven | Rounding::NearMaxMag => 0x800,
        Rounding::MinMag => 0,
        Rounding::Min => {
            if sign {
                0xFFF
            } else {
                0
            }
        }
        Rounding::Max => {
            if sign {
                0
            } else {
                0xFFF
            }
        }
        #[cfg(feature = "round-odd")]
        Rounding::Odd => 0,
    };
    let round_bits = sig & 0xFFF;
    sig += round_increment;
    if sig & 0xFFFF_F000_0000_0000 != 0 {
        env.raise_invalid();
        return if sign { I32_NEG_OVERFLOW } else { I32_POS_OVERFLOW };
    }
    let mut sig32 = (sig >> 12) as u32;
    if round_bits == 0x800 && rounding == Rounding::NearEven {
        sig32 &= !1;
    }
    let z = if sign {
        (sig32 as i32).wrapping_neg()
    } else {
        sig32 as i32
    };
    if z != 0 && (z < 0) != sign {
        env.raise_invalid();
        return if sign { I32_NEG_OVERFLOW } else { I32_POS_OVERFLOW };
    }
    if round_bits != 0 {
        #[cfg(feature = "round-odd")]
        if rounding == Rounding::Odd {
            if exact {
                env.raise_inexact();
            }
            return z | 1;
        }
        if exact {
            env.raise_inexact();
        }
    }
    z
}

/// Rounds a 52.12 fixed-point magnitude to `u32`.
pub(crate) fn round_to_u32(env: &mut FpEnv, sign: bool, mut sig: u64, exact: bool) -> u32 {
    let rounding = env.rounding;
    let round_increment: u64 = match rounding {
        Rounding::NearEven | Rounding::NearMaxMag => 0x800,
        Rounding::MinMag => 0,
        Rounding::Min => {
            if sign {
                0xFFF
            } else {
                0
            }
        }
        Rounding::Max => {
            if sign {
                0
            } else {
                0xFFF
            }
        }
        #[cfg(feature = "round-odd")]
        Rounding::Odd => 0,
    };
    let round_bits = sig & 0xFFF;
    sig += round_increment;
    if sig & 0xFFFF_F000_0000_0000 != 0 {
        env.raise_invalid();
        return if sign { U32_NEG_OVERFLOW } else { U32_POS_OVERFLOW };
    }
    let mut z = (sig >> 12) as u32;
    if round_bits == 0x800 && rounding == Rounding::NearEven {
        z &= !1;
    }
    if sign && z != 0 {
        env.raise_invalid();
        return U32_NEG_OVERFLOW;
    }
    if round_bits != 0 {
        #[cfg(feature = "round-odd")]
        if rounding == Rounding::Odd {
            if exact {
                env.raise_inexact();
            }
            return z | 1;
        }
        if exact {
            env.raise_inexact();
        }
    }
    z
}

/// Rounds a 64-bit magnitude with 64 extra fraction bits to `i64`.
pub(crate) fn round_to_i64(
    env: &mut FpEnv,
    sign: bool,
    mut sig: u64,
    sig_extra: u64,
    exact: bool,
) -> i64 {
    let rounding = env.rounding;
    let round_up = match rounding {
        Rounding::NearEven | Rounding::NearMaxMag => sig_extra >= 0x8000_0000_0000_0000,
        Rounding::MinMag => false,
        Rounding::Min => sign && sig_extra != 0,
        Rounding::Max => !sign && sig_extra != 0,
        #[cfg(feature = "round-odd")]
        Rounding::Odd => false,
    };
    if round_up {
        let (incremented, carry) = sig.overflowing_add(1);
        if carry {
            env.raise_invalid();
            return if sign { I64_NEG_OVERFLOW } else { I64_POS_OVERFLOW };
        }
        sig = incremented;
        if sig_extra == 0x8000_0000_0000_0000 && rounding == Rounding::NearEven {
            sig &= !1;
        }
    }
    let z = if sign {
        (sig as i64).wrapping_neg()
    } else {
        sig as i64
    };
    if z != 0 && (z < 0) != sign {
        env.raise_invalid();
        return if sign { I64_NEG_OVERFLOW } else { I64_POS_OVERFLOW };
    }
    if sig_extra != 0 {
        #[cfg(feature = "round-odd")]
        if rounding == Rounding::Odd {
            if exact {
                env.raise_inexact();
            }
            return z | 1;
        }
        if exact {
            env.raise_inexact();
        }
    }
    z
}

/// Rounds a 64-bit magnitude with 64 extra fraction bits to `u64`.
pub(crate) fn round_to_u64(
    env: &mut FpEnv,
    sign: bool,
    mut sig: u64,
    sig_extra: u64,
    exact: bool,
) -> u64 {
    let rounding = env.rounding;
    let round_up = match rounding {
        Rounding::NearEven | Rounding::NearMaxMag => sig_extra >= 0x8000_0000_0000_0000,
        Rounding::MinMag => false,
        Rounding::Min => sign && sig_extra != 0,
        Rounding::Max => !sign && sig_extra != 0,
        #[cfg(feature = "round-odd")]
        Rounding::Odd => false,
    };
    if round_up {
        let (incremented, carry) = sig.overflowing_add(1);
        if carry {
            env.raise_invalid();
            return if sign { U64_NEG_OVERFLOW } else { U64_POS_OVERFLOW };
        }
        sig = incremented;
        if sig_extra == 0x8000_0000_0000_0000 && rounding == Rounding::NearEven {
            sig &= !1;
        }
    }
    if sign && sig != 0 {
        env.raise_invalid();
        return U64_NEG_OVERFLOW;
    }
    let mut z = sig;
    if sig_extra != 0 {
        #[cfg(feature = "round-odd")]
        if rounding == Rounding::Odd {
            z |= 1;
        }
        if exact {
            env.raise_inexact();
        }
    }
    z
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::Binary32;

    fn env_with(rounding: Rounding) -> FpEnv {
        FpEnv::new(rounding)
    }

    #[test]
    fn exact_result_raises_nothing() {
        let mut env = FpEnv::default();
        // 1.0: exponent one below the field, integer bit at SIG_BITS + 7.
        let z = round_pack::<Binary32>(&mut env, false, 0x7E, 1 << 30);
        assert_eq!(z.to_bits(), 0x3F80_0000);
        assert!(env.flags.is_empty());
    }

    #[test]
    fn nearest_even_breaks_tie_to_even_lsb() {
        // Halfway between 1.0 and the next value up: jam at exactly 0x40.
        let mut env = FpEnv::default();
        let z = round_pack::<Binary32>(&mut env, false, 0x7E, (1 << 30) | 0x40);
        assert_eq!(z.to_bits(), 0x3F80_0000);
        assert!(env.flags.inexact());
        // One LSB up: halfway now rounds to even, upward.
        let mut env = FpEnv::default();
        let z = round_pack::<Binary32>(&mut env, false, 0x7E, (1 << 30) | 0x80 | 0x40);
        assert_eq!(z.to_bits(), 0x3F80_0002);
    }

    #[test]
    fn directed_overflow_stops_at_largest_finite() {
        let max_sig = ((1 << 24) - 1) << 7 | 0x7F;
        // Modes that round this magnitude up leave the finite range.
        for (rounding, sign) in [
            (Rounding::NearEven, false),
            (Rounding::NearMaxMag, true),
            (Rounding::Max, false),
            (Rounding::Min, true),
        ] {
            let mut env = env_with(rounding);
            let z = round_pack::<Binary32>(&mut env, sign, 0xFD, max_sig);
            assert!(z.is_inf(), "{rounding:?} sign={sign}");
            assert_eq!(z.sign(), sign);
            assert!(env.flags.overflow() && env.flags.inexact());
        }
        // Modes that round toward zero stop at the largest finite value,
        // with no overflow since the unbounded rounding is representable.
        for (rounding, sign, expect) in [
            (Rounding::MinMag, false, 0x7F7F_FFFF_u32),
            (Rounding::Min, false, 0x7F7F_FFFF),
            (Rounding::Max, true, 0xFF7F_FFFF),
        ] {
            let mut env = env_with(rounding);
            let z = round_pack::<Binary32>(&mut env, sign, 0xFD, max_sig);
            assert_eq!(z.to_bits(), expect, "{rounding:?} sign={sign}");
            assert!(env.flags.inexact() && !env.flags.overflow());
        }
    }

    #[test]
    fn subnormal_underflow_flags() {
        // Tiny and inexact: underflow and inexact both raised.
        let mut env = FpEnv::default();
        let z = round_pack::<Binary32>(&mut env, false, -1, (1 << 30) | 1);
        assert!(env.flags.underflow() && env.flags.inexact());
        assert_eq!(z.to_bits(), 0x0040_0000);
    }

    #[cfg(feature = "round-odd")]
    #[test]
    fn round_odd_jams_lsb() {
        let mut env = env_with(Rounding::Odd);
        let z = round_pack::<Binary32>(&mut env, false, 0x7E, (1 << 30) | 1);
        assert_eq!(z.to_bits(), 0x3F80_0001);
        assert!(env.flags.inexact());
        // Exact results stay untouched.
        let mut env = env_with(Rounding::Odd);
        let z = round_pack::<Binary32>(&mut env, false, 0x7E, 1 << 30);
        assert_eq!(z.to_bits(), 0x3F80_0000);
        assert!(env.flags.is_empty());
    }

    #[test]
    fn norm_round_pack_exact_fast_path() {
        let mut env = FpEnv::default();
        // The integer 3, with the exponent origin integer conversion uses.
        let z = norm_round_pack::<Binary32>(&mut env, false, 0x9C, 3);
        assert_eq!(z.to_bits(), 0x4040_0000);
        assert!(env.flags.is_empty());
    }

    #[test]
    fn to_i32_saturates_and_raises_invalid() {
        let mut env = FpEnv::default();
        let z = round_to_i32(&mut env, false, (1_u64 << 31) << 12, true);
        assert_eq!(z, i32::MAX);
        assert!(env.flags.invalid());

        let mut env = FpEnv::default();
        let z = round_to_i32(&mut env, true, (1_u64 << 31) << 12, true);
        assert_eq!(z, i32::MIN);
        assert!(!env.flags.invalid());
    }

    #[test]
    fn to_u32_rejects_negative() {
        let mut env = FpEnv::default();
        assert_eq!(round_to_u32(&mut env, true, 1 << 12, true), 0);
        assert!(env.flags.invalid());
        // -0 is fine.
        let mut env = FpEnv::default();
        assert_eq!(round_to_u32(&mut env, true, 0, true), 0);
        assert!(env.flags.is_empty());
    }

    #[test]
    fn to_i64_ties_to_even() {
        let mut env = FpEnv::default();
        assert_eq!(round_to_i64(&mut env, false, 5, 1 << 63, true), 6);
        let mut env = FpEnv::default();
        assert_eq!(round_to_i64(&mut env, false, 6, 1 << 63, true), 6);
        assert!(env.flags.inexact());
    }

    #[test]
    fn inexact_suppressed_when_not_exact_mode() {
        let mut env = FpEnv::default();
        let z = round_to_i32(&mut env, false, (3 << 12) | 1, false);
        assert_eq!(z, 3);
        assert!(env.flags.is_empty());
    }
}
