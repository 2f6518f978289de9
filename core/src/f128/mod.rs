//! 128-bit quadruple-precision format.
//!
//! The layout follows the interchange mold (implicit integer bit, 15-bit
//! exponent) but the significand no longer fits a `u64` register, so every
//! arithmetic path here runs on the [`Sig128`] kernel instead. The rounding
//! register convention is the same as the narrow formats: seven extra bits
//! below the target precision, exponent one below the final field.

use proc_bitfield::bitfield;
use serde::{Deserialize, Serialize};

use crate::env::{Exceptions, FpEnv, Rounding, Tininess};
use crate::nan::CommonNan;
use crate::prim::{Sig128, Wide128};

mod convert;
mod ops;

pub(crate) const QUAD_BIAS: i32 = 0x3FFF;
pub(crate) const QUAD_EXP_INF: i32 = 0x7FFF;
pub(crate) const QUAD_SIG_BITS: u32 = 112;
/// Quiet bit within the 48-bit high fraction field
const QUAD_QUIET_BIT: u64 = 1 << 47;

const SIGN_MASK: u128 = 1 << 127;

bitfield! {
    /// Storage representation of the 128-bit quadruple-precision format.
    #[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct F128(pub u128): Debug, FromStorage, IntoStorage, DerefStorage {
        /// Low 64 bits of the trailing significand
        pub frac_lo: u64 @ 0..=63,

        /// High 48 bits of the trailing significand
        pub frac_hi: u64 @ 64..=111,

        /// Biased exponent
        pub exp: u16 @ 112..=126,

        /// Sign bit
        pub sign: bool @ 127,
    }
}

impl F128 {
    pub const fn from_bits(bits: u128) -> Self {
        Self(bits)
    }

    pub fn to_bits(self) -> u128 {
        self.0
    }

    /// Trailing significand as a kernel value
    pub(crate) fn frac(self) -> Sig128 {
        Sig128::from_halves(self.frac_hi(), self.frac_lo())
    }

    pub(crate) fn raw_exp(self) -> i32 {
        self.exp() as i32
    }

    /// Assembles sign, biased exponent and significand.
    ///
    /// Written as an addition so a significand carry out of the fraction
    /// field (the implicit bit, or a rounding carry) increments the exponent.
    pub(crate) fn pack_raw(sign: bool, exp: i32, sig: Sig128) -> u128 {
        (u128::from(sign) << 127)
            + ((exp as u128) << QUAD_SIG_BITS)
            + ((u128::from(sig.hi()) << 64) | u128::from(sig.lo()))
    }

    pub(crate) fn pack(sign: bool, exp: i32, sig: Sig128) -> Self {
        Self(Self::pack_raw(sign, exp, sig))
    }

    pub fn zero(sign: bool) -> Self {
        Self(u128::from(sign) << 127)
    }

    pub fn infinity(sign: bool) -> Self {
        Self((u128::from(sign) << 127) | ((QUAD_EXP_INF as u128) << QUAD_SIG_BITS))
    }

    #[cfg(not(feature = "legacy-snan"))]
    pub fn default_nan() -> Self {
        Self(SIGN_MASK | ((QUAD_EXP_INF as u128) << QUAD_SIG_BITS) | (1 << 111))
    }

    #[cfg(feature = "legacy-snan")]
    pub fn default_nan() -> Self {
        Self(((QUAD_EXP_INF as u128) << QUAD_SIG_BITS) | ((1 << 111) - 1))
    }

    pub fn is_nan(self) -> bool {
        self.raw_exp() == QUAD_EXP_INF && !self.frac().is_zero()
    }

    #[cfg(not(feature = "legacy-snan"))]
    pub fn is_signaling_nan(self) -> bool {
        self.is_nan() && self.frac_hi() & QUAD_QUIET_BIT == 0
    }

    #[cfg(feature = "legacy-snan")]
    pub fn is_signaling_nan(self) -> bool {
        self.is_nan() && self.frac_hi() & QUAD_QUIET_BIT != 0
    }

    pub fn is_inf(self) -> bool {
        self.raw_exp() == QUAD_EXP_INF && self.frac().is_zero()
    }

    pub fn is_zero(self) -> bool {
        self.0 & !SIGN_MASK == 0
    }

    pub fn is_subnormal(self) -> bool {
        self.raw_exp() == 0 && !self.frac().is_zero()
    }

    pub fn is_finite(self) -> bool {
        self.raw_exp() != QUAD_EXP_INF
    }

    pub fn negate(self) -> Self {
        Self(self.0 ^ SIGN_MASK)
    }

    pub fn abs(self) -> Self {
        Self(self.0 & !SIGN_MASK)
    }

    #[cfg(not(feature = "legacy-snan"))]
    pub(crate) fn quieted(self) -> Self {
        Self(self.0 | (u128::from(QUAD_QUIET_BIT) << 64))
    }

    #[cfg(feature = "legacy-snan")]
    pub(crate) fn quieted(self) -> Self {
        let cleared = self.0 & !(u128::from(QUAD_QUIET_BIT) << 64);
        if Self(cleared).frac().is_zero() {
            Self(cleared | (u128::from(QUAD_QUIET_BIT >> 1) << 64))
        } else {
            Self(cleared)
        }
    }
}

impl CommonNan {
    pub(crate) fn from_quad(env: &mut FpEnv, a: F128) -> Self {
        if a.is_signaling_nan() {
            env.raise_invalid();
        }
        let frac = ((a.0 >> 64) as u64 & (QUAD_QUIET_BIT - 1)) as u128;
        Self {
            sign: a.sign(),
            // 111 payload bits below the quiet bit, left-aligned.
            payload: ((frac << 64) | u128::from(a.frac_lo())) << 17,
        }
    }

    pub(crate) fn to_quad(self) -> F128 {
        let frac = self.payload >> 17;
        F128(
            (u128::from(self.sign) << 127) | ((QUAD_EXP_INF as u128) << QUAD_SIG_BITS) | frac,
        )
        .quieted()
    }
}

/// Combines the NaN operand(s) of a binary operation into the result NaN,
/// with the same selection rule as the narrow formats.
pub(crate) fn propagate(env: &mut FpEnv, a: F128, b: F128) -> F128 {
    debug_assert!(a.is_nan() || b.is_nan());
    if a.is_signaling_nan() || b.is_signaling_nan() {
        env.raise_invalid();
    }
    match (a.is_nan(), b.is_nan()) {
        (true, false) => a.quieted(),
        (false, true) => b.quieted(),
        _ => {
            let mag_a = a.0 & !SIGN_MASK;
            let mag_b = b.0 & !SIGN_MASK;
            if mag_b > mag_a { b.quieted() } else { a.quieted() }
        }
    }
}

/// Significand with the implicit integer bit (position 112) made explicit.
/// A no-op on already-normalized significands.
fn with_implicit(frac: Sig128) -> Sig128 {
    Sig128::from_halves(frac.hi() | (1 << 48), frac.lo())
}

/// Normalizes a subnormal trailing significand, implicit-bit position 112.
pub(crate) fn norm_subnormal(frac: Sig128) -> (i32, Sig128) {
    debug_assert!(!frac.is_zero());
    let shift_dist = frac.leading_zeros() as i32 - 15;
    (1 - shift_dist, frac.shl(shift_dist as u32))
}

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

/// Rounds a significand register with 7 extra bits and packs the result,
/// handling overflow, underflow and the subnormal range.
pub(crate) fn round_pack(env: &mut FpEnv, sign: bool, mut exp: i32, mut sig: Sig128) -> F128 {
    let rounding = env.rounding;
    let inc = Sig128::from_halves(0, round_increment(rounding, sign));
    let mut round_bits = sig.lo() & 0x7F;
    // A rounding carry out of the register tops out at this bit.
    let reg_limit = Sig128::from_halves(1 << 56, 0);

    if exp < 0 || exp >= QUAD_EXP_INF - 2 {
        if exp < 0 {
            let is_tiny = env.tininess == Tininess::BeforeRounding
                || exp < -1
                || sig.add(inc).cmp_mag(reg_limit).is_lt();
            sig = sig.shr_jam((-exp) as u32);
            exp = 0;
            round_bits = sig.lo() & 0x7F;
            if is_tiny && round_bits != 0 {
                env.raise(Exceptions::UNDERFLOW);
            }
        } else if exp > QUAD_EXP_INF - 2 || !sig.add(inc).cmp_mag(reg_limit).is_lt() {
            env.raise(Exceptions::OVERFLOW.union(Exceptions::INEXACT));
            // Directed modes that cannot round away from zero stop at the
            // largest finite value instead of infinity.
            return F128(
                F128::pack_raw(sign, QUAD_EXP_INF, Sig128::ZERO) - u128::from(inc.is_zero()),
            );
        }
    }

    sig = sig.add(inc).shr(7);
    if round_bits != 0 {
        env.raise(Exceptions::INEXACT);
        #[cfg(feature = "round-odd")]
        if rounding == Rounding::Odd {
            return F128::pack(sign, exp, sig.jam_bit(true));
        }
    }
    if round_bits == 0x40 && rounding == Rounding::NearEven {
        sig = Sig128::from_halves(sig.hi(), sig.lo() & !1);
    }
    if sig.is_zero() {
        exp = 0;
    }
    F128::pack(sign, exp, sig)
}

/// Normalizes an unnormalized significand register, then rounds and packs.
/// Exact results that need no rounding are packed directly.
pub(crate) fn norm_round_pack(env: &mut FpEnv, sign: bool, mut exp: i32, sig: Sig128) -> F128 {
    debug_assert!(!sig.is_zero());
    let shift_dist = sig.leading_zeros() as i32 - 8;
    exp -= shift_dist;
    if shift_dist >= 7 && (0..QUAD_EXP_INF - 2).contains(&exp) {
        F128::pack(sign, exp, sig.shl((shift_dist - 7) as u32))
    } else {
        debug_assert!(shift_dist >= 0);
        round_pack(env, sign, exp, sig.shl(shift_dist as u32))
    }
}

#[cfg(test)]
#[cfg(not(feature = "legacy-snan"))]
mod tests {
    use super::*;

    const ONE: u128 = (QUAD_BIAS as u128) << 112;

    #[test]
    fn field_access_and_classes() {
        let one = F128::from_bits(ONE);
        assert_eq!(one.exp(), 0x3FFF);
        assert!(one.frac().is_zero());
        assert!(!one.sign());
        assert!(one.is_finite() && !one.is_zero());

        let neg = one.negate();
        assert!(neg.sign());
        assert_eq!(neg.abs(), one);

        assert!(F128::zero(true).is_zero());
        assert!(F128::infinity(false).is_inf());
        assert!(F128::default_nan().is_nan());
        assert!(!F128::default_nan().is_signaling_nan());
        assert!(F128::from_bits(((0x7FFF_u128) << 112) | 1).is_signaling_nan());
        assert!(F128::from_bits(5).is_subnormal());
    }

    #[test]
    fn register_rounding_ties_to_even() {
        // 1.0 on the register: integer bit at 119, exponent one below.
        let reg_one = Sig128::from_halves(1 << 55, 0);

        let mut env = FpEnv::default();
        let z = round_pack(&mut env, false, 0x3FFE, reg_one);
        assert_eq!(z.to_bits(), ONE);
        assert!(env.flags.is_empty());

        // Halfway down to even
        let mut env = FpEnv::default();
        let z = round_pack(&mut env, false, 0x3FFE, reg_one.add(Sig128::from_halves(0, 0x40)));
        assert_eq!(z.to_bits(), ONE);
        assert!(env.flags.inexact());

        // One ulp up: the same tie now rounds upward to even.
        let mut env = FpEnv::default();
        let z = round_pack(
            &mut env,
            false,
            0x3FFE,
            reg_one.add(Sig128::from_halves(0, 0x80 | 0x40)),
        );
        assert_eq!(z.to_bits(), ONE | 2);
    }

    #[test]
    fn carry_out_of_all_ones_rolls_exponent() {
        let max_reg = Sig128::from_halves((1 << 56) - 1, u64::MAX);
        let mut env = FpEnv::default();
        let z = round_pack(&mut env, false, 0x3FFE, max_reg);
        assert_eq!(z.exp(), 0x4000);
        assert!(z.frac().is_zero());
        assert!(env.flags.inexact());
    }

    #[test]
    fn overflow_direction_depends_on_mode() {
        let max_reg = Sig128::from_halves((1 << 56) - 1, u64::MAX);
        let mut env = FpEnv::default();
        let z = round_pack(&mut env, false, 0x7FFD, max_reg);
        assert!(z.is_inf());
        assert!(env.flags.overflow() && env.flags.inexact());

        // Truncation keeps the result at the largest finite value, which is
        // in range: only inexact is raised.
        let mut env = FpEnv::new(Rounding::MinMag);
        let z = round_pack(&mut env, false, 0x7FFD, max_reg);
        assert_eq!(z.exp(), 0x7FFE);
        assert_eq!((z.frac_hi(), z.frac_lo()), (0xFFFF_FFFF_FFFF, u64::MAX));
        assert!(env.flags.inexact() && !env.flags.overflow());

        let mut env = FpEnv::new(Rounding::Min);
        assert!(round_pack(&mut env, true, 0x7FFD, max_reg).is_inf());
        let mut env = FpEnv::new(Rounding::Min);
        assert!(!round_pack(&mut env, false, 0x7FFD, max_reg).is_inf());
    }

    #[test]
    fn subnormal_underflow_flags() {
        let reg_one = Sig128::from_halves(1 << 55, 0);
        let mut env = FpEnv::default();
        let z = round_pack(&mut env, false, -1, reg_one.jam_bit(true));
        assert_eq!(z.exp(), 0);
        assert!(env.flags.underflow() && env.flags.inexact());

        // An exact subnormal raises nothing.
        let mut env = FpEnv::default();
        let z = round_pack(&mut env, false, -1, reg_one);
        assert_eq!(z.exp(), 0);
        assert_eq!(z.frac_hi(), 1 << 47);
        assert!(env.flags.is_empty());

        // A normalized register at exponent zero packs as the smallest
        // normal, the integer bit carrying into the exponent field.
        let mut env = FpEnv::default();
        let z = round_pack(&mut env, false, 0, reg_one);
        assert_eq!(z.exp(), 1);
        assert!(z.frac().is_zero());
        assert!(env.flags.is_empty());
    }

    #[test]
    fn norm_round_pack_exact_fast_path() {
        let mut env = FpEnv::default();
        // The integer 3, with the exponent origin integer conversion uses.
        let z = norm_round_pack(&mut env, false, QUAD_BIAS + 118, Sig128::from_halves(0, 3));
        assert_eq!(z.exp(), 0x4000);
        assert_eq!(z.frac_hi(), 1 << 47);
        assert_eq!(z.frac_lo(), 0);
        assert!(env.flags.is_empty());
    }

    #[test]
    fn nan_bridging_keeps_payload_top_bits() {
        let mut env = FpEnv::default();
        let nan = F128::from_bits(
            ((0x7FFF_u128) << 112) | (u128::from(QUAD_QUIET_BIT) << 64) | 0x1234,
        );
        let c = CommonNan::from_quad(&mut env, nan);
        assert!(env.flags.is_empty());
        assert_eq!(c.to_quad(), nan);

        // Only the top payload bits survive a narrowing to f32.
        let f = c.to_fp::<crate::repr::Binary32>();
        assert_eq!(f.to_bits(), 0x7FC0_0000);

        // A wide payload keeps its top bits across the bridge.
        let wide = F128::from_bits(
            ((0x7FFF_u128) << 112) | (u128::from(QUAD_QUIET_BIT | 0x1234) << 64),
        );
        let c = CommonNan::from_quad(&mut env, wide);
        assert_eq!(c.to_quad(), wide);
    }

    #[test]
    fn nan_propagation_prefers_larger_magnitude() {
        let mut env = FpEnv::default();
        let a = F128::from_bits(((0x7FFF_u128) << 112) | (u128::from(QUAD_QUIET_BIT) << 64) | 1);
        let b = F128::from_bits(
            SIGN_MASK | ((0x7FFF_u128) << 112) | (u128::from(QUAD_QUIET_BIT) << 64) | 2,
        );
        assert_eq!(propagate(&mut env, a, b), b);
        assert_eq!(propagate(&mut env, b, a), b);
        assert!(env.flags.is_empty());

        let snan = F128::from_bits(((0x7FFF_u128) << 112) | 1);
        let z = propagate(&mut env, snan, a);
        assert!(env.flags.invalid());
        assert!(!z.is_signaling_nan());
    }
}
