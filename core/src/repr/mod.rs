//! Binary interchange format descriptions and the encoded-value wrapper.
//!
//! The width-generic engine is written once against [`FloatFormat`] and
//! instantiated for binary16/32/64. The 80-bit extended and 128-bit formats
//! do not fit the single-word mold and have their own modules.

use std::fmt;
use std::marker::PhantomData;

use num_traits::PrimInt;
use serde::{Deserialize, Serialize};

/// Storage integer of an interchange format.
///
/// All significand arithmetic happens in `u64` registers; this trait only
/// moves bit patterns in and out of the format's natural width.
pub trait FpBits:
    PrimInt + Default + fmt::Debug + fmt::LowerHex + Serialize + serde::de::DeserializeOwned + 'static
{
    const BITS: u32;

    /// Truncating conversion from the working register.
    fn of_u64(v: u64) -> Self;

    /// Zero-extending conversion into the working register.
    fn widen(self) -> u64;
}

impl FpBits for u16 {
    const BITS: u32 = 16;

    fn of_u64(v: u64) -> Self {
        v as u16
    }

    fn widen(self) -> u64 {
        self.into()
    }
}

impl FpBits for u32 {
    const BITS: u32 = 32;

    fn of_u64(v: u64) -> Self {
        v as u32
    }

    fn widen(self) -> u64 {
        self.into()
    }
}

impl FpBits for u64 {
    const BITS: u32 = 64;

    fn of_u64(v: u64) -> Self {
        v
    }

    fn widen(self) -> u64 {
        self
    }
}

/// Static description of a single-word interchange format.
///
/// Only the field widths are given per format; everything else derives.
pub trait FloatFormat: Copy + Eq + fmt::Debug + 'static {
    type Bits: FpBits;

    const EXP_BITS: u32;
    const SIG_BITS: u32;
    const NAME: &'static str;

    const BITS: u32 = Self::EXP_BITS + Self::SIG_BITS + 1;
    /// All-ones biased exponent (infinities and NaNs)
    const EXP_INF: i32 = (1 << Self::EXP_BITS) - 1;
    const BIAS: i32 = (1 << (Self::EXP_BITS - 1)) - 1;
    /// Implicit integer bit position of a normalized significand
    const IMPLICIT_BIT: u64 = 1 << Self::SIG_BITS;
    /// MSB of the trailing significand field
    const QUIET_BIT: u64 = 1 << (Self::SIG_BITS - 1);
    const SIGN_BIT: u64 = 1 << (Self::BITS - 1);
    const FRAC_MASK: u64 = (1 << Self::SIG_BITS) - 1;
    /// Positive infinity bit pattern
    const INF_BITS: u64 = ((1 << Self::EXP_BITS) - 1) << Self::SIG_BITS;
}

/// IEEE 754 binary16 (half precision)
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Binary16;

impl FloatFormat for Binary16 {
    type Bits = u16;
    const EXP_BITS: u32 = 5;
    const SIG_BITS: u32 = 10;
    const NAME: &'static str = "f16";
}

/// IEEE 754 binary32 (single precision)
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Binary32;

impl FloatFormat for Binary32 {
    type Bits = u32;
    const EXP_BITS: u32 = 8;
    const SIG_BITS: u32 = 23;
    const NAME: &'static str = "f32";
}

/// IEEE 754 binary64 (double precision)
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Binary64;

impl FloatFormat for Binary64 {
    type Bits = u64;
    const EXP_BITS: u32 = 11;
    const SIG_BITS: u32 = 52;
    const NAME: &'static str = "f64";
}

/// An encoded floating-point value: an opaque bit pattern.
///
/// Equality is bitwise identity (`-0.0 != +0.0`, NaN payloads compare);
/// numerical comparison goes through the compare operations.
pub struct Fp<F: FloatFormat>(F::Bits, PhantomData<F>);

pub type F16 = Fp<Binary16>;
pub type F32 = Fp<Binary32>;
pub type F64 = Fp<Binary64>;

impl<F: FloatFormat> Clone for Fp<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: FloatFormat> Copy for Fp<F> {}

impl<F: FloatFormat> PartialEq for Fp<F> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<F: FloatFormat> Eq for Fp<F> {}

impl<F: FloatFormat> fmt::Debug for Fp<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({:#0width$x})",
            F::NAME,
            self.0,
            width = 2 + F::BITS as usize / 4
        )
    }
}

impl<F: FloatFormat> Serialize for Fp<F> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, F: FloatFormat> Deserialize<'de> for Fp<F> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        F::Bits::deserialize(deserializer).map(Self::from_bits)
    }
}

impl<F: FloatFormat> Fp<F> {
    pub const fn from_bits(bits: F::Bits) -> Self {
        Self(bits, PhantomData)
    }

    pub fn to_bits(self) -> F::Bits {
        self.0
    }

    /// Bit pattern zero-extended into the working register
    pub(crate) fn raw(self) -> u64 {
        self.0.widen()
    }

    pub(crate) fn from_raw(raw: u64) -> Self {
        Self::from_bits(F::Bits::of_u64(raw))
    }

    /// Assembles sign, biased exponent and significand field.
    ///
    /// Written as an addition so that a significand carry out of the field
    /// (from rounding) increments the exponent, and an all-ones carry out of
    /// the exponent produces infinity. Callers rely on this.
    pub(crate) fn pack_raw(sign: bool, exp: i32, sig: u64) -> u64 {
        (u64::from(sign) << (F::BITS - 1)) + ((exp as u64) << F::SIG_BITS) + sig
    }

    pub(crate) fn pack(sign: bool, exp: i32, sig: u64) -> Self {
        Self::from_raw(Self::pack_raw(sign, exp, sig))
    }

    pub fn sign(self) -> bool {
        (self.raw() & F::SIGN_BIT) != 0
    }

    /// Biased exponent field
    pub(crate) fn raw_exp(self) -> i32 {
        ((self.raw() >> F::SIG_BITS) as i32) & F::EXP_INF
    }

    /// Trailing significand field
    pub(crate) fn frac(self) -> u64 {
        self.raw() & F::FRAC_MASK
    }

    pub fn is_nan(self) -> bool {
        self.raw_exp() == F::EXP_INF && self.frac() != 0
    }

    #[cfg(not(feature = "legacy-snan"))]
    pub fn is_signaling_nan(self) -> bool {
        self.is_nan() && self.frac() & F::QUIET_BIT == 0
    }

    #[cfg(feature = "legacy-snan")]
    pub fn is_signaling_nan(self) -> bool {
        self.is_nan() && self.frac() & F::QUIET_BIT != 0
    }

    pub fn is_inf(self) -> bool {
        self.raw_exp() == F::EXP_INF && self.frac() == 0
    }

    pub fn is_zero(self) -> bool {
        self.raw() & !F::SIGN_BIT == 0
    }

    pub fn is_subnormal(self) -> bool {
        self.raw_exp() == 0 && self.frac() != 0
    }

    pub fn is_finite(self) -> bool {
        self.raw_exp() != F::EXP_INF
    }

    pub fn zero(sign: bool) -> Self {
        Self::from_raw(u64::from(sign) << (F::BITS - 1))
    }

    pub fn infinity(sign: bool) -> Self {
        Self::from_raw((u64::from(sign) << (F::BITS - 1)) | F::INF_BITS)
    }

    /// The canonical NaN produced when no operand payload survives
    #[cfg(not(feature = "legacy-snan"))]
    pub fn default_nan() -> Self {
        Self::from_raw(F::SIGN_BIT | F::INF_BITS | F::QUIET_BIT)
    }

    /// The canonical NaN produced when no operand payload survives
    #[cfg(feature = "legacy-snan")]
    pub fn default_nan() -> Self {
        Self::from_raw(F::INF_BITS | (F::QUIET_BIT - 1))
    }

    pub fn negate(self) -> Self {
        Self::from_raw(self.raw() ^ F::SIGN_BIT)
    }

    pub fn abs(self) -> Self {
        Self::from_raw(self.raw() & !F::SIGN_BIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_constants() {
        assert_eq!(Binary32::BIAS, 127);
        assert_eq!(Binary32::EXP_INF, 255);
        assert_eq!(Binary64::IMPLICIT_BIT, 1 << 52);
        assert_eq!(Binary16::SIGN_BIT, 0x8000);
        assert_eq!(Binary32::INF_BITS, 0x7F80_0000);
    }

    #[test]
    fn classification() {
        assert!(F32::from_bits(0x7FC0_0000).is_nan());
        assert!(!F32::from_bits(0x7FC0_0000).is_signaling_nan());
        assert!(F32::from_bits(0x7F80_0001).is_signaling_nan());
        assert!(F32::from_bits(0x7F80_0000).is_inf());
        assert!(F32::from_bits(0x8000_0000).is_zero());
        assert!(F32::from_bits(0x8000_0000).sign());
        assert!(F32::from_bits(0x0000_0001).is_subnormal());
        assert!(F64::from_bits(0x3FF0_0000_0000_0000).is_finite());
    }

    #[test]
    fn pack_carry_propagates_into_exponent() {
        // Significand all ones plus a rounding carry rolls the exponent.
        let z = F32::pack(false, 0x7E, 0x0080_0000);
        assert_eq!(z.to_bits(), 0x3F80_0000);
    }

    #[test]
    fn host_agreement_on_encodings() {
        assert_eq!(F32::pack(false, 127, 0).to_bits(), 1.0f32.to_bits());
        assert_eq!(F64::pack(true, 1024, 0).to_bits(), (-2.0f64).to_bits());
        assert_eq!(F32::infinity(true).to_bits(), f32::NEG_INFINITY.to_bits());
    }

    #[cfg(not(feature = "legacy-snan"))]
    #[test]
    fn default_nan_patterns() {
        assert_eq!(F16::default_nan().to_bits(), 0xFE00);
        assert_eq!(F32::default_nan().to_bits(), 0xFFC0_0000);
        assert_eq!(F64::default_nan().to_bits(), 0xFFF8_0000_0000_0000);
    }
}
