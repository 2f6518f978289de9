//! Arithmetic environment: rounding controls and sticky exception flags.

use std::cell::RefCell;

use log::*;
use proc_bitfield::bitfield;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error for reserved control-field encodings
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EnvError {
    /// Bit pattern with no assigned rounding mode
    #[error("Reserved rounding mode encoding: {0}")]
    ReservedRoundingMode(u8),

    /// Bit pattern with no assigned rounding precision
    #[error("Reserved rounding precision encoding: {0}")]
    ReservedPrecision(u8),
}

/// IEEE 754 rounding attribute
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
    strum::EnumIter, strum::IntoStaticStr,
)]
pub enum Rounding {
    /// To nearest, ties to even
    #[default]
    NearEven,

    /// Toward zero
    MinMag,

    /// Toward negative infinity
    Min,

    /// Toward positive infinity
    Max,

    /// To nearest, ties away from zero
    NearMaxMag,

    /// To odd (jamming); used for stacked intermediate roundings
    #[cfg(feature = "round-odd")]
    Odd,
}

impl TryFrom<u8> for Rounding {
    type Error = EnvError;

    /// Decodes the 3-bit mode field used by the serialized environment word.
    fn try_from(value: u8) -> Result<Self, EnvError> {
        match value {
            0 => Ok(Self::NearEven),
            1 => Ok(Self::MinMag),
            2 => Ok(Self::Min),
            3 => Ok(Self::Max),
            4 => Ok(Self::NearMaxMag),
            #[cfg(feature = "round-odd")]
            6 => Ok(Self::Odd),
            _ => Err(EnvError::ReservedRoundingMode(value)),
        }
    }
}

/// When underflow tininess is detected, relative to rounding
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
    strum::EnumIter, strum::IntoStaticStr,
)]
pub enum Tininess {
    /// On the infinitely precise result (before rounding)
    BeforeRounding,

    /// On the result rounded as if the exponent range were unbounded
    #[default]
    AfterRounding,
}

/// Rounding precision control for 80-bit extended results
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
    strum::EnumIter, strum::IntoStaticStr,
)]
pub enum ExtPrecision {
    /// Full 64-bit significand
    #[default]
    Extended,

    /// Round to 53 significand bits, in extended range
    Double,

    /// Round to 24 significand bits, in extended range
    Single,
}

impl TryFrom<u8> for ExtPrecision {
    type Error = EnvError;

    fn try_from(value: u8) -> Result<Self, EnvError> {
        match value {
            0 => Ok(Self::Single),
            2 => Ok(Self::Double),
            3 => Ok(Self::Extended),
            _ => Err(EnvError::ReservedPrecision(value)),
        }
    }
}

bitfield! {
    /// Sticky exception flag byte
    ///
    /// Operations only ever OR flags in. Clearing is the caller's business.
    #[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct Exceptions(pub u8): Debug, FromStorage, IntoStorage, DerefStorage {
        /// Inexact result
        pub inexact: bool @ 0,

        /// Underflow (tiny and inexact)
        pub underflow: bool @ 1,

        /// Overflow
        pub overflow: bool @ 2,

        /// Division of a finite nonzero value by zero
        pub infinite: bool @ 3,

        /// Invalid operation
        pub invalid: bool @ 4,
    }
}

impl Exceptions {
    pub const INEXACT: Self = Self(1 << 0);
    pub const UNDERFLOW: Self = Self(1 << 1);
    pub const OVERFLOW: Self = Self(1 << 2);
    pub const INFINITE: Self = Self(1 << 3);
    pub const INVALID: Self = Self(1 << 4);

    /// True if no flag is set
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Union of two flag sets
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Complete arithmetic environment threaded through every operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FpEnv {
    /// Rounding attribute for the next operation
    pub rounding: Rounding,

    /// Underflow tininess detection policy
    pub tininess: Tininess,

    /// 80-bit extended rounding precision control
    pub ext_precision: ExtPrecision,

    /// Accumulated sticky exception flags
    pub flags: Exceptions,
}

impl FpEnv {
    pub fn new(rounding: Rounding) -> Self {
        Self {
            rounding,
            ..Default::default()
        }
    }

    /// ORs flags into the sticky set. Never clears anything.
    pub fn raise(&mut self, flags: Exceptions) {
        if !flags.is_empty() {
            trace!("raise {:?}", flags);
            self.flags = self.flags.union(flags);
        }
    }

    pub fn raise_invalid(&mut self) {
        self.raise(Exceptions::INVALID);
    }

    pub fn raise_inexact(&mut self) {
        self.raise(Exceptions::INEXACT);
    }
}

thread_local! {
    static AMBIENT: RefCell<FpEnv> = RefCell::new(FpEnv::default());
}

/// Runs `f` against the thread's ambient environment.
///
/// The ambient environment backs the convenience wrappers on the public
/// types; code that needs precise control constructs its own [`FpEnv`] and
/// passes it explicitly instead.
pub fn with_ambient<R>(f: impl FnOnce(&mut FpEnv) -> R) -> R {
    AMBIENT.with(|env| f(&mut env.borrow_mut()))
}

/// Replaces the thread's ambient environment, returning the previous one.
pub fn swap_ambient(new: FpEnv) -> FpEnv {
    AMBIENT.with(|env| env.replace(new))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_sticky() {
        let mut env = FpEnv::default();
        env.raise(Exceptions::INEXACT);
        env.raise(Exceptions::UNDERFLOW);
        env.raise(Exceptions::default());
        assert!(env.flags.inexact());
        assert!(env.flags.underflow());
        assert!(!env.flags.overflow());
        assert_eq!(env.flags, Exceptions(0b11));
    }

    #[test]
    fn rounding_decode_rejects_reserved() {
        assert_eq!(Rounding::try_from(2), Ok(Rounding::Min));
        assert_eq!(
            Rounding::try_from(7),
            Err(EnvError::ReservedRoundingMode(7))
        );
    }

    #[test]
    fn precision_decode() {
        assert_eq!(ExtPrecision::try_from(3), Ok(ExtPrecision::Extended));
        assert_eq!(ExtPrecision::try_from(1), Err(EnvError::ReservedPrecision(1)));
    }

    #[test]
    fn ambient_is_per_thread() {
        swap_ambient(FpEnv::default());
        with_ambient(|env| env.raise(Exceptions::INVALID));
        let seen = with_ambient(|env| env.flags);
        assert!(seen.invalid());
        let other = std::thread::spawn(|| with_ambient(|env| env.flags))
            .join()
            .unwrap();
        assert!(other.is_empty());
    }
}
