use std::cmp::Ordering;
use std::fmt;

/// The 128-bit unsigned kernel every 128-bit-significand code path is
/// written against. Two implementations exist: [`NativeWide128`], backed by
/// `u128`, and [`super::WordWide128`], backed by 32-bit words for targets
/// without efficient 64-bit arithmetic. The build selects one as
/// [`super::Sig128`]; both must behave identically on the same logical value.
pub trait Wide128: Copy + Eq + fmt::Debug {
    const ZERO: Self;
    const ONE: Self;

    fn from_halves(hi: u64, lo: u64) -> Self;
    fn hi(self) -> u64;
    fn lo(self) -> u64;

    /// Addition modulo 2^128, carry discarded.
    fn add(self, rhs: Self) -> Self;
    /// Subtraction modulo 2^128, borrow discarded.
    fn sub(self, rhs: Self) -> Self;
    fn cmp_mag(self, rhs: Self) -> Ordering;

    /// Left shift; `dist` must be < 128.
    fn shl(self, dist: u32) -> Self;
    /// Right shift; `dist` must be < 128.
    fn shr(self, dist: u32) -> Self;
    /// Right shift with sticky jam; total for any `dist`.
    fn shr_jam(self, dist: u32) -> Self;

    fn leading_zeros(self) -> u32;

    /// Widening 64x64 -> 128 multiply.
    fn mul_64(a: u64, b: u64) -> Self;
    /// Widening 128x128 -> 256 multiply, as a (hi, lo) pair.
    fn widening_mul(self, rhs: Self) -> (Self, Self);

    #[inline]
    fn is_zero(self) -> bool {
        self == Self::ZERO
    }

    /// OR a sticky bit into the bottom.
    #[inline]
    fn jam_bit(self, sticky: bool) -> Self {
        if sticky {
            Self::from_halves(self.hi(), self.lo() | 1)
        } else {
            self
        }
    }

    #[inline]
    fn bit(self, pos: u32) -> bool {
        debug_assert!(pos < 128);
        if pos < 64 {
            self.lo() >> pos & 1 != 0
        } else {
            self.hi() >> (pos - 64) & 1 != 0
        }
    }
}

/// `u128`-backed kernel, the default on every target Rust supports well.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct NativeWide128(pub u128);

impl NativeWide128 {
    #[inline]
    pub const fn new(v: u128) -> Self {
        Self(v)
    }
}

impl Wide128 for NativeWide128 {
    const ZERO: Self = Self(0);
    const ONE: Self = Self(1);

    #[inline]
    fn from_halves(hi: u64, lo: u64) -> Self {
        Self((u128::from(hi) << 64) | u128::from(lo))
    }

    #[inline]
    fn hi(self) -> u64 {
        (self.0 >> 64) as u64
    }

    #[inline]
    fn lo(self) -> u64 {
        self.0 as u64
    }

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }

    #[inline]
    fn cmp_mag(self, rhs: Self) -> Ordering {
        self.0.cmp(&rhs.0)
    }

    #[inline]
    fn shl(self, dist: u32) -> Self {
        Self(self.0 << dist)
    }

    #[inline]
    fn shr(self, dist: u32) -> Self {
        Self(self.0 >> dist)
    }

    fn shr_jam(self, dist: u32) -> Self {
        if dist == 0 {
            self
        } else if dist < 127 {
            Self((self.0 >> dist) | u128::from(self.0 << (128 - dist) != 0))
        } else {
            Self(u128::from(self.0 != 0))
        }
    }

    #[inline]
    fn leading_zeros(self) -> u32 {
        self.0.leading_zeros()
    }

    #[inline]
    fn mul_64(a: u64, b: u64) -> Self {
        Self(u128::from(a) * u128::from(b))
    }

    fn widening_mul(self, rhs: Self) -> (Self, Self) {
        let (ah, al) = (self.hi() as u128, self.lo() as u128);
        let (bh, bl) = (rhs.hi() as u128, rhs.lo() as u128);

        let ll = al * bl;
        let lh = al * bh;
        let hl = ah * bl;
        let hh = ah * bh;

        let (mid, mid_carry) = lh.overflowing_add(hl);
        let (lo, lo_carry) = ll.overflowing_add(mid << 64);
        let hi = hh
            .wrapping_add(mid >> 64)
            .wrapping_add(u128::from(mid_carry) << 64)
            .wrapping_add(u128::from(lo_carry));
        (Self(hi), Self(lo))
    }
}
