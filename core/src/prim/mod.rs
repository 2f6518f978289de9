//! Fixed-width integer primitives underlying every arithmetic path.
//!
//! The "jam" family of shifts collapses any bits shifted off the bottom into
//! the least significant retained bit, preserving "was anything lost" for the
//! rounding logic downstream.

pub mod wide;
pub mod words;

pub use wide::{NativeWide128, Wide128};
pub use words::WordWide128;

/// The 128-bit significand kernel selected at build time.
#[cfg(not(feature = "portable"))]
pub type Sig128 = NativeWide128;

/// The 128-bit significand kernel selected at build time.
#[cfg(feature = "portable")]
pub type Sig128 = WordWide128;

/// Right shift with sticky jam. Total for any `dist`; a shift of the full
/// width or more collapses to 0 or 1 depending on whether any bit was set.
#[inline]
pub fn shift_right_jam32(v: u32, dist: u32) -> u32 {
    if dist == 0 {
        v
    } else if dist < 31 {
        (v >> dist) | u32::from(v << (32 - dist) != 0)
    } else {
        u32::from(v != 0)
    }
}

/// Right shift with sticky jam, 64-bit.
#[inline]
pub fn shift_right_jam64(v: u64, dist: u32) -> u64 {
    if dist == 0 {
        v
    } else if dist < 63 {
        (v >> dist) | u64::from(v << (64 - dist) != 0)
    } else {
        u64::from(v != 0)
    }
}

/// Right shift with sticky jam for a short, in-range distance (`dist` < 64).
#[inline]
pub fn short_shift_right_jam64(v: u64, dist: u32) -> u64 {
    debug_assert!(dist < 64);
    (v >> dist) | u64::from(v & ((1 << dist) - 1) != 0)
}

/// Right shift of a (sig, extra) pair by a short, in-range distance
/// (0 < `dist` < 64), jamming bits lost from `extra` into its bottom bit.
#[inline]
pub fn short_shift_right_jam64_extra(sig: u64, extra: u64, dist: u32) -> (u64, u64) {
    debug_assert!(0 < dist && dist < 64);
    (
        sig >> dist,
        (sig << (64 - dist)) | (extra >> dist) | u64::from(extra << (64 - dist) != 0),
    )
}

/// Right shift of a 128-bit value kept as a (sig, extra) pair, jamming bits
/// lost from `extra` into its least significant bit. The `extra` word only
/// participates in rounding, so positional information below its top bit is
/// reduced to stickiness.
#[inline]
pub fn shift_right_jam64_extra(sig: u64, extra: u64, dist: u32) -> (u64, u64) {
    if dist == 0 {
        return (sig, extra);
    }
    let (new_sig, mut new_extra) = if dist < 64 {
        (sig >> dist, sig << (64 - dist))
    } else {
        (0, if dist == 64 { sig } else { u64::from(sig != 0) })
    };
    new_extra |= u64::from(extra != 0);
    (new_sig, new_extra)
}
