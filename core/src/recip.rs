//! Fixed-point reciprocal and reciprocal-square-root estimates.
//!
//! These seed the multi-word division and square-root loops. The estimates
//! are deliberately conservative: callers always follow up with an exact
//! integer correction pass, so a seed a few ulps off only costs an extra
//! loop iteration, never a wrong result.

/// Approximates `2^63 / a` for `a` in `[2^31, 2^32)`.
///
/// The result is a `0.32` fixed-point reciprocal of the `1.31` input, always
/// slightly underestimating so that quotient digit estimates never exceed
/// the true digit by more than one.
#[inline]
pub fn approx_recip_32_1(a: u32) -> u32 {
    (0x7FFF_FFFF_FFFF_FFFF_u64 / u64::from(a)) as u32
}

const RECIP_SQRT_K0: [u16; 16] = [
    0xB4C9, 0xFFAB, 0xAA7D, 0xF11C, 0xA1C5, 0xE4C7, 0x9A43, 0xDA29, 0x93B5, 0xD0E5, 0x8DED,
    0xC8B7, 0x88C6, 0xC16D, 0x8424, 0xBAE1,
];
const RECIP_SQRT_K1: [u16; 16] = [
    0xA5A5, 0xEA42, 0x8C21, 0xC62D, 0x788F, 0xAA7F, 0x6928, 0x94B6, 0x5CC7, 0x8335, 0x52A6,
    0x74E2, 0x4A3E, 0x68FE, 0x432B, 0x5EFD,
];

/// Approximates `2^31 * sqrt(2^32 / a)` for `a` in `[2^31, 2^32)` when
/// `odd_exp` is 0, and `2^31 * sqrt(2^33 / a)` when `odd_exp` is 1.
///
/// A table seed good to about 8 bits is refined with two fixed-point
/// correction terms, leaving the estimate accurate to well under a part in
/// a million. The parity argument folds the halved exponent of the operand
/// into the lookup so callers need no separate scaling multiply.
pub fn approx_recip_sqrt_32_1(odd_exp: u32, a: u32) -> u32 {
    debug_assert!((a & 0x8000_0000) != 0);
    let index = ((a >> 27 & 0xE) + odd_exp) as usize;
    let eps = (a >> 12) as u16;
    let r0 = RECIP_SQRT_K0[index]
        .wrapping_sub(((u32::from(RECIP_SQRT_K1[index]) * u32::from(eps)) >> 20) as u16);
    // First-order correction of the squared error.
    let mut esqr_r0 = u32::from(r0) * u32::from(r0);
    if odd_exp == 0 {
        esqr_r0 <<= 1;
    }
    let sigma0 = !((u64::from(esqr_r0) * u64::from(a)) >> 23) as u32;
    let mut r = (u32::from(r0) << 16).wrapping_add(((u64::from(r0) * u64::from(sigma0)) >> 25) as u32);
    // Second-order correction.
    let sqr_sigma0 = ((u64::from(sigma0) * u64::from(sigma0)) >> 32) as u32;
    r = r.wrapping_add(
        (((r >> 1).wrapping_add(r >> 3).wrapping_sub(u32::from(r0) << 14) as u64
            * u64::from(sqr_sigma0))
            >> 48) as u32,
    );
    if (r & 0x8000_0000) == 0 {
        r = 0x8000_0000;
    }
    r
}

/// Exact floor square root of a nonzero 128-bit value, seeded by
/// [`approx_recip_sqrt_32_1`].
///
/// Newton's recurrence converges to the floor root from any positive start,
/// so the seed quality only affects the iteration count, never the digit.
pub(crate) fn isqrt(n: u128) -> u64 {
    debug_assert!(n != 0);
    let lz = n.leading_zeros();
    let top_bits = 127 - lz;
    let odd = top_bits & 1;
    let a32 = if top_bits >= 31 {
        (n >> (top_bits - 31)) as u32
    } else {
        (n << (31 - top_bits)) as u32
    };
    let r = approx_recip_sqrt_32_1(odd, a32);
    let est32 = (u64::from(a32).wrapping_mul(u64::from(r)) >> 32) >> odd;
    let result_bits = top_bits / 2 + 1;
    // The true root fits in 64 bits, so iterates are clamped there to keep
    // every square below 2^128.
    let cap = u128::from(u64::MAX);
    let mut x = match result_bits as i32 - 32 {
        d if d > 0 => u128::from(est32) << d,
        d => u128::from(est32 >> -d),
    }
    .clamp(1, cap);
    if x * x < n {
        x = ((x + n / x) / 2 + 1).min(cap);
    }
    loop {
        let y = ((x + n / x) / 2).min(cap);
        if y >= x {
            break;
        }
        x = y;
    }
    while x * x > n {
        x -= 1;
    }
    while x < cap && (x + 1) * (x + 1) <= n {
        x += 1;
    }
    x as u64
}
