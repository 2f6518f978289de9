//! Arithmetic on the single-word formats, generic over [`FloatFormat`].
//!
//! Significand registers are `u64` throughout; products and quotient
//! numerators widen to `u128`.

mod addsub;
mod cmp;
mod convert;
mod div;
mod from_int;
mod mul;
mod rem;
mod round_int;
mod sqrt;
mod to_int;

use crate::repr::FloatFormat;

/// Normalizes a subnormal trailing significand.
///
/// Returns the adjusted biased exponent (zero or negative) and the
/// significand with its leading bit moved up to the implicit position.
pub(crate) fn norm_subnormal<F: FloatFormat>(frac: u64) -> (i32, u64) {
    debug_assert!(frac != 0);
    let shift_dist = frac.leading_zeros() as i32 - (63 - F::SIG_BITS as i32);
    (1 - shift_dist, frac << shift_dist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::Binary32;

    #[test]
    fn subnormal_normalization() {
        // Smallest subnormal: leading bit climbs to the implicit position.
        let (exp, sig) = norm_subnormal::<Binary32>(1);
        assert_eq!(exp, 1 - 23);
        assert_eq!(sig, 1 << 23);
        // Largest subnormal needs a single shift.
        let (exp, sig) = norm_subnormal::<Binary32>(0x7F_FFFF);
        assert_eq!(exp, 0);
        assert_eq!(sig, 0xFF_FFFE);
    }
}
