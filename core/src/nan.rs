//! NaN propagation and the cross-format NaN carrier.

use crate::env::FpEnv;
use crate::repr::{FloatFormat, Fp};

/// Format-independent NaN: sign plus the payload bits below the quiet bit,
/// left-aligned at bit 127. Narrowing conversions truncate from the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonNan {
    pub sign: bool,
    pub payload: u128,
}

/// Payload field width of a single-word format (trailing significand minus
/// the quiet bit).
fn payload_bits<F: FloatFormat>() -> u32 {
    F::SIG_BITS - 1
}

/// Forces a NaN fraction field quiet while keeping it a NaN.
#[cfg(not(feature = "legacy-snan"))]
pub(crate) fn quiet_frac<F: FloatFormat>(frac: u64) -> u64 {
    frac | F::QUIET_BIT
}

/// Forces a NaN fraction field quiet while keeping it a NaN.
#[cfg(feature = "legacy-snan")]
pub(crate) fn quiet_frac<F: FloatFormat>(frac: u64) -> u64 {
    let frac = frac & !F::QUIET_BIT;
    if frac == 0 { F::QUIET_BIT >> 1 } else { frac }
}

impl<F: FloatFormat> Fp<F> {
    /// This NaN with its quiet convention enforced. Meaningless on non-NaNs.
    pub(crate) fn quieted(self) -> Self {
        Self::pack(self.sign(), F::EXP_INF, quiet_frac::<F>(self.frac()))
    }
}

impl CommonNan {
    pub(crate) fn from_fp<F: FloatFormat>(env: &mut FpEnv, a: Fp<F>) -> Self {
        if a.is_signaling_nan() {
            env.raise_invalid();
        }
        let bits = payload_bits::<F>();
        Self {
            sign: a.sign(),
            payload: u128::from(a.frac() & (F::QUIET_BIT - 1)) << (128 - bits),
        }
    }

    pub(crate) fn to_fp<F: FloatFormat>(self) -> Fp<F> {
        let bits = payload_bits::<F>();
        let frac = (self.payload >> (128 - bits)) as u64;
        Fp::pack(self.sign, F::EXP_INF, quiet_frac::<F>(frac))
    }
}

/// Combines the NaN operand(s) of a binary operation into the result NaN.
///
/// At least one operand must be a NaN. Signaling operands raise Invalid and
/// are quieted before selection. When both are NaNs the one with the larger
/// raw magnitude (sign ignored) wins; on a tie the first operand wins.
pub(crate) fn propagate<F: FloatFormat>(env: &mut FpEnv, a: Fp<F>, b: Fp<F>) -> Fp<F> {
    debug_assert!(a.is_nan() || b.is_nan());
    if a.is_signaling_nan() || b.is_signaling_nan() {
        env.raise_invalid();
    }
    match (a.is_nan(), b.is_nan()) {
        (true, false) => a.quieted(),
        (false, true) => b.quieted(),
        _ => {
            let mag_a = a.raw() & !F::SIGN_BIT;
            let mag_b = b.raw() & !F::SIGN_BIT;
            if mag_b > mag_a { b.quieted() } else { a.quieted() }
        }
    }
}
