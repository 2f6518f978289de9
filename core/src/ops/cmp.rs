//! Quiet and signaling comparisons.
//!
//! Equality is quiet by default and `lt`/`le` signal by default, per the
//! usual predicate table; the `_quiet`/`_signaling` variants cover the rest.

use crate::env::FpEnv;
use crate::repr::{FloatFormat, Fp};

impl<F: FloatFormat> Fp<F> {
    fn cmp_nan(self, rhs: Self, env: &mut FpEnv, signal_quiet: bool) {
        if signal_quiet || self.is_signaling_nan() || rhs.is_signaling_nan() {
            env.raise_invalid();
        }
    }

    /// Both operands are zero, possibly of different sign.
    fn both_zero(self, rhs: Self) -> bool {
        (self.raw() | rhs.raw()) & !F::SIGN_BIT == 0
    }

    pub fn eq(self, rhs: Self, env: &mut FpEnv) -> bool {
        if self.is_nan() || rhs.is_nan() {
            self.cmp_nan(rhs, env, false);
            return false;
        }
        self.raw() == rhs.raw() || self.both_zero(rhs)
    }

    pub fn eq_signaling(self, rhs: Self, env: &mut FpEnv) -> bool {
        if self.is_nan() || rhs.is_nan() {
            self.cmp_nan(rhs, env, true);
            return false;
        }
        self.raw() == rhs.raw() || self.both_zero(rhs)
    }

    pub fn lt(self, rhs: Self, env: &mut FpEnv) -> bool {
        if self.is_nan() || rhs.is_nan() {
            self.cmp_nan(rhs, env, true);
            return false;
        }
        self.lt_mag(rhs)
    }

    pub fn le(self, rhs: Self, env: &mut FpEnv) -> bool {
        if self.is_nan() || rhs.is_nan() {
            self.cmp_nan(rhs, env, true);
            return false;
        }
        !rhs.lt_mag(self)
    }

    pub fn lt_quiet(self, rhs: Self, env: &mut FpEnv) -> bool {
        if self.is_nan() || rhs.is_nan() {
            self.cmp_nan(rhs, env, false);
            return false;
        }
        self.lt_mag(rhs)
    }

    pub fn le_quiet(self, rhs: Self, env: &mut FpEnv) -> bool {
        if self.is_nan() || rhs.is_nan() {
            self.cmp_nan(rhs, env, false);
            return false;
        }
        !rhs.lt_mag(self)
    }

    /// Numeric `<` on non-NaN encodings.
    fn lt_mag(self, rhs: Self) -> bool {
        let (ui_a, ui_b) = (self.raw(), rhs.raw());
        if self.sign() != rhs.sign() {
            // Different signs: a < b iff a is the negative one and they are
            // not both zero.
            self.sign() && !self.both_zero(rhs)
        } else {
            ui_a != ui_b && (self.sign() ^ (ui_a < ui_b))
        }
    }
}
