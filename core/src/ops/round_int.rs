//! Rounding to an integral value in the same format.

use crate::env::{FpEnv, Rounding};
use crate::nan;
use crate::repr::{FloatFormat, Fp};

impl<F: FloatFormat> Fp<F> {
    /// Rounds to a nearby integer, staying in the format. `exact` controls
    /// whether a changed value raises Inexact.
    pub fn round_to_int(self, env: &mut FpEnv, exact: bool) -> Self {
        let exp = self.raw_exp();
        let rounding = env.rounding;

        // |a| < 1: the result is 0 or +-1, decided directly.
        if exp <= F::BIAS - 1 {
            if self.raw() & !F::SIGN_BIT == 0 {
                return self;
            }
            if exact {
                env.raise_inexact();
            }
            let sign = self.sign();
            let one = Self::pack_raw(sign, F::BIAS, 0);
            let rounds_to_one = match rounding {
                Rounding::NearEven => exp == F::BIAS - 1 && self.frac() != 0,
                Rounding::NearMaxMag => exp == F::BIAS - 1,
                Rounding::MinMag => false,
                Rounding::Min => sign,
                Rounding::Max => !sign,
                #[cfg(feature = "round-odd")]
                Rounding::Odd => true,
            };
            return if rounds_to_one {
                Self::from_raw(one)
            } else {
                Self::zero(sign)
            };
        }

        // Already integral (or infinity); NaNs still get quieted.
        if exp >= F::BIAS + F::SIG_BITS as i32 {
            if exp == F::EXP_INF && self.frac() != 0 {
                return nan::propagate(env, self, self);
            }
            return self;
        }

        let last_bit_mask = 1_u64 << (F::BIAS + F::SIG_BITS as i32 - exp);
        let round_bits_mask = last_bit_mask - 1;
        let ui_a = self.raw();
        let mut ui_z = ui_a;
        match rounding {
            Rounding::NearMaxMag => ui_z += last_bit_mask >> 1,
            Rounding::NearEven => {
                ui_z += last_bit_mask >> 1;
                if ui_z & round_bits_mask == 0 {
                    ui_z &= !last_bit_mask;
                }
            }
            Rounding::Min if self.sign() => ui_z += round_bits_mask,
            Rounding::Max if !self.sign() => ui_z += round_bits_mask,
            _ => {}
        }
        ui_z &= !round_bits_mask;
        if ui_z != ui_a {
            #[cfg(feature = "round-odd")]
            if rounding == Rounding::Odd {
                ui_z |= last_bit_mask;
            }
            if exact {
                env.raise_inexact();
            }
        }
        Self::from_raw(ui_z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::F32;

    fn f32b(v: f32) -> F32 {
        F32::from_bits(v.to_bits())
    }

    #[test]
    fn nearest_even_matches_host() {
        for x in [0.5f32, 1.5, 2.5, -2.5, 3.7, -3.7, 0.49, 8388609.0] {
            let mut env = FpEnv::default();
            let z = f32b(x).round_to_int(&mut env, true);
            assert_eq!(z.to_bits(), x.round_ties_even().to_bits(), "rint({x})");
            assert_eq!(env.flags.inexact(), x.fract() != 0.0);
        }
    }

    #[test]
    fn directed_modes() {
        let cases = [
            (Rounding::MinMag, -1.7f32, -1.0f32),
            (Rounding::Min, -1.2, -2.0),
            (Rounding::Min, 1.8, 1.0),
            (Rounding::Max, 1.2, 2.0),
            (Rounding::Max, -1.8, -1.0),
            (Rounding::NearMaxMag, 2.5, 3.0),
            (Rounding::NearMaxMag, -2.5, -3.0),
        ];
        for (rounding, x, expect) in cases {
            let mut env = FpEnv::new(rounding);
            let z = f32b(x).round_to_int(&mut env, false);
            assert_eq!(z.to_bits(), expect.to_bits(), "{rounding:?} {x}");
            assert!(env.flags.is_empty(), "exact=false raises nothing");
        }
    }

    #[test]
    fn small_magnitudes() {
        // 0.3 toward +inf is 1, toward -inf is 0.
        let mut env = FpEnv::new(Rounding::Max);
        assert_eq!(
            f32b(0.3).round_to_int(&mut env, false).to_bits(),
            1.0f32.to_bits()
        );
        let mut env = FpEnv::new(Rounding::Min);
        assert_eq!(f32b(0.3).round_to_int(&mut env, false).to_bits(), 0);
        // Sign of zero survives.
        let mut env = FpEnv::default();
        assert_eq!(
            f32b(-0.3).round_to_int(&mut env, false).to_bits(),
            0x8000_0000
        );
    }

    #[test]
    fn integral_and_special_pass_through() {
        let mut env = FpEnv::default();
        for x in [5.0f32, -1024.0, 16777216.0, f32::INFINITY] {
            let z = f32b(x).round_to_int(&mut env, true);
            assert_eq!(z.to_bits(), x.to_bits());
        }
        assert!(env.flags.is_empty());
        let z = F32::from_bits(0x7F80_0001).round_to_int(&mut env, true);
        assert!(z.is_nan() && !z.is_signaling_nan());
        assert!(env.flags.invalid());
    }
}
