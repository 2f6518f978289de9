//! Software IEEE 754 binary floating-point, computed entirely in integer
//! arithmetic.
//!
//! Every operation takes an explicit [`FpEnv`] carrying the rounding
//! attribute and accumulating sticky exception flags, so results are
//! bit-identical on every target regardless of the host FPU. The
//! interchange formats ([`F16`], [`F32`], [`F64`], [`F128`]) and the 80-bit
//! double-extended format ([`ExtF80`]) are plain bit-pattern wrappers;
//! nothing here ever touches a hardware float.

pub mod env;
pub mod extf80;
pub mod f128;
mod nan;
mod ops;
pub mod prim;
mod recip;
pub mod repr;
mod round;

#[cfg(test)]
mod test;

pub use env::{
    swap_ambient, with_ambient, EnvError, Exceptions, ExtPrecision, FpEnv, Rounding, Tininess,
};
pub use extf80::ExtF80;
pub use f128::F128;
pub use repr::{Binary16, Binary32, Binary64, FloatFormat, Fp, F16, F32, F64};
