//! Crate-level randomized tests.
//!
//! The per-module unit tests pin down edge cases with hand-computed
//! encodings; these modules sweep wide random input distributions instead.

mod differential;
