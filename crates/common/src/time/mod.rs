//! Time abstractions
//!
//! - [`Clock`]: monotonic and wall-clock time source
//! - [`SystemClock`]: production clock
//! - [`MockClock`]: manually advanced clock for deterministic tests

pub mod clock;

pub use clock::{Clock, MockClock, SystemClock};
