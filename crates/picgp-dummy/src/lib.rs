//! picgp-dummy - Simulated PIC18 target for testing
//!
//! This crate provides a GPIO backend that behaves like a PIC18F-xxJxx
//! wired to the configured pins. It decodes the ICSP bit stream edge by
//! edge, so everything above the backend seam runs unmodified. Waits are
//! taken on a [`VirtualClock`] that the target reads to check programming
//! and erase times, which makes a full erase/write/verify cycle run in
//! milliseconds.

mod clock;
mod error;
mod target;

pub use clock::VirtualClock;
pub use error::{Error, Result};
pub use target::{DummyConfig, DummyTarget, ProgrammedRow, Violation};
