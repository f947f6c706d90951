//! picgp-core - ICSP programming engine for PIC18 microcontrollers
//!
//! This crate implements the In-Circuit Serial Programming protocol by
//! bit-banging general purpose I/O lines of the host. It is split in layers:
//!
//! - [`gpio`] - pin ownership with cached direction/level short-circuiting
//! - [`timing`] - monotonic clock and busy-wait deadlines
//! - [`image`] - sparse program images, segmentation and Intel HEX
//! - [`icsp`] - bit, command and payload primitives shared by all families
//! - [`processor`] - the processor table and per-family drivers
//! - [`ops`] - the write and read sequences built on top of a driver
//!
//! # Example
//!
//! ```ignore
//! use picgp_core::gpio::GpioController;
//! use picgp_core::icsp::CommParams;
//! use picgp_core::timing::SpinClock;
//! use picgp_core::ops::{self, NoProgress};
//!
//! let params = CommParams::new(3, 2).with_vpp(4);
//! let mut gpio = GpioController::open(backend, &params.pins())?;
//! let image = picgp_core::image::ihex::parse(&text)?;
//! ops::write(&mut gpio, &SpinClock, &params, Some("PIC18F26J13"), &image, &mut NoProgress)?;
//! gpio.close()?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod gpio;
pub mod icsp;
pub mod image;
pub mod ops;
pub mod processor;
pub mod timing;

pub use error::{Error, Result};
