//! picgp-linux-gpio - Linux GPIO backends for picgp
//!
//! This crate provides two implementations of
//! [`GpioBackend`](picgp_core::gpio::GpioBackend):
//!
//! - [`SysfsGpio`] drives pins through the legacy `/sys/class/gpio`
//!   interface, exporting them on open and unexporting them on close. Each
//!   pin keeps its `value` and `direction` files open for the whole run.
//! - [`CdevGpio`] uses the GPIO character device (`/dev/gpiochipN`) through
//!   the gpiocdev crate. Pin numbers are line offsets on that chip.
//!
//! # Example
//!
//! ```no_run
//! use picgp_core::gpio::GpioController;
//! use picgp_linux_gpio::{SysfsConfig, SysfsGpio};
//!
//! let backend = SysfsGpio::new(SysfsConfig::default());
//! let gpio = GpioController::open(backend, &[3, 2, 4])?;
//! gpio.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # System Requirements
//!
//! - sysfs: a kernel built with `CONFIG_GPIO_SYSFS`
//! - cdev: Linux 4.8+ (5.10+ for the v2 API)
//! - Write access to the export files or the chip device (root or udev
//!   rules)

pub mod cdev;
pub mod error;
pub mod sysfs;

pub use cdev::{CdevConfig, CdevGpio};
pub use error::{LinuxGpioError, Result};
pub use sysfs::{SysfsConfig, SysfsGpio};
