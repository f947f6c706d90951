//! GPIO abstraction
//!
//! The engine never talks to pins directly. It goes through a
//! [`GpioController`], which owns a [`GpioBackend`] and caches the last
//! direction and level written to each pin so redundant writes never reach
//! the backend. Every backend call is assumed to be expensive (a file write
//! for sysfs, an ioctl for the character device).

mod controller;

pub use controller::GpioController;

use core::fmt;

/// Logic level of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Logic 0
    Low,
    /// Logic 1
    High,
}

impl Level {
    /// Level of bit `n` of `value`
    pub fn of_bit(value: u32, n: u32) -> Self {
        Self::from((value >> n) & 1 != 0)
    }

    /// Whether this is [`Level::High`]
    pub fn is_high(self) -> bool {
        self == Self::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "0"),
            Self::High => write!(f, "1"),
        }
    }
}

/// Pin direction as seen from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host samples the line
    Input,
    /// Host drives the line
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "in"),
            Self::Output => write!(f, "out"),
        }
    }
}

/// Low-level pin access implemented by each host GPIO driver
///
/// Implementations perform the operation unconditionally; write elision is
/// the controller's job. `read_value` returns the raw value observed:
/// `0` and `1` are the defined levels, anything else is reported by the
/// controller as a bad GPIO state.
pub trait GpioBackend {
    /// Backend specific error
    type Error: std::error::Error + Send + Sync + 'static;

    /// Acquire the given pins
    fn open(&mut self, pins: &[u32]) -> Result<(), Self::Error>;

    /// Configure the direction of a pin
    fn write_direction(&mut self, pin: u32, direction: Direction) -> Result<(), Self::Error>;

    /// Drive an output pin
    fn write_value(&mut self, pin: u32, level: Level) -> Result<(), Self::Error>;

    /// Sample a pin
    fn read_value(&mut self, pin: u32) -> Result<u8, Self::Error>;

    /// Release every pin acquired by `open`
    fn close(&mut self) -> Result<(), Self::Error>;
}
