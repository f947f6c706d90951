//! Cached pin controller

use super::{Direction, GpioBackend, Level};
use crate::error::{Error, Result};

/// Cached state of an owned pin; `None` means unknown
#[derive(Debug, Clone, Copy)]
struct Pin {
    number: u32,
    direction: Option<Direction>,
    level: Option<Level>,
}

/// Exclusive owner of a set of GPIO pins
///
/// `set_direction` and `set_value` are skipped when the cached state already
/// matches the request. Changing direction forgets the cached level, since
/// the backend may reset the line when it switches. `get_value` always goes
/// to the backend.
///
/// Pins are released by [`close`](Self::close), or on drop if `close` was
/// never called, so an error anywhere in a programming run still returns the
/// lines to the system.
pub struct GpioController<B: GpioBackend> {
    backend: B,
    pins: Vec<Pin>,
    open: bool,
}

impl<B: GpioBackend> GpioController<B> {
    /// Acquire `pins` through `backend`
    pub fn open(mut backend: B, pins: &[u32]) -> Result<Self> {
        log::debug!("gpio: opening pins {:?}", pins);
        backend.open(pins).map_err(|e| Error::GpioAccess {
            pin: pins.first().copied().unwrap_or_default(),
            source: Box::new(e),
        })?;

        Ok(Self {
            backend,
            pins: pins
                .iter()
                .map(|&number| Pin {
                    number,
                    direction: None,
                    level: None,
                })
                .collect(),
            open: true,
        })
    }

    fn pin_mut(&mut self, number: u32) -> Result<&mut Pin> {
        self.pins
            .iter_mut()
            .find(|p| p.number == number)
            .ok_or(Error::UnknownPin(number))
    }

    /// Set the direction of `pin`, unless it is already set that way
    pub fn set_direction(&mut self, pin: u32, direction: Direction) -> Result<()> {
        let state = self.pin_mut(pin)?;
        if state.direction == Some(direction) {
            return Ok(());
        }
        // Unknown until the backend confirms the change
        state.direction = None;
        state.level = None;

        self.backend
            .write_direction(pin, direction)
            .map_err(|e| Error::GpioAccess {
                pin,
                source: Box::new(e),
            })?;
        self.pin_mut(pin)?.direction = Some(direction);
        Ok(())
    }

    /// Drive `pin` to `level`, unless it is already known to be there
    pub fn set_value(&mut self, pin: u32, level: Level) -> Result<()> {
        let state = self.pin_mut(pin)?;
        if state.level == Some(level) {
            return Ok(());
        }
        state.level = None;

        self.backend
            .write_value(pin, level)
            .map_err(|e| Error::GpioAccess {
                pin,
                source: Box::new(e),
            })?;
        self.pin_mut(pin)?.level = Some(level);
        Ok(())
    }

    /// Sample `pin`
    pub fn get_value(&mut self, pin: u32) -> Result<Level> {
        self.pin_mut(pin)?;
        let raw = self
            .backend
            .read_value(pin)
            .map_err(|e| Error::GpioAccess {
                pin,
                source: Box::new(e),
            })?;

        match raw {
            0 => Ok(Level::Low),
            1 => Ok(Level::High),
            value => Err(Error::BadGpioState { pin, value }),
        }
    }

    /// Get the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Release all pins
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        log::debug!("gpio: releasing {} pins", self.pins.len());

        self.backend.close().map_err(|e| Error::GpioAccess {
            pin: self.pins.first().map(|p| p.number).unwrap_or_default(),
            source: Box::new(e),
        })
    }
}

impl<B: GpioBackend> Drop for GpioController<B> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::error!("gpio: failed to release pins: {}", e);
        }
    }
}
