//! GPIO character device backend
//!
//! All pins are requested together as one line request, initially as
//! inputs. A direction change reconfigures the whole request from the
//! retained line configuration.

use crate::error::{LinuxGpioError, Result};
use gpiocdev::line::Value;
use gpiocdev::request::{Config, Request};
use picgp_core::gpio::{Direction, GpioBackend, Level};

/// Configuration for the character device backend
#[derive(Debug, Clone)]
pub struct CdevConfig {
    /// GPIO chip device path
    pub device: String,
    /// Consumer label shown by `gpioinfo`
    pub consumer: String,
}

impl Default for CdevConfig {
    fn default() -> Self {
        Self {
            device: "/dev/gpiochip0".to_string(),
            consumer: "picgp".to_string(),
        }
    }
}

impl CdevConfig {
    /// Create a configuration for the given chip
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Self::default()
        }
    }
}

/// GPIO lines controlled via the gpiocdev crate
pub struct CdevGpio {
    config: CdevConfig,
    lines: Config,
    request: Option<Request>,
}

fn to_value(level: Level) -> Value {
    if level.is_high() {
        Value::Active
    } else {
        Value::Inactive
    }
}

impl CdevGpio {
    /// Create a backend; the chip is not opened until `open`
    pub fn new(config: CdevConfig) -> Self {
        Self {
            config,
            lines: Config::default(),
            request: None,
        }
    }

    fn request(&self, pin: u32) -> Result<&Request> {
        self.request.as_ref().ok_or(LinuxGpioError::NotOpen(pin))
    }
}

impl GpioBackend for CdevGpio {
    type Error = LinuxGpioError;

    fn open(&mut self, pins: &[u32]) -> Result<()> {
        log::debug!("cdev: opening {}", self.config.device);

        let mut lines = Config::default();
        for &pin in pins {
            lines.with_line(pin).as_input();
        }

        let request = Request::from_config(lines.clone())
            .on_chip(&self.config.device)
            .with_consumer(self.config.consumer.as_str())
            .request()
            .map_err(|source| LinuxGpioError::LineRequestFailed {
                chip: self.config.device.clone(),
                source,
            })?;

        log::info!("cdev: opened {} lines {:?}", self.config.device, pins);
        self.lines = lines;
        self.request = Some(request);
        Ok(())
    }

    fn write_direction(&mut self, pin: u32, direction: Direction) -> Result<()> {
        self.request(pin)?;
        match direction {
            Direction::Input => self.lines.with_line(pin).as_input(),
            Direction::Output => self.lines.with_line(pin).as_output(Value::Inactive),
        };
        self.request(pin)?
            .reconfigure(&self.lines)
            .map_err(LinuxGpioError::ReconfigureFailed)
    }

    fn write_value(&mut self, pin: u32, level: Level) -> Result<()> {
        self.request(pin)?
            .set_value(pin, to_value(level))
            .map_err(LinuxGpioError::SetValueFailed)
    }

    fn read_value(&mut self, pin: u32) -> Result<u8> {
        match self.request(pin)?.value(pin) {
            Ok(Value::Active) => Ok(1),
            Ok(Value::Inactive) => Ok(0),
            Err(e) => Err(LinuxGpioError::GetValueFailed(e)),
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.request.take().is_some() {
            log::debug!("cdev: released lines on {}", self.config.device);
        }
        self.lines = Config::default();
        Ok(())
    }
}
