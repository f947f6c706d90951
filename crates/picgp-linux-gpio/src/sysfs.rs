//! Legacy sysfs GPIO backend
//!
//! Each pin is exported through `<base>/export` unless its `gpioN`
//! directory already exists. Pins exported here are unexported again on
//! close; pins that were already exported are left alone.

use crate::error::{LinuxGpioError, Result};
use picgp_core::gpio::{Direction, GpioBackend, Level};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Polls while udev sets up permissions on a freshly exported pin
const EXPORT_SETTLE_ATTEMPTS: u32 = 50;
const EXPORT_SETTLE_INTERVAL: Duration = Duration::from_millis(10);

/// Configuration for the sysfs backend
#[derive(Debug, Clone)]
pub struct SysfsConfig {
    /// sysfs GPIO class directory
    pub base: PathBuf,
}

impl Default for SysfsConfig {
    fn default() -> Self {
        Self {
            base: PathBuf::from("/sys/class/gpio"),
        }
    }
}

impl SysfsConfig {
    /// Use a different class directory
    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = base.into();
        self
    }
}

struct SysfsPin {
    number: u32,
    value: File,
    direction: File,
    exported: bool,
}

/// GPIO pins driven through `/sys/class/gpio`
pub struct SysfsGpio {
    config: SysfsConfig,
    pins: Vec<SysfsPin>,
}

fn open_attribute(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|source| LinuxGpioError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })
}

/// Open an attribute of a pin that was just exported
fn open_attribute_settled(path: &Path) -> Result<File> {
    let mut attempts = 0;
    loop {
        match open_attribute(path) {
            Err(LinuxGpioError::OpenFailed { source, .. })
                if attempts < EXPORT_SETTLE_ATTEMPTS
                    && matches!(
                        source.kind(),
                        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
                    ) =>
            {
                attempts += 1;
                std::thread::sleep(EXPORT_SETTLE_INTERVAL);
            }
            other => return other,
        }
    }
}

fn write_number(path: &Path, pin: u32) -> io::Result<()> {
    OpenOptions::new()
        .write(true)
        .open(path)?
        .write_all(pin.to_string().as_bytes())
}

fn rewrite(file: &mut File, contents: &[u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(contents)
}

impl SysfsGpio {
    /// Create a backend; no pin is touched until `open`
    pub fn new(config: SysfsConfig) -> Self {
        Self {
            config,
            pins: Vec::new(),
        }
    }

    fn pin_mut(&mut self, number: u32) -> Result<&mut SysfsPin> {
        self.pins
            .iter_mut()
            .find(|p| p.number == number)
            .ok_or(LinuxGpioError::NotOpen(number))
    }

    fn open_pin(&self, number: u32) -> Result<SysfsPin> {
        let dir = self.config.base.join(format!("gpio{}", number));

        let exported = !dir.exists();
        if exported {
            log::debug!("sysfs: exporting GPIO {}", number);
            write_number(&self.config.base.join("export"), number)
                .map_err(|source| LinuxGpioError::ExportFailed { pin: number, source })?;
        }

        let open_files = || -> Result<SysfsPin> {
            Ok(SysfsPin {
                number,
                direction: open_attribute_settled(&dir.join("direction"))?,
                value: open_attribute_settled(&dir.join("value"))?,
                exported,
            })
        };

        let pin = open_files();
        if pin.is_err() && exported {
            self.unexport(number).ok();
        }
        pin
    }

    fn unexport(&self, number: u32) -> Result<()> {
        log::debug!("sysfs: unexporting GPIO {}", number);
        write_number(&self.config.base.join("unexport"), number)
            .map_err(|source| LinuxGpioError::UnexportFailed { pin: number, source })
    }

    /// Close every open pin, unexporting those exported by `open`
    ///
    /// Continues past failures and returns the first one.
    fn release(&mut self) -> Result<()> {
        let mut result = Ok(());
        for pin in std::mem::take(&mut self.pins) {
            let SysfsPin {
                number, exported, ..
            } = pin;
            if exported {
                if let Err(e) = self.unexport(number) {
                    log::warn!("sysfs: {}", e);
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }
        result
    }
}

impl GpioBackend for SysfsGpio {
    type Error = LinuxGpioError;

    fn open(&mut self, pins: &[u32]) -> Result<()> {
        for &number in pins {
            match self.open_pin(number) {
                Ok(pin) => self.pins.push(pin),
                Err(e) => {
                    if let Err(cleanup) = self.release() {
                        log::warn!("sysfs: cleanup after failed open: {}", cleanup);
                    }
                    return Err(e);
                }
            }
        }
        log::info!(
            "sysfs: opened GPIO {:?} under {}",
            pins,
            self.config.base.display()
        );
        Ok(())
    }

    fn write_direction(&mut self, pin: u32, direction: Direction) -> Result<()> {
        let state = self.pin_mut(pin)?;
        rewrite(&mut state.direction, direction.to_string().as_bytes()).map_err(|source| {
            LinuxGpioError::WriteFailed {
                pin,
                attribute: "direction",
                source,
            }
        })
    }

    fn write_value(&mut self, pin: u32, level: Level) -> Result<()> {
        let state = self.pin_mut(pin)?;
        rewrite(&mut state.value, level.to_string().as_bytes()).map_err(|source| {
            LinuxGpioError::WriteFailed {
                pin,
                attribute: "value",
                source,
            }
        })
    }

    fn read_value(&mut self, pin: u32) -> Result<u8> {
        let state = self.pin_mut(pin)?;
        let mut buf = [0u8; 1];
        state
            .value
            .seek(SeekFrom::Start(0))
            .and_then(|_| state.value.read_exact(&mut buf))
            .map_err(|source| LinuxGpioError::ReadFailed { pin, source })?;

        Ok(match buf[0] {
            b'0' => 0,
            b'1' => 1,
            other => other,
        })
    }

    fn close(&mut self) -> Result<()> {
        self.release()
    }
}
