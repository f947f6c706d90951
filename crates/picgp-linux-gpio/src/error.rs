//! Error types for the Linux GPIO backends

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Linux GPIO specific errors
#[derive(Debug, Error)]
pub enum LinuxGpioError {
    /// Writing the pin number to the sysfs export file failed
    #[error("Failed to export GPIO {pin}: {source}")]
    ExportFailed {
        pin: u32,
        #[source]
        source: io::Error,
    },

    /// Writing the pin number to the sysfs unexport file failed
    #[error("Failed to unexport GPIO {pin}: {source}")]
    UnexportFailed {
        pin: u32,
        #[source]
        source: io::Error,
    },

    /// A sysfs attribute file could not be opened
    #[error("Failed to open '{path}': {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing a sysfs attribute failed
    #[error("Failed to write GPIO {pin} {attribute}: {source}")]
    WriteFailed {
        pin: u32,
        attribute: &'static str,
        #[source]
        source: io::Error,
    },

    /// Reading a sysfs value failed
    #[error("Failed to read GPIO {pin} value: {source}")]
    ReadFailed {
        pin: u32,
        #[source]
        source: io::Error,
    },

    /// Pin used before `open` or after `close`
    #[error("GPIO {0} is not open")]
    NotOpen(u32),

    /// Failed to request GPIO lines
    #[error("Failed to request GPIO lines on '{chip}': {source}")]
    LineRequestFailed {
        chip: String,
        #[source]
        source: gpiocdev::Error,
    },

    /// Failed to set GPIO line value
    #[error("Failed to set GPIO line value: {0}")]
    SetValueFailed(#[source] gpiocdev::Error),

    /// Failed to get GPIO line value
    #[error("Failed to get GPIO line value: {0}")]
    GetValueFailed(#[source] gpiocdev::Error),

    /// Failed to reconfigure GPIO lines
    #[error("Failed to reconfigure GPIO lines: {0}")]
    ReconfigureFailed(#[source] gpiocdev::Error),
}

/// Result type for Linux GPIO operations
pub type Result<T> = std::result::Result<T, LinuxGpioError>;
