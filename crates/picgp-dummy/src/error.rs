//! Error types for the simulated target

use thiserror::Error;

/// Simulated target errors
#[derive(Debug, Error)]
pub enum Error {
    /// Pin is not wired to the target
    #[error("GPIO {0} is not connected to the target")]
    Unconnected(u32),

    /// Pin access before `open` or after `close`
    #[error("GPIO {0} is not open")]
    NotOpen(u32),

    /// Second `open` without a `close`
    #[error("pins are already open")]
    AlreadyOpen,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
