//! Error types for picgp-core

use thiserror::Error;

/// Boxed error produced by a GPIO backend
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// A pin could not be opened, configured, read or written
    #[error("GPIO {pin} access failed: {source}")]
    GpioAccess {
        /// Pin number
        pin: u32,
        /// Backend error
        #[source]
        source: BackendError,
    },

    /// A pin read returned something other than a defined level
    #[error("GPIO {pin} returned undefined value {value}")]
    BadGpioState {
        /// Pin number
        pin: u32,
        /// Raw value seen by the backend
        value: u8,
    },

    /// A pin was used that is not owned by the controller
    #[error("GPIO {0} is not open")]
    UnknownPin(u32),

    /// The selected mode or device needs a Vpp pin and none is configured
    #[error("a Vpp pin is required but not configured")]
    MissingVpp,

    /// No processor in the table matches the identity read from the device
    #[error("unknown processor id 0x{0:04X}")]
    UnknownProcessorId(u16),

    /// The device identified as a different processor than requested
    #[error("processor mismatch: requested {expected}, found {found}")]
    ProcessorMismatch {
        /// Requested processor name
        expected: &'static str,
        /// Identified processor name
        found: &'static str,
    },

    /// The requested processor name is not in the table
    #[error("unknown processor '{0}'")]
    UnknownProcessor(String),

    /// Read-back after programming differs from the source image
    #[error("verification failed at 0x{address:06X}: expected 0x{expected:02X}, found 0x{found:02X}")]
    VerificationFailure {
        /// Address of the first differing byte
        address: u32,
        /// Byte from the program image
        expected: u8,
        /// Byte read from the device
        found: u8,
    },

    /// An address lies outside the device's program memory
    #[error("address 0x{address:06X} is outside program memory (size 0x{size:X})")]
    AddressOutOfRange {
        /// Offending address
        address: u32,
        /// Program memory size in bytes
        size: u32,
    },

    /// Malformed Intel HEX input
    #[error("line {line}: {kind}")]
    Hex {
        /// 1-based line number
        line: usize,
        /// What went wrong
        kind: HexErrorKind,
    },
}

/// Details about an Intel HEX decode failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexErrorKind {
    /// Line does not start with ':'
    #[error("missing start code")]
    MissingStartCode,
    /// Non-hexadecimal character or odd digit count
    #[error("invalid hex digits")]
    InvalidDigits,
    /// Record length field disagrees with line length
    #[error("record length mismatch")]
    LengthMismatch,
    /// Checksum does not sum to zero
    #[error("bad checksum (computed 0x{computed:02X}, found 0x{found:02X})")]
    BadChecksum {
        /// Checksum computed over the record
        computed: u8,
        /// Checksum stored in the record
        found: u8,
    },
    /// Record type is not understood
    #[error("unsupported record type 0x{0:02X}")]
    UnsupportedRecord(u8),
    /// Address record with a wrong payload size
    #[error("malformed address record")]
    BadAddressRecord,
}

/// Result type alias using the core Error type
pub type Result<T> = std::result::Result<T, Error>;
