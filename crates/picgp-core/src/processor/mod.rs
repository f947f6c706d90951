//! Supported processors and device families
//!
//! Each [`ProcessorDescriptor`] in the table names the [`Family`] whose
//! programming algorithm it uses. A family driver implements the
//! [`Processor`] capability set on top of the ICSP primitives.

mod database;
pub mod p18fxxjxx;

pub use database::PROCESSORS;

use crate::error::Result;
use crate::gpio::GpioBackend;
use crate::icsp::Icsp;
use crate::image::Segment;
use crate::ops::Progress;
use crate::timing::Clock;
use core::fmt;

/// Programming algorithm family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Family {
    /// PIC18F-xxJxx: low voltage key entry, 64 byte write buffer
    #[default]
    P18FxxJxx,
}

impl Family {
    /// Create the driver for this family
    pub fn driver<'a, B, C>(
        self,
        icsp: Icsp<'a, B, C>,
        requested: Option<&'static ProcessorDescriptor>,
    ) -> Box<dyn Processor + 'a>
    where
        B: GpioBackend + 'a,
        C: Clock + 'a,
    {
        match self {
            Self::P18FxxJxx => Box::new(p18fxxjxx::P18FxxJxx::new(icsp, requested)),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::P18FxxJxx => write!(f, "PIC18F-xxJxx"),
        }
    }
}

/// A supported processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorDescriptor {
    /// Part name, e.g. "PIC18F26J13"
    pub name: &'static str,
    /// Device id with the revision bits cleared
    pub id: u16,
    /// Bits of the device id that identify the part
    pub mask: u16,
    /// Program memory size in bytes
    pub memory_size: u32,
    /// Programming algorithm
    pub family: Family,
}

impl ProcessorDescriptor {
    /// Whether a device id read from a target belongs to this processor
    pub fn matches(&self, device_id: u16) -> bool {
        device_id & self.mask == self.id & self.mask
    }

    /// Silicon revision encoded in a matching device id
    pub fn revision(&self, device_id: u16) -> u16 {
        device_id & !self.mask
    }
}

/// Find the processor a device id belongs to
pub fn identify(device_id: u16) -> Option<&'static ProcessorDescriptor> {
    PROCESSORS.iter().find(|p| p.matches(device_id))
}

/// Look up a processor by name (case-insensitive)
pub fn find_by_name(name: &str) -> Option<&'static ProcessorDescriptor> {
    PROCESSORS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Operations every device family provides
///
/// Call order is the caller's responsibility: enter program mode, identify,
/// then either erase and write or read, then exit.
pub trait Processor {
    /// Put the target into program mode
    fn enter_program_mode(&mut self) -> Result<()>;

    /// Leave program mode and release the target
    fn exit_program_mode(&mut self) -> Result<()>;

    /// Read the device id and match it against the processor table
    fn check_processor_type(&mut self) -> Result<&'static ProcessorDescriptor>;

    /// Erase the whole program memory
    fn bulk_erase(&mut self) -> Result<()>;

    /// Program `segments`, then read them back and compare
    fn write_program(&mut self, segments: &[Segment], progress: &mut dyn Progress) -> Result<()>;

    /// Position the read pointer at `address`
    fn read_init(&mut self, address: u32) -> Result<()>;

    /// Read `len` bytes from the read pointer onwards
    fn read_mem(&mut self, len: usize) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify() {
        let p = identify(0x5920).unwrap();
        assert_eq!(p.name, "PIC18F26J13");
        assert_eq!(p.memory_size, 64 * 1024);

        // Revision bits are ignored
        let p = identify(0x5923).unwrap();
        assert_eq!(p.name, "PIC18F26J13");
        assert_eq!(p.revision(0x5923), 3);

        assert!(identify(0xFFFF).is_none());
    }

    #[test]
    fn test_find_by_name_ignores_case() {
        assert_eq!(find_by_name("pic18f45j10").unwrap().name, "PIC18F45J10");
        assert!(find_by_name("PIC16F84").is_none());
    }

    #[test]
    fn test_ids_are_unambiguous() {
        for (i, a) in PROCESSORS.iter().enumerate() {
            assert_eq!(a.id & !a.mask, 0, "{} has revision bits set", a.name);
            for b in &PROCESSORS[i + 1..] {
                assert!(!a.matches(b.id), "{} and {} share an id", a.name, b.name);
                assert_ne!(a.name, b.name);
            }
        }
    }
}
