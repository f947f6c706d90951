//! PIC18F-xxJxx family driver
//!
//! These parts have no high voltage programming. Program mode is entered by
//! pulsing MCLR, clocking in a 32-bit key MSB first, then raising MCLR and
//! holding it. Flash is written through a 64 byte holding buffer that is
//! committed by the last table write of the block followed by a NOP whose
//! fourth clock is stretched for the programming and discharge times.

use super::{identify, Processor, ProcessorDescriptor};
use crate::error::{Error, Result};
use crate::gpio::{Direction, GpioBackend, Level};
use crate::icsp::{opcodes, Icsp};
use crate::image::Segment;
use crate::ops::Progress;
use crate::timing::Clock;
use std::time::Duration;

/// Key clocked in while MCLR is low ("MCHP")
pub const PROGRAM_ENTRY_KEY: u32 = 0x4D43_4850;

/// Address of DEVID1; DEVID2 follows
pub const DEVICE_ID_ADDRESS: u32 = 0x3F_FFFE;

/// Size of the flash write holding buffer
pub const WRITE_BUFFER_SIZE: usize = 64;

/// Erase control register pair and the values that start a bulk erase
pub const ERASE_CONTROL_HIGH: u32 = 0x3C_0005;
/// Low half of the erase control register pair
pub const ERASE_CONTROL_LOW: u32 = 0x3C_0004;
/// Table write payload for [`ERASE_CONTROL_HIGH`] (0x01 on both bytes)
pub const ERASE_KEY_HIGH: u16 = 0x0101;
/// Table write payload for [`ERASE_CONTROL_LOW`] (0x80 on both bytes)
pub const ERASE_KEY_LOW: u16 = 0x8080;

/// Minimum delays from the family flash programming datasheet
///
/// These are absolute and do not scale with the configured clock period.
pub mod delays {
    use std::time::Duration;

    /// MCLR high pulse before the key sequence
    pub const MCLR_PULSE: Duration = Duration::from_micros(1);
    /// P18: MCLR low to first key bit
    pub const KEY_SETUP: Duration = Duration::from_millis(1);
    /// P19: last key bit to MCLR high
    pub const KEY_HOLD: Duration = Duration::from_micros(1);
    /// P12: MCLR high to first command
    pub const ENTRY_HOLD: Duration = Duration::from_micros(400);
    /// P9: PGC high time while a row is programmed
    pub const PROGRAM_TIME: Duration = Duration::from_micros(3400);
    /// P10: PGC low time after programming
    pub const DISCHARGE_TIME: Duration = Duration::from_micros(200);
    /// P11: bulk erase time
    pub const ERASE_TIME: Duration = Duration::from_millis(475);
}

const WINDOW_MASK: u32 = !(WRITE_BUFFER_SIZE as u32 - 1);

/// Holding buffer mirror, aligned to its own start address
struct WriteBuffer {
    start: Option<u32>,
    data: [u8; WRITE_BUFFER_SIZE],
}

impl WriteBuffer {
    fn new() -> Self {
        Self {
            start: None,
            data: [0xFF; WRITE_BUFFER_SIZE],
        }
    }

    /// Whether `address` falls outside the window being filled
    fn is_other_window(&self, address: u32) -> bool {
        self.start.is_some_and(|s| s != address & WINDOW_MASK)
    }

    fn put(&mut self, address: u32, byte: u8) {
        let start = *self.start.get_or_insert(address & WINDOW_MASK);
        self.data[(address - start) as usize] = byte;
    }

    /// Remove the contents, leaving an empty erased buffer
    fn take(&mut self) -> Option<(u32, [u8; WRITE_BUFFER_SIZE])> {
        let start = self.start.take()?;
        Some((start, std::mem::replace(&mut self.data, [0xFF; WRITE_BUFFER_SIZE])))
    }
}

/// Driver for the PIC18F-xxJxx family
pub struct P18FxxJxx<'a, B: GpioBackend, C: Clock> {
    icsp: Icsp<'a, B, C>,
    requested: Option<&'static ProcessorDescriptor>,
    /// Last known value of the target's TBLPTR
    table_pointer: Option<u32>,
}

impl<'a, B: GpioBackend, C: Clock> P18FxxJxx<'a, B, C> {
    /// Create a driver; `requested` is checked during identification
    pub fn new(icsp: Icsp<'a, B, C>, requested: Option<&'static ProcessorDescriptor>) -> Self {
        Self {
            icsp,
            requested,
            table_pointer: None,
        }
    }

    fn wait(&self, duration: Duration) {
        self.icsp.clock().wait_for(duration);
    }

    fn set_table_pointer(&mut self, address: u32) -> Result<()> {
        self.icsp.load_table_pointer(address)?;
        self.table_pointer = Some(address);
        Ok(())
    }

    fn table_write(&mut self, address: u32, word: u16) -> Result<()> {
        self.set_table_pointer(address)?;
        self.icsp.send_command(opcodes::TABLE_WRITE)?;
        self.icsp.send_payload(word)
    }

    /// NOP with the fourth clock held high for P9 and low for P10
    fn program_hold(&mut self) -> Result<()> {
        self.icsp.send_command_bits(opcodes::CORE_INSTRUCTION, 3)?;
        self.icsp.set_clock(Level::High)?;
        self.icsp.set_data(Level::Low)?;
        self.wait(delays::PROGRAM_TIME);
        self.icsp.set_clock(Level::Low)?;
        self.wait(delays::DISCHARGE_TIME);
        self.icsp.send_payload(opcodes::NOP)
    }

    fn flush(&mut self, buffer: &mut WriteBuffer) -> Result<()> {
        let Some((start, data)) = buffer.take() else {
            return Ok(());
        };

        if self.table_pointer != Some(start) {
            log::debug!("p18fxxjxx: reloading TBLPTR for row 0x{:06X}", start);
            self.set_table_pointer(start)?;
        }

        let last = WRITE_BUFFER_SIZE / 2 - 1;
        for (i, pair) in data.chunks_exact(2).enumerate() {
            let command = if i == last {
                opcodes::TABLE_WRITE_POSTINC2_PROGRAM
            } else {
                opcodes::TABLE_WRITE_POSTINC2
            };
            self.icsp.send_command(command)?;
            self.icsp.send_payload(u16::from_le_bytes([pair[0], pair[1]]))?;
        }
        self.program_hold()?;

        // The target advanced through the padding too
        self.table_pointer = Some(start + WRITE_BUFFER_SIZE as u32);
        log::trace!("p18fxxjxx: programmed row 0x{:06X}", start);
        Ok(())
    }

    fn verify(&mut self, segments: &[Segment], progress: &mut dyn Progress) -> Result<()> {
        let total = segments.iter().map(Segment::len).sum();
        progress.verifying(total);

        let mut verified = 0;
        for seg in segments {
            self.read_init(seg.start)?;
            let actual = self.read_mem(seg.len())?;

            let mismatch = seg
                .data
                .iter()
                .zip(&actual)
                .position(|(expected, found)| expected != found);
            if let Some(i) = mismatch {
                return Err(Error::VerificationFailure {
                    address: seg.start + i as u32,
                    expected: seg.data[i],
                    found: actual[i],
                });
            }

            verified += seg.len();
            progress.verify_progress(verified);
        }
        Ok(())
    }
}

impl<B: GpioBackend, C: Clock> Processor for P18FxxJxx<'_, B, C> {
    fn enter_program_mode(&mut self) -> Result<()> {
        if self.icsp.params().vpp.is_none() {
            return Err(Error::MissingVpp);
        }
        log::debug!("p18fxxjxx: entering program mode");

        self.icsp.set_clock_direction(Direction::Output)?;
        self.icsp.set_data_direction(Direction::Output)?;
        self.icsp.set_vpp_direction(Direction::Output)?;
        self.icsp.park_pgm()?;
        self.icsp.set_clock(Level::Low)?;
        self.icsp.set_data(Level::Low)?;
        self.icsp.set_vpp(Level::Low)?;

        self.icsp.set_vpp(Level::High)?;
        self.wait(delays::MCLR_PULSE);
        self.icsp.set_vpp(Level::Low)?;
        self.wait(delays::KEY_SETUP);

        for i in (0..32).rev() {
            self.icsp
                .send_bit_fetch_on_rise(Level::of_bit(PROGRAM_ENTRY_KEY, i))?;
        }
        self.icsp.set_clock(Level::Low)?;
        self.wait(delays::KEY_HOLD);

        self.icsp.set_vpp(Level::High)?;
        self.wait(delays::ENTRY_HOLD);

        self.table_pointer = None;
        Ok(())
    }

    fn exit_program_mode(&mut self) -> Result<()> {
        log::debug!("p18fxxjxx: leaving program mode");
        self.icsp.set_clock(Level::Low)?;
        self.icsp.set_data_direction(Direction::Output)?;
        self.icsp.set_data(Level::Low)?;
        self.icsp.set_vpp(Level::Low)?;
        self.table_pointer = None;
        Ok(())
    }

    fn check_processor_type(&mut self) -> Result<&'static ProcessorDescriptor> {
        self.read_init(DEVICE_ID_ADDRESS)?;
        let id = self.read_mem(2)?;
        let device_id = u16::from_le_bytes([id[0], id[1]]);

        let found = identify(device_id).ok_or(Error::UnknownProcessorId(device_id))?;
        log::info!(
            "Found {} (device id 0x{:04X}, revision {})",
            found.name,
            device_id,
            found.revision(device_id)
        );

        if let Some(requested) = self.requested {
            if requested.name != found.name {
                return Err(Error::ProcessorMismatch {
                    expected: requested.name,
                    found: found.name,
                });
            }
        }
        Ok(found)
    }

    fn bulk_erase(&mut self) -> Result<()> {
        log::debug!("p18fxxjxx: bulk erase");
        self.table_write(ERASE_CONTROL_HIGH, ERASE_KEY_HIGH)?;
        self.table_write(ERASE_CONTROL_LOW, ERASE_KEY_LOW)?;
        self.icsp.core_instruction(opcodes::NOP)?;

        // PGD is held low from here until the erase completes. The half
        // period after the last command bit already counts towards it.
        self.icsp.send_command(opcodes::CORE_INSTRUCTION)?;
        let consumed = self.icsp.params().half_period().unwrap_or_default();
        self.wait((delays::ERASE_TIME + delays::DISCHARGE_TIME).saturating_sub(consumed));
        self.icsp.send_payload(opcodes::NOP)
    }

    fn write_program(&mut self, segments: &[Segment], progress: &mut dyn Progress) -> Result<()> {
        let total = segments.iter().map(Segment::len).sum();
        progress.writing(total);

        self.icsp.core_instruction(opcodes::BSF_EECON1_WREN)?;

        let mut buffer = WriteBuffer::new();
        let mut written = 0;
        for seg in segments {
            log::trace!(
                "p18fxxjxx: segment 0x{:06X}..0x{:06X}",
                seg.start,
                seg.end()
            );
            for (address, &byte) in (seg.start..).zip(&seg.data) {
                if buffer.is_other_window(address) {
                    self.flush(&mut buffer)?;
                }
                buffer.put(address, byte);
                if (address & !WINDOW_MASK) as usize == WRITE_BUFFER_SIZE - 1 {
                    self.flush(&mut buffer)?;
                }
            }
            written += seg.len();
            progress.write_progress(written);
        }
        self.flush(&mut buffer)?;

        self.verify(segments, progress)
    }

    fn read_init(&mut self, address: u32) -> Result<()> {
        self.set_table_pointer(address)
    }

    fn read_mem(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(len);
        for _ in 0..len {
            self.icsp.send_command(opcodes::TABLE_READ_POSTINC)?;
            data.push(self.icsp.shift_in_byte()?);
        }
        self.table_pointer = self.table_pointer.map(|p| p + len as u32);
        Ok(data)
    }
}
