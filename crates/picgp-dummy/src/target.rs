//! Pin-level PIC18F-xxJxx model
//!
//! The model tracks the level of each wired pin and reacts to edges:
//!
//! - Vpp falling: start listening for the program mode key
//! - PGC rising while the key is shifted in: sample one key bit
//! - Vpp rising: enter program mode if the last 32 key bits match
//! - PGC falling in program mode: shift one command or payload bit
//!
//! Table reads drive PGD from the ninth payload clock on, one bit after
//! each falling edge. Rows latched by table writes are committed only when
//! the fourth clock of the next command is held high for the programming
//! time.

use crate::clock::VirtualClock;
use crate::error::{Error, Result};
use picgp_core::gpio::{Direction, GpioBackend, Level};
use picgp_core::icsp::opcodes;
use picgp_core::processor::p18fxxjxx::{
    delays, DEVICE_ID_ADDRESS, ERASE_CONTROL_HIGH, ERASE_CONTROL_LOW, PROGRAM_ENTRY_KEY,
    WRITE_BUFFER_SIZE,
};
use picgp_core::processor::ProcessorDescriptor;
use std::time::Duration;

const TABLE_POINTER_MASK: u32 = 0x3F_FFFF;
const ROW_MASK: u32 = !(WRITE_BUFFER_SIZE as u32 - 1);

/// Configuration for the simulated target
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// PGC pin
    pub clock: u32,
    /// PGD pin
    pub data: u32,
    /// MCLR/Vpp pin
    pub vpp: u32,
    /// PGM pin, if wired
    pub pgm: Option<u32>,
    /// Value returned from DEVID1/DEVID2, revision bits included
    pub device_id: u16,
    /// Program memory size in bytes
    pub memory_size: u32,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            clock: 3,
            data: 2,
            vpp: 4,
            pgm: None,
            device_id: 0x5920, // PIC18F26J13
            memory_size: 64 * 1024,
        }
    }
}

impl DummyConfig {
    /// Configuration for a processor from the table, on the default pins
    pub fn for_processor(processor: &ProcessorDescriptor) -> Self {
        Self {
            device_id: processor.id,
            memory_size: processor.memory_size,
            ..Self::default()
        }
    }
}

/// A timing or sequencing rule broken by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// First clock after Vpp rose came before P12
    EntryHold,
    /// Programming clock held high for less than P9; the row was dropped
    ProgramHold {
        /// Row that was not committed
        row: u32,
    },
    /// Clock rose again before P10 after programming
    Discharge,
    /// Clock rose again before the bulk erase finished; nothing was erased
    Erase,
    /// Programming started without EECON1.WREN set; the row was dropped
    WriteNotEnabled {
        /// Row that was not committed
        row: u32,
    },
}

/// A 64 byte row committed to program memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgrammedRow {
    /// Row start address
    pub address: u32,
    /// Holding latch contents at commit time
    pub data: [u8; WRITE_BUFFER_SIZE],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Run,
    KeyEntry { key: u32 },
    Program,
}

#[derive(Debug, Clone, Copy)]
enum Shift {
    Command { bits: u8, value: u8 },
    Payload { command: u8, bits: u8, value: u16 },
}

impl Shift {
    fn idle() -> Self {
        Self::Command { bits: 0, value: 0 }
    }
}

fn is_read_command(command: u8) -> bool {
    matches!(
        command,
        opcodes::TABLE_READ | opcodes::TABLE_READ_POSTINC | opcodes::SHIFT_OUT_TABLAT
    )
}

/// Simulated PIC18F-xxJxx behind a [`GpioBackend`]
pub struct DummyTarget {
    config: DummyConfig,
    clock: VirtualClock,
    open_pins: Option<Vec<u32>>,

    pgc: bool,
    host_pgd: bool,
    pgd_is_input: bool,
    target_pgd: bool,
    vpp: bool,
    pgm: bool,

    mode: Mode,
    shift: Shift,
    rose_at: Duration,
    vpp_rose_at: Option<Duration>,
    discharge_from: Option<Duration>,
    erase_from: Option<Duration>,

    w: u8,
    table_pointer: u32,
    tablat: u8,
    wren: bool,
    erase_control: [u8; 2],
    erase_armed: bool,
    pending_row: Option<u32>,
    latches: [u8; WRITE_BUFFER_SIZE],

    memory: Vec<u8>,
    flips: Vec<(u32, u8)>,
    rows: Vec<ProgrammedRow>,
    table_loads: Vec<u32>,
    erases: usize,
    violations: Vec<Violation>,
    value_writes: usize,
    direction_writes: usize,
    reads: usize,
}

impl DummyTarget {
    /// Create an erased target that reads time from `clock`
    pub fn new(config: DummyConfig, clock: VirtualClock) -> Self {
        let memory = vec![0xFF; config.memory_size as usize];
        Self {
            config,
            clock,
            open_pins: None,
            pgc: false,
            host_pgd: false,
            pgd_is_input: false,
            target_pgd: false,
            vpp: false,
            pgm: false,
            mode: Mode::Run,
            shift: Shift::idle(),
            rose_at: Duration::ZERO,
            vpp_rose_at: None,
            discharge_from: None,
            erase_from: None,
            w: 0,
            table_pointer: 0,
            tablat: 0,
            wren: false,
            erase_control: [0; 2],
            erase_armed: false,
            pending_row: None,
            latches: [0xFF; WRITE_BUFFER_SIZE],
            memory,
            flips: Vec::new(),
            rows: Vec::new(),
            table_loads: Vec::new(),
            erases: 0,
            violations: Vec::new(),
            value_writes: 0,
            direction_writes: 0,
            reads: 0,
        }
    }

    /// Create a target with pre-filled program memory from address 0
    pub fn with_data(config: DummyConfig, clock: VirtualClock, data: &[u8]) -> Self {
        let mut target = Self::new(config, clock);
        let len = data.len().min(target.memory.len());
        target.memory[..len].copy_from_slice(&data[..len]);
        target
    }

    /// XOR `mask` into the byte at `address` whenever its row is programmed
    pub fn with_flipped_bit(mut self, address: u32, mask: u8) -> Self {
        self.flips.push((address, mask));
        self
    }

    /// Configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Program memory contents
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Rows committed so far, in order
    pub fn rows(&self) -> &[ProgrammedRow] {
        &self.rows
    }

    /// TBLPTR values set by an explicit load, in order
    ///
    /// A load completes with the write to TBLPTRU.
    pub fn table_loads(&self) -> &[u32] {
        &self.table_loads
    }

    /// Number of completed bulk erases
    pub fn erases(&self) -> usize {
        self.erases
    }

    /// Rules broken by the host so far
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Number of value writes that reached the backend
    pub fn value_writes(&self) -> usize {
        self.value_writes
    }

    /// Number of direction writes that reached the backend
    pub fn direction_writes(&self) -> usize {
        self.direction_writes
    }

    /// Number of pin reads
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Whether the target is in program mode
    pub fn in_program_mode(&self) -> bool {
        self.mode == Mode::Program
    }

    fn check_pin(&self, pin: u32) -> Result<()> {
        let open = self.open_pins.as_ref().ok_or(Error::NotOpen(pin))?;
        if open.contains(&pin) {
            Ok(())
        } else {
            Err(Error::NotOpen(pin))
        }
    }

    fn is_wired(&self, pin: u32) -> bool {
        pin == self.config.clock
            || pin == self.config.data
            || pin == self.config.vpp
            || self.config.pgm == Some(pin)
    }

    fn violation(&mut self, violation: Violation) {
        log::warn!("dummy: {:?}", violation);
        self.violations.push(violation);
    }

    fn vpp_rising(&mut self) {
        self.mode = match self.mode {
            Mode::KeyEntry { key } if key == PROGRAM_ENTRY_KEY => {
                log::debug!("dummy: entered program mode");
                self.shift = Shift::idle();
                self.wren = false;
                self.erase_armed = false;
                self.erase_control = [0; 2];
                self.pending_row = None;
                self.vpp_rose_at = Some(self.clock.elapsed());
                Mode::Program
            }
            _ => Mode::Run,
        };
    }

    fn vpp_falling(&mut self) {
        if self.mode == Mode::Program {
            log::debug!("dummy: left program mode");
        }
        self.mode = Mode::KeyEntry { key: 0 };
    }

    fn clock_rising(&mut self) {
        let now = self.clock.elapsed();
        self.rose_at = now;

        match self.mode {
            Mode::KeyEntry { key } => {
                self.mode = Mode::KeyEntry {
                    key: (key << 1) | self.host_pgd as u32,
                };
            }
            Mode::Program => {
                if let Some(t) = self.vpp_rose_at.take() {
                    if now - t < delays::ENTRY_HOLD {
                        self.violation(Violation::EntryHold);
                    }
                }
                if let Some(t) = self.discharge_from.take() {
                    if now - t < delays::DISCHARGE_TIME {
                        self.violation(Violation::Discharge);
                    }
                }
                if let Some(t) = self.erase_from.take() {
                    if now - t < delays::ERASE_TIME {
                        self.violation(Violation::Erase);
                    } else {
                        self.memory.fill(0xFF);
                        self.erases += 1;
                        log::debug!("dummy: bulk erase complete");
                    }
                }
            }
            Mode::Run => {}
        }
    }

    fn clock_falling(&mut self) {
        if self.mode != Mode::Program {
            return;
        }
        let bit = self.host_pgd;

        self.shift = match self.shift {
            Shift::Command { bits, value } => {
                let value = value | (bit as u8) << bits;
                let bits = bits + 1;
                if bits < 4 {
                    Shift::Command { bits, value }
                } else {
                    self.end_of_command();
                    self.start_command(value);
                    Shift::Payload {
                        command: value,
                        bits: 0,
                        value: 0,
                    }
                }
            }
            Shift::Payload {
                command,
                bits,
                value,
            } => {
                let value = value | (bit as u16) << bits;
                let bits = bits + 1;
                if is_read_command(command) && bits > 8 {
                    self.target_pgd = (self.tablat >> (bits - 9)) & 1 != 0;
                }
                if bits < 16 {
                    Shift::Payload {
                        command,
                        bits,
                        value,
                    }
                } else {
                    self.execute(command, value);
                    Shift::idle()
                }
            }
        };
    }

    /// Fourth falling edge of any command
    fn end_of_command(&mut self) {
        let now = self.clock.elapsed();

        if let Some(row) = self.pending_row.take() {
            if now - self.rose_at >= delays::PROGRAM_TIME {
                self.commit(row);
                self.discharge_from = Some(now);
            } else {
                self.violation(Violation::ProgramHold { row });
            }
            self.latches = [0xFF; WRITE_BUFFER_SIZE];
        }

        if self.erase_armed {
            self.erase_armed = false;
            self.erase_from = Some(now);
        }
    }

    fn start_command(&mut self, command: u8) {
        match command {
            opcodes::TABLE_READ => self.tablat = self.read_byte(self.table_pointer),
            opcodes::TABLE_READ_POSTINC => {
                self.tablat = self.read_byte(self.table_pointer);
                self.advance_table_pointer(1);
            }
            _ => {}
        }
    }

    fn execute(&mut self, command: u8, payload: u16) {
        match command {
            opcodes::CORE_INSTRUCTION => self.core_instruction(payload),
            opcodes::TABLE_WRITE => self.table_write(payload),
            opcodes::TABLE_WRITE_POSTINC2 => {
                self.latch_word(payload);
                self.advance_table_pointer(2);
            }
            opcodes::TABLE_WRITE_POSTINC2_PROGRAM => {
                self.latch_word(payload);
                self.pending_row = Some(self.table_pointer & ROW_MASK);
                self.advance_table_pointer(2);
            }
            opcodes::TABLE_WRITE_PROGRAM => {
                self.latch_word(payload);
                self.pending_row = Some(self.table_pointer & ROW_MASK);
            }
            c if is_read_command(c) => {}
            c => log::trace!("dummy: ignoring command 0b{:04b}", c),
        }
    }

    fn core_instruction(&mut self, word: u16) {
        if let Some(k) = opcodes::movlw_operand(word) {
            self.w = k;
            return;
        }

        let [low, high, upper, _] = self.table_pointer.to_le_bytes();
        match word {
            opcodes::MOVWF_TBLPTRL => {
                self.table_pointer = u32::from_le_bytes([self.w, high, upper, 0]);
            }
            opcodes::MOVWF_TBLPTRH => {
                self.table_pointer = u32::from_le_bytes([low, self.w, upper, 0]);
            }
            opcodes::MOVWF_TBLPTRU => {
                self.table_pointer =
                    u32::from_le_bytes([low, high, self.w, 0]) & TABLE_POINTER_MASK;
                self.table_loads.push(self.table_pointer);
            }
            opcodes::BSF_EECON1_WREN => self.wren = true,
            opcodes::NOP => {
                if self.erase_control == [0x80, 0x01] {
                    log::debug!("dummy: bulk erase started");
                    self.erase_control = [0; 2];
                    self.erase_armed = true;
                }
            }
            other => log::trace!("dummy: ignoring instruction 0x{:04X}", other),
        }
    }

    fn advance_table_pointer(&mut self, n: u32) {
        self.table_pointer = (self.table_pointer + n) & TABLE_POINTER_MASK;
    }

    /// Byte lane of a 16-bit table write payload selected by TBLPTR<0>
    fn payload_byte(&self, payload: u16) -> u8 {
        let [low, high] = payload.to_le_bytes();
        if self.table_pointer & 1 == 0 {
            low
        } else {
            high
        }
    }

    fn table_write(&mut self, payload: u16) {
        let byte = self.payload_byte(payload);
        match self.table_pointer {
            ERASE_CONTROL_LOW => self.erase_control[0] = byte,
            ERASE_CONTROL_HIGH => self.erase_control[1] = byte,
            a if a < self.config.memory_size => {
                self.latches[(a & !ROW_MASK) as usize] = byte;
            }
            a => log::trace!("dummy: ignoring table write to 0x{:06X}", a),
        }
    }

    fn latch_word(&mut self, payload: u16) {
        let offset = (self.table_pointer & !ROW_MASK & !1) as usize;
        let [low, high] = payload.to_le_bytes();
        self.latches[offset] = low;
        self.latches[offset + 1] = high;
    }

    fn commit(&mut self, row: u32) {
        if !self.wren {
            self.violation(Violation::WriteNotEnabled { row });
            return;
        }
        let end = row + WRITE_BUFFER_SIZE as u32;
        if end > self.config.memory_size {
            log::warn!("dummy: row 0x{:06X} is outside program memory", row);
            return;
        }

        let cells = &mut self.memory[row as usize..end as usize];
        for (cell, &latch) in cells.iter_mut().zip(&self.latches) {
            // Programming can only clear bits
            *cell &= latch;
        }
        for &(address, mask) in &self.flips {
            if (row..end).contains(&address) {
                self.memory[address as usize] ^= mask;
            }
        }

        log::trace!("dummy: committed row 0x{:06X}", row);
        self.rows.push(ProgrammedRow {
            address: row,
            data: self.latches,
        });
    }

    fn read_byte(&self, address: u32) -> u8 {
        let [id_low, id_high] = self.config.device_id.to_le_bytes();
        match address {
            DEVICE_ID_ADDRESS => id_low,
            a if a == DEVICE_ID_ADDRESS + 1 => id_high,
            a if a < self.config.memory_size => self.memory[a as usize],
            _ => 0x00,
        }
    }
}

impl GpioBackend for DummyTarget {
    type Error = Error;

    fn open(&mut self, pins: &[u32]) -> Result<()> {
        if self.open_pins.is_some() {
            return Err(Error::AlreadyOpen);
        }
        if let Some(&pin) = pins.iter().find(|&&p| !self.is_wired(p)) {
            return Err(Error::Unconnected(pin));
        }
        self.open_pins = Some(pins.to_vec());
        Ok(())
    }

    fn write_direction(&mut self, pin: u32, direction: Direction) -> Result<()> {
        self.check_pin(pin)?;
        self.direction_writes += 1;
        if pin == self.config.data {
            self.pgd_is_input = direction == Direction::Input;
        }
        Ok(())
    }

    fn write_value(&mut self, pin: u32, level: Level) -> Result<()> {
        self.check_pin(pin)?;
        self.value_writes += 1;
        let high = level.is_high();

        if pin == self.config.clock {
            match (self.pgc, high) {
                (false, true) => self.clock_rising(),
                (true, false) => self.clock_falling(),
                _ => {}
            }
            self.pgc = high;
        } else if pin == self.config.data {
            self.host_pgd = high;
        } else if pin == self.config.vpp {
            match (self.vpp, high) {
                (false, true) => self.vpp_rising(),
                (true, false) => self.vpp_falling(),
                _ => {}
            }
            self.vpp = high;
        } else {
            self.pgm = high;
        }
        Ok(())
    }

    fn read_value(&mut self, pin: u32) -> Result<u8> {
        self.check_pin(pin)?;
        self.reads += 1;

        let high = if pin == self.config.data {
            if self.pgd_is_input {
                self.target_pgd
            } else {
                self.host_pgd
            }
        } else if pin == self.config.clock {
            self.pgc
        } else if pin == self.config.vpp {
            self.vpp
        } else {
            self.pgm
        };
        Ok(high as u8)
    }

    fn close(&mut self) -> Result<()> {
        self.open_pins.take().ok_or(Error::NotOpen(self.config.clock))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picgp_core::gpio::GpioController;
    use picgp_core::icsp::{CommParams, Icsp};
    use picgp_core::processor::p18fxxjxx::P18FxxJxx;
    use picgp_core::processor::Processor;

    fn setup() -> (VirtualClock, GpioController<DummyTarget>, CommParams) {
        let clock = VirtualClock::new();
        let target = DummyTarget::new(DummyConfig::default(), clock.clone());
        let params = CommParams::new(3, 2).with_vpp(4);
        let gpio = GpioController::open(target, &params.pins()).unwrap();
        (clock, gpio, params)
    }

    #[test]
    fn test_key_enters_program_mode() {
        let (clock, mut gpio, params) = setup();
        {
            let icsp = Icsp::new(&mut gpio, &clock, params.clone());
            let mut driver = P18FxxJxx::new(icsp, None);
            driver.enter_program_mode().unwrap();
        }
        assert!(gpio.backend().in_program_mode());
        assert!(gpio.backend().violations().is_empty());
    }

    #[test]
    fn test_wrong_key_is_ignored() {
        let (clock, mut gpio, params) = setup();
        {
            let mut icsp = Icsp::new(&mut gpio, &clock, params);
            icsp.set_vpp(Level::High).unwrap();
            icsp.set_vpp(Level::Low).unwrap();
            for i in (0..32).rev() {
                icsp.send_bit_fetch_on_rise(Level::of_bit(0x1234_5678, i))
                    .unwrap();
            }
            icsp.set_clock(Level::Low).unwrap();
            icsp.set_vpp(Level::High).unwrap();
        }
        assert!(!gpio.backend().in_program_mode());
    }

    #[test]
    fn test_unwired_pin_is_rejected() {
        let target = DummyTarget::new(DummyConfig::default(), VirtualClock::new());
        assert!(GpioController::open(target, &[3, 2, 4, 17]).is_err());
    }

    #[test]
    fn test_short_program_hold_drops_row() {
        let (clock, mut gpio, params) = setup();
        {
            let icsp = Icsp::new(&mut gpio, &clock, params.clone());
            let mut driver = P18FxxJxx::new(icsp, None);
            driver.enter_program_mode().unwrap();
        }
        {
            let mut icsp = Icsp::new(&mut gpio, &clock, params);
            icsp.core_instruction(opcodes::BSF_EECON1_WREN).unwrap();
            icsp.load_table_pointer(0x200).unwrap();
            for _ in 0..31 {
                icsp.send_command(opcodes::TABLE_WRITE_POSTINC2).unwrap();
                icsp.send_payload(0x0000).unwrap();
            }
            icsp.send_command(opcodes::TABLE_WRITE_POSTINC2_PROGRAM)
                .unwrap();
            icsp.send_payload(0x0000).unwrap();
            // Plain NOP, no hold
            icsp.core_instruction(opcodes::NOP).unwrap();
        }

        let target = gpio.backend();
        assert!(target.rows().is_empty());
        assert_eq!(
            target.violations(),
            &[Violation::ProgramHold { row: 0x200 }]
        );
        assert!(target.memory()[0x200..0x240].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_device_id_read() {
        let (clock, mut gpio, params) = setup();
        let icsp = Icsp::new(&mut gpio, &clock, params);
        let mut driver = P18FxxJxx::new(icsp, None);
        driver.enter_program_mode().unwrap();
        assert_eq!(driver.check_processor_type().unwrap().name, "PIC18F26J13");
    }
}
