//! ICSP protocol primitives
//!
//! The target samples PGD on the falling edge of PGC, except while the
//! program mode key is shifted in, where it samples on the rising edge.
//! Data is sent least significant bit first; the key is the only sequence
//! sent most significant bit first.
//!
//! All pin writes go through the [`GpioController`] in program order. Each
//! write is a separate backend call and nothing is batched across a clock
//! edge.

pub mod opcodes;

use crate::error::{Error, Result};
use crate::gpio::{Direction, GpioBackend, GpioController, Level};
use crate::timing::Clock;
use std::time::Duration;

/// Pin assignment and clock pacing for one programming run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommParams {
    /// PGC pin
    pub clock: u32,
    /// PGD pin
    pub data: u32,
    /// MCLR/Vpp pin
    pub vpp: Option<u32>,
    /// PGM pin (low voltage programming enable)
    pub pgm: Option<u32>,
    /// Full clock period; `None` runs as fast as the GPIO allows
    pub period: Option<Duration>,
}

impl CommParams {
    /// Create parameters with only the clock and data pins
    pub fn new(clock: u32, data: u32) -> Self {
        Self {
            clock,
            data,
            vpp: None,
            pgm: None,
            period: None,
        }
    }

    /// Set the Vpp pin
    pub fn with_vpp(mut self, vpp: u32) -> Self {
        self.vpp = Some(vpp);
        self
    }

    /// Set the PGM pin
    pub fn with_pgm(mut self, pgm: u32) -> Self {
        self.pgm = Some(pgm);
        self
    }

    /// Set the clock period
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = Some(period);
        self
    }

    /// Wait inserted after each clock edge
    pub fn half_period(&self) -> Option<Duration> {
        self.period.map(|p| p / 2)
    }

    /// All configured pins
    pub fn pins(&self) -> Vec<u32> {
        [Some(self.clock), Some(self.data), self.vpp, self.pgm]
            .into_iter()
            .flatten()
            .collect()
    }

    /// Reject a PGM pin without a Vpp pin
    ///
    /// Checked before any pin is opened.
    pub fn validate(&self) -> Result<()> {
        if self.pgm.is_some() && self.vpp.is_none() {
            return Err(Error::MissingVpp);
        }
        Ok(())
    }
}

/// Bit level access to a target over borrowed GPIO and clock
pub struct Icsp<'a, B: GpioBackend, C: Clock> {
    gpio: &'a mut GpioController<B>,
    clock: &'a C,
    params: CommParams,
}

impl<'a, B: GpioBackend, C: Clock> Icsp<'a, B, C> {
    /// Wrap a controller and clock
    pub fn new(gpio: &'a mut GpioController<B>, clock: &'a C, params: CommParams) -> Self {
        Self {
            gpio,
            clock,
            params,
        }
    }

    /// Communication parameters
    pub fn params(&self) -> &CommParams {
        &self.params
    }

    /// Clock source
    pub fn clock(&self) -> &C {
        self.clock
    }

    /// Wait half a clock period, if a period is configured
    pub fn hold(&self) {
        if let Some(half) = self.params.half_period() {
            self.clock.wait_for(half);
        }
    }

    /// Drive PGC
    pub fn set_clock(&mut self, level: Level) -> Result<()> {
        self.gpio.set_value(self.params.clock, level)
    }

    /// Drive PGD
    pub fn set_data(&mut self, level: Level) -> Result<()> {
        self.gpio.set_value(self.params.data, level)
    }

    /// Set the direction of PGD
    pub fn set_data_direction(&mut self, direction: Direction) -> Result<()> {
        self.gpio.set_direction(self.params.data, direction)
    }

    /// Set the direction of PGC
    pub fn set_clock_direction(&mut self, direction: Direction) -> Result<()> {
        self.gpio.set_direction(self.params.clock, direction)
    }

    /// Set the direction of Vpp
    pub fn set_vpp_direction(&mut self, direction: Direction) -> Result<()> {
        let vpp = self.params.vpp.ok_or(Error::MissingVpp)?;
        self.gpio.set_direction(vpp, direction)
    }

    /// Drive Vpp
    pub fn set_vpp(&mut self, level: Level) -> Result<()> {
        let vpp = self.params.vpp.ok_or(Error::MissingVpp)?;
        self.gpio.set_value(vpp, level)
    }

    /// Drive PGM low as an output, if the pin is wired
    pub fn park_pgm(&mut self) -> Result<()> {
        if let Some(pgm) = self.params.pgm {
            self.gpio.set_direction(pgm, Direction::Output)?;
            self.gpio.set_value(pgm, Level::Low)?;
        }
        Ok(())
    }

    /// Send one bit, sampled by the target on the falling edge
    pub fn send_bit(&mut self, level: Level) -> Result<()> {
        self.set_clock(Level::High)?;
        self.set_data(level)?;
        self.hold();
        self.set_clock(Level::Low)?;
        self.hold();
        Ok(())
    }

    /// Like [`send_bit`](Self::send_bit), taking PGD back to output after the
    /// rising edge
    ///
    /// After a read PGD is left as an input. Some targets require it to stay
    /// that way until the rising edge of the next command, so the switch is
    /// only made here.
    fn send_bit_switch_output(&mut self, level: Level) -> Result<()> {
        self.set_clock(Level::High)?;
        self.set_data_direction(Direction::Output)?;
        self.set_data(level)?;
        self.hold();
        self.set_clock(Level::Low)?;
        self.hold();
        Ok(())
    }

    /// Send one bit, sampled by the target on the rising edge
    pub fn send_bit_fetch_on_rise(&mut self, level: Level) -> Result<()> {
        self.set_clock(Level::Low)?;
        self.set_data(level)?;
        self.hold();
        self.set_clock(Level::High)?;
        self.hold();
        Ok(())
    }

    /// Send the `n_bits` low bits of `value`, LSB first
    pub fn send_sequence(&mut self, value: u32, n_bits: u32) -> Result<()> {
        for i in 0..n_bits {
            self.send_bit(Level::of_bit(value, i))?;
        }
        Ok(())
    }

    /// Send the first `n_bits` bits of a 4-bit command
    ///
    /// Used directly when the last bit needs non-standard clock timing.
    pub fn send_command_bits(&mut self, command: u8, n_bits: u32) -> Result<()> {
        let command = command as u32;
        for i in 0..n_bits.min(4) {
            if i == 0 {
                self.send_bit_switch_output(Level::of_bit(command, 0))?;
            } else {
                self.send_bit(Level::of_bit(command, i))?;
            }
        }
        Ok(())
    }

    /// Send a 4-bit command
    pub fn send_command(&mut self, command: u8) -> Result<()> {
        self.send_command_bits(command, 4)
    }

    /// Send a 16-bit payload
    pub fn send_payload(&mut self, word: u16) -> Result<()> {
        self.send_sequence(word as u32, 16)
    }

    /// Execute a core instruction on the target
    pub fn core_instruction(&mut self, instruction: u16) -> Result<()> {
        self.send_command(opcodes::CORE_INSTRUCTION)?;
        self.send_payload(instruction)
    }

    /// Load the 22-bit table pointer
    pub fn load_table_pointer(&mut self, address: u32) -> Result<()> {
        let [low, high, upper, _] = address.to_le_bytes();
        log::trace!("icsp: TBLPTR <- 0x{:06X}", address);

        self.core_instruction(opcodes::movlw(low))?;
        self.core_instruction(opcodes::MOVWF_TBLPTRL)?;
        self.core_instruction(opcodes::movlw(high))?;
        self.core_instruction(opcodes::MOVWF_TBLPTRH)?;
        self.core_instruction(opcodes::movlw(upper))?;
        self.core_instruction(opcodes::MOVWF_TBLPTRU)?;
        Ok(())
    }

    /// Clock in the byte the target returns for a table read command
    ///
    /// The first 8 payload bits are zeros driven by the host. PGD is then
    /// released and the target presents one bit per falling edge, LSB first.
    /// PGD stays an input until the next command.
    pub fn shift_in_byte(&mut self) -> Result<u8> {
        self.send_sequence(0, 8)?;
        self.set_data_direction(Direction::Input)?;

        let mut byte = 0u8;
        for i in 0..8 {
            self.set_clock(Level::High)?;
            self.hold();
            self.set_clock(Level::Low)?;
            if self.gpio.get_value(self.params.data)?.is_high() {
                byte |= 1 << i;
            }
            self.hold();
        }
        Ok(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_period() {
        let params = CommParams::new(3, 2).with_period(Duration::from_micros(10));
        assert_eq!(params.half_period(), Some(Duration::from_micros(5)));
        assert_eq!(CommParams::new(3, 2).half_period(), None);
    }

    #[test]
    fn test_pins() {
        let params = CommParams::new(3, 2).with_vpp(4).with_pgm(17);
        assert_eq!(params.pins(), vec![3, 2, 4, 17]);
        assert_eq!(CommParams::new(3, 2).pins(), vec![3, 2]);
    }

    #[test]
    fn test_pgm_requires_vpp() {
        assert!(matches!(
            CommParams::new(3, 2).with_pgm(17).validate(),
            Err(Error::MissingVpp)
        ));
        assert!(CommParams::new(3, 2).with_pgm(17).with_vpp(4).validate().is_ok());
        assert!(CommParams::new(3, 2).validate().is_ok());
    }
}
