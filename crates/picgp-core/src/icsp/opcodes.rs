//! PIC18 ICSP commands and core instructions
//!
//! Commands are 4 bits wide and sent least significant bit first, followed
//! by a 16 bit payload. For [`CORE_INSTRUCTION`] the payload is a PIC18
//! instruction word executed by the target.

// ============================================================================
// 4-bit commands
// ============================================================================

/// Execute the payload as a core instruction
pub const CORE_INSTRUCTION: u8 = 0b0000;
/// Shift out the TABLAT register
pub const SHIFT_OUT_TABLAT: u8 = 0b0010;
/// Table read
pub const TABLE_READ: u8 = 0b1000;
/// Table read, post-increment
pub const TABLE_READ_POSTINC: u8 = 0b1001;
/// Table write
pub const TABLE_WRITE: u8 = 0b1100;
/// Table write, post-increment by 2
pub const TABLE_WRITE_POSTINC2: u8 = 0b1101;
/// Table write, post-increment by 2, start programming
pub const TABLE_WRITE_POSTINC2_PROGRAM: u8 = 0b1110;
/// Table write, start programming
pub const TABLE_WRITE_PROGRAM: u8 = 0b1111;

// ============================================================================
// Core instructions
// ============================================================================

/// No operation
pub const NOP: u16 = 0x0000;
/// MOVWF TBLPTRU
pub const MOVWF_TBLPTRU: u16 = 0x6EF8;
/// MOVWF TBLPTRH
pub const MOVWF_TBLPTRH: u16 = 0x6EF7;
/// MOVWF TBLPTRL
pub const MOVWF_TBLPTRL: u16 = 0x6EF6;
/// BSF EECON1, WREN
pub const BSF_EECON1_WREN: u16 = 0x84A6;

/// MOVLW k
pub const fn movlw(k: u8) -> u16 {
    0x0E00 | k as u16
}

/// Literal operand of a MOVLW instruction, if `word` is one
pub const fn movlw_operand(word: u16) -> Option<u8> {
    if word & 0xFF00 == 0x0E00 {
        Some(word as u8)
    } else {
        None
    }
}
