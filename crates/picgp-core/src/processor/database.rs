//! Processor table
//!
//! Device ids are the DEVID2:DEVID1 pair read from 0x3FFFFE. The low five
//! bits are the silicon revision and are masked off.

use super::{Family, ProcessorDescriptor};

const fn jxx(name: &'static str, id: u16, memory_kib: u32) -> ProcessorDescriptor {
    ProcessorDescriptor {
        name,
        id,
        mask: 0xFFE0,
        memory_size: memory_kib * 1024,
        family: Family::P18FxxJxx,
    }
}

/// All supported processors
pub static PROCESSORS: &[ProcessorDescriptor] = &[
    // PIC18F45J10 family
    jxx("PIC18F24J10", 0x1D00, 16),
    jxx("PIC18F25J10", 0x1C00, 32),
    jxx("PIC18F44J10", 0x1D20, 16),
    jxx("PIC18F45J10", 0x1C20, 32),
    jxx("PIC18LF24J10", 0x1D40, 16),
    jxx("PIC18LF25J10", 0x1C40, 32),
    jxx("PIC18LF44J10", 0x1D60, 16),
    jxx("PIC18LF45J10", 0x1C60, 32),
    // PIC18F46J50 family
    jxx("PIC18F24J50", 0x4C00, 16),
    jxx("PIC18F25J50", 0x4C20, 32),
    jxx("PIC18F26J50", 0x4C40, 64),
    jxx("PIC18F44J50", 0x4C60, 16),
    jxx("PIC18F45J50", 0x4C80, 32),
    jxx("PIC18F46J50", 0x4CA0, 64),
    // PIC18F46J11 family
    jxx("PIC18F24J11", 0x4D80, 16),
    jxx("PIC18F25J11", 0x4DA0, 32),
    jxx("PIC18F26J11", 0x4DC0, 64),
    jxx("PIC18F44J11", 0x4DE0, 16),
    jxx("PIC18F45J11", 0x4E00, 32),
    jxx("PIC18F46J11", 0x4E20, 64),
    // PIC18F47J53 family
    jxx("PIC18F26J53", 0x5820, 64),
    jxx("PIC18F27J53", 0x5860, 128),
    jxx("PIC18F46J53", 0x58A0, 64),
    jxx("PIC18F47J53", 0x58E0, 128),
    // PIC18F47J13 family
    jxx("PIC18F26J13", 0x5920, 64),
    jxx("PIC18F27J13", 0x5960, 128),
    jxx("PIC18F46J13", 0x59A0, 64),
    jxx("PIC18F47J13", 0x59E0, 128),
];
