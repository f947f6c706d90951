//! List command implementation

use picgp_core::processor::PROCESSORS;

/// List all supported processors
pub fn list_processors() {
    println!("Supported processors:");
    println!();
    println!("{:<16} {:>8} {:>8} {:>10}  Family", "Name", "ID", "Mask", "Memory");
    println!("{}", "-".repeat(60));

    for p in PROCESSORS {
        println!(
            "{:<16} {:>8} {:>8} {:>10}  {}",
            p.name,
            format!("0x{:04X}", p.id),
            format!("0x{:04X}", p.mask),
            format_size(p.memory_size),
            p.family
        );
    }
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
