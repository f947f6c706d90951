//! CLI argument parsing

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a clock period given in seconds
pub fn parse_period(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("Invalid period: {}", e))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("Invalid period: {}", e))
}

/// Host GPIO interface
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    /// Legacy /sys/class/gpio interface
    #[default]
    Sysfs,
    /// GPIO character device (/dev/gpiochipN)
    Cdev,
    /// Simulated target, no hardware access
    Dummy,
}

#[derive(Parser)]
#[command(name = "picgp")]
#[command(
    author,
    version,
    about = "PIC18 in-circuit serial programmer using host GPIO",
    long_about = None
)]
pub struct Cli {
    /// Intel HEX file to write (or to save to with --read; stdout if absent)
    pub file: Option<PathBuf>,

    /// Read program memory instead of writing it
    #[arg(short, long)]
    pub read: bool,

    /// Start address for --read (hex with 0x prefix, or decimal)
    #[arg(short, long, value_parser = parse_hex_u32, requires = "read")]
    pub address: Option<u32>,

    /// Number of bytes for --read (default: to the end of program memory)
    #[arg(short, long, value_parser = parse_hex_u32, requires = "read")]
    pub size: Option<u32>,

    /// GPIO connected to PGC
    #[arg(short, long, value_name = "GPIO")]
    pub clock: Option<u32>,

    /// GPIO connected to PGD
    #[arg(short, long, value_name = "GPIO")]
    pub data: Option<u32>,

    /// GPIO connected to MCLR/Vpp
    #[arg(short = 'm', long, value_name = "GPIO")]
    pub vpp: Option<u32>,

    /// MCLR/Vpp is not wired to the host
    #[arg(long, conflicts_with = "vpp")]
    pub no_vpp: bool,

    /// GPIO connected to PGM
    #[arg(short = 'g', long, value_name = "GPIO")]
    pub pgm: Option<u32>,

    /// Clock period in seconds (default: as fast as the GPIO allows)
    #[arg(short = 't', long, value_name = "SECONDS", value_parser = parse_period)]
    pub period: Option<Duration>,

    /// Expected processor, e.g. PIC18F26J13 (default: any supported part)
    #[arg(short, long, value_name = "NAME")]
    pub processor: Option<String>,

    /// GPIO interface
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// GPIO chip device for the cdev backend
    #[arg(long, value_name = "PATH")]
    pub gpiochip: Option<String>,

    /// sysfs GPIO class directory for the sysfs backend
    #[arg(long, value_name = "PATH")]
    pub sysfs: Option<PathBuf>,

    /// Configuration file (default: /etc/picgp.conf and ~/.picgp.conf)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// List supported processors and exit
    #[arg(long)]
    pub list: bool,
}
