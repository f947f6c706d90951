//! picgp - PIC18 in-circuit serial programmer
//!
//! Programs PIC18F-xxJxx microcontrollers over ICSP by bit-banging host GPIO
//! lines, typically on a single board computer.
//!
//! # Architecture
//!
//! The programming engine lives in `picgp-core` and only talks to pins
//! through the `GpioBackend` trait. This binary picks a backend:
//! - **sysfs** / **cdev** - real pins via `picgp-linux-gpio`
//! - **dummy** - a simulated target via `picgp-dummy`, for dry runs
//!
//! Settings come from the configuration files first, then the command line.

mod cli;
mod commands;
mod config;

use clap::Parser;
use cli::{Backend, Cli};
use config::Settings;
use picgp_core::icsp::CommParams;
use picgp_core::image::ProgramImage;
use std::path::PathBuf;

/// What to do once the pins are open
enum Action {
    Write(ProgramImage),
    Read {
        start: Option<u32>,
        size: Option<u32>,
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logger; RUST_LOG still takes precedence
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter(cli.verbose)),
    )
    .init();

    if cli.list {
        commands::list_processors();
        return Ok(());
    }

    let mut settings = Settings::load(cli.config.as_deref())?;
    settings.apply_cli(&cli);
    log::debug!("Settings: {:?}", settings);

    let params = settings.comm_params();
    params.validate()?;

    let action = if cli.read {
        Action::Read {
            start: cli.address,
            size: cli.size,
            output: cli.file.clone(),
        }
    } else {
        let path = cli
            .file
            .as_deref()
            .ok_or("No input file given (use --read to read the device)")?;
        Action::Write(commands::write::load_image(path)?)
    };

    match settings.backend {
        Backend::Sysfs => run_sysfs(&settings, &params, &action),
        Backend::Cdev => run_cdev(&settings, &params, &action),
        Backend::Dummy => run_dummy(&settings, &params, &action),
    }
}

/// Log filter for the given number of `-v` flags
fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn run<B, C>(
    backend: B,
    clock: &C,
    settings: &Settings,
    params: &CommParams,
    action: &Action,
) -> Result<(), Box<dyn std::error::Error>>
where
    B: picgp_core::gpio::GpioBackend,
    C: picgp_core::timing::Clock,
{
    let processor = settings.processor.as_deref();
    match action {
        Action::Write(image) => {
            commands::write::run_write(backend, clock, params, processor, image)
        }
        Action::Read {
            start,
            size,
            output,
        } => commands::read::run_read(
            backend,
            clock,
            params,
            processor,
            *start,
            *size,
            output.as_deref(),
        ),
    }
}

#[cfg(feature = "linux-gpio")]
fn run_sysfs(
    settings: &Settings,
    params: &CommParams,
    action: &Action,
) -> Result<(), Box<dyn std::error::Error>> {
    use picgp_linux_gpio::{SysfsConfig, SysfsGpio};

    let backend = SysfsGpio::new(SysfsConfig::default().with_base(&settings.sysfs));
    run(backend, &picgp_core::timing::SpinClock, settings, params, action)
}

#[cfg(feature = "linux-gpio")]
fn run_cdev(
    settings: &Settings,
    params: &CommParams,
    action: &Action,
) -> Result<(), Box<dyn std::error::Error>> {
    use picgp_linux_gpio::{CdevConfig, CdevGpio};

    let backend = CdevGpio::new(CdevConfig::new(settings.gpiochip.as_str()));
    run(backend, &picgp_core::timing::SpinClock, settings, params, action)
}

#[cfg(not(feature = "linux-gpio"))]
fn run_sysfs(_: &Settings, _: &CommParams, _: &Action) -> Result<(), Box<dyn std::error::Error>> {
    Err("sysfs backend not compiled in (enable the linux-gpio feature)".into())
}

#[cfg(not(feature = "linux-gpio"))]
fn run_cdev(_: &Settings, _: &CommParams, _: &Action) -> Result<(), Box<dyn std::error::Error>> {
    Err("cdev backend not compiled in (enable the linux-gpio feature)".into())
}

#[cfg(feature = "dummy")]
fn run_dummy(
    settings: &Settings,
    params: &CommParams,
    action: &Action,
) -> Result<(), Box<dyn std::error::Error>> {
    use picgp_dummy::{DummyConfig, DummyTarget, VirtualClock};

    // Impersonate the requested part so a dry run identifies as expected
    let base = match settings.processor.as_deref() {
        Some(name) => picgp_core::processor::find_by_name(name)
            .map(DummyConfig::for_processor)
            .unwrap_or_default(),
        None => DummyConfig::default(),
    };
    let config = DummyConfig {
        clock: params.clock,
        data: params.data,
        vpp: params.vpp.unwrap_or(base.vpp),
        pgm: params.pgm,
        ..base
    };

    log::info!("Using simulated target (device id 0x{:04X})", config.device_id);
    let clock = VirtualClock::new();
    let target = DummyTarget::new(config, clock.clone());
    run(target, &clock, settings, params, action)
}

#[cfg(not(feature = "dummy"))]
fn run_dummy(_: &Settings, _: &CommParams, _: &Action) -> Result<(), Box<dyn std::error::Error>> {
    Err("dummy backend not compiled in (enable the dummy feature)".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    #[test]
    fn test_verbosity_raises_logger_filter() {
        let debug = log::Metadata::builder()
            .level(log::Level::Debug)
            .target("picgp")
            .build();
        let trace = log::Metadata::builder()
            .level(log::Level::Trace)
            .target("picgp")
            .build();

        let quiet = env_logger::Builder::new()
            .parse_filters(default_filter(0))
            .build();
        assert!(!quiet.enabled(&debug));

        let verbose = env_logger::Builder::new()
            .parse_filters(default_filter(1))
            .build();
        assert!(verbose.enabled(&debug));
        assert!(!verbose.enabled(&trace));

        let very_verbose = env_logger::Builder::new()
            .parse_filters(default_filter(2))
            .build();
        assert!(very_verbose.enabled(&trace));
    }
}
