//! Configuration file loading
//!
//! A configuration file holds `key=value` lines. Blank lines and lines
//! starting with `#` are skipped. Entries that cannot be understood are
//! reported and ignored, leaving the previous value in place.

use crate::cli::{parse_period, Backend, Cli};
use clap::ValueEnum;
use picgp_core::icsp::CommParams;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// System wide configuration file
const SYSTEM_CONFIG: &str = "/etc/picgp.conf";
/// Per-user configuration file, relative to $HOME
const USER_CONFIG: &str = ".picgp.conf";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file could not be read
    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Effective settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub clock: u32,
    pub data: u32,
    pub vpp: Option<u32>,
    pub pgm: Option<u32>,
    pub period: Option<Duration>,
    pub processor: Option<String>,
    pub backend: Backend,
    pub gpiochip: String,
    pub sysfs: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            clock: 3,
            data: 2,
            vpp: Some(4),
            pgm: None,
            period: None,
            processor: None,
            backend: Backend::Sysfs,
            gpiochip: "/dev/gpiochip0".to_string(),
            sysfs: PathBuf::from("/sys/class/gpio"),
        }
    }
}

fn parse_gpio(value: &str) -> Result<u32, String> {
    value
        .parse()
        .map_err(|e| format!("Invalid GPIO number: {}", e))
}

impl Settings {
    /// Load the configuration files
    ///
    /// With `path`, only that file is read and it must exist. Otherwise the
    /// system and user files are read in that order if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                settings.apply_str(&text, &path.display().to_string());
            }
            None => {
                let mut candidates = vec![PathBuf::from(SYSTEM_CONFIG)];
                if let Some(home) = std::env::var_os("HOME") {
                    candidates.push(PathBuf::from(home).join(USER_CONFIG));
                }
                for candidate in candidates.iter().filter(|p| p.is_file()) {
                    match std::fs::read_to_string(candidate) {
                        Ok(text) => settings.apply_str(&text, &candidate.display().to_string()),
                        Err(e) => log::warn!("Skipping {}: {}", candidate.display(), e),
                    }
                }
            }
        }

        Ok(settings)
    }

    /// Apply the entries of a configuration file
    ///
    /// `origin` names the file in warnings.
    pub fn apply_str(&mut self, text: &str, origin: &str) {
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                log::warn!("{}:{}: expected key=value, ignoring '{}'", origin, n + 1, line);
                continue;
            };

            if let Err(e) = self.apply_entry(key.trim(), value.trim()) {
                log::warn!("{}:{}: {}", origin, n + 1, e);
            }
        }
    }

    fn apply_entry(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "clock" => self.clock = parse_gpio(value)?,
            "data" => self.data = parse_gpio(value)?,
            "vpp" if value.eq_ignore_ascii_case("none") => self.vpp = None,
            "vpp" => self.vpp = Some(parse_gpio(value)?),
            "pgm" => self.pgm = Some(parse_gpio(value)?),
            "period" => self.period = Some(parse_period(value)?),
            "processor" => self.processor = Some(value.to_string()),
            "backend" => self.backend = Backend::from_str(value, true)?,
            "gpiochip" => self.gpiochip = value.to_string(),
            "sysfs" => self.sysfs = PathBuf::from(value),
            _ => return Err(format!("unknown key '{}'", key)),
        }
        Ok(())
    }

    /// Override settings with the options given on the command line
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(clock) = cli.clock {
            self.clock = clock;
        }
        if let Some(data) = cli.data {
            self.data = data;
        }
        if let Some(vpp) = cli.vpp {
            self.vpp = Some(vpp);
        }
        if cli.no_vpp {
            self.vpp = None;
        }
        if let Some(pgm) = cli.pgm {
            self.pgm = Some(pgm);
        }
        if let Some(period) = cli.period {
            self.period = Some(period);
        }
        if let Some(processor) = &cli.processor {
            self.processor = Some(processor.clone());
        }
        if let Some(backend) = cli.backend {
            self.backend = backend;
        }
        if let Some(gpiochip) = &cli.gpiochip {
            self.gpiochip = gpiochip.clone();
        }
        if let Some(sysfs) = &cli.sysfs {
            self.sysfs = sysfs.clone();
        }
    }

    /// Pin assignment and pacing for the programming engine
    pub fn comm_params(&self) -> CommParams {
        CommParams {
            clock: self.clock,
            data: self.data,
            vpp: self.vpp,
            pgm: self.pgm,
            period: self.period,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults() {
        let params = Settings::default().comm_params();
        assert_eq!(params, CommParams::new(3, 2).with_vpp(4));
    }

    #[test]
    fn test_apply_str() {
        let mut settings = Settings::default();
        settings.apply_str(
            "# wiring\n\
             clock = 17\n\
             data=27\n\
             pgm=22\n\
             \n\
             period=0.00001\n\
             processor=PIC18F46J50\n\
             backend=cdev\n\
             gpiochip=/dev/gpiochip1\n",
            "test",
        );

        assert_eq!(settings.clock, 17);
        assert_eq!(settings.data, 27);
        assert_eq!(settings.vpp, Some(4));
        assert_eq!(settings.pgm, Some(22));
        assert_eq!(settings.period, Some(Duration::from_micros(10)));
        assert_eq!(settings.processor.as_deref(), Some("PIC18F46J50"));
        assert_eq!(settings.backend, Backend::Cdev);
        assert_eq!(settings.gpiochip, "/dev/gpiochip1");
    }

    #[test]
    fn test_malformed_entries_keep_defaults() {
        let mut settings = Settings::default();
        settings.apply_str(
            "clock=abc\nvpp\ncolor=blue\nperiod=-1\nbackend=parport\n",
            "test",
        );
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut settings = Settings::default();
        settings.apply_str("clock=17\ndata=27\nbackend=cdev\n", "test");

        let cli = Cli::parse_from(["picgp", "-c", "5", "--backend", "dummy", "image.hex"]);
        settings.apply_cli(&cli);

        assert_eq!(settings.clock, 5);
        assert_eq!(settings.data, 27);
        assert_eq!(settings.backend, Backend::Dummy);
    }

    #[test]
    fn test_vpp_can_be_unset() {
        let mut settings = Settings::default();
        settings.apply_str("vpp=none\n", "test");
        assert_eq!(settings.vpp, None);

        let mut settings = Settings::default();
        let cli = Cli::parse_from(["picgp", "--no-vpp", "-g", "22", "image.hex"]);
        settings.apply_cli(&cli);
        assert_eq!(settings.vpp, None);
        assert!(matches!(
            settings.comm_params().validate(),
            Err(picgp_core::Error::MissingVpp)
        ));
    }

    #[test]
    fn test_missing_explicit_file() {
        let path = Path::new("/nonexistent/picgp.conf");
        assert!(matches!(
            Settings::load(Some(path)),
            Err(ConfigError::Read { .. })
        ));
    }
}
