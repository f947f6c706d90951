//! Programming sequences
//!
//! These functions own the order of operations and nothing else:
//!
//! - write: enter program mode, identify, erase, write and verify, exit
//! - read: enter program mode, identify, read, exit
//!
//! All protocol detail lives in the family driver selected from the
//! requested processor.

use crate::error::{Error, Result};
use crate::gpio::{GpioBackend, GpioController};
use crate::icsp::{CommParams, Icsp};
use crate::image::{self, ProgramImage};
use crate::processor::{self, Processor, ProcessorDescriptor};
use crate::timing::Clock;
use core::ops::Range;

/// Bytes read between progress updates
const READ_CHUNK_SIZE: usize = 256;

/// Progress callbacks for long running operations
pub trait Progress {
    /// Called once the target has been identified
    fn identified(&mut self, processor: &ProcessorDescriptor);

    /// Called before the bulk erase
    fn erasing(&mut self);

    /// Called when starting to write
    fn writing(&mut self, total_bytes: usize);

    /// Called to update write progress
    fn write_progress(&mut self, bytes_written: usize);

    /// Called when starting to verify
    fn verifying(&mut self, total_bytes: usize);

    /// Called to update verify progress
    fn verify_progress(&mut self, bytes_verified: usize);

    /// Called when starting to read
    fn reading(&mut self, total_bytes: usize);

    /// Called to update read progress
    fn read_progress(&mut self, bytes_read: usize);
}

/// A no-op progress reporter
pub struct NoProgress;

impl Progress for NoProgress {
    fn identified(&mut self, _processor: &ProcessorDescriptor) {}
    fn erasing(&mut self) {}
    fn writing(&mut self, _total_bytes: usize) {}
    fn write_progress(&mut self, _bytes_written: usize) {}
    fn verifying(&mut self, _total_bytes: usize) {}
    fn verify_progress(&mut self, _bytes_verified: usize) {}
    fn reading(&mut self, _total_bytes: usize) {}
    fn read_progress(&mut self, _bytes_read: usize) {}
}

/// Outcome of a successful write
#[derive(Debug, Clone)]
pub struct WriteStats {
    /// Identified processor
    pub processor: &'static ProcessorDescriptor,
    /// Number of contiguous segments written
    pub segments: usize,
    /// Number of image bytes written and verified
    pub bytes_written: usize,
}

/// Outcome of a successful read
#[derive(Debug, Clone)]
pub struct ReadResult {
    /// Identified processor
    pub processor: &'static ProcessorDescriptor,
    /// Memory contents
    pub image: ProgramImage,
}

fn requested_processor(name: Option<&str>) -> Result<Option<&'static ProcessorDescriptor>> {
    name.map(|n| processor::find_by_name(n).ok_or_else(|| Error::UnknownProcessor(n.to_string())))
        .transpose()
}

/// Run `f` inside program mode
///
/// Program mode is left on success and, best effort, on failure. A failure
/// to leave program mode after an error is logged and the original error
/// returned.
fn in_program_mode<'p, T>(
    driver: &mut (dyn Processor + 'p),
    f: impl FnOnce(&mut (dyn Processor + 'p)) -> Result<T>,
) -> Result<T> {
    driver.enter_program_mode()?;

    match f(&mut *driver) {
        Ok(value) => {
            driver.exit_program_mode()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(exit_err) = driver.exit_program_mode() {
                log::warn!("Failed to leave program mode: {}", exit_err);
            }
            Err(e)
        }
    }
}

/// Clip a read request to program memory
///
/// `start` defaults to 0 and `size` to the rest of memory. The end is
/// clipped to the last byte of program memory.
pub fn read_range(start: Option<u32>, size: Option<u32>, memory_size: u32) -> Result<Range<u32>> {
    let start = start.unwrap_or(0);
    if start >= memory_size {
        return Err(Error::AddressOutOfRange {
            address: start,
            size: memory_size,
        });
    }

    let end = match size {
        Some(n) => start.saturating_add(n).min(memory_size),
        None => memory_size,
    };
    Ok(start..end)
}

/// Erase the target and write `image` to it, verifying the result
pub fn write<B: GpioBackend, C: Clock>(
    gpio: &mut GpioController<B>,
    clock: &C,
    params: &CommParams,
    processor: Option<&str>,
    image: &ProgramImage,
    progress: &mut dyn Progress,
) -> Result<WriteStats> {
    params.validate()?;
    let requested = requested_processor(processor)?;
    let family = requested.map(|p| p.family).unwrap_or_default();
    let segments = image::segments(image);

    let icsp = Icsp::new(gpio, clock, params.clone());
    let mut driver = family.driver(icsp, requested);

    in_program_mode(driver.as_mut(), |driver| {
        let found = driver.check_processor_type()?;
        progress.identified(found);

        if let Some(last) = segments.last() {
            if last.end() > u64::from(found.memory_size) {
                let address = last.start + (last.len() as u32 - 1);
                return Err(Error::AddressOutOfRange {
                    address,
                    size: found.memory_size,
                });
            }
        }

        progress.erasing();
        driver.bulk_erase()?;
        driver.write_program(&segments, progress)?;

        Ok(WriteStats {
            processor: found,
            segments: segments.len(),
            bytes_written: image.len(),
        })
    })
}

/// Read program memory from `start` for `size` bytes
///
/// See [`read_range`] for how the range is defaulted and clipped.
pub fn read<B: GpioBackend, C: Clock>(
    gpio: &mut GpioController<B>,
    clock: &C,
    params: &CommParams,
    processor: Option<&str>,
    start: Option<u32>,
    size: Option<u32>,
    progress: &mut dyn Progress,
) -> Result<ReadResult> {
    params.validate()?;
    let requested = requested_processor(processor)?;
    let family = requested.map(|p| p.family).unwrap_or_default();

    let icsp = Icsp::new(gpio, clock, params.clone());
    let mut driver = family.driver(icsp, requested);

    in_program_mode(driver.as_mut(), |driver| {
        let found = driver.check_processor_type()?;
        progress.identified(found);

        let range = read_range(start, size, found.memory_size)?;
        let total = range.len();
        log::info!(
            "Reading 0x{:06X}..0x{:06X} ({} bytes)",
            range.start,
            range.end,
            total
        );
        progress.reading(total);

        driver.read_init(range.start)?;
        let mut data = Vec::with_capacity(total);
        while data.len() < total {
            let n = READ_CHUNK_SIZE.min(total - data.len());
            data.extend(driver.read_mem(n)?);
            progress.read_progress(data.len());
        }

        Ok(ReadResult {
            processor: found,
            image: image::from_bytes(range.start, &data),
        })
    })
}
