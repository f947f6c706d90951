//! Read command implementation

use super::progress::IndicatifProgress;
use picgp_core::gpio::{GpioBackend, GpioController};
use picgp_core::icsp::CommParams;
use picgp_core::image::ihex;
use picgp_core::ops;
use picgp_core::timing::Clock;
use std::io::Write;
use std::path::Path;

/// Run the read command
///
/// The result is written as Intel HEX to `output`, or to stdout.
pub fn run_read<B: GpioBackend, C: Clock>(
    backend: B,
    clock: &C,
    params: &CommParams,
    processor: Option<&str>,
    start: Option<u32>,
    size: Option<u32>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut gpio = GpioController::open(backend, &params.pins())?;

    let mut progress = IndicatifProgress::new();
    let result = ops::read(&mut gpio, clock, params, processor, start, size, &mut progress)?;
    progress.finish("Read complete");

    gpio.close()?;

    let text = ihex::emit(&result.image);
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            eprintln!(
                "Read {} bytes from {} to {}",
                result.image.len(),
                result.processor.name,
                path.display()
            );
        }
        None => std::io::stdout().write_all(text.as_bytes())?,
    }
    Ok(())
}
