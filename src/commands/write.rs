//! Write command implementation

use super::progress::IndicatifProgress;
use picgp_core::gpio::{GpioBackend, GpioController};
use picgp_core::icsp::CommParams;
use picgp_core::image::{self, ProgramImage};
use picgp_core::ops;
use picgp_core::timing::Clock;
use std::path::Path;

/// Load an Intel HEX file
pub fn load_image(path: &Path) -> Result<ProgramImage, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let image = image::ihex::parse(&text)?;
    log::info!(
        "Loaded {} bytes in {} segments from {}",
        image.len(),
        image::segments(&image).len(),
        path.display()
    );
    Ok(image)
}

/// Run the write command
pub fn run_write<B: GpioBackend, C: Clock>(
    backend: B,
    clock: &C,
    params: &CommParams,
    processor: Option<&str>,
    image: &ProgramImage,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut gpio = GpioController::open(backend, &params.pins())?;

    let mut progress = IndicatifProgress::new();
    let stats = ops::write(&mut gpio, clock, params, processor, image, &mut progress)?;
    progress.finish("Verify complete");

    gpio.close()?;

    println!(
        "Wrote and verified {} bytes in {} segments on {}",
        stats.bytes_written, stats.segments, stats.processor.name
    );
    Ok(())
}
