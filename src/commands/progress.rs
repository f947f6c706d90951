//! Progress reporting with indicatif

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use picgp_core::ops::Progress;
use picgp_core::processor::ProcessorDescriptor;
use std::time::Duration;

/// Progress reporter using indicatif progress bars
pub struct IndicatifProgress {
    multi: MultiProgress,
    current_bar: Option<ProgressBar>,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            current_bar: None,
        }
    }

    fn create_bar(&mut self, total: u64, phase: &'static str) {
        let pb = self.multi.add(ProgressBar::new(total));
        pb.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                    phase
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        self.current_bar = Some(pb);
    }

    fn create_spinner(&mut self, message: String) {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        self.current_bar = Some(pb);
    }

    fn set_position(&self, pos: usize) {
        if let Some(pb) = &self.current_bar {
            pb.set_position(pos as u64);
        }
    }

    /// Finish the current bar, if any
    pub fn finish(&mut self, message: &'static str) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_with_message(message);
        }
    }
}

impl Drop for IndicatifProgress {
    fn drop(&mut self) {
        // Leave an interrupted bar on screen instead of a spinning one
        if let Some(pb) = self.current_bar.take() {
            pb.abandon();
        }
    }
}

impl Progress for IndicatifProgress {
    fn identified(&mut self, processor: &ProcessorDescriptor) {
        let _ = self.multi.println(format!(
            "Found {} ({} KiB program memory)",
            processor.name,
            processor.memory_size / 1024
        ));
    }

    fn erasing(&mut self) {
        self.create_spinner("Erasing...".to_string());
    }

    fn writing(&mut self, total_bytes: usize) {
        self.finish("Erase complete");
        self.create_bar(total_bytes as u64, "Writing");
    }

    fn write_progress(&mut self, bytes_written: usize) {
        self.set_position(bytes_written);
    }

    fn verifying(&mut self, total_bytes: usize) {
        self.finish("Write complete");
        self.create_bar(total_bytes as u64, "Verifying");
    }

    fn verify_progress(&mut self, bytes_verified: usize) {
        self.set_position(bytes_verified);
    }

    fn reading(&mut self, total_bytes: usize) {
        self.create_bar(total_bytes as u64, "Reading");
    }

    fn read_progress(&mut self, bytes_read: usize) {
        self.set_position(bytes_read);
    }
}
