//! Full write and read runs against the simulated target

use picgp_core::gpio::GpioController;
use picgp_core::icsp::CommParams;
use picgp_core::image::{self, ihex, ProgramImage};
use picgp_core::ops::{self, NoProgress, Progress};
use picgp_core::processor::ProcessorDescriptor;
use picgp_core::Error;
use picgp_dummy::{DummyConfig, DummyTarget, VirtualClock};
use std::time::Duration;

fn params() -> CommParams {
    CommParams::new(3, 2).with_vpp(4)
}

fn open(target: DummyTarget) -> GpioController<DummyTarget> {
    GpioController::open(target, &params().pins()).unwrap()
}

fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

fn write(
    gpio: &mut GpioController<DummyTarget>,
    clock: &VirtualClock,
    processor: Option<&str>,
    image: &ProgramImage,
) -> picgp_core::Result<ops::WriteStats> {
    ops::write(gpio, clock, &params(), processor, image, &mut NoProgress)
}

fn read(
    gpio: &mut GpioController<DummyTarget>,
    clock: &VirtualClock,
    start: Option<u32>,
    size: Option<u32>,
) -> picgp_core::Result<ops::ReadResult> {
    ops::read(gpio, clock, &params(), None, start, size, &mut NoProgress)
}

#[test]
fn test_identification_ignores_revision() {
    let clock = VirtualClock::new();
    let config = DummyConfig {
        device_id: 0x5923,
        ..DummyConfig::default()
    };
    let mut gpio = open(DummyTarget::new(config, clock.clone()));

    let result = ops::read(
        &mut gpio,
        &clock,
        &params(),
        Some("pic18f26j13"),
        None,
        Some(2),
        &mut NoProgress,
    )
    .unwrap();
    assert_eq!(result.processor.name, "PIC18F26J13");
}

#[test]
fn test_processor_mismatch() {
    let clock = VirtualClock::new();
    let mut gpio = open(DummyTarget::new(DummyConfig::default(), clock.clone()));
    let image = image::from_bytes(0, &[0x12, 0x34]);

    let err = write(&mut gpio, &clock, Some("PIC18F46J13"), &image).unwrap_err();
    assert!(matches!(
        err,
        Error::ProcessorMismatch {
            expected: "PIC18F46J13",
            found: "PIC18F26J13"
        }
    ));

    let target = gpio.backend();
    assert_eq!(target.erases(), 0);
    assert!(target.rows().is_empty());
    assert!(!target.in_program_mode());
}

#[test]
fn test_unknown_device_id() {
    let clock = VirtualClock::new();
    let config = DummyConfig {
        device_id: 0xFFE0,
        ..DummyConfig::default()
    };
    let mut gpio = open(DummyTarget::new(config, clock.clone()));

    let err = read(&mut gpio, &clock, None, None).unwrap_err();
    assert!(matches!(err, Error::UnknownProcessorId(0xFFE0)));
}

#[test]
fn test_full_window_is_one_flush() {
    let clock = VirtualClock::new();
    let mut gpio = open(DummyTarget::new(DummyConfig::default(), clock.clone()));
    let data = pattern(64, 1);

    write(&mut gpio, &clock, None, &image::from_bytes(0x100, &data)).unwrap();

    let rows = gpio.backend().rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].address, 0x100);
    assert_eq!(&rows[0].data[..], &data[..]);
}

#[test]
fn test_one_byte_over_pads_second_flush() {
    let clock = VirtualClock::new();
    let mut gpio = open(DummyTarget::new(DummyConfig::default(), clock.clone()));
    let data = pattern(65, 2);

    write(&mut gpio, &clock, None, &image::from_bytes(0x100, &data)).unwrap();

    let rows = gpio.backend().rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].address, 0x140);
    assert_eq!(rows[1].data[0], data[64]);
    assert!(rows[1].data[1..].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_unaligned_segment_flushes_aligned_windows() {
    let clock = VirtualClock::new();
    let mut gpio = open(DummyTarget::new(DummyConfig::default(), clock.clone()));
    let data = pattern(64, 3);

    write(&mut gpio, &clock, None, &image::from_bytes(0x120, &data)).unwrap();

    let rows = gpio.backend().rows();
    let addresses: Vec<u32> = rows.iter().map(|r| r.address).collect();
    assert_eq!(addresses, vec![0x100, 0x140]);
    assert!(rows[0].data[..0x20].iter().all(|&b| b == 0xFF));
    assert_eq!(&rows[0].data[0x20..], &data[..0x20]);
    assert_eq!(&rows[1].data[..0x20], &data[0x20..]);
    assert!(rows[1].data[0x20..].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_segments_in_one_window_share_a_flush() {
    let clock = VirtualClock::new();
    let mut gpio = open(DummyTarget::new(DummyConfig::default(), clock.clone()));
    let mut image = image::from_bytes(0x100, &[1, 2, 3, 4]);
    image.extend(image::from_bytes(0x110, &[5, 6, 7, 8]));

    let stats = write(&mut gpio, &clock, None, &image).unwrap();
    assert_eq!(stats.segments, 2);
    assert_eq!(stats.bytes_written, 8);

    let rows = gpio.backend().rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0].data[..4], &[1, 2, 3, 4]);
    assert_eq!(&rows[0].data[0x10..0x14], &[5, 6, 7, 8]);
}

#[test]
fn test_write_then_read_round_trip() {
    let clock = VirtualClock::new();
    let mut gpio = open(DummyTarget::new(DummyConfig::default(), clock.clone()));

    let segments = [
        (0x0000, pattern(16, 4)),
        (0x00F8, pattern(16, 5)),
        (0x7FF0, pattern(16, 6)),
    ];
    let mut image = ProgramImage::new();
    for (start, data) in &segments {
        image.extend(image::from_bytes(*start, data));
    }

    write(&mut gpio, &clock, Some("PIC18F26J13"), &image).unwrap();
    assert_eq!(gpio.backend().erases(), 1);
    assert!(gpio.backend().violations().is_empty());
    assert!(!gpio.backend().in_program_mode());

    for (start, data) in &segments {
        let result = read(&mut gpio, &clock, Some(*start), Some(data.len() as u32)).unwrap();
        assert_eq!(result.image, image::from_bytes(*start, data));
    }
}

#[test]
fn test_flipped_bit_fails_verification() {
    let clock = VirtualClock::new();
    let target =
        DummyTarget::new(DummyConfig::default(), clock.clone()).with_flipped_bit(0x105, 0x04);
    let mut gpio = open(target);
    let data = pattern(64, 7);

    let err = write(&mut gpio, &clock, None, &image::from_bytes(0x100, &data)).unwrap_err();
    match err {
        Error::VerificationFailure {
            address,
            expected,
            found,
        } => {
            assert_eq!(address, 0x105);
            assert_eq!(expected, data[5]);
            assert_eq!(found, data[5] ^ 0x04);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!gpio.backend().in_program_mode());
}

#[test]
fn test_image_past_end_of_memory() {
    let clock = VirtualClock::new();
    let mut gpio = open(DummyTarget::new(DummyConfig::default(), clock.clone()));

    let err = write(&mut gpio, &clock, None, &image::from_bytes(0xFFFE, &[1, 2, 3])).unwrap_err();
    assert!(matches!(
        err,
        Error::AddressOutOfRange {
            address: 0x1_0000,
            size: 0x1_0000
        }
    ));
    assert_eq!(gpio.backend().erases(), 0);
}

#[test]
fn test_image_at_top_of_address_space() {
    let clock = VirtualClock::new();
    let mut gpio = open(DummyTarget::new(DummyConfig::default(), clock.clone()));
    let image = ihex::parse(":02000004FFFFFC\n:01FFFF00AA57\n:00000001FF\n").unwrap();

    let err = write(&mut gpio, &clock, None, &image).unwrap_err();
    assert!(matches!(
        err,
        Error::AddressOutOfRange {
            address: 0xFFFF_FFFF,
            size: 0x1_0000
        }
    ));
    assert_eq!(gpio.backend().erases(), 0);
    assert!(gpio.backend().rows().is_empty());
}

/// Table pointer loads aimed at program memory, skipping the identity
/// and erase control addresses
fn memory_loads(target: &DummyTarget) -> Vec<u32> {
    let size = target.config().memory_size;
    target
        .table_loads()
        .iter()
        .copied()
        .filter(|&a| a < size)
        .collect()
}

#[test]
fn test_sequential_rows_share_one_pointer_load() {
    let clock = VirtualClock::new();
    let mut gpio = open(DummyTarget::new(DummyConfig::default(), clock.clone()));

    write(&mut gpio, &clock, None, &image::from_bytes(0x100, &pattern(65, 4))).unwrap();

    let target = gpio.backend();
    assert_eq!(target.rows().len(), 2);
    // One load for both rows, one for verification
    assert_eq!(memory_loads(target), vec![0x100, 0x100]);
}

#[test]
fn test_adjacent_windows_across_a_gap_share_one_pointer_load() {
    let clock = VirtualClock::new();
    let mut gpio = open(DummyTarget::new(DummyConfig::default(), clock.clone()));
    let mut image = image::from_bytes(0x100, &pattern(63, 5));
    image.extend(image::from_bytes(0x140, &pattern(4, 6)));

    write(&mut gpio, &clock, None, &image).unwrap();

    let target = gpio.backend();
    assert_eq!(target.rows().len(), 2);
    assert_eq!(memory_loads(target), vec![0x100, 0x100, 0x140]);
}

#[test]
fn test_distant_windows_reload_pointer() {
    let clock = VirtualClock::new();
    let mut gpio = open(DummyTarget::new(DummyConfig::default(), clock.clone()));
    let mut image = image::from_bytes(0x100, &pattern(4, 7));
    image.extend(image::from_bytes(0x200, &pattern(4, 8)));

    write(&mut gpio, &clock, None, &image).unwrap();

    let target = gpio.backend();
    let rows: Vec<u32> = target.rows().iter().map(|r| r.address).collect();
    assert_eq!(rows, vec![0x100, 0x200]);
    assert_eq!(memory_loads(target), vec![0x100, 0x200, 0x100, 0x200]);
}

#[test]
fn test_read_clips_to_end_of_memory() {
    let clock = VirtualClock::new();
    let contents = pattern(0x1_0000, 8);
    let mut gpio = open(DummyTarget::with_data(
        DummyConfig::default(),
        clock.clone(),
        &contents,
    ));

    let result = read(&mut gpio, &clock, Some(0xFFF0), Some(0x100)).unwrap();
    assert_eq!(result.image.len(), 16);
    assert_eq!(result.image, image::from_bytes(0xFFF0, &contents[0xFFF0..]));
}

#[test]
fn test_read_defaults_to_address_zero() {
    let clock = VirtualClock::new();
    let contents = pattern(64, 9);
    let mut gpio = open(DummyTarget::with_data(
        DummyConfig::default(),
        clock.clone(),
        &contents,
    ));

    let result = read(&mut gpio, &clock, None, Some(4)).unwrap();
    assert_eq!(result.image, image::from_bytes(0, &contents[..4]));
}

#[test]
fn test_read_start_past_end_of_memory() {
    let clock = VirtualClock::new();
    let mut gpio = open(DummyTarget::new(DummyConfig::default(), clock.clone()));

    let err = read(&mut gpio, &clock, Some(0x1_0000), None).unwrap_err();
    assert!(matches!(err, Error::AddressOutOfRange { .. }));
    assert!(!gpio.backend().in_program_mode());
}

#[test]
fn test_missing_vpp_touches_no_pins() {
    let clock = VirtualClock::new();
    let target = DummyTarget::new(DummyConfig::default(), clock.clone());
    let mut gpio = GpioController::open(target, &[3, 2]).unwrap();
    let image = image::from_bytes(0, &[0xAA]);

    let no_vpp = CommParams::new(3, 2);
    let err = ops::write(&mut gpio, &clock, &no_vpp, None, &image, &mut NoProgress).unwrap_err();
    assert!(matches!(err, Error::MissingVpp));

    let pgm_only = CommParams::new(3, 2).with_pgm(4);
    let err = ops::write(&mut gpio, &clock, &pgm_only, None, &image, &mut NoProgress).unwrap_err();
    assert!(matches!(err, Error::MissingVpp));

    assert_eq!(gpio.backend().value_writes(), 0);
    assert_eq!(gpio.backend().direction_writes(), 0);
}

#[test]
fn test_slow_clock_still_erases() {
    let clock = VirtualClock::new();
    let mut gpio = open(DummyTarget::new(DummyConfig::default(), clock.clone()));
    let slow = params().with_period(Duration::from_secs(2));
    let data = pattern(8, 10);

    ops::write(
        &mut gpio,
        &clock,
        &slow,
        None,
        &image::from_bytes(0, &data),
        &mut NoProgress,
    )
    .unwrap();

    let target = gpio.backend();
    assert_eq!(target.erases(), 1);
    assert!(target.violations().is_empty());
    assert_eq!(&target.memory()[..8], &data[..]);
}

#[test]
fn test_erase_clears_previous_contents() {
    let clock = VirtualClock::new();
    let mut gpio = open(DummyTarget::with_data(
        DummyConfig::default(),
        clock.clone(),
        &[0u8; 0x200],
    ));

    write(&mut gpio, &clock, None, &image::from_bytes(0x100, &[0x5A])).unwrap();

    let memory = gpio.backend().memory();
    assert_eq!(memory[0x100], 0x5A);
    assert!(memory[..0x100].iter().all(|&b| b == 0xFF));
    assert!(memory[0x101..0x200].iter().all(|&b| b == 0xFF));
}

#[derive(Default)]
struct RecordingProgress {
    events: Vec<String>,
}

impl Progress for RecordingProgress {
    fn identified(&mut self, processor: &ProcessorDescriptor) {
        self.events.push(format!("identified {}", processor.name));
    }
    fn erasing(&mut self) {
        self.events.push("erasing".into());
    }
    fn writing(&mut self, total_bytes: usize) {
        self.events.push(format!("writing {total_bytes}"));
    }
    fn write_progress(&mut self, _bytes_written: usize) {}
    fn verifying(&mut self, total_bytes: usize) {
        self.events.push(format!("verifying {total_bytes}"));
    }
    fn verify_progress(&mut self, _bytes_verified: usize) {}
    fn reading(&mut self, total_bytes: usize) {
        self.events.push(format!("reading {total_bytes}"));
    }
    fn read_progress(&mut self, _bytes_read: usize) {}
}

#[test]
fn test_progress_follows_phases() {
    let clock = VirtualClock::new();
    let mut gpio = open(DummyTarget::new(DummyConfig::default(), clock.clone()));
    let mut progress = RecordingProgress::default();

    ops::write(
        &mut gpio,
        &clock,
        &params(),
        None,
        &image::from_bytes(0x40, &pattern(10, 11)),
        &mut progress,
    )
    .unwrap();
    ops::read(
        &mut gpio,
        &clock,
        &params(),
        None,
        Some(0x40),
        Some(10),
        &mut progress,
    )
    .unwrap();

    assert_eq!(
        progress.events,
        vec![
            "identified PIC18F26J13",
            "erasing",
            "writing 10",
            "verifying 10",
            "identified PIC18F26J13",
            "reading 10",
        ]
    );
    assert!(gpio.backend().reads() > 0);
}

#[test]
fn test_close_releases_target() {
    let clock = VirtualClock::new();
    let gpio = open(DummyTarget::new(DummyConfig::default(), clock));
    gpio.close().unwrap();
}
