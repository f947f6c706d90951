//! Intel HEX encoding of program images
//!
//! Supports the record types emitted by PIC toolchains: data (00), end of
//! file (01), extended segment address (02), extended linear address (04).
//! Start address records (03, 05) are accepted and ignored.

use super::{segments, ProgramImage};
use crate::error::{Error, HexErrorKind, Result};
use std::fmt::Write;

const RECORD_DATA: u8 = 0x00;
const RECORD_EOF: u8 = 0x01;
const RECORD_EXT_SEGMENT: u8 = 0x02;
const RECORD_START_SEGMENT: u8 = 0x03;
const RECORD_EXT_LINEAR: u8 = 0x04;
const RECORD_START_LINEAR: u8 = 0x05;

/// Data bytes per emitted record
const BYTES_PER_RECORD: usize = 16;

fn decode_line(line: &str) -> core::result::Result<Vec<u8>, HexErrorKind> {
    let digits = line
        .strip_prefix(':')
        .ok_or(HexErrorKind::MissingStartCode)?;
    if digits.len() % 2 != 0 || !digits.is_ascii() {
        return Err(HexErrorKind::InvalidDigits);
    }

    let bytes = (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16))
        .collect::<core::result::Result<Vec<u8>, _>>()
        .map_err(|_| HexErrorKind::InvalidDigits)?;

    // count, address (2), type, data, checksum
    if bytes.len() < 5 || bytes.len() != bytes[0] as usize + 5 {
        return Err(HexErrorKind::LengthMismatch);
    }

    let (body, checksum) = bytes.split_at(bytes.len() - 1);
    let computed = checksum_of(body);
    if computed != checksum[0] {
        return Err(HexErrorKind::BadChecksum {
            computed,
            found: checksum[0],
        });
    }

    Ok(bytes)
}

fn checksum_of(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b))
        .wrapping_neg()
}

/// Decode Intel HEX text into a program image
///
/// Later records overwrite earlier ones at the same address. Parsing stops
/// at the end of file record.
pub fn parse(text: &str) -> Result<ProgramImage> {
    let mut image = ProgramImage::new();
    let mut base: u32 = 0;

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fail = |kind| Error::Hex {
            line: index + 1,
            kind,
        };

        let record = decode_line(line).map_err(fail)?;
        let offset = u16::from_be_bytes([record[1], record[2]]) as u32;
        let data = &record[4..record.len() - 1];

        match record[3] {
            RECORD_DATA => {
                for (i, &byte) in data.iter().enumerate() {
                    image.insert(base.wrapping_add(offset + i as u32), byte);
                }
            }
            RECORD_EOF => break,
            RECORD_EXT_SEGMENT => {
                if data.len() != 2 {
                    return Err(fail(HexErrorKind::BadAddressRecord));
                }
                base = (u16::from_be_bytes([data[0], data[1]]) as u32) << 4;
            }
            RECORD_EXT_LINEAR => {
                if data.len() != 2 {
                    return Err(fail(HexErrorKind::BadAddressRecord));
                }
                base = (u16::from_be_bytes([data[0], data[1]]) as u32) << 16;
            }
            RECORD_START_SEGMENT | RECORD_START_LINEAR => {}
            other => return Err(fail(HexErrorKind::UnsupportedRecord(other))),
        }
    }

    log::debug!("ihex: decoded {} bytes", image.len());
    Ok(image)
}

fn push_record(out: &mut String, offset: u16, kind: u8, data: &[u8]) {
    let mut bytes = Vec::with_capacity(data.len() + 4);
    bytes.push(data.len() as u8);
    bytes.extend_from_slice(&offset.to_be_bytes());
    bytes.push(kind);
    bytes.extend_from_slice(data);
    let checksum = checksum_of(&bytes);

    out.push(':');
    for b in bytes.iter().chain(core::iter::once(&checksum)) {
        let _ = write!(out, "{:02X}", b);
    }
    out.push('\n');
}

/// Encode a program image as Intel HEX text
pub fn emit(image: &ProgramImage) -> String {
    let mut out = String::new();
    let mut upper: Option<u16> = None;

    for seg in segments(image) {
        let mut address = seg.start;
        let mut rest = seg.data.as_slice();

        while !rest.is_empty() {
            let high = (address >> 16) as u16;
            if upper != Some(high) {
                push_record(&mut out, 0, RECORD_EXT_LINEAR, &high.to_be_bytes());
                upper = Some(high);
            }

            // Records never cross a 64 KiB boundary
            let to_boundary = 0x1_0000 - (address & 0xFFFF) as usize;
            let n = rest.len().min(BYTES_PER_RECORD).min(to_boundary);
            push_record(&mut out, address as u16, RECORD_DATA, &rest[..n]);

            address = address.wrapping_add(n as u32);
            rest = &rest[n..];
        }
    }

    push_record(&mut out, 0, RECORD_EOF, &[]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::from_bytes;

    #[test]
    fn test_parse_data_and_linear_address() {
        let text = ":020000040001F9\n:0400100001020304E2\n:00000001FF\n";
        let image = parse(text).unwrap();
        assert_eq!(image, from_bytes(0x10010, &[1, 2, 3, 4]));
    }

    #[test]
    fn test_parse_stops_at_eof() {
        let text = ":0100000055AA\n:00000001FF\n:01000100AA54\n";
        let image = parse(text).unwrap();
        assert_eq!(image, from_bytes(0, &[0x55]));
    }

    #[test]
    fn test_bad_checksum_names_line() {
        let text = "\n:0100000055AA\n:0100010055AB\n";
        match parse(text) {
            Err(Error::Hex { line, kind }) => {
                assert_eq!(line, 3);
                assert_eq!(
                    kind,
                    HexErrorKind::BadChecksum {
                        computed: 0xA9,
                        found: 0xAB
                    }
                );
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_start_code() {
        assert!(matches!(
            parse("0100000055AA"),
            Err(Error::Hex {
                line: 1,
                kind: HexErrorKind::MissingStartCode
            })
        ));
    }

    #[test]
    fn test_emit_splits_records() {
        let mut image = from_bytes(0xFFF8, &[0x11; 20]);
        image.insert(0x30_0000, 0xAB);

        let text = emit(&image);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], ":020000040000FA");
        assert!(lines[1].starts_with(":08FFF800"));
        assert_eq!(lines[2], ":020000040001F9");
        assert!(lines[3].starts_with(":0C000000"));
        assert_eq!(lines[4], ":020000040030CA");
        assert_eq!(lines[5], ":01000000AB54");
        assert_eq!(*lines.last().unwrap(), ":00000001FF");

        assert_eq!(parse(&text).unwrap(), image);
    }
}
