//! Program images
//!
//! A program image is a sparse map from byte address to byte value, as
//! produced by a HEX decoder. The device is written in contiguous runs, so
//! [`segments`] turns the map into ordered, non-overlapping [`Segment`]s.

pub mod ihex;

use std::collections::BTreeMap;

/// Sparse address to byte map
pub type ProgramImage = BTreeMap<u32, u8>;

/// A contiguous run of bytes starting at `start`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Address of the first byte
    pub start: u32,
    /// Segment contents
    pub data: Vec<u8>,
}

impl Segment {
    /// Create a segment
    pub fn new(start: u32, data: Vec<u8>) -> Self {
        Self { start, data }
    }

    /// One past the last address covered
    ///
    /// Wider than an address so a segment ending at `u32::MAX` does not wrap.
    pub fn end(&self) -> u64 {
        u64::from(self.start) + self.data.len() as u64
    }

    /// Number of bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the segment holds no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Split `image` into contiguous segments in ascending address order
///
/// A new segment starts at every gap, however small.
pub fn segments(image: &ProgramImage) -> Vec<Segment> {
    let mut result: Vec<Segment> = Vec::new();

    for (&address, &byte) in image {
        match result.last_mut() {
            Some(seg) if seg.end() == u64::from(address) => seg.data.push(byte),
            _ => result.push(Segment::new(address, vec![byte])),
        }
    }

    result
}

/// Build a program image holding `data` at consecutive addresses from `start`
pub fn from_bytes(start: u32, data: &[u8]) -> ProgramImage {
    data.iter()
        .enumerate()
        .map(|(i, &b)| (start + i as u32, b))
        .collect()
}
