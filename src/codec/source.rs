use bytes::Bytes;

use crate::error::{Error, Result};

/// A run of bytes mapped at a fixed address
#[derive(Debug, Clone)]
pub struct Segment {
    pub start: usize,
    pub data: Bytes,
    pub label: String,
}

impl Segment {
    pub fn end(&self) -> usize {
        self.start + self.data.len()
    }

    pub fn contains(&self, address: usize) -> bool {
        address >= self.start && address < self.end()
    }
}

/// Logical byte address space built from ordered segments.
///
/// The first segment is the base file. Each later segment shadows whatever
/// lies under its range, and the space grows when a segment extends past
/// the current end. Addresses covered by no segment read as zero. Segment
/// data is never modified; splicing a file in only adds a mapping.
#[derive(Debug, Clone, Default)]
pub struct AddressSpace {
    segments: Vec<Segment>,
    size: usize,
}

impl AddressSpace {
    pub fn new(base: impl Into<Bytes>) -> Self {
        Self::with_label(base, "base")
    }

    pub fn with_label(base: impl Into<Bytes>, label: impl Into<String>) -> Self {
        let data = base.into();
        let size = data.len();
        Self {
            segments: vec![Segment { start: 0, data, label: label.into() }],
            size,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Map `data` at `offset`, on top of everything mapped so far
    pub fn insert(&mut self, offset: usize, data: impl Into<Bytes>, label: impl Into<String>) {
        let segment = Segment { start: offset, data: data.into(), label: label.into() };
        self.size = self.size.max(segment.end());
        self.segments.push(segment);
    }

    /// Label of the segment that currently provides `address`
    pub fn source_of(&self, address: usize) -> Option<&str> {
        self.segments
            .iter()
            .rev()
            .find(|s| s.contains(address))
            .map(|s| s.label.as_str())
    }

    /// Fill `out` with the bytes at `offset..offset + out.len()`
    pub fn read_at(&self, offset: usize, out: &mut [u8]) -> Result<()> {
        let end = offset
            .checked_add(out.len())
            .filter(|&end| end <= self.size)
            .ok_or(Error::UnexpectedEof {
                offset,
                need: out.len(),
                have: self.size.saturating_sub(offset),
            })?;

        out.fill(0);
        for segment in &self.segments {
            let lo = offset.max(segment.start);
            let hi = end.min(segment.end());
            if lo < hi {
                out[lo - offset..hi - offset]
                    .copy_from_slice(&segment.data[lo - segment.start..hi - segment.start]);
            }
        }
        Ok(())
    }

    /// Flatten every segment into one buffer
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.size];
        for segment in &self.segments {
            out[segment.start..segment.end()].copy_from_slice(&segment.data);
        }
        out
    }
}
