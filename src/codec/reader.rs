use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use bytes::Bytes;

use crate::error::{Error, Result};
use super::source::AddressSpace;
use super::types::Endianness;

/// Positioned reader over a world file's address space
pub struct StreamReader {
    space: AddressSpace,
    pos: usize,
    endianness: Endianness,
}

impl StreamReader {
    pub fn new(data: impl Into<Bytes>, endianness: Endianness) -> Self {
        Self {
            space: AddressSpace::new(data),
            pos: 0,
            endianness,
        }
    }

    pub fn from_file(path: impl AsRef<Path>, endianness: Endianness) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        Ok(Self {
            space: AddressSpace::with_label(data, path.display().to_string()),
            pos: 0,
            endianness,
        })
    }

    pub fn space(&self) -> &AddressSpace {
        &self.space
    }

    /// Splice `data` into the address space at `offset`. Existing bytes are
    /// shadowed, not overwritten.
    pub fn insert_bytes(&mut self, offset: usize, data: impl Into<Bytes>, label: impl Into<String>) {
        self.space.insert(offset, data, label);
    }

    /// Splice a file's contents into the address space at `offset`
    pub fn insert_file(&mut self, path: impl AsRef<Path>, offset: usize) -> Result<()> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        tracing::debug!(path = %path.display(), offset, len = data.len(), "inserted file into stream");
        self.space.insert(offset, data, path.display().to_string());
        Ok(())
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn set_endianness(&mut self, endianness: Endianness) {
        self.endianness = endianness;
    }

    pub fn size(&self) -> usize {
        self.space.len()
    }

    pub fn index(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.size().saturating_sub(self.pos)
    }

    pub fn is_end(&self) -> bool {
        self.remaining() == 0
    }

    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.size() {
            return Err(Error::SeekOutOfBounds { offset, size: self.size() });
        }
        self.pos = offset;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.seek(self.pos.saturating_add(n))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; n];
        self.space.read_at(self.pos, &mut out)?;
        self.pos += n;
        Ok(out)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        self.space.read_at(self.pos, &mut out)?;
        self.pos += N;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_array::<2>()?;
        Ok(match self.endianness {
            Endianness::Big => BigEndian::read_u16(&bytes),
            Endianness::Little => LittleEndian::read_u16(&bytes),
        })
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_array::<4>()?;
        Ok(match self.endianness {
            Endianness::Big => BigEndian::read_u32(&bytes),
            Endianness::Little => LittleEndian::read_u32(&bytes),
        })
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives_big_endian() {
        let data = vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut reader = StreamReader::new(data, Endianness::Big);

        assert_eq!(reader.read_u8().unwrap(), 0x01);
        assert_eq!(reader.read_u16().unwrap(), 0x0203);
        assert_eq!(reader.read_u32().unwrap(), 0x04050607);
        assert!(reader.is_end());
    }

    #[test]
    fn test_read_primitives_little_endian() {
        let data = vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut reader = StreamReader::new(data, Endianness::Little);

        assert_eq!(reader.read_u8().unwrap(), 0x01);
        assert_eq!(reader.read_u16().unwrap(), 0x0302);
        assert_eq!(reader.read_u32().unwrap(), 0x07060504);
    }

    #[test]
    fn test_read_signed() {
        let data = vec![0xFF, 0xFF, 0xFE, 0x80];
        let mut reader = StreamReader::new(data, Endianness::Big);

        assert_eq!(reader.read_i16().unwrap(), -1);
        assert_eq!(reader.read_i8().unwrap(), -2);
        assert_eq!(reader.read_i8().unwrap(), -128);
    }

    #[test]
    fn test_seek_and_skip() {
        let data = vec![0u8, 1, 2, 3, 4];
        let mut reader = StreamReader::new(data, Endianness::Big);

        reader.seek(3).unwrap();
        assert_eq!(reader.read_u8().unwrap(), 3);
        reader.seek(0).unwrap();
        reader.skip(1).unwrap();
        assert_eq!(reader.index(), 1);
        assert!(reader.seek(5).is_ok());
        assert!(matches!(reader.seek(6), Err(Error::SeekOutOfBounds { offset: 6, size: 5 })));
    }

    #[test]
    fn test_read_past_end_fails() {
        let mut reader = StreamReader::new(vec![0x12u8], Endianness::Big);
        assert!(matches!(reader.read_u16(), Err(Error::UnexpectedEof { .. })));
        // A failed read does not move the cursor.
        assert_eq!(reader.index(), 0);
        assert_eq!(reader.read_u8().unwrap(), 0x12);
    }

    #[test]
    fn test_insert_bytes_is_visible() {
        let mut reader = StreamReader::new(vec![0u8; 4], Endianness::Big);
        reader.insert_bytes(2, vec![0xAB, 0xCD, 0xEF], "L1-2");

        assert_eq!(reader.size(), 5);
        reader.seek(2).unwrap();
        assert_eq!(reader.read_u16().unwrap(), 0xABCD);
        assert_eq!(reader.read_bytes(1).unwrap(), vec![0xEF]);
    }
}
