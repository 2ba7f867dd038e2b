use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use super::types::Endianness;

/// Positioned writer that patches an in-memory copy of a file.
///
/// Seeking past the end is allowed; the gap is zero filled by the next
/// write.
pub struct StreamWriter {
    data: Vec<u8>,
    pos: usize,
    endianness: Endianness,
}

impl StreamWriter {
    pub fn new(endianness: Endianness) -> Self {
        Self::from_bytes(Vec::new(), endianness)
    }

    pub fn from_bytes(data: Vec<u8>, endianness: Endianness) -> Self {
        Self { data, pos: 0, endianness }
    }

    pub fn from_file(path: impl AsRef<Path>, endianness: Endianness) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::from_bytes(data, endianness))
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.data).map_err(|e| Error::io(path, e))?;
        tracing::debug!(path = %path.display(), len = self.data.len(), "wrote stream to file");
        Ok(())
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn index(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, offset: usize) {
        self.pos = offset;
    }

    pub fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
    }

    pub fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    pub fn write_i8(&mut self, v: i8) {
        self.write_u8(v as u8);
    }

    pub fn write_u16(&mut self, v: u16) {
        let mut buf = [0u8; 2];
        match self.endianness {
            Endianness::Big => BigEndian::write_u16(&mut buf, v),
            Endianness::Little => LittleEndian::write_u16(&mut buf, v),
        }
        self.write_bytes(&buf);
    }

    pub fn write_i16(&mut self, v: i16) {
        self.write_u16(v as u16);
    }

    pub fn write_u32(&mut self, v: u32) {
        let mut buf = [0u8; 4];
        match self.endianness {
            Endianness::Big => BigEndian::write_u32(&mut buf, v),
            Endianness::Little => LittleEndian::write_u32(&mut buf, v),
        }
        self.write_bytes(&buf);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_u32(v as u32);
    }
}

impl From<StreamWriter> for Vec<u8> {
    fn from(writer: StreamWriter) -> Self {
        writer.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::reader::StreamReader;

    #[test]
    fn test_roundtrip_primitives() {
        let mut writer = StreamWriter::new(Endianness::Big);
        writer.write_u8(0x42);
        writer.write_u16(0x1234);
        writer.write_u32(0xDEADBEEF);
        writer.write_i16(-33);

        assert_eq!(&writer.as_slice()[..3], &[0x42, 0x12, 0x34]);

        let mut reader = StreamReader::new(writer.into_vec(), Endianness::Big);
        assert_eq!(reader.read_u8().unwrap(), 0x42);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0xDEADBEEF);
        assert_eq!(reader.read_i16().unwrap(), -33);
    }

    #[test]
    fn test_overwrite_in_place() {
        let mut writer = StreamWriter::from_bytes(vec![0u8; 8], Endianness::Big);
        writer.seek(2);
        writer.write_u16(0xBEEF);
        assert_eq!(writer.size(), 8);
        assert_eq!(writer.index(), 4);
        assert_eq!(writer.as_slice(), &[0, 0, 0xBE, 0xEF, 0, 0, 0, 0]);
    }

    #[test]
    fn test_seek_past_end_zero_fills() {
        let mut writer = StreamWriter::from_bytes(vec![1u8, 2], Endianness::Little);
        writer.seek(4);
        writer.write_u16(0x0102);
        assert_eq!(writer.as_slice(), &[1, 2, 0, 0, 0x02, 0x01]);
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut writer = StreamWriter::new(Endianness::Big);
        writer.write_u32(0x0102_0304);
        writer.write_to_file(&path).unwrap();

        let reread = StreamWriter::from_file(&path, Endianness::Big).unwrap();
        assert_eq!(reread.as_slice(), &[1, 2, 3, 4]);
    }
}
