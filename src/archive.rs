//! Little-endian binary buffer primitives.
//!
//! `ArchiveWriter` accumulates an in-memory byte buffer; every scalar
//! is written with a fixed little-endian layout and strings are
//! length-prefixed UTF-8. `ArchiveReader` is the matching read side,
//! used by the consumers of the format and by round-trip tests.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{ExportError, ExportResult};

/// Growable in-memory archive with fixed-layout scalar encodings.
#[derive(Default)]
pub struct ArchiveWriter {
    buf: Vec<u8>,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    pub fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Length-prefixed UTF-8 string, no terminator.
    pub fn write_fstring(&mut self, s: &str) {
        self.write_i32(s.len() as i32);
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// ASCII string into a fixed-width field, NUL padded.
    pub fn write_padded(&mut self, s: &str, width: usize) {
        let mut field = vec![0u8; width];
        let bytes = s.as_bytes();
        field[..bytes.len()].copy_from_slice(bytes);
        self.buf.extend_from_slice(&field);
    }
}

/// Cursor-based reader over archive bytes.
pub struct ArchiveReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ArchiveReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    pub fn is_eof(&self) -> bool {
        self.cursor.position() >= self.cursor.get_ref().len() as u64
    }

    pub fn read_bytes(&mut self, len: usize) -> ExportResult<Vec<u8>> {
        let mut out = vec![0u8; len];
        self.cursor.read_exact(&mut out)?;
        Ok(out)
    }

    pub fn read_to_end(&mut self) -> ExportResult<Vec<u8>> {
        let mut out = Vec::new();
        self.cursor.read_to_end(&mut out)?;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> ExportResult<u8> {
        Ok(self.cursor.read_u8()?)
    }

    pub fn read_bool(&mut self) -> ExportResult<bool> {
        Ok(self.cursor.read_u8()? != 0)
    }

    pub fn read_i16(&mut self) -> ExportResult<i16> {
        Ok(self.cursor.read_i16::<LittleEndian>()?)
    }

    pub fn read_i32(&mut self) -> ExportResult<i32> {
        Ok(self.cursor.read_i32::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> ExportResult<u32> {
        Ok(self.cursor.read_u32::<LittleEndian>()?)
    }

    pub fn read_f32(&mut self) -> ExportResult<f32> {
        Ok(self.cursor.read_f32::<LittleEndian>()?)
    }

    pub fn read_fstring(&mut self) -> ExportResult<String> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(ExportError::MalformedAsset(format!(
                "negative string length {len}"
            )));
        }
        let bytes = self.read_bytes(len as usize)?;
        String::from_utf8(bytes)
            .map_err(|e| ExportError::MalformedAsset(format!("invalid UTF-8 string: {e}")))
    }

    /// Fixed-width ASCII field; trailing NUL/space padding stripped.
    pub fn read_padded(&mut self, width: usize) -> ExportResult<String> {
        let bytes = self.read_bytes(width)?;
        let trimmed: Vec<u8> = bytes
            .into_iter()
            .take_while(|&b| b != 0)
            .collect();
        let s = String::from_utf8(trimmed)
            .map_err(|e| ExportError::MalformedAsset(format!("invalid tag field: {e}")))?;
        Ok(s.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_round_trip() {
        let mut ar = ArchiveWriter::new();
        ar.write_i32(-42);
        ar.write_u32(7);
        ar.write_f32(1.5);
        ar.write_bool(true);
        ar.write_i16(-3);

        let mut rd = ArchiveReader::new(ar.as_bytes());
        assert_eq!(rd.read_i32().unwrap(), -42);
        assert_eq!(rd.read_u32().unwrap(), 7);
        assert_eq!(rd.read_f32().unwrap(), 1.5);
        assert!(rd.read_bool().unwrap());
        assert_eq!(rd.read_i16().unwrap(), -3);
        assert!(rd.is_eof());
    }

    #[test]
    fn test_fstring_round_trip() {
        let mut ar = ArchiveWriter::new();
        ar.write_fstring("grass_layer");
        ar.write_fstring("");

        let mut rd = ArchiveReader::new(ar.as_bytes());
        assert_eq!(rd.read_fstring().unwrap(), "grass_layer");
        assert_eq!(rd.read_fstring().unwrap(), "");
    }

    #[test]
    fn test_padded_field() {
        let mut ar = ArchiveWriter::new();
        ar.write_padded("VERTICES", 16);
        assert_eq!(ar.len(), 16);

        let mut rd = ArchiveReader::new(ar.as_bytes());
        assert_eq!(rd.read_padded(16).unwrap(), "VERTICES");
    }
}
