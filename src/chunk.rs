//! Named binary chunks.
//!
//! A chunk is a fixed-width ASCII tag, a 32-bit element count and an
//! opaque payload, written back to back into an output archive. Chunks
//! carry no byte length; readers consume them in the same fixed order
//! they were written, using the per-tag record layout to know where a
//! payload ends. An empty chunk is still a valid chunk: tag, zero
//! count, no payload.

use crate::archive::{ArchiveReader, ArchiveWriter};
use crate::error::ExportResult;

/// Width of the tag field in bytes. Fits the longest recognized tag
/// ("MORPHTARGETS", 12 bytes) with NUL padding.
pub const CHUNK_TAG_WIDTH: usize = 16;

/// Accumulates one chunk's payload before it is sealed into an archive.
///
/// `serialize` consumes the chunk, so a sealed chunk cannot be written
/// twice. For uniform records use [`DataChunk::record`], which bumps
/// the element count per call; variable-arity producers write through
/// [`DataChunk::writer`] and account for elements with
/// [`DataChunk::add_elements`].
pub struct DataChunk {
    tag: &'static str,
    count: u32,
    data: ArchiveWriter,
}

impl DataChunk {
    pub fn new(tag: &'static str) -> Self {
        debug_assert!(tag.len() <= CHUNK_TAG_WIDTH && tag.is_ascii());
        Self {
            tag,
            count: 0,
            data: ArchiveWriter::new(),
        }
    }

    /// Chunk whose element count is known up front and not tracked per
    /// write (e.g. one pass over a vertex array).
    pub fn with_count(tag: &'static str, count: usize) -> Self {
        let mut chunk = Self::new(tag);
        chunk.count = count as u32;
        chunk
    }

    pub fn tag(&self) -> &str {
        self.tag
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Raw payload access for chunks with pre-declared or explicitly
    /// tracked element counts.
    pub fn writer(&mut self) -> &mut ArchiveWriter {
        &mut self.data
    }

    /// Append one uniform record and count it.
    pub fn record(&mut self, f: impl FnOnce(&mut ArchiveWriter)) {
        f(&mut self.data);
        self.count += 1;
    }

    pub fn add_elements(&mut self, n: u32) {
        self.count += n;
    }

    /// Seal the chunk into `ar`: padded tag, element count, payload.
    pub fn serialize(self, ar: &mut ArchiveWriter) {
        ar.write_padded(self.tag, CHUNK_TAG_WIDTH);
        ar.write_u32(self.count);
        ar.write_bytes(self.data.as_bytes());
    }
}

/// Tag and element count of the next chunk in a read stream. The
/// payload follows immediately; its size is implied by the tag's
/// record layout.
pub fn read_chunk_header(rd: &mut ArchiveReader) -> ExportResult<(String, u32)> {
    let tag = rd.read_padded(CHUNK_TAG_WIDTH)?;
    let count = rd.read_u32()?;
    Ok((tag, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_chunk_still_emitted() {
        let mut ar = ArchiveWriter::new();
        DataChunk::new("INDICES").serialize(&mut ar);

        assert_eq!(ar.len(), CHUNK_TAG_WIDTH + 4);
        let mut rd = ArchiveReader::new(ar.as_bytes());
        let (tag, count) = read_chunk_header(&mut rd).unwrap();
        assert_eq!(tag, "INDICES");
        assert_eq!(count, 0);
        assert!(rd.is_eof());
    }

    #[test]
    fn test_single_chunk_round_trip() {
        let mut chunk = DataChunk::new("VERTICES");
        chunk.record(|w| {
            w.write_f32(1.0);
            w.write_f32(2.0);
            w.write_f32(3.0);
        });
        chunk.record(|w| {
            w.write_f32(4.0);
            w.write_f32(5.0);
            w.write_f32(6.0);
        });

        let mut ar = ArchiveWriter::new();
        chunk.serialize(&mut ar);

        let mut rd = ArchiveReader::new(ar.as_bytes());
        let (tag, count) = read_chunk_header(&mut rd).unwrap();
        assert_eq!(tag, "VERTICES");
        assert_eq!(count, 2);
        let payload = rd.read_to_end().unwrap();
        assert_eq!(payload.len(), 2 * 3 * 4);
        let floats: &[f32] = bytemuck::cast_slice(&payload);
        assert_eq!(floats, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_many_chunks_read_in_written_order() {
        let mut ar = ArchiveWriter::new();

        let mut first = DataChunk::with_count("NORMALS", 1);
        first.writer().write_f32(0.5);
        first.serialize(&mut ar);

        DataChunk::new("TANGENTS").serialize(&mut ar);

        let mut third = DataChunk::new("MATERIALS");
        third.record(|w| w.write_fstring("M_Landscape"));
        third.serialize(&mut ar);

        let mut rd = ArchiveReader::new(ar.as_bytes());

        let (tag, count) = read_chunk_header(&mut rd).unwrap();
        assert_eq!((tag.as_str(), count), ("NORMALS", 1));
        assert_eq!(rd.read_f32().unwrap(), 0.5);

        let (tag, count) = read_chunk_header(&mut rd).unwrap();
        assert_eq!((tag.as_str(), count), ("TANGENTS", 0));

        let (tag, count) = read_chunk_header(&mut rd).unwrap();
        assert_eq!((tag.as_str(), count), ("MATERIALS", 1));
        assert_eq!(rd.read_fstring().unwrap(), "M_Landscape");
        assert!(rd.is_eof());
    }

    #[test]
    fn test_explicit_element_accounting() {
        // Variable-arity records: three influences across two vertices.
        let mut chunk = DataChunk::new("WEIGHTS");
        for (bone, vertex, weight) in [(0i16, 0, 1.0f32), (1, 1, 0.25), (2, 1, 0.75)] {
            let w = chunk.writer();
            w.write_i16(bone);
            w.write_i32(vertex);
            w.write_f32(weight);
            chunk.add_elements(1);
        }
        assert_eq!(chunk.count(), 3);
    }
}
