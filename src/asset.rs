//! Chunked asset envelope.
//!
//! A `ChunkedAsset` owns the header and the archive that chunk writers
//! seal into. On save the header is written first, then the entire
//! accumulated chunk body as one blob, compressed as a whole when the
//! header selects a compression format. Compression never applies per
//! chunk. Nothing reaches the output until header and body have fully
//! serialized, so a failed asset leaves no partial file behind.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::archive::ArchiveWriter;
use crate::error::ExportResult;
use crate::header::{AssetHeader, CompressionFormat};

/// Fixed level for the zstd profile.
pub const ZSTD_LEVEL: i32 = 3;

pub struct ChunkedAsset {
    header: AssetHeader,
    archive: ArchiveWriter,
}

impl ChunkedAsset {
    pub fn new(
        identifier: &str,
        version: i32,
        object_name: &str,
        compression: CompressionFormat,
    ) -> Self {
        Self {
            header: AssetHeader::new(identifier, version, object_name, compression),
            archive: ArchiveWriter::new(),
        }
    }

    pub fn header(&self) -> &AssetHeader {
        &self.header
    }

    /// The archive that sealed chunks append to.
    pub fn archive_mut(&mut self) -> &mut ArchiveWriter {
        &mut self.archive
    }

    fn body(&self) -> ExportResult<Vec<u8>> {
        compress_body(self.header.compression, self.archive.as_bytes())
    }

    /// Write header plus (optionally compressed) body into `out`.
    pub fn save(&self, out: &mut ArchiveWriter) -> ExportResult<()> {
        let body = self.body()?;
        self.header.serialize(out);
        out.write_bytes(&body);
        Ok(())
    }

    /// Complete file image as a byte vector.
    pub fn to_bytes(&self) -> ExportResult<Vec<u8>> {
        let mut out = ArchiveWriter::new();
        self.save(&mut out)?;
        Ok(out.into_bytes())
    }

    /// Total saved size in bytes without mutating the asset. Callers
    /// embedding this asset inside another container use this to
    /// declare the byte length ahead of the bytes.
    pub fn length(&self) -> ExportResult<usize> {
        let mut header_ar = ArchiveWriter::new();
        self.header.serialize(&mut header_ar);
        Ok(header_ar.len() + self.body()?.len())
    }
}

fn compress_body(format: CompressionFormat, raw: &[u8]) -> ExportResult<Vec<u8>> {
    match format {
        CompressionFormat::None => Ok(raw.to_vec()),
        CompressionFormat::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(raw)?;
            Ok(encoder.finish()?)
        }
        CompressionFormat::Zstd => Ok(zstd::encode_all(raw, ZSTD_LEVEL)?),
    }
}

/// Inverse of the body compression, for consumers and tests.
pub fn decompress_body(format: CompressionFormat, body: &[u8]) -> ExportResult<Vec<u8>> {
    match format {
        CompressionFormat::None => Ok(body.to_vec()),
        CompressionFormat::Gzip => {
            let mut decoder = flate2::read::GzDecoder::new(body);
            let mut out = Vec::new();
            std::io::Read::read_to_end(&mut decoder, &mut out)?;
            Ok(out)
        }
        CompressionFormat::Zstd => Ok(zstd::decode_all(body)?),
    }
}
