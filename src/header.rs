//! Asset file header.
//!
//! Every exported file starts with a fixed magic token, a format
//! identifier ("UMODEL", "UWORLD", ...), an integer format version,
//! the object name and the compression selector. The header is never
//! compressed; compression applies to the body that follows it.

use std::fmt;
use std::str::FromStr;

use crate::archive::{ArchiveReader, ArchiveWriter};
use crate::error::{ExportError, ExportResult};

/// Magic token at offset zero, NUL padded to the field width.
pub const MAGIC: &str = "UNREALFORMAT";
pub const MAGIC_WIDTH: usize = 13;

/// Whole-body compression selector.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CompressionFormat {
    #[default]
    None,
    Gzip,
    /// Fixed-level zstd profile; see [`crate::asset::ZSTD_LEVEL`].
    Zstd,
}

impl CompressionFormat {
    /// Algorithm name as written into the header, for compressed files.
    pub fn name(self) -> &'static str {
        match self {
            CompressionFormat::None => "NONE",
            CompressionFormat::Gzip => "GZIP",
            CompressionFormat::Zstd => "ZSTD",
        }
    }
}

impl fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(CompressionFormat::None),
            "GZIP" => Ok(CompressionFormat::Gzip),
            "ZSTD" => Ok(CompressionFormat::Zstd),
            other => Err(ExportError::MalformedAsset(format!(
                "unknown compression format '{other}'"
            ))),
        }
    }
}

/// Fixed envelope preceding the chunk body of every asset file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetHeader {
    pub identifier: String,
    pub version: i32,
    pub object_name: String,
    pub compression: CompressionFormat,
}

impl AssetHeader {
    pub fn new(
        identifier: &str,
        version: i32,
        object_name: &str,
        compression: CompressionFormat,
    ) -> Self {
        Self {
            identifier: identifier.to_string(),
            version,
            object_name: object_name.to_string(),
            compression,
        }
    }

    pub fn serialize(&self, ar: &mut ArchiveWriter) {
        ar.write_padded(MAGIC, MAGIC_WIDTH);
        ar.write_fstring(&self.identifier);
        ar.write_i32(self.version);
        ar.write_fstring(&self.object_name);

        let compressed = self.compression != CompressionFormat::None;
        ar.write_bool(compressed);
        if compressed {
            ar.write_fstring(self.compression.name());
        }
    }

    /// Parse a header from the start of a file. The reader is left
    /// positioned at the first body byte.
    pub fn deserialize(rd: &mut ArchiveReader) -> ExportResult<Self> {
        let magic = rd.read_padded(MAGIC_WIDTH)?;
        if magic != MAGIC {
            return Err(ExportError::MalformedAsset(format!(
                "bad magic '{magic}'"
            )));
        }

        let identifier = rd.read_fstring()?;
        let version = rd.read_i32()?;
        let object_name = rd.read_fstring()?;

        let compression = if rd.read_bool()? {
            rd.read_fstring()?.parse()?
        } else {
            CompressionFormat::None
        };

        Ok(Self {
            identifier,
            version,
            object_name,
            compression,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip_all_selectors() {
        for compression in [
            CompressionFormat::None,
            CompressionFormat::Gzip,
            CompressionFormat::Zstd,
        ] {
            let header = AssetHeader::new("UMODEL", 1, "TestLandscape", compression);
            let mut ar = ArchiveWriter::new();
            header.serialize(&mut ar);

            let mut rd = ArchiveReader::new(ar.as_bytes());
            let parsed = AssetHeader::deserialize(&mut rd).unwrap();
            assert_eq!(parsed, header);
            assert!(rd.is_eof());
        }
    }

    #[test]
    fn test_uncompressed_header_omits_algorithm_name() {
        let plain = AssetHeader::new("UMODEL", 1, "A", CompressionFormat::None);
        let gzip = AssetHeader::new("UMODEL", 1, "A", CompressionFormat::Gzip);

        let mut a = ArchiveWriter::new();
        let mut b = ArchiveWriter::new();
        plain.serialize(&mut a);
        gzip.serialize(&mut b);
        assert!(a.len() < b.len());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut ar = ArchiveWriter::new();
        ar.write_padded("NOTAFORMAT", MAGIC_WIDTH);
        ar.write_fstring("UMODEL");

        let mut rd = ArchiveReader::new(ar.as_bytes());
        assert!(AssetHeader::deserialize(&mut rd).is_err());
    }

    #[test]
    fn test_unknown_compression_name_rejected() {
        assert!("LZMA".parse::<CompressionFormat>().is_err());
        assert_eq!(
            "gzip".parse::<CompressionFormat>().unwrap(),
            CompressionFormat::Gzip
        );
    }
}
