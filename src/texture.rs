//! Texture collaborator seam.
//!
//! The exporter never parses texture assets itself; it consumes decoded
//! mip bulk data through the `TextureSource` trait and reinterprets it
//! as BGRA texels. Console tile-order storage is converted to linear
//! scanlines by a deswizzle hook before the bytes reach this crate's
//! coordinate math; on desktop platforms the hook is absent and bytes
//! pass through untouched.

use bytemuck::{Pod, Zeroable};

use crate::error::{ExportError, ExportResult};

/// Pixel formats the source engine stores terrain data in. Only
/// `B8G8R8A8` is reconstructable by the landscape path; the rest exist
/// so construction can name what it rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    B8G8R8A8,
    G8,
    Dxt1,
    Dxt5,
    Bc5,
}

/// One mip's dimensions, as needed by deswizzle hooks.
#[derive(Copy, Clone, Debug)]
pub struct MipInfo {
    pub size_x: u32,
    pub size_y: u32,
}

/// Converts console tiled texel order into linear scanlines. Identity
/// on platforms that already store linear data.
pub type Deswizzle = fn(&[u8], &MipInfo, PixelFormat) -> Vec<u8>;

/// A 4-channel 8-bit texel in the engine's BGRA byte order.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Bgra {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub a: u8,
}

/// Byte offset of weight channel 0..=3 (R, G, B, A) within a BGRA texel.
pub const WEIGHT_CHANNEL_OFFSETS: [usize; 4] = [2, 1, 0, 3];

/// Upstream texture collaborator: enough surface to fetch one mip's
/// linear bulk bytes and describe its layout.
pub trait TextureSource: Send + Sync {
    fn name(&self) -> &str;

    fn format(&self) -> PixelFormat;

    fn size_x(&self) -> u32;

    fn size_y(&self) -> u32;

    fn mip_count(&self) -> usize;

    /// Linear (deswizzled) bulk bytes for one mip.
    fn mip_bulk_data(&self, mip_level: usize) -> ExportResult<Vec<u8>>;
}

/// In-memory texture backed by owned mip byte buffers.
pub struct Texture2d {
    pub name: String,
    pub format: PixelFormat,
    pub size_x: u32,
    pub size_y: u32,
    /// Bulk bytes per mip; `None` models stripped/unloaded bulk data.
    pub mips: Vec<Option<Vec<u8>>>,
    /// Platform deswizzle hook, absent for linear storage.
    pub deswizzle: Option<Deswizzle>,
}

impl Texture2d {
    pub fn new(name: &str, format: PixelFormat, size_x: u32, size_y: u32, mip0: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            format,
            size_x,
            size_y,
            mips: vec![Some(mip0)],
            deswizzle: None,
        }
    }

    fn mip_info(&self, mip_level: usize) -> MipInfo {
        MipInfo {
            size_x: (self.size_x >> mip_level).max(1),
            size_y: (self.size_y >> mip_level).max(1),
        }
    }
}

impl TextureSource for Texture2d {
    fn name(&self) -> &str {
        &self.name
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn size_x(&self) -> u32 {
        self.size_x
    }

    fn size_y(&self) -> u32 {
        self.size_y
    }

    fn mip_count(&self) -> usize {
        self.mips.len()
    }

    fn mip_bulk_data(&self, mip_level: usize) -> ExportResult<Vec<u8>> {
        let bulk = self
            .mips
            .get(mip_level)
            .ok_or_else(|| ExportError::MipLevelOutOfRange {
                texture: self.name.clone(),
                mip_level,
                mip_count: self.mips.len(),
            })?
            .as_ref()
            .ok_or_else(|| ExportError::MissingBulkData {
                texture: self.name.clone(),
                mip_level,
            })?;

        Ok(match self.deswizzle {
            Some(f) => f(bulk, &self.mip_info(mip_level), self.format),
            None => bulk.clone(),
        })
    }
}
