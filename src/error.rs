//! Error taxonomy for the export pipeline.
//!
//! Construction-time problems (bad pixel format, missing bulk data,
//! inconsistent component sizes) abort the whole asset. Absent layer
//! allocations are not errors; they decode to zero weight.

use thiserror::Error;

use crate::texture::PixelFormat;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("unsupported pixel format {format:?} on texture '{texture}'")]
    UnsupportedPixelFormat { texture: String, format: PixelFormat },

    #[error("mip level {mip_level} out of range for texture '{texture}' ({mip_count} mips)")]
    MipLevelOutOfRange {
        texture: String,
        mip_level: usize,
        mip_count: usize,
    },

    #[error("texture '{texture}' has no bulk data for mip {mip_level}")]
    MissingBulkData { texture: String, mip_level: usize },

    #[error("component '{component}' has size {found} quads, terrain uses {expected}")]
    ComponentSizeMismatch {
        component: String,
        expected: i32,
        found: i32,
    },

    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("malformed asset data: {0}")]
    MalformedAsset(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type ExportResult<T> = Result<T, ExportError>;
