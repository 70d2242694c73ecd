//! Landscape mesh exporter library
//!
//! Decodes packed terrain component textures into a single seamless
//! mesh and serializes it into a chunked binary interchange format.

pub mod archive;
pub mod assembler;
pub mod asset;
pub mod chunk;
pub mod component;
pub mod convert;
pub mod data_access;
pub mod error;
pub mod format;
pub mod header;
pub mod mesh;
pub mod model;
pub mod texture;
pub mod world;

pub use assembler::{assemble_landscape, AssembledLandscape};
pub use error::{ExportError, ExportResult};
pub use format::MeshFormat;
pub use header::CompressionFormat;
pub use mesh::MeshLod;
pub use model::ModelAsset;
