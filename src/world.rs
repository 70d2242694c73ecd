//! Chunked-binary world asset.
//!
//! A world is a library of mesh assets plus a list of placed actors.
//! The MESHES chunk embeds each model's full serialized bytes behind a
//! name hash and a declared byte length, so readers can seek past
//! models they do not need. The ACTORS chunk references those hashes
//! and carries each instance's transform.

use glam::Vec3;

use crate::archive::ArchiveWriter;
use crate::asset::ChunkedAsset;
use crate::chunk::DataChunk;
use crate::convert::{export_rotator, export_vector, Rotator};
use crate::error::ExportResult;
use crate::header::CompressionFormat;
use crate::model::ModelAsset;

pub const WORLD_IDENTIFIER: &str = "UWORLD";
pub const WORLD_VERSION: i32 = 1;

pub struct Actor {
    pub name: String,
    pub model_hash: i32,
    pub position: Vec3,
    pub rotation: Rotator,
    pub scale: Vec3,
}

struct MeshEntry {
    hash: i32,
    bytes: Vec<u8>,
}

/// Accumulates meshes and actors, then seals them into one asset.
#[derive(Default)]
pub struct WorldBuilder {
    meshes: Vec<MeshEntry>,
    actors: Vec<Actor>,
}

impl WorldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Embed a model and return the hash actors use to reference it.
    pub fn add_mesh(&mut self, hash: i32, model: &ModelAsset) -> ExportResult<i32> {
        let bytes = model.to_bytes()?;
        debug_assert_eq!(bytes.len(), model.length()?);
        self.meshes.push(MeshEntry { hash, bytes });
        Ok(hash)
    }

    pub fn add_actor(&mut self, actor: Actor) {
        self.actors.push(actor);
    }

    pub fn build(self, name: &str, compression: CompressionFormat) -> WorldAsset {
        let mut asset = ChunkedAsset::new(WORLD_IDENTIFIER, WORLD_VERSION, name, compression);

        let mut mesh_chunk = DataChunk::new("MESHES");
        for entry in &self.meshes {
            mesh_chunk.record(|w| {
                w.write_i32(entry.hash);
                w.write_i32(entry.bytes.len() as i32);
                w.write_bytes(&entry.bytes);
            });
        }
        mesh_chunk.serialize(asset.archive_mut());

        let mut actor_chunk = DataChunk::new("ACTORS");
        for actor in &self.actors {
            actor_chunk.record(|w| {
                w.write_i32(actor.model_hash);
                w.write_fstring(&actor.name);

                let position = export_vector(actor.position);
                w.write_f32(position.x);
                w.write_f32(position.y);
                w.write_f32(position.z);

                let rotation = export_rotator(actor.rotation);
                w.write_f32(rotation.pitch);
                w.write_f32(rotation.yaw);
                w.write_f32(rotation.roll);

                w.write_f32(actor.scale.x);
                w.write_f32(actor.scale.y);
                w.write_f32(actor.scale.z);
            });
        }
        actor_chunk.serialize(asset.archive_mut());

        WorldAsset { asset }
    }
}

pub struct WorldAsset {
    asset: ChunkedAsset,
}

impl WorldAsset {
    pub fn save(&self, out: &mut ArchiveWriter) -> ExportResult<()> {
        self.asset.save(out)
    }

    pub fn to_bytes(&self) -> ExportResult<Vec<u8>> {
        self.asset.to_bytes()
    }
}
