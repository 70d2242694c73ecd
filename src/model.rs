//! Chunked-binary mesh asset.
//!
//! Serializes a `MeshLod` into the VERTICES / NORMALS / TANGENTS /
//! TEXCOORDS / INDICES / VERTEXCOLORS / MATERIALS chunks, and
//! optionally the skeletal WEIGHTS / MORPHTARGETS / BONES / SOCKETS
//! chunks, wrapped by the asset header and whole-body compression.
//! The engine-to-file coordinate conversion is applied at every
//! emission site.

use glam::{Quat, Vec3};

use crate::archive::ArchiveWriter;
use crate::asset::ChunkedAsset;
use crate::chunk::DataChunk;
use crate::convert::{export_quat, export_rotator, export_uv, export_vector, Rotator};
use crate::error::ExportResult;
use crate::header::CompressionFormat;
use crate::mesh::MeshLod;

pub const MODEL_IDENTIFIER: &str = "UMODEL";
pub const MODEL_VERSION: i32 = 1;

pub struct Bone {
    pub name: String,
    pub parent_index: i32,
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Copy, Clone)]
pub struct BoneInfluence {
    pub bone_index: i16,
    pub weight: f32,
}

pub struct Socket {
    pub name: String,
    pub bone_name: String,
    pub position: Vec3,
    pub rotation: Rotator,
    pub scale: Vec3,
}

pub struct MorphDelta {
    pub position_delta: Vec3,
    pub normal_delta: Vec3,
    pub vertex_index: u32,
}

pub struct MorphTarget {
    pub name: String,
    pub deltas: Vec<MorphDelta>,
}

/// Skeleton data attached to a skeletal mesh export. Influences are
/// per vertex with variable arity; the WEIGHTS chunk counts
/// influences, not vertices.
#[derive(Default)]
pub struct SkeletalData {
    pub bones: Vec<Bone>,
    pub influences_per_vertex: Vec<Vec<BoneInfluence>>,
    pub sockets: Vec<Socket>,
    pub morph_targets: Vec<MorphTarget>,
}

pub struct ModelAsset {
    asset: ChunkedAsset,
}

impl ModelAsset {
    pub fn new(lod: &MeshLod, name: &str, compression: CompressionFormat) -> ExportResult<Self> {
        lod.validate()?;
        let mut asset = ChunkedAsset::new(MODEL_IDENTIFIER, MODEL_VERSION, name, compression);
        serialize_static_mesh(&mut asset, lod);
        Ok(Self { asset })
    }

    pub fn with_skeleton(
        lod: &MeshLod,
        name: &str,
        skeleton: &SkeletalData,
        compression: CompressionFormat,
    ) -> ExportResult<Self> {
        let mut model = Self::new(lod, name, compression)?;
        serialize_skeletal_data(&mut model.asset, skeleton);
        Ok(model)
    }

    pub fn save(&self, out: &mut ArchiveWriter) -> ExportResult<()> {
        self.asset.save(out)
    }

    pub fn to_bytes(&self) -> ExportResult<Vec<u8>> {
        self.asset.to_bytes()
    }

    /// Saved size in bytes, for containers that declare the length of
    /// each embedded model before its bytes.
    pub fn length(&self) -> ExportResult<usize> {
        self.asset.length()
    }
}

fn write_vector(w: &mut ArchiveWriter, v: Vec3) {
    let v = export_vector(v);
    w.write_f32(v.x);
    w.write_f32(v.y);
    w.write_f32(v.z);
}

fn serialize_static_mesh(asset: &mut ChunkedAsset, lod: &MeshLod) {
    let vertex_count = lod.vertex_count();

    let mut vertex_chunk = DataChunk::with_count("VERTICES", vertex_count);
    let mut normals_chunk = DataChunk::with_count("NORMALS", vertex_count);
    let mut tangents_chunk = DataChunk::with_count("TANGENTS", vertex_count);
    let mut tex_coords_chunk = DataChunk::with_count("TEXCOORDS", vertex_count);

    for i in 0..vertex_count {
        write_vector(vertex_chunk.writer(), lod.positions[i]);
        write_vector(normals_chunk.writer(), lod.normals[i].normalize_or_zero());
        write_vector(tangents_chunk.writer(), lod.tangents[i].normalize_or_zero());

        let uv = export_uv(lod.uvs[i]);
        tex_coords_chunk.writer().write_f32(uv.x);
        tex_coords_chunk.writer().write_f32(uv.y);
    }

    vertex_chunk.serialize(asset.archive_mut());
    normals_chunk.serialize(asset.archive_mut());
    tangents_chunk.serialize(asset.archive_mut());
    tex_coords_chunk.serialize(asset.archive_mut());

    let mut index_chunk = DataChunk::with_count("INDICES", lod.indices.len());
    for &index in &lod.indices {
        index_chunk.writer().write_u32(index);
    }
    index_chunk.serialize(asset.archive_mut());

    if let Some(colors) = &lod.vertex_colors {
        let mut color_chunk = DataChunk::with_count("VERTEXCOLORS", colors.len());
        color_chunk.writer().write_bytes(bytemuck::cast_slice(colors));
        color_chunk.serialize(asset.archive_mut());
    }

    let mut material_chunk = DataChunk::new("MATERIALS");
    for section in &lod.sections {
        material_chunk.record(|w| w.write_fstring(&section.material_name));
    }
    material_chunk.serialize(asset.archive_mut());
}

fn serialize_skeletal_data(asset: &mut ChunkedAsset, skeleton: &SkeletalData) {
    let mut weights_chunk = DataChunk::new("WEIGHTS");
    for (vertex_index, influences) in skeleton.influences_per_vertex.iter().enumerate() {
        for influence in influences {
            let w = weights_chunk.writer();
            w.write_i16(influence.bone_index);
            w.write_i32(vertex_index as i32);
            w.write_f32(influence.weight);
            weights_chunk.add_elements(1);
        }
    }
    weights_chunk.serialize(asset.archive_mut());

    if !skeleton.morph_targets.is_empty() {
        let mut morph_chunk = DataChunk::new("MORPHTARGETS");
        for morph in &skeleton.morph_targets {
            morph_chunk.record(|w| {
                w.write_fstring(&morph.name);
                w.write_i32(morph.deltas.len() as i32);
                for delta in &morph.deltas {
                    let position = export_vector(delta.position_delta);
                    w.write_f32(position.x);
                    w.write_f32(position.y);
                    w.write_f32(position.z);
                    let normal = export_vector(delta.normal_delta);
                    w.write_f32(normal.x);
                    w.write_f32(normal.y);
                    w.write_f32(normal.z);
                    w.write_u32(delta.vertex_index);
                }
            });
        }
        morph_chunk.serialize(asset.archive_mut());
    }

    let mut bone_chunk = DataChunk::new("BONES");
    for bone in &skeleton.bones {
        bone_chunk.record(|w| {
            w.write_fstring(&bone.name);
            w.write_i32(bone.parent_index);

            let position = export_vector(bone.position);
            w.write_f32(position.x);
            w.write_f32(position.y);
            w.write_f32(position.z);

            let rotation = export_quat(bone.rotation);
            w.write_f32(rotation.x);
            w.write_f32(rotation.y);
            w.write_f32(rotation.z);
            w.write_f32(rotation.w);
        });
    }
    bone_chunk.serialize(asset.archive_mut());

    let mut socket_chunk = DataChunk::new("SOCKETS");
    for socket in &skeleton.sockets {
        socket_chunk.record(|w| {
            w.write_fstring(&socket.name);
            w.write_fstring(&socket.bone_name);

            let position = export_vector(socket.position);
            w.write_f32(position.x);
            w.write_f32(position.y);
            w.write_f32(position.z);

            let rotation = export_rotator(socket.rotation);
            w.write_f32(rotation.pitch);
            w.write_f32(rotation.yaw);
            w.write_f32(rotation.roll);

            w.write_f32(socket.scale.x);
            w.write_f32(socket.scale.y);
            w.write_f32(socket.scale.z);
        });
    }
    socket_chunk.serialize(asset.archive_mut());
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    use crate::archive::ArchiveReader;
    use crate::asset::decompress_body;
    use crate::chunk::read_chunk_header;
    use crate::header::AssetHeader;
    use crate::mesh::{Color4, MeshSection};

    fn quad_lod() -> MeshLod {
        MeshLod {
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.5),
            ],
            normals: vec![Vec3::Z; 4],
            tangents: vec![Vec3::X; 4],
            uvs: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 1.0),
            ],
            vertex_colors: Some(vec![Color4::splat(9); 4]),
            indices: vec![0, 3, 2, 0, 1, 3],
            sections: vec![MeshSection {
                first_triangle: 0,
                triangle_count: 2,
                material_name: "M_Landscape".into(),
            }],
            ..Default::default()
        }
    }

    fn read_vec3(rd: &mut ArchiveReader) -> Vec3 {
        Vec3::new(
            rd.read_f32().unwrap(),
            rd.read_f32().unwrap(),
            rd.read_f32().unwrap(),
        )
    }

    #[test]
    fn test_static_chunk_order_and_conventions() {
        let model = ModelAsset::new(&quad_lod(), "Quad", CompressionFormat::None).unwrap();
        let bytes = model.to_bytes().unwrap();

        let mut rd = ArchiveReader::new(&bytes);
        let header = AssetHeader::deserialize(&mut rd).unwrap();
        assert_eq!(header.identifier, "UMODEL");
        assert_eq!(header.object_name, "Quad");

        let (tag, count) = read_chunk_header(&mut rd).unwrap();
        assert_eq!((tag.as_str(), count), ("VERTICES", 4));
        let first = read_vec3(&mut rd);
        assert_eq!(first, Vec3::new(0.0, -0.0, 0.0));
        for _ in 1..3 {
            read_vec3(&mut rd);
        }
        // Y is negated at emission.
        let last = read_vec3(&mut rd);
        assert_eq!(last, Vec3::new(1.0, -1.0, 0.5));

        let (tag, count) = read_chunk_header(&mut rd).unwrap();
        assert_eq!((tag.as_str(), count), ("NORMALS", 4));
        for _ in 0..4 {
            assert_eq!(read_vec3(&mut rd), Vec3::new(0.0, -0.0, 1.0));
        }

        let (tag, _) = read_chunk_header(&mut rd).unwrap();
        assert_eq!(tag, "TANGENTS");
        for _ in 0..4 {
            read_vec3(&mut rd);
        }

        let (tag, count) = read_chunk_header(&mut rd).unwrap();
        assert_eq!((tag.as_str(), count), ("TEXCOORDS", 4));
        // V is negated at emission.
        assert_eq!(rd.read_f32().unwrap(), 0.0);
        assert_eq!(rd.read_f32().unwrap(), -0.0);
        for _ in 1..4 {
            rd.read_f32().unwrap();
            rd.read_f32().unwrap();
        }

        let (tag, count) = read_chunk_header(&mut rd).unwrap();
        assert_eq!((tag.as_str(), count), ("INDICES", 6));
        let indices: Vec<u32> = (0..6).map(|_| rd.read_u32().unwrap()).collect();
        assert_eq!(indices, vec![0, 3, 2, 0, 1, 3]);

        let (tag, count) = read_chunk_header(&mut rd).unwrap();
        assert_eq!((tag.as_str(), count), ("VERTEXCOLORS", 4));
        assert_eq!(rd.read_bytes(16).unwrap(), vec![9u8; 16]);

        let (tag, count) = read_chunk_header(&mut rd).unwrap();
        assert_eq!((tag.as_str(), count), ("MATERIALS", 1));
        assert_eq!(rd.read_fstring().unwrap(), "M_Landscape");
        assert!(rd.is_eof());
    }

    #[test]
    fn test_compressed_model_body_round_trips() {
        let plain = ModelAsset::new(&quad_lod(), "Quad", CompressionFormat::None).unwrap();
        let zstd = ModelAsset::new(&quad_lod(), "Quad", CompressionFormat::Zstd).unwrap();

        let plain_bytes = plain.to_bytes().unwrap();
        let zstd_bytes = zstd.to_bytes().unwrap();

        let mut plain_rd = ArchiveReader::new(&plain_bytes);
        AssetHeader::deserialize(&mut plain_rd).unwrap();
        let raw_body = plain_rd.read_to_end().unwrap();

        let mut zstd_rd = ArchiveReader::new(&zstd_bytes);
        let header = AssetHeader::deserialize(&mut zstd_rd).unwrap();
        let body = zstd_rd.read_to_end().unwrap();
        assert_eq!(decompress_body(header.compression, &body).unwrap(), raw_body);
    }

    #[test]
    fn test_invalid_lod_rejected_before_serialization() {
        let mut lod = quad_lod();
        lod.indices.push(99);
        assert!(ModelAsset::new(&lod, "Quad", CompressionFormat::None).is_err());
    }

    #[test]
    fn test_weights_chunk_counts_influences_not_vertices() {
        let skeleton = SkeletalData {
            bones: vec![Bone {
                name: "root".into(),
                parent_index: -1,
                position: Vec3::ZERO,
                rotation: Quat::IDENTITY,
            }],
            influences_per_vertex: vec![
                vec![BoneInfluence {
                    bone_index: 0,
                    weight: 1.0,
                }],
                vec![
                    BoneInfluence {
                        bone_index: 0,
                        weight: 0.25,
                    },
                    BoneInfluence {
                        bone_index: 0,
                        weight: 0.75,
                    },
                ],
                Vec::new(),
                vec![BoneInfluence {
                    bone_index: 0,
                    weight: 1.0,
                }],
            ],
            ..Default::default()
        };

        let model =
            ModelAsset::with_skeleton(&quad_lod(), "Skel", &skeleton, CompressionFormat::None)
                .unwrap();
        let bytes = model.to_bytes().unwrap();

        let mut rd = ArchiveReader::new(&bytes);
        AssetHeader::deserialize(&mut rd).unwrap();

        // Skip the seven static chunks.
        let mut weights_count = None;
        while !rd.is_eof() {
            let (tag, count) = read_chunk_header(&mut rd).unwrap();
            match tag.as_str() {
                "VERTICES" | "NORMALS" | "TANGENTS" => {
                    rd.read_bytes(count as usize * 12).unwrap();
                }
                "TEXCOORDS" => {
                    rd.read_bytes(count as usize * 8).unwrap();
                }
                "INDICES" => {
                    rd.read_bytes(count as usize * 4).unwrap();
                }
                "VERTEXCOLORS" => {
                    rd.read_bytes(count as usize * 4).unwrap();
                }
                "MATERIALS" => {
                    for _ in 0..count {
                        rd.read_fstring().unwrap();
                    }
                }
                "WEIGHTS" => {
                    weights_count = Some(count);
                    // bone i16 + vertex i32 + weight f32 per record.
                    let (bone, vertex, weight) = (
                        rd.read_i16().unwrap(),
                        rd.read_i32().unwrap(),
                        rd.read_f32().unwrap(),
                    );
                    assert_eq!((bone, vertex, weight), (0, 0, 1.0));
                    rd.read_bytes((count as usize - 1) * 10).unwrap();
                }
                "BONES" => {
                    assert_eq!(count, 1);
                    assert_eq!(rd.read_fstring().unwrap(), "root");
                    assert_eq!(rd.read_i32().unwrap(), -1);
                    rd.read_bytes(3 * 4 + 4 * 4).unwrap();
                }
                "SOCKETS" => {
                    assert_eq!(count, 0);
                }
                other => panic!("unexpected chunk '{other}'"),
            }
        }
        // Four vertices but one lacks influences and one has two.
        assert_eq!(weights_count, Some(4));
    }
}
