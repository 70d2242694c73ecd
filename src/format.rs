//! Output format selection.
//!
//! The chunked binary container is the primary target; Wavefront OBJ
//! is kept as a plain-text escape hatch for quick inspection in any
//! mesh viewer. Both apply the same coordinate conventions, so a mesh
//! opens with identical orientation in either format.

use std::fmt::Write as _;

use crate::convert::{export_uv, export_vector};
use crate::error::ExportResult;
use crate::header::CompressionFormat;
use crate::mesh::MeshLod;
use crate::model::ModelAsset;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MeshFormat {
    Umodel { compression: CompressionFormat },
    Obj,
}

impl MeshFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            MeshFormat::Umodel { .. } => "umodel",
            MeshFormat::Obj => "obj",
        }
    }

    pub fn encode(&self, lod: &MeshLod, name: &str) -> ExportResult<Vec<u8>> {
        match self {
            MeshFormat::Umodel { compression } => {
                ModelAsset::new(lod, name, *compression)?.to_bytes()
            }
            MeshFormat::Obj => encode_obj(lod, name),
        }
    }
}

fn encode_obj(lod: &MeshLod, name: &str) -> ExportResult<Vec<u8>> {
    lod.validate()?;

    let mut out = String::new();
    let _ = writeln!(out, "o {name}");

    for &position in &lod.positions {
        let v = export_vector(position);
        let _ = writeln!(out, "v {} {} {}", v.x, v.y, v.z);
    }
    for &uv in &lod.uvs {
        let vt = export_uv(uv);
        let _ = writeln!(out, "vt {} {}", vt.x, vt.y);
    }
    for &normal in &lod.normals {
        let vn = export_vector(normal.normalize_or_zero());
        let _ = writeln!(out, "vn {} {} {}", vn.x, vn.y, vn.z);
    }

    // OBJ indices are 1-based; winding is reversed along with the Y
    // flip so faces stay front-facing.
    for section in &lod.sections {
        let _ = writeln!(out, "usemtl {}", section.material_name);
        let first = section.first_triangle as usize * 3;
        let last = first + section.triangle_count as usize * 3;
        for tri in lod.indices[first..last].chunks_exact(3) {
            let (a, b, c) = (tri[0] + 1, tri[2] + 1, tri[1] + 1);
            let _ = writeln!(out, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}");
        }
    }

    Ok(out.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};

    use crate::mesh::MeshSection;

    fn tri_lod() -> MeshLod {
        MeshLod {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            normals: vec![Vec3::Z; 3],
            tangents: vec![Vec3::X; 3],
            uvs: vec![Vec2::ZERO, Vec2::X, Vec2::Y],
            indices: vec![0, 1, 2],
            sections: vec![MeshSection {
                first_triangle: 0,
                triangle_count: 1,
                material_name: "M_Tri".into(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_obj_output_is_valid_text() {
        let bytes = MeshFormat::Obj.encode(&tri_lod(), "Tri").unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("o Tri\n"));
        assert_eq!(text.matches("\nv ").count(), 3);
        assert_eq!(text.matches("\nvt ").count(), 3);
        assert_eq!(text.matches("\nvn ").count(), 3);
        assert!(text.contains("usemtl M_Tri\n"));
        // Winding reversed to match the Y flip.
        assert!(text.ends_with("f 1/1/1 3/3/3 2/2/2\n"));
    }

    #[test]
    fn test_obj_flips_y_like_the_binary_format() {
        let bytes = MeshFormat::Obj.encode(&tri_lod(), "Tri").unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("v 0 -1 0\n"));
    }

    #[test]
    fn test_extensions() {
        let umodel = MeshFormat::Umodel {
            compression: CompressionFormat::Gzip,
        };
        assert_eq!(umodel.extension(), "umodel");
        assert_eq!(MeshFormat::Obj.extension(), "obj");
    }
}
