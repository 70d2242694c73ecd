//! Assembled mesh structures.
//!
//! `MeshLod` is the generic mesh every encoder consumes: flat vertex
//! attribute buffers of equal length, a 32-bit index buffer and one or
//! more material sections. Terrain layers ride along as named extra
//! vertex-color buffers.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::error::{ExportError, ExportResult};

/// 8-bit RGBA vertex color, serialized in field order.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Color4 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color4 {
    pub fn splat(v: u8) -> Self {
        Self {
            r: v,
            g: v,
            b: v,
            a: v,
        }
    }
}

/// A named per-vertex color buffer (one per terrain paint layer).
pub struct VertexColorSet {
    pub name: String,
    pub colors: Vec<Color4>,
}

/// A contiguous triangle range bound to one material.
#[derive(Clone, Debug)]
pub struct MeshSection {
    pub first_triangle: u32,
    pub triangle_count: u32,
    pub material_name: String,
}

#[derive(Default)]
pub struct MeshLod {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec3>,
    /// Primary texture UV channel.
    pub uvs: Vec<Vec2>,
    /// Additional UV channels; terrain puts its terrain-wide weightmap
    /// UV in channel 0 here.
    pub extra_uvs: Vec<Vec<Vec2>>,
    pub vertex_colors: Option<Vec<Color4>>,
    pub extra_vertex_colors: Vec<VertexColorSet>,
    pub indices: Vec<u32>,
    pub sections: Vec<MeshSection>,
}

impl MeshLod {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Index values above the 16-bit range force wide-index output in
    /// formats that would otherwise narrow them.
    pub fn needs_wide_indices(&self) -> bool {
        self.indices.iter().any(|&i| i > u16::MAX as u32)
    }

    /// Check the cross-buffer invariants every encoder relies on.
    pub fn validate(&self) -> ExportResult<()> {
        let verts = self.positions.len();

        if self.normals.len() != verts || self.tangents.len() != verts || self.uvs.len() != verts {
            return Err(ExportError::InvalidMesh(format!(
                "attribute buffers disagree: {} positions, {} normals, {} tangents, {} uvs",
                verts,
                self.normals.len(),
                self.tangents.len(),
                self.uvs.len()
            )));
        }

        for (channel, uvs) in self.extra_uvs.iter().enumerate() {
            if uvs.len() != verts {
                return Err(ExportError::InvalidMesh(format!(
                    "extra UV channel {channel} has {} entries for {verts} vertices",
                    uvs.len()
                )));
            }
        }

        if let Some(colors) = &self.vertex_colors {
            if colors.len() != verts {
                return Err(ExportError::InvalidMesh(format!(
                    "vertex color buffer has {} entries for {verts} vertices",
                    colors.len()
                )));
            }
        }

        for set in &self.extra_vertex_colors {
            if set.colors.len() != verts {
                return Err(ExportError::InvalidMesh(format!(
                    "color buffer '{}' has {} entries for {verts} vertices",
                    set.name,
                    set.colors.len()
                )));
            }
        }

        if self.indices.len() % 3 != 0 {
            return Err(ExportError::InvalidMesh(format!(
                "index count {} is not a triangle list",
                self.indices.len()
            )));
        }
        if let Some(&out_of_range) = self.indices.iter().find(|&&i| i as usize >= verts) {
            return Err(ExportError::InvalidMesh(format!(
                "index {out_of_range} out of range for {verts} vertices"
            )));
        }

        if self.sections.is_empty() {
            return Err(ExportError::InvalidMesh("mesh has no sections".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_lod() -> MeshLod {
        MeshLod {
            positions: vec![Vec3::ZERO; 4],
            normals: vec![Vec3::Z; 4],
            tangents: vec![Vec3::X; 4],
            uvs: vec![Vec2::ZERO; 4],
            indices: vec![0, 3, 2, 0, 1, 3],
            sections: vec![MeshSection {
                first_triangle: 0,
                triangle_count: 2,
                material_name: "M_Default".into(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_quad() {
        assert!(quad_lod().validate().is_ok());
    }

    #[test]
    fn test_mismatched_buffer_rejected() {
        let mut lod = quad_lod();
        lod.normals.pop();
        assert!(lod.validate().is_err());
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let mut lod = quad_lod();
        lod.indices[0] = 4;
        assert!(lod.validate().is_err());
    }

    #[test]
    fn test_short_extra_color_buffer_rejected() {
        let mut lod = quad_lod();
        lod.extra_vertex_colors.push(VertexColorSet {
            name: "Grass".into(),
            colors: vec![Color4::default(); 3],
        });
        assert!(lod.validate().is_err());
    }

    #[test]
    fn test_wide_index_detection() {
        let mut lod = quad_lod();
        assert!(!lod.needs_wide_indices());
        lod.positions.resize(70_000, Vec3::ZERO);
        lod.normals.resize(70_000, Vec3::Z);
        lod.tangents.resize(70_000, Vec3::X);
        lod.uvs.resize(70_000, Vec2::ZERO);
        lod.indices = vec![0, 66_000, 1];
        assert!(lod.needs_wide_indices());
        assert!(lod.validate().is_ok());
    }
}
