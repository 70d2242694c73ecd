//! Terrain component model.
//!
//! One component is a square tile of a larger terrain. Its heightmap
//! texels live inside a shared atlas texture, located by a scale/bias
//! vector; painted layers are allocated to one channel of one of the
//! component's weight textures. All fields arrive pre-parsed from the
//! object deserialization layer and are read-only here.

use std::sync::Arc;

use glam::{Vec3, Vec4};

use crate::texture::TextureSource;

/// Maps a named paint layer to a channel of one weight texture.
#[derive(Clone, Debug)]
pub struct LayerAllocation {
    pub layer_name: String,
    pub texture_index: usize,
    /// Channel 0..=3 within the 4-channel texel (R, G, B, A).
    pub channel: u8,
}

pub struct TerrainComponent {
    pub name: String,
    /// Base offset of this tile in terrain-wide quad units.
    pub section_base_x: i32,
    pub section_base_y: i32,
    pub component_size_quads: i32,
    pub subsection_size_quads: i32,
    pub num_subsections: i32,
    /// ZW hold the fractional texel offset of this component's block
    /// inside the shared heightmap atlas.
    pub heightmap_scale_bias: Vec4,
    pub weightmap_scale_bias: Vec4,
    /// Rigid placement of this component in terrain space.
    pub relative_location: Vec3,
    /// Non-uniform component scale; normals and tangents are
    /// inverse-scaled by this before renormalization.
    pub scale: Vec3,
    pub heightmap: Arc<dyn TextureSource>,
    pub weightmap_textures: Vec<Arc<dyn TextureSource>>,
    pub layer_allocations: Vec<LayerAllocation>,
}

impl TerrainComponent {
    /// Grow a terrain-wide quad bounding box to cover this component.
    pub fn extend_extent(&self, min_x: &mut i32, min_y: &mut i32, max_x: &mut i32, max_y: &mut i32) {
        *min_x = (*min_x).min(self.section_base_x);
        *min_y = (*min_y).min(self.section_base_y);
        *max_x = (*max_x).max(self.section_base_x + self.component_size_quads);
        *max_y = (*max_y).max(self.section_base_y + self.component_size_quads);
    }

    /// The allocation for a layer painted on this component, if any.
    /// Most components use a strict subset of the terrain's palette.
    pub fn allocation(&self, layer_name: &str) -> Option<&LayerAllocation> {
        self.layer_allocations
            .iter()
            .find(|alloc| alloc.layer_name == layer_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::{PixelFormat, Texture2d};

    fn stub_component(base_x: i32, base_y: i32, quads: i32) -> TerrainComponent {
        let heightmap = Arc::new(Texture2d::new(
            "Heightmap",
            PixelFormat::B8G8R8A8,
            (quads + 1) as u32,
            (quads + 1) as u32,
            vec![0; ((quads + 1) * (quads + 1) * 4) as usize],
        ));
        TerrainComponent {
            name: format!("Component_{base_x}_{base_y}"),
            section_base_x: base_x,
            section_base_y: base_y,
            component_size_quads: quads,
            subsection_size_quads: quads,
            num_subsections: 1,
            heightmap_scale_bias: Vec4::ZERO,
            weightmap_scale_bias: Vec4::ZERO,
            relative_location: Vec3::ZERO,
            scale: Vec3::ONE,
            heightmap,
            weightmap_textures: Vec::new(),
            layer_allocations: Vec::new(),
        }
    }

    #[test]
    fn test_extent_merge() {
        let a = stub_component(0, 0, 4);
        let b = stub_component(4, 8, 4);

        let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
        let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
        a.extend_extent(&mut min_x, &mut min_y, &mut max_x, &mut max_y);
        b.extend_extent(&mut min_x, &mut min_y, &mut max_x, &mut max_y);

        assert_eq!((min_x, min_y, max_x, max_y), (0, 0, 8, 12));
    }

    #[test]
    fn test_allocation_lookup() {
        let mut comp = stub_component(0, 0, 4);
        comp.layer_allocations.push(LayerAllocation {
            layer_name: "Grass_LayerInfo".into(),
            texture_index: 0,
            channel: 1,
        });

        assert!(comp.allocation("Grass_LayerInfo").is_some());
        assert!(comp.allocation("Rock_LayerInfo").is_none());
    }
}
