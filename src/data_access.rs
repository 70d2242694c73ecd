//! Per-component terrain data access.
//!
//! Reconstructs continuous geometry from a component's texel block in
//! the shared heightmap atlas: the 16-bit height code spans the R/G
//! channels, the tangent-space normal the B/A channels, and painted
//! layer weights one channel of a companion weight texture. Built with
//! an explicit mip level (0 = full resolution); an unsupported pixel
//! format, an out-of-range mip or missing bulk data is fatal at
//! construction, because the component cannot be reconstructed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use glam::Vec3;

use crate::component::{LayerAllocation, TerrainComponent};
use crate::error::{ExportError, ExportResult};
use crate::texture::{Bgra, PixelFormat, TextureSource, WEIGHT_CHANNEL_OFFSETS};

/// World units per height code step.
const HEIGHT_SCALE: f32 = 1.0 / 128.0;
/// Height code that maps to world height zero.
const HEIGHT_MID_VALUE: f32 = 32768.0;

pub struct ComponentDataInterface<'a> {
    component: &'a TerrainComponent,
    mip_level: usize,
    height_texels: Vec<Bgra>,
    heightmap_stride: i32,
    heightmap_offset_x: i32,
    heightmap_offset_y: i32,
    component_size_verts: i32,
    subsection_size_verts: i32,
    /// One decoded channel per requested layer, keyed by layer name.
    weight_cache: Mutex<HashMap<String, Arc<Vec<u8>>>>,
}

impl<'a> ComponentDataInterface<'a> {
    pub fn new(component: &'a TerrainComponent, mip_level: usize) -> ExportResult<Self> {
        let heightmap = component.heightmap.as_ref();

        if heightmap.format() != PixelFormat::B8G8R8A8 {
            return Err(ExportError::UnsupportedPixelFormat {
                texture: heightmap.name().to_string(),
                format: heightmap.format(),
            });
        }
        if mip_level >= heightmap.mip_count() {
            return Err(ExportError::MipLevelOutOfRange {
                texture: heightmap.name().to_string(),
                mip_level,
                mip_count: heightmap.mip_count(),
            });
        }

        let bulk = heightmap.mip_bulk_data(mip_level)?;
        let height_texels: Vec<Bgra> = bytemuck::try_cast_slice(&bulk)
            .map_err(|_| {
                ExportError::MalformedAsset(format!(
                    "heightmap '{}' bulk size {} is not texel aligned",
                    heightmap.name(),
                    bulk.len()
                ))
            })?
            .to_vec();

        let mip_size_x = (heightmap.size_x() >> mip_level) as f32;
        let mip_size_y = (heightmap.size_y() >> mip_level) as f32;
        let bias = component.heightmap_scale_bias;

        let data = Self {
            component,
            mip_level,
            height_texels,
            heightmap_stride: (heightmap.size_x() >> mip_level) as i32,
            heightmap_offset_x: (mip_size_x * bias.z) as i32,
            heightmap_offset_y: (mip_size_y * bias.w) as i32,
            component_size_verts: (component.component_size_quads + 1) >> mip_level,
            subsection_size_verts: (component.subsection_size_quads + 1) >> mip_level,
            weight_cache: Mutex::new(HashMap::new()),
        };

        // The subsection math divides by `subsection_size_verts - 1`;
        // a mip coarse enough to leave a single vertex per subsection
        // cannot be reconstructed.
        if data.subsection_size_verts < 2 {
            return Err(ExportError::MalformedAsset(format!(
                "mip {} collapses a subsection of heightmap '{}' to a single vertex",
                mip_level,
                heightmap.name()
            )));
        }

        // Texel mapping is monotonic in both axes, so the extreme
        // vertices bound every index the queries will form. Catching a
        // short or mislocated texel block here keeps per-vertex reads
        // infallible.
        let last = data.component_size_verts - 1;
        let (max_x, max_y) = data.vertex_to_texel(last, last);
        let min_index = data.heightmap_offset_x + data.heightmap_offset_y * data.heightmap_stride;
        let max_index = (max_x + data.heightmap_offset_x)
            + (max_y + data.heightmap_offset_y) * data.heightmap_stride;
        if min_index < 0
            || max_x + data.heightmap_offset_x >= data.heightmap_stride
            || max_index as usize >= data.height_texels.len()
        {
            return Err(ExportError::MalformedAsset(format!(
                "component '{}' needs heightmap texels up to ({}, {}) but '{}' mip {} holds {}",
                component.name,
                max_x + data.heightmap_offset_x,
                max_y + data.heightmap_offset_y,
                heightmap.name(),
                mip_level,
                data.height_texels.len()
            )));
        }

        Ok(data)
    }

    pub fn component_size_verts(&self) -> i32 {
        self.component_size_verts
    }

    pub fn vertex_index_to_xy(&self, vertex_index: i32) -> (i32, i32) {
        (
            vertex_index % self.component_size_verts,
            vertex_index / self.component_size_verts,
        )
    }

    /// Split a component-local vertex coordinate into subsection index
    /// and offset. Computed as if looking for the previous vertex, so
    /// the vertex shared by two adjacent subsections lands in the
    /// lower-indexed one; coordinate 0 clamps to subsection 0.
    pub fn component_xy_to_subsection_xy(&self, comp_x: i32, comp_y: i32) -> (i32, i32, i32, i32) {
        let sub_verts = self.subsection_size_verts;

        let mut sub_num_x = (comp_x - 1) / (sub_verts - 1);
        let mut sub_num_y = (comp_y - 1) / (sub_verts - 1);
        let mut sub_x = (comp_x - 1) % (sub_verts - 1) + 1;
        let mut sub_y = (comp_y - 1) % (sub_verts - 1) + 1;

        // Asking for the first vertex leaves the division at its
        // truncated zero with a zero offset; anything further negative
        // clamps to subsection 0, offset 0.
        if sub_num_x < 0 {
            sub_num_x = 0;
            sub_x = 0;
        }
        if sub_num_y < 0 {
            sub_num_y = 0;
            sub_y = 0;
        }

        (sub_num_x, sub_num_y, sub_x, sub_y)
    }

    /// Component-local vertex coordinate to texel coordinate inside
    /// this component's block. Subsections store their boundary rows
    /// redundantly, hence the subsection-sized stride.
    pub fn vertex_to_texel(&self, vert_x: i32, vert_y: i32) -> (i32, i32) {
        let (sub_num_x, sub_num_y, sub_x, sub_y) = self.component_xy_to_subsection_xy(vert_x, vert_y);
        (
            sub_num_x * self.subsection_size_verts + sub_x,
            sub_num_y * self.subsection_size_verts + sub_y,
        )
    }

    fn height_texel(&self, local_x: i32, local_y: i32) -> &Bgra {
        debug_assert!(local_x >= 0 && local_x < self.component_size_verts);
        debug_assert!(local_y >= 0 && local_y < self.component_size_verts);

        let (texel_x, texel_y) = self.vertex_to_texel(local_x, local_y);
        let index = (texel_x + self.heightmap_offset_x)
            + (texel_y + self.heightmap_offset_y) * self.heightmap_stride;
        &self.height_texels[index as usize]
    }

    /// 16-bit height code: R is the high byte, G the low byte.
    pub fn height(&self, local_x: i32, local_y: i32) -> u16 {
        let texel = self.height_texel(local_x, local_y);
        ((texel.r as u16) << 8) | texel.g as u16
    }

    /// World height for a raw height code.
    pub fn local_height(height: u16) -> f32 {
        (height as f32 - HEIGHT_MID_VALUE) * HEIGHT_SCALE
    }

    /// Vertex position in component-local space.
    pub fn local_vertex(&self, local_x: i32, local_y: i32) -> Vec3 {
        let scale_factor =
            self.component.component_size_quads as f32 / (self.component_size_verts - 1) as f32;
        let (x_offset, y_offset) = self.xy_offset(local_x, local_y);
        Vec3::new(
            local_x as f32 * scale_factor + x_offset,
            local_y as f32 * scale_factor + y_offset,
            Self::local_height(self.height(local_x, local_y)),
        )
    }

    /// Planar offset from the component's offset map. Default terrain
    /// carries no offset map, so this is zero.
    fn xy_offset(&self, _local_x: i32, _local_y: i32) -> (f32, f32) {
        (0.0, 0.0)
    }

    /// Un-normalized tangent frame (tangent X, binormal, normal)
    /// decoded from the B/A normal channels. Callers normalize after
    /// inverse-scaling by the component's non-uniform scale.
    pub fn tangent_basis(&self, local_x: i32, local_y: i32) -> (Vec3, Vec3, Vec3) {
        let texel = self.height_texel(local_x, local_y);

        let normal_x = 2.0 * texel.b as f32 / 255.0 - 1.0;
        let normal_y = 2.0 * texel.a as f32 / 255.0 - 1.0;
        let normal_z = (1.0 - (normal_x * normal_x + normal_y * normal_y)).max(0.0).sqrt();

        let normal = Vec3::new(normal_x, normal_y, normal_z);
        let tangent_x = Vec3::new(-normal_z, 0.0, normal_x);
        let binormal = Vec3::new(0.0, normal_z, -normal_y);
        (tangent_x, binormal, normal)
    }

    /// Paint weight of `layer_name` at a local vertex. A layer with no
    /// allocation on this component weighs 0; that is data, not an
    /// error. The first request for a layer decodes its entire weight
    /// channel and caches it under the layer name.
    pub fn layer_weight(&self, local_x: i32, local_y: i32, layer_name: &str) -> ExportResult<u8> {
        let Some(alloc) = self.component.allocation(layer_name) else {
            return Ok(0);
        };
        let Some(texture) = self.component.weightmap_textures.get(alloc.texture_index) else {
            return Ok(0);
        };
        if alloc.channel >= 4 {
            return Ok(0);
        }

        let channel_data = self.weight_channel(layer_name, alloc, texture.as_ref())?;

        let stride = (texture.size_x() >> self.mip_level) as i32;
        let bias = self.component.weightmap_scale_bias;
        let offset_x = ((texture.size_x() >> self.mip_level) as f32 * bias.z) as i32;
        let offset_y = ((texture.size_y() >> self.mip_level) as f32 * bias.w) as i32;

        let (texel_x, texel_y) = self.vertex_to_texel(local_x, local_y);
        let index = (texel_x + offset_x) + (texel_y + offset_y) * stride;

        channel_data
            .get(index as usize)
            .copied()
            .ok_or_else(|| {
                ExportError::MalformedAsset(format!(
                    "weight texel ({texel_x}, {texel_y}) outside texture '{}'",
                    texture.name()
                ))
            })
    }

    fn weight_channel(
        &self,
        layer_name: &str,
        alloc: &LayerAllocation,
        texture: &dyn TextureSource,
    ) -> ExportResult<Arc<Vec<u8>>> {
        let mut cache = self
            .weight_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = cache.get(layer_name) {
            return Ok(cached.clone());
        }

        if texture.format() != PixelFormat::B8G8R8A8 {
            return Err(ExportError::UnsupportedPixelFormat {
                texture: texture.name().to_string(),
                format: texture.format(),
            });
        }
        if self.mip_level >= texture.mip_count() {
            return Err(ExportError::MipLevelOutOfRange {
                texture: texture.name().to_string(),
                mip_level: self.mip_level,
                mip_count: texture.mip_count(),
            });
        }

        let bulk = texture.mip_bulk_data(self.mip_level)?;
        let offset = WEIGHT_CHANNEL_OFFSETS[alloc.channel as usize];
        let channel: Vec<u8> = bulk.chunks_exact(4).map(|texel| texel[offset]).collect();

        let channel = Arc::new(channel);
        cache.insert(layer_name.to_string(), channel.clone());
        Ok(channel)
    }
}
