//! Terrain mesh assembly.
//!
//! Tiles every terrain component into one mesh: per-vertex attributes
//! come from each component's data interface, get the component's
//! rigid transform applied, and land in shared buffers indexed by the
//! component's precomputed base offset. Components are filled in
//! parallel (one task per component, joined before index construction)
//! and each task produces a disjoint block, so task order never
//! affects the output. Painted layers additionally produce a
//! terrain-wide grayscale raster and a per-layer vertex-color buffer.
//!
//! Precondition: components must tile without overlapping in quad
//! space. Components that map to the same raster pixel resolve
//! last-writer-wins in component order rather than racing, but the
//! result is still undefined terrain.

use std::collections::BTreeMap;

use glam::{Vec2, Vec3};
use image::{GrayImage, Luma};
use log::{debug, info};
use rayon::prelude::*;

use crate::component::TerrainComponent;
use crate::data_access::ComponentDataInterface;
use crate::error::{ExportError, ExportResult};
use crate::mesh::{Color4, MeshLod, MeshSection, VertexColorSet};

/// Assembly output: the merged mesh plus one grayscale weight raster
/// per paint layer, keyed by full layer name. Rasters are sized to the
/// terrain's quad bounding box and handed to the caller for image
/// emission.
pub struct AssembledLandscape {
    pub lod: MeshLod,
    pub weight_maps: BTreeMap<String, GrayImage>,
}

/// Per-component fill result; scattered into the shared buffers after
/// the parallel join.
struct ComponentBlock {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    tangents: Vec<Vec3>,
    uvs: Vec<Vec2>,
    weight_uvs: Vec<Vec2>,
    /// Per-vertex weights for each layer slot allocated on this
    /// component.
    layer_weights: Vec<(usize, Vec<u8>)>,
}

/// Color-buffer name for a layer: allocation names carry a
/// `_LayerInfo` suffix that the buffer name drops, truncated to the
/// 14 characters downstream tools display.
fn short_layer_name(layer_name: &str) -> String {
    let base = layer_name
        .split_once("_LayerInfo")
        .map(|(before, _)| before)
        .unwrap_or(layer_name);
    base.chars().take(14).collect()
}

pub fn assemble_landscape(
    components: &[TerrainComponent],
    material_name: &str,
) -> ExportResult<AssembledLandscape> {
    if components.is_empty() {
        return Err(ExportError::InvalidMesh(
            "terrain has no components".into(),
        ));
    }

    // All tiles must share one component size.
    let component_size_quads = components[0].component_size_quads;
    for comp in components {
        if comp.component_size_quads != component_size_quads {
            return Err(ExportError::ComponentSizeMismatch {
                component: comp.name.clone(),
                expected: component_size_quads,
                found: comp.component_size_quads,
            });
        }
    }

    let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
    let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
    for comp in components {
        comp.extend_extent(&mut min_x, &mut min_y, &mut max_x, &mut max_y);
    }

    let size_verts = component_size_quads + 1;
    let verts_per_component = (size_verts * size_verts) as usize;
    let vertex_count = components.len() * verts_per_component;
    let triangle_count = components.len() * (component_size_quads * component_size_quads) as usize * 2;
    let scale_factor = component_size_quads as f32 / (size_verts - 1) as f32;

    // Terrain-wide UV for the weightmap channel, normalized over the
    // quad bounding box.
    let raster_width = (max_x - min_x + 1) as u32;
    let raster_height = (max_y - min_y + 1) as u32;
    let uv_scale = Vec2::new(1.0 / raster_width as f32, 1.0 / raster_height as f32);

    // Layer slots are the union of allocations across all components,
    // known up front; every raster and color buffer is allocated in
    // one step before any task runs.
    let mut layer_names: Vec<String> = Vec::new();
    for comp in components {
        for alloc in &comp.layer_allocations {
            if !layer_names.iter().any(|name| name == &alloc.layer_name) {
                layer_names.push(alloc.layer_name.clone());
            }
        }
    }

    info!(
        "assembling landscape: {} components, {} verts, {} tris, {} layers",
        components.len(),
        vertex_count,
        triangle_count,
        layer_names.len()
    );

    // One task per component; collect is the join barrier. A fatal
    // error in any component aborts the whole assembly.
    let blocks: Vec<ComponentBlock> = components
        .par_iter()
        .map(|comp| {
            fill_component(comp, &layer_names, scale_factor, min_x, min_y, uv_scale)
        })
        .collect::<ExportResult<_>>()?;

    let mut lod = MeshLod {
        positions: Vec::with_capacity(vertex_count),
        normals: Vec::with_capacity(vertex_count),
        tangents: Vec::with_capacity(vertex_count),
        uvs: Vec::with_capacity(vertex_count),
        ..Default::default()
    };
    let mut weight_uvs: Vec<Vec2> = Vec::with_capacity(vertex_count);
    let mut layer_colors: Vec<Vec<Color4>> =
        vec![vec![Color4::default(); vertex_count]; layer_names.len()];
    let mut rasters: Vec<GrayImage> = layer_names
        .iter()
        .map(|_| GrayImage::new(raster_width, raster_height))
        .collect();

    // Scatter. Blocks arrive in component order; each writes a
    // disjoint vertex range and a disjoint raster region.
    for (component_index, (comp, block)) in components.iter().zip(blocks).enumerate() {
        let base_vert_index = component_index * verts_per_component;

        lod.positions.extend(block.positions);
        lod.normals.extend(block.normals);
        lod.tangents.extend(block.tangents);
        lod.uvs.extend(block.uvs);
        weight_uvs.extend(block.weight_uvs);

        for (slot, weights) in block.layer_weights {
            debug!(
                "component '{}': scattering layer '{}'",
                comp.name, layer_names[slot]
            );
            for (vert_index, &weight) in weights.iter().enumerate() {
                let vert_x = vert_index as i32 % size_verts;
                let vert_y = vert_index as i32 / size_verts;
                let pixel_x = (comp.section_base_x - min_x + vert_x) as u32;
                let pixel_y = (comp.section_base_y - min_y + vert_y) as u32;

                rasters[slot].put_pixel(pixel_x, pixel_y, Luma([weight]));
                layer_colors[slot][base_vert_index + vert_index] = Color4::splat(weight);
            }
        }
    }

    // One fixed triangulation per quad, consistent winding across the
    // whole terrain.
    let mut indices = Vec::with_capacity(triangle_count * 3);
    for component_index in 0..components.len() {
        let base = (component_index * verts_per_component) as u32;
        let stride = size_verts as u32;

        for y in 0..component_size_quads as u32 {
            for x in 0..component_size_quads as u32 {
                indices.push(base + x + y * stride);
                indices.push(base + (x + 1) + (y + 1) * stride);
                indices.push(base + (x + 1) + y * stride);

                indices.push(base + x + y * stride);
                indices.push(base + x + (y + 1) * stride);
                indices.push(base + (x + 1) + (y + 1) * stride);
            }
        }
    }

    lod.extra_uvs = vec![weight_uvs];
    lod.vertex_colors = Some(vec![Color4::default(); vertex_count]);
    lod.extra_vertex_colors = layer_names
        .iter()
        .zip(layer_colors)
        .map(|(name, colors)| VertexColorSet {
            name: short_layer_name(name),
            colors,
        })
        .collect();
    lod.indices = indices;
    lod.sections = vec![MeshSection {
        first_triangle: 0,
        triangle_count: triangle_count as u32,
        material_name: material_name.to_string(),
    }];

    let weight_maps = layer_names.into_iter().zip(rasters).collect();

    Ok(AssembledLandscape { lod, weight_maps })
}

fn fill_component(
    comp: &TerrainComponent,
    layer_names: &[String],
    scale_factor: f32,
    min_x: i32,
    min_y: i32,
    uv_scale: Vec2,
) -> ExportResult<ComponentBlock> {
    let data = ComponentDataInterface::new(comp, 0)?;
    let size_verts = data.component_size_verts();
    let vert_count = (size_verts * size_verts) as usize;

    let mut block = ComponentBlock {
        positions: Vec::with_capacity(vert_count),
        normals: Vec::with_capacity(vert_count),
        tangents: Vec::with_capacity(vert_count),
        uvs: Vec::with_capacity(vert_count),
        weight_uvs: Vec::with_capacity(vert_count),
        layer_weights: comp
            .layer_allocations
            .iter()
            .filter_map(|alloc| {
                layer_names
                    .iter()
                    .position(|name| name == &alloc.layer_name)
                    .map(|slot| (slot, vec![0u8; vert_count]))
            })
            .collect(),
    };

    for vert_index in 0..vert_count as i32 {
        let (vert_x, vert_y) = data.vertex_index_to_xy(vert_index);

        block
            .positions
            .push(data.local_vertex(vert_x, vert_y) + comp.relative_location);

        let (tangent_x, _binormal, normal) = data.tangent_basis(vert_x, vert_y);
        block.normals.push((normal / comp.scale).normalize_or_zero());
        block
            .tangents
            .push((tangent_x / comp.scale).normalize_or_zero());

        let uv = Vec2::new(
            vert_x as f32 * scale_factor + comp.section_base_x as f32,
            vert_y as f32 * scale_factor + comp.section_base_y as f32,
        );
        block.uvs.push(uv);
        block
            .weight_uvs
            .push((uv - Vec2::new(min_x as f32, min_y as f32)) * uv_scale);

        for slot_index in 0..block.layer_weights.len() {
            let (slot, _) = block.layer_weights[slot_index];
            let weight = data.layer_weight(vert_x, vert_y, &layer_names[slot])?;
            block.layer_weights[slot_index].1[vert_index as usize] = weight;
        }
    }

    Ok(block)
}
