use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use glam::{Vec3, Vec4};
use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use landscape_exporter::component::{LayerAllocation, TerrainComponent};
use landscape_exporter::texture::{PixelFormat, Texture2d, WEIGHT_CHANNEL_OFFSETS};
use landscape_exporter::{assemble_landscape, CompressionFormat, MeshFormat};

#[derive(Parser, Debug)]
#[command(name = "landscape_exporter")]
#[command(about = "Assemble a procedural terrain and export it as a chunked binary mesh")]
struct Args {
    /// Components per side of the terrain grid
    #[arg(short, long, default_value = "2")]
    grid: i32,

    /// Quads per component side
    #[arg(short, long, default_value = "63")]
    quads: i32,

    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Output path without extension (e.g., "out/landscape")
    #[arg(short, long, default_value = "landscape")]
    output: PathBuf,

    /// Output format: "umodel" or "obj"
    #[arg(short, long, default_value = "umodel")]
    format: String,

    /// Body compression for the binary format: NONE, GZIP or ZSTD
    #[arg(long, default_value = "NONE")]
    compression: String,

    /// Skip writing the per-layer weight map PNGs
    #[arg(long)]
    no_weight_maps: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let compression: CompressionFormat = args
        .compression
        .parse()
        .context("unrecognized compression name")?;
    let format = match args.format.as_str() {
        "umodel" => MeshFormat::Umodel { compression },
        "obj" => MeshFormat::Obj,
        other => bail!("unrecognized format '{other}' (expected \"umodel\" or \"obj\")"),
    };
    if args.grid < 1 || args.quads < 1 {
        bail!("grid and quads must both be at least 1");
    }

    let seed = args.seed.unwrap_or_else(|| rand::random());
    println!("Generating terrain with seed: {}", seed);
    println!(
        "Terrain size: {0}x{0} components, {1} quads each",
        args.grid, args.quads
    );

    let components = synthesize_terrain(args.grid, args.quads, seed);

    println!("Assembling mesh from {} components...", components.len());
    let assembled = assemble_landscape(&components, "M_Landscape")?;
    println!(
        "Assembled {} vertices, {} triangles, {} paint layers",
        assembled.lod.vertex_count(),
        assembled.lod.triangle_count(),
        assembled.weight_maps.len()
    );

    let mesh_path = args.output.with_extension(format.extension());
    if let Some(parent) = mesh_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let bytes = format.encode(&assembled.lod, "Landscape")?;
    std::fs::write(&mesh_path, &bytes).with_context(|| format!("writing {}", mesh_path.display()))?;
    println!("Wrote {} ({} bytes)", mesh_path.display(), bytes.len());

    if !args.no_weight_maps {
        for (layer_name, raster) in &assembled.weight_maps {
            let stem = args
                .output
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "landscape".to_string());
            let png_path = args
                .output
                .with_file_name(format!("{stem}_{layer_name}.png"));
            raster
                .save(&png_path)
                .with_context(|| format!("writing {}", png_path.display()))?;
            println!("Wrote {}", png_path.display());
        }
    }

    Ok(())
}

/// Builds a grid of terrain components with height, normal and paint
/// data packed into textures the same way the engine packs them: the
/// 16-bit height code split across R/G, the normal's XY across B/A,
/// and layer weights in weight texture channels.
fn synthesize_terrain(grid: i32, quads: i32, seed: u64) -> Vec<TerrainComponent> {
    let perlin = Perlin::new(seed as u32);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let size_verts = quads + 1;

    let height_at = |gx: f32, gy: f32| -> f32 {
        let freq = 0.03;
        let base = perlin.get([(gx * freq) as f64, (gy * freq) as f64]) as f32;
        let detail = perlin.get([(gx * freq * 4.0) as f64, (gy * freq * 4.0) as f64]) as f32;
        base * 40.0 + detail * 6.0
    };

    let mut components = Vec::with_capacity((grid * grid) as usize);
    for comp_y in 0..grid {
        for comp_x in 0..grid {
            let base_x = comp_x * quads;
            let base_y = comp_y * quads;

            let mut height_bytes = vec![0u8; (size_verts * size_verts * 4) as usize];
            let mut weight_bytes = vec![0u8; (size_verts * size_verts * 4) as usize];
            let mut rock_painted = false;

            for y in 0..size_verts {
                for x in 0..size_verts {
                    let gx = (base_x + x) as f32;
                    let gy = (base_y + y) as f32;
                    let h = height_at(gx, gy);

                    let code = (h * 128.0 + 32768.0).round().clamp(0.0, 65535.0) as u16;
                    let slope_x = (height_at(gx + 1.0, gy) - height_at(gx - 1.0, gy)) / 2.0;
                    let slope_y = (height_at(gx, gy + 1.0) - height_at(gx, gy - 1.0)) / 2.0;
                    let normal = Vec3::new(-slope_x, -slope_y, 1.0).normalize();

                    // BGRA texel: height code in R/G, normal XY in B/A.
                    let texel = ((y * size_verts + x) * 4) as usize;
                    height_bytes[texel] = ((normal.x * 0.5 + 0.5) * 255.0).round() as u8;
                    height_bytes[texel + 1] = (code & 0xFF) as u8;
                    height_bytes[texel + 2] = (code >> 8) as u8;
                    height_bytes[texel + 3] = ((normal.y * 0.5 + 0.5) * 255.0).round() as u8;

                    // Rock takes over on steep or high ground, with a
                    // little jitter so the border is not a hard line.
                    let steepness = (slope_x * slope_x + slope_y * slope_y).sqrt();
                    let jitter: f32 = rng.gen_range(-0.1..0.1);
                    let rock = ((h - 15.0) / 10.0 + steepness + jitter).clamp(0.0, 1.0);
                    let rock_byte = (rock * 255.0).round() as u8;
                    if rock_byte > 0 {
                        rock_painted = true;
                    }
                    weight_bytes[texel + WEIGHT_CHANNEL_OFFSETS[0]] = 255 - rock_byte;
                    weight_bytes[texel + WEIGHT_CHANNEL_OFFSETS[1]] = rock_byte;
                }
            }

            let name = format!("LandscapeComponent_{comp_x}_{comp_y}");
            let heightmap = Arc::new(Texture2d::new(
                &format!("{name}_Heightmap"),
                PixelFormat::B8G8R8A8,
                size_verts as u32,
                size_verts as u32,
                height_bytes,
            ));
            let weightmap = Arc::new(Texture2d::new(
                &format!("{name}_Weightmap"),
                PixelFormat::B8G8R8A8,
                size_verts as u32,
                size_verts as u32,
                weight_bytes,
            ));

            let mut layer_allocations = vec![LayerAllocation {
                layer_name: "Grass_LayerInfo".into(),
                texture_index: 0,
                channel: 0,
            }];
            if rock_painted {
                layer_allocations.push(LayerAllocation {
                    layer_name: "Rock_LayerInfo".into(),
                    texture_index: 0,
                    channel: 1,
                });
            }

            components.push(TerrainComponent {
                name,
                section_base_x: base_x,
                section_base_y: base_y,
                component_size_quads: quads,
                subsection_size_quads: quads,
                num_subsections: 1,
                heightmap_scale_bias: Vec4::ZERO,
                weightmap_scale_bias: Vec4::ZERO,
                relative_location: Vec3::new(base_x as f32, base_y as f32, 0.0),
                scale: Vec3::ONE,
                heightmap,
                weightmap_textures: vec![weightmap],
                layer_allocations,
            });
        }
    }

    components
}
