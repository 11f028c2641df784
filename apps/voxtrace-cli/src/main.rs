//! voxtrace CLI
//!
//! Renders a sparse voxel octree to a PNG file on the CPU, using either
//! mask-descent or stack-AABB traversal.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -p voxtrace-cli -- [OPTIONS]
//! ```
//!
//! ## Examples
//!
//! ```bash
//! # Default sphere demo with mask descent
//! cargo run --release -p voxtrace-cli
//!
//! # Terrain through the AABB octree, traversal cost heatmap
//! cargo run --release -p voxtrace-cli -- --demo terrain --traversal aabb --debug steps
//!
//! # Import a MagicaVoxel model
//! cargo run --release -p voxtrace-cli -- --vox castle.vox --traversal aabb
//!
//! # Save the generated scene and render it again from disk
//! cargo run --release -p voxtrace-cli -- --demo cubes --save-scene cubes.vxtr
//! cargo run --release -p voxtrace-cli -- --scene cubes.vxtr -o cubes.png
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod args;

use anyhow::Context;
use glam::Vec3;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use voxtrace_render::{
    save_screenshot, Camera, CpuRenderer, MaskDescentTraversal, Palette, RenderConfig,
    StackAabbConfig, StackAabbTraversal, VoxelRayIntersector,
};
use voxtrace_scene::{build_aabb_octree, build_tree64, load_vox, EdgeRounding, VoxScene};
use voxtrace_voxel::SceneFile;

use crate::args::{parse_args, CliArgs, Traversal};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli = parse_args(&args)?;
    if cli.help {
        print_help();
        return Ok(());
    }

    let scene = load_or_generate(&cli)?;
    if let Some(path) = &cli.save_scene {
        scene
            .save(path)
            .with_context(|| format!("failed to save scene to {}", path.display()))?;
    }

    let (min, size) = scene_bounds(&scene);
    let camera = orbit_camera(&cli, min + Vec3::splat(size * 0.5), size);
    let renderer = CpuRenderer::new(
        RenderConfig::new(cli.width, cli.height).with_debug_mode(cli.debug_mode),
    );

    let output = match &scene {
        SceneFile::Tree64(tree) => render(&renderer, &MaskDescentTraversal::new(tree), &camera),
        SceneFile::Aabb(tree) => {
            let config = StackAabbConfig::default().with_child_order(cli.child_order);
            render(&renderer, &StackAabbTraversal::with_config(tree, config), &camera)
        }
    };

    save_screenshot(&output, &cli.output)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    Ok(())
}

/// Load `--scene`, or build `--vox` or the selected demo into the layout
/// `--traversal` needs.
fn load_or_generate(cli: &CliArgs) -> anyhow::Result<SceneFile> {
    if let Some(path) = &cli.scene {
        let scene = SceneFile::load(path)
            .with_context(|| format!("failed to load scene {}", path.display()))?;
        let wanted = match cli.traversal {
            Traversal::Mask => "tree64",
            Traversal::Aabb => "aabb",
        };
        if scene.kind() != wanted {
            warn!(
                "Scene {} is a {} layout; --traversal is ignored",
                path.display(),
                scene.kind()
            );
        }
        return Ok(scene);
    }

    let (grid, palette) = if let Some(path) = &cli.vox {
        let rounding = match cli.traversal {
            Traversal::Mask => EdgeRounding::PowerOfFour,
            Traversal::Aabb => EdgeRounding::PowerOfTwo,
        };
        let VoxScene { grid, palette, .. } = load_vox(path, rounding)
            .with_context(|| format!("failed to import {}", path.display()))?;
        (grid, palette)
    } else {
        info!(
            demo = cli.demo.name(),
            edge = cli.edge,
            seed = cli.seed,
            "Generating demo scene"
        );
        (cli.demo.generate(cli.edge, cli.seed), Palette::default())
    };
    let scene = match cli.traversal {
        Traversal::Mask => SceneFile::from(build_tree64(&grid, &palette)?),
        Traversal::Aabb => SceneFile::from(build_aabb_octree(&grid, &palette)?),
    };
    info!(kind = scene.kind(), nodes = scene.node_count(), "Scene ready");
    Ok(scene)
}

/// Minimum corner and edge length of the scene's root cube.
fn scene_bounds(scene: &SceneFile) -> (Vec3, f32) {
    match scene {
        SceneFile::Tree64(tree) => (tree.origin(), tree.size()),
        SceneFile::Aabb(tree) => {
            let aabb = tree.root().aabb();
            (aabb.min, aabb.size().x)
        }
    }
}

/// Camera circling `target` at `yaw` degrees, looking slightly down.
fn orbit_camera(cli: &CliArgs, target: Vec3, size: f32) -> Camera {
    let yaw = cli.yaw.to_radians();
    let radius = size * 1.4;
    let position = target + Vec3::new(yaw.sin() * radius, size * 0.7, yaw.cos() * radius);
    Camera::new(
        position,
        target,
        Vec3::Y,
        cli.fov.to_radians(),
        cli.width as f32 / cli.height as f32,
        0.1,
        size * 10.0,
    )
}

fn render(
    renderer: &CpuRenderer,
    intersector: &dyn VoxelRayIntersector,
    camera: &Camera,
) -> image::RgbaImage {
    let output = renderer.render(intersector, camera);
    let stats = output.stats;
    info!(
        traversal = intersector.name(),
        hits = stats.hits,
        aborted = stats.aborted,
        mean_iterations = stats.mean_iterations(),
        max_iterations = stats.max_iterations,
        "Rendered {} rays in {:.1} ms",
        stats.rays,
        output.trace_time.as_secs_f64() * 1000.0
    );
    output.image
}

fn print_help() {
    eprintln!(
        "voxtrace CLI: render a sparse voxel octree to an image

USAGE:
    cargo run --release -p voxtrace-cli -- [OPTIONS]

SCENE OPTIONS:
    --scene <FILE>          Load a saved scene (its layout picks the traversal)
    --vox <FILE>            Import a MagicaVoxel .vox file
    --demo <NAME>           Demo scene: sphere, terrain, cubes (default: sphere)
    --edge <N>              Demo grid edge in voxels (default: 64)
                            mask needs a power of 4, aabb a power of 2 up to 256
    --seed <N>              Terrain seed (default: 42)
    --save-scene <FILE>     Write the scene to FILE before rendering

TRAVERSAL OPTIONS:
    --traversal <NAME>      mask or aabb (default: mask)
    --child-order <NAME>    aabb child ordering: sorted, running-min (default: sorted)

IMAGE OPTIONS:
    --width <N>             Image width (default: 640)
    --height <N>            Image height (default: 360)
    --fov <DEG>             Vertical field of view (default: 50)
    --yaw <DEG>             Camera orbit angle (default: 35)
    --debug <MODE>          none, steps, depth, distance, normals (default: none)
    -o, --output <FILE>     Output image (default: voxtrace.png)

OTHER:
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)"
    );
}
