//! Command line parsing.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use voxtrace_render::{ChildOrder, DebugMode};
use voxtrace_scene::DemoScene;

/// Largest image the CLI will render.
const MAX_PIXELS: u64 = 1 << 28;

/// Which traversal renders the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Traversal {
    /// Mask descent over a 64-ary tree.
    #[default]
    Mask,
    /// Stack traversal over an AABB octree.
    Aabb,
}

impl Traversal {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "mask" | "mask-descent" => Some(Self::Mask),
            "aabb" | "stack-aabb" => Some(Self::Aabb),
            _ => None,
        }
    }
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub help: bool,
    pub scene: Option<PathBuf>,
    /// MagicaVoxel file to import instead of a demo.
    pub vox: Option<PathBuf>,
    pub demo: DemoScene,
    pub edge: u32,
    pub seed: u64,
    pub traversal: Traversal,
    pub child_order: ChildOrder,
    pub width: u32,
    pub height: u32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    /// Camera orbit angle around the scene in degrees.
    pub yaw: f32,
    pub debug_mode: DebugMode,
    pub output: PathBuf,
    pub save_scene: Option<PathBuf>,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            help: false,
            scene: None,
            vox: None,
            demo: DemoScene::default(),
            edge: 64,
            seed: 42,
            traversal: Traversal::default(),
            child_order: ChildOrder::default(),
            width: 640,
            height: 360,
            fov: 50.0,
            yaw: 35.0,
            debug_mode: DebugMode::None,
            output: PathBuf::from("voxtrace.png"),
            save_scene: None,
        }
    }
}

/// Consume the value following the flag at `*i`.
fn value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> anyhow::Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{flag} needs a value"))
}

fn number<T: std::str::FromStr>(args: &[String], i: &mut usize, flag: &str) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = value(args, i, flag)?;
    raw.parse()
        .with_context(|| format!("invalid value {raw:?} for {flag}"))
}

/// Parse arguments; `args[0]` is the program name.
pub fn parse_args(args: &[String]) -> anyhow::Result<CliArgs> {
    let mut cli = CliArgs::default();

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "-h" | "--help" => cli.help = true,
            "--scene" => cli.scene = Some(PathBuf::from(value(args, &mut i, flag)?)),
            "--vox" => cli.vox = Some(PathBuf::from(value(args, &mut i, flag)?)),
            "--demo" => {
                let name = value(args, &mut i, flag)?;
                cli.demo =
                    DemoScene::from_name(name).ok_or_else(|| anyhow!("unknown demo {name:?}"))?;
            }
            "--edge" => cli.edge = number(args, &mut i, flag)?,
            "--seed" => cli.seed = number(args, &mut i, flag)?,
            "--traversal" => {
                let name = value(args, &mut i, flag)?;
                cli.traversal = Traversal::from_name(name)
                    .ok_or_else(|| anyhow!("unknown traversal {name:?}"))?;
            }
            "--child-order" => {
                let name = value(args, &mut i, flag)?;
                cli.child_order = ChildOrder::from_name(name)
                    .ok_or_else(|| anyhow!("unknown child order {name:?}"))?;
            }
            "--width" => cli.width = number(args, &mut i, flag)?,
            "--height" => cli.height = number(args, &mut i, flag)?,
            "--fov" => cli.fov = number(args, &mut i, flag)?,
            "--yaw" => cli.yaw = number(args, &mut i, flag)?,
            "--debug" => {
                let name = value(args, &mut i, flag)?;
                cli.debug_mode = DebugMode::from_name(name)
                    .ok_or_else(|| anyhow!("unknown debug mode {name:?}"))?;
            }
            "-o" | "--output" => cli.output = PathBuf::from(value(args, &mut i, flag)?),
            "--save-scene" => cli.save_scene = Some(PathBuf::from(value(args, &mut i, flag)?)),
            other => bail!("unknown argument {other:?}, see --help"),
        }
        i += 1;
    }

    if cli.scene.is_some() && cli.vox.is_some() {
        bail!("--scene and --vox are mutually exclusive");
    }
    if cli.width == 0 || cli.height == 0 {
        bail!("image size must be positive, got {}x{}", cli.width, cli.height);
    }
    let pixels = u64::from(cli.width) * u64::from(cli.height);
    if pixels > MAX_PIXELS {
        bail!("{}x{} is {pixels} pixels, the limit is {MAX_PIXELS}", cli.width, cli.height);
    }
    if !(1.0..180.0).contains(&cli.fov) {
        bail!("field of view must be between 1 and 180 degrees, got {}", cli.fov);
    }
    Ok(cli)
}
