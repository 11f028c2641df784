//! MagicaVoxel `.vox` import.
//!
//! Every shape in the scene graph is placed with its accumulated translation
//! and rotation, the union is shifted to the origin and padded to an edge the
//! chosen octree builder accepts. MagicaVoxel is Z-up; the grid is Y-up, so
//! file `(x, y, z)` lands at grid `(x, z, y)`.

use std::path::Path;

use dot_vox::{DotVoxData, Model, SceneNode};
use glam::{IVec3, UVec3};
use tracing::{debug, info, warn};
use voxtrace_core::constants::CELLS_PER_AXIS;
use voxtrace_core::{Error, Result};
use voxtrace_voxel::Palette;

use crate::grid::VoxelGrid;

/// Largest grid edge an import may produce.
pub const MAX_VOX_EDGE: u32 = 1024;

/// Edge sizes the target builder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeRounding {
    /// Round up to a power of two, for the AABB octree.
    PowerOfTwo,
    /// Round up to a power of four, for the 64-ary tree.
    PowerOfFour,
}

impl EdgeRounding {
    /// Smallest accepted edge that fits `extent` voxels, at least 4.
    pub fn round(self, extent: u32) -> u32 {
        let extent = extent.max(CELLS_PER_AXIS);
        match self {
            Self::PowerOfTwo => extent.next_power_of_two(),
            Self::PowerOfFour => {
                let mut edge = CELLS_PER_AXIS;
                while edge < extent {
                    edge *= CELLS_PER_AXIS;
                }
                edge
            }
        }
    }
}

/// A voxelized `.vox` scene ready for either builder.
#[derive(Debug, Clone)]
pub struct VoxScene {
    /// Voxels, holding the file's 1-based color indices.
    pub grid: VoxelGrid,
    /// The file's palette, shifted so index 0 stays air.
    pub palette: Palette,
    /// Size of the occupied region before padding.
    pub extent: UVec3,
}

/// Load a `.vox` file from disk.
pub fn load_vox(path: impl AsRef<Path>, rounding: EdgeRounding) -> Result<VoxScene> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let scene = parse_vox(&bytes, rounding)?;
    info!(
        "Imported {} ({}x{}x{} in a {} grid)",
        path.display(),
        scene.extent.x,
        scene.extent.y,
        scene.extent.z,
        scene.grid.edge()
    );
    Ok(scene)
}

/// Parse `.vox` bytes.
pub fn parse_vox(bytes: &[u8], rounding: EdgeRounding) -> Result<VoxScene> {
    let data = dot_vox::load_bytes(bytes).map_err(|e| Error::InvalidData(format!("vox: {e}")))?;

    let mut voxels = Vec::new();
    collect_voxels(&data, |model, placement| {
        voxels.extend(model.voxels.iter().map(|v| {
            let local = IVec3::new(i32::from(v.x), i32::from(v.y), i32::from(v.z));
            (placement.apply(local, model), v.i)
        }));
    })?;

    let palette = shifted_palette(&data);
    let Some((min, max)) = bounds(voxels.iter().map(|(p, _)| *p)) else {
        return Ok(VoxScene {
            grid: VoxelGrid::new(rounding.round(0)),
            palette,
            extent: UVec3::ZERO,
        });
    };

    // Z-up to Y-up
    let extent = (max - min + IVec3::ONE).as_uvec3();
    let extent = UVec3::new(extent.x, extent.z, extent.y);
    let edge = rounding.round(extent.max_element());
    if edge > MAX_VOX_EDGE {
        return Err(Error::OutOfBounds(format!(
            "vox scene spans {extent}, larger than a {MAX_VOX_EDGE} grid"
        )));
    }

    let mut grid = VoxelGrid::new(edge);
    for (p, i) in voxels {
        let p = (p - min).as_uvec3();
        grid.set(p.x, p.z, p.y, i.saturating_add(1));
    }
    debug!(edge, voxels = grid.occupied_count(), "vox grid filled");
    Ok(VoxScene {
        grid,
        palette,
        extent,
    })
}

/// File palette entry `i` moved to slot `i + 1`.
fn shifted_palette(data: &DotVoxData) -> Palette {
    let mut entries = vec![[0u8; 4]];
    entries.extend(data.palette.iter().map(|c| [c.r, c.g, c.b, c.a]));
    Palette::from_rgba8(&entries)
}

fn bounds(points: impl Iterator<Item = IVec3>) -> Option<(IVec3, IVec3)> {
    points.fold(None, |acc, p| match acc {
        None => Some((p, p)),
        Some((min, max)) => Some((min.min(p), max.max(p))),
    })
}

/// Where a model sits in the scene, in file coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    translation: IVec3,
    /// Rows of a signed permutation matrix.
    rotation: [IVec3; 3],
}

impl Placement {
    const IDENTITY: Self = Self {
        translation: IVec3::ZERO,
        rotation: [IVec3::X, IVec3::Y, IVec3::Z],
    };

    /// Child placement `local` nested inside `self`.
    fn then(self, local: Self) -> Self {
        let rotate = |v: IVec3| self.rotate(v);
        let columns = [
            rotate(IVec3::new(local.rotation[0].x, local.rotation[1].x, local.rotation[2].x)),
            rotate(IVec3::new(local.rotation[0].y, local.rotation[1].y, local.rotation[2].y)),
            rotate(IVec3::new(local.rotation[0].z, local.rotation[1].z, local.rotation[2].z)),
        ];
        Self {
            translation: self.translation + self.rotate(local.translation),
            rotation: [
                IVec3::new(columns[0].x, columns[1].x, columns[2].x),
                IVec3::new(columns[0].y, columns[1].y, columns[2].y),
                IVec3::new(columns[0].z, columns[1].z, columns[2].z),
            ],
        }
    }

    fn rotate(self, v: IVec3) -> IVec3 {
        IVec3::new(
            self.rotation[0].dot(v),
            self.rotation[1].dot(v),
            self.rotation[2].dot(v),
        )
    }

    /// Scene position of a model voxel. Models pivot on voxel `size / 2`.
    fn apply(self, local: IVec3, model: &Model) -> IVec3 {
        let pivot = IVec3::new(
            (model.size.x / 2) as i32,
            (model.size.y / 2) as i32,
            (model.size.z / 2) as i32,
        );
        self.translation + self.rotate(local - pivot)
    }
}

/// Decode a `_r` byte: bits 0-1 and 2-3 give the non-zero column of rows
/// 0 and 1, bits 4-6 negate rows 0 to 2.
fn parse_rotation(byte: u8) -> Option<[IVec3; 3]> {
    let first = usize::from(byte & 3);
    let second = usize::from((byte >> 2) & 3);
    if first > 2 || second > 2 || first == second {
        return None;
    }
    let third = 3 - first - second;
    let row = |column: usize, negate: bool| {
        let mut v = IVec3::ZERO;
        v[column] = if negate { -1 } else { 1 };
        v
    };
    Some([
        row(first, byte & 0x10 != 0),
        row(second, byte & 0x20 != 0),
        row(third, byte & 0x40 != 0),
    ])
}

fn parse_translation(raw: &str) -> Option<IVec3> {
    let mut parts = raw.split_whitespace().map(str::parse::<i32>);
    let v = IVec3::new(parts.next()?.ok()?, parts.next()?.ok()?, parts.next()?.ok()?);
    parts.next().is_none().then_some(v)
}

/// Call `visit` for every model instance in the scene graph.
///
/// Files without a scene graph place every model at the origin.
fn collect_voxels<F>(data: &DotVoxData, mut visit: F) -> Result<()>
where
    F: FnMut(&Model, Placement),
{
    if data.scenes.is_empty() {
        for model in &data.models {
            visit(model, Placement::IDENTITY);
        }
        return Ok(());
    }

    let invalid = |what: String| Error::InvalidData(format!("vox scene graph: {what}"));
    let mut stack = vec![(0u32, Placement::IDENTITY)];
    let mut visited = 0usize;
    while let Some((node, placement)) = stack.pop() {
        visited += 1;
        if visited > data.scenes.len() * 2 {
            return Err(invalid("node cycle".into()));
        }
        let scene_node = data
            .scenes
            .get(node as usize)
            .ok_or_else(|| invalid(format!("missing node {node}")))?;
        match scene_node {
            SceneNode::Transform { frames, child, .. } => {
                if frames.len() > 1 {
                    warn!(node, frames = frames.len(), "Animated transform, using frame 0");
                }
                let mut local = Placement::IDENTITY;
                if let Some(frame) = frames.first() {
                    if let Some(raw) = frame.attributes.get("_t") {
                        local.translation = parse_translation(raw)
                            .ok_or_else(|| invalid(format!("bad translation {raw:?}")))?;
                    }
                    if let Some(raw) = frame.attributes.get("_r") {
                        local.rotation = raw
                            .parse::<u8>()
                            .ok()
                            .and_then(parse_rotation)
                            .ok_or_else(|| invalid(format!("bad rotation {raw:?}")))?;
                    }
                }
                stack.push((*child, placement.then(local)));
            }
            SceneNode::Group { children, .. } => {
                stack.extend(children.iter().map(|&c| (c, placement)));
            }
            SceneNode::Shape { models, .. } => {
                for shape in models {
                    let model = data
                        .models
                        .get(shape.model_id as usize)
                        .ok_or_else(|| invalid(format!("missing model {}", shape.model_id)))?;
                    visit(model, placement);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    /// One RIFF-style chunk: id, content size, children size, content.
    fn chunk(id: &[u8; 4], content: &[u8], children: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.extend((content.len() as u32).to_le_bytes());
        out.extend((children.len() as u32).to_le_bytes());
        out.extend(content);
        out.extend(children);
        out
    }

    fn words(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn model_chunks(size: [u32; 3], voxels: &[[u8; 4]]) -> Vec<u8> {
        let mut xyzi = words(&[voxels.len() as u32]);
        xyzi.extend(voxels.iter().flatten());
        let mut out = chunk(b"SIZE", &words(&size), &[]);
        out.extend(chunk(b"XYZI", &xyzi, &[]));
        out
    }

    fn vox_file(children: &[u8]) -> Vec<u8> {
        let mut out = b"VOX ".to_vec();
        out.extend(150u32.to_le_bytes());
        out.extend(chunk(b"MAIN", &[], children));
        out
    }

    /// Dictionary of `(key, value)` string pairs.
    fn dict(pairs: &[(&str, &str)]) -> Vec<u8> {
        let mut out = words(&[pairs.len() as u32]);
        for (key, value) in pairs {
            for s in [key, value] {
                out.extend(words(&[s.len() as u32]));
                out.extend(s.as_bytes());
            }
        }
        out
    }

    fn transform(id: u32, child: u32, frame: &[(&str, &str)]) -> Vec<u8> {
        let mut content = words(&[id]);
        content.extend(dict(&[]));
        // child, reserved, layer, frame count
        content.extend(words(&[child, u32::MAX, 0, 1]));
        content.extend(dict(frame));
        chunk(b"nTRN", &content, &[])
    }

    fn group(id: u32, children: &[u32]) -> Vec<u8> {
        let mut content = words(&[id]);
        content.extend(dict(&[]));
        content.extend(words(&[children.len() as u32]));
        content.extend(words(children));
        chunk(b"nGRP", &content, &[])
    }

    fn shape(id: u32, model: u32) -> Vec<u8> {
        let mut content = words(&[id]);
        content.extend(dict(&[]));
        content.extend(words(&[1, model]));
        content.extend(dict(&[]));
        chunk(b"nSHP", &content, &[])
    }

    #[test]
    fn edge_rounding() {
        assert_eq!(EdgeRounding::PowerOfTwo.round(0), 4);
        assert_eq!(EdgeRounding::PowerOfTwo.round(5), 8);
        assert_eq!(EdgeRounding::PowerOfTwo.round(32), 32);
        assert_eq!(EdgeRounding::PowerOfFour.round(5), 16);
        assert_eq!(EdgeRounding::PowerOfFour.round(17), 64);
        assert_eq!(EdgeRounding::PowerOfFour.round(4), 4);
    }

    #[test]
    fn rotation_bytes() {
        // Identity: row 0 -> x, row 1 -> y
        assert_eq!(parse_rotation(0b0000_0100), Some([IVec3::X, IVec3::Y, IVec3::Z]));
        // Swap x and y, negate the new z row
        assert_eq!(
            parse_rotation(0b0100_0001),
            Some([IVec3::Y, IVec3::X, IVec3::NEG_Z])
        );
        assert_eq!(parse_rotation(0b0000_0000), None);
        assert_eq!(parse_translation("1 -2 3"), Some(IVec3::new(1, -2, 3)));
        assert_eq!(parse_translation("1 2"), None);
    }

    #[test]
    fn single_model_swaps_up_axis() {
        // Stored color indices are 1-based; RGBA entry k is index k + 1
        let mut body = model_chunks([3, 2, 5], &[[0, 0, 0, 1], [2, 1, 4, 9]]);
        let mut rgba = vec![0u8; 256 * 4];
        rgba[8 * 4..8 * 4 + 4].copy_from_slice(&[255, 0, 0, 255]);
        body.extend(chunk(b"RGBA", &rgba, &[]));

        let scene = parse_vox(&vox_file(&body), EdgeRounding::PowerOfFour).unwrap();
        assert_eq!(scene.extent, UVec3::new(3, 5, 2));
        assert_eq!(scene.grid.edge(), 16);
        assert_eq!(scene.grid.occupied_count(), 2);
        assert_eq!(scene.grid.get(0, 0, 0), Some(1));
        // File (2, 1, 4) is grid (2, 4, 1)
        assert_eq!(scene.grid.get(2, 4, 1), Some(9));
        assert_eq!(scene.palette.get(9), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(scene.palette.get(0), Vec4::ZERO);
    }

    #[test]
    fn scene_graph_places_models() {
        let mut body = model_chunks([2, 2, 2], &[[0, 0, 0, 1]]);
        body.extend(transform(0, 1, &[]));
        body.extend(group(1, &[2, 4]));
        body.extend(transform(2, 3, &[("_t", "10 0 0")]));
        body.extend(shape(3, 0));
        body.extend(transform(4, 5, &[("_t", "0 0 6")]));
        body.extend(shape(5, 0));

        let scene = parse_vox(&vox_file(&body), EdgeRounding::PowerOfTwo).unwrap();
        // Voxels land at file (9, -1, -1) and (-1, -1, 5)
        assert_eq!(scene.extent, UVec3::new(11, 7, 1));
        assert_eq!(scene.grid.edge(), 16);
        assert_eq!(scene.grid.get(10, 0, 0), Some(1));
        assert_eq!(scene.grid.get(0, 6, 0), Some(1));
        assert_eq!(scene.grid.occupied_count(), 2);
    }

    #[test]
    fn imported_grid_builds() {
        let body = model_chunks([4, 4, 4], &[[1, 2, 3, 5], [3, 3, 3, 5]]);
        let bytes = vox_file(&body);

        let tree64 = parse_vox(&bytes, EdgeRounding::PowerOfFour).unwrap();
        let tree = crate::build_tree64(&tree64.grid, &tree64.palette).unwrap();
        assert!(tree.validate().is_ok());

        let aabb = parse_vox(&bytes, EdgeRounding::PowerOfTwo).unwrap();
        let octree = crate::build_aabb_octree(&aabb.grid, &aabb.palette).unwrap();
        assert!(octree.validate().is_ok());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            parse_vox(b"not a vox file", EdgeRounding::PowerOfTwo),
            Err(Error::InvalidData(_))
        ));
        assert!(matches!(
            load_vox("/nonexistent/scene.vox", EdgeRounding::PowerOfTwo),
            Err(Error::Io(_))
        ));
    }
}
