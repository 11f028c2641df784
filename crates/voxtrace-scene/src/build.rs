//! Reference builders from a [`VoxelGrid`] into both octree layouts.
//!
//! Both builders emit nodes breadth first, so every child is stored after its
//! parent and siblings are contiguous. Voxel `(x, y, z)` of the grid becomes
//! the world-space cube `[x, x + 1) x [y, y + 1) x [z, z + 1)`.

use std::collections::VecDeque;

use glam::{UVec3, Vec3};
use hashbrown::HashSet;
use rayon::prelude::*;
use tracing::debug;
use voxtrace_core::constants::{
    AABB_MAX_DEPTH, CELLS_PER_AXIS, CELLS_PER_NODE, LEVEL_BITS, TREE64_NODE_CAPACITY,
};
use voxtrace_core::{Error, Result};
use voxtrace_voxel::palette::index;
use voxtrace_voxel::{AabbNode, AabbOctree, Palette, Tree64, Tree64Node, AABB_CHILDREN};

use crate::grid::VoxelGrid;

/// Offset of `slot` inside a 4x4x4 block, x fastest then z then y.
#[inline]
fn slot_offset(slot: u32) -> UVec3 {
    UVec3::new(slot & 3, slot >> 4, (slot >> 2) & 3)
}

/// Offset of octant `k` inside a 2x2x2 block.
#[inline]
fn octant_offset(k: u32) -> UVec3 {
    UVec3::new(k & 1, (k >> 1) & 1, (k >> 2) & 1)
}

/// Number of 64-ary levels for a grid edge, if it is a power of four.
fn tree64_levels(edge: u32) -> Result<u32> {
    if edge < CELLS_PER_AXIS || !edge.is_power_of_two() || edge.trailing_zeros() % LEVEL_BITS != 0 {
        return Err(Error::InvalidData(format!(
            "tree64 grids need a power-of-four edge of at least 4, got {edge}"
        )));
    }
    Ok(edge.trailing_zeros() / LEVEL_BITS)
}

/// Build a [`Tree64`] covering the grid, with colors quantized from `palette`.
///
/// The grid edge must be a power of four. Empty blocks are not stored.
pub fn build_tree64(grid: &VoxelGrid, palette: &Palette) -> Result<Tree64> {
    let edge = grid.edge();
    let levels = tree64_levels(edge)?;
    let _span = tracing::debug_span!("build_tree64", edge).entered();

    // occupied[k] holds every block of edge 4^k that contains a voxel.
    let mut occupied: Vec<HashSet<UVec3>> = vec![HashSet::new(); levels as usize];
    for (p, _) in grid.iter_occupied() {
        for (k, blocks) in occupied.iter_mut().enumerate().skip(1) {
            blocks.insert(p >> (k as u32 * LEVEL_BITS));
        }
    }
    let is_occupied = |block: UVec3, level: u32| {
        if level == 0 {
            grid.get(block.x, block.y, block.z).is_some()
        } else {
            occupied[level as usize].contains(&block)
        }
    };

    let mut nodes = vec![Tree64Node::default()];
    let mut voxels = Vec::new();
    let mut queue = VecDeque::from([(0usize, UVec3::ZERO, levels)]);

    while let Some((node_index, block, level)) = queue.pop_front() {
        let child_level = level - 1;
        let base = block * CELLS_PER_AXIS;
        let mask = (0..CELLS_PER_NODE)
            .filter(|&slot| is_occupied(base + slot_offset(slot), child_level))
            .fold(0u64, |mask, slot| mask | (1 << slot));
        let present = (0..CELLS_PER_NODE).filter(|&slot| mask & (1 << slot) != 0);

        if child_level == 0 {
            let voxel_ptr = voxels.len() as u32;
            for slot in present {
                let p = base + slot_offset(slot);
                let material = grid.get(p.x, p.y, p.z).unwrap_or(index::AIR);
                voxels.push(palette.rgb565(material));
            }
            nodes[node_index] = Tree64Node::leaf(voxel_ptr, mask);
        } else {
            let child_ptr = nodes.len() as u32;
            for slot in present {
                queue.push_back((nodes.len(), base + slot_offset(slot), child_level));
                nodes.push(Tree64Node::default());
            }
            if nodes.len() > TREE64_NODE_CAPACITY {
                return Err(Error::CapacityExceeded {
                    what: "tree64 nodes",
                    requested: nodes.len(),
                    capacity: TREE64_NODE_CAPACITY,
                });
            }
            nodes[node_index] = Tree64Node::interior(child_ptr, mask);
        }
    }

    debug!(
        edge,
        nodes = nodes.len(),
        voxels = voxels.len(),
        "Built tree64"
    );
    Tree64::new(nodes, voxels, Vec3::ZERO, edge as f32)
}

/// Per level, the material shared by every voxel of each block, or `None`
/// when the block is mixed. Level `j` has blocks of edge `2^j`.
fn uniform_pyramid(grid: &VoxelGrid, levels: u32) -> Vec<Vec<Option<u8>>> {
    let mut pyramid = vec![grid.as_slice().iter().copied().map(Some).collect::<Vec<_>>()];
    for level in 1..=levels {
        let prev = &pyramid[level as usize - 1];
        let prev_edge = (grid.edge() >> (level - 1)) as usize;
        let edge = prev_edge / 2;
        let at = |x: usize, y: usize, z: usize| prev[x + z * prev_edge + y * prev_edge * prev_edge];

        let next: Vec<Option<u8>> = (0..edge * edge * edge)
            .into_par_iter()
            .map(|i| {
                let (x, z, y) = (i % edge * 2, i / edge % edge * 2, i / (edge * edge) * 2);
                let first = at(x, y, z)?;
                (1..AABB_CHILDREN)
                    .map(octant_offset)
                    .all(|o| at(x + o.x as usize, y + o.y as usize, z + o.z as usize) == Some(first))
                    .then_some(first)
            })
            .collect();
        pyramid.push(next);
    }
    pyramid
}

/// Build an [`AabbOctree`] covering the grid, colored from `palette`.
///
/// The grid edge must be a power of two with at most [`AABB_MAX_DEPTH`]
/// levels below the root. Uniform blocks become a single leaf; empty blocks
/// become transparent leaves.
pub fn build_aabb_octree(grid: &VoxelGrid, palette: &Palette) -> Result<AabbOctree> {
    let edge = grid.edge();
    if !edge.is_power_of_two() || edge.trailing_zeros() > AABB_MAX_DEPTH {
        return Err(Error::InvalidData(format!(
            "aabb octree grids need a power-of-two edge up to {}, got {edge}",
            1u32 << AABB_MAX_DEPTH
        )));
    }
    let levels = edge.trailing_zeros();
    let _span = tracing::debug_span!("build_aabb_octree", edge).entered();

    let pyramid = uniform_pyramid(grid, levels);
    let color_of = |material: u8| {
        if material == index::AIR {
            [0.0; 4]
        } else {
            palette.get(material).to_array()
        }
    };

    let mut nodes = vec![AabbNode::root(Vec3::splat(edge as f32 * 0.5), edge)];
    let mut queue = VecDeque::from([(0usize, UVec3::ZERO, levels)]);

    while let Some((node_index, block, level)) = queue.pop_front() {
        let level_edge = edge >> level;
        let offset = block.x + block.z * level_edge + block.y * level_edge * level_edge;
        match pyramid[level as usize][offset as usize] {
            Some(material) => nodes[node_index].color = color_of(material),
            None => {
                let parent = nodes[node_index];
                let children_ptr = nodes.len() as u32;
                for k in 0..AABB_CHILDREN {
                    let index = nodes.len();
                    nodes.push(AabbNode {
                        index: index as u32,
                        size: parent.size / 2,
                        depth: parent.depth + 1,
                        parent_ptr: node_index as u32,
                        position: parent.child_center(k).to_array(),
                        children_ptr: 0,
                        color: [0.0; 4],
                    });
                    queue.push_back((index, block * 2 + octant_offset(k), level - 1));
                }
                nodes[node_index].children_ptr = children_ptr;
            }
        }
    }

    debug!(edge, nodes = nodes.len(), "Built aabb octree");
    AabbOctree::new(nodes)
}
