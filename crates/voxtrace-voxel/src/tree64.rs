//! 64-ary sparse voxel tree with compacted children.
//!
//! Every node covers a 4x4x4 block of cells. Present children of a node are
//! stored contiguously starting at `child_ptr`, ordered by slot, so the child
//! in slot `i` lives at `child_ptr + popcount(mask & ((1 << i) - 1))`. Leaves
//! reuse the same rule to index the voxel payload array.
//!
//! Traversal runs in the normalised cube `[1, 2)^3`; [`Tree64::world_to_unit`]
//! maps the world-space root cube onto it.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::warn;
use voxtrace_core::constants::{LEVEL_BITS, MAX_TREE64_DEPTH, ROOT_SCALE_EXP, TREE64_NODE_CAPACITY};
use voxtrace_core::{
    compacted_child_index, get_node_cell_index_f32, popcount64, Error, Result, Rgb565,
};

/// One node of a [`Tree64`], in its upload layout (16 bytes).
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct Tree64Node {
    /// 1 for leaves, 0 for interior nodes.
    pub is_leaf: u32,
    /// First child node (interior) or first voxel payload (leaf).
    pub child_ptr: u32,
    /// Low 32 bits of the child occupancy mask.
    pub child_mask_lo: u32,
    /// High 32 bits of the child occupancy mask.
    pub child_mask_hi: u32,
}

impl Tree64Node {
    /// Interior node whose present children start at `child_ptr`.
    pub const fn interior(child_ptr: u32, child_mask: u64) -> Self {
        Self::pack(false, child_ptr, child_mask)
    }

    /// Leaf whose voxel payloads start at `voxel_ptr`.
    pub const fn leaf(voxel_ptr: u32, child_mask: u64) -> Self {
        Self::pack(true, voxel_ptr, child_mask)
    }

    const fn pack(is_leaf: bool, child_ptr: u32, child_mask: u64) -> Self {
        Self {
            is_leaf: is_leaf as u32,
            child_ptr,
            child_mask_lo: child_mask as u32,
            child_mask_hi: (child_mask >> 32) as u32,
        }
    }

    /// Whether this node is a leaf.
    #[inline]
    pub const fn is_leaf(&self) -> bool {
        self.is_leaf != 0
    }

    /// Full 64-bit occupancy mask.
    #[inline]
    pub const fn child_mask(&self) -> u64 {
        ((self.child_mask_hi as u64) << 32) | self.child_mask_lo as u64
    }

    /// Check if a child slot is occupied.
    #[inline]
    pub const fn has_child(&self, slot: u32) -> bool {
        self.child_mask() & (1 << slot) != 0
    }

    /// Storage index of the child (or payload) in `slot`.
    #[inline]
    pub const fn child_index(&self, slot: u32) -> u32 {
        compacted_child_index(self.child_ptr, self.child_mask(), slot)
    }

    /// Number of occupied slots.
    #[inline]
    pub const fn child_count(&self) -> u32 {
        popcount64(self.child_mask())
    }
}

/// A 64-ary tree placed in world space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tree64 {
    nodes: Vec<Tree64Node>,
    voxels: Vec<Rgb565>,
    origin: Vec3,
    size: f32,
}

impl Tree64 {
    /// Assemble and validate a tree. The root is `nodes[0]`.
    ///
    /// `voxels` may be empty, in which case every voxel uses
    /// [`Rgb565::DEFAULT`].
    pub fn new(nodes: Vec<Tree64Node>, voxels: Vec<Rgb565>, origin: Vec3, size: f32) -> Result<Self> {
        let tree = Self {
            nodes,
            voxels,
            origin,
            size,
        };
        tree.validate()?;
        Ok(tree)
    }

    /// A tree with nothing in it.
    pub fn empty(origin: Vec3, size: f32) -> Self {
        Self {
            nodes: vec![Tree64Node::interior(0, 0)],
            voxels: Vec::new(),
            origin,
            size,
        }
    }

    /// Root node.
    #[inline]
    pub fn root(&self) -> &Tree64Node {
        &self.nodes[0]
    }

    /// Get a node by index.
    #[inline]
    pub fn node(&self, index: u32) -> Option<&Tree64Node> {
        self.nodes.get(index as usize)
    }

    /// All nodes, root first.
    pub fn nodes(&self) -> &[Tree64Node] {
        &self.nodes
    }

    /// Voxel payload array.
    pub fn voxels(&self) -> &[Rgb565] {
        &self.voxels
    }

    /// Minimum corner of the root cube.
    pub const fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Edge length of the root cube.
    pub const fn size(&self) -> f32 {
        self.size
    }

    /// Get the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Map a world-space point into the normalised `[1, 2)^3` cube.
    #[inline]
    pub fn world_to_unit(&self, point: Vec3) -> Vec3 {
        (point - self.origin) / self.size + Vec3::ONE
    }

    /// Map a point of the normalised cube back to world space.
    #[inline]
    pub fn unit_to_world(&self, point: Vec3) -> Vec3 {
        (point - Vec3::ONE) * self.size + self.origin
    }

    /// Color of the voxel in `slot` of `leaf`.
    #[inline]
    pub fn leaf_color(&self, leaf: &Tree64Node, slot: u32) -> Rgb565 {
        if self.voxels.is_empty() {
            return Rgb565::DEFAULT;
        }
        self.voxels
            .get(leaf.child_index(slot) as usize)
            .copied()
            .unwrap_or(Rgb565::DEFAULT)
    }

    /// Color of the voxel containing a world-space point, if occupied.
    pub fn sample(&self, point: Vec3) -> Option<Rgb565> {
        let unit = self.world_to_unit(point);
        if unit.cmplt(Vec3::ONE).any() || unit.cmpge(Vec3::splat(2.0)).any() {
            return None;
        }

        let mut node = self.root();
        let mut scale_exp = ROOT_SCALE_EXP;
        loop {
            let slot = get_node_cell_index_f32(unit, scale_exp);
            if !node.has_child(slot) {
                return None;
            }
            if node.is_leaf() {
                return Some(self.leaf_color(node, slot));
            }
            if scale_exp < LEVEL_BITS {
                return None;
            }
            node = self.node(node.child_index(slot))?;
            scale_exp -= LEVEL_BITS;
        }
    }

    /// Deepest level reached by any node, root at depth 0.
    pub fn depth(&self) -> u32 {
        self.node_depths()
            .into_iter()
            .filter(|&d| d != u32::MAX)
            .max()
            .unwrap_or(0)
    }

    /// Raw bytes of the node array, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    /// Check structural invariants.
    ///
    /// Children must be stored after their parent, which rules out cycles and
    /// lets depths be computed in one forward pass.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::InvalidData("tree64 has no root node".into()));
        }
        if self.nodes.len() > TREE64_NODE_CAPACITY {
            return Err(Error::CapacityExceeded {
                what: "tree64 nodes",
                requested: self.nodes.len(),
                capacity: TREE64_NODE_CAPACITY,
            });
        }
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(Error::InvalidData(format!(
                "tree64 root size must be positive, got {}",
                self.size
            )));
        }

        for (index, node) in self.nodes.iter().enumerate() {
            let count = node.child_count() as usize;
            if count == 0 {
                continue;
            }
            let first = node.child_ptr as usize;
            let end = first + count;
            if node.is_leaf() {
                if !self.voxels.is_empty() && end > self.voxels.len() {
                    return Err(Error::OutOfBounds(format!(
                        "leaf {index} payload range {first}..{end} exceeds {} voxels",
                        self.voxels.len()
                    )));
                }
            } else {
                if first <= index {
                    return Err(Error::InvalidData(format!(
                        "node {index} points back to child {first}"
                    )));
                }
                if end > self.nodes.len() {
                    return Err(Error::OutOfBounds(format!(
                        "node {index} child range {first}..{end} exceeds {} nodes",
                        self.nodes.len()
                    )));
                }
            }
        }

        let depths = self.node_depths();
        let reachable: Vec<u32> = depths.into_iter().filter(|&d| d != u32::MAX).collect();
        let depth = reachable.iter().copied().max().unwrap_or(0);
        if depth >= MAX_TREE64_DEPTH {
            return Err(Error::InvalidData(format!(
                "tree64 depth {depth} exceeds the {MAX_TREE64_DEPTH} levels of f32 precision"
            )));
        }

        let reachable = reachable.len();
        if reachable < self.nodes.len() {
            warn!(
                unreachable = self.nodes.len() - reachable,
                "tree64 contains nodes not reachable from the root"
            );
        }
        Ok(())
    }

    /// Depth of every node reachable from the root; `u32::MAX` otherwise.
    fn node_depths(&self) -> Vec<u32> {
        let mut depths = vec![u32::MAX; self.nodes.len()];
        if let Some(root) = depths.first_mut() {
            *root = 0;
        }
        for index in 0..self.nodes.len() {
            let node = self.nodes[index];
            let depth = depths[index];
            if node.is_leaf() || depth == u32::MAX {
                continue;
            }
            let first = node.child_ptr as usize;
            let end = (first + node.child_count() as usize).min(self.nodes.len());
            for child in first.max(index + 1)..end {
                depths[child] = depths[child].min(depth + 1);
            }
        }
        depths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Root with one interior child in slot 0, whose leaf has one voxel in slot 63.
    fn two_level_tree() -> Tree64 {
        let nodes = vec![
            Tree64Node::interior(1, 1),
            Tree64Node::interior(2, 1),
            Tree64Node::leaf(0, 1 << 63),
        ];
        Tree64::new(nodes, vec![Rgb565(0xF800)], Vec3::ZERO, 64.0).unwrap()
    }

    #[test]
    fn node_layout() {
        assert_eq!(std::mem::size_of::<Tree64Node>(), 16);
        assert_eq!(std::mem::offset_of!(Tree64Node, is_leaf), 0);
        assert_eq!(std::mem::offset_of!(Tree64Node, child_ptr), 4);
        assert_eq!(std::mem::offset_of!(Tree64Node, child_mask_lo), 8);
        assert_eq!(std::mem::offset_of!(Tree64Node, child_mask_hi), 12);
    }

    #[test]
    fn mask_halves() {
        let node = Tree64Node::interior(5, 0x8000_0000_0000_0001);
        assert_eq!(node.child_mask_lo, 1);
        assert_eq!(node.child_mask_hi, 0x8000_0000);
        assert_eq!(node.child_mask(), 0x8000_0000_0000_0001);
        assert!(node.has_child(0) && node.has_child(63) && !node.has_child(1));
        assert_eq!(node.child_index(0), 5);
        assert_eq!(node.child_index(63), 6);
        assert_eq!(node.child_count(), 2);
    }

    #[test]
    fn empty_tree_validates() {
        let tree = Tree64::empty(Vec3::ZERO, 1.0);
        assert!(tree.validate().is_ok());
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.sample(Vec3::splat(0.5)), None);
    }

    #[test]
    fn sample_finds_the_single_voxel() {
        let tree = two_level_tree();
        assert_eq!(tree.depth(), 2);
        // Root cells are 16 wide, leaf cells 1 wide; slot 63 of the first
        // leaf is voxel (3, 3, 3).
        assert_eq!(tree.sample(Vec3::splat(3.5)), Some(Rgb565(0xF800)));
        assert_eq!(tree.sample(Vec3::splat(2.5)), None);
        assert_eq!(tree.sample(Vec3::splat(40.0)), None);
        assert_eq!(tree.sample(Vec3::splat(-1.0)), None);
    }

    #[test]
    fn empty_payload_uses_default_color() {
        let tree = Tree64::new(vec![Tree64Node::leaf(0, u64::MAX)], Vec::new(), Vec3::ZERO, 4.0)
            .unwrap();
        assert_eq!(tree.sample(Vec3::splat(1.5)), Some(Rgb565::DEFAULT));
    }

    #[test]
    fn unit_mapping_roundtrip() {
        let tree = Tree64::empty(Vec3::new(-8.0, 0.0, 8.0), 16.0);
        let p = Vec3::new(0.0, 4.0, 20.0);
        let unit = tree.world_to_unit(p);
        assert_eq!(unit, Vec3::new(1.5, 1.25, 1.75));
        assert_eq!(tree.unit_to_world(unit), p);
    }

    #[test]
    fn validate_rejects_child_range_overflow() {
        let nodes = vec![Tree64Node::interior(1, 0b11)];
        let err = Tree64::new(nodes, Vec::new(), Vec3::ZERO, 1.0).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds(_)));
    }

    #[test]
    fn validate_rejects_backward_pointer() {
        let nodes = vec![Tree64Node::interior(1, 1), Tree64Node::interior(0, 1)];
        let err = Tree64::new(nodes, Vec::new(), Vec3::ZERO, 1.0).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn validate_rejects_payload_overflow() {
        let nodes = vec![Tree64Node::leaf(0, 0b111)];
        let err = Tree64::new(nodes, vec![Rgb565::WHITE; 2], Vec3::ZERO, 1.0).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds(_)));
    }

    #[test]
    fn validate_rejects_capacity() {
        let nodes = vec![Tree64Node::default(); TREE64_NODE_CAPACITY + 1];
        let err = Tree64::new(nodes, Vec::new(), Vec3::ZERO, 1.0).unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded { .. }));
    }

    #[test]
    fn validate_rejects_degenerate_size() {
        let err = Tree64::new(vec![Tree64Node::default()], Vec::new(), Vec3::ZERO, 0.0).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn byte_view_matches_node_count() {
        let tree = two_level_tree();
        assert_eq!(tree.as_bytes().len(), tree.node_count() * 16);
    }
}
