//! Explicit binary octree of bounding boxes.
//!
//! Each interior node owns exactly eight children stored at
//! `[children_ptr, children_ptr + 8)`. Child `k` sits in octant
//! `(k & 1, (k >> 1) & 1, (k >> 2) & 1)` of its parent, x lowest.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::warn;
use voxtrace_core::constants::AABB_MAX_DEPTH;
use voxtrace_core::{Aabb, Error, Result};

/// Number of children of an interior node.
pub const AABB_CHILDREN: u32 = 8;

/// One node of an [`AabbOctree`], in its upload layout (48 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct AabbNode {
    /// Own position in the node array.
    pub index: u32,
    /// Edge length, a power of two.
    pub size: u32,
    /// Distance from the root.
    pub depth: u32,
    /// Parent index; the root points at itself.
    pub parent_ptr: u32,
    /// Center of the node's cube.
    pub position: [f32; 3],
    /// First of eight children, 0 when the node has none.
    pub children_ptr: u32,
    /// Linear RGBA. Alpha 0 marks an empty leaf.
    pub color: [f32; 4],
}

impl AabbNode {
    /// Root node centered at `center`.
    pub fn root(center: Vec3, size: u32) -> Self {
        Self {
            size,
            position: center.to_array(),
            ..Self::default()
        }
    }

    /// Center as a vector.
    #[inline]
    pub fn center(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    /// Bounding box of the node.
    #[inline]
    pub fn aabb(&self) -> Aabb {
        Aabb::from_center_size(self.center(), self.size as f32)
    }

    /// Whether traversal stops at this node.
    #[inline]
    pub const fn is_leaf(&self) -> bool {
        self.depth >= AABB_MAX_DEPTH || self.children_ptr == 0 || self.size <= 1
    }

    /// Whether this node holds a visible voxel.
    #[inline]
    pub fn is_occupied(&self) -> bool {
        self.color[3] > 0.0
    }

    /// Center of the child in octant `k`.
    #[inline]
    pub fn child_center(&self, k: u32) -> Vec3 {
        let offset = Vec3::new(
            if k & 1 == 0 { -1.0 } else { 1.0 },
            if k & 2 == 0 { -1.0 } else { 1.0 },
            if k & 4 == 0 { -1.0 } else { 1.0 },
        );
        self.center() + offset * (self.size as f32 * 0.25)
    }

    /// Octant of `point` relative to the node center.
    #[inline]
    pub fn octant_of(&self, point: Vec3) -> u32 {
        let c = self.center();
        u32::from(point.x >= c.x) | (u32::from(point.y >= c.y) << 1) | (u32::from(point.z >= c.z) << 2)
    }
}

/// Node array with the root at index 0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AabbOctree {
    nodes: Vec<AabbNode>,
}

impl AabbOctree {
    /// Wrap and validate a node array.
    pub fn new(nodes: Vec<AabbNode>) -> Result<Self> {
        let tree = Self { nodes };
        tree.validate()?;
        Ok(tree)
    }

    /// Root node.
    #[inline]
    pub fn root(&self) -> &AabbNode {
        &self.nodes[0]
    }

    /// Get a node by index.
    #[inline]
    pub fn node(&self, index: u32) -> Option<&AabbNode> {
        self.nodes.get(index as usize)
    }

    /// All nodes, root first.
    pub fn nodes(&self) -> &[AabbNode] {
        &self.nodes
    }

    /// Get the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Deepest node depth.
    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Raw bytes of the node array, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    /// Color of the leaf containing a world-space point, if it is occupied.
    pub fn sample(&self, point: Vec3) -> Option<[f32; 4]> {
        let mut node = self.root();
        if !node.aabb().contains_point(point) {
            return None;
        }
        while !node.is_leaf() {
            node = self.node(node.children_ptr + node.octant_of(point))?;
        }
        node.is_occupied().then_some(node.color)
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<()> {
        let Some(root) = self.nodes.first() else {
            return Err(Error::InvalidData("aabb octree has no root node".into()));
        };
        if root.depth != 0 || root.parent_ptr != 0 {
            return Err(Error::InvalidData(
                "aabb root must have depth 0 and point at itself".into(),
            ));
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.index as usize != i {
                return Err(Error::InvalidData(format!(
                    "node {i} records index {}",
                    node.index
                )));
            }
            if !node.size.is_power_of_two() {
                return Err(Error::InvalidData(format!(
                    "node {i} size {} is not a power of two",
                    node.size
                )));
            }
            if node.is_leaf() {
                continue;
            }

            let first = node.children_ptr as usize;
            let end = first + AABB_CHILDREN as usize;
            if first <= i {
                return Err(Error::InvalidData(format!(
                    "node {i} points back to children at {first}"
                )));
            }
            if end > self.nodes.len() {
                return Err(Error::OutOfBounds(format!(
                    "node {i} children {first}..{end} exceed {} nodes",
                    self.nodes.len()
                )));
            }

            for (k, child) in self.nodes[first..end].iter().enumerate() {
                if child.parent_ptr as usize != i
                    || child.depth != node.depth + 1
                    || child.size != node.size / 2
                {
                    return Err(Error::InvalidData(format!(
                        "child {} does not nest inside node {i}",
                        first + k
                    )));
                }
                if child.center() != node.child_center(k as u32) {
                    warn!(
                        node = i,
                        child = first + k,
                        "aabb child is not centered in its octant"
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Root of size 4 at the origin, split once; only octant 7 is filled.
    fn split_root() -> Vec<AabbNode> {
        let mut root = AabbNode::root(Vec3::ZERO, 4);
        root.children_ptr = 1;
        let mut nodes = vec![root];
        for k in 0..AABB_CHILDREN {
            nodes.push(AabbNode {
                index: k + 1,
                size: 2,
                depth: 1,
                parent_ptr: 0,
                position: root.child_center(k).to_array(),
                children_ptr: 0,
                color: if k == 7 { [1.0, 0.0, 0.0, 1.0] } else { [0.0; 4] },
            });
        }
        nodes
    }

    #[test]
    fn node_layout() {
        assert_eq!(std::mem::size_of::<AabbNode>(), 48);
        assert_eq!(std::mem::offset_of!(AabbNode, position), 16);
        assert_eq!(std::mem::offset_of!(AabbNode, children_ptr), 28);
        assert_eq!(std::mem::offset_of!(AabbNode, color), 32);
    }

    #[test]
    fn leaf_rules() {
        let mut node = AabbNode::root(Vec3::ZERO, 16);
        assert!(node.is_leaf());
        node.children_ptr = 1;
        assert!(!node.is_leaf());
        node.depth = AABB_MAX_DEPTH;
        assert!(node.is_leaf());
        node.depth = 0;
        node.size = 1;
        assert!(node.is_leaf());
    }

    #[test]
    fn child_octants() {
        let root = AabbNode::root(Vec3::ZERO, 4);
        assert_eq!(root.child_center(0), Vec3::splat(-1.0));
        assert_eq!(root.child_center(1), Vec3::new(1.0, -1.0, -1.0));
        assert_eq!(root.child_center(7), Vec3::ONE);
        for k in 0..AABB_CHILDREN {
            assert_eq!(root.octant_of(root.child_center(k)), k);
        }
    }

    #[test]
    fn valid_split_tree() {
        let tree = AabbOctree::new(split_root()).unwrap();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.as_bytes().len(), 9 * 48);
        assert_eq!(tree.sample(Vec3::splat(1.5)), Some([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(tree.sample(Vec3::splat(-1.5)), None);
        assert_eq!(tree.sample(Vec3::splat(3.0)), None);
    }

    #[test]
    fn rejects_truncated_children() {
        let mut nodes = split_root();
        nodes.truncate(5);
        assert!(matches!(AabbOctree::new(nodes), Err(Error::OutOfBounds(_))));
    }

    #[test]
    fn rejects_bad_nesting() {
        let mut nodes = split_root();
        nodes[3].size = 4;
        assert!(matches!(AabbOctree::new(nodes), Err(Error::InvalidData(_))));
    }

    #[test]
    fn rejects_non_power_of_two() {
        let nodes = vec![AabbNode::root(Vec3::ZERO, 6)];
        assert!(AabbOctree::new(nodes).is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(AabbOctree::new(Vec::new()).is_err());
    }
}
