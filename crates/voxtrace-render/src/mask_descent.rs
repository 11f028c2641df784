//! Stackless traversal of a [`Tree64`].
//!
//! Every step restarts at the root and follows occupancy masks down to the
//! deepest node containing the current sample point. When that cell is empty
//! the sample jumps just past the cell's exit face, skipping the whole empty
//! region in one move.
//!
//! All work happens in the normalised cube `[1, 2)^3`, where the mantissa bits
//! of each coordinate address cells directly.

use glam::Vec3;
use voxtrace_core::constants::{LEVEL_BITS, MASK_DESCENT_MAX_STEPS, RAY_EPSILON, ROOT_SCALE_EXP};
use voxtrace_core::{cell_size, floor_scale_f32, get_node_cell_index_f32, Aabb, Ray};
use voxtrace_voxel::Tree64;

use crate::intersector::{RayCastResult, VoxelHit, VoxelRayIntersector};

/// Largest `f32` below 2.0.
const UNIT_MAX: f32 = 1.999_999_9;

/// Configuration for mask-descent traversal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskDescentConfig {
    /// Outer step cap. Exceeding it is a miss.
    pub max_steps: u32,
    /// World-space distance the sample is pushed past each exit face.
    pub epsilon: f32,
}

impl Default for MaskDescentConfig {
    fn default() -> Self {
        Self {
            max_steps: MASK_DESCENT_MAX_STEPS,
            epsilon: RAY_EPSILON,
        }
    }
}

impl MaskDescentConfig {
    /// Set the step cap.
    #[must_use]
    pub const fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set the exit-face offset.
    #[must_use]
    pub const fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }
}

/// Where a descent from the root stopped.
#[derive(Debug, Clone, Copy)]
struct Descent {
    node: u32,
    slot: u32,
    scale_exp: u32,
    depth: u32,
    occupied: bool,
}

/// Mask-descent intersector over a borrowed [`Tree64`].
#[derive(Debug, Clone, Copy)]
pub struct MaskDescentTraversal<'a> {
    tree: &'a Tree64,
    config: MaskDescentConfig,
}

impl<'a> MaskDescentTraversal<'a> {
    /// Traverse `tree` with default settings.
    pub fn new(tree: &'a Tree64) -> Self {
        Self::with_config(tree, MaskDescentConfig::default())
    }

    /// Traverse `tree` with explicit settings.
    pub const fn with_config(tree: &'a Tree64, config: MaskDescentConfig) -> Self {
        Self { tree, config }
    }

    /// The traversed tree.
    pub const fn tree(&self) -> &'a Tree64 {
        self.tree
    }

    /// Active settings.
    pub const fn config(&self) -> &MaskDescentConfig {
        &self.config
    }

    /// Follow set mask bits from the root down to the cell containing `pos`.
    #[inline]
    fn descend(&self, pos: Vec3) -> Descent {
        let mut index = 0;
        let mut node = *self.tree.root();
        let mut scale_exp = ROOT_SCALE_EXP;
        let mut depth = 0;
        loop {
            let slot = get_node_cell_index_f32(pos, scale_exp);
            let present = node.has_child(slot);
            if node.is_leaf() || !present || scale_exp < LEVEL_BITS {
                return Descent {
                    node: index,
                    slot,
                    scale_exp,
                    depth,
                    occupied: node.is_leaf() && present,
                };
            }
            let child = node.child_index(slot);
            let Some(&next) = self.tree.node(child) else {
                // Dangling pointer: treat the cell as empty.
                return Descent {
                    node: index,
                    slot,
                    scale_exp,
                    depth,
                    occupied: false,
                };
            };
            index = child;
            node = next;
            scale_exp -= LEVEL_BITS;
            depth += 1;
        }
    }
}

impl VoxelRayIntersector for MaskDescentTraversal<'_> {
    fn cast(&self, ray: &Ray) -> RayCastResult {
        let tree = self.tree;
        if tree.root().child_mask() == 0 {
            return RayCastResult::miss(1);
        }

        let world_size = tree.size();
        let dir = ray.direction;
        let inv_dir = ray.inv_direction;
        let epsilon = self.config.epsilon / world_size;
        let origin = tree.world_to_unit(ray.origin);

        let mut pos = origin;
        let mut t = 0.0;
        let mut normal = Vec3::ZERO;

        for iteration in 0..self.config.max_steps {
            // Iteration 0 is the origin's own cell; from outside it is the
            // clip onto the root cube instead.
            if iteration == 0 && !in_unit_cube(pos) {
                let unit_ray = Ray {
                    origin,
                    direction: dir,
                    inv_direction: inv_dir,
                };
                let bounds = Aabb::new(Vec3::ONE, Vec3::splat(2.0));
                let Some((t_entry, _)) = bounds.intersect_ray(&unit_ray) else {
                    return RayCastResult::miss(1);
                };
                t = t_entry;
                pos = (origin + dir * t_entry).clamp(Vec3::ONE, Vec3::splat(UNIT_MAX));
                normal = bounds.entry_normal(&unit_ray);
                continue;
            }

            let cell = self.descend(pos);
            if cell.occupied && iteration > 0 {
                let color = tree
                    .node(cell.node)
                    .map(|leaf| tree.leaf_color(leaf, cell.slot))
                    .unwrap_or_default()
                    .to_linear()
                    .extend(1.0);
                let hit = VoxelHit {
                    t: t * world_size,
                    position: tree.unit_to_world(pos),
                    normal,
                    node: cell.node,
                    depth: cell.depth,
                    color,
                };
                return RayCastResult::hit(hit, iteration + 1);
            }

            let size = cell_size(cell.scale_exp);
            let cell_min = floor_scale_f32(pos, cell.scale_exp);
            let exit_plane = Vec3::select(
                inv_dir.cmpgt(Vec3::ZERO),
                cell_min + Vec3::splat(size),
                cell_min,
            );
            let t_axis = (exit_plane - pos) * inv_dir;
            let t_axis = Vec3::select(t_axis.is_nan_mask(), Vec3::INFINITY, t_axis);
            let t_exit = t_axis.min_element();
            if !t_exit.is_finite() {
                return RayCastResult::miss(iteration + 1);
            }
            let axis = min_axis(t_axis);

            let step = t_exit.max(0.0) + epsilon;
            t += step;
            pos += dir * step;
            // Land strictly inside the neighbour even when epsilon is below
            // the float spacing at this position.
            pos[axis] = if inv_dir[axis] > 0.0 {
                pos[axis].max(exit_plane[axis])
            } else {
                pos[axis].min(next_down(exit_plane[axis]))
            };
            normal = Vec3::ZERO;
            normal[axis] = -dir[axis].signum();

            if !in_unit_cube(pos) {
                return RayCastResult::miss(iteration + 1);
            }
        }

        RayCastResult::miss(self.config.max_steps)
    }

    fn name(&self) -> &'static str {
        "mask-descent"
    }
}

#[inline]
fn in_unit_cube(p: Vec3) -> bool {
    p.cmpge(Vec3::ONE).all() && p.cmplt(Vec3::splat(2.0)).all()
}

#[inline]
fn min_axis(v: Vec3) -> usize {
    if v.x <= v.y && v.x <= v.z {
        0
    } else if v.y <= v.z {
        1
    } else {
        2
    }
}

/// Next float toward zero. Only called on coordinates in `[1, 2]`.
#[inline]
fn next_down(x: f32) -> f32 {
    f32::from_bits(x.to_bits() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec4;
    use voxtrace_core::Rgb565;
    use voxtrace_voxel::Tree64Node;

    /// 64-unit cube holding a single red voxel at (3, 3, 3).
    fn single_voxel_tree() -> Tree64 {
        let nodes = vec![
            Tree64Node::interior(1, 1),
            Tree64Node::interior(2, 1),
            Tree64Node::leaf(0, 1 << 63),
        ];
        Tree64::new(nodes, vec![Rgb565(0xF800)], Vec3::ZERO, 64.0).unwrap()
    }

    fn full_root_leaf() -> Tree64 {
        Tree64::new(vec![Tree64Node::leaf(0, u64::MAX)], Vec::new(), Vec3::ZERO, 4.0).unwrap()
    }

    fn cast(tree: &Tree64, origin: Vec3, direction: Vec3) -> RayCastResult {
        MaskDescentTraversal::new(tree).cast(&Ray::new(origin, direction))
    }

    #[test]
    fn empty_tree_misses_in_one_iteration() {
        let tree = Tree64::empty(Vec3::ZERO, 16.0);
        for origin in [Vec3::splat(8.0), Vec3::new(-5.0, 8.0, 8.0)] {
            let result = cast(&tree, origin, Vec3::X);
            assert!(!result.is_hit());
            assert_eq!(result.iterations, 1);
        }
    }

    #[test]
    fn empty_leaf_root_misses_in_one_iteration() {
        let tree = Tree64::new(vec![Tree64Node::leaf(0, 0)], Vec::new(), Vec3::ZERO, 4.0).unwrap();
        assert!(tree.root().is_leaf());
        for origin in [Vec3::splat(2.0), Vec3::new(2.0, -3.0, 2.0)] {
            let result = cast(&tree, origin, Vec3::Y);
            assert!(!result.is_hit());
            assert_eq!(result.iterations, 1);
            assert!(!result.aborted);
        }
    }

    #[test]
    fn outside_ray_pointing_away_misses() {
        let tree = full_root_leaf();
        let result = cast(&tree, Vec3::new(-1.0, 2.0, 2.0), Vec3::NEG_X);
        assert!(!result.is_hit());
        let result = cast(&tree, Vec3::new(2.0, 9.0, 2.0), Vec3::new(0.3, 1.0, 0.1));
        assert!(!result.is_hit());
    }

    #[test]
    fn full_root_leaf_hits_after_origin_cell() {
        let tree = full_root_leaf();
        let result = cast(&tree, Vec3::splat(0.5), Vec3::X);
        let hit = result.hit.expect("neighbour cell is occupied");
        assert_eq!(result.iterations, 2);
        assert_eq!(hit.normal, Vec3::NEG_X);
        assert!(hit.position.x >= 1.0 && hit.position.x < 1.01);
        assert_relative_eq!(hit.t, 0.5, epsilon = 1e-3);
        assert_eq!(hit.node, 0);
        assert_eq!(hit.depth, 0);
    }

    #[test]
    fn single_voxel_axis_aligned() {
        let tree = single_voxel_tree();
        let result = cast(&tree, Vec3::new(3.5, 3.5, -10.0), Vec3::Z);
        let hit = result.hit.expect("ray is aimed at the voxel");
        assert_eq!(result.iterations, 5);
        assert_eq!(hit.normal, Vec3::NEG_Z);
        assert_relative_eq!(hit.t, 13.0, epsilon = 1e-2);
        assert!(hit.position.z >= 3.0 && hit.position.z < 3.01);
        assert_eq!(hit.depth, 2);
        assert_eq!(hit.node, 2);
        assert_eq!(hit.color, Vec4::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn single_voxel_from_any_side() {
        let tree = single_voxel_tree();
        let center = Vec3::splat(3.5);
        let origins = [
            Vec3::new(-20.0, -15.0, -30.0),
            Vec3::new(80.0, 3.5, 3.5),
            Vec3::new(3.2, 90.0, 3.9),
            Vec3::new(40.0, 50.0, 60.0),
        ];
        for origin in origins {
            let result = cast(&tree, origin, center - origin);
            let hit = result
                .hit
                .unwrap_or_else(|| panic!("ray from {origin} missed the voxel"));
            let margin = 1e-3;
            assert!(
                hit.position.cmpge(Vec3::splat(3.0 - margin)).all()
                    && hit.position.cmple(Vec3::splat(4.0 + margin)).all(),
                "hit at {} from {origin}",
                hit.position
            );
        }
    }

    #[test]
    fn ray_beside_voxel_misses() {
        let tree = single_voxel_tree();
        let result = cast(&tree, Vec3::new(5.5, 3.5, -10.0), Vec3::Z);
        assert!(!result.is_hit());
        assert!(!result.aborted);
    }

    #[test]
    fn origin_voxel_is_never_reported() {
        let tree = single_voxel_tree();
        let result = cast(&tree, Vec3::splat(3.5), Vec3::X);
        assert!(!result.is_hit());
    }

    #[test]
    fn step_cap_is_a_miss() {
        let tree = single_voxel_tree();
        let traversal = MaskDescentTraversal::with_config(
            &tree,
            MaskDescentConfig::default().with_max_steps(2),
        );
        let result = traversal.cast(&Ray::new(Vec3::new(3.5, 3.5, -10.0), Vec3::Z));
        assert!(!result.is_hit());
        assert_eq!(result.iterations, 2);
    }

    #[test]
    fn casting_is_idempotent() {
        let tree = single_voxel_tree();
        let traversal = MaskDescentTraversal::new(&tree);
        let ray = Ray::new(Vec3::new(-7.0, 1.0, -2.0), Vec3::new(1.0, 0.25, 0.5));
        let first = traversal.cast(&ray);
        let second = traversal.cast(&ray);
        assert_eq!(first, second);
        if let (Some(a), Some(b)) = (first.hit, second.hit) {
            assert_eq!(a.t.to_bits(), b.t.to_bits());
        }
    }

    #[test]
    fn next_down_stays_below() {
        assert!(next_down(1.25) < 1.25);
        assert_eq!(next_down(2.0), UNIT_MAX);
    }
}
