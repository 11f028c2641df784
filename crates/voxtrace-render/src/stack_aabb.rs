//! Explicit-stack traversal of an [`AabbOctree`].
//!
//! Nodes are popped from a bounded [`CastStack`]; interior nodes slab-test
//! their eight children and push the ones the ray enters so that the nearest
//! is popped next. The first occupied leaf popped is the hit.

use glam::Vec4;
use tracing::trace;
use voxtrace_core::constants::{CAST_STACK_CAPACITY, OCCLUSION_EPSILON, STACK_AABB_MAX_ITERATIONS};
use voxtrace_core::{Ray, NO_HIT};
use voxtrace_voxel::{AabbOctree, AABB_CHILDREN};

use crate::cast_stack::{CastStack, StackOverflow};
use crate::intersector::{RayCastResult, VoxelHit, VoxelRayIntersector};

/// How the children of an interior node are filtered and ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChildOrder {
    /// Walk children in array order and keep one only if it is nearer than
    /// every child kept so far. Cheap, but can drop a farther child that is
    /// the only occupied one along the ray.
    RunningMinimum,
    /// Keep every child the ray enters and push them farthest first.
    #[default]
    SortedByDistance,
}

impl ChildOrder {
    /// Parse a CLI name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "running-min" | "running-minimum" => Some(Self::RunningMinimum),
            "sorted" | "sorted-by-distance" => Some(Self::SortedByDistance),
            _ => None,
        }
    }

    /// CLI name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::RunningMinimum => "running-min",
            Self::SortedByDistance => "sorted",
        }
    }
}

/// Configuration for stack traversal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackAabbConfig {
    /// Pop cap. Exceeding it is a miss.
    pub max_iterations: u32,
    /// Interior nodes entered at or before this distance are skipped.
    pub occlusion_epsilon: f32,
    /// Child filtering policy.
    pub child_order: ChildOrder,
    /// Stack entries available, at most [`CAST_STACK_CAPACITY`].
    pub stack_limit: usize,
}

impl Default for StackAabbConfig {
    fn default() -> Self {
        Self {
            max_iterations: STACK_AABB_MAX_ITERATIONS,
            occlusion_epsilon: OCCLUSION_EPSILON,
            child_order: ChildOrder::default(),
            stack_limit: CAST_STACK_CAPACITY,
        }
    }
}

impl StackAabbConfig {
    /// Set the pop cap.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the occlusion epsilon.
    #[must_use]
    pub const fn with_occlusion_epsilon(mut self, epsilon: f32) -> Self {
        self.occlusion_epsilon = epsilon;
        self
    }

    /// Set the child ordering policy.
    #[must_use]
    pub const fn with_child_order(mut self, child_order: ChildOrder) -> Self {
        self.child_order = child_order;
        self
    }

    /// Set the stack limit.
    #[must_use]
    pub const fn with_stack_limit(mut self, stack_limit: usize) -> Self {
        self.stack_limit = stack_limit;
        self
    }
}

/// Stack-AABB intersector over a borrowed [`AabbOctree`].
#[derive(Debug, Clone, Copy)]
pub struct StackAabbTraversal<'a> {
    tree: &'a AabbOctree,
    config: StackAabbConfig,
}

impl<'a> StackAabbTraversal<'a> {
    /// Traverse `tree` with default settings.
    pub fn new(tree: &'a AabbOctree) -> Self {
        Self::with_config(tree, StackAabbConfig::default())
    }

    /// Traverse `tree` with explicit settings.
    pub const fn with_config(tree: &'a AabbOctree, config: StackAabbConfig) -> Self {
        Self { tree, config }
    }

    /// The traversed tree.
    pub const fn tree(&self) -> &'a AabbOctree {
        self.tree
    }

    /// Active settings.
    pub const fn config(&self) -> &StackAabbConfig {
        &self.config
    }

    /// Push the children of `children_ptr` the ray enters, nearest on top.
    fn push_children(
        &self,
        ray: &Ray,
        children_ptr: u32,
        stack: &mut CastStack,
    ) -> Result<(), StackOverflow> {
        let mut candidates = [(0u32, 0.0f32); AABB_CHILDREN as usize];
        let mut count = 0;
        let mut running_min = NO_HIT;

        for index in children_ptr..children_ptr + AABB_CHILDREN {
            let Some(child) = self.tree.node(index) else {
                continue;
            };
            let t = child.aabb().intersect(ray);
            if t == NO_HIT || t <= 0.0 {
                continue;
            }
            match self.config.child_order {
                ChildOrder::RunningMinimum => {
                    if t < running_min {
                        running_min = t;
                        stack.push(index, t)?;
                    }
                }
                ChildOrder::SortedByDistance => {
                    candidates[count] = (index, t);
                    count += 1;
                }
            }
        }

        if self.config.child_order == ChildOrder::SortedByDistance {
            let candidates = &mut candidates[..count];
            candidates.sort_unstable_by(|a, b| b.1.total_cmp(&a.1));
            for &(index, t) in candidates.iter() {
                stack.push(index, t)?;
            }
        }
        Ok(())
    }
}

impl VoxelRayIntersector for StackAabbTraversal<'_> {
    fn cast(&self, ray: &Ray) -> RayCastResult {
        let mut stack = CastStack::with_limit(self.config.stack_limit);
        let t_root = self.tree.root().aabb().intersect(ray);
        if t_root == NO_HIT {
            return RayCastResult::miss(0);
        }
        if stack.push(0, t_root).is_err() {
            return RayCastResult {
                aborted: true,
                ..RayCastResult::miss(0)
            };
        }

        let mut iterations = 0;
        while iterations < self.config.max_iterations {
            let Some((index, t_entry)) = stack.pop() else {
                break;
            };
            iterations += 1;
            let Some(node) = self.tree.node(index) else {
                continue;
            };

            if node.is_leaf() {
                if !node.is_occupied() {
                    continue;
                }
                let aabb = node.aabb();
                let hit = VoxelHit {
                    t: t_entry,
                    position: ray.at(t_entry),
                    normal: aabb.entry_normal(ray),
                    node: index,
                    depth: node.depth,
                    color: Vec4::from_array(node.color),
                };
                return RayCastResult::hit(hit, iterations);
            }

            if t_entry <= self.config.occlusion_epsilon {
                continue;
            }

            if let Err(overflow) = self.push_children(ray, node.children_ptr, &mut stack) {
                trace!(node = index, limit = overflow.limit, "cast stack overflow, aborting ray");
                return RayCastResult {
                    hit: None,
                    iterations,
                    aborted: true,
                };
            }
        }

        RayCastResult::miss(iterations)
    }

    fn name(&self) -> &'static str {
        "stack-aabb"
    }
}
