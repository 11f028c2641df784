//! The ray/voxel intersection capability shared by both traversals.

use glam::{Vec3, Vec4};
use voxtrace_core::Ray;

/// First occupied voxel along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelHit {
    /// World-space distance along the ray.
    pub t: f32,
    /// World-space hit position.
    pub position: Vec3,
    /// Outward normal of the crossed face.
    pub normal: Vec3,
    /// Index of the node holding the voxel.
    pub node: u32,
    /// Depth of that node, root at 0.
    pub depth: u32,
    /// Linear RGBA color.
    pub color: Vec4,
}

/// Outcome of one traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RayCastResult {
    /// The hit, if any.
    pub hit: Option<VoxelHit>,
    /// Outer iterations performed.
    pub iterations: u32,
    /// Set when the traversal stopped because its work stack overflowed.
    pub aborted: bool,
}

impl RayCastResult {
    /// A miss after `iterations` steps.
    #[inline]
    pub const fn miss(iterations: u32) -> Self {
        Self {
            hit: None,
            iterations,
            aborted: false,
        }
    }

    /// A hit after `iterations` steps.
    #[inline]
    pub const fn hit(hit: VoxelHit, iterations: u32) -> Self {
        Self {
            hit: Some(hit),
            iterations,
            aborted: false,
        }
    }

    /// Whether a voxel was hit.
    #[inline]
    pub const fn is_hit(&self) -> bool {
        self.hit.is_some()
    }
}

/// Finds the first occupied voxel along a ray.
///
/// Implementations only read shared octree data, so one instance can serve
/// every pixel concurrently.
pub trait VoxelRayIntersector: Sync {
    /// Trace a single ray.
    fn cast(&self, ray: &Ray) -> RayCastResult;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
