//! Rays, bounding boxes and the slab intersection test.

use glam::Vec3;

/// Distance returned by [`Aabb::intersect`] when the ray misses the box.
pub const NO_HIT: f32 = f32::INFINITY;

/// Ray with a precomputed reciprocal direction.
///
/// Components of `inv_direction` are `±inf` where the direction is zero on
/// that axis; intersection math relies on IEEE-754 semantics for those.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    /// Ray origin
    pub origin: Vec3,
    /// Ray direction (normalized)
    pub direction: Vec3,
    /// Element-wise reciprocal of `direction`
    pub inv_direction: Vec3,
}

impl Ray {
    /// Create a new ray, normalizing `direction`.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        let direction = direction.normalize();
        Self {
            origin,
            direction,
            inv_direction: direction.recip(),
        }
    }

    /// Get a point along the ray at distance t
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Axis-Aligned Bounding Box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max corners
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create a cube of edge `size` around `center`
    #[inline]
    pub fn from_center_size(center: Vec3, size: f32) -> Self {
        let half = Vec3::splat(size * 0.5);
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Get the center of the AABB
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size of the AABB
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Check if a point is inside the AABB
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Slab intersection, evaluated in `f64`.
    ///
    /// Returns the entry distance `t_min`, or [`NO_HIT`] when `t_min > t_max`.
    /// An origin inside the box yields a non-positive `t_min`; boxes entirely
    /// behind the origin are not rejected here.
    pub fn intersect(&self, ray: &Ray) -> f32 {
        let (t_min, t_max) = self.slab_interval(ray);
        if t_min > t_max {
            NO_HIT
        } else {
            t_min as f32
        }
    }

    /// Entry and exit distances clamped to the forward half of the ray,
    /// or `None` if the box is missed or behind the origin.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32)> {
        let (t_min, t_max) = self.slab_interval(ray);
        if t_min <= t_max && t_max >= 0.0 {
            Some((t_min.max(0.0) as f32, t_max as f32))
        } else {
            None
        }
    }

    /// Outward normal of the face through which `ray` enters the box.
    pub fn entry_normal(&self, ray: &Ray) -> Vec3 {
        let plane = Vec3::select(ray.inv_direction.cmpge(Vec3::ZERO), self.min, self.max);
        let t = (plane - ray.origin) * ray.inv_direction;
        let t = Vec3::select(t.is_nan_mask(), Vec3::NEG_INFINITY, t);
        let axis = if t.x >= t.y && t.x >= t.z {
            0
        } else if t.y >= t.z {
            1
        } else {
            2
        };
        let mut normal = Vec3::ZERO;
        normal[axis] = -ray.direction[axis].signum();
        normal
    }

    /// Intersection of the three per-axis slab intervals.
    ///
    /// An axis the ray runs parallel to (infinite reciprocal) either contains
    /// the origin and constrains nothing, or empties the interval. This keeps
    /// `0 * inf` out of the reduction.
    fn slab_interval(&self, ray: &Ray) -> (f64, f64) {
        let origin = ray.origin.as_dvec3();
        let inv_dir = ray.inv_direction.as_dvec3();
        let min = self.min.as_dvec3();
        let max = self.max.as_dvec3();

        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;
        for axis in 0..3 {
            if inv_dir[axis].is_infinite() {
                if origin[axis] < min[axis] || origin[axis] > max[axis] {
                    return (f64::INFINITY, f64::NEG_INFINITY);
                }
                continue;
            }
            let t1 = (min[axis] - origin[axis]) * inv_dir[axis];
            let t2 = (max[axis] - origin[axis]) * inv_dir[axis];
            t_min = t_min.max(t1.min(t2));
            t_max = t_max.min(t1.max(t2));
        }
        (t_min, t_max)
    }
}
