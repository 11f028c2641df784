//! Dense voxel grid used as build input.

use glam::{UVec3, Vec3};
use voxtrace_voxel::palette::index;

/// A cube of `edge^3` voxels, each empty or holding a palette index.
///
/// Voxel `(x, y, z)` covers the world-space unit cube starting at
/// `(x, y, z)`. Index [`index::AIR`] is stored as empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelGrid {
    edge: u32,
    voxels: Vec<u8>,
}

impl VoxelGrid {
    /// An empty grid.
    pub fn new(edge: u32) -> Self {
        let len = edge as usize * edge as usize * edge as usize;
        Self {
            edge,
            voxels: vec![index::AIR; len],
        }
    }

    /// Voxels per axis.
    #[inline]
    pub const fn edge(&self) -> u32 {
        self.edge
    }

    /// Whether a coordinate lies in the grid.
    #[inline]
    pub const fn contains(&self, x: u32, y: u32, z: u32) -> bool {
        x < self.edge && y < self.edge && z < self.edge
    }

    #[inline]
    fn offset(&self, x: u32, y: u32, z: u32) -> usize {
        let edge = self.edge as usize;
        x as usize + z as usize * edge + y as usize * edge * edge
    }

    /// Palette index at a voxel, `None` if empty or outside.
    #[inline]
    pub fn get(&self, x: u32, y: u32, z: u32) -> Option<u8> {
        if !self.contains(x, y, z) {
            return None;
        }
        let material = self.voxels[self.offset(x, y, z)];
        (material != index::AIR).then_some(material)
    }

    /// Set a voxel. Returns false for coordinates outside the grid.
    pub fn set(&mut self, x: u32, y: u32, z: u32, material: u8) -> bool {
        if !self.contains(x, y, z) {
            return false;
        }
        let offset = self.offset(x, y, z);
        self.voxels[offset] = material;
        true
    }

    /// Empty a voxel.
    pub fn clear(&mut self, x: u32, y: u32, z: u32) -> bool {
        self.set(x, y, z, index::AIR)
    }

    /// Fill the box `[min, max)`, clipped to the grid.
    pub fn fill(&mut self, min: UVec3, max: UVec3, material: u8) {
        let max = max.min(UVec3::splat(self.edge));
        for y in min.y..max.y {
            for z in min.z..max.z {
                for x in min.x..max.x {
                    let offset = self.offset(x, y, z);
                    self.voxels[offset] = material;
                }
            }
        }
    }

    /// Fill every voxel whose center lies within `radius` of `center`.
    pub fn fill_sphere(&mut self, center: Vec3, radius: f32, material: u8) {
        let lo = (center - Vec3::splat(radius)).floor().max(Vec3::ZERO).as_uvec3();
        let hi = (center + Vec3::splat(radius)).ceil().max(Vec3::ZERO).as_uvec3();
        let hi = hi.min(UVec3::splat(self.edge));
        let radius_sq = radius * radius;
        for y in lo.y..hi.y {
            for z in lo.z..hi.z {
                for x in lo.x..hi.x {
                    let voxel_center = UVec3::new(x, y, z).as_vec3() + Vec3::splat(0.5);
                    if voxel_center.distance_squared(center) <= radius_sq {
                        let offset = self.offset(x, y, z);
                        self.voxels[offset] = material;
                    }
                }
            }
        }
    }

    /// Number of occupied voxels.
    pub fn occupied_count(&self) -> usize {
        self.voxels.iter().filter(|&&m| m != index::AIR).count()
    }

    /// Whether no voxel is occupied.
    pub fn is_empty(&self) -> bool {
        self.voxels.iter().all(|&m| m == index::AIR)
    }

    /// Occupied voxels with their palette index, y-major order.
    pub fn iter_occupied(&self) -> impl Iterator<Item = (UVec3, u8)> + '_ {
        let edge = self.edge;
        self.voxels
            .iter()
            .enumerate()
            .filter(|(_, &m)| m != index::AIR)
            .map(move |(i, &m)| {
                let i = i as u32;
                let x = i % edge;
                let z = (i / edge) % edge;
                let y = i / (edge * edge);
                (UVec3::new(x, y, z), m)
            })
    }

    /// Raw storage, x fastest then z then y; [`index::AIR`] marks empty.
    pub fn as_slice(&self) -> &[u8] {
        &self.voxels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut grid = VoxelGrid::new(4);
        assert!(grid.is_empty());
        assert!(grid.set(1, 2, 3, index::STONE));
        assert_eq!(grid.get(1, 2, 3), Some(index::STONE));
        assert_eq!(grid.get(3, 2, 1), None);
        assert!(!grid.set(4, 0, 0, index::STONE));
        assert_eq!(grid.get(4, 0, 0), None);

        assert!(grid.clear(1, 2, 3));
        assert!(grid.is_empty());
    }

    #[test]
    fn fill_is_half_open_and_clipped() {
        let mut grid = VoxelGrid::new(8);
        grid.fill(UVec3::new(2, 0, 0), UVec3::new(4, 1, 20), index::DIRT);
        assert_eq!(grid.occupied_count(), 2 * 8);
        assert_eq!(grid.get(3, 0, 7), Some(index::DIRT));
        assert_eq!(grid.get(4, 0, 0), None);
    }

    #[test]
    fn sphere_is_symmetric() {
        let mut grid = VoxelGrid::new(16);
        grid.fill_sphere(Vec3::splat(8.0), 5.0, index::GRASS);
        assert_eq!(grid.get(8, 8, 8), Some(index::GRASS));
        assert_eq!(grid.get(0, 0, 0), None);
        for (p, _) in grid.iter_occupied() {
            let mirrored = UVec3::splat(15) - p;
            assert!(grid.get(mirrored.x, mirrored.y, mirrored.z).is_some());
        }
    }

    #[test]
    fn sphere_outside_grid_is_clipped() {
        let mut grid = VoxelGrid::new(4);
        grid.fill_sphere(Vec3::new(-10.0, 2.0, 2.0), 3.0, index::SAND);
        assert!(grid.is_empty());
        grid.fill_sphere(Vec3::new(4.0, 2.0, 2.0), 1.0, index::SAND);
        assert_eq!(grid.occupied_count(), 4);
    }

    #[test]
    fn occupied_iteration_reports_coordinates() {
        let mut grid = VoxelGrid::new(4);
        grid.set(3, 1, 2, index::LOG);
        let occupied: Vec<_> = grid.iter_occupied().collect();
        assert_eq!(occupied, vec![(UVec3::new(3, 1, 2), index::LOG)]);
    }
}
