//! Ray representation and the slab test used by both BVH levels.

use lumen_math::{Point3, Vec3};

/// Reciprocal components are clamped to this magnitude so axis-parallel
/// rays never produce `inf * 0 = NaN` in the slab test.
pub const INV_DIRECTION_LIMIT: f32 = 1e20;

/// A ray in 3D space defined by origin and direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Unit direction of the ray.
    pub direction: Vec3,
    /// Precomputed reciprocal of direction components for fast AABB tests.
    inv_direction: Vec3,
    /// Sign of direction components (0 if positive, 1 if negative).
    sign: [usize; 3],
}

impl Ray {
    /// Create a new ray from origin and direction.
    ///
    /// The direction will be normalized.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        let dir = direction.normalize();
        let inv = Vec3::new(
            safe_reciprocal(dir.x),
            safe_reciprocal(dir.y),
            safe_reciprocal(dir.z),
        );
        let sign = [
            usize::from(inv.x < 0.0),
            usize::from(inv.y < 0.0),
            usize::from(inv.z < 0.0),
        ];
        Self {
            origin,
            direction: dir,
            inv_direction: inv,
            sign,
        }
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f32) -> Point3 {
        self.origin + self.direction * t
    }

    /// Reciprocal direction with near-zero components flushed to a large
    /// finite value of matching sign.
    #[inline]
    pub fn inv_direction(&self) -> &Vec3 {
        &self.inv_direction
    }

    /// Slab test against a box given as raw corner arrays.
    ///
    /// Returns `true` when the ray overlaps the box somewhere in
    /// `[0, t_best)`. Boxes entered at or beyond `t_best` are rejected so
    /// closest-hit traversal can cull against the current best hit.
    #[inline]
    pub fn hits_box(&self, min: &[f32; 3], max: &[f32; 3], t_best: f32) -> bool {
        let bounds = [min, max];

        let tx1 = (bounds[self.sign[0]][0] - self.origin.x) * self.inv_direction.x;
        let tx2 = (bounds[1 - self.sign[0]][0] - self.origin.x) * self.inv_direction.x;

        let mut t_min = tx1;
        let mut t_max = tx2;

        let ty1 = (bounds[self.sign[1]][1] - self.origin.y) * self.inv_direction.y;
        let ty2 = (bounds[1 - self.sign[1]][1] - self.origin.y) * self.inv_direction.y;

        t_min = t_min.max(ty1);
        t_max = t_max.min(ty2);

        let tz1 = (bounds[self.sign[2]][2] - self.origin.z) * self.inv_direction.z;
        let tz2 = (bounds[1 - self.sign[2]][2] - self.origin.z) * self.inv_direction.z;

        t_min = t_min.max(tz1);
        t_max = t_max.min(tz2);

        t_max >= t_min.max(0.0) && t_min < t_best
    }
}

#[inline]
fn safe_reciprocal(d: f32) -> f32 {
    if d.abs() < 1.0 / INV_DIRECTION_LIMIT {
        INV_DIRECTION_LIMIT.copysign(d)
    } else {
        1.0 / d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT_MIN: [f32; 3] = [0.0, 0.0, 0.0];
    const UNIT_MAX: [f32; 3] = [1.0, 1.0, 1.0];

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0));
        let p = ray.at(5.0);
        assert!((p.x - 5.0).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
        assert!(p.z.abs() < 1e-6);
    }

    #[test]
    fn test_ray_box_hit() {
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert!(ray.hits_box(&UNIT_MIN, &UNIT_MAX, f32::INFINITY));
    }

    #[test]
    fn test_ray_box_culled_by_best_hit() {
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        // Box is entered at t = 5.
        assert!(!ray.hits_box(&UNIT_MIN, &UNIT_MAX, 4.0));
        assert!(!ray.hits_box(&UNIT_MIN, &UNIT_MAX, 5.0));
        assert!(ray.hits_box(&UNIT_MIN, &UNIT_MAX, 5.5));
    }

    #[test]
    fn test_ray_box_miss() {
        let ray = Ray::new(Point3::new(-5.0, 5.0, 5.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(!ray.hits_box(&UNIT_MIN, &UNIT_MAX, f32::INFINITY));
    }

    #[test]
    fn test_ray_inside_box() {
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert!(ray.hits_box(&UNIT_MIN, &UNIT_MAX, f32::INFINITY));
    }

    #[test]
    fn test_ray_box_behind() {
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(-1.0, 0.0, 0.0));
        assert!(!ray.hits_box(&UNIT_MIN, &UNIT_MAX, f32::INFINITY));
    }

    #[test]
    fn test_axis_parallel_ray_on_slab_plane() {
        // Direction has exact zeros in y and z; origin sits on the y = 0 face.
        let ray = Ray::new(Point3::new(-1.0, 0.0, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert!(ray.inv_direction().y.is_finite());
        assert!(ray.hits_box(&UNIT_MIN, &UNIT_MAX, f32::INFINITY));

        let outside = Ray::new(Point3::new(-1.0, -0.01, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert!(!outside.hits_box(&UNIT_MIN, &UNIT_MAX, f32::INFINITY));
    }

    #[test]
    fn test_flat_box() {
        // Zero-thickness box, as produced by an axis-aligned triangle.
        let ray = Ray::new(Point3::new(0.5, 3.0, 0.5), Vec3::new(0.0, -1.0, 0.0));
        assert!(ray.hits_box(&[0.0, 0.0, 0.0], &[1.0, 0.0, 1.0], f32::INFINITY));
    }
}
