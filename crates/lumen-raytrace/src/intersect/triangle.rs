//! Ray-triangle intersection (Möller-Trumbore).

use lumen_math::Point3;

use super::{DETERMINANT_EPSILON, RAY_EPSILON};
use crate::Ray;

/// A ray-triangle hit with barycentric coordinates of `v1` and `v2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Parameter along the ray.
    pub t: f32,
    /// Weight of the second vertex.
    pub u: f32,
    /// Weight of the third vertex.
    pub v: f32,
}

/// Intersect a ray with the triangle `(v0, v1, v2)`.
///
/// Both faces are hit. A determinant magnitude below
/// [`DETERMINANT_EPSILON`] counts as parallel and misses.
pub fn intersect_triangle(ray: &Ray, v0: &Point3, v1: &Point3, v2: &Point3) -> Option<TriangleHit> {
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let p = ray.direction.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < DETERMINANT_EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = ray.origin - v0;
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&e1);
    let v = ray.direction.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(&q) * inv_det;
    (t > RAY_EPSILON).then_some(TriangleHit { t, u, v })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_math::Vec3;

    fn unit_triangle() -> [Point3; 3] {
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_hit_front_face() {
        let [a, b, c] = unit_triangle();
        let ray = Ray::new(Point3::new(0.25, 0.25, 2.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = intersect_triangle(&ray, &a, &b, &c).unwrap();
        assert!((hit.t - 2.0).abs() < 1e-5);
        assert!((hit.u - 0.25).abs() < 1e-5);
        assert!((hit.v - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_hit_back_face() {
        let [a, b, c] = unit_triangle();
        let ray = Ray::new(Point3::new(0.25, 0.25, -2.0), Vec3::new(0.0, 0.0, 1.0));
        let hit = intersect_triangle(&ray, &a, &b, &c).unwrap();
        assert!((hit.t - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_miss_outside() {
        let [a, b, c] = unit_triangle();
        let ray = Ray::new(Point3::new(0.8, 0.8, 2.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(intersect_triangle(&ray, &a, &b, &c).is_none());
    }

    #[test]
    fn test_parallel_ray_misses() {
        let [a, b, c] = unit_triangle();
        let ray = Ray::new(Point3::new(-1.0, 0.25, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(intersect_triangle(&ray, &a, &b, &c).is_none());
    }

    #[test]
    fn test_behind_origin_misses() {
        let [a, b, c] = unit_triangle();
        let ray = Ray::new(Point3::new(0.25, 0.25, 2.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(intersect_triangle(&ray, &a, &b, &c).is_none());
    }

    #[test]
    fn test_degenerate_triangle_misses() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 1.0, 0.0);
        let c = Point3::new(2.0, 2.0, 0.0);
        let ray = Ray::new(Point3::new(1.0, 1.0, 2.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(intersect_triangle(&ray, &a, &b, &c).is_none());
    }
}
