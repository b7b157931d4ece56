//! Ray-sphere intersection (quadratic equation).

use std::f32::consts::PI;

use lumen_math::{Point3, Vec2};

use super::RAY_EPSILON;
use crate::Ray;

/// Intersect a ray with a sphere.
///
/// Returns the nearest root beyond [`RAY_EPSILON`], falling back to the far
/// root when the ray starts inside the sphere.
pub fn intersect_sphere(ray: &Ray, center: &Point3, radius: f32) -> Option<f32> {
    let oc = ray.origin - center;
    let d = &ray.direction;

    // Quadratic: |oc + t*d|^2 = r^2 with half-b form.
    let a = d.dot(d);
    let half_b = oc.dot(d);
    let c = oc.dot(&oc) - radius * radius;

    let discriminant = half_b * half_b - a * c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrt_disc = discriminant.sqrt();
    let near = (-half_b - sqrt_disc) / a;
    if near > RAY_EPSILON {
        return Some(near);
    }
    let far = (-half_b + sqrt_disc) / a;
    (far > RAY_EPSILON).then_some(far)
}

/// Latitude-longitude texture coordinates of a point on a sphere, both in
/// `[0, 1]` with `v = 0` at the +Y pole.
pub fn sphere_uv(center: &Point3, radius: f32, point: &Point3) -> Vec2 {
    let p = (point - center) / radius;
    let u = 0.5 + p.z.atan2(p.x) / (2.0 * PI);
    let v = p.y.clamp(-1.0, 1.0).acos() / PI;
    Vec2::new(u, v)
}
