//! Pinhole camera with the cached basis used for reprojection.

use lumen_math::{Point3, Vec3};
use lumen_raytrace::Ray;

/// A pinhole camera.
///
/// `forward`, `right` and `up` must form an orthonormal basis consistent
/// with `vfov` and `aspect`; [`Camera::look_at`] guarantees this. Cameras
/// assembled by hand are trusted as-is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Eye position.
    pub origin: Point3,
    /// Viewing direction.
    pub forward: Vec3,
    /// Image-plane +x direction.
    pub right: Vec3,
    /// Image-plane +y direction.
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub vfov: f32,
    /// Width over height.
    pub aspect: f32,
}

impl Camera {
    /// Camera at `from` looking at `at`, with `vfov_deg` vertical field of
    /// view.
    pub fn look_at(from: Point3, at: Point3, world_up: Vec3, vfov_deg: f32, aspect: f32) -> Self {
        let forward = (at - from).normalize();
        let right = forward.cross(&world_up).normalize();
        let up = right.cross(&forward);
        Self {
            origin: from,
            forward,
            right,
            up,
            vfov: vfov_deg.to_radians(),
            aspect,
        }
    }

    #[inline]
    fn tan_half_fov(&self) -> f32 {
        (0.5 * self.vfov).tan()
    }

    /// Ray through the centre of pixel `(x, y)`; `y` grows downward.
    pub fn primary_ray(&self, x: u32, y: u32, width: u32, height: u32) -> Ray {
        let tan = self.tan_half_fov();
        let sx = ((x as f32 + 0.5) / width as f32) * 2.0 - 1.0;
        let sy = 1.0 - ((y as f32 + 0.5) / height as f32) * 2.0;
        let dir = self.forward + self.right * (sx * tan * self.aspect) + self.up * (sy * tan);
        Ray::new(self.origin, dir)
    }

    /// Continuous pixel coordinates of world point `p`, or `None` when it is
    /// behind the camera.
    pub fn project(&self, p: &Point3, width: u32, height: u32) -> Option<(f32, f32)> {
        let d = p - self.origin;
        let z = d.dot(&self.forward);
        if z <= 1e-6 {
            return None;
        }
        let tan = self.tan_half_fov();
        let sx = d.dot(&self.right) / (z * tan * self.aspect);
        let sy = d.dot(&self.up) / (z * tan);
        Some((
            (sx + 1.0) * 0.5 * width as f32,
            (1.0 - sy) * 0.5 * height as f32,
        ))
    }

    /// Pixel containing world point `p`, if it lands on screen.
    pub fn project_to_pixel(&self, p: &Point3, width: u32, height: u32) -> Option<(u32, u32)> {
        let (fx, fy) = self.project(p, width, height)?;
        if fx < 0.0 || fy < 0.0 || fx >= width as f32 || fy >= height as f32 {
            return None;
        }
        Some((fx as u32, fy as u32))
    }
}
