//! Primary visibility: one closest-hit ray per pixel.

use lumen_math::{Color, Point3, Vec3};
use lumen_raytrace::Scene;
use rayon::prelude::*;

use crate::camera::Camera;
use crate::surface::{resolve, unpack_material};

/// Instance id written for pixels that see only sky.
pub const NO_INSTANCE: u32 = u32::MAX;

/// Geometry and material snapshot of one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GBufferPixel {
    /// Whether the primary ray hit anything.
    pub hit: bool,
    /// Hit position.
    pub position: Point3,
    /// Oriented unit normal.
    pub normal: Vec3,
    /// Albedo.
    pub base_color: Color,
    /// Packed shading tag and index of refraction.
    pub material: u32,
    /// Instance id, or [`NO_INSTANCE`].
    pub instance: u32,
    /// Distance from the camera, or `f32::INFINITY`.
    pub depth: f32,
    /// Primary ray direction; kept on a miss to look up the sky.
    pub view_dir: Vec3,
}

impl GBufferPixel {
    fn miss(view_dir: Vec3) -> Self {
        Self {
            hit: false,
            position: Point3::origin(),
            normal: Vec3::zeros(),
            base_color: Color::zeros(),
            material: 0,
            instance: NO_INSTANCE,
            depth: f32::INFINITY,
            view_dir,
        }
    }

    /// Shading model and index of refraction stored in `material`.
    pub fn shading(&self) -> (lumen_raytrace::Shading, f32) {
        unpack_material(self.material)
    }
}

/// Trace the primary ray of every pixel, in row-major order.
pub fn trace_primary(scene: &Scene, camera: &Camera, width: u32, height: u32) -> Vec<GBufferPixel> {
    (0..width * height)
        .into_par_iter()
        .map(|i| {
            let ray = camera.primary_ray(i % width, i / width, width, height);
            match scene.trace_closest(&ray, f32::INFINITY) {
                Some(hit) => {
                    let surface = resolve(scene, &ray, &hit);
                    GBufferPixel {
                        hit: true,
                        position: surface.position,
                        normal: surface.normal,
                        base_color: surface.base_color,
                        material: surface.packed_material,
                        instance: surface.instance,
                        depth: surface.t,
                        view_dir: ray.direction,
                    }
                }
                None => GBufferPixel::miss(ray.direction),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_math::Transform;
    use lumen_raytrace::{Material, SceneBuilder, Shading, Sphere};

    #[test]
    fn test_hits_and_misses() {
        let mut b = SceneBuilder::new();
        let glass = b.add_material(Material::glass(1.5));
        let ball = b.add_spheres([Sphere::new(Point3::origin(), 1.0, glass)]);
        b.add_instance(ball, Transform::translation(0.0, 0.0, -5.0), glass);
        let scene = b.build().unwrap();
        let camera = Camera::look_at(Point3::origin(), Point3::new(0.0, 0.0, -1.0), Vec3::y(), 30.0, 1.0);

        let g = trace_primary(&scene, &camera, 9, 9);
        assert_eq!(g.len(), 81);

        let centre = &g[4 * 9 + 4];
        assert!(centre.hit);
        assert_eq!(centre.instance, 0);
        assert!((centre.depth - 4.0).abs() < 1e-3);
        let (shading, ior) = centre.shading();
        assert_eq!(shading, Shading::Glass);
        assert!((ior - 1.5).abs() < 1e-3);

        let corner = &g[0];
        assert!(!corner.hit);
        assert_eq!(corner.instance, NO_INSTANCE);
        assert_eq!(corner.depth, f32::INFINITY);
        assert!(corner.view_dir.y > 0.0);
    }
}
