//! Turns a raw hit into a shadeable surface point.

use lumen_math::{Color, Point3, Vec3};
use lumen_raytrace::{Hit, Ray, Scene, Shading};

/// Fixed-point scale for the index of refraction in packed material words.
pub const IOR_SCALE: f32 = 4096.0;

/// Pack a shading model and index of refraction into one word: IOR in
/// 4.12 fixed point in the high half, shading tag in the low half.
pub fn pack_material(shading: Shading, ior: f32) -> u32 {
    let ior_fixed = (ior * IOR_SCALE).round().clamp(0.0, u16::MAX as f32) as u32;
    (ior_fixed << 16) | shading.tag() as u32
}

/// Inverse of [`pack_material`]. Unknown tags shade as Lambert.
pub fn unpack_material(word: u32) -> (Shading, f32) {
    let shading = Shading::from_tag((word & 0xFFFF) as u16).unwrap_or_default();
    (shading, (word >> 16) as f32 / IOR_SCALE)
}

/// Everything shading needs to know about a hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    /// World position.
    pub position: Point3,
    /// Unit normal, flipped toward the ray for two-sided materials.
    pub normal: Vec3,
    /// Albedo: the diffuse texture if present, else the base color.
    pub base_color: Color,
    /// Scattering model.
    pub shading: Shading,
    /// Index of refraction.
    pub ior: f32,
    /// [`pack_material`] of `shading` and `ior`.
    pub packed_material: u32,
    /// Instance id.
    pub instance: u32,
    /// Distance from the ray origin.
    pub t: f32,
}

/// Resolve material, texture and normal orientation at `hit`.
pub fn resolve(scene: &Scene, ray: &Ray, hit: &Hit) -> SurfacePoint {
    let material = &scene.materials[hit.material as usize];

    let base_color = match material.diffuse_texture {
        Some(texture) => {
            let texel = scene.textures.sample_bilinear(texture, &hit.uv);
            Color::new(texel[0], texel[1], texel[2])
        }
        None => material.base_color,
    };

    let normal = if material.two_sided && hit.normal.dot(&ray.direction) > 0.0 {
        -hit.normal
    } else {
        hit.normal
    };

    SurfacePoint {
        position: hit.point,
        normal,
        base_color,
        shading: material.shading,
        ior: material.ior,
        packed_material: pack_material(material.shading, material.ior),
        instance: hit.instance,
        t: hit.t,
    }
}

/// Offset `p` off the surface with normal `n`, to the side `dir` leaves
/// toward, so continuation rays do not re-hit the same surface.
pub fn offset_origin(p: &Point3, n: &Vec3, dir: &Vec3) -> Point3 {
    const OFFSET: f32 = 1e-3;
    let scale = 1.0 + p.coords.amax();
    if n.dot(dir) >= 0.0 {
        p + n * (OFFSET * scale)
    } else {
        p - n * (OFFSET * scale)
    }
}
