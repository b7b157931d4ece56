//! Closest-hit and any-hit queries through both hierarchy levels.
//!
//! The top level is walked in world space. Each instance leaf transforms the
//! ray into object space, walks that mesh's bottom-level hierarchy, and maps
//! object-space distances back with the instance scale.

use std::ops::ControlFlow;

use lumen_math::{Point3, Vec2, Vec3};

use crate::bvh::{traverse, BvhNode, BvhVisitor};
use crate::intersect::{intersect_sphere, intersect_triangle, sphere_uv};
use crate::scene::{GeometryKind, Instance, Scene};
use crate::Ray;

/// A resolved closest hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// World-space distance along the ray.
    pub t: f32,
    /// Instance id.
    pub instance: u32,
    /// Global index into [`Scene::spheres`] or [`Scene::triangles`].
    pub primitive: u32,
    /// Which array `primitive` indexes.
    pub kind: GeometryKind,
    /// Barycentric weights of the second and third triangle vertices.
    /// Zero for spheres.
    pub barycentrics: Vec2,
    /// World-space hit position.
    pub point: Point3,
    /// Unit world-space geometric normal: outward for spheres, by winding
    /// for triangles.
    pub normal: Vec3,
    /// Interpolated texture coordinates.
    pub uv: Vec2,
    /// Material id.
    pub material: u32,
}

/// How alpha-masked surfaces are tested during traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AlphaTest {
    /// Bilinear alpha; used when the hit will be shaded.
    Exact,
    /// Nearest texel first, bilinear only near the cutoff.
    Fast,
}

#[derive(Debug, Clone, Copy)]
struct PrimHit {
    t: f32,
    primitive: u32,
    u: f32,
    v: f32,
}

impl Scene {
    /// Closest opaque hit along `ray` in `(0, t_max)`.
    pub fn trace_closest(&self, ray: &Ray, t_max: f32) -> Option<Hit> {
        if self.tlas_nodes.is_empty() {
            return None;
        }
        let mut visitor = TlasClosest {
            scene: self,
            ray,
            t_max,
            best: None,
        };
        let _ = traverse(&self.tlas_nodes, 0, &mut visitor);
        let (instance, hit) = visitor.best?;
        Some(self.resolve_hit(ray, instance, &hit))
    }

    /// True if any opaque surface lies along `ray` in `(0, t_max)`.
    ///
    /// Stops at the first accepted hit.
    pub fn occluded(&self, ray: &Ray, t_max: f32) -> bool {
        if self.tlas_nodes.is_empty() {
            return false;
        }
        let mut visitor = TlasAny {
            scene: self,
            ray,
            t_max,
        };
        traverse(&self.tlas_nodes, 0, &mut visitor).is_break()
    }

    fn object_ray(instance: &Instance, ray: &Ray) -> Ray {
        Ray::new(
            instance.world_to_object.apply_point(&ray.origin),
            instance.world_to_object.apply_vec(&ray.direction),
        )
    }

    fn intersect_primitive(&self, instance: &Instance, primitive: u32, ray: &Ray) -> Option<PrimHit> {
        match instance.kind {
            GeometryKind::Spheres => {
                let s = &self.spheres[primitive as usize];
                intersect_sphere(ray, &s.center, s.radius).map(|t| PrimHit {
                    t,
                    primitive,
                    u: 0.0,
                    v: 0.0,
                })
            }
            GeometryKind::Triangles => {
                let [a, b, c] = self.triangles[primitive as usize].indices;
                intersect_triangle(
                    ray,
                    &self.vertices[a as usize],
                    &self.vertices[b as usize],
                    &self.vertices[c as usize],
                )
                .map(|h| PrimHit {
                    t: h.t,
                    primitive,
                    u: h.u,
                    v: h.v,
                })
            }
        }
    }

    fn surface_uv(&self, instance: &Instance, hit: &PrimHit, object_point: &Point3) -> Vec2 {
        match instance.kind {
            GeometryKind::Spheres => {
                let s = &self.spheres[hit.primitive as usize];
                sphere_uv(&s.center, s.radius, object_point)
            }
            GeometryKind::Triangles => {
                let [a, b, c] = self.triangles[hit.primitive as usize].indices;
                let w = 1.0 - hit.u - hit.v;
                self.uvs[a as usize] * w + self.uvs[b as usize] * hit.u + self.uvs[c as usize] * hit.v
            }
        }
    }

    fn is_opaque(&self, instance: &Instance, hit: &PrimHit, object_ray: &Ray, test: AlphaTest) -> bool {
        let material = &self.materials[self.material_id(instance, hit.primitive) as usize];
        let Some(mask) = material.alpha_mask else {
            return true;
        };
        let uv = self.surface_uv(instance, hit, &object_ray.at(hit.t));
        match test {
            AlphaTest::Exact => self.textures.alpha_opaque(mask, &uv, material.alpha_cutoff),
            AlphaTest::Fast => self.textures.alpha_opaque_fast(mask, &uv, material.alpha_cutoff),
        }
    }

    fn resolve_hit(&self, ray: &Ray, instance_id: u32, hit: &PrimHit) -> Hit {
        let instance = &self.instances[instance_id as usize];
        let object_ray = Self::object_ray(instance, ray);
        let object_point = object_ray.at(hit.t);

        let object_normal = match instance.kind {
            GeometryKind::Spheres => {
                let s = &self.spheres[hit.primitive as usize];
                (object_point - s.center) / s.radius
            }
            GeometryKind::Triangles => {
                let [a, b, c] = self.triangles[hit.primitive as usize].indices;
                let v0 = &self.vertices[a as usize];
                (self.vertices[b as usize] - v0).cross(&(self.vertices[c as usize] - v0))
            }
        };

        let t = hit.t * instance.scale;
        Hit {
            t,
            instance: instance_id,
            primitive: hit.primitive,
            kind: instance.kind,
            barycentrics: Vec2::new(hit.u, hit.v),
            point: ray.at(t),
            normal: instance.object_to_world.apply_vec(&object_normal).normalize(),
            uv: self.surface_uv(instance, hit, &object_point),
            material: self.material_id(instance, hit.primitive),
        }
    }
}

struct BlasClosest<'a> {
    scene: &'a Scene,
    instance: &'a Instance,
    ray: Ray,
    t_max: f32,
    best: Option<PrimHit>,
}

impl BvhVisitor for BlasClosest<'_> {
    fn enter(&mut self, node: &BvhNode) -> bool {
        self.ray.hits_box(&node.aabb_min, &node.aabb_max, self.t_max)
    }

    fn leaf(&mut self, node: &BvhNode) -> ControlFlow<()> {
        for slot in node.index_range() {
            let primitive = self.scene.prim_indices[slot];
            let Some(hit) = self.scene.intersect_primitive(self.instance, primitive, &self.ray) else {
                continue;
            };
            if hit.t < self.t_max && self.scene.is_opaque(self.instance, &hit, &self.ray, AlphaTest::Exact) {
                self.t_max = hit.t;
                self.best = Some(hit);
            }
        }
        ControlFlow::Continue(())
    }
}

struct BlasAny<'a> {
    scene: &'a Scene,
    instance: &'a Instance,
    ray: Ray,
    t_max: f32,
}

impl BvhVisitor for BlasAny<'_> {
    fn enter(&mut self, node: &BvhNode) -> bool {
        self.ray.hits_box(&node.aabb_min, &node.aabb_max, self.t_max)
    }

    fn leaf(&mut self, node: &BvhNode) -> ControlFlow<()> {
        for slot in node.index_range() {
            let primitive = self.scene.prim_indices[slot];
            let Some(hit) = self.scene.intersect_primitive(self.instance, primitive, &self.ray) else {
                continue;
            };
            if hit.t < self.t_max && self.scene.is_opaque(self.instance, &hit, &self.ray, AlphaTest::Fast) {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }
}

struct TlasClosest<'a> {
    scene: &'a Scene,
    ray: &'a Ray,
    t_max: f32,
    best: Option<(u32, PrimHit)>,
}

impl BvhVisitor for TlasClosest<'_> {
    fn enter(&mut self, node: &BvhNode) -> bool {
        self.ray.hits_box(&node.aabb_min, &node.aabb_max, self.t_max)
    }

    fn leaf(&mut self, node: &BvhNode) -> ControlFlow<()> {
        for slot in node.index_range() {
            let id = self.scene.tlas_indices[slot];
            let instance = &self.scene.instances[id as usize];
            if instance.scale <= 0.0 {
                continue;
            }
            let mut blas = BlasClosest {
                scene: self.scene,
                instance,
                ray: Scene::object_ray(instance, self.ray),
                t_max: self.t_max / instance.scale,
                best: None,
            };
            let _ = traverse(&self.scene.blas_nodes, instance.blas_root, &mut blas);
            if let Some(hit) = blas.best {
                let t = hit.t * instance.scale;
                if t < self.t_max {
                    self.t_max = t;
                    self.best = Some((id, hit));
                }
            }
        }
        ControlFlow::Continue(())
    }
}

struct TlasAny<'a> {
    scene: &'a Scene,
    ray: &'a Ray,
    t_max: f32,
}

impl BvhVisitor for TlasAny<'_> {
    fn enter(&mut self, node: &BvhNode) -> bool {
        self.ray.hits_box(&node.aabb_min, &node.aabb_max, self.t_max)
    }

    fn leaf(&mut self, node: &BvhNode) -> ControlFlow<()> {
        for slot in node.index_range() {
            let instance = &self.scene.instances[self.scene.tlas_indices[slot] as usize];
            if instance.scale <= 0.0 {
                continue;
            }
            let mut blas = BlasAny {
                scene: self.scene,
                instance,
                ray: Scene::object_ray(instance, self.ray),
                t_max: self.t_max / instance.scale,
            };
            traverse(&self.scene.blas_nodes, instance.blas_root, &mut blas)?;
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::scene::{SceneBuilder, Sphere};
    use approx::assert_relative_eq;
    use lumen_math::{Color, Transform};

    fn floor_mesh(b: &mut SceneBuilder, size: f32) -> crate::scene::MeshId {
        let positions = [
            Point3::new(-size, 0.0, -size),
            Point3::new(size, 0.0, -size),
            Point3::new(size, 0.0, size),
            Point3::new(-size, 0.0, size),
        ];
        let uvs = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        b.add_triangle_mesh(&positions, Some(&uvs), &[[0, 2, 1], [0, 3, 2]])
            .unwrap()
    }

    #[test]
    fn test_closest_picks_nearest_instance() {
        let mut b = SceneBuilder::new();
        let mat = b.add_material(Material::lambert(Color::new(0.5, 0.5, 0.5)));
        let sphere = b.add_spheres([Sphere::new(Point3::origin(), 1.0, mat)]);
        b.add_instance(sphere, Transform::translation(0.0, 0.0, -5.0), mat);
        b.add_instance(sphere, Transform::translation(0.0, 0.0, -10.0), mat);
        let scene = b.build().unwrap();

        let ray = Ray::new(Point3::origin(), Vec3::new(0.0, 0.0, -1.0));
        let hit = scene.trace_closest(&ray, f32::INFINITY).unwrap();
        assert_eq!(hit.instance, 0);
        assert_relative_eq!(hit.t, 4.0, epsilon = 1e-4);
        assert_relative_eq!(hit.normal, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-4);

        assert!(scene.trace_closest(&ray, 3.5).is_none());
        assert!(scene.occluded(&ray, f32::INFINITY));
        assert!(!scene.occluded(&ray, 3.5));
    }

    #[test]
    fn test_scaled_instance_distance_is_world_space() {
        let mut b = SceneBuilder::new();
        let mat = b.add_material(Material::default());
        let sphere = b.add_spheres([Sphere::new(Point3::origin(), 1.0, mat)]);
        let xf = Transform::translation(0.0, 0.0, -10.0)
            .then(&Transform::rotation_y(0.7))
            .then(&Transform::uniform_scale(2.0));
        b.add_instance(sphere, xf, mat);
        let scene = b.build().unwrap();

        let ray = Ray::new(Point3::origin(), Vec3::new(0.0, 0.0, -1.0));
        let hit = scene.trace_closest(&ray, f32::INFINITY).unwrap();
        assert_relative_eq!(hit.t, 8.0, epsilon = 1e-3);
        assert_relative_eq!(hit.point.z, -8.0, epsilon = 1e-3);
        assert_relative_eq!(hit.normal.norm(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_triangle_hit_attributes() {
        let mut b = SceneBuilder::new();
        let mat = b.add_material(Material::default());
        let floor = floor_mesh(&mut b, 1.0);
        b.add_instance(floor, Transform::identity(), mat);
        let scene = b.build().unwrap();

        let ray = Ray::new(Point3::new(0.5, 2.0, 0.5), Vec3::new(0.0, -1.0, 0.0));
        let hit = scene.trace_closest(&ray, f32::INFINITY).unwrap();
        assert_eq!(hit.kind, GeometryKind::Triangles);
        assert_relative_eq!(hit.t, 2.0, epsilon = 1e-5);
        assert_relative_eq!(hit.uv, Vec2::new(0.75, 0.75), epsilon = 1e-5);
        // Winding [0, 2, 1] faces +Y.
        assert_relative_eq!(hit.normal, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_alpha_cutout_lets_rays_through() {
        let mut b = SceneBuilder::new();
        // Left half transparent, right half opaque.
        let texels = [[1.0, 1.0, 1.0, 0.0], [1.0, 1.0, 1.0, 1.0]];
        let mask = b.add_texture(2, 1, &texels).unwrap();
        let leaf = b.add_material(Material::default().with_alpha_mask(mask, 0.5));
        let ground = b.add_material(Material::default());
        let floor = floor_mesh(&mut b, 1.0);
        b.add_instance(floor, Transform::translation(0.0, 1.0, 0.0), leaf);
        b.add_instance(floor, Transform::identity(), ground);
        let scene = b.build().unwrap();

        // u = 0.1: transparent, falls through to the ground.
        let through = Ray::new(Point3::new(-0.8, 3.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let hit = scene.trace_closest(&through, f32::INFINITY).unwrap();
        assert_eq!(hit.instance, 1);
        assert!(!scene.occluded(&through, 2.5));

        // u = 0.9: opaque leaf.
        let blocked = Ray::new(Point3::new(0.8, 3.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let hit = scene.trace_closest(&blocked, f32::INFINITY).unwrap();
        assert_eq!(hit.instance, 0);
        assert!(scene.occluded(&blocked, 2.5));
    }

    #[test]
    fn test_miss() {
        let mut b = SceneBuilder::new();
        let mat = b.add_material(Material::default());
        let sphere = b.add_spheres([Sphere::new(Point3::origin(), 1.0, mat)]);
        b.add_instance(sphere, Transform::identity(), mat);
        let scene = b.build().unwrap();
        let ray = Ray::new(Point3::new(0.0, 5.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(scene.trace_closest(&ray, f32::INFINITY).is_none());
        assert!(!scene.occluded(&ray, f32::INFINITY));
    }
}
