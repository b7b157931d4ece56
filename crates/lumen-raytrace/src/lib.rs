#![warn(missing_docs)]

//! Two-level ray tracing acceleration for the lumen renderer.
//!
//! Geometry is registered per mesh and placed by instances. Each mesh gets a
//! bottom-level hierarchy (BLAS) in object space; a top-level hierarchy
//! (TLAS) bounds the instances in world space. Both levels use the same flat
//! [`BvhNode`] layout with skip links, so traversal runs without a stack.
//!
//! # Architecture
//!
//! - [`Ray`] - Ray with precomputed reciprocal direction for slab tests
//! - [`intersect`] - Ray/sphere and ray/triangle intersectors
//! - [`bvh`] - Median-split hierarchy construction and stackless traversal
//! - [`SceneBuilder`] / [`Scene`] - Meshes, instances, materials, textures
//! - [`Scene::trace_closest`] / [`Scene::occluded`] - Ray queries
//!
//! # Example
//!
//! ```
//! use lumen_math::{Color, Point3, Transform, Vec3};
//! use lumen_raytrace::{Material, Ray, SceneBuilder, Sphere};
//!
//! let mut builder = SceneBuilder::new();
//! let red = builder.add_material(Material::lambert(Color::new(0.8, 0.1, 0.1)));
//! let ball = builder.add_spheres([Sphere::new(Point3::origin(), 1.0, red)]);
//! builder.add_instance(ball, Transform::translation(0.0, 0.0, -5.0), red);
//! let scene = builder.build().unwrap();
//!
//! let ray = Ray::new(Point3::origin(), Vec3::new(0.0, 0.0, -1.0));
//! let hit = scene.trace_closest(&ray, f32::INFINITY).unwrap();
//! assert!((hit.t - 4.0).abs() < 1e-4);
//! ```

pub mod bvh;
mod error;
pub mod intersect;
mod material;
mod ray;
mod scene;
pub mod texture;
mod trace;

pub use bvh::{BvhNode, BLAS_LEAF_SIZE, TLAS_LEAF_SIZE};
pub use error::{AccelError, Result};
pub use material::{Material, Shading};
pub use ray::Ray;
pub use scene::{GeometryKind, Instance, MeshId, Scene, SceneBuilder, Sphere, Triangle};
pub use texture::{TextureAtlas, TextureView};
pub use trace::Hit;
