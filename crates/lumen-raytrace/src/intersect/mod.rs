//! Ray-primitive intersection routines.
//!
//! Intersectors work in whatever space the ray is expressed in. The
//! traversal code hands them object-space rays and scales `t` back to world
//! space afterwards.

mod sphere;
mod triangle;

pub use sphere::{intersect_sphere, sphere_uv};
pub use triangle::{intersect_triangle, TriangleHit};

/// Hits closer than this are ignored to avoid self-intersection.
pub const RAY_EPSILON: f32 = 1e-4;

/// Triangles whose Möller-Trumbore determinant falls below this are treated
/// as parallel to the ray.
pub const DETERMINANT_EPSILON: f32 = 1e-8;
