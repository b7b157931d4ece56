#![warn(missing_docs)]

//! Real-time path tracing with reservoir-resampled direct lighting.
//!
//! A frame runs in two data-parallel passes over the pixels. Primary
//! visibility writes a G-buffer; shading then follows bounded-depth paths
//! from each G-buffer vertex. At diffuse vertices, direct light from the sky
//! and the sun is chosen by weighted reservoir resampling, merging fresh
//! candidates with reservoirs stored by the previous frame at the
//! reprojected pixel and at nearby pixels.
//!
//! # Architecture
//!
//! - [`Renderer`] - Owns the scene and the two parity history slots
//! - [`Camera`] - Pinhole camera used for primary rays and reprojection
//! - [`gbuffer`] - Primary visibility pass
//! - [`Integrator`] - Mirror, glass and Lambert path loop with Russian roulette
//! - [`restir`] - Reservoirs, frame history and the resampler
//! - [`Rng`] - Counter-based hash generator keyed by pixel and sample
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lumen_math::{Color, Point3, Transform, Vec3};
//! use lumen_raytrace::{Material, SceneBuilder, Sphere};
//! use lumen_render::{Camera, Environment, RenderConfig, Renderer};
//!
//! let mut builder = SceneBuilder::new();
//! let white = builder.add_material(Material::lambert(Color::new(0.8, 0.8, 0.8)));
//! let ball = builder.add_spheres([Sphere::new(Point3::origin(), 1.0, white)]);
//! builder.add_instance(ball, Transform::translation(0.0, 0.0, -4.0), white);
//! let scene = Arc::new(builder.build().unwrap());
//!
//! let config = RenderConfig { width: 16, height: 16, ..RenderConfig::default() };
//! let mut renderer = Renderer::new(scene, config, Environment::default()).unwrap();
//! let camera = Camera::look_at(Point3::origin(), Point3::new(0.0, 0.0, -1.0), Vec3::y(), 45.0, 1.0);
//! let frame = renderer.render_frame(&camera).unwrap();
//! assert_eq!(frame.color.len(), 256);
//! ```

mod camera;
mod config;
mod error;
pub mod gbuffer;
mod integrator;
mod renderer;
pub mod restir;
mod rng;
pub mod sampling;
pub mod surface;

pub use camera::Camera;
pub use config::{Environment, RenderConfig, SeedMode, MAX_SPATIAL_NEIGHBORS};
pub use error::{RenderError, Result};
pub use gbuffer::{GBufferPixel, NO_INSTANCE};
pub use integrator::{Integrator, PixelSample, ROULETTE_MAX, ROULETTE_MIN};
pub use renderer::{pack_rgba8, Frame, Renderer};
pub use rng::{hash2, salt, Rng};
