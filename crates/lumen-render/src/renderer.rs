//! Frame driver: primary visibility, shading, and reservoir ping-pong.

use std::sync::Arc;

use lumen_math::Color;
use lumen_raytrace::Scene;
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::camera::Camera;
use crate::config::{Environment, RenderConfig};
use crate::error::{RenderError, Result};
use crate::gbuffer::trace_primary;
use crate::integrator::{Integrator, PixelSample};
use crate::restir::{FrameHistory, PixelRecord, ReservoirBuffer, Reuse};

/// Largest allowed gap between the camera's aspect and `width / height`.
const ASPECT_TOLERANCE: f32 = 1e-3;

/// Output of one rendered frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Packed RGBA8 colour, one word per pixel, row-major.
    pub color: Vec<u32>,
    /// Primary hit distance; `f32::INFINITY` on a miss.
    pub depth: Vec<f32>,
    /// Primary hit instance id; `u32::MAX` on a miss.
    pub instance_ids: Vec<u32>,
    /// Linear radiance before packing.
    pub radiance: Vec<[f32; 3]>,
}

impl Frame {
    /// Colour buffer as bytes in R, G, B, A order.
    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.color)
    }
}

/// Pack linear radiance into `r | g << 8 | b << 16 | a << 24`.
pub fn pack_rgba8(c: &Color) -> u32 {
    let encode = |v: f32| -> u32 {
        let v = if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        (v.powf(1.0 / 2.2) * 255.0 + 0.5) as u32
    };
    encode(c.x) | encode(c.y) << 8 | encode(c.z) << 16 | 0xff << 24
}

/// Renders frames of a static scene, carrying reservoirs between them.
pub struct Renderer {
    scene: Arc<Scene>,
    config: RenderConfig,
    environment: Environment,
    history: [Option<FrameHistory>; 2],
    frame: u32,
}

impl Renderer {
    /// Create a renderer; fails if `config` does not validate.
    pub fn new(scene: Arc<Scene>, config: RenderConfig, environment: Environment) -> Result<Self> {
        config.validate()?;
        debug!(
            width = config.width,
            height = config.height,
            spp = config.spp,
            instances = scene.instances.len(),
            "renderer ready"
        );
        Ok(Self {
            scene,
            config,
            environment,
            history: [None, None],
            frame: 0,
        })
    }

    /// Settings in use.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Index of the next frame to render.
    pub fn frame_index(&self) -> u32 {
        self.frame
    }

    /// History written by the most recent frame, if any.
    pub fn history(&self) -> Option<&FrameHistory> {
        let prev = self.frame.checked_sub(1)?;
        self.history[(prev & 1) as usize].as_ref()
    }

    /// Forget all stored reservoirs; the next frame starts from scratch.
    pub fn reset_history(&mut self) {
        self.history = [None, None];
    }

    /// Render the next frame from `camera`.
    pub fn render_frame(&mut self, camera: &Camera) -> Result<Frame> {
        let (width, height) = (self.config.width, self.config.height);
        if (camera.aspect - self.config.aspect()).abs() > ASPECT_TOLERANCE {
            return Err(RenderError::ResolutionMismatch {
                width,
                height,
                camera_aspect: camera.aspect,
            });
        }

        let frame = self.frame;
        let gbuffer = trace_primary(&self.scene, camera, width, height);

        let previous = frame
            .checked_sub(1)
            .and_then(|p| self.history[(p & 1) as usize].as_ref())
            .filter(|h| h.width == width && h.height == height);
        let reuse_frame = self.config.seed.frame_term(frame);
        let integrator = Integrator::new(&self.scene, &self.config, &self.environment);

        let samples: Vec<PixelSample> = gbuffer
            .par_iter()
            .enumerate()
            .map(|(i, g)| {
                let (x, y) = (i as u32 % width, i as u32 / width);
                let reuse = previous.map(|history| Reuse {
                    history,
                    pixel: (x, y),
                    frame: reuse_frame,
                });
                integrator.shade_pixel(x, y, frame, g, reuse)
            })
            .collect();

        let records: Vec<PixelRecord> = gbuffer
            .iter()
            .zip(&samples)
            .map(|(g, s)| PixelRecord {
                depth: g.depth,
                normal: g.normal,
                instance: g.instance,
                reservoir: s.reservoir,
            })
            .collect();
        self.history[(frame & 1) as usize] = Some(FrameHistory::new(width, height, frame, *camera, &records));

        let output = Frame {
            width,
            height,
            color: samples.iter().map(|s| pack_rgba8(&s.radiance)).collect(),
            depth: gbuffer.iter().map(|g| g.depth).collect(),
            instance_ids: gbuffer.iter().map(|g| g.instance).collect(),
            radiance: samples.iter().map(|s| s.radiance.into()).collect(),
        };
        trace!(frame, hits = gbuffer.iter().filter(|g| g.hit).count(), "frame rendered");

        self.frame = self.frame.wrapping_add(1);
        Ok(output)
    }

    /// Reservoirs written by the most recent frame.
    pub fn reservoirs(&self) -> Option<&ReservoirBuffer> {
        self.history().map(|h| &h.reservoirs)
    }
}
