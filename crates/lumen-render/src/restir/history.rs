//! Frame-scoped, write-once per-pixel buffers.
//!
//! A [`FrameHistory`] is assembled once at the end of a frame and never
//! mutated afterwards. The renderer keeps two of them, indexed by frame
//! parity: frame `N` reads slot `(N - 1) & 1` and its finished history
//! replaces slot `N & 1`.

use lumen_math::{Point3, Vec3};

use super::reservoir::{LightKind, Reservoir};
use crate::camera::Camera;

/// Reservoirs of a whole frame as seven parallel arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReservoirBuffer {
    /// Selected direction.
    pub direction: Vec<[f32; 3]>,
    /// Selected radiance.
    pub radiance: Vec<[f32; 3]>,
    /// Selection pdf.
    pub pdf: Vec<f32>,
    /// Accepted weight.
    pub weight: Vec<f32>,
    /// Weight sum.
    pub weight_sum: Vec<f32>,
    /// Candidate count.
    pub count: Vec<u32>,
    /// Light kind tag.
    pub light: Vec<u32>,
}

impl ReservoirBuffer {
    /// Number of pixels stored.
    pub fn len(&self) -> usize {
        self.count.len()
    }

    /// True if no pixel is stored.
    pub fn is_empty(&self) -> bool {
        self.count.is_empty()
    }

    /// Reassemble pixel `index`.
    pub fn get(&self, index: usize) -> Reservoir {
        Reservoir {
            direction: Vec3::from(self.direction[index]),
            radiance: Vec3::from(self.radiance[index]),
            pdf: self.pdf[index],
            weight: self.weight[index],
            weight_sum: self.weight_sum[index],
            count: self.count[index],
            light: LightKind::from_tag(self.light[index]),
        }
    }

    fn with_capacity(n: usize) -> Self {
        Self {
            direction: Vec::with_capacity(n),
            radiance: Vec::with_capacity(n),
            pdf: Vec::with_capacity(n),
            weight: Vec::with_capacity(n),
            weight_sum: Vec::with_capacity(n),
            count: Vec::with_capacity(n),
            light: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, r: &Reservoir) {
        self.direction.push(r.direction.into());
        self.radiance.push(r.radiance.into());
        self.pdf.push(r.pdf);
        self.weight.push(r.weight);
        self.weight_sum.push(r.weight_sum);
        self.count.push(r.count);
        self.light.push(r.light as u32);
    }
}

impl FromIterator<Reservoir> for ReservoirBuffer {
    fn from_iter<I: IntoIterator<Item = Reservoir>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut buffer = Self::with_capacity(iter.size_hint().0);
        for r in iter {
            buffer.push(&r);
        }
        buffer
    }
}

/// What a pixel saw in the frame that produced a history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRecord {
    /// Primary hit distance; `f32::INFINITY` on a miss.
    pub depth: f32,
    /// Primary hit normal.
    pub normal: Vec3,
    /// Primary hit instance; `u32::MAX` on a miss.
    pub instance: u32,
    /// Final reservoir.
    pub reservoir: Reservoir,
}

/// Everything the next frame needs to reuse this frame's reservoirs.
#[derive(Debug, Clone)]
pub struct FrameHistory {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frame index that produced this history.
    pub frame: u32,
    /// Camera the frame was rendered with.
    pub camera: Camera,
    /// Final per-pixel reservoirs.
    pub reservoirs: ReservoirBuffer,
    /// Primary hit distances.
    pub depth: Vec<f32>,
    /// Primary hit normals.
    pub normal: Vec<[f32; 3]>,
    /// Primary hit instance ids.
    pub instance: Vec<u32>,
}

impl FrameHistory {
    /// Assemble a history from per-pixel records in row-major order.
    pub fn new(width: u32, height: u32, frame: u32, camera: Camera, records: &[PixelRecord]) -> Self {
        Self {
            width,
            height,
            frame,
            camera,
            reservoirs: records.iter().map(|r| r.reservoir).collect(),
            depth: records.iter().map(|r| r.depth).collect(),
            normal: records.iter().map(|r| r.normal.into()).collect(),
            instance: records.iter().map(|r| r.instance).collect(),
        }
    }

    /// Row-major index of `(x, y)`.
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Whether a point seen now may reuse the reservoir stored at `index`:
    /// same instance, or a similar normal and a depth within 5% as seen
    /// from this history's camera.
    pub fn compatible(&self, index: usize, position: &Point3, normal: &Vec3, instance: u32) -> bool {
        let prev_instance = self.instance[index];
        if prev_instance == u32::MAX {
            return false;
        }
        if prev_instance == instance {
            return true;
        }
        let prev_normal = Vec3::from(self.normal[index]);
        if prev_normal.dot(normal) < NORMAL_THRESHOLD {
            return false;
        }
        let depth = (position - self.camera.origin).norm();
        ((self.depth[index] - depth).abs() / depth.max(1e-6)) < DEPTH_THRESHOLD
    }
}

/// Minimum normal agreement for reuse across instances.
pub const NORMAL_THRESHOLD: f32 = 0.85;

/// Maximum relative depth difference for reuse across instances.
pub const DEPTH_THRESHOLD: f32 = 0.05;
