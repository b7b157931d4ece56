//! Spatiotemporal reservoir resampling for direct lighting.
//!
//! Candidates are merged in a fixed order: `K` cosine-hemisphere sky
//! samples, one sun sample, the previous frame's reservoir at the
//! reprojected pixel, then previous-frame reservoirs of up to eight
//! neighbours. A single shadow ray is traced for whichever sample survives.

use std::f32::consts::FRAC_1_PI;

use lumen_math::{luminance, Color, Point3, Vec3};
use lumen_raytrace::{Ray, Scene};

use super::history::FrameHistory;
use super::reservoir::{LightKind, LightSample, Reservoir};
use crate::config::{Environment, RenderConfig};
use crate::rng::{hash2, salt, Rng};
use crate::sampling::{cosine_hemisphere, cosine_hemisphere_pdf, PDF_EPSILON};
use crate::surface::offset_origin;

/// Neighbour offsets at radius 1, rotated and scaled per pixel.
const RING: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Spatial reuse offsets for a pixel: the ring rotated by one of four
/// quarter turns and scaled to radius 1 or 2, both picked by hashing
/// `(pixel_index, frame)`.
pub fn spatial_offsets(pixel_index: u32, frame: u32) -> impl Iterator<Item = (i32, i32)> {
    let h = hash2(pixel_index ^ salt::SPATIAL, frame);
    let quarter_turns = h & 3;
    let radius = 1 + ((h >> 2) & 1) as i32;
    RING.iter().map(move |&(dx, dy)| {
        let (rx, ry) = match quarter_turns {
            0 => (dx, dy),
            1 => (-dy, dx),
            2 => (-dx, -dy),
            _ => (dy, -dx),
        };
        (rx * radius, ry * radius)
    })
}

/// A diffuse point awaiting direct lighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingPoint {
    /// World position.
    pub position: Point3,
    /// Unit shading normal.
    pub normal: Vec3,
    /// Diffuse albedo.
    pub albedo: Color,
    /// Instance id, for the reuse compatibility test.
    pub instance: u32,
}

impl ShadingPoint {
    /// Lambertian BRDF times cosine for light arriving from `dir`.
    #[inline]
    pub fn brdf_cos(&self, dir: &Vec3) -> Color {
        let cos = self.normal.dot(dir);
        if cos <= 0.0 {
            return Color::zeros();
        }
        self.albedo * (FRAC_1_PI * cos)
    }

    /// Target function: luminance of the unshadowed contribution.
    #[inline]
    pub fn target(&self, dir: &Vec3, radiance: &Color) -> f32 {
        luminance(&self.brdf_cos(dir).component_mul(radiance))
    }
}

/// Which previous-frame reservoirs a resampling pass may read.
#[derive(Debug, Clone, Copy)]
pub struct Reuse<'a> {
    /// Finished history of the previous frame.
    pub history: &'a FrameHistory,
    /// Pixel being shaded.
    pub pixel: (u32, u32),
    /// Frame term for the spatial pattern hash.
    pub frame: u32,
}

/// Direct lighting through weighted reservoir resampling.
pub struct ReservoirResampler<'a> {
    scene: &'a Scene,
    environment: &'a Environment,
    config: &'a RenderConfig,
}

impl<'a> ReservoirResampler<'a> {
    /// Resampler over `scene` lit by `environment`.
    pub fn new(scene: &'a Scene, environment: &'a Environment, config: &'a RenderConfig) -> Self {
        Self {
            scene,
            environment,
            config,
        }
    }

    /// Build a reservoir for `point` and return its shadowed contribution
    /// along with the reservoir.
    ///
    /// With `reuse` set, temporal and spatial candidates from the previous
    /// frame are merged as enabled in the config.
    pub fn sample_direct(&self, point: &ShadingPoint, reuse: Option<Reuse<'_>>, rng: &mut Rng) -> (Color, Reservoir) {
        let mut reservoir = Reservoir::default();
        self.add_fresh_candidates(&mut reservoir, point, rng);

        if let Some(reuse) = reuse {
            if self.config.temporal_reuse {
                self.add_temporal(&mut reservoir, point, &reuse, rng);
            }
            if self.config.spatial_reuse {
                self.add_spatial(&mut reservoir, point, &reuse, rng);
            }
        }

        (self.shade(&reservoir, point), reservoir)
    }

    fn add_fresh_candidates(&self, reservoir: &mut Reservoir, point: &ShadingPoint, rng: &mut Rng) {
        let k = self.config.brdf_candidates;
        let mixture = k as f32 / (k + 1) as f32;

        for _ in 0..k {
            let dir = cosine_hemisphere(&point.normal, rng.next_f32(), rng.next_f32());
            let sample = LightSample {
                direction: dir,
                radiance: self.environment.sky(&dir),
                pdf: (cosine_hemisphere_pdf(point.normal.dot(&dir)) * mixture).max(PDF_EPSILON),
                light: LightKind::Sky,
            };
            let weight = point.target(&sample.direction, &sample.radiance) / sample.pdf;
            reservoir.update(&sample, weight, 1, rng.next_f32());
        }

        let sun = LightSample {
            direction: self.environment.sun_direction(),
            radiance: self.environment.sun_irradiance(),
            pdf: 1.0 / (k + 1) as f32,
            light: LightKind::Sun,
        };
        let weight = point.target(&sun.direction, &sun.radiance) / sun.pdf;
        reservoir.update(&sun, weight, 1, rng.next_f32());
    }

    /// Merge a previous reservoir, re-targeted at `point`, with its
    /// multiplicity capped at `history_cap`.
    fn import(&self, reservoir: &mut Reservoir, point: &ShadingPoint, prev: &Reservoir, u: f32) {
        if prev.is_empty() {
            return;
        }
        let count = prev.count.min(self.config.history_cap);
        let p_hat = point.target(&prev.direction, &prev.radiance);
        let weight = p_hat * (prev.ucw() / prev.pdf.max(PDF_EPSILON)) * count as f32;
        let pdf = if weight > 0.0 {
            (p_hat / weight).max(PDF_EPSILON)
        } else {
            prev.pdf
        };
        let sample = LightSample { pdf, ..prev.sample() };
        reservoir.update(&sample, weight, count, u);
    }

    fn add_temporal(&self, reservoir: &mut Reservoir, point: &ShadingPoint, reuse: &Reuse<'_>, rng: &mut Rng) {
        let history = reuse.history;
        let Some((px, py)) = history
            .camera
            .project_to_pixel(&point.position, history.width, history.height)
        else {
            return;
        };
        let index = history.index(px, py);
        if history.compatible(index, &point.position, &point.normal, point.instance) {
            let prev = history.reservoirs.get(index);
            self.import(reservoir, point, &prev, rng.next_f32());
        }
    }

    fn add_spatial(&self, reservoir: &mut Reservoir, point: &ShadingPoint, reuse: &Reuse<'_>, rng: &mut Rng) {
        let history = reuse.history;
        let (x, y) = reuse.pixel;
        let pixel_index = y * history.width + x;
        let offsets = spatial_offsets(pixel_index, reuse.frame).take(self.config.spatial_neighbors as usize);
        for (dx, dy) in offsets {
            let nx = x as i64 + dx as i64;
            let ny = y as i64 + dy as i64;
            if nx < 0 || ny < 0 || nx >= history.width as i64 || ny >= history.height as i64 {
                continue;
            }
            let index = history.index(nx as u32, ny as u32);
            if history.compatible(index, &point.position, &point.normal, point.instance) {
                let prev = history.reservoirs.get(index);
                self.import(reservoir, point, &prev, rng.next_f32());
            }
        }
    }

    /// Contribution of the selected sample: one visibility ray, then
    /// `brdf_cos * radiance / pdf * ucw`.
    pub fn shade(&self, reservoir: &Reservoir, point: &ShadingPoint) -> Color {
        if reservoir.is_empty() {
            return Color::zeros();
        }
        let dir = reservoir.direction;
        let f = point.brdf_cos(&dir);
        if f == Color::zeros() {
            return Color::zeros();
        }
        let shadow = Ray::new(offset_origin(&point.position, &point.normal, &dir), dir);
        if self.scene.occluded(&shadow, f32::INFINITY) {
            return Color::zeros();
        }
        f.component_mul(&reservoir.radiance) * (reservoir.ucw() / reservoir.pdf.max(PDF_EPSILON))
    }
}
