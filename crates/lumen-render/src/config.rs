//! Render settings and the lighting environment.

use lumen_math::{Color, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};

/// Most neighbours spatial reuse may visit per pixel.
pub const MAX_SPATIAL_NEIGHBORS: u32 = 8;

/// How random streams are keyed across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedMode {
    /// Fresh randomness every frame.
    #[default]
    Frame,
    /// Same randomness every frame; distinct lock values give distinct
    /// streams.
    Locked(u32),
}

impl SeedMode {
    /// Frame term mixed into stream keys.
    pub fn frame_term(self, frame: u32) -> u32 {
        match self {
            SeedMode::Frame => frame,
            SeedMode::Locked(_) => 0,
        }
    }

    /// Lock value mixed into stream keys; zero when unlocked.
    pub fn lock(self) -> u32 {
        match self {
            SeedMode::Frame => 0,
            SeedMode::Locked(value) => value,
        }
    }
}

/// Renderer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Paths per pixel per frame.
    pub spp: u32,
    /// Maximum number of shaded vertices per path.
    pub max_depth: u32,
    /// Bounce index from which Russian roulette may end a path.
    pub rr_start_depth: u32,
    /// Enable Russian roulette.
    pub russian_roulette: bool,
    /// Cosine-hemisphere sky candidates per diffuse vertex.
    pub brdf_candidates: u32,
    /// Reuse the previous frame's reservoir at the reprojected pixel.
    pub temporal_reuse: bool,
    /// Reuse previous-frame reservoirs of neighbouring pixels.
    pub spatial_reuse: bool,
    /// Neighbours visited by spatial reuse.
    pub spatial_neighbors: u32,
    /// Largest multiplicity an imported reservoir may contribute.
    pub history_cap: u32,
    /// Random stream keying.
    pub seed: SeedMode,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            spp: 1,
            max_depth: 4,
            rr_start_depth: 3,
            russian_roulette: true,
            brdf_candidates: 4,
            temporal_reuse: true,
            spatial_reuse: true,
            spatial_neighbors: MAX_SPATIAL_NEIGHBORS,
            history_cap: 20,
            seed: SeedMode::Frame,
        }
    }
}

impl RenderConfig {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidSettings(
                "resolution must be non-zero".into(),
            ));
        }
        if self.spp == 0 {
            return Err(RenderError::InvalidSettings("spp must be at least 1".into()));
        }
        if self.max_depth == 0 {
            return Err(RenderError::InvalidSettings(
                "max_depth must be at least 1".into(),
            ));
        }
        if self.spatial_neighbors > MAX_SPATIAL_NEIGHBORS {
            return Err(RenderError::InvalidSettings(format!(
                "spatial_neighbors must be at most {MAX_SPATIAL_NEIGHBORS}"
            )));
        }
        if self.history_cap == 0 {
            return Err(RenderError::InvalidSettings(
                "history_cap must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Number of pixels in a frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Image aspect ratio, width over height.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Sky gradient plus one directional light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    /// Sky radiance straight up.
    pub zenith: [f32; 3],
    /// Sky radiance at the horizon.
    pub horizon: [f32; 3],
    /// Radiance from below the horizon.
    pub ground: [f32; 3],
    /// Direction toward the sun. Need not be normalized.
    pub sun_direction: [f32; 3],
    /// Irradiance delivered by the sun on a surface facing it.
    pub sun_irradiance: [f32; 3],
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            zenith: [0.35, 0.55, 0.95],
            horizon: [0.85, 0.9, 1.0],
            ground: [0.25, 0.22, 0.2],
            sun_direction: [0.4, 1.0, 0.3],
            sun_irradiance: [3.0, 2.8, 2.5],
        }
    }
}

impl Environment {
    /// The same radiance from every direction, with no sun.
    pub fn uniform(radiance: [f32; 3]) -> Self {
        Self {
            zenith: radiance,
            horizon: radiance,
            ground: radiance,
            sun_direction: [0.0, 1.0, 0.0],
            sun_irradiance: [0.0; 3],
        }
    }

    /// Sky radiance arriving from unit direction `dir`.
    pub fn sky(&self, dir: &Vec3) -> Color {
        let horizon = Color::from(self.horizon);
        if dir.y >= 0.0 {
            let t = dir.y.min(1.0).sqrt();
            horizon.lerp(&Color::from(self.zenith), t)
        } else {
            let t = (-dir.y * 4.0).min(1.0);
            horizon.lerp(&Color::from(self.ground), t)
        }
    }

    /// Unit direction toward the sun.
    pub fn sun_direction(&self) -> Vec3 {
        Vec3::from(self.sun_direction)
            .try_normalize(1e-12)
            .unwrap_or_else(Vec3::y)
    }

    /// Sun irradiance as a color.
    pub fn sun_irradiance(&self) -> Color {
        Color::from(self.sun_irradiance)
    }
}
