//! Single-pass weighted reservoir.

use lumen_math::{Color, Vec3};

use crate::sampling::PDF_EPSILON;

/// Which light a reservoir sample points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum LightKind {
    /// Environment radiance along a sampled direction.
    #[default]
    Sky = 0,
    /// The directional sun.
    Sun = 1,
}

impl LightKind {
    /// Inverse of `as u32`. Unknown tags read as [`LightKind::Sky`].
    pub fn from_tag(tag: u32) -> Self {
        if tag == LightKind::Sun as u32 {
            LightKind::Sun
        } else {
            LightKind::Sky
        }
    }
}

/// A light sample offered to a reservoir.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSample {
    /// Unit direction toward the light.
    pub direction: Vec3,
    /// Radiance (sky) or irradiance (sun) along `direction`.
    pub radiance: Color,
    /// Density the sample was selected with.
    pub pdf: f32,
    /// Light kind.
    pub light: LightKind,
}

/// Weighted reservoir holding one selected light sample.
///
/// For every accepted candidate `weight * pdf` equals its target value at
/// the shading point, so [`Reservoir::ucw`] turns the stored sample into an
/// unbiased estimate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Reservoir {
    /// Selected direction.
    pub direction: Vec3,
    /// Radiance of the selected sample.
    pub radiance: Color,
    /// Selection pdf of the selected sample.
    pub pdf: f32,
    /// Resampling weight the selected sample was accepted with.
    pub weight: f32,
    /// Sum of all candidate weights seen.
    pub weight_sum: f32,
    /// Number of candidates represented.
    pub count: u32,
    /// Light kind of the selected sample.
    pub light: LightKind,
}

impl Reservoir {
    /// Offer `sample` with resampling weight `weight`, standing for `count`
    /// candidates. `u` is uniform in `[0, 1)`.
    ///
    /// The weight sum and count always grow; the sample replaces the current
    /// selection iff `u < weight / weight_sum`. Negative or non-finite
    /// weights count as zero and are never selected.
    pub fn update(&mut self, sample: &LightSample, weight: f32, count: u32, u: f32) -> bool {
        let weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
        self.weight_sum += weight;
        self.count += count;
        if weight > 0.0 && u < weight / self.weight_sum {
            self.direction = sample.direction;
            self.radiance = sample.radiance;
            self.pdf = sample.pdf;
            self.light = sample.light;
            self.weight = weight;
            true
        } else {
            false
        }
    }

    /// True when this reservoir holds nothing usable.
    pub fn is_empty(&self) -> bool {
        self.count == 0 || self.weight_sum <= 0.0 || self.weight <= 0.0
    }

    /// Unbiased contribution weight: `weight_sum / (count * weight)`.
    pub fn ucw(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        self.weight_sum / (self.count as f32 * self.weight.max(PDF_EPSILON))
    }

    /// The selected sample.
    pub fn sample(&self) -> LightSample {
        LightSample {
            direction: self.direction,
            radiance: self.radiance,
            pdf: self.pdf,
            light: self.light,
        }
    }
}
