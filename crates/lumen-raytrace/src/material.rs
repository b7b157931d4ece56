//! Surface materials referenced by primitives and instances.

use lumen_math::Color;

/// How a surface scatters light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u16)]
pub enum Shading {
    /// Diffuse reflection, lit through the reservoir resampler.
    #[default]
    Lambert = 0,
    /// Perfect specular reflection tinted by the base color.
    Mirror = 1,
    /// Dielectric with Fresnel-weighted reflection and refraction.
    Glass = 2,
}

impl Shading {
    /// Numeric tag stored in packed material words.
    pub fn tag(self) -> u16 {
        self as u16
    }

    /// Inverse of [`Shading::tag`]. Unknown tags return `None`.
    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            0 => Some(Shading::Lambert),
            1 => Some(Shading::Mirror),
            2 => Some(Shading::Glass),
            _ => None,
        }
    }
}

/// A surface material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Linear base color, used when there is no diffuse texture.
    pub base_color: Color,
    /// Texture atlas entry for albedo.
    pub diffuse_texture: Option<u32>,
    /// Texture atlas entry whose alpha channel cuts the surface out.
    pub alpha_mask: Option<u32>,
    /// Texels with alpha at or above this are opaque.
    pub alpha_cutoff: f32,
    /// Scattering model.
    pub shading: Shading,
    /// Index of refraction, used by [`Shading::Glass`].
    pub ior: f32,
    /// Flip the shading normal toward the viewer on back-face hits.
    pub two_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: Color::new(0.8, 0.8, 0.8),
            diffuse_texture: None,
            alpha_mask: None,
            alpha_cutoff: 0.5,
            shading: Shading::Lambert,
            ior: 1.5,
            two_sided: false,
        }
    }
}

impl Material {
    /// Diffuse material of the given color.
    pub fn lambert(base_color: Color) -> Self {
        Self {
            base_color,
            ..Self::default()
        }
    }

    /// Mirror tinted by `base_color`.
    pub fn mirror(base_color: Color) -> Self {
        Self {
            base_color,
            shading: Shading::Mirror,
            ..Self::default()
        }
    }

    /// Clear glass with index of refraction `ior`.
    pub fn glass(ior: f32) -> Self {
        Self {
            base_color: Color::new(1.0, 1.0, 1.0),
            shading: Shading::Glass,
            ior,
            ..Self::default()
        }
    }

    /// Use atlas entry `texture` for albedo.
    pub fn with_texture(mut self, texture: u32) -> Self {
        self.diffuse_texture = Some(texture);
        self
    }

    /// Cut the surface out where atlas entry `texture` has alpha below
    /// `cutoff`.
    pub fn with_alpha_mask(mut self, texture: u32, cutoff: f32) -> Self {
        self.alpha_mask = Some(texture);
        self.alpha_cutoff = cutoff;
        self
    }

    /// Mark the material two-sided.
    pub fn two_sided(mut self) -> Self {
        self.two_sided = true;
        self
    }

    /// Texture ids this material references.
    pub(crate) fn textures(&self) -> impl Iterator<Item = u32> {
        self.diffuse_texture.into_iter().chain(self.alpha_mask)
    }
}
