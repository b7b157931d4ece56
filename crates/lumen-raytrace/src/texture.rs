//! Texture atlas and alpha-cutout tests.
//!
//! All textures live in one flat RGBA texel array, addressed through a
//! small per-texture view. Coordinates wrap in both directions.

use bytemuck::{Pod, Zeroable};
use lumen_math::Vec2;

use crate::error::{AccelError, Result};

/// Half-width of the band around the alpha cutoff where the fast test
/// falls back to bilinear filtering.
pub const ALPHA_BAND: f32 = 0.1;

/// Location of one texture inside the atlas.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct TextureView {
    /// First texel in [`TextureAtlas::texels`].
    pub offset: u32,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Padding to 16 bytes.
    pub _pad: u32,
}

/// Every texture in the scene, packed end to end.
#[derive(Debug, Clone, Default)]
pub struct TextureAtlas {
    /// Linear RGBA texels, row-major per texture.
    pub texels: Vec<[f32; 4]>,
    /// One view per texture id.
    pub views: Vec<TextureView>,
}

impl TextureAtlas {
    /// Append a texture and return its id.
    pub fn push(&mut self, width: u32, height: u32, texels: &[[f32; 4]]) -> Result<u32> {
        if width == 0 || height == 0 || texels.len() != (width as usize) * (height as usize) {
            return Err(AccelError::TextureSize {
                width,
                height,
                texels: texels.len(),
            });
        }
        let id = self.views.len() as u32;
        self.views.push(TextureView {
            offset: self.texels.len() as u32,
            width,
            height,
            _pad: 0,
        });
        self.texels.extend_from_slice(texels);
        Ok(id)
    }

    /// Number of textures.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// True if no texture has been added.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    fn fetch(&self, view: &TextureView, x: i64, y: i64) -> [f32; 4] {
        let x = x.rem_euclid(view.width as i64) as usize;
        let y = y.rem_euclid(view.height as i64) as usize;
        self.texels[view.offset as usize + y * view.width as usize + x]
    }

    /// Nearest-texel lookup.
    pub fn sample_nearest(&self, texture: u32, uv: &Vec2) -> [f32; 4] {
        let view = &self.views[texture as usize];
        let x = (uv.x * view.width as f32).floor() as i64;
        let y = (uv.y * view.height as f32).floor() as i64;
        self.fetch(view, x, y)
    }

    /// Bilinearly filtered lookup with texel centres at half-integers.
    pub fn sample_bilinear(&self, texture: u32, uv: &Vec2) -> [f32; 4] {
        let view = &self.views[texture as usize];
        let fx = uv.x * view.width as f32 - 0.5;
        let fy = uv.y * view.height as f32 - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let t00 = self.fetch(view, x0, y0);
        let t10 = self.fetch(view, x0 + 1, y0);
        let t01 = self.fetch(view, x0, y0 + 1);
        let t11 = self.fetch(view, x0 + 1, y0 + 1);

        let mut out = [0.0; 4];
        for c in 0..4 {
            let top = t00[c] + (t10[c] - t00[c]) * tx;
            let bottom = t01[c] + (t11[c] - t01[c]) * tx;
            out[c] = top + (bottom - top) * ty;
        }
        out
    }

    /// Exact cutout test: bilinear alpha against `cutoff`.
    ///
    /// Used for closest hits, where the surface that is kept gets shaded.
    pub fn alpha_opaque(&self, texture: u32, uv: &Vec2, cutoff: f32) -> bool {
        self.sample_bilinear(texture, uv)[3] >= cutoff
    }

    /// Two-tier cutout test for occlusion rays.
    ///
    /// The nearest texel decides when its alpha is more than [`ALPHA_BAND`]
    /// away from `cutoff`; otherwise the bilinear result decides. Where
    /// neighbouring texels differ by less than the band the result equals
    /// [`alpha_opaque`](Self::alpha_opaque); across sharper edges the two
    /// may disagree within half a texel of the edge.
    pub fn alpha_opaque_fast(&self, texture: u32, uv: &Vec2, cutoff: f32) -> bool {
        let nearest = self.sample_nearest(texture, uv)[3];
        if (nearest - cutoff).abs() > ALPHA_BAND {
            return nearest >= cutoff;
        }
        self.alpha_opaque(texture, uv, cutoff)
    }
}
