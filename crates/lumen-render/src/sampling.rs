//! Direction sampling and specular scattering helpers.

use std::f32::consts::{FRAC_1_PI, PI};

use lumen_math::{orthonormal_basis, Vec3};

/// Floor applied to every pdf before it is divided by.
pub const PDF_EPSILON: f32 = 1e-6;

/// Cosine-weighted direction in the hemisphere around unit `n`.
pub fn cosine_hemisphere(n: &Vec3, u1: f32, u2: f32) -> Vec3 {
    let r = u1.sqrt();
    let phi = 2.0 * PI * u2;
    let (t, b) = orthonormal_basis(n);
    let z = (1.0 - u1).max(0.0).sqrt();
    (t * (r * phi.cos()) + b * (r * phi.sin()) + n * z).normalize()
}

/// Density of [`cosine_hemisphere`] for a direction at `cos_theta`.
#[inline]
pub fn cosine_hemisphere_pdf(cos_theta: f32) -> f32 {
    cos_theta.max(0.0) * FRAC_1_PI
}

/// Mirror `d` about `n`.
#[inline]
pub fn reflect(d: &Vec3, n: &Vec3) -> Vec3 {
    d - n * (2.0 * d.dot(n))
}

/// Refract unit `d` through a surface with unit normal `n` facing against
/// `d`, where `eta` is incident over transmitted index. `None` on total
/// internal reflection.
pub fn refract(d: &Vec3, n: &Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = -d.dot(n);
    let sin2_t = eta * eta * (1.0 - cos_i * cos_i).max(0.0);
    if sin2_t >= 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    Some((d * eta + n * (eta * cos_i - cos_t)).normalize())
}

/// Schlick's Fresnel reflectance between media `eta_i` and `eta_t`.
///
/// `cos_theta` is measured on the optically thinner side.
pub fn schlick(cos_theta: f32, eta_i: f32, eta_t: f32) -> f32 {
    let r0 = ((eta_i - eta_t) / (eta_i + eta_t)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cos_theta.clamp(0.0, 1.0)).powi(5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cosine_hemisphere_stays_above() {
        let n = Vec3::new(0.3, -0.8, 0.5).normalize();
        for i in 0..64 {
            for j in 0..8 {
                let d = cosine_hemisphere(&n, (i as f32 + 0.5) / 64.0, j as f32 / 8.0);
                assert_relative_eq!(d.norm(), 1.0, epsilon = 1e-5);
                assert!(d.dot(&n) >= -1e-6);
            }
        }
    }

    #[test]
    fn test_cosine_hemisphere_mean_cosine() {
        // E[cos] under a cosine-weighted density is 2/3.
        let n = Vec3::z();
        let mut sum = 0.0;
        let steps = 128;
        for i in 0..steps {
            for j in 0..steps {
                let d = cosine_hemisphere(&n, (i as f32 + 0.5) / steps as f32, (j as f32 + 0.5) / steps as f32);
                sum += d.z;
            }
        }
        assert_relative_eq!(sum / (steps * steps) as f32, 2.0 / 3.0, epsilon = 1e-3);
    }

    #[test]
    fn test_reflect() {
        let d = Vec3::new(1.0, -1.0, 0.0).normalize();
        let r = reflect(&d, &Vec3::y());
        assert_relative_eq!(r, Vec3::new(1.0, 1.0, 0.0).normalize(), epsilon = 1e-6);
    }

    #[test]
    fn test_refract_snell() {
        let d = Vec3::new(1.0, -1.0, 0.0).normalize();
        let t = refract(&d, &Vec3::y(), 1.0 / 1.5).unwrap();
        let sin_i = d.x;
        let sin_t = t.x;
        assert_relative_eq!(sin_i, 1.5 * sin_t, epsilon = 1e-5);
        assert!(t.y < 0.0);
    }

    #[test]
    fn test_total_internal_reflection() {
        let d = Vec3::new(1.0, -0.2, 0.0).normalize();
        assert!(refract(&d, &Vec3::y(), 1.5).is_none());
    }

    #[test]
    fn test_schlick_limits() {
        assert_relative_eq!(schlick(1.0, 1.0, 1.5), 0.04, epsilon = 1e-6);
        assert_relative_eq!(schlick(0.0, 1.0, 1.5), 1.0, epsilon = 1e-6);
    }
}
