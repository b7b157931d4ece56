//! Bounded-depth path tracing from G-buffer vertices.
//!
//! Each path starts at the pixel's G-buffer vertex and loops: shade the
//! current vertex, stop once the next bounce would reach `max_depth`, apply
//! Russian roulette, trace the continuation ray, and end with a sky term on
//! a miss.
//!
//! Sky light reaching a diffuse vertex is already part of its direct
//! lighting estimate, so a diffuse bounce that escapes adds nothing. Misses
//! after a mirror or glass bounce still add the sky.

use lumen_math::{max_channel, Color, Point3, Vec3};
use lumen_raytrace::{Ray, Scene, Shading};

use crate::config::{Environment, RenderConfig};
use crate::gbuffer::GBufferPixel;
use crate::restir::{Reservoir, ReservoirResampler, Reuse, ShadingPoint};
use crate::rng::{salt, Rng};
use crate::sampling::{cosine_hemisphere, reflect, refract, schlick};
use crate::surface::{offset_origin, resolve};

/// Survival probability bounds for Russian roulette.
pub const ROULETTE_MIN: f32 = 0.05;
/// See [`ROULETTE_MIN`].
pub const ROULETTE_MAX: f32 = 0.98;

/// A path vertex ready to be shaded.
#[derive(Debug, Clone, Copy)]
struct Vertex {
    position: Point3,
    normal: Vec3,
    albedo: Color,
    shading: Shading,
    ior: f32,
    instance: u32,
    incoming: Vec3,
}

impl Vertex {
    fn from_gbuffer(g: &GBufferPixel) -> Self {
        let (shading, ior) = g.shading();
        Self {
            position: g.position,
            normal: g.normal,
            albedo: g.base_color,
            shading,
            ior,
            instance: g.instance,
            incoming: g.view_dir,
        }
    }
}

/// Result of shading one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSample {
    /// Mean radiance over all samples.
    pub radiance: Color,
    /// Reservoir from the primary vertex of sample 0; empty unless that
    /// vertex is diffuse, so it always describes the stored G-buffer point.
    pub reservoir: Reservoir,
}

/// Shades pixels from their G-buffer entries.
pub struct Integrator<'a> {
    scene: &'a Scene,
    config: &'a RenderConfig,
    environment: &'a Environment,
    resampler: ReservoirResampler<'a>,
}

impl<'a> Integrator<'a> {
    /// Integrator over `scene`.
    pub fn new(scene: &'a Scene, config: &'a RenderConfig, environment: &'a Environment) -> Self {
        Self {
            scene,
            config,
            environment,
            resampler: ReservoirResampler::new(scene, environment, config),
        }
    }

    /// Average `spp` paths through pixel `(x, y)`.
    ///
    /// `reuse` carries the previous frame's history; it is only consulted at
    /// the first diffuse vertex of each path.
    pub fn shade_pixel(&self, x: u32, y: u32, frame: u32, g: &GBufferPixel, reuse: Option<Reuse<'_>>) -> PixelSample {
        if !g.hit {
            return PixelSample {
                radiance: self.environment.sky(&g.view_dir),
                reservoir: Reservoir::default(),
            };
        }

        let primary_diffuse = g.shading().0 == Shading::Lambert;
        let mut sum = Color::zeros();
        let mut persistent = Reservoir::default();
        for sample in 0..self.config.spp {
            let (radiance, reservoir) = self.trace_path(x, y, frame, sample, g, reuse);
            sum += radiance;
            if sample == 0 && primary_diffuse {
                persistent = reservoir.unwrap_or_default();
            }
        }
        PixelSample {
            radiance: sum / self.config.spp as f32,
            reservoir: persistent,
        }
    }

    fn trace_path(
        &self,
        x: u32,
        y: u32,
        frame: u32,
        sample: u32,
        g: &GBufferPixel,
        reuse: Option<Reuse<'_>>,
    ) -> (Color, Option<Reservoir>) {
        let seed = self.config.seed;
        let mut rng = Rng::new(x, y, frame, sample, salt::PATH, seed);
        let mut light_rng = Rng::new(x, y, frame, sample, salt::RESERVOIR, seed);

        let mut vertex = Vertex::from_gbuffer(g);
        let mut throughput = Color::new(1.0, 1.0, 1.0);
        let mut radiance = Color::zeros();
        let mut first_reservoir: Option<Reservoir> = None;
        let mut depth = 0;
        let mut diffuse_bounce = false;

        loop {
            let next_dir = match vertex.shading {
                Shading::Mirror => {
                    throughput.component_mul_assign(&vertex.albedo);
                    diffuse_bounce = false;
                    reflect(&vertex.incoming, &vertex.normal)
                }
                Shading::Glass => {
                    let (dir, scale) = scatter_glass(&vertex, rng.next_f32());
                    throughput *= scale;
                    diffuse_bounce = false;
                    dir
                }
                Shading::Lambert => {
                    let point = ShadingPoint {
                        position: vertex.position,
                        normal: vertex.normal,
                        albedo: vertex.albedo,
                        instance: vertex.instance,
                    };
                    // Only the first diffuse vertex may touch the pixel's
                    // persistent reservoir.
                    let reuse = if first_reservoir.is_none() { reuse } else { None };
                    let (direct, reservoir) = self.resampler.sample_direct(&point, reuse, &mut light_rng);
                    radiance += throughput.component_mul(&direct);
                    if first_reservoir.is_none() {
                        first_reservoir = Some(reservoir);
                    }

                    // Cosine sampling cancels the BRDF cosine over pdf.
                    throughput.component_mul_assign(&vertex.albedo);
                    diffuse_bounce = true;
                    cosine_hemisphere(&vertex.normal, rng.next_f32(), rng.next_f32())
                }
            };

            depth += 1;
            if depth >= self.config.max_depth {
                break;
            }

            if self.config.russian_roulette && depth >= self.config.rr_start_depth {
                let survive = max_channel(&throughput).clamp(ROULETTE_MIN, ROULETTE_MAX);
                if rng.next_f32() >= survive {
                    break;
                }
                throughput /= survive;
            }

            let ray = Ray::new(offset_origin(&vertex.position, &vertex.normal, &next_dir), next_dir);
            let Some(hit) = self.scene.trace_closest(&ray, f32::INFINITY) else {
                if !diffuse_bounce {
                    radiance += throughput.component_mul(&self.environment.sky(&ray.direction));
                }
                break;
            };
            let surface = resolve(self.scene, &ray, &hit);
            vertex = Vertex {
                position: surface.position,
                normal: surface.normal,
                albedo: surface.base_color,
                shading: surface.shading,
                ior: surface.ior,
                instance: surface.instance,
                incoming: ray.direction,
            };
        }

        (radiance, first_reservoir)
    }
}

/// Choose reflection or refraction at a dielectric and return the new
/// direction with its throughput scale.
fn scatter_glass(vertex: &Vertex, u: f32) -> (Vec3, f32) {
    let d = vertex.incoming;
    let entering = d.dot(&vertex.normal) < 0.0;
    let (n, eta_i, eta_t) = if entering {
        (vertex.normal, 1.0, vertex.ior)
    } else {
        (-vertex.normal, vertex.ior, 1.0)
    };
    let eta = eta_i / eta_t;

    let Some(refracted) = refract(&d, &n, eta) else {
        return (reflect(&d, &n), 1.0);
    };
    let cos_i = -d.dot(&n);
    let cos_fresnel = if entering { cos_i } else { -refracted.dot(&n) };
    let fresnel = schlick(cos_fresnel, eta_i, eta_t);

    if u < fresnel {
        (reflect(&d, &n), 1.0)
    } else {
        (refracted, eta * eta)
    }
}
