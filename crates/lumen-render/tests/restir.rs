//! Reservoir algebra and temporal reuse over whole frames.

use std::f32::consts::FRAC_1_PI;
use std::sync::Arc;

use approx::assert_relative_eq;
use lumen_math::{Color, Point3, Transform, Vec3};
use lumen_raytrace::{Material, Scene, SceneBuilder};
use lumen_render::restir::{LightKind, LightSample, Reservoir, ReservoirResampler, ShadingPoint};
use lumen_render::{Camera, Environment, RenderConfig, Renderer};

/// Plain sequential weighted reservoir sampling, kept apart from
/// [`Reservoir`] to check it against.
struct Reference {
    selected: Option<usize>,
    weight_sum: f64,
    count: u32,
}

impl Reference {
    fn run(weights: &[f32], draws: &[f32]) -> Self {
        let mut r = Reference {
            selected: None,
            weight_sum: 0.0,
            count: 0,
        };
        for (i, (&w, &u)) in weights.iter().zip(draws).enumerate() {
            let w = if w.is_finite() && w > 0.0 { w as f64 } else { 0.0 };
            r.weight_sum += w;
            r.count += 1;
            if w > 0.0 && (u as f64) * r.weight_sum < w {
                r.selected = Some(i);
            }
        }
        r
    }
}

fn candidate(i: usize) -> LightSample {
    let phi = i as f32 * 0.7;
    LightSample {
        direction: Vec3::new(phi.cos(), 1.0, phi.sin()).normalize(),
        radiance: Color::new(1.0, 0.5, 0.25),
        pdf: 0.1 + 0.05 * (i % 7) as f32,
        light: if i % 5 == 0 { LightKind::Sun } else { LightKind::Sky },
    }
}

#[test]
fn reservoir_matches_reference_stream() {
    // Scripted weights, including zeros and invalid values that must count
    // toward M but never be selected.
    let weights = [
        0.0, 1.5, 0.25, 3.0, -1.0, 0.75, 0.0, 2.0, f32::NAN, 0.5, 4.0, 0.125, 1.0, 0.0, 2.5, 0.3,
    ];
    // Draws kept away from acceptance boundaries.
    let draws = [
        0.9, 0.31, 0.62, 0.07, 0.5, 0.83, 0.2, 0.44, 0.11, 0.97, 0.28, 0.72, 0.05, 0.66, 0.39, 0.58,
    ];

    let mut reservoir = Reservoir::default();
    for (i, (&w, &u)) in weights.iter().zip(&draws).enumerate() {
        reservoir.update(&candidate(i), w, 1, u);
    }
    let reference = Reference::run(&weights, &draws);

    let selected = reference.selected.unwrap();
    assert_eq!(reservoir.count, reference.count);
    assert_eq!(reservoir.direction, candidate(selected).direction);
    assert_eq!(reservoir.light, candidate(selected).light);
    assert_eq!(reservoir.weight, weights[selected]);
    assert_relative_eq!(reservoir.weight_sum as f64, reference.weight_sum, epsilon = 1e-5);
}

#[test]
fn reservoir_selection_frequency_follows_weights() {
    // Over many scripted streams, each candidate is kept with probability
    // proportional to its weight.
    let weights = [1.0, 3.0, 0.0, 4.0];
    let mut hits = [0u32; 4];
    let trials = 4000;
    let mut state = 0x1234_5678u32;
    let mut next = || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        (state >> 8) as f32 / (1u32 << 24) as f32
    };
    for _ in 0..trials {
        let mut r = Reservoir::default();
        for (i, &w) in weights.iter().enumerate() {
            r.update(&candidate(i), w, 1, next());
        }
        let i = (0..4).find(|&i| candidate(i).direction == r.direction).unwrap();
        hits[i] += 1;
    }
    assert_eq!(hits[2], 0);
    for (i, &w) in weights.iter().enumerate() {
        let expected = w / 8.0;
        let observed = hits[i] as f32 / trials as f32;
        assert!((observed - expected).abs() < 0.03, "candidate {i}: {observed} vs {expected}");
    }
}

fn floor_scene(size: f32) -> Scene {
    let mut b = SceneBuilder::new();
    let mat = b.add_material(Material::lambert(Color::new(0.6, 0.6, 0.6)));
    let positions = [
        Point3::new(-size, 0.0, -size),
        Point3::new(size, 0.0, -size),
        Point3::new(size, 0.0, size),
        Point3::new(-size, 0.0, size),
    ];
    let mesh = b
        .add_triangle_mesh(&positions, None, &[[0, 2, 1], [0, 3, 2]])
        .unwrap();
    b.add_instance(mesh, Transform::identity(), mat);
    b.build().unwrap()
}

#[test]
fn single_candidate_is_plain_monte_carlo() {
    let scene = floor_scene(10.0);
    let env = Environment::default();
    let config = RenderConfig::default();
    let resampler = ReservoirResampler::new(&scene, &env, &config);
    let point = ShadingPoint {
        position: Point3::origin(),
        normal: Vec3::y(),
        albedo: Color::new(0.6, 0.6, 0.6),
        instance: 0,
    };

    let dir = Vec3::new(0.3, 0.8, -0.2).normalize();
    let sample = LightSample {
        direction: dir,
        radiance: env.sky(&dir),
        pdf: 0.37,
        light: LightKind::Sky,
    };
    let mut reservoir = Reservoir::default();
    reservoir.update(&sample, point.target(&dir, &sample.radiance) / sample.pdf, 1, 0.5);

    let expected = point.brdf_cos(&dir).component_mul(&sample.radiance) / sample.pdf;
    let shaded = resampler.shade(&reservoir, &point);
    assert_relative_eq!(shaded, expected, epsilon = 1e-5);
}

fn top_down_camera() -> Camera {
    Camera::look_at(Point3::new(0.0, 5.0, 0.0), Point3::origin(), -Vec3::z(), 40.0, 1.0)
}

fn quad_config() -> RenderConfig {
    RenderConfig {
        width: 16,
        height: 16,
        max_depth: 1,
        temporal_reuse: true,
        spatial_reuse: false,
        ..RenderConfig::default()
    }
}

#[test]
fn temporal_reuse_grows_weight_sum_under_sun() {
    let scene = Arc::new(floor_scene(10.0));
    let env = Environment {
        sun_direction: [0.0, 1.0, 0.0],
        sun_irradiance: [2.0, 2.0, 2.0],
        ..Environment::uniform([0.0; 3])
    };
    let config = quad_config();
    let fresh = config.brdf_candidates + 1;
    let cap = config.history_cap;
    let mut renderer = Renderer::new(scene, config, env).unwrap();
    let camera = top_down_camera();
    let exact = 0.6 * FRAC_1_PI * 2.0;

    let mut last_sum = vec![0.0f32; 256];
    for frame in 0..50u32 {
        let out = renderer.render_frame(&camera).unwrap();
        let reservoirs = renderer.reservoirs().unwrap();
        let expected_count = fresh + (frame * fresh).min(cap);
        for i in 0..256 {
            let r = reservoirs.get(i);
            assert_eq!(r.count, expected_count, "frame {frame} pixel {i}");
            assert!(r.weight_sum >= last_sum[i] * (1.0 - 1e-5), "frame {frame} pixel {i}");
            last_sum[i] = r.weight_sum;
            assert_relative_eq!(out.radiance[i][0], exact, epsilon = 1e-4);
        }
    }
}

fn mean_and_variance(values: impl Iterator<Item = f32>) -> (f32, f32) {
    let values: Vec<f32> = values.collect();
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    (mean, var)
}

#[test]
fn temporal_reuse_reduces_noise_under_sky() {
    let scene = Arc::new(floor_scene(10.0));
    let env = Environment {
        sun_irradiance: [0.0; 3],
        ..Environment::default()
    };
    let mut renderer = Renderer::new(scene, quad_config(), env).unwrap();
    let camera = top_down_camera();

    let first = renderer.render_frame(&camera).unwrap();
    let (mean0, var0) = mean_and_variance(first.radiance.iter().map(|c| c[1]));
    assert!(var0 > 0.0);

    let mut last = var0;
    for frame in 1..50 {
        let out = renderer.render_frame(&camera).unwrap();
        let (mean, var) = mean_and_variance(out.radiance.iter().map(|c| c[1]));
        assert!(var <= var0 * 1.1, "frame {frame}: {var} vs {var0}");
        assert!((mean - mean0).abs() < 0.1 * mean0, "frame {frame}: {mean} vs {mean0}");
        last = var;
    }
    assert!(last < var0 * 0.5, "{last} vs {var0}");
}
