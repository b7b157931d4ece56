//! Built-in procedural scenes.

use clap::ValueEnum;
use lumen_math::{Color, Point3, Transform, Vec2, Vec3};
use lumen_raytrace::{Material, MeshId, Result, Scene, SceneBuilder, Sphere};

/// Scenes the CLI can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SceneKind {
    /// Open-top box with coloured walls, a mirror ball and a glass ball
    Cornell,
    /// Mixed-material spheres on a checkered floor behind a cutout fence
    Spheres,
    /// One diffuse quad seen from above
    Quad,
}

/// Where the default camera sits for a scene.
#[derive(Debug, Clone, Copy)]
pub struct View {
    pub from: Point3,
    pub at: Point3,
    pub vfov_deg: f32,
}

pub fn build(kind: SceneKind) -> Result<(Scene, View)> {
    match kind {
        SceneKind::Cornell => cornell(),
        SceneKind::Spheres => spheres(),
        SceneKind::Quad => quad_only(),
    }
}

/// Two triangles spanning `corners`, given counter-clockwise as seen from
/// the front.
fn quad(b: &mut SceneBuilder, corners: [Point3; 4], uvs: Option<[Vec2; 4]>) -> Result<MeshId> {
    b.add_triangle_mesh(&corners, uvs.as_ref().map(|uv| &uv[..]), &[[0, 1, 2], [0, 2, 3]])
}

fn cornell() -> Result<(Scene, View)> {
    let mut b = SceneBuilder::new();
    let white = b.add_material(Material::lambert(Color::new(0.73, 0.73, 0.73)).two_sided());
    let red = b.add_material(Material::lambert(Color::new(0.65, 0.05, 0.05)).two_sided());
    let green = b.add_material(Material::lambert(Color::new(0.12, 0.45, 0.15)).two_sided());
    let mirror = b.add_material(Material::mirror(Color::new(0.95, 0.95, 0.95)));
    let glass = b.add_material(Material::glass(1.5));

    // Unit wall in the XY plane, facing +Z; placed by instance transforms.
    let wall = quad(
        &mut b,
        [
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(-1.0, 1.0, 0.0),
        ],
        None,
    )?;
    let half_pi = std::f32::consts::FRAC_PI_2;
    let up = Vec3::y();
    let across = Vec3::x();

    // Floor, back, left, right. No ceiling so sun and sky reach inside.
    let floor = Transform::rotation_about_axis(&across, -half_pi)
        .then(&Transform::uniform_scale(2.0));
    b.add_instance(wall, floor, white);
    let back = Transform::translation(0.0, 2.0, -2.0).then(&Transform::uniform_scale(2.0));
    b.add_instance(wall, back, white);
    let left = Transform::translation(-2.0, 2.0, 0.0)
        .then(&Transform::rotation_about_axis(&up, half_pi))
        .then(&Transform::uniform_scale(2.0));
    b.add_instance(wall, left, red);
    let right = Transform::translation(2.0, 2.0, 0.0)
        .then(&Transform::rotation_about_axis(&up, -half_pi))
        .then(&Transform::uniform_scale(2.0));
    b.add_instance(wall, right, green);

    let balls = b.add_spheres([
        Sphere::new(Point3::new(-0.8, 0.6, -0.6), 0.6, mirror),
        Sphere::new(Point3::new(0.8, 0.5, 0.4), 0.5, glass),
    ]);
    b.add_instance(balls, Transform::identity(), mirror);

    let view = View {
        from: Point3::new(0.0, 2.0, 7.0),
        at: Point3::new(0.0, 1.6, 0.0),
        vfov_deg: 40.0,
    };
    Ok((b.build()?, view))
}

fn checker(size: u32, a: [f32; 4], b: [f32; 4]) -> Vec<[f32; 4]> {
    (0..size * size)
        .map(|i| if (i % size + i / size) % 2 == 0 { a } else { b })
        .collect()
}

fn spheres() -> Result<(Scene, View)> {
    let mut b = SceneBuilder::new();

    let checks = b.add_texture(8, 8, &checker(8, [0.9, 0.9, 0.9, 1.0], [0.2, 0.2, 0.25, 1.0]))?;
    let floor_mat = b.add_material(Material::lambert(Color::new(1.0, 1.0, 1.0)).with_texture(checks));
    let floor = quad(
        &mut b,
        [
            Point3::new(-12.0, 0.0, 12.0),
            Point3::new(12.0, 0.0, 12.0),
            Point3::new(12.0, 0.0, -12.0),
            Point3::new(-12.0, 0.0, -12.0),
        ],
        Some([
            Vec2::new(0.0, 0.0),
            Vec2::new(3.0, 0.0),
            Vec2::new(3.0, 3.0),
            Vec2::new(0.0, 3.0),
        ]),
    )?;
    b.add_instance(floor, Transform::identity(), floor_mat);

    // Fence with every other slat cut out.
    let slats = b.add_texture(
        8,
        1,
        &checker(8, [0.55, 0.35, 0.2, 1.0], [0.0, 0.0, 0.0, 0.0])[..8],
    )?;
    let fence_mat = b.add_material(
        Material::lambert(Color::new(1.0, 1.0, 1.0))
            .with_texture(slats)
            .with_alpha_mask(slats, 0.5)
            .two_sided(),
    );
    let fence = quad(
        &mut b,
        [
            Point3::new(-4.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(4.0, 1.2, 0.0),
            Point3::new(-4.0, 1.2, 0.0),
        ],
        Some([
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ]),
    )?;
    b.add_instance(fence, Transform::translation(0.0, 0.0, 2.0), fence_mat);

    let materials = [
        b.add_material(Material::lambert(Color::new(0.8, 0.25, 0.2))),
        b.add_material(Material::mirror(Color::new(0.9, 0.85, 0.7))),
        b.add_material(Material::glass(1.5)),
        b.add_material(Material::lambert(Color::new(0.2, 0.4, 0.8))),
    ];
    let row: Vec<Sphere> = (0..4)
        .map(|i| Sphere::new(Point3::new(i as f32 * 2.4 - 3.6, 0.0, 0.0), 1.0, materials[i]))
        .collect();
    let row = b.add_spheres(row);
    // One mesh, two placements: the back row is a scaled copy.
    b.add_instance(row, Transform::translation(0.0, 1.0, -1.0), materials[0]);
    b.add_instance(
        row,
        Transform::translation(0.0, 0.5, -4.0).then(&Transform::uniform_scale(0.5)),
        materials[0],
    );

    let view = View {
        from: Point3::new(0.0, 3.0, 9.0),
        at: Point3::new(0.0, 0.8, -1.5),
        vfov_deg: 45.0,
    };
    Ok((b.build()?, view))
}

fn quad_only() -> Result<(Scene, View)> {
    let mut b = SceneBuilder::new();
    let grey = b.add_material(Material::lambert(Color::new(0.6, 0.6, 0.6)));
    let mesh = quad(
        &mut b,
        [
            Point3::new(-2.0, 0.0, 2.0),
            Point3::new(2.0, 0.0, 2.0),
            Point3::new(2.0, 0.0, -2.0),
            Point3::new(-2.0, 0.0, -2.0),
        ],
        None,
    )?;
    b.add_instance(mesh, Transform::identity(), grey);
    let view = View {
        from: Point3::new(0.0, 4.0, 4.0),
        at: Point3::origin(),
        vfov_deg: 45.0,
    };
    Ok((b.build()?, view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_math::Aabb;

    #[test]
    fn test_all_scenes_build() {
        for kind in [SceneKind::Cornell, SceneKind::Spheres, SceneKind::Quad] {
            let (scene, view) = build(kind).unwrap();
            assert!(!scene.instances.is_empty());
            let bounds = scene.bounds();
            let at = Aabb::new(view.at, view.at);
            assert!(bounds.contains(&at), "{kind:?}");
        }
    }

    #[test]
    fn test_cornell_walls_enclose_the_balls() {
        let (scene, _) = build(SceneKind::Cornell).unwrap();
        let bounds = scene.bounds();
        assert!(bounds.min.x <= -2.0 + 1e-4 && bounds.max.x >= 2.0 - 1e-4);
        assert!(bounds.min.y <= 1e-4 && bounds.max.y >= 4.0 - 1e-4);
    }
}
