#![warn(missing_docs)]

//! Math types for the lumen renderer.
//!
//! Thin wrappers around nalgebra providing the renderer's vocabulary:
//! points, vectors, colors, axis-aligned boxes, affine instance transforms
//! and a few shading helpers. Everything is `f32`, matching the flat
//! device-style buffers the rest of the workspace works on.

use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f32>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f32>;

/// A vector in 2D space (texture coordinates, barycentrics).
pub type Vec2 = Vector2<f32>;

/// Linear RGB radiance or reflectance.
pub type Color = Vector3<f32>;

/// Relative column-length mismatch above which a transform is considered
/// non-uniformly scaled.
pub const NON_UNIFORM_SCALE_TOLERANCE: f32 = 1e-3;

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb {
    /// Create a box from two corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// The empty box: union identity, contains nothing.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Smallest box containing all `points`.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.grow(p);
        }
        aabb
    }

    /// True if no point has been added yet.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Enlarge to include `p`.
    pub fn grow(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Union of two boxes.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// True if `other` lies entirely inside this box (boundaries inclusive).
    pub fn contains(&self, other: &Aabb) -> bool {
        (0..3).all(|i| self.min[i] <= other.min[i] && self.max[i] >= other.max[i])
    }

    /// Box centre.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Edge lengths along each axis.
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Index (0, 1, 2) of the axis with the largest extent. Ties favour the
    /// lower axis.
    pub fn longest_axis(&self) -> usize {
        let e = self.extent();
        if e.x >= e.y && e.x >= e.z {
            0
        } else if e.y >= e.z {
            1
        } else {
            2
        }
    }

    /// Total surface area; zero for empty boxes.
    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.extent();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Bound of this box after `transform`, computed from its eight corners.
    pub fn transformed(&self, transform: &Transform) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let mut out = Aabb::empty();
        for i in 0..8 {
            let corner = Point3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.grow(&transform.apply_point(&corner));
        }
        out
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f32>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Wrap an existing matrix.
    pub fn from_matrix(matrix: Matrix4<f32>) -> Self {
        Self { matrix }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f32, dy: f32, dz: f32) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Uniform scale by `s`.
    pub fn uniform_scale(s: f32) -> Self {
        Self::scale(s, s, s)
    }

    /// Non-uniform scale by `(sx, sy, sz)`.
    ///
    /// Instances only support uniform scale; see [`Transform::scale_factor`].
    pub fn scale(sx: f32, sy: f32, sz: f32) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 0)] = sx;
        m[(1, 1)] = sy;
        m[(2, 2)] = sz;
        Self { matrix: m }
    }

    /// Rotation about the Y axis by `angle` radians.
    pub fn rotation_y(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 2)] = s;
        m[(2, 0)] = -s;
        m[(2, 2)] = c;
        Self { matrix: m }
    }

    /// Rotation about an arbitrary axis through the origin by `angle` radians.
    ///
    /// Uses Rodrigues' rotation formula. `axis` need not be normalized.
    pub fn rotation_about_axis(axis: &Vec3, angle: f32) -> Self {
        let axis = axis.normalize();
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.x, axis.y, axis.z);
        let mut m = Matrix4::identity();
        m[(0, 0)] = t * x * x + c;
        m[(0, 1)] = t * x * y - s * z;
        m[(0, 2)] = t * x * z + s * y;
        m[(1, 0)] = t * x * y + s * z;
        m[(1, 1)] = t * y * y + c;
        m[(1, 2)] = t * y * z - s * x;
        m[(2, 0)] = t * x * z - s * y;
        m[(2, 1)] = t * y * z + s * x;
        m[(2, 2)] = t * z * z + c;
        Self { matrix: m }
    }

    /// Compose: `self * other`, i.e. apply `other` first, then `self`.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a direction vector (ignores translation).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }

    /// Upper-left 3x3 block.
    pub fn linear(&self) -> Matrix3<f32> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Lengths of the three basis columns of the linear part.
    pub fn column_scales(&self) -> Vec3 {
        let m3 = self.linear();
        Vec3::new(m3.column(0).norm(), m3.column(1).norm(), m3.column(2).norm())
    }

    /// Single scale factor for the transform: the average column length.
    ///
    /// Exact for rotation times uniform scale. A non-uniform scale collapses
    /// to its mean, which is wrong for such transforms; callers can detect
    /// the case with [`Transform::is_uniformly_scaled`].
    pub fn scale_factor(&self) -> f32 {
        let s = self.column_scales();
        (s.x + s.y + s.z) / 3.0
    }

    /// True if all three column lengths agree within
    /// [`NON_UNIFORM_SCALE_TOLERANCE`].
    pub fn is_uniformly_scaled(&self) -> bool {
        let s = self.column_scales();
        let mean = (s.x + s.y + s.z) / 3.0;
        if mean <= 0.0 {
            return false;
        }
        (0..3).all(|i| ((s[i] - mean) / mean).abs() <= NON_UNIFORM_SCALE_TOLERANCE)
    }

    /// Inverse assuming the linear part is an orthonormal rotation times the
    /// uniform scale [`Transform::scale_factor`]: `M⁻¹ = Mᵀ / s²`.
    ///
    /// Exact for orthonormal + uniform-scale transforms only.
    pub fn inverse_uniform(&self) -> Self {
        let s = self.scale_factor();
        let inv_linear = self.linear().transpose() / (s * s);
        let t = Vec3::new(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)]);
        let inv_t = -(inv_linear * t);

        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&inv_linear);
        m[(0, 3)] = inv_t.x;
        m[(1, 3)] = inv_t.y;
        m[(2, 3)] = inv_t.z;
        Self { matrix: m }
    }

    /// General inverse of this transform, if it exists.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Build an orthonormal tangent frame `(t, b)` around unit normal `n`.
///
/// Branchless construction of Duff et al. 2017.
pub fn orthonormal_basis(n: &Vec3) -> (Vec3, Vec3) {
    let sign = 1.0f32.copysign(n.z);
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;
    let t = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bt = Vec3::new(b, sign + n.y * n.y * a, -n.y);
    (t, bt)
}

/// Rec. 709 luminance of a linear color.
#[inline]
pub fn luminance(c: &Color) -> f32 {
    0.2126 * c.x + 0.7152 * c.y + 0.0722 * c.z
}

/// Largest channel of a color.
#[inline]
pub fn max_channel(c: &Color) -> f32 {
    c.x.max(c.y).max(c.z)
}
