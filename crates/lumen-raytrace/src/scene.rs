//! Scene description and two-level acceleration structure.
//!
//! Meshes are registered once with a [`SceneBuilder`] and placed any number
//! of times as instances. [`SceneBuilder::build`] produces one bottom-level
//! hierarchy per mesh in object space, concatenated into a shared node
//! array, and a top-level hierarchy over the instances' world bounds.

use bytemuck::{Pod, Zeroable};
use lumen_math::{Aabb, Point3, Transform, Vec2};
use tracing::{debug, warn};

use crate::bvh::{Bvh, BvhNode, BLAS_LEAF_SIZE, TLAS_LEAF_SIZE};
use crate::error::{AccelError, Result};
use crate::material::Material;
use crate::texture::TextureAtlas;

/// An analytic sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// Centre in object space.
    pub center: Point3,
    /// Radius in object space.
    pub radius: f32,
    /// Material id.
    pub material: u32,
}

impl Sphere {
    /// Create a sphere.
    pub fn new(center: Point3, radius: f32, material: u32) -> Self {
        Self {
            center,
            radius,
            material,
        }
    }

    /// Object-space bounds.
    pub fn aabb(&self) -> Aabb {
        let r = lumen_math::Vec3::repeat(self.radius.abs());
        Aabb::new(self.center - r, self.center + r)
    }
}

/// Three indices into the scene vertex array.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Triangle {
    /// Vertex indices, counter-clockwise for the front face.
    pub indices: [u32; 3],
}

/// Which primitive array a mesh draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// Primitives index [`Scene::spheres`].
    Spheres,
    /// Primitives index [`Scene::triangles`].
    Triangles,
}

/// Handle to a registered mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub u32);

#[derive(Debug, Clone)]
struct MeshEntry {
    kind: GeometryKind,
    first: u32,
    count: u32,
}

#[derive(Debug, Clone)]
struct InstanceEntry {
    mesh: MeshId,
    transform: Transform,
    material: u32,
}

/// A placed mesh.
#[derive(Debug, Clone)]
pub struct Instance {
    /// Object to world transform.
    pub object_to_world: Transform,
    /// World to object transform, assuming uniform scale.
    pub world_to_object: Transform,
    /// Root of this mesh's hierarchy in [`Scene::blas_nodes`].
    pub blas_root: u32,
    /// Number of nodes in that hierarchy.
    pub blas_node_count: u32,
    /// Primitive kind of the mesh.
    pub kind: GeometryKind,
    /// Material for triangle meshes. Spheres carry their own.
    pub material: u32,
    /// Mesh this instance places.
    pub mesh: MeshId,
    /// World-space bounds.
    pub world_aabb: Aabb,
    /// Uniform scale factor; object-space distances times this are world
    /// distances.
    pub scale: f32,
}

/// Incrementally collects geometry, materials, textures and instances.
#[derive(Debug, Default)]
pub struct SceneBuilder {
    spheres: Vec<Sphere>,
    vertices: Vec<Point3>,
    uvs: Vec<Vec2>,
    triangles: Vec<Triangle>,
    meshes: Vec<MeshEntry>,
    materials: Vec<Material>,
    textures: TextureAtlas,
    instances: Vec<InstanceEntry>,
}

impl SceneBuilder {
    /// Start an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material and return its id.
    pub fn add_material(&mut self, material: Material) -> u32 {
        self.materials.push(material);
        (self.materials.len() - 1) as u32
    }

    /// Register an RGBA texture and return its id.
    pub fn add_texture(&mut self, width: u32, height: u32, texels: &[[f32; 4]]) -> Result<u32> {
        self.textures.push(width, height, texels)
    }

    /// Register a mesh made of spheres.
    pub fn add_spheres(&mut self, spheres: impl IntoIterator<Item = Sphere>) -> MeshId {
        let first = self.spheres.len() as u32;
        self.spheres.extend(spheres);
        self.push_mesh(GeometryKind::Spheres, first, self.spheres.len() as u32 - first)
    }

    /// Register a triangle mesh.
    ///
    /// `indices` are local to `positions`. When `uvs` is given it must have
    /// one entry per position; otherwise texture coordinates are zero.
    pub fn add_triangle_mesh(
        &mut self,
        positions: &[Point3],
        uvs: Option<&[Vec2]>,
        indices: &[[u32; 3]],
    ) -> Result<MeshId> {
        for (triangle, tri) in indices.iter().enumerate() {
            if let Some(&vertex) = tri.iter().find(|&&i| i as usize >= positions.len()) {
                return Err(AccelError::VertexOutOfRange {
                    triangle,
                    vertex,
                    vertex_count: positions.len(),
                });
            }
        }

        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(positions);
        match uvs {
            Some(uvs) => self
                .uvs
                .extend((0..positions.len()).map(|i| uvs.get(i).copied().unwrap_or_else(Vec2::zeros))),
            None => self.uvs.extend(std::iter::repeat(Vec2::zeros()).take(positions.len())),
        }

        let first = self.triangles.len() as u32;
        self.triangles.extend(indices.iter().map(|tri| Triangle {
            indices: [tri[0] + base, tri[1] + base, tri[2] + base],
        }));
        Ok(self.push_mesh(GeometryKind::Triangles, first, indices.len() as u32))
    }

    fn push_mesh(&mut self, kind: GeometryKind, first: u32, count: u32) -> MeshId {
        self.meshes.push(MeshEntry { kind, first, count });
        MeshId((self.meshes.len() - 1) as u32)
    }

    /// Place `mesh` in the world and return the instance id.
    ///
    /// `material` shades triangle meshes and is ignored for spheres.
    pub fn add_instance(&mut self, mesh: MeshId, transform: Transform, material: u32) -> u32 {
        self.instances.push(InstanceEntry {
            mesh,
            transform,
            material,
        });
        (self.instances.len() - 1) as u32
    }

    fn validate(&self) -> Result<()> {
        if self.instances.is_empty() {
            return Err(AccelError::EmptyGeometry("scene has no instances".into()));
        }
        if let Some((i, _)) = self.meshes.iter().enumerate().find(|(_, m)| m.count == 0) {
            return Err(AccelError::EmptyGeometry(format!("mesh {i} has no primitives")));
        }
        let material_count = self.materials.len() as u32;
        if let Some(s) = self.spheres.iter().find(|s| s.material >= material_count) {
            return Err(AccelError::UnknownMaterial(s.material));
        }
        for inst in &self.instances {
            if inst.mesh.0 as usize >= self.meshes.len() {
                return Err(AccelError::UnknownMesh(inst.mesh.0));
            }
            let kind = self.meshes[inst.mesh.0 as usize].kind;
            if kind == GeometryKind::Triangles && inst.material >= material_count {
                return Err(AccelError::UnknownMaterial(inst.material));
            }
        }
        let texture_count = self.textures.len() as u32;
        if let Some(t) = self
            .materials
            .iter()
            .flat_map(Material::textures)
            .find(|&t| t >= texture_count)
        {
            return Err(AccelError::UnknownTexture(t));
        }
        Ok(())
    }

    fn primitive_bounds(&self, mesh: &MeshEntry) -> Vec<Aabb> {
        let range = mesh.first as usize..(mesh.first + mesh.count) as usize;
        match mesh.kind {
            GeometryKind::Spheres => self.spheres[range].iter().map(Sphere::aabb).collect(),
            GeometryKind::Triangles => self.triangles[range]
                .iter()
                .map(|tri| Aabb::from_points(tri.indices.iter().map(|&i| &self.vertices[i as usize])))
                .collect(),
        }
    }

    /// Validate references and build both acceleration levels.
    pub fn build(self) -> Result<Scene> {
        self.validate()?;

        let mut blas_nodes: Vec<BvhNode> = Vec::new();
        let mut prim_indices: Vec<u32> = Vec::new();
        let mut mesh_roots = Vec::with_capacity(self.meshes.len());

        for mesh in &self.meshes {
            let bvh = Bvh::build(&self.primitive_bounds(mesh), BLAS_LEAF_SIZE);
            let node_offset = blas_nodes.len() as u32;
            let index_offset = prim_indices.len() as u32;
            mesh_roots.push((node_offset, bvh.nodes.len() as u32, bvh.bounds()));
            blas_nodes.extend(bvh.nodes.iter().map(|n| n.rebased(node_offset, index_offset)));
            prim_indices.extend(bvh.indices.iter().map(|&i| i + mesh.first));
        }

        let instances: Vec<Instance> = self
            .instances
            .iter()
            .enumerate()
            .map(|(id, entry)| {
                let (blas_root, blas_node_count, local_bounds) = mesh_roots[entry.mesh.0 as usize];
                if !entry.transform.is_uniformly_scaled() {
                    warn!(
                        instance = id,
                        scales = ?entry.transform.column_scales(),
                        "non-uniform instance scale; intersections will be approximate"
                    );
                }
                Instance {
                    object_to_world: entry.transform,
                    world_to_object: entry.transform.inverse_uniform(),
                    blas_root,
                    blas_node_count,
                    kind: self.meshes[entry.mesh.0 as usize].kind,
                    material: entry.material,
                    mesh: entry.mesh,
                    world_aabb: local_bounds.transformed(&entry.transform),
                    scale: entry.transform.scale_factor(),
                }
            })
            .collect();

        let world_bounds: Vec<Aabb> = instances.iter().map(|i| i.world_aabb).collect();
        let tlas = Bvh::build(&world_bounds, TLAS_LEAF_SIZE);

        debug!(
            meshes = self.meshes.len(),
            instances = instances.len(),
            blas_nodes = blas_nodes.len(),
            tlas_nodes = tlas.nodes.len(),
            spheres = self.spheres.len(),
            triangles = self.triangles.len(),
            "built acceleration structure"
        );

        Ok(Scene {
            tlas_nodes: tlas.nodes,
            tlas_indices: tlas.indices,
            blas_nodes,
            prim_indices,
            instances,
            spheres: self.spheres,
            vertices: self.vertices,
            uvs: self.uvs,
            triangles: self.triangles,
            materials: self.materials,
            textures: self.textures,
        })
    }
}

/// An immutable scene with its acceleration structure.
///
/// All arrays are flat so they can be uploaded as-is; see
/// [`Scene::tlas_bytes`] and [`Scene::blas_bytes`].
#[derive(Debug, Clone)]
pub struct Scene {
    /// Top-level nodes, root at 0.
    pub tlas_nodes: Vec<BvhNode>,
    /// Top-level leaf slots to instance ids.
    pub tlas_indices: Vec<u32>,
    /// Every bottom-level hierarchy, concatenated.
    pub blas_nodes: Vec<BvhNode>,
    /// Bottom-level leaf slots to global primitive indices.
    pub prim_indices: Vec<u32>,
    /// Instances by id.
    pub instances: Vec<Instance>,
    /// All spheres.
    pub spheres: Vec<Sphere>,
    /// All triangle vertices.
    pub vertices: Vec<Point3>,
    /// Texture coordinates, parallel to `vertices`.
    pub uvs: Vec<Vec2>,
    /// All triangles.
    pub triangles: Vec<Triangle>,
    /// Materials by id.
    pub materials: Vec<Material>,
    /// Texture atlas.
    pub textures: TextureAtlas,
}

impl Scene {
    /// World bounds of every instance.
    pub fn bounds(&self) -> Aabb {
        self.tlas_nodes.first().map(BvhNode::aabb).unwrap_or_default()
    }

    /// Top-level nodes as raw bytes.
    pub fn tlas_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.tlas_nodes)
    }

    /// Bottom-level nodes as raw bytes.
    pub fn blas_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.blas_nodes)
    }

    /// Triangle index buffer as raw bytes.
    pub fn triangle_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }

    /// Material for a primitive hit on `instance`.
    pub fn material_id(&self, instance: &Instance, primitive: u32) -> u32 {
        match instance.kind {
            GeometryKind::Spheres => self.spheres[primitive as usize].material,
            GeometryKind::Triangles => instance.material,
        }
    }
}
