//! Error types for scene and acceleration structure construction.

use thiserror::Error;

/// Errors that can occur while building a [`Scene`](crate::Scene).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccelError {
    /// The scene or one of its meshes has no primitives.
    #[error("empty geometry: {0}")]
    EmptyGeometry(String),

    /// An instance references a mesh that was never registered.
    #[error("unknown mesh {0}")]
    UnknownMesh(u32),

    /// A primitive or instance references a material that does not exist.
    #[error("unknown material {0}")]
    UnknownMaterial(u32),

    /// A material references a texture that does not exist.
    #[error("unknown texture {0}")]
    UnknownTexture(u32),

    /// Texture data does not match its declared dimensions.
    #[error("texture is {width}x{height} but has {texels} texels")]
    TextureSize {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Number of texels supplied.
        texels: usize,
    },

    /// A triangle references a vertex outside its mesh.
    #[error("triangle {triangle} references vertex {vertex} but the mesh has {vertex_count}")]
    VertexOutOfRange {
        /// Triangle index within the mesh.
        triangle: usize,
        /// Offending vertex index.
        vertex: u32,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },
}

/// Result type for scene construction.
pub type Result<T> = std::result::Result<T, AccelError>;
