//! OBJ mesh loading engine.
//! Parses Wavefront OBJ files into named meshes of position/normal/uv vertices.

pub mod error;
pub mod loader;
pub mod mesh;
pub mod obj;

pub use error::{LoadError, LoadErrorKind, LoadResult};
pub use loader::{LoadOptions, Loader};
pub use mesh::{Mesh, MeshVertex};
