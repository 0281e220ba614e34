//! Stateful loader owning the meshes of the last loaded file.

use std::path::Path;

use crate::{
    error::{LoadError, LoadResult},
    mesh::Mesh,
    obj,
};

/// Parser settings.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LoadOptions {
    /// Refuse paths that do not end in `.obj` (case-insensitive).
    pub require_obj_extension: bool,
    /// Compute a face normal for corners without a `vn` reference.
    pub generate_normals: bool,
    /// Share one vertex between face corners with identical indices.
    pub deduplicate: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            require_obj_extension: true,
            generate_normals: true,
            deduplicate: false,
        }
    }
}

/// Owns the mesh collection produced by the last successful load.
///
/// Meshes are only reachable by borrowing the loader, so they can never
/// outlive it or survive a reload.
#[derive(Debug, Default)]
pub struct Loader {
    options: LoadOptions,
    meshes: Vec<Mesh>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: LoadOptions) -> Self {
        Self {
            options,
            meshes: Vec::new(),
        }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Load an OBJ file, replacing the current collection.
    /// On failure the collection is left empty.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> LoadResult<()> {
        let path = path.as_ref();
        self.meshes.clear();

        if self.options.require_obj_extension && !has_obj_extension(path) {
            log::warn!("Refusing to load {:?}: not an .obj file", path);
            return Err(LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }

        log::info!("Loading OBJ from {:?}", path);
        let result = obj::load_obj_from_path(path, &self.options);
        self.store(result)
    }

    /// Parse OBJ text held in memory, replacing the current collection.
    pub fn load_str(&mut self, contents: &str) -> LoadResult<()> {
        self.meshes.clear();
        let result = obj::load_obj_from_str(contents, &self.options);
        self.store(result)
    }

    fn store(&mut self, result: LoadResult<Vec<Mesh>>) -> LoadResult<()> {
        match result {
            Ok(meshes) => {
                log::info!(
                    "Loaded {} mesh(es), {} vertices total",
                    meshes.len(),
                    meshes.iter().map(|m| m.vertices.len()).sum::<usize>()
                );
                self.meshes = meshes;
                Ok(())
            }
            Err(err) => {
                log::warn!("OBJ load failed: {}", err);
                Err(err)
            }
        }
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn mesh(&self, index: usize) -> Option<&Mesh> {
        self.meshes.get(index)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Drop all loaded meshes.
    pub fn clear(&mut self) {
        self.meshes.clear();
    }
}

fn has_obj_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("obj"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::error::LoadErrorKind;

    const TRIANGLE: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1
";

    #[test]
    fn load_file_populates_meshes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tri.obj");
        fs::write(&path, TRIANGLE).unwrap();

        let mut loader = Loader::new();
        loader.load_file(&path).unwrap();
        assert_eq!(loader.mesh_count(), 1);
        assert_eq!(loader.mesh(0).unwrap().vertices.len(), 3);
        assert!(loader.mesh(1).is_none());
    }

    #[test]
    fn missing_file_is_not_found_and_clears() {
        let mut loader = Loader::new();
        loader.load_str(TRIANGLE).unwrap();
        assert_eq!(loader.mesh_count(), 1);

        let err = loader.load_file("does_not_exist_12345.obj").unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::NotFound);
        assert!(loader.meshes().is_empty());
    }

    #[test]
    fn extension_is_checked_unless_disabled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tri.txt");
        fs::write(&path, TRIANGLE).unwrap();

        let mut loader = Loader::new();
        let err = loader.load_file(&path).unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::UnsupportedFormat);

        let mut lenient = Loader::with_options(LoadOptions {
            require_obj_extension: false,
            ..LoadOptions::default()
        });
        assert!(!lenient.options().require_obj_extension);
        lenient.load_file(&path).unwrap();
        assert_eq!(lenient.mesh_count(), 1);
        assert_eq!(loader.mesh_count(), 0);

        let upper = dir.path().join("TRI.OBJ");
        fs::write(&upper, TRIANGLE).unwrap();
        assert!(Loader::new().load_file(&upper).is_ok());
    }

    #[test]
    fn reload_replaces_collection() {
        let mut loader = Loader::new();
        loader.load_str("v 0 0 0\nv 1 0 0\nv 0 1 0\no a\nf 1 2 3\no b\nf 3 2 1\n").unwrap();
        assert_eq!(loader.mesh_count(), 2);

        loader.load_str(TRIANGLE).unwrap();
        assert_eq!(loader.mesh_count(), 1);
        assert_eq!(loader.meshes()[0].name, "unnamed");

        assert!(loader.load_str("v 1 2 3\n").is_err());
        assert_eq!(loader.mesh_count(), 0);
    }
}
