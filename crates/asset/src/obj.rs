//! OBJ parser supporting positions, normals, texture coordinates, groups and materials.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use glam::Vec3;

use crate::{
    error::{LoadError, LoadResult},
    loader::LoadOptions,
    mesh::{Mesh, MeshVertex},
};

const DEFAULT_MESH_NAME: &str = "unnamed";

/// Load all meshes of an OBJ file.
pub fn load_obj_from_path(path: impl AsRef<Path>, options: &LoadOptions) -> LoadResult<Vec<Mesh>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            LoadError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    parse_obj(BufReader::new(file), path, options)
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str, options: &LoadOptions) -> LoadResult<Vec<Mesh>> {
    parse_obj(io::Cursor::new(contents), Path::new("<memory>"), options)
}

/// Parse OBJ text from any [`BufRead`]. `origin` only labels read errors.
pub fn parse_obj<R: BufRead>(
    reader: R,
    origin: &Path,
    options: &LoadOptions,
) -> LoadResult<Vec<Mesh>> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    let mut texcoords: Vec<[f32; 2]> = Vec::new();
    let mut builder = MeshBuilder::new(*options);

    // Exporters write Latin-1 comments and names; decode lossily instead of failing.
    for (line_no, line) in reader.split(b'\n').enumerate() {
        let line = line.map_err(|source| LoadError::Io {
            path: origin.to_path_buf(),
            source,
        })?;
        let line = String::from_utf8_lossy(&line);
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };

        match tag {
            "v" => {
                let x = parse_f32(parts.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts.next(), line_no, "z coordinate")?;
                positions.push([x, y, z]);
            }
            "vt" => {
                let u = parse_f32(parts.next(), line_no, "u coordinate")?;
                // 1D texture coordinates are legal; v defaults to 0.
                let v = match parts.next() {
                    Some(token) => parse_f32(Some(token), line_no, "v coordinate")?,
                    None => 0.0,
                };
                texcoords.push([u, v]);
            }
            "vn" => {
                let nx = parse_f32(parts.next(), line_no, "nx coordinate")?;
                let ny = parse_f32(parts.next(), line_no, "ny coordinate")?;
                let nz = parse_f32(parts.next(), line_no, "nz coordinate")?;
                normals.push([nx, ny, nz]);
            }
            "o" | "g" => {
                builder.start_group(rest_of_line(trimmed, tag));
            }
            "usemtl" => {
                builder.use_material(rest_of_line(trimmed, tag));
            }
            "f" => {
                let corners = parts
                    .map(|part| {
                        parse_face_vertex(
                            part,
                            positions.len(),
                            texcoords.len(),
                            normals.len(),
                            line_no,
                        )
                    })
                    .collect::<LoadResult<Vec<_>>>()?;

                if corners.len() < 3 {
                    log::debug!("Skipping degenerate face on line {}", line_no + 1);
                    continue;
                }
                builder.push_face(&corners, &positions, &texcoords, &normals, line_no)?;
            }
            _ => {
                // Ignore other directives (mtllib/s/l/p/etc.)
            }
        }
    }

    let meshes = builder.finish();
    if meshes.is_empty() {
        return Err(LoadError::NoGeometry);
    }
    Ok(meshes)
}

/// Resolved indices of one face corner: position, optional uv, optional normal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
struct Corner(usize, Option<usize>, Option<usize>);

/// Collects faces into the current group and closes groups into finished meshes.
struct MeshBuilder {
    options: LoadOptions,
    meshes: Vec<Mesh>,
    current: Mesh,
    base_name: String,
    splits: usize,
    unique: HashMap<Corner, u32>,
}

impl MeshBuilder {
    fn new(options: LoadOptions) -> Self {
        Self {
            options,
            meshes: Vec::new(),
            current: Mesh::new(DEFAULT_MESH_NAME),
            base_name: DEFAULT_MESH_NAME.to_owned(),
            splits: 1,
            unique: HashMap::new(),
        }
    }

    fn start_group(&mut self, name: &str) {
        let name = if name.is_empty() {
            DEFAULT_MESH_NAME
        } else {
            name
        };
        // Material state persists across groups.
        let material = self.current.material.clone();
        self.close_current(name.to_owned());
        self.current.material = material;
        self.base_name = name.to_owned();
        self.splits = 1;
    }

    fn use_material(&mut self, material: &str) {
        let has_geometry = !self.current.indices.is_empty();
        if has_geometry && self.current.material.as_deref() != Some(material) {
            self.splits += 1;
            let name = format!("{}_{}", self.base_name, self.splits);
            self.close_current(name);
        }
        self.current.material = Some(material.to_owned());
    }

    /// Replace the current mesh with an empty one, keeping it only if it holds triangles.
    fn close_current(&mut self, next_name: String) {
        let finished = std::mem::replace(&mut self.current, Mesh::new(next_name));
        self.unique.clear();
        if finished.is_valid() {
            log::debug!(
                "Finished mesh '{}' ({} vertices, {} triangles)",
                finished.name,
                finished.vertices.len(),
                finished.triangle_count()
            );
            self.meshes.push(finished);
        }
    }

    fn push_face(
        &mut self,
        corners: &[Corner],
        positions: &[[f32; 3]],
        texcoords: &[[f32; 2]],
        normals: &[[f32; 3]],
        line_no: usize,
    ) -> LoadResult<()> {
        let face_normal = if self.options.generate_normals {
            let p = |c: &Corner| Vec3::from_array(positions[c.0]);
            let n = (p(&corners[1]) - p(&corners[0]))
                .cross(p(&corners[2]) - p(&corners[0]))
                .normalize_or_zero();
            if n == Vec3::ZERO { Vec3::Z } else { n }
        } else {
            Vec3::Z
        };

        let mut face_indices: Vec<u32> = Vec::with_capacity(corners.len());
        for &corner in corners {
            let Corner(vi, vti, vni) = corner;
            let shareable =
                self.options.deduplicate && (vni.is_some() || !self.options.generate_normals);
            if shareable {
                if let Some(&idx) = self.unique.get(&corner) {
                    face_indices.push(idx);
                    continue;
                }
            }

            let uv = vti.map(|i| texcoords[i]).unwrap_or([0.0, 0.0]);
            let normal = vni.map(|i| normals[i]).unwrap_or(face_normal.to_array());
            let idx = u32::try_from(self.current.vertices.len())
                .map_err(|_| LoadError::parse(line_no, format!("too many vertices (>{})", u32::MAX)))?;
            self.current
                .vertices
                .push(MeshVertex::new(positions[vi], normal, uv));
            if shareable {
                self.unique.insert(corner, idx);
            }
            face_indices.push(idx);
        }

        // Triangulate fan
        for tri in 1..(face_indices.len() - 1) {
            self.current.indices.push(face_indices[0]);
            self.current.indices.push(face_indices[tri]);
            self.current.indices.push(face_indices[tri + 1]);
        }
        Ok(())
    }

    fn finish(mut self) -> Vec<Mesh> {
        self.close_current(String::new());
        self.meshes
    }
}

fn rest_of_line<'a>(line: &'a str, tag: &str) -> &'a str {
    line[tag.len()..].trim()
}

fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> LoadResult<f32> {
    let token = value.ok_or_else(|| LoadError::parse(line_no, format!("missing {what}")))?;
    token
        .parse::<f32>()
        .map_err(|e| LoadError::parse(line_no, format!("failed to parse {what} '{token}': {e}")))
}

fn parse_face_vertex(
    token: &str,
    pos_count: usize,
    tex_count: usize,
    norm_count: usize,
    line_no: usize,
) -> LoadResult<Corner> {
    let mut split = token.split('/');
    let pos = split
        .next()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| LoadError::parse(line_no, format!("malformed face element '{token}'")))?;
    let pos_idx = resolve_index(pos, pos_count, line_no)?;

    let tex_idx = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, tex_count, line_no)?),
        _ => None,
    };

    let norm_idx = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, norm_count, line_no)?),
        _ => None,
    };

    Ok(Corner(pos_idx, tex_idx, norm_idx))
}

fn resolve_index(token: &str, len: usize, line_no: usize) -> LoadResult<usize> {
    let raw = token
        .parse::<i64>()
        .map_err(|_| LoadError::parse(line_no, format!("invalid index '{token}'")))?;
    if raw == 0 {
        return Err(LoadError::parse(line_no, "OBJ indices are 1-based; found 0"));
    }

    let idx = if raw > 0 { raw - 1 } else { len as i64 + raw };

    if idx < 0 || idx as usize >= len {
        return Err(LoadError::parse(
            line_no,
            format!("index {raw} resolved out of bounds (len={len})"),
        ));
    }

    Ok(idx as usize)
}
