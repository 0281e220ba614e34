//! objinfo: print the meshes of an OBJ file through the loader's C interface.
//! Usage: objinfo [--dedup] [--no-normals] [--any-ext] [--verbose] <file.obj>

use std::ffi::{CStr, CString, c_char, c_int};

use anyhow::{Context, Result, bail};
use glam::Vec3;
use objloader::{NULL_HANDLE, ObjStatus, RawHandle, VEC3_LEN};

#[derive(Clone, Debug, Default, PartialEq)]
struct Options {
    path: Option<String>,
    dedup: bool,
    generate_normals: bool,
    any_extension: bool,
    verbose: bool,
}

fn parse_args(args: &[String]) -> Options {
    let mut opts = Options {
        generate_normals: true,
        ..Options::default()
    };
    for arg in args {
        match arg.as_str() {
            "--dedup" => opts.dedup = true,
            "--no-normals" => opts.generate_normals = false,
            "--any-ext" => opts.any_extension = true,
            "--verbose" | "-v" => opts.verbose = true,
            other if other.starts_with("--") => {
                eprintln!("[warn] Unknown flag '{}', ignored.", other);
            }
            other => opts.path = Some(other.to_owned()),
        }
    }
    opts
}

#[derive(Clone, Debug, PartialEq)]
struct MeshSummary {
    name: String,
    material: Option<String>,
    vertices: usize,
    indices: usize,
    bounds: Option<(Vec3, Vec3)>,
}

/// Owns a loader handle for the duration of a run.
struct LoaderGuard(RawHandle);

impl Drop for LoaderGuard {
    fn drop(&mut self) {
        objloader::delete_loader(self.0);
    }
}

fn read_name(f: unsafe extern "C" fn(RawHandle, *mut c_char, usize) -> usize, mesh: RawHandle) -> String {
    let mut buf = vec![0 as c_char; 128];
    let len = unsafe { f(mesh, buf.as_mut_ptr(), buf.len()) };
    if len >= buf.len() {
        buf.resize(len + 1, 0);
        unsafe { f(mesh, buf.as_mut_ptr(), buf.len()) };
    }
    unsafe { CStr::from_ptr(buf.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

fn mesh_bounds(mesh: RawHandle) -> Option<(Vec3, Vec3)> {
    let mut min = [0.0f32; VEC3_LEN];
    let mut max = [0.0f32; VEC3_LEN];
    let status = unsafe { objloader::mesh_bounds(mesh, min.as_mut_ptr(), max.as_mut_ptr()) };
    if status != ObjStatus::Ok {
        log::warn!("Bounds unavailable: {:?}", status);
        return None;
    }
    Some((Vec3::from_array(min), Vec3::from_array(max)))
}

fn summarize(opts: &Options) -> Result<Vec<MeshSummary>> {
    let Some(path) = opts.path.as_deref() else {
        bail!("no input file given");
    };
    let c_path = CString::new(path).context("path contains a NUL byte")?;

    let loader = LoaderGuard(objloader::create_loader_with_options(
        c_int::from(!opts.any_extension),
        c_int::from(opts.generate_normals),
        c_int::from(opts.dedup),
    ));

    let mut status = ObjStatus::Ok;
    if unsafe { objloader::load_file_status(loader.0, c_path.as_ptr(), &mut status) } == 0 {
        let message = unsafe { CStr::from_ptr(objloader::objloader_status_message(status as c_int)) };
        bail!("failed to load {}: {}", path, message.to_string_lossy());
    }

    let mut count: c_int = 0;
    let meshes = unsafe { objloader::loaded_meshes(loader.0, &mut count) };
    if meshes == NULL_HANDLE {
        return Ok(Vec::new());
    }

    let mut summaries = Vec::with_capacity(count.max(0) as usize);
    for i in 0..count.max(0) as usize {
        let mesh = objloader::mesh_at(meshes, i);
        let vertices = objloader::vertex_size_mesh(mesh);
        let material = read_name(objloader::mesh_material_name, mesh);
        summaries.push(MeshSummary {
            name: read_name(objloader::mesh_name, mesh),
            material: (!material.is_empty()).then_some(material),
            vertices,
            indices: objloader::index_size_mesh(mesh),
            bounds: mesh_bounds(mesh),
        });
    }
    Ok(summaries)
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = parse_args(&args);
    let filter = if opts.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    log::info!(
        "objinfo: file={:?}, dedup={}, normals={}",
        opts.path,
        opts.dedup,
        opts.generate_normals
    );

    let summaries = summarize(&opts)?;
    for (i, mesh) in summaries.iter().enumerate() {
        println!(
            "[{}] {} (material: {}) vertices={} triangles={}",
            i,
            mesh.name,
            mesh.material.as_deref().unwrap_or("-"),
            mesh.vertices,
            mesh.indices / 3
        );
        if let Some((min, max)) = mesh.bounds {
            println!("    bounds min={:?} max={:?}", min, max);
        }
    }
    log::info!("{} mesh(es) listed", summaries.len());
    Ok(())
}
