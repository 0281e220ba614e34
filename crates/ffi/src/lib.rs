//! C ABI for the OBJ loader.
//!
//! Foreign callers hold `uint64_t` handles (see `include/objloader.h`):
//! create a loader, load a file, walk meshes and vertices, destroy the loader.
//! Handles are checked on every call. A stale, null or wrong-kind handle, an
//! out-of-range index or a null pointer yields a null/zero result or an
//! [`ObjStatus`] instead of undefined behavior.
//!
//! Attribute buffers returned by `mesh_*_at` are owned by the caller and must
//! be released with [`free_float_buffer`]. The `mesh_*_into` variants fill a
//! caller-provided buffer instead.

pub mod buffer;
pub mod error;
pub mod registry;

use std::{
    ffi::{CStr, c_char, c_int},
    panic::{self, AssertUnwindSafe},
    ptr,
};

use asset::{LoadOptions, Loader, MeshVertex};

pub use error::{BindingError, BindingResult, ObjStatus};
pub use registry::{Handle, NULL_HANDLE, RawHandle, Registry, with_registry};

/// Floats per position or normal.
pub const VEC3_LEN: usize = 3;
/// Floats per texture coordinate.
pub const VEC2_LEN: usize = 2;

/// Run `f`, turning a panic into `fallback` so it never unwinds into C.
fn guard<R>(fallback: R, f: impl FnOnce() -> R) -> R {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            log::error!("Panic caught at the C boundary");
            fallback
        }
    }
}

fn handle(raw: RawHandle) -> BindingResult<Handle> {
    Handle::from_raw(raw).ok_or(BindingError::InvalidHandle)
}

fn report<T>(op: &str, result: BindingResult<T>) -> Option<T> {
    result
        .map_err(|err| log::warn!("{}: {}", op, err))
        .ok()
}

unsafe fn path_arg<'a>(path: *const c_char) -> BindingResult<&'a str> {
    if path.is_null() {
        return Err(BindingError::NullPointer);
    }
    unsafe { CStr::from_ptr(path) }
        .to_str()
        .map_err(|_| BindingError::InvalidPath)
}

fn read_vertex<const N: usize>(
    mesh: RawHandle,
    idx: usize,
    pick: fn(&MeshVertex) -> [f32; N],
) -> BindingResult<[f32; N]> {
    let h = handle(mesh)?;
    with_registry(|reg| reg.vertex(h, idx).map(pick))
}

fn position(v: &MeshVertex) -> [f32; VEC3_LEN] {
    v.position
}

fn normal(v: &MeshVertex) -> [f32; VEC3_LEN] {
    v.normal
}

fn texture(v: &MeshVertex) -> [f32; VEC2_LEN] {
    v.uv
}

fn attribute_at<const N: usize>(
    op: &str,
    mesh: RawHandle,
    idx: usize,
    pick: fn(&MeshVertex) -> [f32; N],
) -> *mut f32 {
    guard(ptr::null_mut(), || {
        match report(op, read_vertex(mesh, idx, pick)) {
            Some(values) => buffer::alloc_floats(&values),
            None => ptr::null_mut(),
        }
    })
}

unsafe fn attribute_into<const N: usize>(
    mesh: RawHandle,
    idx: usize,
    out: *mut f32,
    pick: fn(&MeshVertex) -> [f32; N],
) -> ObjStatus {
    guard(ObjStatus::Panic, || {
        if out.is_null() {
            return ObjStatus::NullPointer;
        }
        match read_vertex(mesh, idx, pick) {
            Ok(values) => {
                unsafe { buffer::write_floats(&values, out) };
                ObjStatus::Ok
            }
            Err(err) => err.status(),
        }
    })
}

/// Create a loader with default options.
#[unsafe(no_mangle)]
pub extern "C" fn create_new_loader() -> RawHandle {
    guard(NULL_HANDLE, || {
        with_registry(|reg| reg.create_loader(LoadOptions::default())).to_raw()
    })
}

/// Create a loader with explicit options; each flag is nonzero for on.
#[unsafe(no_mangle)]
pub extern "C" fn create_loader_with_options(
    require_obj_extension: c_int,
    generate_normals: c_int,
    deduplicate: c_int,
) -> RawHandle {
    let options = LoadOptions {
        require_obj_extension: require_obj_extension != 0,
        generate_normals: generate_normals != 0,
        deduplicate: deduplicate != 0,
    };
    guard(NULL_HANDLE, || {
        with_registry(|reg| reg.create_loader(options)).to_raw()
    })
}

/// Destroy a loader; every handle derived from it becomes stale.
/// Unknown or already destroyed handles are ignored.
#[unsafe(no_mangle)]
pub extern "C" fn delete_loader(loader: RawHandle) {
    guard((), || {
        report(
            "delete_loader",
            handle(loader).and_then(|h| with_registry(|reg| reg.destroy_loader(h))),
        );
    })
}

/// Load an OBJ file. Returns 1 on success, 0 on any failure.
///
/// # Safety
/// `file` must be null or point to a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn load_file(loader: RawHandle, file: *const c_char) -> c_int {
    unsafe { load_file_status(loader, file, ptr::null_mut()) }
}

/// Like [`load_file`], also writing the failure kind to `out_status` when non-null.
///
/// # Safety
/// `file` must be null or point to a NUL-terminated string; `out_status`
/// must be null or valid for one write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn load_file_status(
    loader: RawHandle,
    file: *const c_char,
    out_status: *mut ObjStatus,
) -> c_int {
    let status = guard(ObjStatus::Panic, || {
        let result = handle(loader).and_then(|h| {
            let options = with_registry(|reg| reg.begin_load(h))?;
            let path = unsafe { path_arg(file) }?;
            // Parse outside the registry lock so other loaders stay usable.
            let mut staged = Loader::with_options(options);
            let loaded = staged.load_file(path);
            with_registry(|reg| reg.finish_load(h, staged))?;
            loaded.map_err(BindingError::from)
        });
        let status = ObjStatus::from(&result);
        report("load_file", result);
        status
    });
    if !out_status.is_null() {
        unsafe { *out_status = status };
    }
    c_int::from(status == ObjStatus::Ok)
}

/// Collection handle of the loaded meshes; writes the mesh count to `nmesh`.
/// Returns the null handle when no meshes are loaded or the loader is invalid.
///
/// # Safety
/// `nmesh` must be null or valid for one write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn loaded_meshes(loader: RawHandle, nmesh: *mut c_int) -> RawHandle {
    let (collection, count) = guard((None, 0), || {
        let result = handle(loader).and_then(|h| with_registry(|reg| reg.collection(h)));
        report("loaded_meshes", result).unwrap_or((None, 0))
    });
    if !nmesh.is_null() {
        unsafe { *nmesh = c_int::try_from(count).unwrap_or(c_int::MAX) };
    }
    collection.map_or(NULL_HANDLE, Handle::to_raw)
}

/// Mesh handle at `idx` in a collection, or the null handle.
#[unsafe(no_mangle)]
pub extern "C" fn mesh_at(meshes: RawHandle, idx: usize) -> RawHandle {
    guard(NULL_HANDLE, || {
        let result = handle(meshes).and_then(|h| with_registry(|reg| reg.mesh_at(h, idx)));
        report("mesh_at", result).map_or(NULL_HANDLE, Handle::to_raw)
    })
}

/// Vertex count of a mesh; 0 for an invalid handle.
#[unsafe(no_mangle)]
pub extern "C" fn vertex_size_mesh(mesh: RawHandle) -> usize {
    guard(0, || {
        let result =
            handle(mesh).and_then(|h| with_registry(|reg| reg.mesh(h).map(|m| m.vertices.len())));
        report("vertex_size_mesh", result).unwrap_or(0)
    })
}

/// Triangle index count of a mesh; 0 for an invalid handle.
#[unsafe(no_mangle)]
pub extern "C" fn index_size_mesh(mesh: RawHandle) -> usize {
    guard(0, || {
        let result =
            handle(mesh).and_then(|h| with_registry(|reg| reg.mesh(h).map(|m| m.indices.len())));
        report("index_size_mesh", result).unwrap_or(0)
    })
}

/// Write the axis-aligned bounds of a mesh into `out_min[0..3]` and `out_max[0..3]`.
///
/// # Safety
/// `out_min` and `out_max` must be null or valid for 3 writes each.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mesh_bounds(
    mesh: RawHandle,
    out_min: *mut f32,
    out_max: *mut f32,
) -> ObjStatus {
    guard(ObjStatus::Panic, || {
        if out_min.is_null() || out_max.is_null() {
            return ObjStatus::NullPointer;
        }
        let result = handle(mesh).and_then(|h| {
            with_registry(|reg| {
                let mesh = reg.mesh(h)?;
                mesh.bounds().ok_or(BindingError::OutOfRange { index: 0, len: 0 })
            })
        });
        match result {
            Ok((min, max)) => {
                unsafe {
                    buffer::write_floats(&min.to_array(), out_min);
                    buffer::write_floats(&max.to_array(), out_max);
                }
                ObjStatus::Ok
            }
            Err(err) => err.status(),
        }
    })
}

/// Newly allocated `float[3]` position, or null. Free with [`free_float_buffer`].
#[unsafe(no_mangle)]
pub extern "C" fn mesh_position_at(mesh: RawHandle, idx: usize) -> *mut f32 {
    attribute_at("mesh_position_at", mesh, idx, position)
}

/// Newly allocated `float[3]` normal, or null. Free with [`free_float_buffer`].
#[unsafe(no_mangle)]
pub extern "C" fn mesh_normal_at(mesh: RawHandle, idx: usize) -> *mut f32 {
    attribute_at("mesh_normal_at", mesh, idx, normal)
}

/// Newly allocated `float[2]` texture coordinate, or null. Free with [`free_float_buffer`].
#[unsafe(no_mangle)]
pub extern "C" fn mesh_texture_at(mesh: RawHandle, idx: usize) -> *mut f32 {
    attribute_at("mesh_texture_at", mesh, idx, texture)
}

/// Release a buffer returned by `mesh_*_at`. Null is ignored.
///
/// # Safety
/// `buffer` must come from `mesh_position_at`/`mesh_normal_at` (`len` = 3) or
/// `mesh_texture_at` (`len` = 2) and must not be freed twice.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_float_buffer(buffer: *mut f32, len: usize) {
    unsafe { buffer::free_floats(buffer, len) }
}

/// Write the position at `idx` into `out[0..3]`.
///
/// # Safety
/// `out` must be null or valid for 3 writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mesh_position_into(mesh: RawHandle, idx: usize, out: *mut f32) -> ObjStatus {
    unsafe { attribute_into(mesh, idx, out, position) }
}

/// Write the normal at `idx` into `out[0..3]`.
///
/// # Safety
/// `out` must be null or valid for 3 writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mesh_normal_into(mesh: RawHandle, idx: usize, out: *mut f32) -> ObjStatus {
    unsafe { attribute_into(mesh, idx, out, normal) }
}

/// Write the texture coordinate at `idx` into `out[0..2]`.
///
/// # Safety
/// `out` must be null or valid for 2 writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mesh_texture_into(mesh: RawHandle, idx: usize, out: *mut f32) -> ObjStatus {
    unsafe { attribute_into(mesh, idx, out, texture) }
}

/// Write triangle index `idx` of a mesh into `out`.
///
/// # Safety
/// `out` must be null or valid for one write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mesh_index_at(mesh: RawHandle, idx: usize, out: *mut u32) -> ObjStatus {
    guard(ObjStatus::Panic, || {
        if out.is_null() {
            return ObjStatus::NullPointer;
        }
        let result = handle(mesh).and_then(|h| {
            with_registry(|reg| {
                let indices = &reg.mesh(h)?.indices;
                indices.get(idx).copied().ok_or(BindingError::OutOfRange {
                    index: idx,
                    len: indices.len(),
                })
            })
        });
        match result {
            Ok(value) => {
                unsafe { *out = value };
                ObjStatus::Ok
            }
            Err(err) => err.status(),
        }
    })
}

/// Copy the mesh name into `buf` (NUL-terminated, truncated to `cap` bytes).
/// Returns the untruncated byte length, 0 for an invalid handle.
///
/// # Safety
/// `buf` must be null or valid for `cap` writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mesh_name(mesh: RawHandle, buf: *mut c_char, cap: usize) -> usize {
    guard(0, || {
        let result = handle(mesh).and_then(|h| {
            with_registry(|reg| {
                let name = &reg.mesh(h)?.name;
                Ok(unsafe { buffer::write_c_string(name, buf, cap) })
            })
        });
        report("mesh_name", result).unwrap_or(0)
    })
}

/// Copy the mesh material name into `buf`, like [`mesh_name`].
/// Returns 0 when the mesh has no material.
///
/// # Safety
/// `buf` must be null or valid for `cap` writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mesh_material_name(mesh: RawHandle, buf: *mut c_char, cap: usize) -> usize {
    guard(0, || {
        let result = handle(mesh).and_then(|h| {
            with_registry(|reg| {
                let material = reg.mesh(h)?.material.as_deref().unwrap_or("");
                Ok(unsafe { buffer::write_c_string(material, buf, cap) })
            })
        });
        report("mesh_material_name", result).unwrap_or(0)
    })
}

/// Static NUL-terminated description of a status code.
#[unsafe(no_mangle)]
pub extern "C" fn objloader_status_message(status: c_int) -> *const c_char {
    ObjStatus::from_raw(status)
        .map_or("unknown status\0", ObjStatus::message)
        .as_ptr()
        .cast()
}

/// Route library logs to stderr, filtered by `RUST_LOG` (default `warn`).
/// Safe to call more than once.
#[unsafe(no_mangle)]
pub extern "C" fn objloader_init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();
}
