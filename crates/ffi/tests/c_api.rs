//! Drives the exported C functions the way a foreign caller would.

use std::{
    ffi::{CStr, CString, c_char, c_int},
    fs,
    path::Path,
    ptr, slice,
};

use objloader::*;
use tempfile::{TempDir, tempdir};

const TRIANGLE: &str = "\
# one triangle, distinct attributes per corner
o tri
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vn 0.0 0.0 1.0
vn 0.0 1.0 0.0
vn 1.0 0.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
f 1/1/1 2/2/2 3/3/3
";

const CAR: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
g body
usemtl paint
f 1 2 3 4
g wheel
usemtl rubber
f 1 2 3
";

fn write_obj(dir: &TempDir, name: &str, contents: &str) -> CString {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    c_path(&path)
}

fn c_path(path: &Path) -> CString {
    CString::new(path.to_str().unwrap()).unwrap()
}

fn take_floats(ptr: *mut f32, len: usize) -> Vec<f32> {
    assert!(!ptr.is_null());
    let values = unsafe { slice::from_raw_parts(ptr, len) }.to_vec();
    unsafe { free_float_buffer(ptr, len) };
    values
}

fn collection(loader: RawHandle) -> (RawHandle, c_int) {
    let mut count: c_int = -1;
    let handle = unsafe { loaded_meshes(loader, &mut count) };
    (handle, count)
}

fn name_of(mesh: RawHandle) -> String {
    let mut buf = [0 as c_char; 64];
    let len = unsafe { mesh_name(mesh, buf.as_mut_ptr(), buf.len()) };
    let text = unsafe { CStr::from_ptr(buf.as_ptr()) }.to_str().unwrap().to_owned();
    assert_eq!(len, text.len());
    text
}

#[test]
fn triangle_file_yields_one_mesh_of_three_vertices() {
    let dir = tempdir().unwrap();
    let path = write_obj(&dir, "tri.obj", TRIANGLE);

    let loader = create_new_loader();
    assert_ne!(loader, NULL_HANDLE);
    assert_eq!(unsafe { load_file(loader, path.as_ptr()) }, 1);

    let (meshes, count) = collection(loader);
    assert_eq!(count, 1);
    assert_ne!(meshes, NULL_HANDLE);

    let mesh = mesh_at(meshes, 0);
    assert_ne!(mesh, NULL_HANDLE);
    assert_eq!(name_of(mesh), "tri");
    assert_eq!(vertex_size_mesh(mesh), 3);
    assert_eq!(index_size_mesh(mesh), 3);

    let positions: Vec<_> = (0..3)
        .map(|i| take_floats(mesh_position_at(mesh, i), 3))
        .collect();
    assert_eq!(
        positions,
        vec![vec![0.0, 0.0, 0.0], vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]
    );
    assert_eq!(take_floats(mesh_normal_at(mesh, 1), 3), vec![0.0, 1.0, 0.0]);
    assert_eq!(take_floats(mesh_texture_at(mesh, 2), 2), vec![0.0, 1.0]);

    delete_loader(loader);
}

#[test]
fn missing_file_reports_failure_and_no_collection() {
    let dir = tempdir().unwrap();
    let path = c_path(&dir.path().join("absent.obj"));

    let loader = create_new_loader();
    assert_eq!(unsafe { load_file(loader, path.as_ptr()) }, 0);
    assert_eq!(collection(loader), (NULL_HANDLE, 0));

    let mut status = ObjStatus::Ok;
    assert_eq!(unsafe { load_file_status(loader, path.as_ptr(), &mut status) }, 0);
    assert_eq!(status, ObjStatus::NotFound);

    delete_loader(loader);
}

#[test]
fn load_status_distinguishes_failure_kinds() {
    let dir = tempdir().unwrap();
    let broken = write_obj(&dir, "broken.obj", "v 0 0 0\nf 1 2 3\n");
    let text = write_obj(&dir, "tri.txt", TRIANGLE);
    let loader = create_new_loader();

    let mut status = ObjStatus::Ok;
    unsafe { load_file_status(loader, broken.as_ptr(), &mut status) };
    assert_eq!(status, ObjStatus::Parse);

    unsafe { load_file_status(loader, text.as_ptr(), &mut status) };
    assert_eq!(status, ObjStatus::UnsupportedFormat);

    unsafe { load_file_status(loader, ptr::null(), &mut status) };
    assert_eq!(status, ObjStatus::NullPointer);

    unsafe { load_file_status(NULL_HANDLE, broken.as_ptr(), &mut status) };
    assert_eq!(status, ObjStatus::InvalidHandle);

    let message = unsafe { CStr::from_ptr(objloader_status_message(ObjStatus::Parse as c_int)) };
    assert_eq!(message.to_str().unwrap(), "OBJ parse error");

    delete_loader(loader);
}

#[test]
fn mesh_count_is_stable_and_follows_groups() {
    let dir = tempdir().unwrap();
    let path = write_obj(&dir, "car.obj", CAR);
    let loader = create_new_loader();
    assert_eq!(unsafe { load_file(loader, path.as_ptr()) }, 1);

    let first = collection(loader);
    assert_eq!(first.1, 2);
    assert_eq!(collection(loader), first);

    let body = mesh_at(first.0, 0);
    let wheel = mesh_at(first.0, 1);
    assert_eq!(name_of(body), "body");
    assert_eq!(name_of(wheel), "wheel");
    assert_eq!(vertex_size_mesh(body), 4);
    assert_eq!(index_size_mesh(body), 6);

    let mut buf = [0 as c_char; 16];
    let len = unsafe { mesh_material_name(wheel, buf.as_mut_ptr(), buf.len()) };
    assert_eq!(len, "rubber".len());

    let mut index = u32::MAX;
    assert_eq!(unsafe { mesh_index_at(body, 5, &mut index) }, ObjStatus::Ok);
    assert_eq!(index, 3);
    assert_eq!(unsafe { mesh_index_at(body, 6, &mut index) }, ObjStatus::OutOfRange);

    delete_loader(loader);
}

#[test]
fn returned_buffers_are_independent() {
    let dir = tempdir().unwrap();
    let path = write_obj(&dir, "tri.obj", TRIANGLE);
    let loader = create_new_loader();
    unsafe { load_file(loader, path.as_ptr()) };
    let mesh = mesh_at(collection(loader).0, 0);

    let a = mesh_position_at(mesh, 1);
    let b = mesh_position_at(mesh, 2);
    let again = mesh_position_at(mesh, 1);
    assert_ne!(a, again);
    unsafe { *a = 42.0 };

    assert_eq!(take_floats(b, 3), vec![0.0, 1.0, 0.0]);
    assert_eq!(take_floats(again, 3), vec![1.0, 0.0, 0.0]);
    assert_eq!(take_floats(a, 3), vec![42.0, 0.0, 0.0]);

    delete_loader(loader);
}

#[test]
fn out_of_range_indices_are_checked() {
    let dir = tempdir().unwrap();
    let path = write_obj(&dir, "tri.obj", TRIANGLE);
    let loader = create_new_loader();
    unsafe { load_file(loader, path.as_ptr()) };
    let meshes = collection(loader).0;
    let mesh = mesh_at(meshes, 0);

    assert_eq!(mesh_at(meshes, 1), NULL_HANDLE);
    assert!(mesh_position_at(mesh, 3).is_null());
    assert!(mesh_normal_at(mesh, usize::MAX).is_null());
    assert!(mesh_texture_at(mesh, 3).is_null());

    let mut out = [0.0f32; 3];
    assert_eq!(
        unsafe { mesh_position_into(mesh, 3, out.as_mut_ptr()) },
        ObjStatus::OutOfRange
    );
    assert_eq!(
        unsafe { mesh_normal_into(mesh, 0, ptr::null_mut()) },
        ObjStatus::NullPointer
    );
    assert_eq!(
        unsafe { mesh_normal_into(mesh, 2, out.as_mut_ptr()) },
        ObjStatus::Ok
    );
    assert_eq!(out, [1.0, 0.0, 0.0]);

    let mut uv = [9.0f32; 2];
    assert_eq!(
        unsafe { mesh_texture_into(mesh, 1, uv.as_mut_ptr()) },
        ObjStatus::Ok
    );
    assert_eq!(uv, [1.0, 0.0]);

    delete_loader(loader);
}

#[test]
fn destroyed_loader_invalidates_derived_handles() {
    let dir = tempdir().unwrap();
    let path = write_obj(&dir, "tri.obj", TRIANGLE);
    let loader = create_new_loader();
    unsafe { load_file(loader, path.as_ptr()) };
    let meshes = collection(loader).0;
    let mesh = mesh_at(meshes, 0);

    delete_loader(loader);
    // Second delete is detected and ignored.
    delete_loader(loader);

    assert_eq!(collection(loader), (NULL_HANDLE, 0));
    assert_eq!(mesh_at(meshes, 0), NULL_HANDLE);
    assert_eq!(vertex_size_mesh(mesh), 0);
    assert!(mesh_position_at(mesh, 0).is_null());
    let mut out = [0.0f32; 3];
    assert_eq!(
        unsafe { mesh_position_into(mesh, 0, out.as_mut_ptr()) },
        ObjStatus::InvalidHandle
    );
    assert_eq!(unsafe { load_file(loader, path.as_ptr()) }, 0);
}

#[test]
fn reload_invalidates_previous_meshes() {
    let dir = tempdir().unwrap();
    let car = write_obj(&dir, "car.obj", CAR);
    let tri = write_obj(&dir, "tri.obj", TRIANGLE);
    let loader = create_new_loader();

    unsafe { load_file(loader, car.as_ptr()) };
    let (old_meshes, old_count) = collection(loader);
    let old_mesh = mesh_at(old_meshes, 1);
    assert_eq!(old_count, 2);

    assert_eq!(unsafe { load_file(loader, tri.as_ptr()) }, 1);
    assert_eq!(vertex_size_mesh(old_mesh), 0);
    assert_eq!(mesh_at(old_meshes, 0), NULL_HANDLE);

    let (meshes, count) = collection(loader);
    assert_eq!(count, 1);
    assert_ne!(meshes, old_meshes);
    assert_eq!(vertex_size_mesh(mesh_at(meshes, 0)), 3);

    delete_loader(loader);
}

#[test]
fn handles_of_the_wrong_kind_are_rejected() {
    let dir = tempdir().unwrap();
    let path = write_obj(&dir, "tri.obj", TRIANGLE);
    let loader = create_new_loader();
    unsafe { load_file(loader, path.as_ptr()) };
    let meshes = collection(loader).0;

    assert_eq!(mesh_at(loader, 0), NULL_HANDLE);
    assert_eq!(vertex_size_mesh(meshes), 0);
    assert_eq!(collection(meshes), (NULL_HANDLE, 0));
    delete_loader(meshes);
    assert_eq!(collection(loader).1, 1);

    delete_loader(loader);
}

#[test]
fn loader_options_are_honoured() {
    let dir = tempdir().unwrap();
    let quad = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\nf 1//1 3//1 4//1\n";
    let path = write_obj(&dir, "quad.mesh", quad);

    let loader = create_loader_with_options(0, 1, 1);
    assert_eq!(unsafe { load_file(loader, path.as_ptr()) }, 1);
    let mesh = mesh_at(collection(loader).0, 0);
    assert_eq!(vertex_size_mesh(mesh), 4);
    assert_eq!(index_size_mesh(mesh), 6);
    delete_loader(loader);

    let strict = create_new_loader();
    assert_eq!(unsafe { load_file(strict, path.as_ptr()) }, 0);
    delete_loader(strict);
}

#[test]
fn freeing_null_is_a_no_op() {
    unsafe { free_float_buffer(ptr::null_mut(), 3) };
    objloader_init_logging();
    objloader_init_logging();
}

#[test]
fn load_file_agrees_with_load_file_status() {
    let dir = tempdir().unwrap();
    let good = write_obj(&dir, "tri.obj", TRIANGLE);
    let bad = c_path(&dir.path().join("absent.obj"));
    let loader = create_new_loader();

    let mut status = ObjStatus::Panic;
    let ok: c_int = unsafe { load_file(loader, good.as_ptr()) };
    assert_eq!(ok, unsafe { load_file_status(loader, good.as_ptr(), &mut status) });
    assert_eq!((ok, status), (1, ObjStatus::Ok));

    let failed: c_int = unsafe { load_file(loader, bad.as_ptr()) };
    assert_eq!(failed, unsafe { load_file_status(loader, bad.as_ptr(), &mut status) });
    assert_eq!((failed, status), (0, ObjStatus::NotFound));

    delete_loader(loader);
}

#[test]
fn latin1_comments_and_names_still_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("latin1.obj");
    fs::write(
        &path,
        b"# Cr\xe9\xe9 par un exporteur\nv 0 0 0\nv 1 0 0\nv 0 1 0\ng pi\xe9ce\nf 1 2 3\n",
    )
    .unwrap();
    let path = c_path(&path);
    let loader = create_new_loader();

    let mut status = ObjStatus::Panic;
    assert_eq!(unsafe { load_file_status(loader, path.as_ptr(), &mut status) }, 1);
    assert_eq!(status, ObjStatus::Ok);
    let (meshes, count) = collection(loader);
    assert_eq!(count, 1);
    let mesh = mesh_at(meshes, 0);
    assert_eq!(vertex_size_mesh(mesh), 3);
    assert!(name_of(mesh).starts_with("pi"));

    delete_loader(loader);
}

#[test]
fn mesh_bounds_cover_every_vertex() {
    let dir = tempdir().unwrap();
    let path = write_obj(&dir, "car.obj", CAR);
    let loader = create_new_loader();
    unsafe { load_file(loader, path.as_ptr()) };
    let body = mesh_at(collection(loader).0, 0);

    let mut min = [9.0f32; 3];
    let mut max = [9.0f32; 3];
    assert_eq!(
        unsafe { mesh_bounds(body, min.as_mut_ptr(), max.as_mut_ptr()) },
        ObjStatus::Ok
    );
    assert_eq!(min, [0.0, 0.0, 0.0]);
    assert_eq!(max, [1.0, 1.0, 0.0]);
    assert_eq!(
        unsafe { mesh_bounds(body, ptr::null_mut(), max.as_mut_ptr()) },
        ObjStatus::NullPointer
    );

    delete_loader(loader);
    assert_eq!(
        unsafe { mesh_bounds(body, min.as_mut_ptr(), max.as_mut_ptr()) },
        ObjStatus::InvalidHandle
    );
}

#[test]
fn loaders_on_separate_threads_do_not_interfere() {
    let dir = tempdir().unwrap();
    let car = write_obj(&dir, "car.obj", CAR);
    let tri = write_obj(&dir, "tri.obj", TRIANGLE);

    std::thread::scope(|scope| {
        for worker in 0..8 {
            let (path, expected) = if worker % 2 == 0 { (&car, 2) } else { (&tri, 1) };
            scope.spawn(move || {
                for _ in 0..25 {
                    let loader = create_new_loader();
                    assert_eq!(unsafe { load_file(loader, path.as_ptr()) }, 1);
                    let (meshes, count) = collection(loader);
                    assert_eq!(count, expected);
                    for i in 0..count as usize {
                        let mesh = mesh_at(meshes, i);
                        let n = vertex_size_mesh(mesh);
                        assert!(n >= 3);
                        assert_eq!(take_floats(mesh_position_at(mesh, n - 1), 3).len(), 3);
                    }
                    delete_loader(loader);
                    assert_eq!(vertex_size_mesh(mesh_at(meshes, 0)), 0);
                }
            });
        }
    });
}
