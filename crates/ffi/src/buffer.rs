//! Memory handed to, or filled for, foreign callers.

use std::{ffi::c_char, ptr};

/// Move `values` to the heap and give up ownership. Pair with [`free_floats`].
pub fn alloc_floats(values: &[f32]) -> *mut f32 {
    let boxed: Box<[f32]> = values.into();
    Box::into_raw(boxed) as *mut f32
}

/// Reclaim a buffer produced by [`alloc_floats`].
///
/// # Safety
/// `ptr` must come from `alloc_floats` with exactly `len` elements and must
/// not have been freed already.
pub unsafe fn free_floats(ptr: *mut f32, len: usize) {
    if ptr.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)) });
}

/// Copy `values` into a caller-provided buffer of at least `values.len()` floats.
///
/// # Safety
/// `out` must be non-null and valid for `values.len()` writes.
pub unsafe fn write_floats(values: &[f32], out: *mut f32) {
    unsafe { ptr::copy_nonoverlapping(values.as_ptr(), out, values.len()) };
}

/// Copy `text` into `buf` as a NUL-terminated string truncated to `cap` bytes.
/// Returns the full length of `text` so callers can retry with a bigger buffer.
///
/// # Safety
/// `buf` must be null or valid for `cap` writes.
pub unsafe fn write_c_string(text: &str, buf: *mut c_char, cap: usize) -> usize {
    let bytes = text.as_bytes();
    if !buf.is_null() && cap > 0 {
        let n = bytes.len().min(cap - 1);
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), buf, n);
            *buf.add(n) = 0;
        }
    }
    bytes.len()
}
