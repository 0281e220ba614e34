//! Errors raised at the binding boundary and their C status codes.

use asset::{LoadError, LoadErrorKind};
use thiserror::Error;

pub type BindingResult<T> = Result<T, BindingError>;

#[derive(Debug, Error)]
pub enum BindingError {
    /// Null, released or never issued handle.
    #[error("stale or unknown handle")]
    InvalidHandle,

    /// Live handle of a different kind (e.g. a mesh passed as a loader).
    #[error("handle refers to a different kind of object")]
    WrongKind,

    #[error("index {index} out of range (len={len})")]
    OutOfRange { index: usize, len: usize },

    #[error("null pointer argument")]
    NullPointer,

    #[error("path is not valid UTF-8")]
    InvalidPath,

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Status code reported across the C boundary.
#[repr(C)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ObjStatus {
    Ok = 0,
    NotFound = 1,
    Io = 2,
    UnsupportedFormat = 3,
    Parse = 4,
    InvalidHandle = 5,
    OutOfRange = 6,
    NullPointer = 7,
    InvalidPath = 8,
    Panic = 9,
}

impl ObjStatus {
    /// NUL-terminated description, usable as a C string.
    pub fn message(self) -> &'static str {
        match self {
            Self::Ok => "ok\0",
            Self::NotFound => "file not found\0",
            Self::Io => "I/O error\0",
            Self::UnsupportedFormat => "unsupported file format\0",
            Self::Parse => "OBJ parse error\0",
            Self::InvalidHandle => "invalid handle\0",
            Self::OutOfRange => "index out of range\0",
            Self::NullPointer => "null pointer argument\0",
            Self::InvalidPath => "path is not valid UTF-8\0",
            Self::Panic => "internal panic\0",
        }
    }

    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => Self::Ok,
            1 => Self::NotFound,
            2 => Self::Io,
            3 => Self::UnsupportedFormat,
            4 => Self::Parse,
            5 => Self::InvalidHandle,
            6 => Self::OutOfRange,
            7 => Self::NullPointer,
            8 => Self::InvalidPath,
            9 => Self::Panic,
            _ => return None,
        })
    }
}

impl BindingError {
    pub fn status(&self) -> ObjStatus {
        match self {
            Self::InvalidHandle | Self::WrongKind => ObjStatus::InvalidHandle,
            Self::OutOfRange { .. } => ObjStatus::OutOfRange,
            Self::NullPointer => ObjStatus::NullPointer,
            Self::InvalidPath => ObjStatus::InvalidPath,
            Self::Load(err) => match err.kind() {
                LoadErrorKind::NotFound => ObjStatus::NotFound,
                LoadErrorKind::Io => ObjStatus::Io,
                LoadErrorKind::UnsupportedFormat => ObjStatus::UnsupportedFormat,
                LoadErrorKind::Parse => ObjStatus::Parse,
            },
        }
    }
}

impl<T> From<&BindingResult<T>> for ObjStatus {
    fn from(result: &BindingResult<T>) -> Self {
        match result {
            Ok(_) => ObjStatus::Ok,
            Err(err) => err.status(),
        }
    }
}
