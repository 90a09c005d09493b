//! Error types for the Nova3D engine
//!
//! This module defines the error types used throughout the engine,
//! including device bootstrap, frame execution and GPU memory management.

use std::fmt;

/// Result type for Nova3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Nova3D engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Direct3D 12, mock device, etc.)
    BackendError(String),

    /// Out of GPU memory (heap creation or committed allocation failed)
    OutOfMemory,

    /// Invalid resource (unknown handle, wrong kind, bad size, etc.)
    InvalidResource(String),

    /// Initialization failed (adapter, device, swap chain, heaps)
    InitializationFailed(String),

    /// The GPU device was removed or reset
    DeviceLost(String),

    /// A pre-sized GPU heap has no room left for a placement
    HeapExhausted {
        /// Heap name (e.g. "default-buffer", "upload-texture[1]")
        heap: String,
        /// Aligned size requested in bytes
        requested: u64,
        /// Bytes still available at the tail of the heap
        available: u64,
    },

    /// An operation was called in the wrong frame state
    InvalidState(String),
}

impl Error {
    /// Whether the error means the device must be recreated
    pub fn is_device_lost(&self) -> bool {
        matches!(self, Error::DeviceLost(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::DeviceLost(msg) => write!(f, "Device lost: {}", msg),
            Error::HeapExhausted { heap, requested, available } => write!(
                f,
                "Heap exhausted: {} needs {} bytes, {} available",
                heap, requested, available
            ),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR and build an `Error::BackendError` with the same message
///
/// # Example
///
/// ```no_run
/// # use nova_3d_engine::engine_err;
/// let err = engine_err!("nova3d::d3d12", "Failed to create fence: {}", 5);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::nova3d::Error::BackendError(message)
    }};
}

/// Log an ERROR and return `Err(Error::BackendError)` from the current function
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

/// Log a WARN and build an `Error::BackendError` with the same message
#[macro_export]
macro_rules! engine_warn_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_warn!($source, "{}", message);
        $crate::nova3d::Error::BackendError(message)
    }};
}

/// Log a WARN and return `Err(Error::BackendError)` from the current function
#[macro_export]
macro_rules! engine_bail_warn {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_warn_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
