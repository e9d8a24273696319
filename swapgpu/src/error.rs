//! Error types for swapgpu
//!
//! Only genuine failures travel through `Result`: device object creation,
//! caller errors such as an out-of-range instance index, or an unknown
//! uniform kind. Degraded-but-usable states (invalid program, missing
//! location, missing capability) are sentinel returns plus a log line.

use std::fmt;

/// Result type for swapgpu operations
pub type Result<T> = std::result::Result<T, Error>;

/// swapgpu errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Device-specific error (object creation failed, lost context, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (unknown name, index out of range, bad data size, etc.)
    InvalidResource(String),

    /// Shader compilation or program link failure, carries the info log
    ShaderCompilation(String),

    /// Uniform kind string not in {int, float, vec2, vec3, vec4, mat4}
    UnknownUniformKind(String),

    /// Optional device capability is not available
    Unsupported(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::ShaderCompilation(msg) => write!(f, "Shader compilation failed: {}", msg),
            Error::UnknownUniformKind(kind) => write!(f, "Unknown uniform kind: {}", kind),
            Error::Unsupported(msg) => write!(f, "Unsupported capability: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
