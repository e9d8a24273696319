//! Unit tests for error.rs
//!
//! Tests all Error variants and their implementations (Display, Debug, Clone, std::error::Error).

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("context lost".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("context lost"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("texture 'A' not registered".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Invalid resource"));
    assert!(display.contains("texture 'A' not registered"));
}

#[test]
fn test_shader_compilation_display() {
    let err = Error::ShaderCompilation("ERROR: 0:3: 'foo' : undeclared identifier".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Shader compilation failed"));
    assert!(display.contains("undeclared identifier"));
}

#[test]
fn test_unknown_uniform_kind_display() {
    let err = Error::UnknownUniformKind("mat3x2".to_string());
    assert_eq!(format!("{}", err), "Unknown uniform kind: mat3x2");
}

#[test]
fn test_unsupported_display() {
    let err = Error::Unsupported("WEBGL_depth_texture".to_string());
    assert!(format!("{}", err).contains("WEBGL_depth_texture"));
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_debug() {
    let debug = format!("{:?}", Error::BackendError("test".to_string()));
    assert!(debug.contains("BackendError"));
    assert!(format!("{:?}", Error::OutOfMemory).contains("OutOfMemory"));
}

#[test]
fn test_error_clone_and_eq() {
    let err = Error::InvalidResource("x".to_string());
    assert_eq!(err.clone(), err);
    assert_ne!(err, Error::OutOfMemory);
}

// ============================================================================
// RESULT ALIAS
// ============================================================================

#[test]
fn test_result_propagation() {
    fn inner() -> Result<u32> {
        Err(Error::Unsupported("instancing".to_string()))
    }
    fn outer() -> Result<u32> {
        let value = inner()?;
        Ok(value + 1)
    }
    assert_eq!(outer(), Err(Error::Unsupported("instancing".to_string())));
}
