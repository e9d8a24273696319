/// Configuration shared by every resource created from a `GpuContext`

use crate::graphics_device::{TextureFilter, TextureWrap};

/// Context configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Label used in log lines to tell contexts apart
    pub label: String,
    /// Check framebuffer completeness on every render target (re)configuration
    pub enable_validation: bool,
    /// Filter applied to textures created without an explicit one
    pub default_filter: TextureFilter,
    /// Wrap mode applied to new textures
    pub default_wrap: TextureWrap,
    /// Prepend the standard matrix uniform declarations to vertex shaders
    pub prepend_shader_header: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            label: "swapgpu".to_string(),
            enable_validation: cfg!(debug_assertions),
            default_filter: TextureFilter::Linear,
            default_wrap: TextureWrap::ClampToEdge,
            prepend_shader_header: true,
        }
    }
}

impl Config {
    /// Default configuration with a custom label
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
