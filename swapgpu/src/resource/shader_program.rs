/// ShaderProgram - a linked vertex + fragment pair with cached locations
///
/// Compilation never fails loudly: a compile or link error is logged and the
/// program becomes invalid. Every operation on an invalid program is a no-op
/// returning its sentinel (-1, `None`, `false`).
///
/// Attribute and uniform locations are resolved on first use and cached,
/// absent names included, so the device is queried once per name.

use std::hash::{Hash, Hasher};
use rustc_hash::{FxHashMap, FxHasher};
use crate::context::GpuContext;
use crate::error::{Error, Result};
use crate::graphics_device::{ProgramHandle, ShaderStage, UniformKind, UniformLocation, UniformValue};

/// Declarations prepended to every vertex shader
pub const VERTEX_HEADER: &str = "uniform mat4 modelMatrix;\nuniform mat4 viewMatrix;\nuniform mat4 projectionMatrix;\n";

/// Declarations prepended to every fragment shader
pub const FRAGMENT_HEADER: &str = "precision highp float;\n";

/// Uniform names owned by the vertex header
pub const HEADER_UNIFORMS: [&str; 3] = ["modelMatrix", "viewMatrix", "projectionMatrix"];

pub struct ShaderProgram {
    ctx: GpuContext,
    /// `None` when compilation or linking failed
    program: Option<ProgramHandle>,
    /// Identity of the sources the program was built from
    source_hash: u64,
    attribute_locations: FxHashMap<String, i32>,
    uniform_locations: FxHashMap<String, Option<UniformLocation>>,
}

impl ShaderProgram {
    /// Compile and link a program
    ///
    /// Always returns a `ShaderProgram`; check `is_valid()` to know whether
    /// the device accepted it.
    pub fn new(ctx: &GpuContext, vertex_source: &str, fragment_source: &str) -> Self {
        let program = match compile(ctx, vertex_source, fragment_source) {
            Ok(handle) => {
                crate::gpu_debug!("swapgpu::ShaderProgram", "Linked program {:?}", handle);
                Some(handle)
            }
            Err(e) => {
                crate::gpu_error!("swapgpu::ShaderProgram", "Program is invalid: {}", e);
                None
            }
        };

        Self {
            ctx: ctx.clone(),
            program,
            source_hash: source_identity(vertex_source, fragment_source),
            attribute_locations: FxHashMap::default(),
            uniform_locations: FxHashMap::default(),
        }
    }

    /// True if the program compiled and linked
    pub fn is_valid(&self) -> bool {
        self.program.is_some()
    }

    /// Device handle, `None` for an invalid program
    pub fn handle(&self) -> Option<ProgramHandle> {
        self.program
    }

    /// Hash of the vertex and fragment sources the program was built from
    pub fn source_hash(&self) -> u64 {
        self.source_hash
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    /// Make this program current. Returns false for an invalid program.
    pub fn bind(&self) -> bool {
        match self.program {
            Some(handle) => {
                self.ctx.device().use_program(Some(handle));
                true
            }
            None => false,
        }
    }

    pub fn unbind(&self) {
        self.ctx.device().use_program(None);
    }

    /// Location of a vertex attribute, -1 if absent (or program invalid)
    pub fn attrib_location(&mut self, name: &str) -> i32 {
        let Some(handle) = self.program else { return -1 };
        if let Some(location) = self.attribute_locations.get(name) {
            return *location;
        }
        let location = self.ctx.device().attrib_location(handle, name);
        if location < 0 {
            crate::gpu_trace!("swapgpu::ShaderProgram", "Attribute '{}' not active in {:?}", name, handle);
        }
        self.attribute_locations.insert(name.to_string(), location);
        location
    }

    /// Location of a uniform, `None` if absent (or program invalid)
    pub fn uniform_location(&mut self, name: &str) -> Option<UniformLocation> {
        let handle = self.program?;
        if let Some(location) = self.uniform_locations.get(name) {
            return *location;
        }
        let location = self.ctx.device().uniform_location(handle, name);
        self.uniform_locations.insert(name.to_string(), location);
        location
    }

    /// Upload a typed uniform value
    ///
    /// Returns false (and does nothing) when the program is invalid or the
    /// uniform is not active.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) -> bool {
        let Some(handle) = self.program else { return false };
        let Some(location) = self.uniform_location(name) else { return false };
        self.ctx.device().set_uniform(handle, location, &value.into());
        true
    }

    /// Upload a uniform described by a kind string (`int`, `float`, `vec2`,
    /// `vec3`, `vec4`, `mat4`) and raw scalars
    ///
    /// `Ok(false)` means the upload was skipped (inactive uniform or invalid
    /// program). An unknown kind or a scalar count that does not match the
    /// kind is an error.
    pub fn set_uniform_kind(&mut self, name: &str, kind: &str, data: &[f32]) -> Result<bool> {
        let kind: UniformKind = match kind.parse() {
            Ok(kind) => kind,
            Err(e) => {
                crate::gpu_error!("swapgpu::ShaderProgram", "Uniform '{}': {}", name, e);
                return Err(e);
            }
        };
        let value = UniformValue::from_kind(kind, data).map_err(|e| {
            crate::gpu_error!("swapgpu::ShaderProgram", "Uniform '{}': {}", name, e);
            e
        })?;
        Ok(self.set_uniform(name, value))
    }

    /// Recompile from new sources
    ///
    /// Identical sources keep the current program. On failure the previous
    /// program stays in place and false is returned. A successful rebuild
    /// drops every cached location.
    pub fn reload(&mut self, vertex_source: &str, fragment_source: &str) -> bool {
        let hash = source_identity(vertex_source, fragment_source);
        if hash == self.source_hash && self.program.is_some() {
            return true;
        }

        match compile(&self.ctx, vertex_source, fragment_source) {
            Ok(handle) => {
                if let Some(old) = self.program.replace(handle) {
                    self.ctx.device().delete_program(old);
                }
                self.source_hash = hash;
                self.attribute_locations.clear();
                self.uniform_locations.clear();
                crate::gpu_debug!("swapgpu::ShaderProgram", "Reloaded program as {:?}", handle);
                true
            }
            Err(e) => {
                crate::gpu_error!("swapgpu::ShaderProgram", "Reload failed, keeping previous program: {}", e);
                false
            }
        }
    }

    /// Release the device program
    pub fn delete(self) {
        if let Some(handle) = self.program {
            self.ctx.device().delete_program(handle);
        }
    }
}

// ============================================================================
// Compilation
// ============================================================================

/// Insert `header` after a leading `#version` line, or at the very start
fn with_header(source: &str, header: &str) -> String {
    let trimmed = source.trim_start();
    if trimmed.starts_with("#version") {
        match trimmed.split_once('\n') {
            Some((version, rest)) => format!("{}\n{}{}", version, header, rest),
            None => format!("{}\n{}", trimmed, header),
        }
    } else {
        format!("{}{}", header, source)
    }
}

fn source_identity(vertex_source: &str, fragment_source: &str) -> u64 {
    let mut hasher = FxHasher::default();
    vertex_source.hash(&mut hasher);
    fragment_source.hash(&mut hasher);
    hasher.finish()
}

fn compile(ctx: &GpuContext, vertex_source: &str, fragment_source: &str) -> Result<ProgramHandle> {
    let (vertex, fragment) = if ctx.config().prepend_shader_header {
        for name in HEADER_UNIFORMS {
            if vertex_source.contains(&format!("uniform mat4 {};", name)) {
                crate::gpu_warn!("swapgpu::ShaderProgram",
                    "Vertex source redeclares header uniform '{}'", name);
            }
        }
        (with_header(vertex_source, VERTEX_HEADER), with_header(fragment_source, FRAGMENT_HEADER))
    } else {
        (vertex_source.to_string(), fragment_source.to_string())
    };

    let mut device = ctx.device();
    let vs = device.create_shader(ShaderStage::Vertex, &vertex)?;
    let fs = match device.create_shader(ShaderStage::Fragment, &fragment) {
        Ok(fs) => fs,
        Err(e) => {
            device.delete_shader(vs);
            return Err(e);
        }
    };
    let linked = device.create_program(vs, fs);
    device.delete_shader(vs);
    device.delete_shader(fs);

    linked.map_err(|e| match e {
        Error::ShaderCompilation(log) => Error::ShaderCompilation(format!("link: {}", log)),
        other => other,
    })
}

#[cfg(test)]
#[path = "shader_program_tests.rs"]
mod tests;
