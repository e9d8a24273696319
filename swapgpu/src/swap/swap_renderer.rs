/// SwapRenderer - name-keyed registry of textures, targets and full-screen passes.
///
/// Textures and render targets live in two maps keyed by the same names (a
/// target wraps the texture registered under its name). `swap(a, b)` moves
/// the map entries, never texel data, so a pass reading "A" and writing "B"
/// followed by `swap("A", "B")` reads its own output on the next run.

use std::sync::{Arc, PoisonError};
use rustc_hash::FxHashMap;
use crate::context::GpuContext;
use crate::error::Result;
use crate::gpu_bail;
use crate::graphics_device::{Precision, TexelFormat, TextureData, TextureFilter, UniformValue};
use crate::resource::drawable::Drawable;
use crate::resource::geometry::{AttributeDesc, GeometryBuffer, POSITION_ATTRIBUTE};
use crate::resource::render_target::{RenderTarget, RenderTargetDesc};
use crate::resource::shader_program::ShaderProgram;
use crate::resource::texture::{lock_shared, SharedTexture, Texture};

/// Texture coordinate attribute of the full-screen quad
pub const UV_ATTRIBUTE: &str = "uv";

/// Full-screen quad corners in clip space (2 components per vertex)
pub const QUAD_POSITIONS: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0];
pub const QUAD_UVS: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

// ============================================================================
// TEXTURE DESCRIPTION
// ============================================================================

/// Parameters of a registry texture
#[derive(Debug, Clone, Copy)]
pub struct SwapTextureDesc<'a> {
    pub width: u32,
    pub height: u32,
    /// Initial texels (RGBA); `None` leaves contents undefined
    pub data: Option<TextureData<'a>>,
    /// Min and mag filter (`None` = context default)
    pub filter: Option<TextureFilter>,
    /// Forced precision (`None` = best renderable precision of the device)
    pub precision: Option<Precision>,
}

impl<'a> SwapTextureDesc<'a> {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, data: None, filter: None, precision: None }
    }

    pub fn with_data(mut self, data: TextureData<'a>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_filter(mut self, filter: TextureFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = Some(precision);
        self
    }
}

// ============================================================================
// SWAP RENDERER
// ============================================================================

pub struct SwapRenderer {
    ctx: GpuContext,
    quad: Arc<GeometryBuffer>,
    textures: FxHashMap<String, SharedTexture>,
    render_targets: FxHashMap<String, RenderTarget>,
    passes: FxHashMap<String, Drawable>,
    active_pass: Option<String>,
}

impl SwapRenderer {
    /// Create an empty registry and its full-screen quad
    pub fn new(ctx: &GpuContext) -> Result<Self> {
        let mut quad = GeometryBuffer::new(ctx);
        quad.add_attribute(POSITION_ATTRIBUTE, AttributeDesc::floats(&QUAD_POSITIONS, 2))?;
        quad.add_attribute(UV_ATTRIBUTE, AttributeDesc::floats(&QUAD_UVS, 2))?;
        quad.add_index(QUAD_INDICES.to_vec())?;

        Ok(Self {
            ctx: ctx.clone(),
            quad: Arc::new(quad),
            textures: FxHashMap::default(),
            render_targets: FxHashMap::default(),
            passes: FxHashMap::default(),
            active_pass: None,
        })
    }

    // ===== REGISTRATION =====

    /// Create an RGBA texture and register it under `name`
    ///
    /// Without a forced precision the texture uses the most precise format
    /// the device can render into.
    ///
    /// # Errors
    ///
    /// Returns an error if a texture with the same name already exists.
    pub fn create_texture(&mut self, name: &str, desc: SwapTextureDesc<'_>) -> Result<&SharedTexture> {
        if self.textures.contains_key(name) {
            gpu_bail!("swapgpu::SwapRenderer", "Texture '{}' already exists", name);
        }

        let precision = desc.precision.unwrap_or_else(|| self.ctx.best_precision());
        let mut texture = Texture::new_2d(&self.ctx, TexelFormat::rgba(precision))?;
        if let Some(filter) = desc.filter {
            texture.set_filter(filter);
        }
        match desc.data {
            Some(data) => texture.upload_from_raw_data(data, desc.width, desc.height)?,
            None => texture.upload_from_empty_size(desc.width, desc.height)?,
        }

        crate::gpu_debug!("swapgpu::SwapRenderer", "Texture '{}' {}x{} {:?}",
            name, desc.width, desc.height, precision);
        Ok(&*self.textures.entry(name.to_string()).or_insert(texture.into_shared()))
    }

    /// Wrap the texture registered under `name` in a depth-less render target
    ///
    /// # Errors
    ///
    /// Returns an error if no texture is registered under `name` or a target
    /// with that name already exists.
    pub fn create_render_target(&mut self, name: &str, width: u32, height: u32) -> Result<&RenderTarget> {
        if self.render_targets.contains_key(name) {
            gpu_bail!("swapgpu::SwapRenderer", "RenderTarget '{}' already exists", name);
        }
        let Some(texture) = self.textures.get(name) else {
            gpu_bail!("swapgpu::SwapRenderer", "No texture '{}' to render into", name);
        };

        let desc = RenderTargetDesc::new(width, height).with_color_texture(texture.clone());
        let target = RenderTarget::new(&self.ctx, desc)?;
        Ok(&*self.render_targets.entry(name.to_string()).or_insert(target))
    }

    /// Compile a shader pair into a full-screen pass registered under `name`
    ///
    /// A shader that fails to compile still registers the pass; it is logged
    /// and draws nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if a pass with the same name already exists.
    pub fn create_pass(&mut self, name: &str, vertex_source: &str, fragment_source: &str) -> Result<&mut Drawable> {
        if self.passes.contains_key(name) {
            gpu_bail!("swapgpu::SwapRenderer", "Pass '{}' already exists", name);
        }

        let program = ShaderProgram::new(&self.ctx, vertex_source, fragment_source);
        if !program.is_valid() {
            crate::gpu_warn!("swapgpu::SwapRenderer", "Pass '{}' has no valid program", name);
        }
        let drawable = Drawable::new(&self.ctx, program, self.quad.clone())?;
        Ok(self.passes.entry(name.to_string()).or_insert(drawable))
    }

    // ===== PASS SELECTION / UNIFORMS =====

    /// Make `name` the pass drawn by `run` and the target of uniform calls
    ///
    /// Returns false (active pass unchanged) if no such pass exists.
    pub fn use_program(&mut self, name: &str) -> bool {
        if !self.passes.contains_key(name) {
            crate::gpu_warn!("swapgpu::SwapRenderer", "No pass '{}'", name);
            return false;
        }
        if self.active_pass.as_deref() != Some(name) {
            self.active_pass = Some(name.to_string());
        }
        true
    }

    /// Set a uniform on the active pass. False when there is none or the uniform is inactive.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) -> bool {
        match self.active_drawable_mut() {
            Some(pass) => pass.set_uniform(name, value),
            None => false,
        }
    }

    /// Set a uniform on the active pass from a kind string (`"float"`, `"vec3"`, ...)
    pub fn set_uniform_kind(&mut self, name: &str, kind: &str, data: &[f32]) -> Result<bool> {
        match self.active_drawable_mut() {
            Some(pass) => pass.set_uniform_kind(name, kind, data),
            None => Ok(false),
        }
    }

    // ===== EXECUTION =====

    /// Draw the active pass
    ///
    /// The output target (or the default surface when `output` is `None`) is
    /// bound with its viewport, and `inputs[i]` is bound to texture unit `i`.
    /// Names are not validated: an unknown input leaves its unit untouched and
    /// an unknown output draws to the default surface. Returns false when no
    /// pass is active or its program is invalid.
    pub fn run(&mut self, inputs: &[&str], output: Option<&str>) -> bool {
        let Some(pass) = self.active_pass.as_deref().and_then(|name| self.passes.get_mut(name)) else {
            crate::gpu_warn!("swapgpu::SwapRenderer", "run() without an active pass");
            return false;
        };

        let target = output.and_then(|name| self.render_targets.get(name));
        match target {
            Some(target) => target.bind(),
            None => bind_default_surface(&self.ctx),
        }

        for (unit, name) in inputs.iter().enumerate() {
            if let Some(texture) = self.textures.get(*name) {
                lock_shared(texture).bind(unit as u32);
            }
        }

        let drawn = pass.draw();

        for (unit, name) in inputs.iter().enumerate() {
            if let Some(texture) = self.textures.get(*name) {
                lock_shared(texture).unbind(unit as u32);
            }
        }
        if let Some(target) = target {
            target.unbind();
        }
        drawn
    }

    /// Exchange the texture and render target registered under `a` and `b`
    ///
    /// Only map entries move. When one name is unregistered in a map, the
    /// other's entry moves over to it. Swapping twice restores the original
    /// bindings.
    pub fn swap(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        swap_entries(&mut self.textures, a, b);
        swap_entries(&mut self.render_targets, a, b);
    }

    /// Resize every render target and its color texture (contents undefined)
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        for target in self.render_targets.values_mut() {
            target.update_with_size(width, height, true)?;
        }
        crate::gpu_debug!("swapgpu::SwapRenderer", "Resized {} targets to {}x{}",
            self.render_targets.len(), width, height);
        Ok(())
    }

    // ===== ACCESSORS =====

    pub fn get_texture(&self, name: &str) -> Option<&SharedTexture> {
        self.textures.get(name)
    }

    pub fn get_render_target(&self, name: &str) -> Option<&RenderTarget> {
        self.render_targets.get(name)
    }

    pub fn pass(&self, name: &str) -> Option<&Drawable> {
        self.passes.get(name)
    }

    pub fn pass_mut(&mut self, name: &str) -> Option<&mut Drawable> {
        self.passes.get_mut(name)
    }

    /// Name of the pass `run` draws
    pub fn active_pass(&self) -> Option<&str> {
        self.active_pass.as_deref()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn render_target_count(&self) -> usize {
        self.render_targets.len()
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Shared full-screen quad every pass draws
    pub fn quad(&self) -> &Arc<GeometryBuffer> {
        &self.quad
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    /// Release every pass, target and texture plus the quad
    ///
    /// Textures are released even if the caller still holds clones of them.
    pub fn delete(self) {
        for (_, pass) in self.passes {
            pass.delete();
        }
        match Arc::try_unwrap(self.quad) {
            Ok(quad) => quad.delete(),
            Err(_) => crate::gpu_warn!("swapgpu::SwapRenderer", "Quad geometry still shared, not deleted"),
        }

        for (_, target) in self.render_targets {
            target.delete();
        }
        for (name, texture) in self.textures {
            match Arc::try_unwrap(texture) {
                Ok(texture) => texture.into_inner().unwrap_or_else(PoisonError::into_inner).delete(),
                Err(shared) => {
                    crate::gpu_debug!("swapgpu::SwapRenderer", "Texture '{}' still referenced, deleting anyway", name);
                    let handle = lock_shared(&shared).handle();
                    self.ctx.device().delete_texture(handle);
                }
            }
        }
    }

    // ===== INTERNALS =====

    fn active_drawable_mut(&mut self) -> Option<&mut Drawable> {
        let name = self.active_pass.as_deref()?;
        self.passes.get_mut(name)
    }
}

/// Target the default surface with a full-surface viewport
fn bind_default_surface(ctx: &GpuContext) {
    let mut device = ctx.device();
    let (width, height) = device.drawing_buffer_size();
    device.bind_framebuffer(None);
    device.viewport(0, 0, width, height);
}

/// Exchange the values under two keys, reusing the owned keys
fn swap_entries<V>(map: &mut FxHashMap<String, V>, a: &str, b: &str) {
    let first = map.remove_entry(a);
    let second = map.remove_entry(b);
    match (first, second) {
        (Some((key_a, value_a)), Some((key_b, value_b))) => {
            map.insert(key_a, value_b);
            map.insert(key_b, value_a);
        }
        (Some((_, value_a)), None) => {
            map.insert(b.to_string(), value_a);
        }
        (None, Some((_, value_b))) => {
            map.insert(a.to_string(), value_b);
        }
        (None, None) => {}
    }
}

#[cfg(test)]
#[path = "swap_renderer_tests.rs"]
mod tests;
