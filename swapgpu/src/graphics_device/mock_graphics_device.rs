/// Mock graphics device (no GPU required)
///
/// A headless device that records every call, counts location queries and
/// completeness checks, and emulates texture storage. Programs can be given a
/// CPU "kernel" that stands in for their fragment shader, so multi-pass
/// feedback loops can be verified pixel by pixel.
///
/// Shader "compilation" scans declarations: `attribute`/`in` (vertex stage)
/// and `uniform` statements define what the program exposes. A source without
/// a `main` entry point fails to compile.

use rustc_hash::{FxHashMap, FxHashSet};
use crate::error::{Error, Result};
use crate::graphics_device::{
    Attachment, BufferHandle, BufferTarget, BufferUsage, ClearFlags, ComponentType,
    FramebufferHandle, FramebufferStatus, GraphicsDevice, ImageTarget, IndexType,
    InternalFormat, PixelFormat, PrimitiveMode, ProgramHandle, RenderbufferFormat,
    RenderbufferHandle, ShaderHandle, ShaderStage, TargetKind, TexImageDesc, TextureHandle,
    TextureParameter, UniformLocation, UniformValue, VertexArrayHandle, VertexAttributeLayout,
    ANGLE_INSTANCED_ARRAYS, EXT_TEXTURE_FILTER_ANISOTROPIC, WEBGL_DEPTH_TEXTURE,
};

/// CPU stand-in for a fragment shader
///
/// Receives the RGBA-expanded contents of every texture bound on units
/// `0..n` (in unit order) and returns the pixels to store in the color
/// attachment of the bound framebuffer.
pub type ProgramKernel = Box<dyn Fn(&[Vec<f32>]) -> Vec<f32> + Send>;

// ============================================================================
// Mock object state
// ============================================================================

/// Emulated state of a texture object
#[derive(Debug, Clone)]
pub struct MockTextureState {
    /// Kind the texture was first bound as
    pub kind: Option<TargetKind>,
    /// Width of the last specified image
    pub width: u32,
    /// Height of the last specified image
    pub height: u32,
    /// Channel layout of the last specified image
    pub format: Option<PixelFormat>,
    /// Storage format of the last specified image
    pub internal_format: Option<InternalFormat>,
    /// Texel contents per image slot, one f32 per channel
    pub images: FxHashMap<ImageTarget, Vec<f32>>,
    /// Every sampling parameter applied, in order
    pub parameters: Vec<TextureParameter>,
    /// Number of mip chain generations
    pub mipmap_generations: u32,
    /// Number of `tex_image` calls
    pub specify_count: u32,
}

impl MockTextureState {
    fn new() -> Self {
        Self {
            kind: None,
            width: 0,
            height: 0,
            format: None,
            internal_format: None,
            images: FxHashMap::default(),
            parameters: Vec::new(),
            mipmap_generations: 0,
            specify_count: 0,
        }
    }

    /// Storage component type implied by the internal format
    pub fn storage_type(&self) -> ComponentType {
        match self.internal_format {
            Some(InternalFormat::RGBA32F)
            | Some(InternalFormat::RGB32F)
            | Some(InternalFormat::RG32F)
            | Some(InternalFormat::R32F) => ComponentType::Float,
            Some(InternalFormat::RGBA16F)
            | Some(InternalFormat::RGB16F)
            | Some(InternalFormat::RG16F)
            | Some(InternalFormat::R16F) => ComponentType::HalfFloat,
            Some(InternalFormat::DEPTH_COMPONENT16) | Some(InternalFormat::DEPTH_COMPONENT24) => {
                ComponentType::UnsignedShort
            }
            _ => ComponentType::UnsignedByte,
        }
    }

    /// Contents of the 2D image (or +X face for cube maps)
    pub fn pixels(&self) -> Option<&[f32]> {
        self.images
            .get(&ImageTarget::Texture2D)
            .or_else(|| self.images.values().next())
            .map(|v| v.as_slice())
    }
}

#[derive(Debug, Clone)]
struct MockProgram {
    /// (name, location, slot count)
    attributes: Vec<(String, i32)>,
    uniforms: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct MockVertexArray {
    attributes: FxHashMap<u32, VertexAttributeLayout>,
    index_buffer: Option<BufferHandle>,
}

#[derive(Debug, Clone, Default)]
struct MockFramebuffer {
    color: Option<(ImageTarget, TextureHandle)>,
    depth_texture: Option<TextureHandle>,
    depth_renderbuffer: Option<RenderbufferHandle>,
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

/// Mock GraphicsDevice that tracks created objects and emulates storage
pub struct MockGraphicsDevice {
    next_id: u32,

    /// Every call in submission order
    pub calls: Vec<String>,

    // ----- configuration -----
    float_render_support: bool,
    half_float_render_support: bool,
    extensions: FxHashSet<String>,
    max_anisotropy_level: f32,
    surface_size: (u32, u32),
    failing_calls: FxHashSet<String>,

    // ----- live objects -----
    shaders: FxHashMap<ShaderHandle, (ShaderStage, String)>,
    programs: FxHashMap<ProgramHandle, MockProgram>,
    buffers: FxHashMap<BufferHandle, Vec<u8>>,
    vertex_arrays: FxHashMap<VertexArrayHandle, MockVertexArray>,
    textures: FxHashMap<TextureHandle, MockTextureState>,
    framebuffers: FxHashMap<FramebufferHandle, MockFramebuffer>,
    renderbuffers: FxHashMap<RenderbufferHandle, Option<(RenderbufferFormat, u32, u32)>>,
    uniform_locations: FxHashMap<(ProgramHandle, String), UniformLocation>,
    uniform_names: FxHashMap<UniformLocation, (ProgramHandle, String)>,
    uniform_values: FxHashMap<(ProgramHandle, String), UniformValue>,
    kernels: FxHashMap<ProgramHandle, ProgramKernel>,

    // ----- bound state -----
    current_program: Option<ProgramHandle>,
    bound_vertex_array: Option<VertexArrayHandle>,
    bound_framebuffer: Option<FramebufferHandle>,
    active_unit: u32,
    bound_textures: FxHashMap<u32, (TargetKind, TextureHandle)>,
    last_viewport: Option<(i32, i32, u32, u32)>,

    // ----- spy counters -----
    /// Number of `attrib_location` queries
    pub attrib_location_queries: usize,
    /// Number of `uniform_location` queries
    pub uniform_location_queries: usize,
    /// Number of `framebuffer_status` checks
    pub framebuffer_status_checks: usize,
    /// Number of draw calls of any kind
    pub draw_calls: usize,
}

impl MockGraphicsDevice {
    /// Create a mock device exposing every optional feature
    pub fn new() -> Self {
        let extensions = [
            EXT_TEXTURE_FILTER_ANISOTROPIC,
            ANGLE_INSTANCED_ARRAYS,
            WEBGL_DEPTH_TEXTURE,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self {
            next_id: 1,
            calls: Vec::new(),
            float_render_support: true,
            half_float_render_support: true,
            extensions,
            max_anisotropy_level: 16.0,
            surface_size: (800, 600),
            failing_calls: FxHashSet::default(),
            shaders: FxHashMap::default(),
            programs: FxHashMap::default(),
            buffers: FxHashMap::default(),
            vertex_arrays: FxHashMap::default(),
            textures: FxHashMap::default(),
            framebuffers: FxHashMap::default(),
            renderbuffers: FxHashMap::default(),
            uniform_locations: FxHashMap::default(),
            uniform_names: FxHashMap::default(),
            uniform_values: FxHashMap::default(),
            kernels: FxHashMap::default(),
            current_program: None,
            bound_vertex_array: None,
            bound_framebuffer: None,
            active_unit: 0,
            bound_textures: FxHashMap::default(),
            last_viewport: None,
            attrib_location_queries: 0,
            uniform_location_queries: 0,
            framebuffer_status_checks: 0,
            draw_calls: 0,
        }
    }

    // ===== CONFIGURATION =====

    /// Float (32-bit) color attachments are reported incomplete
    pub fn without_float_render_targets(mut self) -> Self {
        self.float_render_support = false;
        self
    }

    /// Half-float color attachments are reported incomplete
    pub fn without_half_float_render_targets(mut self) -> Self {
        self.half_float_render_support = false;
        self
    }

    /// Hide an optional extension
    pub fn without_extension(mut self, name: &str) -> Self {
        self.extensions.remove(name);
        self
    }

    /// Set the default surface size
    pub fn with_surface_size(mut self, width: u32, height: u32) -> Self {
        self.surface_size = (width, height);
        self
    }

    /// Set the maximum anisotropy level
    pub fn with_max_anisotropy(mut self, level: f32) -> Self {
        self.max_anisotropy_level = level;
        self
    }

    /// Make every later call with this recorded name fail with `OutOfMemory`
    ///
    /// Only fallible calls honor it (`create_*`, `tex_image`).
    pub fn failing_on(mut self, call: &str) -> Self {
        self.fail_on(call);
        self
    }

    pub fn fail_on(&mut self, call: &str) {
        self.failing_calls.insert(call.to_string());
    }

    /// Install a CPU kernel standing in for a program's fragment stage
    pub fn set_program_kernel(&mut self, program: ProgramHandle, kernel: ProgramKernel) {
        self.kernels.insert(program, kernel);
    }

    // ===== INSPECTION =====

    /// Number of recorded calls with the given name
    pub fn call_count(&self, name: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == name).count()
    }

    /// Emulated state of a live texture
    pub fn texture_state(&self, texture: TextureHandle) -> Option<&MockTextureState> {
        self.textures.get(&texture)
    }

    /// Contents of a live buffer
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|v| v.as_slice())
    }

    /// Contents of a live buffer read back as little-endian f32
    pub fn buffer_floats(&self, buffer: BufferHandle) -> Option<Vec<f32>> {
        self.buffers.get(&buffer).map(|bytes| {
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        })
    }

    /// Attribute layout recorded on a vertex array for a location
    pub fn vertex_attribute(&self, vertex_array: VertexArrayHandle, location: u32) -> Option<&VertexAttributeLayout> {
        self.vertex_arrays.get(&vertex_array)?.attributes.get(&location)
    }

    /// Index buffer recorded on a vertex array
    pub fn vertex_array_index_buffer(&self, vertex_array: VertexArrayHandle) -> Option<BufferHandle> {
        self.vertex_arrays.get(&vertex_array)?.index_buffer
    }

    /// Last value uploaded to a uniform by name
    pub fn uniform_value(&self, program: ProgramHandle, name: &str) -> Option<&UniformValue> {
        self.uniform_values.get(&(program, name.to_string()))
    }

    /// Texture attached as color on a framebuffer
    pub fn framebuffer_color(&self, framebuffer: FramebufferHandle) -> Option<TextureHandle> {
        self.framebuffers.get(&framebuffer)?.color.map(|(_, t)| t)
    }

    /// Depth texture attached on a framebuffer
    pub fn framebuffer_depth_texture(&self, framebuffer: FramebufferHandle) -> Option<TextureHandle> {
        self.framebuffers.get(&framebuffer)?.depth_texture
    }

    /// Depth renderbuffer attached on a framebuffer
    pub fn framebuffer_depth_renderbuffer(&self, framebuffer: FramebufferHandle) -> Option<RenderbufferHandle> {
        self.framebuffers.get(&framebuffer)?.depth_renderbuffer
    }

    /// Storage of a renderbuffer
    pub fn renderbuffer_storage_of(&self, renderbuffer: RenderbufferHandle) -> Option<(RenderbufferFormat, u32, u32)> {
        self.renderbuffers.get(&renderbuffer).copied().flatten()
    }

    /// Texture bound on a unit
    pub fn bound_texture(&self, unit: u32) -> Option<TextureHandle> {
        self.bound_textures.get(&unit).map(|(_, t)| *t)
    }

    /// Currently bound framebuffer
    pub fn bound_framebuffer(&self) -> Option<FramebufferHandle> {
        self.bound_framebuffer
    }

    /// Current program
    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }

    /// Last viewport set
    pub fn last_viewport(&self) -> Option<(i32, i32, u32, u32)> {
        self.last_viewport
    }

    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn live_shader_count(&self) -> usize {
        self.shaders.len()
    }

    pub fn live_framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn live_renderbuffer_count(&self) -> usize {
        self.renderbuffers.len()
    }

    pub fn live_vertex_array_count(&self) -> usize {
        self.vertex_arrays.len()
    }

    // ===== INTERNAL HELPERS =====

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn record(&mut self, call: &str) {
        self.calls.push(call.to_string());
    }

    fn injected_failure(&self, call: &str) -> Result<()> {
        if self.failing_calls.contains(call) {
            return Err(Error::OutOfMemory);
        }
        Ok(())
    }

    fn active_texture(&self, kind: TargetKind) -> Option<TextureHandle> {
        self.bound_textures
            .get(&self.active_unit)
            .filter(|(bound_kind, _)| *bound_kind == kind)
            .map(|(_, t)| *t)
    }

    fn render_support(&self, storage: ComponentType) -> bool {
        match storage {
            ComponentType::Float => self.float_render_support,
            ComponentType::HalfFloat => self.half_float_render_support,
            _ => true,
        }
    }

    fn execute_kernel(&mut self, program: ProgramHandle) {
        let Some(framebuffer) = self.bound_framebuffer else { return };
        let Some((target, color)) = self.framebuffers.get(&framebuffer).and_then(|fb| fb.color) else { return };
        let Some(kernel) = self.kernels.get(&program) else { return };

        let mut units: Vec<_> = self.bound_textures.iter().map(|(u, (_, t))| (*u, *t)).collect();
        units.sort_by_key(|(unit, _)| *unit);
        let inputs: Vec<Vec<f32>> = units
            .iter()
            .map(|(_, t)| {
                self.textures
                    .get(t)
                    .and_then(|state| state.pixels())
                    .map(|p| p.to_vec())
                    .unwrap_or_default()
            })
            .collect();

        let output = kernel(&inputs);
        if let Some(state) = self.textures.get_mut(&color) {
            let channels = state.format.map(|f| f.channel_count()).unwrap_or(4) as usize;
            let len = (state.width * state.height) as usize * channels;
            let mut pixels = output;
            pixels.resize(len, 0.0);
            quantize(&mut pixels, state.storage_type());
            state.images.insert(target, pixels);
        }
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Declaration scanning & texel decoding
// ============================================================================

const QUALIFIERS: &[&str] = &["highp", "mediump", "lowp", "flat", "smooth", "centroid"];

/// Scan a shader source for (attribute, type) and uniform declarations
fn scan_declarations(stage: ShaderStage, source: &str) -> (Vec<(String, String)>, Vec<String>) {
    let stripped: String = source
        .lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");

    let mut attributes = Vec::new();
    let mut uniforms = Vec::new();

    for statement in stripped.split(';') {
        let statement = statement.rsplit(|c| c == '{' || c == '}').next().unwrap_or("");
        let tokens: Vec<&str> = statement
            .split_whitespace()
            .filter(|t| !QUALIFIERS.contains(t))
            .collect();
        if tokens.len() < 3 {
            continue;
        }
        let name = tokens[tokens.len() - 1]
            .split('[')
            .next()
            .unwrap_or("")
            .to_string();
        match tokens[0] {
            "attribute" | "in" if stage == ShaderStage::Vertex => {
                attributes.push((name, tokens[1].to_string()));
            }
            "uniform" => uniforms.push(name),
            _ => {}
        }
    }

    (attributes, uniforms)
}

/// Attribute location slots taken by a GLSL type
fn slot_count(glsl_type: &str) -> i32 {
    match glsl_type {
        "mat4" => 4,
        "mat3" => 3,
        "mat2" => 2,
        _ => 1,
    }
}

/// Decode raw upload bytes into one f32 per channel
fn decode_texels(data: &[u8], data_type: ComponentType) -> Vec<f32> {
    match data_type {
        ComponentType::Float => data
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        ComponentType::UnsignedByte => data.iter().map(|b| *b as f32 / 255.0).collect(),
        ComponentType::UnsignedShort => data
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]) as f32 / 65535.0)
            .collect(),
        // Half-float and signed data are stored as undefined (zero) contents
        _ => vec![0.0; data.len() / data_type.size_bytes() as usize],
    }
}

/// Round texels to what the storage format can hold
fn quantize(pixels: &mut [f32], storage: ComponentType) {
    if storage == ComponentType::UnsignedByte {
        for p in pixels.iter_mut() {
            *p = (p.clamp(0.0, 1.0) * 255.0).round() / 255.0;
        }
    }
}

// ============================================================================
// GraphicsDevice implementation
// ============================================================================

impl GraphicsDevice for MockGraphicsDevice {
    fn create_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle> {
        self.record("create_shader");
        if !source.contains("void main") {
            return Err(Error::ShaderCompilation(
                "ERROR: 0:1: '' : missing main() entry point".to_string(),
            ));
        }
        let handle = ShaderHandle(self.allocate_id());
        self.shaders.insert(handle, (stage, source.to_string()));
        Ok(handle)
    }

    fn create_program(&mut self, vertex: ShaderHandle, fragment: ShaderHandle) -> Result<ProgramHandle> {
        self.record("create_program");
        let (vertex_stage, vertex_source) = self.shaders.get(&vertex)
            .cloned()
            .ok_or_else(|| Error::ShaderCompilation("vertex shader object not found".to_string()))?;
        let (fragment_stage, fragment_source) = self.shaders.get(&fragment)
            .cloned()
            .ok_or_else(|| Error::ShaderCompilation("fragment shader object not found".to_string()))?;
        if vertex_stage != ShaderStage::Vertex || fragment_stage != ShaderStage::Fragment {
            return Err(Error::ShaderCompilation("shader stages do not match link slots".to_string()));
        }

        let (vertex_attributes, vertex_uniforms) = scan_declarations(ShaderStage::Vertex, &vertex_source);
        let (_, fragment_uniforms) = scan_declarations(ShaderStage::Fragment, &fragment_source);

        let mut attributes = Vec::new();
        let mut next_location = 0;
        for (name, glsl_type) in vertex_attributes {
            attributes.push((name, next_location));
            next_location += slot_count(&glsl_type);
        }
        let mut uniforms = vertex_uniforms;
        for name in fragment_uniforms {
            if !uniforms.contains(&name) {
                uniforms.push(name);
            }
        }

        let handle = ProgramHandle(self.allocate_id());
        self.programs.insert(handle, MockProgram { attributes, uniforms });
        Ok(handle)
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        self.record("delete_shader");
        self.shaders.remove(&shader);
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.record("delete_program");
        self.programs.remove(&program);
        self.kernels.remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.record("use_program");
        self.current_program = program;
    }

    fn attrib_location(&mut self, program: ProgramHandle, name: &str) -> i32 {
        self.record("attrib_location");
        self.attrib_location_queries += 1;
        self.programs
            .get(&program)
            .and_then(|p| p.attributes.iter().find(|(n, _)| n == name))
            .map(|(_, location)| *location)
            .unwrap_or(-1)
    }

    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.record("uniform_location");
        self.uniform_location_queries += 1;
        let declared = self.programs
            .get(&program)
            .map(|p| p.uniforms.iter().any(|n| n == name))
            .unwrap_or(false);
        if !declared {
            return None;
        }
        let key = (program, name.to_string());
        if let Some(location) = self.uniform_locations.get(&key) {
            return Some(*location);
        }
        let location = UniformLocation(self.allocate_id());
        self.uniform_locations.insert(key.clone(), location);
        self.uniform_names.insert(location, key);
        Some(location)
    }

    fn set_uniform(&mut self, program: ProgramHandle, location: UniformLocation, value: &UniformValue) {
        self.record("set_uniform");
        if let Some((owner, name)) = self.uniform_names.get(&location) {
            if *owner == program {
                self.uniform_values.insert((program, name.clone()), *value);
            }
        }
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8], _usage: BufferUsage) -> Result<BufferHandle> {
        let call = match target {
            BufferTarget::Array => "create_vertex_buffer",
            BufferTarget::ElementArray => "create_index_buffer",
        };
        self.record(call);
        self.injected_failure(call)?;
        let handle = BufferHandle(self.allocate_id());
        self.buffers.insert(handle, data.to_vec());
        Ok(handle)
    }

    fn update_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        self.record("update_buffer");
        if let Some(contents) = self.buffers.get_mut(&buffer) {
            let start = offset as usize;
            let end = start + data.len();
            if end > contents.len() {
                contents.resize(end, 0);
            }
            contents[start..end].copy_from_slice(data);
        }
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.record("delete_buffer");
        self.buffers.remove(&buffer);
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayHandle> {
        self.record("create_vertex_array");
        self.injected_failure("create_vertex_array")?;
        let handle = VertexArrayHandle(self.allocate_id());
        self.vertex_arrays.insert(handle, MockVertexArray::default());
        Ok(handle)
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) {
        self.record("bind_vertex_array");
        self.bound_vertex_array = vertex_array;
    }

    fn set_vertex_attribute(&mut self, location: u32, layout: &VertexAttributeLayout) {
        self.record("set_vertex_attribute");
        if let Some(vao) = self.bound_vertex_array.and_then(|v| self.vertex_arrays.get_mut(&v)) {
            vao.attributes.insert(location, *layout);
        }
    }

    fn bind_index_buffer(&mut self, buffer: Option<BufferHandle>) {
        self.record("bind_index_buffer");
        if let Some(vao) = self.bound_vertex_array.and_then(|v| self.vertex_arrays.get_mut(&v)) {
            vao.index_buffer = buffer;
        }
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.record("delete_vertex_array");
        self.vertex_arrays.remove(&vertex_array);
        if self.bound_vertex_array == Some(vertex_array) {
            self.bound_vertex_array = None;
        }
    }

    fn create_texture(&mut self) -> Result<TextureHandle> {
        self.record("create_texture");
        self.injected_failure("create_texture")?;
        let handle = TextureHandle(self.allocate_id());
        self.textures.insert(handle, MockTextureState::new());
        Ok(handle)
    }

    fn bind_texture(&mut self, unit: u32, kind: TargetKind, texture: Option<TextureHandle>) {
        self.record("bind_texture");
        self.active_unit = unit;
        match texture {
            Some(handle) => {
                if let Some(state) = self.textures.get_mut(&handle) {
                    state.kind.get_or_insert(kind);
                }
                self.bound_textures.insert(unit, (kind, handle));
            }
            None => {
                self.bound_textures.remove(&unit);
            }
        }
    }

    fn tex_image(&mut self, target: ImageTarget, desc: &TexImageDesc, data: Option<&[u8]>) -> Result<()> {
        self.record("tex_image");
        self.injected_failure("tex_image")?;
        let handle = self.active_texture(target.kind())
            .ok_or_else(|| Error::BackendError("tex_image: no texture bound on active unit".to_string()))?;
        let state = self.textures.get_mut(&handle)
            .ok_or_else(|| Error::BackendError("tex_image: texture was deleted".to_string()))?;

        let len = (desc.width as usize)
            .checked_mul(desc.height as usize)
            .and_then(|n| n.checked_mul(desc.format.channel_count() as usize))
            .ok_or(Error::OutOfMemory)?;

        state.width = desc.width;
        state.height = desc.height;
        state.format = Some(desc.format);
        state.internal_format = Some(desc.internal_format);
        state.specify_count += 1;

        let mut pixels = match data {
            Some(bytes) => decode_texels(bytes, desc.data_type),
            None => Vec::new(),
        };
        pixels.resize(len, 0.0);
        quantize(&mut pixels, state.storage_type());
        state.images.insert(target, pixels);
        Ok(())
    }

    fn tex_parameter(&mut self, kind: TargetKind, parameter: TextureParameter) {
        self.record("tex_parameter");
        if let Some(handle) = self.active_texture(kind) {
            if let Some(state) = self.textures.get_mut(&handle) {
                state.parameters.push(parameter);
            }
        }
    }

    fn generate_mipmap(&mut self, kind: TargetKind) {
        self.record("generate_mipmap");
        if let Some(handle) = self.active_texture(kind) {
            if let Some(state) = self.textures.get_mut(&handle) {
                state.mipmap_generations += 1;
            }
        }
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.record("delete_texture");
        self.textures.remove(&texture);
        self.bound_textures.retain(|_, (_, t)| *t != texture);
    }

    fn create_framebuffer(&mut self) -> Result<FramebufferHandle> {
        self.record("create_framebuffer");
        self.injected_failure("create_framebuffer")?;
        let handle = FramebufferHandle(self.allocate_id());
        self.framebuffers.insert(handle, MockFramebuffer::default());
        Ok(handle)
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) {
        self.record("bind_framebuffer");
        self.bound_framebuffer = framebuffer;
    }

    fn attach_texture(&mut self, attachment: Attachment, target: ImageTarget, texture: Option<TextureHandle>) {
        self.record("attach_texture");
        if let Some(fb) = self.bound_framebuffer.and_then(|f| self.framebuffers.get_mut(&f)) {
            match attachment {
                Attachment::Color0 => fb.color = texture.map(|t| (target, t)),
                Attachment::Depth => {
                    fb.depth_texture = texture;
                    if texture.is_some() {
                        fb.depth_renderbuffer = None;
                    }
                }
            }
        }
    }

    fn attach_renderbuffer(&mut self, attachment: Attachment, renderbuffer: Option<RenderbufferHandle>) {
        self.record("attach_renderbuffer");
        if let Some(fb) = self.bound_framebuffer.and_then(|f| self.framebuffers.get_mut(&f)) {
            if attachment == Attachment::Depth {
                fb.depth_renderbuffer = renderbuffer;
                if renderbuffer.is_some() {
                    fb.depth_texture = None;
                }
            }
        }
    }

    fn framebuffer_status(&mut self) -> FramebufferStatus {
        self.record("framebuffer_status");
        self.framebuffer_status_checks += 1;

        let Some(fb) = self.bound_framebuffer.and_then(|f| self.framebuffers.get(&f)) else {
            return FramebufferStatus::Complete;
        };

        let mut size = None;
        if let Some((_, color)) = fb.color {
            let Some(state) = self.textures.get(&color) else {
                return FramebufferStatus::IncompleteAttachment;
            };
            if state.specify_count == 0 || state.width == 0 || state.height == 0 {
                return FramebufferStatus::IncompleteAttachment;
            }
            if !self.render_support(state.storage_type()) {
                return FramebufferStatus::Unsupported;
            }
            size = Some((state.width, state.height));
        }

        let depth_size = match (fb.depth_texture, fb.depth_renderbuffer) {
            (Some(texture), _) => self.textures.get(&texture).map(|s| (s.width, s.height)),
            (None, Some(rb)) => self.renderbuffer_storage_of(rb).map(|(_, w, h)| (w, h)),
            (None, None) => None,
        };

        match (size, depth_size) {
            (None, None) => FramebufferStatus::MissingAttachment,
            (Some(color), Some(depth)) if color != depth => FramebufferStatus::IncompleteDimensions,
            _ => FramebufferStatus::Complete,
        }
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        self.record("delete_framebuffer");
        self.framebuffers.remove(&framebuffer);
        if self.bound_framebuffer == Some(framebuffer) {
            self.bound_framebuffer = None;
        }
    }

    fn create_renderbuffer(&mut self) -> Result<RenderbufferHandle> {
        self.record("create_renderbuffer");
        self.injected_failure("create_renderbuffer")?;
        let handle = RenderbufferHandle(self.allocate_id());
        self.renderbuffers.insert(handle, None);
        Ok(handle)
    }

    fn renderbuffer_storage(&mut self, renderbuffer: RenderbufferHandle, format: RenderbufferFormat, width: u32, height: u32) {
        self.record("renderbuffer_storage");
        if let Some(storage) = self.renderbuffers.get_mut(&renderbuffer) {
            *storage = Some((format, width, height));
        }
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferHandle) {
        self.record("delete_renderbuffer");
        self.renderbuffers.remove(&renderbuffer);
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.record("viewport");
        self.last_viewport = Some((x, y, width, height));
    }

    fn clear(&mut self, flags: ClearFlags, color: [f32; 4]) {
        self.record("clear");
        if !flags.contains(ClearFlags::COLOR) {
            return;
        }
        let Some((target, texture)) = self.bound_framebuffer
            .and_then(|f| self.framebuffers.get(&f))
            .and_then(|fb| fb.color) else { return };
        if let Some(state) = self.textures.get_mut(&texture) {
            let channels = state.format.map(|f| f.channel_count()).unwrap_or(4) as usize;
            let mut pixels: Vec<f32> = (0..(state.width * state.height) as usize)
                .flat_map(|_| color.iter().copied().take(channels))
                .collect();
            quantize(&mut pixels, state.storage_type());
            state.images.insert(target, pixels);
        }
    }

    fn draw_arrays(&mut self, _mode: PrimitiveMode, _first: u32, _count: u32) {
        self.record("draw_arrays");
        self.draw_calls += 1;
        if let Some(program) = self.current_program {
            self.execute_kernel(program);
        }
    }

    fn draw_elements(&mut self, _mode: PrimitiveMode, _count: u32, _index_type: IndexType, _offset: u64) {
        self.record("draw_elements");
        self.draw_calls += 1;
        if let Some(program) = self.current_program {
            self.execute_kernel(program);
        }
    }

    fn draw_arrays_instanced(&mut self, _mode: PrimitiveMode, _first: u32, _count: u32, _instance_count: u32) {
        self.record("draw_arrays_instanced");
        self.draw_calls += 1;
        if let Some(program) = self.current_program {
            self.execute_kernel(program);
        }
    }

    fn draw_elements_instanced(
        &mut self,
        _mode: PrimitiveMode,
        _count: u32,
        _index_type: IndexType,
        _offset: u64,
        _instance_count: u32,
    ) {
        self.record("draw_elements_instanced");
        self.draw_calls += 1;
        if let Some(program) = self.current_program {
            self.execute_kernel(program);
        }
    }

    fn supports_extension(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    fn max_anisotropy(&self) -> f32 {
        self.max_anisotropy_level
    }

    fn drawing_buffer_size(&self) -> (u32, u32) {
        self.surface_size
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
