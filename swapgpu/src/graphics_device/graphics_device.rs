/// GraphicsDevice trait - the host-supplied device context
///
/// swapgpu never creates or destroys the device. The host wraps its already
/// initialized context in a type implementing this trait and hands it over
/// as `Arc<Mutex<dyn GraphicsDevice>>`.

use crate::error::Result;
use crate::graphics_device::{
    Attachment, BufferTarget, BufferUsage, ClearFlags, FramebufferStatus, ImageTarget,
    IndexType, PrimitiveMode, RenderbufferFormat, ShaderStage, TargetKind, TexImageDesc,
    TextureParameter, UniformValue, VertexAttributeLayout,
};

// ============================================================================
// Handles
// ============================================================================

macro_rules! device_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);
    };
}

device_handle!(
    /// Compiled shader object
    ShaderHandle
);
device_handle!(
    /// Linked program object
    ProgramHandle
);
device_handle!(
    /// Vertex or index buffer object
    BufferHandle
);
device_handle!(
    /// Vertex layout object (vertex array)
    VertexArrayHandle
);
device_handle!(
    /// Texture object (2D or cube)
    TextureHandle
);
device_handle!(
    /// Framebuffer object
    FramebufferHandle
);
device_handle!(
    /// Renderbuffer object (non-samplable attachment storage)
    RenderbufferHandle
);
device_handle!(
    /// Resolved uniform location within a program
    UniformLocation
);

/// Extension name gating anisotropic filtering
pub const EXT_TEXTURE_FILTER_ANISOTROPIC: &str = "EXT_texture_filter_anisotropic";
/// Extension name gating instanced draw calls
pub const ANGLE_INSTANCED_ARRAYS: &str = "ANGLE_instanced_arrays";
/// Extension name gating depth textures
pub const WEBGL_DEPTH_TEXTURE: &str = "WEBGL_depth_texture";

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// Device command surface
///
/// GL-style: texture and framebuffer configuration act on whatever object is
/// currently bound. All calls are submitted in order on a single queue.
/// Only object creation and compilation report failure; everything else is
/// fire-and-forget and surfaces device errors through the backend's own
/// reporting.
pub trait GraphicsDevice: Send {
    // ===== SHADERS & PROGRAMS =====

    /// Compile a shader stage. `Err` carries the compiler info log.
    fn create_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle>;

    /// Link a vertex + fragment pair. `Err` carries the linker info log.
    fn create_program(&mut self, vertex: ShaderHandle, fragment: ShaderHandle) -> Result<ProgramHandle>;

    fn delete_shader(&mut self, shader: ShaderHandle);

    fn delete_program(&mut self, program: ProgramHandle);

    /// Make a program current (`None` unbinds)
    fn use_program(&mut self, program: Option<ProgramHandle>);

    /// Location of a vertex attribute, -1 if the program does not use it
    fn attrib_location(&mut self, program: ProgramHandle, name: &str) -> i32;

    /// Location of a uniform, `None` if the program does not use it
    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Upload a uniform value to a program
    fn set_uniform(&mut self, program: ProgramHandle, location: UniformLocation, value: &UniformValue);

    // ===== BUFFERS =====

    /// Create a buffer and upload its full contents
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) -> Result<BufferHandle>;

    /// Overwrite a byte range of an existing buffer
    fn update_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]);

    fn delete_buffer(&mut self, buffer: BufferHandle);

    // ===== VERTEX LAYOUT OBJECTS =====

    fn create_vertex_array(&mut self) -> Result<VertexArrayHandle>;

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>);

    /// Enable an attribute location on the bound vertex array and describe its source
    fn set_vertex_attribute(&mut self, location: u32, layout: &VertexAttributeLayout);

    /// Bind an index buffer into the bound vertex array
    fn bind_index_buffer(&mut self, buffer: Option<BufferHandle>);

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    // ===== TEXTURES =====

    fn create_texture(&mut self) -> Result<TextureHandle>;

    /// Bind a texture to a texture unit; the unit becomes the active unit
    fn bind_texture(&mut self, unit: u32, kind: TargetKind, texture: Option<TextureHandle>);

    /// Specify an image of the texture bound on the active unit
    ///
    /// `data = None` allocates storage with undefined contents.
    fn tex_image(&mut self, target: ImageTarget, desc: &TexImageDesc, data: Option<&[u8]>) -> Result<()>;

    /// Set a sampling parameter on the texture bound on the active unit
    fn tex_parameter(&mut self, kind: TargetKind, parameter: TextureParameter);

    /// Generate the mip chain of the texture bound on the active unit
    fn generate_mipmap(&mut self, kind: TargetKind);

    fn delete_texture(&mut self, texture: TextureHandle);

    // ===== FRAMEBUFFERS & RENDERBUFFERS =====

    fn create_framebuffer(&mut self) -> Result<FramebufferHandle>;

    /// Bind a framebuffer (`None` = default device surface)
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>);

    /// Attach a texture image to the bound framebuffer (`None` detaches)
    fn attach_texture(&mut self, attachment: Attachment, target: ImageTarget, texture: Option<TextureHandle>);

    /// Attach a renderbuffer to the bound framebuffer (`None` detaches)
    fn attach_renderbuffer(&mut self, attachment: Attachment, renderbuffer: Option<RenderbufferHandle>);

    /// Completeness of the bound framebuffer
    fn framebuffer_status(&mut self) -> FramebufferStatus;

    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle);

    fn create_renderbuffer(&mut self) -> Result<RenderbufferHandle>;

    fn renderbuffer_storage(&mut self, renderbuffer: RenderbufferHandle, format: RenderbufferFormat, width: u32, height: u32);

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferHandle);

    // ===== FRAME OPERATIONS =====

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);

    fn clear(&mut self, flags: ClearFlags, color: [f32; 4]);

    fn draw_arrays(&mut self, mode: PrimitiveMode, first: u32, count: u32);

    fn draw_elements(&mut self, mode: PrimitiveMode, count: u32, index_type: IndexType, offset: u64);

    fn draw_arrays_instanced(&mut self, mode: PrimitiveMode, first: u32, count: u32, instance_count: u32);

    fn draw_elements_instanced(
        &mut self,
        mode: PrimitiveMode,
        count: u32,
        index_type: IndexType,
        offset: u64,
        instance_count: u32,
    );

    // ===== QUERIES =====

    /// True if the named optional extension is exposed
    fn supports_extension(&self, name: &str) -> bool;

    /// Maximum anisotropy level (only meaningful when anisotropy is supported)
    fn max_anisotropy(&self) -> f32;

    /// Size of the default device surface in pixels
    fn drawing_buffer_size(&self) -> (u32, u32);
}
