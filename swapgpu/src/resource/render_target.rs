/// RenderTarget - a framebuffer with a color texture and optional depth.
///
/// The color texture is either owned (created and deleted by the target) or
/// external (supplied by the caller, never deleted here). Depth is either an
/// opaque renderbuffer or a samplable depth texture.
///
/// Color texture dimensions track the target size: `update_with_size` keeps
/// them in sync when asked to resize the color texture, and warns when the
/// two diverge.

use crate::context::{Capability, GpuContext};
use crate::error::Result;
use crate::graphics_device::{
    Attachment, ClearFlags, FramebufferHandle, FramebufferStatus, ImageTarget, RenderbufferFormat,
    RenderbufferHandle, TexelFormat, TextureFilter, TextureHandle,
};
use crate::resource::texture::{lock_shared, SharedTexture, Texture};

/// Construction parameters of a `RenderTarget`
#[derive(Clone)]
pub struct RenderTargetDesc {
    pub width: u32,
    pub height: u32,
    /// Requested color layout; float precisions degrade to what the device can render
    pub texel_format: TexelFormat,
    /// Filter of an owned color texture (`None` = context default)
    pub filter: Option<TextureFilter>,
    /// Attach a depth buffer
    pub depth: bool,
    /// Depth as a renderbuffer (true) or as a samplable depth texture (false)
    pub use_depth_renderbuffer: bool,
    /// Externally owned color texture; the target never deletes it
    pub color_texture: Option<SharedTexture>,
}

impl RenderTargetDesc {
    /// Depth-less RGBA8 target
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            texel_format: TexelFormat::default(),
            filter: None,
            depth: false,
            use_depth_renderbuffer: true,
            color_texture: None,
        }
    }

    pub fn with_texel_format(mut self, texel_format: TexelFormat) -> Self {
        self.texel_format = texel_format;
        self
    }

    pub fn with_filter(mut self, filter: TextureFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Attach depth as a renderbuffer or as a depth texture
    pub fn with_depth(mut self, use_renderbuffer: bool) -> Self {
        self.depth = true;
        self.use_depth_renderbuffer = use_renderbuffer;
        self
    }

    pub fn with_color_texture(mut self, texture: SharedTexture) -> Self {
        self.color_texture = Some(texture);
        self
    }
}

enum ColorAttachment {
    Owned(SharedTexture),
    External(SharedTexture),
}

impl ColorAttachment {
    fn texture(&self) -> &SharedTexture {
        match self {
            ColorAttachment::Owned(texture) | ColorAttachment::External(texture) => texture,
        }
    }

    /// Handle to delete with the target (external textures are left alone)
    fn owned_handle(&self) -> Option<TextureHandle> {
        match self {
            ColorAttachment::Owned(texture) => Some(lock_shared(texture).handle()),
            ColorAttachment::External(_) => None,
        }
    }
}

enum DepthAttachment {
    Renderbuffer(RenderbufferHandle),
    Texture(Texture),
}

pub struct RenderTarget {
    ctx: GpuContext,
    framebuffer: FramebufferHandle,
    color: ColorAttachment,
    depth: Option<DepthAttachment>,
    width: u32,
    height: u32,
    depth_requested: bool,
    use_depth_renderbuffer: bool,
}

impl RenderTarget {
    /// Create the framebuffer and its attachments
    ///
    /// An owned color texture requesting float or half-float precision the
    /// device cannot render into is created at the best precision available
    /// instead.
    pub fn new(ctx: &GpuContext, desc: RenderTargetDesc) -> Result<Self> {
        let color = match desc.color_texture {
            Some(texture) => ColorAttachment::External(texture),
            None => {
                let texel_format = resolve_color_format(ctx, desc.texel_format);
                let texture = create_color_texture(ctx, texel_format, desc.filter, desc.width, desc.height)?;
                ColorAttachment::Owned(texture.into_shared())
            }
        };

        let created = ctx.device().create_framebuffer();
        let framebuffer = match created {
            Ok(framebuffer) => framebuffer,
            Err(err) => {
                if let Some(handle) = color.owned_handle() {
                    ctx.device().delete_texture(handle);
                }
                return Err(err);
            }
        };
        let mut target = Self {
            ctx: ctx.clone(),
            framebuffer,
            color,
            depth: None,
            width: desc.width,
            height: desc.height,
            depth_requested: desc.depth,
            use_depth_renderbuffer: desc.use_depth_renderbuffer,
        };
        if let Err(err) = target.update_with_size(desc.width, desc.height, false) {
            target.delete();
            return Err(err);
        }

        crate::gpu_debug!("swapgpu::RenderTarget", "Framebuffer {:?} {}x{} ({})",
            framebuffer, desc.width, desc.height,
            if target.owns_color_texture() { "owned color" } else { "external color" });
        Ok(target)
    }

    /// Resize and re-attach everything
    ///
    /// With `also_resize_color_texture` the color texture is re-specified at
    /// the new size (contents undefined). Without it the color texture is
    /// left alone; a size mismatch is reported.
    pub fn update_with_size(&mut self, width: u32, height: u32, also_resize_color_texture: bool) -> Result<()> {
        {
            let mut color = lock_shared(self.color.texture());
            if also_resize_color_texture {
                color.upload_from_empty_size(width, height)?;
            } else if color.size() != (width, height) {
                crate::gpu_warn!("swapgpu::RenderTarget",
                    "Color texture is {}x{}, target is {}x{}",
                    color.width(), color.height(), width, height);
            }
        }
        self.width = width;
        self.height = height;

        // Probe before taking the device lock
        let depth_texture_supported = self.depth_requested
            && !self.use_depth_renderbuffer
            && self.ctx.supports(Capability::DepthTexture);

        if self.depth_requested && !self.use_depth_renderbuffer {
            if depth_texture_supported {
                match &mut self.depth {
                    Some(DepthAttachment::Texture(texture)) => texture.upload_from_empty_size(width, height)?,
                    _ => {
                        let mut texture = Texture::new_2d(&self.ctx, TexelFormat::depth())?;
                        texture.set_filter(TextureFilter::Nearest);
                        if let Err(err) = texture.upload_from_empty_size(width, height) {
                            texture.delete();
                            return Err(err);
                        }
                        self.depth = Some(DepthAttachment::Texture(texture));
                    }
                }
            } else {
                crate::gpu_error!("swapgpu::RenderTarget",
                    "Depth textures unsupported, framebuffer {:?} continues without depth",
                    self.framebuffer);
                self.depth_requested = false;
            }
        }

        let color_handle = lock_shared(self.color.texture()).handle();
        let mut device = self.ctx.device();

        if self.depth_requested && self.use_depth_renderbuffer {
            let renderbuffer = match self.depth {
                Some(DepthAttachment::Renderbuffer(renderbuffer)) => renderbuffer,
                _ => {
                    let renderbuffer = device.create_renderbuffer()?;
                    self.depth = Some(DepthAttachment::Renderbuffer(renderbuffer));
                    renderbuffer
                }
            };
            device.renderbuffer_storage(renderbuffer, RenderbufferFormat::DEPTH_COMPONENT16, width, height);
        }

        device.bind_framebuffer(Some(self.framebuffer));
        device.attach_texture(Attachment::Color0, ImageTarget::Texture2D, Some(color_handle));
        match &self.depth {
            Some(DepthAttachment::Renderbuffer(renderbuffer)) => {
                device.attach_renderbuffer(Attachment::Depth, Some(*renderbuffer));
            }
            Some(DepthAttachment::Texture(texture)) => {
                device.attach_texture(Attachment::Depth, ImageTarget::Texture2D, Some(texture.handle()));
            }
            None => {}
        }

        if self.ctx.config().enable_validation {
            let status = device.framebuffer_status();
            if !status.is_complete() {
                crate::gpu_warn!("swapgpu::RenderTarget", "Framebuffer {:?} incomplete: {:?}",
                    self.framebuffer, status);
            }
        }
        device.bind_framebuffer(None);
        Ok(())
    }

    /// Re-specify the color texture at its current size (contents undefined)
    ///
    /// Attachments are left untouched.
    pub fn reset(&mut self) -> Result<()> {
        lock_shared(self.color.texture()).respecify()
    }

    /// Direct draws into this target and set the viewport to its size
    pub fn bind(&self) {
        let mut device = self.ctx.device();
        device.bind_framebuffer(Some(self.framebuffer));
        device.viewport(0, 0, self.width, self.height);
    }

    /// Return to the default surface and its viewport
    pub fn unbind(&self) {
        let mut device = self.ctx.device();
        let (width, height) = device.drawing_buffer_size();
        device.bind_framebuffer(None);
        device.viewport(0, 0, width, height);
    }

    /// Clear color (and depth when attached), leaving the target unbound
    pub fn clear(&self, color: [f32; 4]) {
        let flags = if self.depth.is_some() {
            ClearFlags::COLOR | ClearFlags::DEPTH
        } else {
            ClearFlags::COLOR
        };
        let mut device = self.ctx.device();
        device.bind_framebuffer(Some(self.framebuffer));
        device.clear(flags, color);
        device.bind_framebuffer(None);
    }

    /// Completeness of the framebuffer as currently attached
    pub fn status(&self) -> FramebufferStatus {
        let mut device = self.ctx.device();
        device.bind_framebuffer(Some(self.framebuffer));
        let status = device.framebuffer_status();
        device.bind_framebuffer(None);
        status
    }

    // ===== ACCESSORS =====

    pub fn framebuffer(&self) -> FramebufferHandle {
        self.framebuffer
    }

    pub fn color_texture(&self) -> &SharedTexture {
        self.color.texture()
    }

    pub fn owns_color_texture(&self) -> bool {
        matches!(self.color, ColorAttachment::Owned(_))
    }

    pub fn has_depth(&self) -> bool {
        self.depth.is_some()
    }

    pub fn depth_renderbuffer(&self) -> Option<RenderbufferHandle> {
        match self.depth {
            Some(DepthAttachment::Renderbuffer(renderbuffer)) => Some(renderbuffer),
            _ => None,
        }
    }

    pub fn depth_texture(&self) -> Option<&Texture> {
        match &self.depth {
            Some(DepthAttachment::Texture(texture)) => Some(texture),
            _ => None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Release the framebuffer, depth attachment and owned color texture
    pub fn delete(self) {
        let color_handle = self.color.owned_handle();

        let mut device = self.ctx.device();
        device.delete_framebuffer(self.framebuffer);
        match &self.depth {
            Some(DepthAttachment::Renderbuffer(renderbuffer)) => device.delete_renderbuffer(*renderbuffer),
            Some(DepthAttachment::Texture(texture)) => device.delete_texture(texture.handle()),
            None => {}
        }
        if let Some(handle) = color_handle {
            device.delete_texture(handle);
        }
    }
}

fn create_color_texture(
    ctx: &GpuContext,
    texel_format: TexelFormat,
    filter: Option<TextureFilter>,
    width: u32,
    height: u32,
) -> Result<Texture> {
    let mut texture = Texture::new_2d(ctx, texel_format)?;
    if let Some(filter) = filter {
        texture.set_filter(filter);
    }
    if let Err(err) = texture.upload_from_empty_size(width, height) {
        texture.delete();
        return Err(err);
    }
    Ok(texture)
}

/// Degrade a floating-point color request to what the device renders into
fn resolve_color_format(ctx: &GpuContext, requested: TexelFormat) -> TexelFormat {
    if !requested.is_floating_point() {
        return requested;
    }
    let precision = ctx.renderable_precision(requested.precision());
    if precision != requested.precision() {
        crate::gpu_debug!("swapgpu::RenderTarget", "Color precision {:?} downgraded to {:?}",
            requested.precision(), precision);
    }
    requested.with_precision(precision)
}

#[cfg(test)]
#[path = "render_target_tests.rs"]
mod tests;
