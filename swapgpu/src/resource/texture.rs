/// Resource-level texture: one 2D or cube image on the device.
///
/// The binding target is a `TargetKind` tag rather than a separate type, so
/// 2D and cube textures share every code path and differ only in which image
/// slots an upload writes.
///
/// Dimensions are undefined until one of the upload operations runs:
///
/// - `upload_from_image`: an 8-bit decoded host image
/// - `upload_from_empty_size`: storage only, contents undefined
/// - `upload_from_raw_data`: typed texels
///
/// Configuration calls (`set_filters`, `set_wrap`, `set_anisotropy`) are
/// idempotent and bracket their device calls with bind/unbind.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use crate::context::{Capability, GpuContext};
use crate::error::Result;
use crate::gpu_bail;
use crate::graphics_device::{
    ComponentType, ImageTarget, PixelFormat, Precision, TargetKind, TexImageDesc, TexelFormat,
    TextureData, TextureFilter, TextureHandle, TextureParameter, TextureWrap,
};

/// Texture shared between a registry and the render target drawing into it
pub type SharedTexture = Arc<Mutex<Texture>>;

/// Lock a shared texture, recovering from poisoning
pub fn lock_shared(texture: &SharedTexture) -> MutexGuard<'_, Texture> {
    texture.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Texture unit used for configuration bind/unbind bracketing
pub const SCRATCH_UNIT: u32 = 0;

/// Decoded 8-bit host image
#[derive(Debug, Clone, Copy)]
pub struct TextureImage<'a> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Tightly packed rows, one byte per channel
    pub pixels: &'a [u8],
}

pub struct Texture {
    ctx: GpuContext,
    handle: TextureHandle,
    kind: TargetKind,
    texel_format: TexelFormat,
    width: u32,
    height: u32,
    specified: bool,
    min_filter: TextureFilter,
    mag_filter: TextureFilter,
    wrap_s: TextureWrap,
    wrap_t: TextureWrap,
    anisotropy: f32,
}

impl Texture {
    /// Create a device texture of the given kind and texel layout
    ///
    /// The context's default filter and wrap mode are applied immediately.
    pub fn new(ctx: &GpuContext, kind: TargetKind, texel_format: TexelFormat) -> Result<Self> {
        let handle = ctx.device().create_texture()?;
        let config = ctx.config();
        let mut texture = Self {
            ctx: ctx.clone(),
            handle,
            kind,
            texel_format,
            width: 0,
            height: 0,
            specified: false,
            min_filter: config.default_filter,
            mag_filter: config.default_filter.as_mag_filter(),
            wrap_s: config.default_wrap,
            wrap_t: config.default_wrap,
            anisotropy: 0.0,
        };
        texture.apply_sampling();
        Ok(texture)
    }

    /// 2D texture shorthand
    pub fn new_2d(ctx: &GpuContext, texel_format: TexelFormat) -> Result<Self> {
        Self::new(ctx, TargetKind::Texture2D, texel_format)
    }

    pub fn into_shared(self) -> SharedTexture {
        Arc::new(Mutex::new(self))
    }

    // ===== UPLOADS =====

    /// Upload a decoded 8-bit image (to every face of a cube texture)
    ///
    /// The texel format becomes the image's channel layout at byte precision.
    pub fn upload_from_image(&mut self, image: &TextureImage<'_>) -> Result<()> {
        let texel_format = TexelFormat::color(image.format, Precision::UnsignedByte);
        check_length(image.pixels.len(), image.width, image.height, image.format)?;

        let previous = std::mem::replace(&mut self.texel_format, texel_format);
        if let Err(err) = self.specify_all(image.width, image.height, ComponentType::UnsignedByte, Some(image.pixels)) {
            self.texel_format = previous;
            return Err(err);
        }
        self.auto_mipmaps();
        Ok(())
    }

    /// Allocate storage of the given size with undefined contents
    pub fn upload_from_empty_size(&mut self, width: u32, height: u32) -> Result<()> {
        self.specify_all(width, height, self.upload_type(), None)
    }

    /// Upload typed texels (to every face of a cube texture)
    ///
    /// Data is converted when its type differs from the texture precision:
    /// floats into byte storage are clamped to [0, 1] and scaled to 255,
    /// bytes into float storage are normalized.
    pub fn upload_from_raw_data(&mut self, data: TextureData<'_>, width: u32, height: u32) -> Result<()> {
        check_length(data.len(), width, height, self.texel_format.format)?;
        let converted = self.convert(data);
        let (data_type, bytes) = match &converted {
            Some((data_type, bytes)) => (*data_type, bytes.as_slice()),
            None => (data.component_type(), data.as_bytes()),
        };
        self.specify_all(width, height, data_type, Some(bytes))?;
        self.auto_mipmaps();
        Ok(())
    }

    /// Upload a distinct image to each cube face (+X, -X, +Y, -Y, +Z, -Z)
    pub fn upload_cube_faces(&mut self, faces: &[TextureData<'_>; 6], width: u32, height: u32) -> Result<()> {
        if self.kind != TargetKind::CubeMap {
            gpu_bail!("swapgpu::Texture", "upload_cube_faces on a {:?} texture", self.kind);
        }
        for face in faces {
            check_length(face.len(), width, height, self.texel_format.format)?;
        }

        self.warn_if_empty(width, height);
        let mut device = self.ctx.device();
        device.bind_texture(SCRATCH_UNIT, self.kind, Some(self.handle));
        let uploaded = ImageTarget::all_for(self.kind).iter().zip(faces.iter()).try_for_each(|(target, face)| {
            let converted = self.convert(*face);
            let (data_type, bytes) = match &converted {
                Some((data_type, bytes)) => (*data_type, bytes.as_slice()),
                None => (face.component_type(), face.as_bytes()),
            };
            device.tex_image(*target, &self.image_desc(width, height, data_type), Some(bytes))
        });
        device.bind_texture(SCRATCH_UNIT, self.kind, None);
        drop(device);
        uploaded?;

        self.width = width;
        self.height = height;
        self.specified = true;
        self.auto_mipmaps();
        Ok(())
    }

    /// Generate the full mip chain from the base level
    pub fn generate_mipmaps(&self) {
        let mut device = self.ctx.device();
        device.bind_texture(SCRATCH_UNIT, self.kind, Some(self.handle));
        device.generate_mipmap(self.kind);
        device.bind_texture(SCRATCH_UNIT, self.kind, None);
    }

    // ===== SAMPLING CONFIGURATION =====

    /// Set minification and magnification filters
    pub fn set_filters(&mut self, min: TextureFilter, mag: TextureFilter) {
        self.min_filter = min;
        self.mag_filter = mag.as_mag_filter();
        self.with_bound(|device, kind, this| {
            device.tex_parameter(kind, TextureParameter::MinFilter(this.min_filter));
            device.tex_parameter(kind, TextureParameter::MagFilter(this.mag_filter));
        });
    }

    /// Use one filter for both directions (mip variants magnify with their base filter)
    pub fn set_filter(&mut self, filter: TextureFilter) {
        self.set_filters(filter, filter);
    }

    pub fn set_wrap(&mut self, wrap_s: TextureWrap, wrap_t: TextureWrap) {
        self.wrap_s = wrap_s;
        self.wrap_t = wrap_t;
        self.with_bound(|device, kind, this| {
            device.tex_parameter(kind, TextureParameter::WrapS(this.wrap_s));
            device.tex_parameter(kind, TextureParameter::WrapT(this.wrap_t));
        });
    }

    /// Set the anisotropy level, clamped to the device maximum
    ///
    /// No-op when anisotropic filtering is unavailable.
    pub fn set_anisotropy(&mut self, level: f32) {
        if !self.ctx.supports(Capability::AnisotropicFiltering) {
            crate::gpu_debug!("swapgpu::Texture", "Anisotropy unavailable, ignoring level {}", level);
            return;
        }
        let level = level.clamp(1.0, self.ctx.max_anisotropy().max(1.0));
        self.anisotropy = level;
        self.with_bound(|device, kind, _| {
            device.tex_parameter(kind, TextureParameter::MaxAnisotropy(level));
        });
    }

    // ===== BINDING =====

    /// Bind to a texture unit for sampling
    pub fn bind(&self, unit: u32) {
        self.ctx.device().bind_texture(unit, self.kind, Some(self.handle));
    }

    pub fn unbind(&self, unit: u32) {
        self.ctx.device().bind_texture(unit, self.kind, None);
    }

    // ===== ACCESSORS =====

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
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

    /// True once any upload has specified the image
    pub fn is_specified(&self) -> bool {
        self.specified
    }

    pub fn texel_format(&self) -> TexelFormat {
        self.texel_format
    }

    pub fn precision(&self) -> Precision {
        self.texel_format.precision()
    }

    pub fn filters(&self) -> (TextureFilter, TextureFilter) {
        (self.min_filter, self.mag_filter)
    }

    pub fn wrap(&self) -> (TextureWrap, TextureWrap) {
        (self.wrap_s, self.wrap_t)
    }

    /// Applied anisotropy level (0.0 when never set)
    pub fn anisotropy(&self) -> f32 {
        self.anisotropy
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    /// Release the device texture
    pub fn delete(self) {
        self.ctx.device().delete_texture(self.handle);
    }

    // ===== INTERNALS =====

    /// Re-specify the image at its current size (contents become undefined)
    pub(crate) fn respecify(&mut self) -> Result<()> {
        self.specify_all(self.width, self.height, self.upload_type(), None)
    }

    fn with_bound(&self, configure: impl FnOnce(&mut dyn crate::graphics_device::GraphicsDevice, TargetKind, &Self)) {
        let mut device = self.ctx.device();
        device.bind_texture(SCRATCH_UNIT, self.kind, Some(self.handle));
        configure(&mut *device, self.kind, self);
        device.bind_texture(SCRATCH_UNIT, self.kind, None);
    }

    fn apply_sampling(&mut self) {
        self.with_bound(|device, kind, this| {
            device.tex_parameter(kind, TextureParameter::MinFilter(this.min_filter));
            device.tex_parameter(kind, TextureParameter::MagFilter(this.mag_filter));
            device.tex_parameter(kind, TextureParameter::WrapS(this.wrap_s));
            device.tex_parameter(kind, TextureParameter::WrapT(this.wrap_t));
        });
    }

    fn auto_mipmaps(&self) {
        if self.min_filter.uses_mipmaps() {
            self.generate_mipmaps();
        }
    }

    /// Component type of data handed to the device for this texture's storage
    ///
    /// Half-float storage is fed 32-bit floats.
    fn upload_type(&self) -> ComponentType {
        match self.texel_format.component_type {
            ComponentType::HalfFloat => ComponentType::Float,
            other => other,
        }
    }

    fn image_desc(&self, width: u32, height: u32, data_type: ComponentType) -> TexImageDesc {
        TexImageDesc {
            width,
            height,
            format: self.texel_format.format,
            internal_format: self.texel_format.internal_format,
            data_type,
        }
    }

    /// Convert data whose type does not match the storage precision
    fn convert(&self, data: TextureData<'_>) -> Option<(ComponentType, Vec<u8>)> {
        match (self.texel_format.precision(), data) {
            (Precision::UnsignedByte, TextureData::F32(floats)) if !self.is_depth() => Some((
                ComponentType::UnsignedByte,
                floats.iter().map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8).collect(),
            )),
            (Precision::Float | Precision::HalfFloat, TextureData::U8(bytes)) => {
                let floats: Vec<f32> = bytes.iter().map(|b| *b as f32 / 255.0).collect();
                Some((ComponentType::Float, bytemuck::cast_slice(&floats).to_vec()))
            }
            _ => None,
        }
    }

    fn is_depth(&self) -> bool {
        self.texel_format.format == PixelFormat::DepthComponent
    }

    fn warn_if_empty(&self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            crate::gpu_warn!("swapgpu::Texture", "Zero-sized upload {}x{} on {:?}", width, height, self.handle);
        }
    }

    fn specify_all(&mut self, width: u32, height: u32, data_type: ComponentType, data: Option<&[u8]>) -> Result<()> {
        self.warn_if_empty(width, height);
        let desc = self.image_desc(width, height, data_type);

        let mut device = self.ctx.device();
        device.bind_texture(SCRATCH_UNIT, self.kind, Some(self.handle));
        let uploaded = ImageTarget::all_for(self.kind)
            .iter()
            .try_for_each(|target| device.tex_image(*target, &desc, data));
        device.bind_texture(SCRATCH_UNIT, self.kind, None);
        drop(device);
        uploaded?;

        self.width = width;
        self.height = height;
        self.specified = true;
        Ok(())
    }
}

/// Reject data shorter than `width * height * channels` components
fn check_length(len: usize, width: u32, height: u32, format: PixelFormat) -> Result<()> {
    let Some(expected) = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(format.channel_count() as usize))
    else {
        gpu_bail!("swapgpu::Texture", "Upload of {}x{} {:?} overflows the addressable size", width, height, format);
    };
    if len < expected {
        gpu_bail!("swapgpu::Texture",
            "Upload of {}x{} {:?} needs {} components, got {}",
            width, height, format, expected, len);
    }
    Ok(())
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
