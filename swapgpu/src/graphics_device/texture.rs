/// Texture formats, sampling parameters and upload descriptors

use crate::graphics_device::ComponentType;

/// Texture binding target, selects 2D vs cube upload and bind behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetKind {
    #[default]
    Texture2D,
    CubeMap,
}

/// One face of a cube map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

/// Image slot of a texture that receives pixel data or a framebuffer attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageTarget {
    Texture2D,
    CubeFace(CubeFace),
}

impl ImageTarget {
    const TEXTURE_2D: [ImageTarget; 1] = [ImageTarget::Texture2D];
    const CUBE_FACES: [ImageTarget; 6] = [
        ImageTarget::CubeFace(CubeFace::PositiveX),
        ImageTarget::CubeFace(CubeFace::NegativeX),
        ImageTarget::CubeFace(CubeFace::PositiveY),
        ImageTarget::CubeFace(CubeFace::NegativeY),
        ImageTarget::CubeFace(CubeFace::PositiveZ),
        ImageTarget::CubeFace(CubeFace::NegativeZ),
    ];

    /// All image slots of a texture of the given kind
    pub fn all_for(kind: TargetKind) -> &'static [ImageTarget] {
        match kind {
            TargetKind::Texture2D => &Self::TEXTURE_2D,
            TargetKind::CubeMap => &Self::CUBE_FACES,
        }
    }

    /// The binding target this image slot belongs to
    pub fn kind(&self) -> TargetKind {
        match self {
            ImageTarget::Texture2D => TargetKind::Texture2D,
            ImageTarget::CubeFace(_) => TargetKind::CubeMap,
        }
    }
}

/// Channel layout of pixel data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgba,
    Rgb,
    Rg,
    Red,
    Alpha,
    Luminance,
    LuminanceAlpha,
    DepthComponent,
}

impl PixelFormat {
    /// Number of channels per texel
    pub fn channel_count(&self) -> u32 {
        match self {
            PixelFormat::Rgba => 4,
            PixelFormat::Rgb => 3,
            PixelFormat::Rg | PixelFormat::LuminanceAlpha => 2,
            PixelFormat::Red
            | PixelFormat::Alpha
            | PixelFormat::Luminance
            | PixelFormat::DepthComponent => 1,
        }
    }
}

/// Sized storage format of a texture on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum InternalFormat {
    RGBA8,
    RGB8,
    RG8,
    R8,
    ALPHA8,
    LUMINANCE8,
    LUMINANCE8_ALPHA8,
    RGBA16F,
    RGB16F,
    RG16F,
    R16F,
    RGBA32F,
    RGB32F,
    RG32F,
    R32F,
    DEPTH_COMPONENT16,
    DEPTH_COMPONENT24,
}

impl InternalFormat {
    /// Derive the sized format for a channel layout at a given precision
    pub fn resolve(format: PixelFormat, precision: Precision) -> Self {
        use InternalFormat::*;
        match (format, precision) {
            (PixelFormat::Rgba, Precision::Float) => RGBA32F,
            (PixelFormat::Rgba, Precision::HalfFloat) => RGBA16F,
            (PixelFormat::Rgba, Precision::UnsignedByte) => RGBA8,
            (PixelFormat::Rgb, Precision::Float) => RGB32F,
            (PixelFormat::Rgb, Precision::HalfFloat) => RGB16F,
            (PixelFormat::Rgb, Precision::UnsignedByte) => RGB8,
            (PixelFormat::Rg, Precision::Float) => RG32F,
            (PixelFormat::Rg, Precision::HalfFloat) => RG16F,
            (PixelFormat::Rg, Precision::UnsignedByte) => RG8,
            (PixelFormat::Red, Precision::Float) => R32F,
            (PixelFormat::Red, Precision::HalfFloat) => R16F,
            (PixelFormat::Red, Precision::UnsignedByte) => R8,
            (PixelFormat::Alpha, _) => ALPHA8,
            (PixelFormat::Luminance, _) => LUMINANCE8,
            (PixelFormat::LuminanceAlpha, _) => LUMINANCE8_ALPHA8,
            (PixelFormat::DepthComponent, Precision::UnsignedByte) => DEPTH_COMPONENT16,
            (PixelFormat::DepthComponent, _) => DEPTH_COMPONENT24,
        }
    }
}

/// Texel precision used for color textures
///
/// Ordered from most to least precise; falling back walks down the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    Float,
    HalfFloat,
    UnsignedByte,
}

impl Precision {
    /// Component type of texel storage at this precision
    pub fn component_type(&self) -> ComponentType {
        match self {
            Precision::Float => ComponentType::Float,
            Precision::HalfFloat => ComponentType::HalfFloat,
            Precision::UnsignedByte => ComponentType::UnsignedByte,
        }
    }
}

/// Full description of a texture's texel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TexelFormat {
    /// Channel layout
    pub format: PixelFormat,
    /// Sized storage format
    pub internal_format: InternalFormat,
    /// Component type of stored texels
    pub component_type: ComponentType,
}

impl TexelFormat {
    /// Color format with the given channel layout and precision
    pub fn color(format: PixelFormat, precision: Precision) -> Self {
        Self {
            format,
            internal_format: InternalFormat::resolve(format, precision),
            component_type: precision.component_type(),
        }
    }

    /// RGBA color format at the given precision
    pub fn rgba(precision: Precision) -> Self {
        Self::color(PixelFormat::Rgba, precision)
    }

    /// Depth format used for samplable depth attachments
    pub fn depth() -> Self {
        Self {
            format: PixelFormat::DepthComponent,
            internal_format: InternalFormat::DEPTH_COMPONENT16,
            component_type: ComponentType::UnsignedShort,
        }
    }

    /// Precision implied by the component type
    pub fn precision(&self) -> Precision {
        match self.component_type {
            ComponentType::Float => Precision::Float,
            ComponentType::HalfFloat => Precision::HalfFloat,
            _ => Precision::UnsignedByte,
        }
    }

    /// Same channel layout re-derived at another precision
    pub fn with_precision(&self, precision: Precision) -> Self {
        Self::color(self.format, precision)
    }

    /// True for 32-bit or 16-bit floating point storage
    pub fn is_floating_point(&self) -> bool {
        matches!(self.component_type, ComponentType::Float | ComponentType::HalfFloat)
    }
}

impl Default for TexelFormat {
    fn default() -> Self {
        Self::rgba(Precision::UnsignedByte)
    }
}

/// Descriptor for a single `tex_image` upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexImageDesc {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub internal_format: InternalFormat,
    /// Component type of the supplied data (may differ from storage, e.g.
    /// f32 data into a half-float texture)
    pub data_type: ComponentType,
}

/// Texture minification / magnification filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFilter {
    Nearest,
    #[default]
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl TextureFilter {
    /// True if the filter samples mip levels
    pub fn uses_mipmaps(&self) -> bool {
        !matches!(self, TextureFilter::Nearest | TextureFilter::Linear)
    }

    /// Filter usable for magnification (mip variants collapse to their base)
    pub fn as_mag_filter(&self) -> TextureFilter {
        match self {
            TextureFilter::Nearest
            | TextureFilter::NearestMipmapNearest
            | TextureFilter::NearestMipmapLinear => TextureFilter::Nearest,
            _ => TextureFilter::Linear,
        }
    }
}

/// Texture coordinate wrapping mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureWrap {
    Repeat,
    #[default]
    ClampToEdge,
    MirroredRepeat,
}

/// Sampling parameter applied to the currently bound texture
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureParameter {
    MinFilter(TextureFilter),
    MagFilter(TextureFilter),
    WrapS(TextureWrap),
    WrapT(TextureWrap),
    MaxAnisotropy(f32),
}

/// Borrowed raw texel data
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureData<'a> {
    U8(&'a [u8]),
    U16(&'a [u16]),
    F32(&'a [f32]),
}

impl<'a> TextureData<'a> {
    /// Component type of the data
    pub fn component_type(&self) -> ComponentType {
        match self {
            TextureData::U8(_) => ComponentType::UnsignedByte,
            TextureData::U16(_) => ComponentType::UnsignedShort,
            TextureData::F32(_) => ComponentType::Float,
        }
    }

    /// Number of scalar components
    pub fn len(&self) -> usize {
        match self {
            TextureData::U8(data) => data.len(),
            TextureData::U16(data) => data.len(),
            TextureData::F32(data) => data.len(),
        }
    }

    /// True if there is no data
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw byte view
    pub fn as_bytes(&self) -> &'a [u8] {
        match self {
            TextureData::U8(data) => data,
            TextureData::U16(data) => bytemuck::cast_slice(data),
            TextureData::F32(data) => bytemuck::cast_slice(data),
        }
    }
}
