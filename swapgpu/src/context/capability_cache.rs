/// Capability cache - memoized optional-feature queries
///
/// Extension-backed capabilities consult the device's extension list.
/// Renderable precision is probed by actually rendering into a 1x1 target,
/// since an advertised extension does not guarantee a complete framebuffer.

use std::sync::{Mutex, OnceLock, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use rustc_hash::FxHashMap;
use crate::context::GpuContext;
use crate::graphics_device::{
    Attachment, ComponentType, GraphicsDevice, ImageTarget, Precision, TargetKind, TexImageDesc,
    TexelFormat, TextureFilter, TextureParameter, ANGLE_INSTANCED_ARRAYS,
    EXT_TEXTURE_FILTER_ANISOTROPIC, WEBGL_DEPTH_TEXTURE,
};

/// Optional device feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    AnisotropicFiltering,
    /// 32-bit float color attachments
    FloatRenderTarget,
    /// 16-bit float color attachments
    HalfFloatRenderTarget,
    Instancing,
    DepthTexture,
}

/// Per-context memoization of capability probes
///
/// A capability is resolved on first query and never probed again.
pub struct CapabilityCache {
    resolved: Mutex<FxHashMap<Capability, bool>>,
    max_anisotropy: OnceLock<f32>,
    fallback_warned: AtomicBool,
}

impl CapabilityCache {
    pub(crate) fn new() -> Self {
        Self {
            resolved: Mutex::new(FxHashMap::default()),
            max_anisotropy: OnceLock::new(),
            fallback_warned: AtomicBool::new(false),
        }
    }

    /// Resolve a capability, probing the device only on first query
    pub fn probe(&self, ctx: &GpuContext, capability: Capability) -> bool {
        let mut resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(supported) = resolved.get(&capability) {
            return *supported;
        }

        let supported = {
            let mut device = ctx.device();
            match capability {
                Capability::AnisotropicFiltering => device.supports_extension(EXT_TEXTURE_FILTER_ANISOTROPIC),
                Capability::Instancing => device.supports_extension(ANGLE_INSTANCED_ARRAYS),
                Capability::DepthTexture => device.supports_extension(WEBGL_DEPTH_TEXTURE),
                Capability::FloatRenderTarget => probe_renderable(&mut *device, Precision::Float),
                Capability::HalfFloatRenderTarget => probe_renderable(&mut *device, Precision::HalfFloat),
            }
        };

        crate::gpu_info!("swapgpu::CapabilityCache", "[{}] {:?}: {}",
            ctx.config().label,
            capability,
            if supported { "supported" } else { "unsupported" });

        resolved.insert(capability, supported);
        supported
    }

    /// Already-resolved value of a capability, without probing
    pub fn cached(&self, capability: Capability) -> Option<bool> {
        self.resolved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&capability)
            .copied()
    }

    /// Number of capabilities resolved so far
    pub fn resolved_count(&self) -> usize {
        self.resolved.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Maximum anisotropy level, 0.0 when anisotropic filtering is absent
    pub fn max_anisotropy(&self, ctx: &GpuContext) -> f32 {
        *self.max_anisotropy.get_or_init(|| {
            if self.probe(ctx, Capability::AnisotropicFiltering) {
                ctx.device().max_anisotropy()
            } else {
                0.0
            }
        })
    }

    /// Most precise renderable color precision: Float, then HalfFloat, then UnsignedByte
    ///
    /// Falling back is degraded but functional; it is reported once per context.
    pub fn best_precision(&self, ctx: &GpuContext) -> Precision {
        if self.probe(ctx, Capability::FloatRenderTarget) {
            return Precision::Float;
        }

        let fallback = if self.probe(ctx, Capability::HalfFloatRenderTarget) {
            Precision::HalfFloat
        } else {
            Precision::UnsignedByte
        };

        if !self.fallback_warned.swap(true, Ordering::Relaxed) {
            crate::gpu_warn!("swapgpu::CapabilityCache",
                "[{}] Float render targets unavailable, falling back to {:?}",
                ctx.config().label, fallback);
        }
        fallback
    }

    /// Precision actually usable for a color target requested at `requested`
    ///
    /// Float requests degrade through `best_precision`; half-float requests
    /// degrade straight to bytes.
    pub fn renderable_precision(&self, ctx: &GpuContext, requested: Precision) -> Precision {
        match requested {
            Precision::Float => self.best_precision(ctx),
            Precision::HalfFloat if self.probe(ctx, Capability::HalfFloatRenderTarget) => Precision::HalfFloat,
            Precision::HalfFloat => {
                crate::gpu_debug!("swapgpu::CapabilityCache",
                    "[{}] Half-float render targets unavailable, using bytes", ctx.config().label);
                Precision::UnsignedByte
            }
            Precision::UnsignedByte => Precision::UnsignedByte,
        }
    }
}

/// Render into a throwaway 1x1 target of the given precision and report completeness
///
/// The texture and framebuffer are deleted before returning.
fn probe_renderable(device: &mut dyn GraphicsDevice, precision: Precision) -> bool {
    let texture = match device.create_texture() {
        Ok(texture) => texture,
        Err(e) => {
            crate::gpu_warn!("swapgpu::CapabilityCache", "Probe texture creation failed: {}", e);
            return false;
        }
    };

    let format = TexelFormat::rgba(precision);
    device.bind_texture(0, TargetKind::Texture2D, Some(texture));
    device.tex_parameter(TargetKind::Texture2D, TextureParameter::MinFilter(TextureFilter::Nearest));
    device.tex_parameter(TargetKind::Texture2D, TextureParameter::MagFilter(TextureFilter::Nearest));
    let specified = device.tex_image(
        ImageTarget::Texture2D,
        &TexImageDesc {
            width: 1,
            height: 1,
            format: format.format,
            internal_format: format.internal_format,
            data_type: ComponentType::Float,
        },
        None,
    );

    let complete = match (specified, device.create_framebuffer()) {
        (Ok(()), Ok(framebuffer)) => {
            device.bind_framebuffer(Some(framebuffer));
            device.attach_texture(Attachment::Color0, ImageTarget::Texture2D, Some(texture));
            let status = device.framebuffer_status();
            device.bind_framebuffer(None);
            device.delete_framebuffer(framebuffer);
            status.is_complete()
        }
        (_, Ok(framebuffer)) => {
            device.delete_framebuffer(framebuffer);
            false
        }
        (_, Err(e)) => {
            crate::gpu_warn!("swapgpu::CapabilityCache", "Probe framebuffer creation failed: {}", e);
            false
        }
    };

    device.bind_texture(0, TargetKind::Texture2D, None);
    device.delete_texture(texture);
    complete
}

#[cfg(test)]
#[path = "capability_cache_tests.rs"]
mod tests;
