/// GpuContext - shared handle on the host's graphics device
///
/// Cloning a context is cheap. Clones share the device and the capability
/// cache, so probes run once per context no matter how many resources ask.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use crate::config::Config;
use crate::context::{Capability, CapabilityCache};
use crate::graphics_device::{GraphicsDevice, Precision};

#[derive(Clone)]
pub struct GpuContext {
    /// Host-supplied device (never created or destroyed here)
    graphics_device: Arc<Mutex<dyn GraphicsDevice>>,
    /// Capability memoization scoped to this context
    capabilities: Arc<CapabilityCache>,
    /// Shared configuration
    config: Arc<Config>,
}

impl GpuContext {
    /// Wrap a host device
    pub fn new(graphics_device: Arc<Mutex<dyn GraphicsDevice>>, config: Config) -> Self {
        crate::gpu_debug!("swapgpu::GpuContext", "Context '{}' created (validation: {})",
            config.label, config.enable_validation);
        Self {
            graphics_device,
            capabilities: Arc::new(CapabilityCache::new()),
            config: Arc::new(config),
        }
    }

    /// Wrap a host device with the default configuration
    pub fn with_default_config(graphics_device: Arc<Mutex<dyn GraphicsDevice>>) -> Self {
        Self::new(graphics_device, Config::default())
    }

    /// Shared device handle
    pub fn graphics_device(&self) -> &Arc<Mutex<dyn GraphicsDevice>> {
        &self.graphics_device
    }

    /// Lock the device for a sequence of commands
    ///
    /// A poisoned lock is recovered: device state is owned by the host and a
    /// panic on another thread does not invalidate it.
    pub fn device(&self) -> MutexGuard<'_, dyn GraphicsDevice + 'static> {
        self.graphics_device.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn capabilities(&self) -> &CapabilityCache {
        &self.capabilities
    }

    /// Memoized capability probe. Must not be called while holding `device()`.
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.probe(self, capability)
    }

    /// Memoized maximum anisotropy (0.0 when anisotropy is unsupported)
    pub fn max_anisotropy(&self) -> f32 {
        self.capabilities.max_anisotropy(self)
    }

    /// Most precise renderable color precision on this device
    pub fn best_precision(&self) -> Precision {
        self.capabilities.best_precision(self)
    }

    /// Precision usable for a color render target requested at `requested`
    pub fn renderable_precision(&self, requested: Precision) -> Precision {
        self.capabilities.renderable_precision(self, requested)
    }

    /// True if both handles refer to the same context (same capability scope)
    pub fn same_context(&self, other: &GpuContext) -> bool {
        Arc::ptr_eq(&self.capabilities, &other.capabilities)
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("label", &self.config.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "gpu_context_tests.rs"]
mod tests;
