/*!
# swapgpu

GPU resource layer and ping-pong pass scheduler over a GL-style device.

The host supplies a device implementing [`GraphicsDevice`](graphics_device::GraphicsDevice)
and wraps it in a [`GpuContext`](context::GpuContext). Every resource is built
from that context and released with an explicit `delete()`.

## Architecture

- **GpuContext**: shared device, configuration, per-context capability cache
- **ShaderProgram**: compiled program with cached attribute/uniform locations
- **GeometryBuffer**: named vertex attributes plus an optional index buffer
- **Texture**: 2D or cube texture with sampling state and precision conversion
- **RenderTarget**: framebuffer with a color texture and optional depth
- **Drawable**: program + geometry + transform, optionally instanced
- **SwapRenderer**: name-keyed textures, targets and full-screen passes with O(1) swap
*/

// Internal modules
mod error;
pub mod log;
pub mod config;
pub mod context;
pub mod graphics_device;
pub mod resource;
pub mod swap;

#[cfg(test)]
mod test_support;

// Main swapgpu namespace module
pub mod swapgpu {
    // Error types
    pub use crate::error::{Error, Result};

    // Configuration and context
    pub use crate::config::Config;
    pub use crate::context::{Capability, CapabilityCache, GpuContext};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Device sub-module with the trait and all device-level types
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Pass scheduling
    pub use crate::swap::{SwapRenderer, SwapTextureDesc};
}

// Re-export math library at crate root
pub use glam;
