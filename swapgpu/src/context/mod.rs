//! Device context and capability detection
//!
//! A `GpuContext` is what every resource is constructed from. It carries the
//! host's device, the configuration, and the capability cache memoized for
//! that device.

mod gpu_context;
mod capability_cache;

pub use gpu_context::GpuContext;
pub use capability_cache::{Capability, CapabilityCache};
