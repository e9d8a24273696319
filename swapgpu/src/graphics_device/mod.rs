/// Graphics device module - the device trait and all device-level types

// Module declarations
pub mod graphics_device;
pub mod buffer;
pub mod texture;
pub mod shader;
pub mod frame_buffer;

// Headless recording device (tests, tooling)
pub mod mock_graphics_device;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use buffer::*;
pub use texture::*;
pub use shader::*;
pub use frame_buffer::*;
