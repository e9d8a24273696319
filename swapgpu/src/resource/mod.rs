//! GPU resources
//!
//! Every resource is built from a `GpuContext`, keeps a clone of it, and is
//! released explicitly with a consuming `delete()`.

pub mod shader_program;
pub mod geometry;
pub mod texture;
pub mod render_target;
pub mod drawable;

pub use shader_program::{ShaderProgram, FRAGMENT_HEADER, HEADER_UNIFORMS, VERTEX_HEADER};
pub use geometry::{
    AttributeData, AttributeDesc, AttributeDescriptor, GeometryBuffer, IndexData, POSITION_ATTRIBUTE,
};
pub use texture::{lock_shared, SharedTexture, Texture, TextureImage, SCRATCH_UNIT};
pub use render_target::{RenderTarget, RenderTargetDesc};
pub use drawable::{Drawable, InstancingData, INSTANCE_MATRIX_ATTRIBUTE};
