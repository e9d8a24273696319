/// Framebuffer attachment and completeness types
///
/// A framebuffer binds together a color attachment and an optional depth
/// attachment that draw calls render into instead of the default surface.

use bitflags::bitflags;

/// Attachment point on a framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attachment {
    Color0,
    Depth,
}

/// Storage format of a renderbuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum RenderbufferFormat {
    DEPTH_COMPONENT16,
    DEPTH_STENCIL,
    RGBA4,
}

/// Result of a framebuffer completeness check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    Complete,
    IncompleteAttachment,
    MissingAttachment,
    IncompleteDimensions,
    Unsupported,
}

impl FramebufferStatus {
    /// True when the framebuffer can be rendered into
    pub fn is_complete(&self) -> bool {
        matches!(self, FramebufferStatus::Complete)
    }
}

bitflags! {
    /// Buffers cleared by a `clear` call
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
    }
}
