/// Buffer, vertex attribute and draw-call types

use crate::graphics_device::BufferHandle;

/// Binding point for a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data
    Array,
    /// Index data
    ElementArray,
}

/// Update-frequency hint for a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Uploaded once, drawn many times
    Static,
    /// Modified repeatedly (per-instance transforms)
    Dynamic,
    /// Modified every frame
    Stream,
}

/// Scalar type of a vertex component or texel channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    HalfFloat,
    Float,
}

impl ComponentType {
    /// Returns size in bytes of a single component
    pub fn size_bytes(&self) -> u32 {
        match self {
            ComponentType::Byte | ComponentType::UnsignedByte => 1,
            ComponentType::Short | ComponentType::UnsignedShort | ComponentType::HalfFloat => 2,
            ComponentType::Int | ComponentType::UnsignedInt | ComponentType::Float => 4,
        }
    }
}

/// Index element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    /// Returns size in bytes for this index type
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }

    /// Smallest index type able to address `vertex_count` vertices
    ///
    /// 16-bit indices cover up to 65536 vertices (indices 0..=65535).
    pub fn for_vertex_count(vertex_count: usize) -> Self {
        if vertex_count > 65536 {
            IndexType::U32
        } else {
            IndexType::U16
        }
    }
}

/// Primitive assembly mode for draw calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// Layout of one attribute location inside a vertex layout object
///
/// Mirrors a `vertexAttribPointer` + `vertexAttribDivisor` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttributeLayout {
    /// Buffer the attribute reads from
    pub buffer: BufferHandle,
    /// Components per vertex (1..=4)
    pub size: u32,
    /// Component scalar type
    pub component_type: ComponentType,
    /// Normalize integer data to [0, 1] / [-1, 1]
    pub normalized: bool,
    /// Byte stride between consecutive elements (0 = tightly packed)
    pub stride: u32,
    /// Byte offset of the first element
    pub offset: u32,
    /// Instances per attribute advance (0 = per-vertex)
    pub divisor: u32,
}
