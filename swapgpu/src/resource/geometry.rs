//! Resource-level geometry: index buffer + named vertex attribute buffers.
//!
//! A `GeometryBuffer` owns zero or one index buffer and one device buffer per
//! named attribute. It derives the vertex count used by draw calls:
//!
//! - indexed geometry draws `index_count` vertices
//! - non-indexed geometry draws `position.len() / position.component_size`
//!
//! Geometry is shared read-only between drawables (`Arc<GeometryBuffer>`).
//! Whoever holds the last reference calls `delete()`.

use rustc_hash::FxHashMap;
use crate::context::GpuContext;
use crate::error::Result;
use crate::gpu_bail;
use crate::graphics_device::{
    BufferHandle, BufferTarget, BufferUsage, ComponentType, IndexType, VertexAttributeLayout,
};

/// Name of the attribute that drives the non-indexed vertex count
pub const POSITION_ATTRIBUTE: &str = "position";

// ============================================================================
// INDEX DATA
// ============================================================================

/// Index elements, 16 or 32 bits wide
#[derive(Debug, Clone, PartialEq)]
pub enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexData {
    /// Pick the narrowest index type able to address `vertex_count` vertices
    ///
    /// Falls back to 32-bit indices when a value does not fit in 16 bits.
    pub fn for_vertex_count(indices: &[u32], vertex_count: usize) -> Self {
        if IndexType::for_vertex_count(vertex_count) == IndexType::U16 {
            if let Some(narrow) = indices.iter().map(|&i| u16::try_from(i).ok()).collect::<Option<Vec<u16>>>() {
                return IndexData::U16(narrow);
            }
        }
        IndexData::U32(indices.to_vec())
    }

    pub fn index_type(&self) -> IndexType {
        match self {
            IndexData::U16(_) => IndexType::U16,
            IndexData::U32(_) => IndexType::U32,
        }
    }

    /// Number of index elements
    pub fn len(&self) -> usize {
        match self {
            IndexData::U16(data) => data.len(),
            IndexData::U32(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexData::U16(data) => bytemuck::cast_slice(data),
            IndexData::U32(data) => bytemuck::cast_slice(data),
        }
    }
}

impl From<Vec<u16>> for IndexData {
    fn from(data: Vec<u16>) -> Self {
        IndexData::U16(data)
    }
}

impl From<Vec<u32>> for IndexData {
    fn from(data: Vec<u32>) -> Self {
        IndexData::U32(data)
    }
}

// ============================================================================
// ATTRIBUTE DATA
// ============================================================================

/// Borrowed raw attribute data
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeData<'a> {
    F32(&'a [f32]),
    U8(&'a [u8]),
    U16(&'a [u16]),
    U32(&'a [u32]),
}

impl<'a> AttributeData<'a> {
    pub fn component_type(&self) -> ComponentType {
        match self {
            AttributeData::F32(_) => ComponentType::Float,
            AttributeData::U8(_) => ComponentType::UnsignedByte,
            AttributeData::U16(_) => ComponentType::UnsignedShort,
            AttributeData::U32(_) => ComponentType::UnsignedInt,
        }
    }

    /// Number of scalar components
    pub fn len(&self) -> usize {
        match self {
            AttributeData::F32(data) => data.len(),
            AttributeData::U8(data) => data.len(),
            AttributeData::U16(data) => data.len(),
            AttributeData::U32(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        match self {
            AttributeData::F32(data) => bytemuck::cast_slice(data),
            AttributeData::U8(data) => data,
            AttributeData::U16(data) => bytemuck::cast_slice(data),
            AttributeData::U32(data) => bytemuck::cast_slice(data),
        }
    }
}

/// Input descriptor for `GeometryBuffer::add_attribute`
#[derive(Debug, Clone, Copy)]
pub struct AttributeDesc<'a> {
    pub data: AttributeData<'a>,
    /// Components per vertex (1..=4)
    pub component_size: u32,
    pub normalized: bool,
    /// Byte stride (0 = tightly packed)
    pub stride: u32,
    /// Byte offset of the first element
    pub offset: u32,
    /// Per-instance advance rate, `None` for per-vertex data
    pub divisor: Option<u32>,
    pub usage: BufferUsage,
}

impl<'a> AttributeDesc<'a> {
    /// Tightly packed per-vertex attribute
    pub fn new(data: AttributeData<'a>, component_size: u32) -> Self {
        Self {
            data,
            component_size,
            normalized: false,
            stride: 0,
            offset: 0,
            divisor: None,
            usage: BufferUsage::Static,
        }
    }

    /// Tightly packed per-vertex float attribute
    pub fn floats(data: &'a [f32], component_size: u32) -> Self {
        Self::new(AttributeData::F32(data), component_size)
    }

    pub fn with_divisor(mut self, divisor: u32) -> Self {
        self.divisor = Some(divisor);
        self
    }

    pub fn with_usage(mut self, usage: BufferUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }
}

/// An uploaded attribute: its buffer and how to read it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub buffer: BufferHandle,
    pub component_size: u32,
    pub component_type: ComponentType,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u32,
    pub divisor: Option<u32>,
    /// Number of scalar components uploaded
    pub element_count: usize,
}

impl AttributeDescriptor {
    /// Vertex array layout for this attribute
    pub fn layout(&self) -> VertexAttributeLayout {
        VertexAttributeLayout {
            buffer: self.buffer,
            size: self.component_size,
            component_type: self.component_type,
            normalized: self.normalized,
            stride: self.stride,
            offset: self.offset,
            divisor: self.divisor.unwrap_or(0),
        }
    }
}

// ============================================================================
// GEOMETRY BUFFER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IndexBuffer {
    buffer: BufferHandle,
    index_type: IndexType,
    count: usize,
}

pub struct GeometryBuffer {
    ctx: GpuContext,
    index: Option<IndexBuffer>,
    attributes: FxHashMap<String, AttributeDescriptor>,
    vertex_count: usize,
}

impl GeometryBuffer {
    /// Create an empty geometry (no device objects yet)
    pub fn new(ctx: &GpuContext) -> Self {
        Self {
            ctx: ctx.clone(),
            index: None,
            attributes: FxHashMap::default(),
            vertex_count: 0,
        }
    }

    /// Upload the index buffer and mark the geometry as indexed
    ///
    /// The vertex count becomes the index count. Adding indices again
    /// replaces the previous buffer.
    pub fn add_index(&mut self, indices: impl Into<IndexData>) -> Result<()> {
        let indices = indices.into();
        let buffer = self.ctx.device().create_buffer(
            BufferTarget::ElementArray,
            indices.as_bytes(),
            BufferUsage::Static,
        )?;

        if let Some(previous) = self.index.replace(IndexBuffer {
            buffer,
            index_type: indices.index_type(),
            count: indices.len(),
        }) {
            self.ctx.device().delete_buffer(previous.buffer);
        }
        self.vertex_count = indices.len();

        crate::gpu_trace!("swapgpu::GeometryBuffer", "Index buffer {:?}: {} x {:?}",
            buffer, indices.len(), indices.index_type());
        Ok(())
    }

    /// Upload a named attribute
    ///
    /// Re-adding a name re-uploads into a fresh buffer and overwrites the
    /// descriptor. Adding `position` to non-indexed geometry sets the vertex
    /// count to `len / component_size`.
    pub fn add_attribute(&mut self, name: &str, desc: AttributeDesc<'_>) -> Result<()> {
        if desc.component_size == 0 || desc.component_size > 4 {
            gpu_bail!("swapgpu::GeometryBuffer",
                "Attribute '{}' component size must be 1..=4, got {}", name, desc.component_size);
        }

        let buffer = self.ctx.device().create_buffer(BufferTarget::Array, desc.data.as_bytes(), desc.usage)?;
        let descriptor = AttributeDescriptor {
            buffer,
            component_size: desc.component_size,
            component_type: desc.data.component_type(),
            normalized: desc.normalized,
            stride: desc.stride,
            offset: desc.offset,
            divisor: desc.divisor,
            element_count: desc.data.len(),
        };

        if let Some(previous) = self.attributes.insert(name.to_string(), descriptor) {
            self.ctx.device().delete_buffer(previous.buffer);
        }

        if name == POSITION_ATTRIBUTE && self.index.is_none() {
            self.vertex_count = desc.data.len() / desc.component_size as usize;
        }
        Ok(())
    }

    /// Overwrite part of an attribute in place
    ///
    /// `element_offset` counts scalar components from the start of the
    /// attribute data. The data type must match the uploaded type and the
    /// range must lie within the uploaded length.
    pub fn update_attribute(&mut self, name: &str, element_offset: usize, data: AttributeData<'_>) -> Result<()> {
        let Some(descriptor) = self.attributes.get(name) else {
            gpu_bail!("swapgpu::GeometryBuffer", "Unknown attribute '{}'", name);
        };
        if data.component_type() != descriptor.component_type {
            gpu_bail!("swapgpu::GeometryBuffer",
                "Attribute '{}' holds {:?}, update supplies {:?}",
                name, descriptor.component_type, data.component_type());
        }
        if element_offset + data.len() > descriptor.element_count {
            gpu_bail!("swapgpu::GeometryBuffer",
                "Attribute '{}' update [{}, {}) exceeds {} elements",
                name, element_offset, element_offset + data.len(), descriptor.element_count);
        }

        let byte_offset = (element_offset * descriptor.component_type.size_bytes() as usize) as u64;
        self.ctx.device().update_buffer(descriptor.buffer, byte_offset, data.as_bytes());
        Ok(())
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.get(name)
    }

    /// Iterate over all attributes with their names
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeDescriptor)> {
        self.attributes.iter().map(|(name, desc)| (name.as_str(), desc))
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    pub fn index_buffer(&self) -> Option<BufferHandle> {
        self.index.map(|i| i.buffer)
    }

    pub fn index_type(&self) -> Option<IndexType> {
        self.index.map(|i| i.index_type)
    }

    pub fn index_count(&self) -> usize {
        self.index.map(|i| i.count).unwrap_or(0)
    }

    /// Number of vertices a draw call submits
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    /// Release the index buffer and every attribute buffer
    pub fn delete(self) {
        let mut device = self.ctx.device();
        if let Some(index) = self.index {
            device.delete_buffer(index.buffer);
        }
        for descriptor in self.attributes.values() {
            device.delete_buffer(descriptor.buffer);
        }
    }
}

#[cfg(test)]
#[path = "geometry_tests.rs"]
mod tests;
