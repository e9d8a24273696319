/// Drawable - a shader program bound to shared geometry through a vertex array.
///
/// The local transform (position, Euler rotation, scale) is turned into a
/// model matrix lazily: setters mark the drawable dirty and the next `draw()`
/// (or an explicit `update_model_matrix()`) recomputes translate · rotate ·
/// scale and pushes it as `modelMatrix`.
///
/// Instancing is optional data on the same type. An instanced drawable owns a
/// per-instance matrix buffer initialized to identity, read through the
/// `instanceMatrix` attribute with divisor 1.

use std::sync::Arc;
use glam::{EulerRot, Mat4, Quat, Vec3};
use crate::context::{Capability, GpuContext};
use crate::error::{Error, Result};
use crate::gpu_bail;
use crate::graphics_device::{
    BufferHandle, BufferTarget, BufferUsage, ComponentType, PrimitiveMode, UniformValue,
    VertexArrayHandle, VertexAttributeLayout,
};
use crate::resource::geometry::GeometryBuffer;
use crate::resource::shader_program::ShaderProgram;

/// Per-instance matrix attribute (one mat4, four consecutive locations)
pub const INSTANCE_MATRIX_ATTRIBUTE: &str = "instanceMatrix";

const FLOATS_PER_MATRIX: usize = 16;
const MATRIX_BYTES: u64 = (FLOATS_PER_MATRIX * std::mem::size_of::<f32>()) as u64;

// ============================================================================
// INSTANCING DATA
// ============================================================================

/// CPU mirror and device buffer of the per-instance matrices
pub struct InstancingData {
    instance_count: u32,
    matrices: Vec<f32>,
    buffer: BufferHandle,
}

impl InstancingData {
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// All matrices, column-major, `instance_count * 16` floats
    pub fn matrices(&self) -> &[f32] {
        &self.matrices
    }

    pub fn matrix_at(&self, index: usize) -> Option<Mat4> {
        let start = index * FLOATS_PER_MATRIX;
        self.matrices
            .get(start..start + FLOATS_PER_MATRIX)
            .map(Mat4::from_cols_slice)
    }

    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }
}

// ============================================================================
// DRAWABLE
// ============================================================================

pub struct Drawable {
    ctx: GpuContext,
    program: ShaderProgram,
    geometry: Arc<GeometryBuffer>,
    vertex_array: VertexArrayHandle,
    mode: PrimitiveMode,

    position: Vec3,
    /// Euler angles in radians, composed as Rx * Ry * Rz (Z acts on vertices first)
    rotation: Vec3,
    scale: Vec3,
    model_matrix: Mat4,
    should_update: bool,

    instancing: Option<InstancingData>,
}

impl Drawable {
    /// Bind a program to geometry
    pub fn new(ctx: &GpuContext, program: ShaderProgram, geometry: Arc<GeometryBuffer>) -> Result<Self> {
        Self::build(ctx, program, geometry, None)
    }

    /// Bind a program to geometry drawn `instance_count` times
    ///
    /// Every instance starts with an identity matrix.
    pub fn new_instanced(
        ctx: &GpuContext,
        program: ShaderProgram,
        geometry: Arc<GeometryBuffer>,
        instance_count: u32,
    ) -> Result<Self> {
        if !ctx.supports(Capability::Instancing) {
            crate::gpu_error!("swapgpu::Drawable", "Instanced draw calls are not supported by this device");
            program.delete();
            return Err(Error::Unsupported("instancing".to_string()));
        }

        let matrices: Vec<f32> = (0..instance_count)
            .flat_map(|_| Mat4::IDENTITY.to_cols_array())
            .collect();
        let created = ctx.device().create_buffer(
            BufferTarget::Array,
            bytemuck::cast_slice(&matrices),
            BufferUsage::Dynamic,
        );
        let buffer = match created {
            Ok(buffer) => buffer,
            Err(err) => {
                program.delete();
                return Err(err);
            }
        };

        Self::build(ctx, program, geometry, Some(InstancingData { instance_count, matrices, buffer }))
    }

    fn build(
        ctx: &GpuContext,
        mut program: ShaderProgram,
        geometry: Arc<GeometryBuffer>,
        instancing: Option<InstancingData>,
    ) -> Result<Self> {
        // Resolve locations before locking the device for vertex array setup
        let mut layouts = Vec::new();
        for (name, descriptor) in geometry.attributes() {
            let location = program.attrib_location(name);
            if location >= 0 {
                layouts.push((location as u32, descriptor.layout()));
            }
        }
        if let Some(instancing) = &instancing {
            let location = program.attrib_location(INSTANCE_MATRIX_ATTRIBUTE);
            if location >= 0 {
                for column in 0..4u32 {
                    layouts.push((location as u32 + column, VertexAttributeLayout {
                        buffer: instancing.buffer,
                        size: 4,
                        component_type: ComponentType::Float,
                        normalized: false,
                        stride: MATRIX_BYTES as u32,
                        offset: column * 16,
                        divisor: 1,
                    }));
                }
            }
        }

        let created = ctx.device().create_vertex_array();
        let vertex_array = match created {
            Ok(vertex_array) => vertex_array,
            Err(err) => {
                if let Some(instancing) = &instancing {
                    ctx.device().delete_buffer(instancing.buffer);
                }
                program.delete();
                return Err(err);
            }
        };

        {
            let mut device = ctx.device();
            device.bind_vertex_array(Some(vertex_array));
            for (location, layout) in &layouts {
                device.set_vertex_attribute(*location, layout);
            }
            if let Some(index_buffer) = geometry.index_buffer() {
                device.bind_index_buffer(Some(index_buffer));
            }
            device.bind_vertex_array(None);
        }

        Ok(Self {
            ctx: ctx.clone(),
            program,
            geometry,
            vertex_array,
            mode: PrimitiveMode::Triangles,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            model_matrix: Mat4::IDENTITY,
            // the program's modelMatrix is unset until the first push
            should_update: true,
            instancing,
        })
    }

    // ===== TRANSFORM =====

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.should_update = true;
    }

    /// Euler angles in radians, composed as Rx * Ry * Rz
    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
        self.should_update = true;
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.should_update = true;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// True while the transform changed since the model matrix was last pushed
    pub fn is_dirty(&self) -> bool {
        self.should_update
    }

    /// Model matrix as last computed
    pub fn model_matrix(&self) -> Mat4 {
        self.model_matrix
    }

    /// Recompute the model matrix and push it to the program
    pub fn update_model_matrix(&mut self) {
        let rotation = Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z);
        self.model_matrix = Mat4::from_scale_rotation_translation(self.scale, rotation, self.position);
        self.program.set_uniform("modelMatrix", self.model_matrix);
        self.should_update = false;
    }

    /// Push view and projection matrices
    pub fn set_camera(&mut self, view: Mat4, projection: Mat4) {
        self.program.set_uniform("viewMatrix", view);
        self.program.set_uniform("projectionMatrix", projection);
    }

    // ===== UNIFORMS =====

    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) -> bool {
        self.program.set_uniform(name, value)
    }

    pub fn set_uniform_kind(&mut self, name: &str, kind: &str, data: &[f32]) -> Result<bool> {
        self.program.set_uniform_kind(name, kind, data)
    }

    // ===== INSTANCING =====

    /// Replace the matrix of one instance
    ///
    /// Only the 16 floats of that instance change, on the CPU mirror and on
    /// the device buffer.
    pub fn set_matrix_at(&mut self, index: usize, matrix: Mat4) -> Result<()> {
        let Some(instancing) = self.instancing.as_mut() else {
            gpu_bail!("swapgpu::Drawable", "set_matrix_at on a non-instanced drawable");
        };
        if index >= instancing.instance_count as usize {
            gpu_bail!("swapgpu::Drawable", "Instance {} out of range (count {})",
                index, instancing.instance_count);
        }

        let start = index * FLOATS_PER_MATRIX;
        let slot = &mut instancing.matrices[start..start + FLOATS_PER_MATRIX];
        slot.copy_from_slice(&matrix.to_cols_array());
        self.ctx.device().update_buffer(
            instancing.buffer,
            index as u64 * MATRIX_BYTES,
            bytemuck::cast_slice(slot),
        );
        Ok(())
    }

    pub fn instancing(&self) -> Option<&InstancingData> {
        self.instancing.as_ref()
    }

    pub fn is_instanced(&self) -> bool {
        self.instancing.is_some()
    }

    // ===== DRAW =====

    pub fn set_primitive_mode(&mut self, mode: PrimitiveMode) {
        self.mode = mode;
    }

    pub fn primitive_mode(&self) -> PrimitiveMode {
        self.mode
    }

    /// Issue the draw call
    ///
    /// Returns false without touching the device beyond program selection
    /// when the program is invalid.
    pub fn draw(&mut self) -> bool {
        if !self.program.bind() {
            return false;
        }
        if self.should_update {
            self.update_model_matrix();
        }

        let count = self.geometry.vertex_count() as u32;
        let index_type = self.geometry.index_type();
        let mut device = self.ctx.device();
        device.bind_vertex_array(Some(self.vertex_array));
        match (index_type, &self.instancing) {
            (Some(index_type), None) => device.draw_elements(self.mode, count, index_type, 0),
            (None, None) => device.draw_arrays(self.mode, 0, count),
            (Some(index_type), Some(instancing)) => {
                device.draw_elements_instanced(self.mode, count, index_type, 0, instancing.instance_count)
            }
            (None, Some(instancing)) => {
                device.draw_arrays_instanced(self.mode, 0, count, instancing.instance_count)
            }
        }
        device.bind_vertex_array(None);
        true
    }

    // ===== ACCESSORS =====

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    pub fn geometry(&self) -> &Arc<GeometryBuffer> {
        &self.geometry
    }

    pub fn vertex_array(&self) -> VertexArrayHandle {
        self.vertex_array
    }

    /// Release the program, vertex array and instance buffer
    ///
    /// The geometry is shared and not deleted; it is handed back so the last
    /// holder can delete it.
    pub fn delete(self) -> Arc<GeometryBuffer> {
        {
            let mut device = self.ctx.device();
            device.delete_vertex_array(self.vertex_array);
            if let Some(instancing) = &self.instancing {
                device.delete_buffer(instancing.buffer);
            }
        }
        self.program.delete();
        self.geometry
    }
}

#[cfg(test)]
#[path = "drawable_tests.rs"]
mod tests;
