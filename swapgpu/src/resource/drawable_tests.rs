/// Unit tests for drawable.rs

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;
use glam::{Mat4, Vec3};
use crate::error::Error;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::{PrimitiveMode, UniformValue, ANGLE_INSTANCED_ARRAYS};
use crate::resource::drawable::*;
use crate::resource::geometry::{AttributeDesc, GeometryBuffer};
use crate::resource::shader_program::ShaderProgram;
use crate::test_support::{mock_context, mock_context_with, PASSTHROUGH_FRAGMENT, PASSTHROUGH_VERTEX};
use crate::context::GpuContext;

const INSTANCED_VERTEX: &str = "attribute vec3 position;\nattribute mat4 instanceMatrix;\nvoid main() {\n    gl_Position = projectionMatrix * viewMatrix * modelMatrix * instanceMatrix * vec4(position, 1.0);\n}\n";

fn triangle(ctx: &GpuContext, indexed: bool) -> Arc<GeometryBuffer> {
    let mut geometry = GeometryBuffer::new(ctx);
    geometry
        .add_attribute("position", AttributeDesc::floats(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], 3))
        .unwrap();
    geometry
        .add_attribute("uv", AttributeDesc::floats(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0], 2))
        .unwrap();
    if indexed {
        geometry.add_index(vec![0u16, 1, 2]).unwrap();
    }
    Arc::new(geometry)
}

fn passthrough(ctx: &GpuContext, indexed: bool) -> Drawable {
    let program = ShaderProgram::new(ctx, PASSTHROUGH_VERTEX, PASSTHROUGH_FRAGMENT);
    Drawable::new(ctx, program, triangle(ctx, indexed)).unwrap()
}

fn instanced(ctx: &GpuContext, count: u32) -> Drawable {
    let program = ShaderProgram::new(ctx, INSTANCED_VERTEX, PASSTHROUGH_FRAGMENT);
    Drawable::new_instanced(ctx, program, triangle(ctx, true), count).unwrap()
}

fn uniform_matrix(drawable: &Drawable, mock: &std::sync::Mutex<MockGraphicsDevice>, name: &str) -> Option<Mat4> {
    let handle = drawable.program().handle()?;
    match mock.lock().unwrap().uniform_value(handle, name) {
        Some(UniformValue::Mat4(m)) => Some(Mat4::from_cols_array(m)),
        _ => None,
    }
}

// ============================================================================
// VERTEX ARRAY
// ============================================================================

#[test]
fn test_attributes_bound_at_program_locations() {
    let (ctx, mock) = mock_context();
    let drawable = passthrough(&ctx, true);

    let geometry = drawable.geometry();
    let device = mock.lock().unwrap();
    let position = device.vertex_attribute(drawable.vertex_array(), 0).unwrap();
    assert_eq!(position.buffer, geometry.attribute("position").unwrap().buffer);
    assert_eq!(position.size, 3);
    let uv = device.vertex_attribute(drawable.vertex_array(), 1).unwrap();
    assert_eq!(uv.buffer, geometry.attribute("uv").unwrap().buffer);
    assert_eq!(device.vertex_array_index_buffer(drawable.vertex_array()), geometry.index_buffer());
}

#[test]
fn test_attribute_missing_from_program_is_skipped() {
    let (ctx, mock) = mock_context();
    let program = ShaderProgram::new(&ctx, "attribute vec3 position;\nvoid main() {}\n", PASSTHROUGH_FRAGMENT);
    let drawable = Drawable::new(&ctx, program, triangle(&ctx, false)).unwrap();

    let device = mock.lock().unwrap();
    assert!(device.vertex_attribute(drawable.vertex_array(), 0).is_some());
    assert!(device.vertex_attribute(drawable.vertex_array(), 1).is_none());
}

// ============================================================================
// TRANSFORM
// ============================================================================

#[test]
fn test_first_draw_pushes_identity_model() {
    let (ctx, mock) = mock_context();
    let mut drawable = passthrough(&ctx, true);
    assert!(drawable.is_dirty());

    assert!(drawable.draw());

    assert_eq!(uniform_matrix(&drawable, &mock, "modelMatrix"), Some(Mat4::IDENTITY));
    assert!(!drawable.is_dirty());
}

#[test]
fn test_position_change_applies_on_next_draw() {
    let (ctx, mock) = mock_context();
    let mut drawable = passthrough(&ctx, true);
    drawable.draw();

    drawable.set_position(Vec3::new(1.0, 2.0, 3.0));
    assert!(drawable.is_dirty());
    assert_eq!(drawable.model_matrix(), Mat4::IDENTITY);

    drawable.draw();

    let expected = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(drawable.model_matrix(), expected);
    assert_eq!(uniform_matrix(&drawable, &mock, "modelMatrix"), Some(expected));
    assert!(!drawable.is_dirty());
}

#[test]
fn test_clean_draw_does_not_reupload_model() {
    let (ctx, mock) = mock_context();
    let mut drawable = passthrough(&ctx, true);
    drawable.draw();
    let uploads = mock.lock().unwrap().call_count("set_uniform");

    drawable.draw();

    assert_eq!(mock.lock().unwrap().call_count("set_uniform"), uploads);
}

#[test]
fn test_model_composes_translate_rotate_scale() {
    let (ctx, _mock) = mock_context();
    let mut drawable = passthrough(&ctx, true);
    drawable.set_position(Vec3::new(10.0, 0.0, 0.0));
    drawable.set_rotation(Vec3::new(0.0, 0.0, FRAC_PI_2));
    drawable.set_scale(Vec3::splat(2.0));

    drawable.update_model_matrix();

    let moved = drawable.model_matrix().transform_point3(Vec3::X);
    assert!(moved.abs_diff_eq(Vec3::new(10.0, 2.0, 0.0), 1e-5));
    assert!(!drawable.is_dirty());
}

#[test]
fn test_rotation_applies_z_before_x() {
    let (ctx, _mock) = mock_context();
    let mut drawable = passthrough(&ctx, true);
    drawable.set_rotation(Vec3::new(FRAC_PI_2, 0.0, FRAC_PI_2));

    drawable.update_model_matrix();

    // Z turns +X into +Y, then X turns +Y into +Z
    let turned = drawable.model_matrix().transform_vector3(Vec3::X);
    assert!(turned.abs_diff_eq(Vec3::Z, 1e-5));
}

#[test]
fn test_set_camera_pushes_view_and_projection() {
    let (ctx, mock) = mock_context();
    let mut drawable = passthrough(&ctx, true);
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    let projection = Mat4::perspective_rh_gl(1.0, 1.5, 0.1, 100.0);

    drawable.set_camera(view, projection);

    assert_eq!(uniform_matrix(&drawable, &mock, "viewMatrix"), Some(view));
    assert_eq!(uniform_matrix(&drawable, &mock, "projectionMatrix"), Some(projection));
}

// ============================================================================
// DRAW
// ============================================================================

#[test]
fn test_indexed_geometry_draws_elements() {
    let (ctx, mock) = mock_context();
    let mut drawable = passthrough(&ctx, true);
    drawable.draw();
    let device = mock.lock().unwrap();
    assert_eq!(device.call_count("draw_elements"), 1);
    assert_eq!(device.call_count("draw_arrays"), 0);
}

#[test]
fn test_plain_geometry_draws_arrays() {
    let (ctx, mock) = mock_context();
    let mut drawable = passthrough(&ctx, false);
    drawable.set_primitive_mode(PrimitiveMode::Points);
    drawable.draw();
    assert_eq!(drawable.primitive_mode(), PrimitiveMode::Points);
    assert_eq!(mock.lock().unwrap().call_count("draw_arrays"), 1);
}

#[test]
fn test_invalid_program_skips_draw() {
    let (ctx, mock) = mock_context();
    let program = ShaderProgram::new(&ctx, "broken", PASSTHROUGH_FRAGMENT);
    let mut drawable = Drawable::new(&ctx, program, triangle(&ctx, true)).unwrap();

    assert!(!drawable.draw());
    assert_eq!(mock.lock().unwrap().draw_calls, 0);
}

// ============================================================================
// INSTANCING
// ============================================================================

#[test]
fn test_instances_start_as_identity() {
    let (ctx, mock) = mock_context();
    let drawable = instanced(&ctx, 3);

    let instancing = drawable.instancing().unwrap();
    assert_eq!(instancing.instance_count(), 3);
    assert_eq!(instancing.matrices().len(), 48);
    for i in 0..3 {
        assert_eq!(instancing.matrix_at(i), Some(Mat4::IDENTITY));
    }
    assert_eq!(instancing.matrix_at(3), None);
    let floats = mock.lock().unwrap().buffer_floats(instancing.buffer()).unwrap();
    assert_eq!(&floats[16..32], &Mat4::IDENTITY.to_cols_array()[..]);
}

#[test]
fn test_instance_matrix_spans_four_locations() {
    let (ctx, mock) = mock_context();
    let drawable = instanced(&ctx, 2);
    let buffer = drawable.instancing().unwrap().buffer();

    let device = mock.lock().unwrap();
    for column in 0..4u32 {
        let layout = device.vertex_attribute(drawable.vertex_array(), 1 + column).unwrap();
        assert_eq!(layout.buffer, buffer);
        assert_eq!(layout.size, 4);
        assert_eq!(layout.stride, 64);
        assert_eq!(layout.offset, column * 16);
        assert_eq!(layout.divisor, 1);
    }
}

#[test]
fn test_set_matrix_at_updates_one_slot() {
    let (ctx, mock) = mock_context();
    let mut drawable = instanced(&ctx, 3);
    let translation = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));

    drawable.set_matrix_at(1, translation).unwrap();

    let instancing = drawable.instancing().unwrap();
    assert_eq!(instancing.matrix_at(0), Some(Mat4::IDENTITY));
    assert_eq!(instancing.matrix_at(1), Some(translation));
    assert_eq!(instancing.matrix_at(2), Some(Mat4::IDENTITY));

    let device = mock.lock().unwrap();
    assert_eq!(device.call_count("update_buffer"), 1);
    let floats = device.buffer_floats(instancing.buffer()).unwrap();
    assert_eq!(&floats[16..32], &translation.to_cols_array()[..]);
    assert_eq!(&floats[32..48], &Mat4::IDENTITY.to_cols_array()[..]);
}

#[test]
fn test_set_matrix_at_out_of_range() {
    let (ctx, _mock) = mock_context();
    let mut drawable = instanced(&ctx, 2);
    assert!(drawable.set_matrix_at(2, Mat4::IDENTITY).is_err());
}

#[test]
fn test_set_matrix_at_requires_instancing() {
    let (ctx, _mock) = mock_context();
    let mut drawable = passthrough(&ctx, true);
    assert!(!drawable.is_instanced());
    assert!(drawable.set_matrix_at(0, Mat4::IDENTITY).is_err());
}

#[test]
fn test_instanced_draw_call() {
    let (ctx, mock) = mock_context();
    let mut drawable = instanced(&ctx, 4);
    drawable.draw();
    assert_eq!(mock.lock().unwrap().call_count("draw_elements_instanced"), 1);
}

#[test]
fn test_instancing_unsupported() {
    let (ctx, _mock) = mock_context_with(MockGraphicsDevice::new().without_extension(ANGLE_INSTANCED_ARRAYS));
    let program = ShaderProgram::new(&ctx, INSTANCED_VERTEX, PASSTHROUGH_FRAGMENT);

    let result = Drawable::new_instanced(&ctx, program, triangle(&ctx, true), 2);

    assert!(matches!(result, Err(Error::Unsupported(_))));
}

#[test]
fn test_failed_vertex_array_releases_program_and_instances() {
    let (ctx, mock) = mock_context();
    let geometry = triangle(&ctx, true);
    let program = ShaderProgram::new(&ctx, INSTANCED_VERTEX, PASSTHROUGH_FRAGMENT);
    let geometry_buffers = mock.lock().unwrap().live_buffer_count();
    mock.lock().unwrap().fail_on("create_vertex_array");

    assert!(Drawable::new_instanced(&ctx, program, geometry, 4).is_err());

    let device = mock.lock().unwrap();
    assert_eq!(device.live_buffer_count(), geometry_buffers);
    assert_eq!(device.live_program_count(), 0);
    assert_eq!(device.live_vertex_array_count(), 0);
}

#[test]
fn test_failed_instance_buffer_releases_program() {
    let (ctx, mock) = mock_context();
    let geometry = triangle(&ctx, true);
    let program = ShaderProgram::new(&ctx, INSTANCED_VERTEX, PASSTHROUGH_FRAGMENT);
    mock.lock().unwrap().fail_on("create_vertex_buffer");

    assert!(Drawable::new_instanced(&ctx, program, geometry, 4).is_err());
    assert_eq!(mock.lock().unwrap().live_program_count(), 0);
}

#[test]
fn test_unsupported_instancing_releases_program() {
    let (ctx, mock) = mock_context_with(MockGraphicsDevice::new().without_extension(ANGLE_INSTANCED_ARRAYS));
    let program = ShaderProgram::new(&ctx, INSTANCED_VERTEX, PASSTHROUGH_FRAGMENT);

    assert!(Drawable::new_instanced(&ctx, program, triangle(&ctx, true), 2).is_err());
    assert_eq!(mock.lock().unwrap().live_program_count(), 0);
}

// ============================================================================
// DELETE
// ============================================================================

#[test]
fn test_delete_keeps_shared_geometry() {
    let (ctx, mock) = mock_context();
    let drawable = instanced(&ctx, 2);
    let geometry_buffers = 3;

    let geometry = drawable.delete();

    {
        let device = mock.lock().unwrap();
        assert_eq!(device.live_vertex_array_count(), 0);
        assert_eq!(device.live_program_count(), 0);
        assert_eq!(device.live_buffer_count(), geometry_buffers);
    }

    Arc::try_unwrap(geometry).ok().unwrap().delete();
    assert_eq!(mock.lock().unwrap().live_buffer_count(), 0);
}
