//! End-to-end scenarios over the headless device
//!
//! Run with: cargo test --test scenario_integration_tests


use std::sync::Arc;
use gpu_test_utils::*;
use swapgpu::glam::{Mat4, Vec3};
use swapgpu::graphics_device::mock_graphics_device::MockGraphicsDevice;
use swapgpu::swapgpu::device::{FramebufferStatus, Precision, TexelFormat, UniformValue};
use swapgpu::swapgpu::resource::{
    lock_shared, AttributeDesc, Drawable, GeometryBuffer, IndexData, RenderTarget, RenderTargetDesc,
    ShaderProgram,
};
use swapgpu::swapgpu::{SwapRenderer, SwapTextureDesc};

// ============================================================================
// SCENARIO 1: INDEXED VERTEX COUNT
// ============================================================================

#[test]
fn test_integration_indexed_quad_vertex_count() {
    let (ctx, _mock) = mock_context();
    let mut geometry = GeometryBuffer::new(&ctx);

    geometry.add_index(IndexData::for_vertex_count(&[0, 1, 2, 0, 2, 3], 4)).unwrap();
    geometry
        .add_attribute("position", AttributeDesc::floats(&[0.0; 12], 3))
        .unwrap();

    assert_eq!(geometry.vertex_count(), 6);
    assert_eq!(geometry.index_count(), 6);
    geometry.delete();
}

// ============================================================================
// SCENARIO 2: PING-PONG FEEDBACK
// ============================================================================

#[test]
fn test_integration_swap_feedback_loop() {
    let (ctx, mock) = mock_context();
    let mut renderer = SwapRenderer::new(&ctx).unwrap();
    for name in ["A", "B"] {
        renderer.create_texture(name, SwapTextureDesc::new(4, 4)).unwrap();
        renderer.create_render_target(name, 4, 4).unwrap();
    }
    renderer.create_pass("p", QUAD_VERTEX, COLOR_FRAGMENT).unwrap();
    assert!(renderer.use_program("p"));

    // Counting shader: every run adds one to what it reads
    let program = renderer.pass("p").unwrap().program().handle().unwrap();
    mock.lock().unwrap().set_program_kernel(program, Box::new(|inputs| {
        inputs[0].iter().map(|v| v + 1.0).collect()
    }));

    let mut frames = Vec::new();
    for _ in 0..3 {
        assert!(renderer.run(&["A"], Some("B")));
        let written = lock_shared(renderer.get_texture("B").unwrap()).handle();
        let pixels = mock.lock().unwrap().texture_state(written).unwrap().pixels().unwrap().to_vec();
        frames.push(pixels[0]);
        renderer.swap("A", "B");
    }

    assert_eq!(frames, vec![1.0, 2.0, 3.0]);
    renderer.delete();
    assert_eq!(mock.lock().unwrap().live_texture_count(), 0);
}

// ============================================================================
// SCENARIO 3: INSTANCE MATRICES
// ============================================================================

#[test]
fn test_integration_instanced_mesh_matrices() {
    let (ctx, mock) = mock_context();
    let mut geometry = GeometryBuffer::new(&ctx);
    geometry
        .add_attribute("position", AttributeDesc::floats(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], 3))
        .unwrap();
    let program = ShaderProgram::new(&ctx, INSTANCED_VERTEX, COLOR_FRAGMENT);
    let mut mesh = Drawable::new_instanced(&ctx, program, Arc::new(geometry), 3).unwrap();

    let identity = Mat4::IDENTITY.to_cols_array();
    for slot in mesh.instancing().unwrap().matrices().chunks(16) {
        assert_eq!(slot, &identity[..]);
    }

    let translation = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
    mesh.set_matrix_at(1, translation).unwrap();

    let floats = mock.lock().unwrap().buffer_floats(mesh.instancing().unwrap().buffer()).unwrap();
    assert_eq!(&floats[0..16], &identity[..]);
    assert_eq!(&floats[16..32], &translation.to_cols_array()[..]);
    assert_eq!(&floats[32..48], &identity[..]);
    assert!(mesh.draw());
}

// ============================================================================
// SCENARIO 4: MISSING UNIFORM
// ============================================================================

#[test]
fn test_integration_missing_uniform_is_noop() {
    let (ctx, mock) = mock_context();
    let mut geometry = GeometryBuffer::new(&ctx);
    geometry
        .add_attribute("position", AttributeDesc::floats(&[0.0; 9], 3))
        .unwrap();
    let program = ShaderProgram::new(&ctx, PASSTHROUGH_VERTEX, COLOR_FRAGMENT);
    let mut drawable = Drawable::new(&ctx, program, Arc::new(geometry)).unwrap();

    assert!(!drawable.set_uniform_kind("doesNotExist", "float", &[1.0]).unwrap());
    assert!(drawable.set_uniform_kind("time", "float", &[0.5]).unwrap());
    assert!(drawable.draw());

    let handle = drawable.program().handle().unwrap();
    let device = mock.lock().unwrap();
    assert_eq!(device.draw_calls, 1);
    assert_eq!(device.uniform_value(handle, "time"), Some(&UniformValue::Float(0.5)));
}

// ============================================================================
// SCENARIO 5: FLOAT TARGET FALLBACK
// ============================================================================

#[test]
fn test_integration_float_target_without_float_support() {
    let (ctx, _mock) = mock_context_with(MockGraphicsDevice::new().without_float_render_targets());
    let desc = RenderTargetDesc::new(8, 8).with_texel_format(TexelFormat::rgba(Precision::Float));

    let target = RenderTarget::new(&ctx, desc).unwrap();

    assert_eq!(lock_shared(target.color_texture()).precision(), Precision::HalfFloat);
    assert_eq!(target.status(), FramebufferStatus::Complete);
}

#[test]
fn test_integration_float_target_without_any_float_support() {
    let (ctx, mock) = mock_context_with(
        MockGraphicsDevice::new()
            .without_float_render_targets()
            .without_half_float_render_targets(),
    );
    let desc = RenderTargetDesc::new(8, 8).with_texel_format(TexelFormat::rgba(Precision::Float));

    let target = RenderTarget::new(&ctx, desc).unwrap();

    let handle = lock_shared(target.color_texture()).handle();
    assert_eq!(lock_shared(target.color_texture()).precision(), Precision::UnsignedByte);
    assert!(mock.lock().unwrap().texture_state(handle).is_some());
    assert_eq!(target.status(), FramebufferStatus::Complete);
}
