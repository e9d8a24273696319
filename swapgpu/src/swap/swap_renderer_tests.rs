/// Unit tests for swap_renderer.rs

use std::sync::Arc;
use crate::error::Error;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::{Precision, TextureData, TextureFilter, UniformValue};
use crate::resource::texture::lock_shared;
use crate::swap::*;
use crate::test_support::{mock_context, mock_context_with};

const QUAD_VERTEX: &str = "attribute vec2 position;\nattribute vec2 uv;\nvarying vec2 vUv;\nvoid main() {\n    vUv = uv;\n    gl_Position = vec4(position, 0.0, 1.0);\n}\n";
const STEP_FRAGMENT: &str = "varying vec2 vUv;\nuniform sampler2D A;\nuniform float time;\nvoid main() {\n    gl_FragColor = texture2D(A, vUv) + vec4(1.0);\n}\n";

fn texture_handle(renderer: &SwapRenderer, name: &str) -> crate::graphics_device::TextureHandle {
    lock_shared(renderer.get_texture(name).unwrap()).handle()
}

/// Two float 4x4 buffers "A" and "B" with targets and an active pass "p"
fn ping_pong() -> (SwapRenderer, Arc<std::sync::Mutex<MockGraphicsDevice>>) {
    let (ctx, mock) = mock_context();
    let mut renderer = SwapRenderer::new(&ctx).unwrap();
    for name in ["A", "B"] {
        renderer.create_texture(name, SwapTextureDesc::new(4, 4)).unwrap();
        renderer.create_render_target(name, 4, 4).unwrap();
    }
    renderer.create_pass("p", QUAD_VERTEX, STEP_FRAGMENT).unwrap();
    assert!(renderer.use_program("p"));
    (renderer, mock)
}

// ============================================================================
// CONSTRUCTION
// ============================================================================

#[test]
fn test_new_builds_full_screen_quad() {
    let (ctx, mock) = mock_context();
    let renderer = SwapRenderer::new(&ctx).unwrap();

    assert_eq!(renderer.quad().vertex_count(), 6);
    assert_eq!(renderer.quad().attribute("position").unwrap().component_size, 2);
    assert_eq!(mock.lock().unwrap().live_buffer_count(), 3);
    assert_eq!(renderer.texture_count(), 0);
    assert_eq!(renderer.active_pass(), None);
}

// ============================================================================
// TEXTURES & TARGETS
// ============================================================================

#[test]
fn test_texture_uses_best_precision() {
    let (ctx, _mock) = mock_context();
    let mut renderer = SwapRenderer::new(&ctx).unwrap();
    let texture = renderer.create_texture("A", SwapTextureDesc::new(4, 4)).unwrap();
    assert_eq!(lock_shared(texture).precision(), Precision::Float);
}

#[test]
fn test_texture_precision_follows_device() {
    let (ctx, _mock) = mock_context_with(MockGraphicsDevice::new().without_float_render_targets());
    let mut renderer = SwapRenderer::new(&ctx).unwrap();
    let texture = renderer.create_texture("A", SwapTextureDesc::new(4, 4)).unwrap();
    assert_eq!(lock_shared(texture).precision(), Precision::HalfFloat);
}

#[test]
fn test_texture_precision_override() {
    let (ctx, _mock) = mock_context();
    let mut renderer = SwapRenderer::new(&ctx).unwrap();
    let desc = SwapTextureDesc::new(2, 2)
        .with_precision(Precision::UnsignedByte)
        .with_filter(TextureFilter::Nearest);

    let texture = lock_shared(renderer.create_texture("A", desc).unwrap());

    assert_eq!(texture.precision(), Precision::UnsignedByte);
    assert_eq!(texture.filters(), (TextureFilter::Nearest, TextureFilter::Nearest));
}

#[test]
fn test_texture_initial_data() {
    let (ctx, mock) = mock_context();
    let mut renderer = SwapRenderer::new(&ctx).unwrap();
    let data = [0.5f32; 16];
    renderer
        .create_texture("A", SwapTextureDesc::new(2, 2).with_data(TextureData::F32(&data)))
        .unwrap();

    let handle = texture_handle(&renderer, "A");
    assert_eq!(mock.lock().unwrap().texture_state(handle).unwrap().pixels(), Some(&data[..]));
}

#[test]
fn test_duplicate_texture_rejected() {
    let (ctx, _mock) = mock_context();
    let mut renderer = SwapRenderer::new(&ctx).unwrap();
    renderer.create_texture("A", SwapTextureDesc::new(1, 1)).unwrap();
    assert!(renderer.create_texture("A", SwapTextureDesc::new(1, 1)).is_err());
    assert_eq!(renderer.texture_count(), 1);
}

#[test]
fn test_render_target_wraps_registered_texture() {
    let (renderer, mock) = ping_pong();
    let target = renderer.get_render_target("A").unwrap();

    assert!(!target.owns_color_texture());
    assert!(!target.has_depth());
    assert!(Arc::ptr_eq(target.color_texture(), renderer.get_texture("A").unwrap()));
    assert_eq!(
        mock.lock().unwrap().framebuffer_color(target.framebuffer()),
        Some(texture_handle(&renderer, "A")),
    );
}

#[test]
fn test_render_target_requires_texture() {
    let (ctx, _mock) = mock_context();
    let mut renderer = SwapRenderer::new(&ctx).unwrap();
    assert!(matches!(renderer.create_render_target("missing", 4, 4), Err(Error::InvalidResource(_))));
}

// ============================================================================
// PASSES & UNIFORMS
// ============================================================================

#[test]
fn test_use_program_unknown_pass() {
    let (mut renderer, _mock) = ping_pong();
    assert!(!renderer.use_program("nope"));
    assert_eq!(renderer.active_pass(), Some("p"));
}

#[test]
fn test_set_uniform_forwards_to_active_pass() {
    let (mut renderer, mock) = ping_pong();
    assert!(renderer.set_uniform("time", 2.5f32));
    assert!(!renderer.set_uniform("doesNotExist", 1.0f32));

    let program = renderer.pass("p").unwrap().program().handle().unwrap();
    assert_eq!(mock.lock().unwrap().uniform_value(program, "time"), Some(&UniformValue::Float(2.5)));
}

#[test]
fn test_set_uniform_without_active_pass() {
    let (ctx, _mock) = mock_context();
    let mut renderer = SwapRenderer::new(&ctx).unwrap();
    assert!(!renderer.set_uniform("time", 1.0f32));
    assert!(!renderer.set_uniform_kind("time", "float", &[1.0]).unwrap());
}

#[test]
fn test_set_uniform_kind_unknown_kind() {
    let (mut renderer, _mock) = ping_pong();
    assert!(renderer.set_uniform_kind("time", "float", &[1.0]).unwrap());
    assert!(matches!(
        renderer.set_uniform_kind("time", "quaternion", &[1.0]),
        Err(Error::UnknownUniformKind(_))
    ));
}

#[test]
fn test_invalid_pass_registers_but_does_not_draw() {
    let (ctx, mock) = mock_context();
    let mut renderer = SwapRenderer::new(&ctx).unwrap();
    renderer.create_pass("broken", "nonsense", STEP_FRAGMENT).unwrap();
    assert!(renderer.use_program("broken"));

    assert!(!renderer.run(&[], None));
    assert_eq!(mock.lock().unwrap().draw_calls, 0);
}

// ============================================================================
// RUN
// ============================================================================

#[test]
fn test_run_without_active_pass() {
    let (ctx, _mock) = mock_context();
    let mut renderer = SwapRenderer::new(&ctx).unwrap();
    assert!(!renderer.run(&["A"], Some("B")));
}

#[test]
fn test_run_into_target() {
    let (mut renderer, mock) = ping_pong();

    assert!(renderer.run(&["A"], Some("B")));

    let device = mock.lock().unwrap();
    assert_eq!(device.call_count("draw_elements"), 1);
    assert_eq!(device.bound_framebuffer(), None);
    assert_eq!(device.bound_texture(0), None);
    assert_eq!(device.last_viewport(), Some((0, 0, 800, 600)));
}

#[test]
fn test_run_to_default_surface() {
    let (mut renderer, mock) = ping_pong();
    let framebuffers = mock.lock().unwrap().call_count("bind_framebuffer");

    assert!(renderer.run(&["A"], None));

    let device = mock.lock().unwrap();
    assert_eq!(device.call_count("bind_framebuffer"), framebuffers + 1);
    assert_eq!(device.last_viewport(), Some((0, 0, 800, 600)));
}

#[test]
fn test_run_binds_inputs_in_order() {
    let (mut renderer, mock) = ping_pong();
    renderer.create_texture("C", SwapTextureDesc::new(4, 4).with_data(TextureData::F32(&[3.0; 64]))).unwrap();
    let program = renderer.pass("p").unwrap().program().handle().unwrap();
    // output = first input + second input
    mock.lock().unwrap().set_program_kernel(program, Box::new(|inputs| {
        inputs[0].iter().zip(&inputs[1]).map(|(a, c)| a + c).collect()
    }));

    renderer.run(&["A", "C"], Some("B"));

    let handle = texture_handle(&renderer, "B");
    let device = mock.lock().unwrap();
    assert!(device.texture_state(handle).unwrap().pixels().unwrap().iter().all(|v| *v == 3.0));
}

// ============================================================================
// SWAP
// ============================================================================

#[test]
fn test_swap_exchanges_both_maps() {
    let (mut renderer, _mock) = ping_pong();
    let texture_a = renderer.get_texture("A").unwrap().clone();
    let texture_b = renderer.get_texture("B").unwrap().clone();
    let framebuffer_a = renderer.get_render_target("A").unwrap().framebuffer();
    let framebuffer_b = renderer.get_render_target("B").unwrap().framebuffer();

    renderer.swap("A", "B");

    assert!(Arc::ptr_eq(renderer.get_texture("A").unwrap(), &texture_b));
    assert!(Arc::ptr_eq(renderer.get_texture("B").unwrap(), &texture_a));
    assert_eq!(renderer.get_render_target("A").unwrap().framebuffer(), framebuffer_b);
    assert_eq!(renderer.get_render_target("B").unwrap().framebuffer(), framebuffer_a);

    renderer.swap("A", "B");

    assert!(Arc::ptr_eq(renderer.get_texture("A").unwrap(), &texture_a));
    assert_eq!(renderer.get_render_target("B").unwrap().framebuffer(), framebuffer_b);
}

#[test]
fn test_swap_keeps_target_and_texture_paired() {
    let (mut renderer, _mock) = ping_pong();
    renderer.swap("A", "B");
    for name in ["A", "B"] {
        let target = renderer.get_render_target(name).unwrap();
        assert!(Arc::ptr_eq(target.color_texture(), renderer.get_texture(name).unwrap()));
    }
}

#[test]
fn test_swap_with_unregistered_name_moves_entry() {
    let (mut renderer, _mock) = ping_pong();
    let texture_a = renderer.get_texture("A").unwrap().clone();

    renderer.swap("A", "Z");

    assert!(renderer.get_texture("A").is_none());
    assert!(renderer.get_render_target("A").is_none());
    assert!(Arc::ptr_eq(renderer.get_texture("Z").unwrap(), &texture_a));
    assert_eq!(renderer.texture_count(), 2);
}

#[test]
fn test_swap_same_name_is_noop() {
    let (mut renderer, _mock) = ping_pong();
    let texture_a = renderer.get_texture("A").unwrap().clone();
    renderer.swap("A", "A");
    assert!(Arc::ptr_eq(renderer.get_texture("A").unwrap(), &texture_a));
}

#[test]
fn test_swap_feeds_output_back() {
    let (mut renderer, mock) = ping_pong();
    let program = renderer.pass("p").unwrap().program().handle().unwrap();
    mock.lock().unwrap().set_program_kernel(program, Box::new(|inputs| {
        inputs[0].iter().map(|v| v + 1.0).collect()
    }));

    renderer.run(&["A"], Some("B"));
    renderer.swap("A", "B");
    renderer.run(&["A"], Some("B"));

    let a = texture_handle(&renderer, "A");
    let b = texture_handle(&renderer, "B");
    let device = mock.lock().unwrap();
    assert!(device.texture_state(a).unwrap().pixels().unwrap().iter().all(|v| *v == 1.0));
    assert!(device.texture_state(b).unwrap().pixels().unwrap().iter().all(|v| *v == 2.0));
}

// ============================================================================
// RESIZE / DELETE
// ============================================================================

#[test]
fn test_resize_targets_and_textures() {
    let (mut renderer, _mock) = ping_pong();
    renderer.resize(16, 8).unwrap();
    for name in ["A", "B"] {
        assert_eq!(renderer.get_render_target(name).unwrap().size(), (16, 8));
        assert_eq!(lock_shared(renderer.get_texture(name).unwrap()).size(), (16, 8));
    }
}

#[test]
fn test_delete_releases_everything() {
    let (renderer, mock) = ping_pong();
    let held = renderer.get_texture("A").unwrap().clone();

    renderer.delete();

    let device = mock.lock().unwrap();
    assert_eq!(device.live_texture_count(), 0);
    assert_eq!(device.live_framebuffer_count(), 0);
    assert_eq!(device.live_buffer_count(), 0);
    assert_eq!(device.live_program_count(), 0);
    assert_eq!(device.live_vertex_array_count(), 0);
    drop(held);
}
