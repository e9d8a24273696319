//! Ping-pong pass scheduling
//!
//! A `SwapRenderer` keeps name-keyed textures, render targets and
//! full-screen passes. `run` draws one pass from named inputs into a named
//! output; `swap` exchanges two names so the next run reads what the last
//! one wrote.

mod swap_renderer;

pub use swap_renderer::{SwapRenderer, SwapTextureDesc, QUAD_INDICES, QUAD_POSITIONS, QUAD_UVS, UV_ATTRIBUTE};
