//! Render buffer layout and storage.
//!
//! - [`BufferParams`]: frame geometry plus the ordered pass list
//! - [`BufferPass`] / [`PassKind`]: one named channel group
//! - [`RenderBuffers`]: interleaved `f32` pixels for a tile or a full frame

mod params;
mod passes;
mod render_buffers;

pub use params::BufferParams;
pub use passes::{BufferPass, PassKind};
pub use render_buffers::RenderBuffers;
