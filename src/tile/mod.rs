//! Tile scheduling and tile file streaming.
//!
//! # Architecture
//!
//! The manager sits between the render session and the on-disk container:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             Render Session              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              TileManager                │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │TileScheduler │  │ TileFileStore   │  │
//! │  │ (grid +      │  │ (Closed / Open  │  │
//! │  │  cursor)     │  │  / Finalized)   │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │      TileFileWriter / TileFileReader    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileManager`]: façade used by the render session
//! - [`TileScheduler`]: splits a frame into [`Tile`]s and iterates them row-major
//! - [`TileFileStore`]: lazily creates, finalizes, reads back and removes the tile file
//! - [`PreviewEncoder`]: JPEG preview of one pass of a reconstructed frame
//!
//! # Example
//!
//! ```no_run
//! use tile_spool::buffers::{BufferParams, BufferPass, RenderBuffers};
//! use tile_spool::config::TileStoreConfig;
//! use tile_spool::scene::Scene;
//! use tile_spool::tile::TileManager;
//!
//! fn main() -> Result<(), tile_spool::TileError> {
//!     let params = BufferParams::new(300, 200).with_pass(BufferPass::combined());
//!     let mut manager = TileManager::new(TileStoreConfig::new("session"));
//!
//!     let tile_size = TileManager::compute_render_tile_size(128);
//!     manager.reset_scheduling(&params, (tile_size, tile_size));
//!     manager.update(&params, &Scene::default())?;
//!
//!     while manager.next() {
//!         let tile = manager.current_tile()?;
//!         let buffers = RenderBuffers::new(manager.tile_buffer_params(&tile));
//!         // ... render into `buffers` ...
//!         manager.write_tile(&buffers)?;
//!     }
//!     manager.finish_write_tiles()?;
//!     Ok(())
//! }
//! ```

mod encoder;
mod manager;
mod scheduler;
mod store;

pub use encoder::{
    clamp_quality, is_valid_quality, PreviewEncoder, DEFAULT_JPEG_QUALITY, MAX_JPEG_QUALITY,
    MIN_JPEG_QUALITY,
};
pub use manager::TileManager;
pub use scheduler::{compute_render_tile_size, Tile, TileScheduler};
pub use store::{FullBufferWrittenCallback, TileFileStore};
