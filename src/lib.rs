//! # tile-spool
//!
//! Tile-based render buffer management with on-disk tile streaming.
//!
//! A [`TileManager`] splits a full-frame render into rectangular tiles, hands
//! them out in row-major order, writes each finished tile into a seekable
//! tiled container on disk and reconstructs the full frame from that file.
//!
//! ## Features
//!
//! - **Tile scheduling**: deterministic row-major grid with clipped edge tiles
//! - **Random-access tile files**: tiles land at their grid slot in any order
//! - **Integrity**: every tile payload carries a SHA-256 digest
//! - **Crash detection**: files are flagged finalized only after a clean finish
//! - **Previews**: JPEG export of any pass of a reconstructed frame
//!
//! ## Architecture
//!
//! - [`buffers`] - Buffer params, passes and interleaved float pixel storage
//! - [`scene`] - Film and denoiser settings carried in the file metadata
//! - [`tile`] - Scheduler, tile file store, manager façade and preview encoder
//! - [`mod@format`] - The on-disk container: header, tile table, writer and reader
//! - [`io`] - Range readers used by the container reader
//! - [`session`] - Render session driving the manager with a tile renderer
//! - [`config`] - Store configuration and CLI types
//!
//! ## Example
//!
//! ```rust,no_run
//! use tile_spool::{BufferParams, BufferPass, PatternRenderer, RenderSession, TileStoreConfig};
//!
//! fn main() -> Result<(), tile_spool::TileError> {
//!     let params = BufferParams::new(1920, 1080)
//!         .with_pass(BufferPass::combined())
//!         .with_pass(BufferPass::depth());
//!
//!     let config = TileStoreConfig::new("my-session");
//!     let mut session = RenderSession::new(config, PatternRenderer::default());
//!
//!     let frame = session.render_frame(&params)?;
//!     println!("read back {} values from {}", frame.buffers.data().len(), frame.path.display());
//!     session.remove_tile_file();
//!     Ok(())
//! }
//! ```

pub mod buffers;
pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod scene;
pub mod session;
pub mod tile;

// Re-export commonly used types
pub use buffers::{BufferParams, BufferPass, PassKind, RenderBuffers};
pub use config::{
    Cli, Command, ExportConfig, InspectConfig, OutputFormat, RenderConfig, TileStoreConfig,
};
pub use error::{ErrorKind, FormatError, IoError, TileError};
pub use format::{ImageSpec, TileFileReader, TileFileSummary, TileFileWriter, IMAGE_TILE_SIZE};
pub use io::{FileRangeReader, MemoryRangeReader, RangeReader};
pub use scene::{DenoiseParams, DenoisePrefilter, DenoiserType, FilmSettings, Scene};
pub use session::{FrameResult, PatternRenderer, RenderSession, TileRenderer};
pub use tile::{
    compute_render_tile_size, PreviewEncoder, Tile, TileFileStore, TileManager, TileScheduler,
};
