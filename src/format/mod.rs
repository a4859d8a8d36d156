//! On-disk tile container.
//!
//! A tile file holds one frame's render buffers split into square on-disk
//! tiles of [`IMAGE_TILE_SIZE`] pixels, independent of the scheduling tile
//! size. The container is seekable: tiles are located through a table, so
//! they may be written in any order and read back individually.
//!
//! ```text
//! ┌──────────────┐
//! │ Header (32B) │  magic, version, flags, dimensions, counts
//! ├──────────────┤
//! │ Metadata     │  JSON ImageSpec: channels, buffer params, film, denoise
//! ├──────────────┤
//! │ Tile table   │  offset / length / SHA-256 per on-disk tile
//! ├──────────────┤
//! │ Payloads     │  f32 LE pixels, channels interleaved
//! └──────────────┘
//! ```
//!
//! - [`TileFileWriter`]: creates a file and places tiles by grid index
//! - [`TileFileReader`]: validates a file and reconstructs the full frame

pub mod header;
pub mod reader;
pub mod spec;
pub mod table;
pub mod writer;

pub use header::{FileHeader, FLAG_FINALIZED, HEADER_SIZE, MAGIC, VERSION};
pub use reader::{TileFileReader, TileFileSummary};
pub use spec::{ImageSpec, IMAGE_TILE_SIZE};
pub use table::{TileEntry, ENTRY_SIZE};
pub use writer::TileFileWriter;
