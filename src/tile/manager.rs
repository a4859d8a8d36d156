//! Tile manager façade.
//!
//! [`TileManager`] is what a render session talks to. It combines the
//! [`TileScheduler`] cursor with the [`TileFileStore`] so the session can
//! iterate tiles, write each finished tile and read the frame back, without
//! knowing how tiles are laid out on disk.

use std::path::Path;

use tracing::debug;

use crate::buffers::{BufferParams, RenderBuffers};
use crate::config::TileStoreConfig;
use crate::error::TileError;
use crate::format::{ImageSpec, IMAGE_TILE_SIZE};
use crate::scene::{DenoiseParams, Scene};

use super::scheduler::{compute_render_tile_size, Tile, TileScheduler};
use super::store::TileFileStore;

/// Schedules the tiles of a frame and streams them through a tile file.
///
/// One manager is created per render session. It is `Send` but not
/// internally synchronized; callers serialize access.
pub struct TileManager {
    scheduler: TileScheduler,
    store: TileFileStore,

    buffer_params: BufferParams,
    tile_size: (u32, u32),
}

impl TileManager {
    pub fn new(config: TileStoreConfig) -> Self {
        Self {
            scheduler: TileScheduler::new(),
            store: TileFileStore::new(config),
            buffer_params: BufferParams::default(),
            tile_size: (IMAGE_TILE_SIZE, IMAGE_TILE_SIZE),
        }
    }

    /// Align a suggested scheduling tile edge to the on-disk tile size.
    pub fn compute_render_tile_size(suggested_tile_size: u32) -> u32 {
        compute_render_tile_size(suggested_tile_size)
    }

    /// Start scheduling a new frame.
    ///
    /// Rewinds the cursor and recomputes the grid. An open tile file is left
    /// alone; a finalized one no longer blocks writes, so the frame gets a
    /// new file.
    pub fn reset_scheduling(&mut self, params: &BufferParams, tile_size: (u32, u32)) {
        self.buffer_params = params.clone();
        self.scheduler.reset(params, tile_size);
        self.tile_size = self.scheduler.tile_size();
        self.store.begin_frame();

        debug!(
            width = params.width,
            height = params.height,
            tile_width = self.tile_size.0,
            tile_height = self.tile_size.1,
            tiles = self.scheduler.num_tiles(),
            "Reset tile scheduling"
        );
    }

    /// Adopt new buffer params and scene settings.
    ///
    /// Rebuilds the image spec used for the next tile file and re-runs
    /// scheduling with the current tile size.
    pub fn update(&mut self, params: &BufferParams, scene: &Scene) -> Result<(), TileError> {
        params.validate()?;
        if self.store.is_open() {
            return Err(TileError::InvalidState(
                "cannot update buffer params while a tile file is open",
            ));
        }

        if self.buffer_params.modified(params) {
            debug!(
                channels = params.num_channels(),
                "Buffer params changed, tile file spec rebuilt"
            );
        }

        self.store.set_image_spec(ImageSpec::new(params, scene))?;
        self.reset_scheduling(params, self.tile_size);
        Ok(())
    }

    #[inline]
    pub fn buffer_params(&self) -> &BufferParams {
        &self.buffer_params
    }

    #[inline]
    pub fn tile_size(&self) -> (u32, u32) {
        self.tile_size
    }

    #[inline]
    pub fn scheduler(&self) -> &TileScheduler {
        &self.scheduler
    }

    #[inline]
    pub fn num_tiles(&self) -> usize {
        self.scheduler.num_tiles()
    }

    #[inline]
    pub fn has_multiple_tiles(&self) -> bool {
        self.scheduler.has_multiple_tiles()
    }

    pub fn next(&mut self) -> bool {
        self.scheduler.next()
    }

    #[inline]
    pub fn done(&self) -> bool {
        self.scheduler.done()
    }

    pub fn current_tile(&self) -> Result<Tile, TileError> {
        self.scheduler.current_tile()
    }

    pub fn get_tile_for_index(&self, index: usize) -> Tile {
        self.scheduler.get_tile_for_index(index)
    }

    /// Params of the buffer a renderer should fill for `tile`.
    pub fn tile_buffer_params(&self, tile: &Tile) -> BufferParams {
        self.buffer_params.tile_params(tile)
    }

    /// Create the tile file for the current frame before any tile is written.
    pub fn open_tile_output(&mut self) -> Result<(), TileError> {
        self.store.open_tile_output()
    }

    /// Write a rendered tile to the tile file. See [`TileFileStore::write_tile`].
    pub fn write_tile(&mut self, tile_buffers: &RenderBuffers) -> Result<(), TileError> {
        self.store.write_tile(tile_buffers)
    }

    /// Finalize the tile file. See [`TileFileStore::finish_write_tiles`].
    pub fn finish_write_tiles(&mut self) -> Result<(), TileError> {
        self.store.finish_write_tiles()
    }

    #[inline]
    pub fn has_written_tiles(&self) -> bool {
        self.store.has_written_tiles()
    }

    #[inline]
    pub fn num_tiles_written(&self) -> usize {
        self.store.num_tiles_written()
    }

    pub fn tile_file_path(&self) -> Option<&Path> {
        self.store.tile_file_path()
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.store.is_open()
    }

    /// Reconstruct the full frame from a finalized tile file.
    pub fn read_full_buffer_from_disk(
        &self,
        path: &Path,
        buffers: &mut RenderBuffers,
        denoise_params: &mut DenoiseParams,
    ) -> Result<(), TileError> {
        self.store
            .read_full_buffer_from_disk(path, buffers, denoise_params)
    }

    /// Best-effort delete of the last tile file.
    pub fn remove_tile_file(&self) {
        self.store.remove_tile_file()
    }

    /// Register the callback invoked with the path of each finalized file.
    pub fn set_full_buffer_written_cb(&mut self, cb: impl FnMut(&Path) + Send + 'static) {
        self.store.set_full_buffer_written_cb(cb)
    }
}
