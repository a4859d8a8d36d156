//! Render session driving a [`TileManager`].
//!
//! A session renders one frame at a time: it schedules tiles, asks a
//! [`TileRenderer`] to fill each tile buffer, streams the tiles to disk and,
//! once the manager reports the file as written, reads the full frame back.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};

use tracing::{info, warn};

use crate::buffers::{BufferParams, RenderBuffers};
use crate::config::TileStoreConfig;
use crate::error::TileError;
use crate::scene::{DenoiseParams, Scene};
use crate::tile::TileManager;

/// Fills tile buffers with pixels.
pub trait TileRenderer {
    /// Render into `buffers`. Its params give the tile's size, position in
    /// the frame and channel layout.
    fn render_tile(&self, buffers: &mut RenderBuffers);
}

/// Deterministic test pattern.
///
/// Every channel value is a function of the pixel's position in the full
/// image and the channel index, so any tile can be recomputed independently.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternRenderer {
    seed: u32,
}

impl PatternRenderer {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    /// Value of `channel` at image position `(x, y)`.
    pub fn value(&self, x: u32, y: u32, channel: usize) -> f32 {
        let v = (x as u64 * 31 + y as u64 * 17 + channel as u64 * 7 + self.seed as u64) % 256;
        v as f32 / 255.0
    }
}

impl TileRenderer for PatternRenderer {
    fn render_tile(&self, buffers: &mut RenderBuffers) {
        let params = buffers.params().clone();
        for y in 0..params.height {
            for x in 0..params.width {
                let px = buffers.pixel_mut(x, y);
                for (channel, value) in px.iter_mut().enumerate() {
                    *value = self.value(params.offset_x + x, params.offset_y + y, channel);
                }
            }
        }
    }
}

/// Result of one rendered frame.
#[derive(Debug)]
pub struct FrameResult {
    /// Full frame read back from the tile file
    pub buffers: RenderBuffers,

    /// Denoiser settings stored in the tile file
    pub denoise: DenoiseParams,

    /// Path of the finalized tile file
    pub path: PathBuf,

    /// Number of tiles rendered before the frame finished or was cancelled
    pub tiles_rendered: usize,
}

/// Renders frames through a tile file.
pub struct RenderSession<R: TileRenderer> {
    manager: TileManager,
    renderer: R,
    scene: Scene,
    tile_size: u32,
    cancel_after: Option<usize>,
    written: Receiver<PathBuf>,
}

impl<R: TileRenderer> RenderSession<R> {
    pub fn new(config: TileStoreConfig, renderer: R) -> Self {
        let (tx, rx) = mpsc::channel();
        let mut manager = TileManager::new(config);
        manager.set_full_buffer_written_cb(move |path| {
            // The receiver lives as long as the session that owns the manager
            let _ = tx.send(path.to_path_buf());
        });

        Self {
            manager,
            renderer,
            scene: Scene::default(),
            tile_size: crate::format::IMAGE_TILE_SIZE,
            cancel_after: None,
            written: rx,
        }
    }

    pub fn with_scene(mut self, scene: Scene) -> Self {
        self.scene = scene;
        self
    }

    /// Suggested tile size; aligned up to the on-disk tile size when rendering.
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Stop each frame after `tiles` tiles. Unrendered tiles read back as zeros.
    pub fn cancel_after(mut self, tiles: usize) -> Self {
        self.cancel_after = Some(tiles);
        self
    }

    #[inline]
    pub fn manager(&self) -> &TileManager {
        &self.manager
    }

    #[inline]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Render one frame configured by `params` and read it back from disk.
    ///
    /// If rendering a tile fails, the partial tile file is finalized and
    /// removed before the error is returned, so the session can render the
    /// next frame.
    pub fn render_frame(&mut self, params: &BufferParams) -> Result<FrameResult, TileError> {
        let tile_size = TileManager::compute_render_tile_size(self.tile_size);
        self.manager.reset_scheduling(params, (tile_size, tile_size));
        self.manager.update(params, &self.scene)?;

        let tiles_rendered = match self.render_tiles() {
            Ok(rendered) => rendered,
            Err(e) => {
                self.abandon_frame();
                return Err(e);
            }
        };

        // Cancelled before the first tile: finishing still yields a zero-filled file
        if !self.manager.is_open() {
            self.manager.open_tile_output()?;
        }
        self.manager.finish_write_tiles()?;

        let path = self.written.try_iter().last().ok_or(TileError::InvalidState(
            "frame finished without writing a tile file",
        ))?;

        let mut buffers = RenderBuffers::new(params.clone());
        let mut denoise = DenoiseParams::default();
        self.manager
            .read_full_buffer_from_disk(&path, &mut buffers, &mut denoise)?;

        info!(
            path = %path.display(),
            tiles = tiles_rendered,
            "Frame complete"
        );

        Ok(FrameResult {
            buffers,
            denoise,
            path,
            tiles_rendered,
        })
    }

    fn render_tiles(&mut self) -> Result<usize, TileError> {
        let mut tiles_rendered = 0;
        while self.manager.next() {
            if self.cancel_after.is_some_and(|n| tiles_rendered >= n) {
                info!(
                    rendered = tiles_rendered,
                    total = self.manager.num_tiles(),
                    "Render cancelled"
                );
                break;
            }

            let tile = self.manager.current_tile()?;
            let mut buffers = RenderBuffers::new(self.manager.tile_buffer_params(&tile));
            self.renderer.render_tile(&mut buffers);
            self.manager.write_tile(&buffers)?;
            tiles_rendered += 1;
        }
        Ok(tiles_rendered)
    }

    /// Close and delete the file of a frame that failed mid-render.
    fn abandon_frame(&mut self) {
        if !self.manager.is_open() {
            return;
        }

        if let Err(e) = self.manager.finish_write_tiles() {
            warn!(error = %e, "Failed to finalize abandoned tile file");
        }
        self.manager.remove_tile_file();

        // Drop the abandoned file's completion notification
        self.written.try_iter().for_each(drop);
    }

    /// Delete the last tile file.
    pub fn remove_tile_file(&self) {
        self.manager.remove_tile_file()
    }
}
