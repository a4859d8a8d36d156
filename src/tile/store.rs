//! Tile file lifecycle.
//!
//! The store owns at most one open tile file. The file is created lazily on
//! the first written tile, finalized once by `finish_write_tiles`, and can be
//! read back into a full-frame buffer afterwards.
//!
//! ```text
//!            write_tile                 finish_write_tiles
//!  Closed ──────────────────► Open ─────────────────────────► Finalized
//!    ▲                                                            │
//!    └──────────────── begin_frame / set_image_spec ──────────────┘
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::buffers::RenderBuffers;
use crate::config::TileStoreConfig;
use crate::error::TileError;
use crate::format::{ImageSpec, TileFileReader, TileFileWriter};
use crate::scene::DenoiseParams;

/// Called with the path of a tile file once it has been finalized.
pub type FullBufferWrittenCallback = Box<dyn FnMut(&Path) + Send>;

enum WriteState {
    /// No file for the current frame yet; the next write opens one.
    Closed,

    /// A file is open for writing. The writer owns the handle and the spec
    /// it was created with.
    Open(TileFileWriter),

    /// The current frame's file has been finalized; writes are rejected.
    Finalized,
}

/// Owns the on-disk tile file of one render session.
pub struct TileFileStore {
    config: TileStoreConfig,

    /// Spec for the next file, set by the manager whenever passes or size change
    image_spec: Option<ImageSpec>,

    state: WriteState,

    /// Index used to make the next file name unique within the session
    tile_file_index: u64,

    /// Path of the most recently created file
    tile_filepath: Option<PathBuf>,

    /// Scheduling tiles written to the most recently created file
    num_tiles_written: usize,

    full_buffer_written_cb: Option<FullBufferWrittenCallback>,
}

impl TileFileStore {
    pub fn new(config: TileStoreConfig) -> Self {
        Self {
            config,
            image_spec: None,
            state: WriteState::Closed,
            tile_file_index: 0,
            tile_filepath: None,
            num_tiles_written: 0,
            full_buffer_written_cb: None,
        }
    }

    #[inline]
    pub fn config(&self) -> &TileStoreConfig {
        &self.config
    }

    /// Register the callback invoked after a file has been finalized.
    pub fn set_full_buffer_written_cb(&mut self, cb: impl FnMut(&Path) + Send + 'static) {
        self.full_buffer_written_cb = Some(Box::new(cb));
    }

    /// Set the spec used for the next file.
    ///
    /// Fails while a file is open, since every tile of a file must match the
    /// spec it was created with.
    pub fn set_image_spec(&mut self, spec: ImageSpec) -> Result<(), TileError> {
        if self.is_open() {
            return Err(TileError::InvalidState(
                "cannot change the image spec while a tile file is open",
            ));
        }
        self.image_spec = Some(spec);
        self.begin_frame();
        Ok(())
    }

    #[inline]
    pub fn image_spec(&self) -> Option<&ImageSpec> {
        self.image_spec.as_ref()
    }

    /// Allow a new file after the previous one was finalized. An open file
    /// is left untouched.
    pub fn begin_frame(&mut self) {
        if matches!(self.state, WriteState::Finalized) {
            self.state = WriteState::Closed;
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self.state, WriteState::Open(_))
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        matches!(self.state, WriteState::Finalized)
    }

    /// Path of the most recently created tile file.
    pub fn tile_file_path(&self) -> Option<&Path> {
        self.tile_filepath.as_deref()
    }

    #[inline]
    pub fn num_tiles_written(&self) -> usize {
        self.num_tiles_written
    }

    #[inline]
    pub fn has_written_tiles(&self) -> bool {
        self.num_tiles_written != 0
    }

    /// Create a new tile file for the current image spec.
    pub fn open_tile_output(&mut self) -> Result<(), TileError> {
        if !matches!(self.state, WriteState::Closed) {
            return Err(TileError::InvalidState(
                "tile output is already open or finalized",
            ));
        }

        let spec = self.image_spec.clone().ok_or(TileError::InvalidState(
            "image spec is not configured; update() must be called before writing tiles",
        ))?;
        self.config.validate().map_err(TileError::InvalidParams)?;

        let path = self.config.tile_file_path(self.tile_file_index);
        self.tile_file_index += 1;

        let writer = TileFileWriter::create(&path, spec).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to create tile file");
            e
        })?;

        info!(path = %path.display(), "Writing tiles to disk");

        self.tile_filepath = Some(path);
        self.num_tiles_written = 0;
        self.state = WriteState::Open(writer);
        Ok(())
    }

    /// Write one scheduling tile's buffers into the tile file, opening it if needed.
    ///
    /// The tile position comes from the buffer params offset. The tile must
    /// start on an on-disk tile boundary and cover whole on-disk tiles unless
    /// it is clipped by the frame edge.
    pub fn write_tile(&mut self, tile_buffers: &RenderBuffers) -> Result<(), TileError> {
        if self.is_finalized() {
            return Err(TileError::InvalidState(
                "tile file has already been finalized",
            ));
        }

        let spec = self.image_spec.as_ref().ok_or(TileError::InvalidState(
            "image spec is not configured; update() must be called before writing tiles",
        ))?;

        if let Err(e) = spec.check_channels(tile_buffers.params()) {
            warn!(error = %e, "Rejected tile with mismatched channels");
            return Err(e);
        }
        let image_tiles = covered_image_tiles(spec, tile_buffers)?;

        if matches!(self.state, WriteState::Closed) {
            self.open_tile_output()?;
        }
        let WriteState::Open(writer) = &mut self.state else {
            return Err(TileError::InvalidState("tile output is not open"));
        };

        let params = tile_buffers.params();
        let local_x = writer.spec().buffer.offset_x as i64 - params.offset_x as i64;
        let local_y = writer.spec().buffer.offset_y as i64 - params.offset_y as i64;

        let mut pixels = Vec::new();
        for index in image_tiles {
            let region = writer.spec().tile_region(index);
            tile_buffers.read_region(
                (region.x as i64 + local_x) as u32,
                (region.y as i64 + local_y) as u32,
                region.width,
                region.height,
                &mut pixels,
            );
            if let Err(e) = writer.write_image_tile(index, &pixels) {
                error!(path = %writer.path().display(), error = %e, "Failed to write tile");
                return Err(e);
            }
        }

        self.num_tiles_written += 1;
        debug!(
            x = params.offset_x,
            y = params.offset_y,
            width = params.width,
            height = params.height,
            written = self.num_tiles_written,
            "Wrote tile to disk"
        );
        Ok(())
    }

    /// Finalize the open tile file and notify the completion callback.
    ///
    /// On-disk tiles that were never written are filled with zeros first, so
    /// a render stopped early still leaves a complete file. Does nothing
    /// unless a file is open.
    pub fn finish_write_tiles(&mut self) -> Result<(), TileError> {
        let mut writer = match std::mem::replace(&mut self.state, WriteState::Closed) {
            WriteState::Open(writer) => writer,
            other => {
                self.state = other;
                return Ok(());
            }
        };

        let missing = writer.missing_tiles();
        if !missing.is_empty() {
            debug!(
                count = missing.len(),
                "Filling unwritten tiles with zeros"
            );
        }
        let mut zeros = Vec::new();
        for index in missing {
            let region = writer.spec().tile_region(index);
            zeros.clear();
            zeros.resize(region.area() as usize * writer.spec().num_channels(), 0.0);
            if let Err(e) = writer.write_image_tile(index, &zeros) {
                error!(path = %writer.path().display(), error = %e, "Failed to fill tile");
                return Err(e);
            }
        }

        let path = writer.finish().map_err(|e| {
            error!(error = %e, "Failed to finalize tile file");
            e
        })?;
        self.state = WriteState::Finalized;

        info!(
            path = %path.display(),
            tiles = self.num_tiles_written,
            "Finished writing tiles"
        );

        if let Some(cb) = self.full_buffer_written_cb.as_mut() {
            cb(&path);
        }
        Ok(())
    }

    /// Reconstruct a full-frame buffer from a finalized tile file.
    ///
    /// `buffers` is reconfigured from the params stored in the file and
    /// `denoise_params` receives the denoiser settings the file was written
    /// with. Neither is touched unless the whole frame was read.
    pub fn read_full_buffer_from_disk(
        &self,
        path: &Path,
        buffers: &mut RenderBuffers,
        denoise_params: &mut DenoiseParams,
    ) -> Result<(), TileError> {
        if let WriteState::Open(writer) = &self.state {
            if same_file(writer.path(), path) {
                return Err(TileError::InvalidState(
                    "tile file is still open for writing",
                ));
            }
        }

        let result = TileFileReader::open_path(path).and_then(|mut reader| {
            let full = reader.read_full_buffer()?;
            Ok((full, reader.spec().denoise.clone()))
        });

        match result {
            Ok((full, denoise)) => {
                info!(
                    path = %path.display(),
                    width = full.params().width,
                    height = full.params().height,
                    "Read full frame from tile file"
                );
                *buffers = full;
                *denoise_params = denoise;
                Ok(())
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to read tile file");
                Err(e.into())
            }
        }
    }

    /// Delete the most recently created tile file. Failures are only logged.
    pub fn remove_tile_file(&self) {
        let Some(path) = self.tile_filepath.as_deref() else {
            return;
        };

        match fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "Removed tile file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Tile file already removed")
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove tile file"),
        }
    }
}

impl Drop for TileFileStore {
    fn drop(&mut self) {
        if let WriteState::Open(writer) = &self.state {
            debug!(
                path = %writer.path().display(),
                "Closing tile file without finalizing"
            );
        }
    }
}

/// Table indices of the on-disk tiles a tile buffer covers.
fn covered_image_tiles(
    spec: &ImageSpec,
    tile_buffers: &RenderBuffers,
) -> Result<Vec<usize>, TileError> {
    let params = tile_buffers.params();
    let granularity = spec.tile_size;
    let x = params.offset_x as i64 - spec.buffer.offset_x as i64;
    let y = params.offset_y as i64 - spec.buffer.offset_y as i64;
    let width = params.width as i64;
    let height = params.height as i64;
    let frame_width = spec.width as i64;
    let frame_height = spec.height as i64;
    let g = granularity as i64;

    let aligned = x >= 0
        && y >= 0
        && width > 0
        && height > 0
        && x % g == 0
        && y % g == 0
        && x + width <= frame_width
        && y + height <= frame_height
        && (width % g == 0 || x + width == frame_width)
        && (height % g == 0 || y + height == frame_height);

    if !aligned {
        let err = TileError::UnalignedTile {
            x,
            y,
            width: params.width,
            height: params.height,
            granularity,
            frame_width: spec.width,
            frame_height: spec.height,
        };
        warn!(error = %err, "Rejected tile");
        return Err(err);
    }

    let first_x = (x / g) as u32;
    let first_y = (y / g) as u32;
    let last_x = ((x + width) as u32).div_ceil(granularity);
    let last_y = ((y + height) as u32).div_ceil(granularity);

    let mut indices = Vec::with_capacity(((last_x - first_x) * (last_y - first_y)) as usize);
    for tile_y in first_y..last_y {
        for tile_x in first_x..last_x {
            indices.push(spec.tile_index(tile_x, tile_y));
        }
    }
    Ok(indices)
}

/// Whether two paths name the same file, resolving links and relative
/// components when both exist.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
