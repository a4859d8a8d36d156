//! Test utilities for integration tests.
//!
//! Helpers for building frames, rendering deterministic tiles and tampering
//! with tile files on disk.

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use tile_spool::error::IoError;
use tile_spool::format::{FileHeader, HEADER_SIZE};
use tile_spool::io::RangeReader;
use tile_spool::{
    BufferParams, BufferPass, PassKind, PatternRenderer, RenderBuffers, Scene, Tile,
    TileManager, TileRenderer, TileStoreConfig,
};

// =============================================================================
// Frames
// =============================================================================

/// Frame with the passes used throughout the tests: RGBA, normal and depth.
pub fn frame_params(width: u32, height: u32) -> BufferParams {
    BufferParams::new(width, height)
        .with_pass(BufferPass::combined())
        .with_pass(BufferPass::new("Normal", PassKind::Vector))
        .with_pass(BufferPass::depth())
}

pub fn store_config(dir: &Path, token: &str) -> TileStoreConfig {
    TileStoreConfig::new(token).with_directory(dir)
}

/// Manager with scheduling reset and the spec configured for `params`.
pub fn prepared_manager(dir: &Path, params: &BufferParams, tile_size: u32) -> TileManager {
    let mut manager = TileManager::new(store_config(dir, "it"));
    manager.reset_scheduling(params, (tile_size, tile_size));
    manager
        .update(params, &Scene::default())
        .expect("update should accept valid params");
    manager
}

/// Render `tile` of the manager's frame with the pattern renderer.
pub fn render_tile(manager: &TileManager, tile: &Tile) -> RenderBuffers {
    let mut buffers = RenderBuffers::new(manager.tile_buffer_params(tile));
    PatternRenderer::default().render_tile(&mut buffers);
    buffers
}

/// Whole frame rendered directly, for comparison with read-back results.
pub fn reference_frame(params: &BufferParams) -> RenderBuffers {
    let mut buffers = RenderBuffers::new(params.clone());
    PatternRenderer::default().render_tile(&mut buffers);
    buffers
}

/// Drive the manager over every tile, writing each one. Returns the tiles in
/// the order they were produced.
pub fn write_all_tiles(manager: &mut TileManager) -> Vec<Tile> {
    let mut tiles = Vec::new();
    while manager.next() {
        let tile = manager.current_tile().expect("tile after next()");
        let buffers = render_tile(manager, &tile);
        manager.write_tile(&buffers).expect("write_tile");
        tiles.push(tile);
    }
    tiles
}

/// Collects the paths passed to the completion callback.
pub fn record_written(manager: &mut TileManager) -> Arc<Mutex<Vec<PathBuf>>> {
    let written = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&written);
    manager.set_full_buffer_written_cb(move |path| sink.lock().unwrap().push(path.to_path_buf()));
    written
}

/// Compare two float slices bit for bit.
pub fn bits_equal(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

// =============================================================================
// File Tampering
// =============================================================================

/// Overwrite bytes of `path` at `offset`.
pub fn patch_file(path: &Path, offset: u64, bytes: &[u8]) {
    let mut file = OpenOptions::new().write(true).open(path).unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(bytes).unwrap();
}

/// Flip one byte of `path` at `offset`.
pub fn flip_byte(path: &Path, offset: u64) {
    let bytes = std::fs::read(path).unwrap();
    patch_file(path, offset, &[bytes[offset as usize] ^ 0xFF]);
}

pub fn truncate_file(path: &Path, len: u64) {
    let file = OpenOptions::new().write(true).open(path).unwrap();
    file.set_len(len).unwrap();
}

/// Parse the header of a tile file on disk.
pub fn read_header(path: &Path) -> FileHeader {
    let bytes = std::fs::read(path).unwrap();
    assert!(bytes.len() >= HEADER_SIZE);
    FileHeader::parse(&bytes, bytes.len() as u64).unwrap()
}

// =============================================================================
// Tracking Range Reader
// =============================================================================

/// In-memory range reader that records every request.
pub struct TrackingReader {
    data: Bytes,
    identifier: String,
    requests: Vec<(u64, usize)>,
}

impl TrackingReader {
    pub fn new(data: Vec<u8>, identifier: impl Into<String>) -> Self {
        Self {
            data: Bytes::from(data),
            identifier: identifier.into(),
            requests: Vec::new(),
        }
    }

    pub fn requests(&self) -> &[(u64, usize)] {
        &self.requests
    }
}

impl RangeReader for TrackingReader {
    fn read_exact_at(&mut self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        self.requests.push((offset, len));

        let start = offset as usize;
        let end = start + len;
        if end > self.data.len() {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.data.len() as u64,
            });
        }
        Ok(self.data.slice(start..end))
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
