//! Frame geometry and channel layout.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::TileError;
use crate::tile::Tile;

use super::passes::BufferPass;

/// Geometry and channel layout of a render buffer.
///
/// The same type describes a full frame and a single tile: for a tile buffer
/// the size is the tile extent and the offset is the tile's position inside
/// the full frame. `full_width`/`full_height` always describe the whole image
/// the frame is a region of, so border renders keep a non-zero offset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferParams {
    /// Buffer width in pixels
    pub width: u32,

    /// Buffer height in pixels
    pub height: u32,

    /// X position of the buffer within the full image
    pub offset_x: u32,

    /// Y position of the buffer within the full image
    pub offset_y: u32,

    /// Width of the full image
    pub full_width: u32,

    /// Height of the full image
    pub full_height: u32,

    /// Ordered passes; defines the interleaved channel layout
    pub passes: Vec<BufferPass>,
}

impl BufferParams {
    /// Params for a `width`x`height` frame with no offset and no passes.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            offset_x: 0,
            offset_y: 0,
            full_width: width,
            full_height: height,
            passes: Vec::new(),
        }
    }

    /// Place this buffer inside a larger image (border render).
    pub fn with_full_frame(
        mut self,
        offset_x: u32,
        offset_y: u32,
        full_width: u32,
        full_height: u32,
    ) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self.full_width = full_width;
        self.full_height = full_height;
        self
    }

    pub fn with_passes(mut self, passes: impl IntoIterator<Item = BufferPass>) -> Self {
        self.passes = passes.into_iter().collect();
        self
    }

    pub fn with_pass(mut self, pass: BufferPass) -> Self {
        self.passes.push(pass);
        self
    }

    /// Floats per pixel.
    pub fn num_channels(&self) -> usize {
        self.passes.iter().map(|p| p.kind.num_components()).sum()
    }

    pub fn num_pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Channel names in storage order.
    pub fn channel_names(&self) -> Vec<String> {
        self.passes.iter().flat_map(|p| p.channel_names()).collect()
    }

    /// Index of the first channel of `name` within a pixel, if the pass exists.
    pub fn pass_offset(&self, name: &str) -> Option<usize> {
        let mut offset = 0;
        for pass in &self.passes {
            if pass.name == name {
                return Some(offset);
            }
            offset += pass.kind.num_components();
        }
        None
    }

    pub fn find_pass(&self, name: &str) -> Option<&BufferPass> {
        self.passes.iter().find(|p| p.name == name)
    }

    /// Whether a buffer configured with `other` would need to be reallocated.
    ///
    /// Any difference in size, offset, full size or pass layout invalidates
    /// cached results such as a tile file.
    pub fn modified(&self, other: &BufferParams) -> bool {
        self != other
    }

    /// Params of the buffer holding `tile` of this frame.
    pub fn tile_params(&self, tile: &Tile) -> BufferParams {
        BufferParams {
            width: tile.width,
            height: tile.height,
            offset_x: self.offset_x + tile.x,
            offset_y: self.offset_y + tile.y,
            full_width: self.full_width,
            full_height: self.full_height,
            passes: self.passes.clone(),
        }
    }

    /// Check the layout is usable for a tile file.
    pub fn validate(&self) -> Result<(), TileError> {
        if self.passes.is_empty() {
            return Err(TileError::InvalidParams(
                "at least one pass is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for pass in &self.passes {
            if pass.name.is_empty() {
                return Err(TileError::InvalidParams("pass with empty name".to_string()));
            }
            if !seen.insert(pass.name.as_str()) {
                return Err(TileError::InvalidParams(format!(
                    "duplicate pass '{}'",
                    pass.name
                )));
            }
        }

        let right = self.offset_x as u64 + self.width as u64;
        let bottom = self.offset_y as u64 + self.height as u64;
        if right > self.full_width as u64 || bottom > self.full_height as u64 {
            return Err(TileError::InvalidParams(format!(
                "{}x{} region at ({}, {}) exceeds full frame {}x{}",
                self.width,
                self.height,
                self.offset_x,
                self.offset_y,
                self.full_width,
                self.full_height
            )));
        }

        Ok(())
    }
}
