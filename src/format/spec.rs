//! Image spec of a tile file.
//!
//! The spec is fixed when a file is created and serialized as JSON into the
//! file's metadata block. Every tile written must match its channel list, and
//! a reader reconstructs the full-frame buffer from it without any outside
//! information.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::buffers::BufferParams;
use crate::error::{FormatError, TileError};
use crate::scene::{DenoiseParams, FilmSettings, Scene};
use crate::tile::Tile;

/// Edge length of the square tiles a file is stored in.
///
/// This is independent of the scheduling tile size; see
/// [`compute_render_tile_size`](crate::tile::compute_render_tile_size).
pub const IMAGE_TILE_SIZE: u32 = 128;

/// Dimensions, channel list and pass-through metadata of a tile file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub width: u32,
    pub height: u32,

    /// On-disk tile edge length
    pub tile_size: u32,

    /// Channel names in storage order, e.g. `Combined.R`
    pub channels: Vec<String>,

    /// Frame parameters the file was written for
    pub buffer: BufferParams,

    #[serde(default)]
    pub film: FilmSettings,

    #[serde(default)]
    pub denoise: DenoiseParams,

    /// Free-form string attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ImageSpec {
    /// Build the spec for a frame rendered with `params` in `scene`.
    pub fn new(params: &BufferParams, scene: &Scene) -> Self {
        Self {
            width: params.width,
            height: params.height,
            tile_size: IMAGE_TILE_SIZE,
            channels: params.channel_names(),
            buffer: params.clone(),
            film: scene.film.clone(),
            denoise: scene.denoise.clone(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn tiles_x(&self) -> u32 {
        self.width.div_ceil(self.tile_size)
    }

    #[inline]
    pub fn tiles_y(&self) -> u32 {
        self.height.div_ceil(self.tile_size)
    }

    #[inline]
    pub fn num_tiles(&self) -> usize {
        self.tiles_x() as usize * self.tiles_y() as usize
    }

    /// Table index of the on-disk tile at grid position `(tile_x, tile_y)`.
    #[inline]
    pub fn tile_index(&self, tile_x: u32, tile_y: u32) -> usize {
        tile_y as usize * self.tiles_x() as usize + tile_x as usize
    }

    /// Pixel region covered by the on-disk tile at `index`, clipped to the image.
    pub fn tile_region(&self, index: usize) -> Tile {
        let tiles_x = self.tiles_x() as usize;
        let x = (index % tiles_x) as u32 * self.tile_size;
        let y = (index / tiles_x) as u32 * self.tile_size;
        Tile {
            x,
            y,
            width: self.tile_size.min(self.width - x),
            height: self.tile_size.min(self.height - y),
        }
    }

    /// Payload size in bytes of a tile covering `region`.
    #[inline]
    pub fn payload_len(&self, region: &Tile) -> u64 {
        region.width as u64 * region.height as u64 * self.num_channels() as u64 * 4
    }

    /// Check the spec is self-consistent.
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.tile_size == 0 {
            return Err(FormatError::InconsistentSpec(
                "tile size must be non-zero".to_string(),
            ));
        }
        if self.width != self.buffer.width || self.height != self.buffer.height {
            return Err(FormatError::InconsistentSpec(format!(
                "image is {}x{} but buffer params are {}x{}",
                self.width, self.height, self.buffer.width, self.buffer.height
            )));
        }
        if self.channels.is_empty() {
            return Err(FormatError::InconsistentSpec("no channels".to_string()));
        }
        if self.channels != self.buffer.channel_names() {
            return Err(FormatError::InconsistentSpec(
                "channel list does not match buffer passes".to_string(),
            ));
        }
        Ok(())
    }

    /// Check a tile buffer's channel layout matches this spec exactly.
    pub fn check_channels(&self, params: &BufferParams) -> Result<(), TileError> {
        let actual = params.channel_names();
        if actual != self.channels {
            return Err(TileError::SpecMismatch {
                expected: self.channels.clone(),
                actual,
            });
        }
        Ok(())
    }
}
