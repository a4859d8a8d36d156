//! Tile grid computation and row-major iteration.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::buffers::BufferParams;
use crate::error::TileError;
use crate::format::IMAGE_TILE_SIZE;

// =============================================================================
// Tile
// =============================================================================

/// Rectangular region of a frame.
///
/// `x`/`y` are the top-left corner relative to the frame; edge tiles are
/// clipped to the frame, so `width`/`height` may be smaller than the
/// scheduling tile size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Tile {
    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Align a suggested scheduling tile edge to the on-disk tile granularity.
///
/// The result is a non-zero multiple of [`IMAGE_TILE_SIZE`], so every
/// scheduling tile that is not clipped by the frame edge covers whole
/// on-disk tiles and can be written without read-modify-write.
pub fn compute_render_tile_size(suggested_tile_size: u32) -> u32 {
    let num_image_tiles = suggested_tile_size.max(1).div_ceil(IMAGE_TILE_SIZE);
    num_image_tiles
        .checked_mul(IMAGE_TILE_SIZE)
        .unwrap_or(u32::MAX / IMAGE_TILE_SIZE * IMAGE_TILE_SIZE)
}

// =============================================================================
// TileScheduler
// =============================================================================

/// Partitions a frame into a tile grid and hands tiles out in row-major order.
///
/// There is a single cursor: `next()` advances it, `current_tile()` returns
/// the tile it last produced. The scheduler is not synchronized; one thread
/// drives it.
#[derive(Debug, Clone, Default)]
pub struct TileScheduler {
    frame_width: u32,
    frame_height: u32,
    tile_width: u32,
    tile_height: u32,

    num_tiles_x: u32,
    num_tiles_y: u32,
    num_tiles: usize,

    next_tile_index: usize,
    current_tile: Option<Tile>,
}

impl TileScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the grid for `params` split into `tile_size` tiles and rewind.
    ///
    /// A zero tile edge is treated as 1.
    pub fn reset(&mut self, params: &BufferParams, tile_size: (u32, u32)) {
        let (mut tile_width, mut tile_height) = tile_size;
        if tile_width == 0 || tile_height == 0 {
            warn!(tile_width, tile_height, "Zero tile size requested, clamping to 1px");
            tile_width = tile_width.max(1);
            tile_height = tile_height.max(1);
        }

        self.frame_width = params.width;
        self.frame_height = params.height;
        self.tile_width = tile_width;
        self.tile_height = tile_height;

        self.num_tiles_x = params.width.div_ceil(tile_width);
        self.num_tiles_y = params.height.div_ceil(tile_height);
        self.num_tiles = self.num_tiles_x as usize * self.num_tiles_y as usize;

        self.next_tile_index = 0;
        self.current_tile = None;
    }

    #[inline]
    pub fn tile_size(&self) -> (u32, u32) {
        (self.tile_width, self.tile_height)
    }

    #[inline]
    pub fn num_tiles_x(&self) -> u32 {
        self.num_tiles_x
    }

    #[inline]
    pub fn num_tiles_y(&self) -> u32 {
        self.num_tiles_y
    }

    #[inline]
    pub fn num_tiles(&self) -> usize {
        self.num_tiles
    }

    #[inline]
    pub fn next_tile_index(&self) -> usize {
        self.next_tile_index
    }

    #[inline]
    pub fn has_multiple_tiles(&self) -> bool {
        self.num_tiles > 1
    }

    /// Tile at grid `index`. The index must be within `[0, num_tiles)`.
    pub fn get_tile_for_index(&self, index: usize) -> Tile {
        debug_assert!(index < self.num_tiles, "tile index {} out of range", index);

        let tile_x = (index % self.num_tiles_x as usize) as u32;
        let tile_y = (index / self.num_tiles_x as usize) as u32;

        let x = tile_x * self.tile_width;
        let y = tile_y * self.tile_height;

        Tile {
            x,
            y,
            width: self.tile_width.min(self.frame_width - x),
            height: self.tile_height.min(self.frame_height - y),
        }
    }

    /// Every tile of the grid in row-major order, independent of the cursor.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        (0..self.num_tiles).map(move |index| self.get_tile_for_index(index))
    }

    /// Advance to the next tile. Returns `false`, without changing anything,
    /// once every tile has been produced.
    pub fn next(&mut self) -> bool {
        if self.next_tile_index == self.num_tiles {
            return false;
        }

        self.current_tile = Some(self.get_tile_for_index(self.next_tile_index));
        self.next_tile_index += 1;
        true
    }

    #[inline]
    pub fn done(&self) -> bool {
        self.next_tile_index == self.num_tiles
    }

    /// Tile produced by the last successful `next()`.
    pub fn current_tile(&self) -> Result<Tile, TileError> {
        self.current_tile.ok_or(TileError::InvalidState(
            "no current tile: next() has not produced a tile since the last reset",
        ))
    }
}
