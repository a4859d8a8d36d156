//! In-memory pixel storage.

use crate::error::TileError;

use super::params::BufferParams;

/// Interleaved `f32` pixel storage for a tile or a full frame.
///
/// Pixels are stored row-major; each pixel holds `params.num_channels()`
/// consecutive floats in pass order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderBuffers {
    params: BufferParams,
    data: Vec<f32>,
}

impl RenderBuffers {
    /// Allocate a zeroed buffer for `params`.
    pub fn new(params: BufferParams) -> Self {
        let len = params.num_pixels() * params.num_channels();
        Self {
            params,
            data: vec![0.0; len],
        }
    }

    /// Wrap existing pixel data. The length must match the params exactly.
    pub fn from_data(params: BufferParams, data: Vec<f32>) -> Result<Self, TileError> {
        let expected = params.num_pixels() * params.num_channels();
        if data.len() != expected {
            return Err(TileError::InvalidParams(format!(
                "pixel data has {} floats, {}x{} with {} channels needs {}",
                data.len(),
                params.width,
                params.height,
                params.num_channels(),
                expected
            )));
        }
        Ok(Self { params, data })
    }

    /// Reconfigure for new params, discarding contents.
    pub fn reset(&mut self, params: BufferParams) {
        let len = params.num_pixels() * params.num_channels();
        self.params = params;
        self.data.clear();
        self.data.resize(len, 0.0);
    }

    #[inline]
    pub fn params(&self) -> &BufferParams {
        &self.params
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    #[inline]
    pub fn pixel_stride(&self) -> usize {
        self.params.num_channels()
    }

    #[inline]
    fn pixel_index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.params.width as usize + x as usize) * self.pixel_stride()
    }

    /// Channels of the pixel at buffer-local `(x, y)`.
    ///
    /// # Panics
    /// Panics if the coordinate is outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> &[f32] {
        let start = self.pixel_index(x, y);
        &self.data[start..start + self.pixel_stride()]
    }

    /// Mutable channels of the pixel at buffer-local `(x, y)`.
    ///
    /// # Panics
    /// Panics if the coordinate is outside the buffer.
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [f32] {
        let start = self.pixel_index(x, y);
        let stride = self.pixel_stride();
        &mut self.data[start..start + stride]
    }

    /// Copy a `width`x`height` region starting at `(x, y)` into `out`,
    /// replacing its contents. Rows are tightly packed.
    pub(crate) fn read_region(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        out: &mut Vec<f32>,
    ) {
        let stride = self.pixel_stride();
        let row_len = width as usize * stride;
        out.clear();
        out.reserve(row_len * height as usize);
        for row in y..y + height {
            let start = self.pixel_index(x, row);
            out.extend_from_slice(&self.data[start..start + row_len]);
        }
    }

    /// Write tightly packed rows of a `width`x`height` region at `(x, y)`.
    pub(crate) fn write_region(&mut self, x: u32, y: u32, width: u32, height: u32, src: &[f32]) {
        let row_len = width as usize * self.pixel_stride();
        debug_assert_eq!(src.len(), row_len * height as usize);
        for (i, row) in (y..y + height).enumerate() {
            let start = self.pixel_index(x, row);
            self.data[start..start + row_len]
                .copy_from_slice(&src[i * row_len..(i + 1) * row_len]);
        }
    }

    /// Copy a tile buffer into this frame buffer at the tile's position.
    ///
    /// Both buffers must share the pass layout and the tile must lie inside
    /// this buffer.
    pub fn copy_from_tile(&mut self, tile: &RenderBuffers) -> Result<(), TileError> {
        if tile.params.passes != self.params.passes {
            return Err(TileError::SpecMismatch {
                expected: self.params.channel_names(),
                actual: tile.params.channel_names(),
            });
        }

        let x = tile.params.offset_x as i64 - self.params.offset_x as i64;
        let y = tile.params.offset_y as i64 - self.params.offset_y as i64;
        if x < 0
            || y < 0
            || x + tile.params.width as i64 > self.params.width as i64
            || y + tile.params.height as i64 > self.params.height as i64
        {
            return Err(TileError::InvalidParams(format!(
                "tile at ({}, {}) size {}x{} lies outside {}x{} buffer",
                x,
                y,
                tile.params.width,
                tile.params.height,
                self.params.width,
                self.params.height
            )));
        }

        self.write_region(
            x as u32,
            y as u32,
            tile.params.width,
            tile.params.height,
            &tile.data,
        );
        Ok(())
    }
}
