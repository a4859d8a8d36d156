//! Tile file reader and validation.
//!
//! Opening a file parses the header, the JSON metadata and the tile table and
//! cross-checks them. Reading the full frame additionally requires the file
//! to be finalized with every tile present, and verifies each payload's size
//! and digest before placing it. Nothing is returned unless the whole frame
//! was reconstructed.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::buffers::RenderBuffers;
use crate::error::FormatError;
use crate::io::{FileRangeReader, RangeReader};
use crate::scene::{DenoiseParams, FilmSettings};
use crate::tile::Tile;

use super::header::{FileHeader, HEADER_SIZE};
use super::spec::ImageSpec;
use super::table::{decode_pixels, decode_table, TileEntry};

// =============================================================================
// Summary
// =============================================================================

/// Serializable overview of a tile file, for inspection tools.
#[derive(Debug, Clone, Serialize)]
pub struct TileFileSummary {
    pub identifier: String,
    pub size_bytes: u64,
    pub version: u16,
    pub finalized: bool,
    pub width: u32,
    pub height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub full_width: u32,
    pub full_height: u32,
    pub tile_size: u32,
    pub tiles_x: u32,
    pub tiles_y: u32,
    pub num_tiles: usize,
    pub present_tiles: usize,
    pub missing_tiles: Vec<usize>,
    pub channels: Vec<String>,
    pub film: FilmSettings,
    pub denoise: DenoiseParams,
    pub attributes: BTreeMap<String, String>,
}

// =============================================================================
// TileFileReader
// =============================================================================

/// Read-only view of a tile file.
pub struct TileFileReader<R> {
    reader: R,
    header: FileHeader,
    spec: ImageSpec,
    entries: Vec<TileEntry>,
}

impl TileFileReader<FileRangeReader> {
    /// Open a tile file on disk.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        Self::open(FileRangeReader::open(path)?)
    }
}

impl<R: RangeReader> TileFileReader<R> {
    /// Parse header, metadata and tile table.
    ///
    /// # Errors
    /// - `FileTooSmall`, `InvalidMagic`, `UnsupportedVersion` from the header
    /// - `InvalidMetadata` if the metadata is not a valid image spec
    /// - `InconsistentSpec` if header and metadata disagree
    pub fn open(mut reader: R) -> Result<Self, FormatError> {
        let size = reader.size();
        if size < HEADER_SIZE as u64 {
            return Err(FormatError::FileTooSmall {
                required: HEADER_SIZE as u64,
                actual: size,
            });
        }

        let header_bytes = reader.read_exact_at(0, HEADER_SIZE)?;
        let header = FileHeader::parse(&header_bytes, size)?;

        let metadata =
            reader.read_exact_at(header.metadata_offset(), header.metadata_len as usize)?;
        let spec: ImageSpec = serde_json::from_slice(&metadata)
            .map_err(|e| FormatError::InvalidMetadata(e.to_string()))?;
        spec.validate()?;
        check_header_matches_spec(&header, &spec)?;

        let table = reader.read_exact_at(header.table_offset(), header.table_len() as usize)?;
        let entries = decode_table(&table);

        debug!(
            file = reader.identifier(),
            width = header.width,
            height = header.height,
            tiles = header.num_tiles,
            finalized = header.is_finalized(),
            "Opened tile file"
        );

        Ok(Self {
            reader,
            header,
            spec,
            entries,
        })
    }

    #[inline]
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    #[inline]
    pub fn spec(&self) -> &ImageSpec {
        &self.spec
    }

    #[inline]
    pub fn entries(&self) -> &[TileEntry] {
        &self.entries
    }

    /// The underlying range reader.
    #[inline]
    pub fn range_reader(&self) -> &R {
        &self.reader
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.header.is_finalized()
    }

    pub fn missing_tiles(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_present())
            .map(|(i, _)| i)
            .collect()
    }

    /// Check the file is finalized, every tile is present and every payload
    /// lies inside the file with the expected size. Does not read payloads.
    pub fn validate_complete(&self) -> Result<(), FormatError> {
        if !self.header.is_finalized() {
            return Err(FormatError::NotFinalized);
        }

        let missing = self.missing_tiles().len();
        if missing > 0 {
            return Err(FormatError::MissingTiles {
                missing,
                total: self.entries.len(),
            });
        }

        for index in 0..self.entries.len() {
            self.check_entry(index)?;
        }
        Ok(())
    }

    fn check_entry(&self, index: usize) -> Result<(), FormatError> {
        let entry = &self.entries[index];
        let size = self.reader.size();
        let in_bounds = entry.offset >= self.header.data_offset()
            && entry
                .offset
                .checked_add(entry.length)
                .is_some_and(|end| end <= size);
        if !in_bounds {
            return Err(FormatError::TruncatedTile {
                index,
                offset: entry.offset,
                length: entry.length,
                size,
            });
        }

        let expected = self.spec.payload_len(&self.spec.tile_region(index));
        if entry.length != expected {
            return Err(FormatError::PayloadSizeMismatch {
                index,
                expected,
                actual: entry.length,
            });
        }
        Ok(())
    }

    /// Read and verify the on-disk tile at `index` into `out`.
    ///
    /// Returns the pixel region the tile covers.
    pub fn read_tile(&mut self, index: usize, out: &mut Vec<f32>) -> Result<Tile, FormatError> {
        let total = self.entries.len();
        let entry = match self.entries.get(index) {
            Some(entry) if entry.is_present() => *entry,
            _ => return Err(FormatError::MissingTiles { missing: 1, total }),
        };
        self.check_entry(index)?;

        let payload = self.reader.read_exact_at(entry.offset, entry.length as usize)?;
        if !entry.matches(&payload) {
            return Err(FormatError::ChecksumMismatch { index });
        }

        decode_pixels(&payload, out);
        Ok(self.spec.tile_region(index))
    }

    /// Reconstruct the full frame, configured from the file's buffer params.
    pub fn read_full_buffer(&mut self) -> Result<RenderBuffers, FormatError> {
        self.validate_complete()?;

        let mut buffers = RenderBuffers::new(self.spec.buffer.clone());
        let mut pixels = Vec::new();
        for index in 0..self.entries.len() {
            let region = self.read_tile(index, &mut pixels)?;
            buffers.write_region(region.x, region.y, region.width, region.height, &pixels);
        }

        debug!(
            file = self.reader.identifier(),
            tiles = self.entries.len(),
            "Read full frame from tile file"
        );
        Ok(buffers)
    }

    /// Validate the file and check every tile's digest.
    pub fn verify(&mut self) -> Result<(), FormatError> {
        self.validate_complete()?;
        let mut pixels = Vec::new();
        for index in 0..self.entries.len() {
            self.read_tile(index, &mut pixels)?;
        }
        Ok(())
    }

    pub fn summary(&self) -> TileFileSummary {
        let missing_tiles = self.missing_tiles();
        TileFileSummary {
            identifier: self.reader.identifier().to_string(),
            size_bytes: self.reader.size(),
            version: self.header.version,
            finalized: self.header.is_finalized(),
            width: self.spec.width,
            height: self.spec.height,
            offset_x: self.spec.buffer.offset_x,
            offset_y: self.spec.buffer.offset_y,
            full_width: self.spec.buffer.full_width,
            full_height: self.spec.buffer.full_height,
            tile_size: self.spec.tile_size,
            tiles_x: self.spec.tiles_x(),
            tiles_y: self.spec.tiles_y(),
            num_tiles: self.entries.len(),
            present_tiles: self.entries.len() - missing_tiles.len(),
            missing_tiles,
            channels: self.spec.channels.clone(),
            film: self.spec.film.clone(),
            denoise: self.spec.denoise.clone(),
            attributes: self.spec.attributes.clone(),
        }
    }
}

fn check_header_matches_spec(header: &FileHeader, spec: &ImageSpec) -> Result<(), FormatError> {
    let mismatch = |field: &str, header_value: u64, spec_value: u64| {
        FormatError::InconsistentSpec(format!(
            "header {} is {} but metadata says {}",
            field, header_value, spec_value
        ))
    };

    if header.width != spec.width {
        return Err(mismatch("width", header.width as u64, spec.width as u64));
    }
    if header.height != spec.height {
        return Err(mismatch("height", header.height as u64, spec.height as u64));
    }
    if header.tile_size != spec.tile_size {
        return Err(mismatch(
            "tile size",
            header.tile_size as u64,
            spec.tile_size as u64,
        ));
    }
    if header.num_channels as usize != spec.num_channels() {
        return Err(mismatch(
            "channel count",
            header.num_channels as u64,
            spec.num_channels() as u64,
        ));
    }
    if header.num_tiles as usize != spec.num_tiles() {
        return Err(mismatch(
            "tile count",
            header.num_tiles as u64,
            spec.num_tiles() as u64,
        ));
    }
    Ok(())
}
