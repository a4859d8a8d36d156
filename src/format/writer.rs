//! Tile file writer.
//!
//! The header, metadata and a zeroed tile table are written up front. Each
//! tile payload is appended at the end of the file and its table entry is
//! patched in place, so tiles can arrive in any order. Finalizing sets the
//! header flag and syncs the file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{FormatError, IoError, TileError};

use super::header::{FileHeader, FLAG_FINALIZED, HEADER_SIZE, VERSION};
use super::spec::ImageSpec;
use super::table::{encode_pixels, encode_table, TileEntry, ENTRY_SIZE};

/// Write buffer size for tile payloads
const WRITE_BUFFER_SIZE: usize = 1024 * 1024;

/// Open, writable tile file.
///
/// The writer exclusively owns the file handle. Dropping it without calling
/// [`finish`](Self::finish) leaves a file without the finalized flag, which
/// readers reject as incomplete.
pub struct TileFileWriter {
    out: BufWriter<File>,
    path: PathBuf,
    spec: ImageSpec,
    header: FileHeader,
    entries: Vec<TileEntry>,
    end: u64,
}

impl TileFileWriter {
    /// Create (or truncate) `path` and write the header, metadata and an empty table.
    pub fn create(path: impl AsRef<Path>, spec: ImageSpec) -> Result<Self, TileError> {
        let path = path.as_ref();
        spec.validate()?;

        let metadata = serde_json::to_vec(&spec)
            .map_err(|e| FormatError::InvalidMetadata(e.to_string()))?;
        let metadata_len = u32::try_from(metadata.len())
            .map_err(|_| FormatError::InvalidMetadata("metadata exceeds 4GB".to_string()))?;
        let num_tiles = u32::try_from(spec.num_tiles())
            .map_err(|_| TileError::InvalidParams("too many tiles".to_string()))?;

        let header = FileHeader {
            version: VERSION,
            flags: 0,
            width: spec.width,
            height: spec.height,
            tile_size: spec.tile_size,
            num_channels: spec.num_channels() as u32,
            num_tiles,
            metadata_len,
        };

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| IoError::create(path, e))?;

        let entries = vec![TileEntry::default(); spec.num_tiles()];

        let mut out = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
        let prologue = out
            .write_all(&header.encode())
            .and_then(|_| out.write_all(&metadata))
            .and_then(|_| out.write_all(&encode_table(&entries)));
        prologue.map_err(|e| IoError::write(path, e))?;

        debug!(
            path = %path.display(),
            width = spec.width,
            height = spec.height,
            channels = spec.num_channels(),
            tiles = spec.num_tiles(),
            "Created tile file"
        );

        Ok(Self {
            out,
            path: path.to_path_buf(),
            end: header.data_offset(),
            spec,
            header,
            entries,
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn spec(&self) -> &ImageSpec {
        &self.spec
    }

    /// Number of on-disk tiles written so far.
    pub fn num_present(&self) -> usize {
        self.entries.iter().filter(|e| e.is_present()).count()
    }

    /// Indices of on-disk tiles not written yet.
    pub fn missing_tiles(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_present())
            .map(|(i, _)| i)
            .collect()
    }

    /// Write the on-disk tile at `index`.
    ///
    /// `pixels` holds the tile's region (see [`ImageSpec::tile_region`]),
    /// row-major with interleaved channels. Writing a tile again replaces it.
    pub fn write_image_tile(&mut self, index: usize, pixels: &[f32]) -> Result<(), TileError> {
        if index >= self.entries.len() {
            return Err(TileError::InvalidParams(format!(
                "image tile {} out of range ({} tiles)",
                index,
                self.entries.len()
            )));
        }

        let region = self.spec.tile_region(index);
        let expected = self.spec.payload_len(&region);
        if pixels.len() as u64 * 4 != expected {
            return Err(TileError::InvalidParams(format!(
                "image tile {} needs {} bytes, got {}",
                index,
                expected,
                pixels.len() * 4
            )));
        }

        let payload = encode_pixels(pixels);
        let entry = TileEntry::for_payload(self.end, &payload);
        let entry_offset = self.header.table_offset() + (index * ENTRY_SIZE) as u64;

        self.write_at(self.end, &payload)?;
        self.write_at(entry_offset, &entry.encode())?;

        self.end += payload.len() as u64;
        self.entries[index] = entry;
        Ok(())
    }

    /// Set the finalized flag, flush and sync. Returns the file path.
    pub fn finish(mut self) -> Result<PathBuf, TileError> {
        self.header.flags |= FLAG_FINALIZED;
        let header = self.header.encode();
        debug_assert_eq!(header.len(), HEADER_SIZE);

        self.write_at(0, &header)?;
        self.out
            .flush()
            .and_then(|_| self.out.get_ref().sync_all())
            .map_err(|e| IoError::write(&self.path, e))?;

        debug!(
            path = %self.path.display(),
            bytes = self.end,
            "Finalized tile file"
        );

        Ok(self.path)
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<(), IoError> {
        self.out
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.out.write_all(bytes))
            .map_err(|e| IoError::write(&self.path, e))
    }
}
