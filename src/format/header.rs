//! Tile file header parsing and encoding.
//!
//! # Layout (all values little-endian)
//! ```text
//! Bytes 0-3:   Magic "TSPL"
//! Bytes 4-5:   Version (1)
//! Bytes 6-7:   Flags (bit 0 = finalized)
//! Bytes 8-11:  Image width
//! Bytes 12-15: Image height
//! Bytes 16-19: On-disk tile size
//! Bytes 20-23: Channel count
//! Bytes 24-27: Tile count
//! Bytes 28-31: Metadata length in bytes
//! ```
//!
//! The JSON metadata block follows the header, then the tile table
//! ([`ENTRY_SIZE`](super::table::ENTRY_SIZE) bytes per tile), then payloads.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::FormatError;

use super::table::ENTRY_SIZE;

// =============================================================================
// Constants
// =============================================================================

/// Magic bytes at the start of every tile file
pub const MAGIC: [u8; 4] = *b"TSPL";

/// Current container version
pub const VERSION: u16 = 1;

/// Size of the fixed header in bytes
pub const HEADER_SIZE: usize = 32;

/// Header flag set once the writer has finalized the file
pub const FLAG_FINALIZED: u16 = 0x0001;

// =============================================================================
// FileHeader
// =============================================================================

/// Parsed tile file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u16,
    pub flags: u16,
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
    pub num_channels: u32,
    pub num_tiles: u32,
    pub metadata_len: u32,
}

impl FileHeader {
    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.flags & FLAG_FINALIZED != 0
    }

    /// Offset of the JSON metadata block.
    #[inline]
    pub fn metadata_offset(&self) -> u64 {
        HEADER_SIZE as u64
    }

    /// Offset of the tile table.
    #[inline]
    pub fn table_offset(&self) -> u64 {
        HEADER_SIZE as u64 + self.metadata_len as u64
    }

    /// Size of the tile table in bytes.
    #[inline]
    pub fn table_len(&self) -> u64 {
        self.num_tiles as u64 * ENTRY_SIZE as u64
    }

    /// Offset of the first tile payload.
    #[inline]
    pub fn data_offset(&self) -> u64 {
        self.table_offset() + self.table_len()
    }

    /// Encode to exactly [`HEADER_SIZE`] bytes.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE);
        buf.put_slice(&MAGIC);
        buf.put_u16_le(self.version);
        buf.put_u16_le(self.flags);
        buf.put_u32_le(self.width);
        buf.put_u32_le(self.height);
        buf.put_u32_le(self.tile_size);
        buf.put_u32_le(self.num_channels);
        buf.put_u32_le(self.num_tiles);
        buf.put_u32_le(self.metadata_len);
        buf.freeze()
    }

    /// Parse a header from raw bytes.
    ///
    /// # Arguments
    /// * `bytes` - At least [`HEADER_SIZE`] bytes from the start of the file
    /// * `file_size` - Total file size, used to check the metadata and table fit
    ///
    /// # Errors
    /// - `FileTooSmall` if the header, metadata or table extend past the file
    /// - `InvalidMagic` if the magic bytes are not "TSPL"
    /// - `UnsupportedVersion` if the version is not [`VERSION`]
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, FormatError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FormatError::FileTooSmall {
                required: HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        let mut buf = &bytes[..HEADER_SIZE];

        let mut magic = [0u8; 4];
        buf.copy_to_slice(&mut magic);
        if magic != MAGIC {
            return Err(FormatError::InvalidMagic(magic));
        }

        let version = buf.get_u16_le();
        if version != VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }

        let header = FileHeader {
            version,
            flags: buf.get_u16_le(),
            width: buf.get_u32_le(),
            height: buf.get_u32_le(),
            tile_size: buf.get_u32_le(),
            num_channels: buf.get_u32_le(),
            num_tiles: buf.get_u32_le(),
            metadata_len: buf.get_u32_le(),
        };

        // Metadata and table must be present even for an empty file
        if header.data_offset() > file_size {
            return Err(FormatError::FileTooSmall {
                required: header.data_offset(),
                actual: file_size,
            });
        }

        Ok(header)
    }
}
