//! Tile table entries and payload encoding.
//!
//! Each on-disk tile has a fixed-size table entry:
//!
//! ```text
//! Bytes 0-7:   Payload offset (0 = tile not written)
//! Bytes 8-15:  Payload length in bytes
//! Bytes 16-47: SHA-256 of the payload
//! ```
//!
//! Payloads are the tile's pixels, row-major, channels interleaved, each
//! value an `f32` in little-endian byte order.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use sha2::{Digest, Sha256};

/// Size of one tile table entry in bytes
pub const ENTRY_SIZE: usize = 48;

/// Location and digest of one on-disk tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileEntry {
    pub offset: u64,
    pub length: u64,
    pub digest: [u8; 32],
}

impl TileEntry {
    /// Entry for a payload stored at `offset`.
    pub fn for_payload(offset: u64, payload: &[u8]) -> Self {
        Self {
            offset,
            length: payload.len() as u64,
            digest: payload_digest(payload),
        }
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        self.offset != 0
    }

    /// Whether `payload` hashes to this entry's digest.
    pub fn matches(&self, payload: &[u8]) -> bool {
        payload_digest(payload) == self.digest
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ENTRY_SIZE);
        self.encode_into(&mut buf);
        buf.freeze()
    }

    pub fn encode_into(&self, buf: &mut impl BufMut) {
        buf.put_u64_le(self.offset);
        buf.put_u64_le(self.length);
        buf.put_slice(&self.digest);
    }

    /// Decode one entry.
    ///
    /// # Panics
    /// Panics if fewer than [`ENTRY_SIZE`] bytes remain.
    pub fn decode(buf: &mut impl Buf) -> Self {
        let offset = buf.get_u64_le();
        let length = buf.get_u64_le();
        let mut digest = [0u8; 32];
        buf.copy_to_slice(&mut digest);
        Self {
            offset,
            length,
            digest,
        }
    }
}

/// Encode a table of `entries`.
pub fn encode_table(entries: &[TileEntry]) -> Bytes {
    let mut buf = BytesMut::with_capacity(entries.len() * ENTRY_SIZE);
    for entry in entries {
        entry.encode_into(&mut buf);
    }
    buf.freeze()
}

/// Decode every complete entry in `bytes`.
pub fn decode_table(mut bytes: &[u8]) -> Vec<TileEntry> {
    let mut entries = Vec::with_capacity(bytes.len() / ENTRY_SIZE);
    while bytes.remaining() >= ENTRY_SIZE {
        entries.push(TileEntry::decode(&mut bytes));
    }
    entries
}

// =============================================================================
// Payloads
// =============================================================================

pub fn payload_digest(payload: &[u8]) -> [u8; 32] {
    Sha256::digest(payload).into()
}

/// Encode pixel values as a tile payload.
pub fn encode_pixels(pixels: &[f32]) -> Bytes {
    let mut buf = BytesMut::with_capacity(pixels.len() * 4);
    for value in pixels {
        buf.put_f32_le(*value);
    }
    buf.freeze()
}

/// Decode a tile payload into `out`, replacing its contents.
pub fn decode_pixels(mut payload: &[u8], out: &mut Vec<f32>) {
    out.clear();
    out.reserve(payload.len() / 4);
    while payload.remaining() >= 4 {
        out.push(payload.get_f32_le());
    }
}
