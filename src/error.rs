use std::path::{Path, PathBuf};

use thiserror::Error;

/// I/O errors raised at the filesystem boundary.
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// File could not be created for writing
    #[error("Failed to create {path}: {message}")]
    Create { path: PathBuf, message: String },

    /// File could not be opened for reading
    #[error("Failed to open {path}: {message}")]
    Open { path: PathBuf, message: String },

    /// Write, seek or flush failed
    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },

    /// Read or seek failed
    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File does not exist
    #[error("File not found: {0}")]
    NotFound(PathBuf),
}

impl IoError {
    pub(crate) fn create(path: &Path, err: std::io::Error) -> Self {
        IoError::Create {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub(crate) fn open(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            return IoError::NotFound(path.to_path_buf());
        }
        IoError::Open {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub(crate) fn write(path: &Path, err: std::io::Error) -> Self {
        IoError::Write {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub(crate) fn read(path: &Path, err: std::io::Error) -> Self {
        IoError::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Errors in the structure of a tile container
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid magic bytes at the start of the file
    #[error("Invalid tile file magic: expected \"TSPL\", got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Container version this build cannot read
    #[error("Unsupported tile file version: {0}")]
    UnsupportedVersion(u16),

    /// File is too small to contain the header, metadata or tile table
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Metadata block is not a valid image spec
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Header and metadata disagree, or the spec is internally inconsistent
    #[error("Inconsistent image spec: {0}")]
    InconsistentSpec(String),

    /// Writer never finalized the file
    #[error("Tile file was not finalized")]
    NotFinalized,

    /// Some tiles were never written
    #[error("Tile file is incomplete: {missing} of {total} tiles missing")]
    MissingTiles { missing: usize, total: usize },

    /// Tile payload lies outside the file
    #[error("Tile {index} is truncated: {length} bytes at offset {offset}, file size is {size}")]
    TruncatedTile {
        index: usize,
        offset: u64,
        length: u64,
        size: u64,
    },

    /// Tile payload length does not match the tile's pixel count
    #[error("Tile {index} payload is {actual} bytes, expected {expected}")]
    PayloadSizeMismatch {
        index: usize,
        expected: u64,
        actual: u64,
    },

    /// Tile payload digest does not match the table
    #[error("Tile {index} checksum mismatch")]
    ChecksumMismatch { index: usize },
}

impl FormatError {
    /// Whether the error means "tiles are missing" rather than "file is damaged".
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self,
            FormatError::NotFinalized | FormatError::MissingTiles { .. }
        )
    }
}

/// Coarse classification of [`TileError`] for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    SpecMismatch,
    CorruptFile,
    IncompleteFile,
    InvalidState,
}

/// Errors surfaced by the tile manager and its file store
#[derive(Debug, Clone, Error)]
pub enum TileError {
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    #[error("Tile file error: {0}")]
    Format(#[from] FormatError),

    /// Tile buffer channel layout differs from the file's image spec
    #[error("Channel layout mismatch: file expects {expected:?}, tile has {actual:?}")]
    SpecMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// Tile region does not sit on on-disk tile boundaries or leaves the frame
    #[error(
        "Tile at ({x}, {y}) size {width}x{height} is not aligned to {granularity}px image tiles within {frame_width}x{frame_height}"
    )]
    UnalignedTile {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
        granularity: u32,
        frame_width: u32,
        frame_height: u32,
    },

    /// Operation called in the wrong lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// Buffer parameters failed validation
    #[error("Invalid buffer parameters: {0}")]
    InvalidParams(String),

    /// Preview encoding failed
    #[error("Encode error: {message}")]
    Encode { message: String },
}

impl TileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TileError::Io(_) => ErrorKind::Io,
            TileError::Format(FormatError::Io(_)) => ErrorKind::Io,
            TileError::Format(e) if e.is_incomplete() => ErrorKind::IncompleteFile,
            TileError::Format(_) => ErrorKind::CorruptFile,
            TileError::SpecMismatch { .. } => ErrorKind::SpecMismatch,
            TileError::UnalignedTile { .. } | TileError::InvalidState(_) => ErrorKind::InvalidState,
            TileError::InvalidParams(_) => ErrorKind::InvalidState,
            TileError::Encode { .. } => ErrorKind::Io,
        }
    }
}
