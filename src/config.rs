//! Configuration for the tile manager and the `tile-spool` binary.
//!
//! The library is configured with a [`TileStoreConfig`] value passed to
//! [`TileManager::new`](crate::tile::TileManager::new). The binary parses its
//! subcommands with clap; options can also be set from the environment:
//!
//! - `TILE_SPOOL_DIR` - Directory for tile files (default: system temp dir)
//! - `TILE_SPOOL_SESSION` - Session token used in tile file names
//! - `TILE_SPOOL_TILE_SIZE` - Suggested scheduling tile size (default: 128)
//! - `TILE_SPOOL_JPEG_QUALITY` - Preview JPEG quality (default: 90)
//!
//! # Example
//!
//! ```ignore
//! use tile_spool::config::Cli;
//! use clap::Parser;
//!
//! let cli = Cli::parse();
//! match cli.command {
//!     Command::Render(config) => { /* ... */ }
//!     Command::Inspect(config) => { /* ... */ }
//!     Command::Export(config) => { /* ... */ }
//! }
//! ```

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::buffers::{BufferParams, BufferPass};
use crate::tile::{DEFAULT_JPEG_QUALITY, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY};

// =============================================================================
// Default Values
// =============================================================================

/// Default tile file extension.
pub const DEFAULT_TILE_FILE_EXTENSION: &str = "tspl";

/// Default suggested scheduling tile size in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 128;

/// Default frame width for `render`.
pub const DEFAULT_WIDTH: u32 = 640;

/// Default frame height for `render`.
pub const DEFAULT_HEIGHT: u32 = 480;

/// Default pass list for `render`.
pub const DEFAULT_PASSES: &str = "Combined:rgba,Depth:value";

/// Default pass exported by `export`.
pub const DEFAULT_EXPORT_PASS: &str = "Combined";

// =============================================================================
// Tile Store Configuration
// =============================================================================

/// Where and under which name a tile manager writes its tile files.
///
/// Files are named `<directory>/<session_token>.<index>.<extension>`; the
/// index increments per file, so the token only has to be unique per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileStoreConfig {
    /// Unique token of the render session
    pub session_token: String,

    /// Directory tile files are created in
    pub directory: PathBuf,

    /// File extension, without the dot
    pub extension: String,
}

impl TileStoreConfig {
    /// Config writing to the system temp directory with the default extension.
    pub fn new(session_token: impl Into<String>) -> Self {
        Self {
            session_token: session_token.into(),
            directory: std::env::temp_dir(),
            extension: DEFAULT_TILE_FILE_EXTENSION.to_string(),
        }
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Path of the tile file with the given per-session index.
    pub fn tile_file_path(&self, index: u64) -> PathBuf {
        self.directory.join(format!(
            "{}.{}.{}",
            self.session_token, index, self.extension
        ))
    }

    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.session_token.is_empty() {
            return Err("session token must not be empty".to_string());
        }
        if self.session_token.contains(['/', '\\']) || self.session_token.starts_with('.') {
            return Err(format!(
                "session token '{}' must be a plain file name component",
                self.session_token
            ));
        }
        if self.extension.is_empty() || !self.extension.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(format!(
                "extension '{}' must be non-empty and alphanumeric",
                self.extension
            ));
        }
        Ok(())
    }
}

/// Session token unique to this process and moment.
pub fn default_session_token() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("tile-spool-{}-{}", std::process::id(), millis)
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// tile-spool - Tile scheduling and on-disk tile file streaming.
#[derive(Parser, Debug, Clone)]
#[command(name = "tile-spool")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Render a synthetic frame tile by tile through a tile file and verify it.
    Render(RenderConfig),

    /// Print the header, layout and tile table of a tile file.
    Inspect(InspectConfig),

    /// Export one pass of a tile file as a JPEG preview.
    Export(ExportConfig),
}

/// Output format of the `inspect` command.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct RenderConfig {
    // =========================================================================
    // Frame
    // =========================================================================
    /// Frame width in pixels.
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: u32,

    /// Frame height in pixels.
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: u32,

    /// Comma-separated passes as `name:kind` (kind: value, vector, color, rgba).
    #[arg(long, default_value = DEFAULT_PASSES)]
    pub passes: String,

    /// Suggested tile size; aligned up to the on-disk tile size.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "TILE_SPOOL_TILE_SIZE")]
    pub tile_size: u32,

    /// Stop after this many tiles; the rest of the file is zero-filled.
    #[arg(long)]
    pub cancel_after: Option<usize>,

    // =========================================================================
    // Output
    // =========================================================================
    /// Directory for tile files.
    #[arg(long, env = "TILE_SPOOL_DIR")]
    pub dir: Option<PathBuf>,

    /// Session token used in tile file names.
    #[arg(long, env = "TILE_SPOOL_SESSION")]
    pub session: Option<String>,

    /// Keep the tile file instead of removing it after the frame was read back.
    #[arg(long, default_value_t = false)]
    pub keep: bool,

    /// Write a JPEG preview of the first pass here.
    #[arg(long)]
    pub preview: Option<PathBuf>,

    /// Preview JPEG quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "TILE_SPOOL_JPEG_QUALITY")]
    pub quality: u8,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl RenderConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("width and height must be greater than 0".to_string());
        }
        if self.tile_size == 0 {
            return Err("tile_size must be greater than 0".to_string());
        }
        if !(MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&self.quality) {
            return Err("quality must be between 1 and 100".to_string());
        }
        self.buffer_params()?;
        self.store_config().validate()
    }

    /// Frame params from `--width`, `--height` and `--passes`.
    pub fn buffer_params(&self) -> Result<BufferParams, String> {
        let passes = self
            .passes
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<BufferPass>)
            .collect::<Result<Vec<_>, _>>()?;
        let params = BufferParams::new(self.width, self.height).with_passes(passes);
        params.validate().map_err(|e| e.to_string())?;
        Ok(params)
    }

    /// Tile store config from `--dir` and `--session`, falling back to defaults.
    pub fn store_config(&self) -> TileStoreConfig {
        let token = self.session.clone().unwrap_or_else(default_session_token);
        let config = TileStoreConfig::new(token);
        match &self.dir {
            Some(dir) => config.with_directory(dir),
            None => config,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct InspectConfig {
    /// Tile file to inspect.
    pub file: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Read every tile and check its digest.
    #[arg(long, default_value_t = false)]
    pub verify: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExportConfig {
    /// Finalized tile file to read.
    pub file: PathBuf,

    /// Output JPEG path.
    pub output: PathBuf,

    /// Pass to export.
    #[arg(long, default_value = DEFAULT_EXPORT_PASS)]
    pub pass: String,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "TILE_SPOOL_JPEG_QUALITY")]
    pub quality: u8,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ExportConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.pass.is_empty() {
            return Err("pass must not be empty".to_string());
        }
        if !(MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&self.quality) {
            return Err("quality must be between 1 and 100".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
