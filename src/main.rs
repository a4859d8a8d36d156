//! tile-spool - Tile scheduling and on-disk tile file streaming.
//!
//! This binary renders synthetic frames through tile files and inspects or
//! exports existing tile files.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tile_spool::{
    config::{Cli, Command, ExportConfig, InspectConfig, OutputFormat, RenderConfig},
    PatternRenderer, PreviewEncoder, RenderBuffers, RenderSession, TileFileReader,
    TileFileSummary, TileManager, TileRenderer,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Render(config) => run_render(config),
        Command::Inspect(config) => run_inspect(config),
        Command::Export(config) => run_export(config),
    }
}

// =============================================================================
// Render Command
// =============================================================================

fn run_render(config: RenderConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }
    let params = match config.buffer_params() {
        Ok(params) => params,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let store_config = config.store_config();
    let tile_size = TileManager::compute_render_tile_size(config.tile_size);

    info!("Configuration:");
    info!("  Frame: {}x{}", params.width, params.height);
    info!("  Channels: {}", params.channel_names().join(", "));
    info!(
        "  Tile size: {} (suggested {})",
        tile_size, config.tile_size
    );
    info!("  Tile files: {}", store_config.directory.display());

    let renderer = PatternRenderer::default();
    let mut session = RenderSession::new(store_config, renderer).with_tile_size(config.tile_size);
    if let Some(n) = config.cancel_after {
        session = session.cancel_after(n);
    }

    let frame = match session.render_frame(&params) {
        Ok(frame) => frame,
        Err(e) => {
            error!("Render failed: {}", e);
            session.remove_tile_file();
            return ExitCode::FAILURE;
        }
    };

    // Self-check against a direct render of the whole frame
    let total_tiles = session.manager().num_tiles();
    if frame.tiles_rendered == total_tiles {
        let mut expected = RenderBuffers::new(params.clone());
        renderer.render_tile(&mut expected);
        let matches = frame
            .buffers
            .data()
            .iter()
            .zip(expected.data())
            .all(|(a, b)| a.to_bits() == b.to_bits());
        if !matches {
            error!("Read-back frame differs from the rendered frame");
            return ExitCode::FAILURE;
        }
        info!("Read-back frame matches the rendered frame");
    } else {
        warn!(
            "Rendered {} of {} tiles; remaining tiles were zero-filled",
            frame.tiles_rendered, total_tiles
        );
    }

    if let Some(ref preview) = config.preview {
        let pass = match params.passes.first() {
            Some(pass) => pass.name.clone(),
            None => {
                error!("No pass to preview");
                return ExitCode::FAILURE;
            }
        };
        let jpeg = match PreviewEncoder::new().encode(&frame.buffers, &pass, config.quality) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                error!("Failed to encode preview: {}", e);
                return ExitCode::FAILURE;
            }
        };
        if let Err(e) = std::fs::write(preview, &jpeg) {
            error!("Failed to write {}: {}", preview.display(), e);
            return ExitCode::FAILURE;
        }
        info!("Wrote preview of '{}' to {}", pass, preview.display());
    }

    if config.keep {
        info!("Kept tile file {}", frame.path.display());
    } else {
        session.remove_tile_file();
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "tile_spool=debug"
    } else {
        "tile_spool=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// =============================================================================
// Inspect Command
// =============================================================================

fn run_inspect(config: InspectConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    let mut reader = match TileFileReader::open_path(&config.file) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("Error: {}: {}", config.file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let verified = if config.verify {
        Some(reader.verify().map_err(|e| e.to_string()))
    } else {
        None
    };
    let summary = reader.summary();

    match config.format {
        OutputFormat::Text => print_summary(&summary, verified.as_ref()),
        OutputFormat::Json => {
            let json = serde_json::json!({
                "file": summary,
                "verified": verified.as_ref().map(|r| r.is_ok()),
                "verify_error": verified.as_ref().and_then(|r| r.as_ref().err()),
            });
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    match verified {
        Some(Err(_)) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

fn print_summary(summary: &TileFileSummary, verified: Option<&Result<(), String>>) {
    println!("Tile file: {}", summary.identifier);
    println!("═════════════════════════════════");
    println!("  Size:       {} bytes", summary.size_bytes);
    println!("  Version:    {}", summary.version);
    println!(
        "  Finalized:  {}",
        if summary.finalized { "yes" } else { "no" }
    );
    println!("  Frame:      {}x{}", summary.width, summary.height);
    if summary.offset_x != 0
        || summary.offset_y != 0
        || summary.full_width != summary.width
        || summary.full_height != summary.height
    {
        println!(
            "  Region:     ({}, {}) in {}x{}",
            summary.offset_x, summary.offset_y, summary.full_width, summary.full_height
        );
    }
    println!(
        "  Tiles:      {}x{} of {}px ({} present, {} missing)",
        summary.tiles_x,
        summary.tiles_y,
        summary.tile_size,
        summary.present_tiles,
        summary.missing_tiles.len()
    );
    println!("  Channels:   {}", summary.channels.join(", "));
    println!("  Exposure:   {}", summary.film.exposure);
    println!(
        "  Denoise:    {}",
        if summary.denoise.use_denoise {
            format!("{:?}", summary.denoise.denoiser)
        } else {
            "off".to_string()
        }
    );
    for (key, value) in &summary.attributes {
        println!("  {}: {}", key, value);
    }

    match verified {
        Some(Ok(())) => println!("✓ All tiles verified"),
        Some(Err(e)) => println!("✗ Verification failed: {}", e),
        None => {}
    }
}

// =============================================================================
// Export Command
// =============================================================================

fn run_export(config: ExportConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let buffers = match TileFileReader::open_path(&config.file)
        .and_then(|mut reader| reader.read_full_buffer())
    {
        Ok(buffers) => buffers,
        Err(e) => {
            error!("Failed to read {}: {}", config.file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let jpeg = match PreviewEncoder::new().encode(&buffers, &config.pass, config.quality) {
        Ok(jpeg) => jpeg,
        Err(e) => {
            error!("Failed to encode '{}': {}", config.pass, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = std::fs::write(&config.output, &jpeg) {
        error!("Failed to write {}: {}", config.output.display(), e);
        return ExitCode::FAILURE;
    }

    info!(
        "Exported '{}' ({}x{}) to {}",
        config.pass,
        buffers.params().width,
        buffers.params().height,
        config.output.display()
    );
    ExitCode::SUCCESS
}
