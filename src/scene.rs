//! Scene-level settings carried through tile files.
//!
//! The tile manager never interprets these values. They are written into the
//! tile file's metadata when the image spec is built and handed back to the
//! caller when the full frame is read from disk, so a denoiser running on the
//! reconstructed buffer sees the same settings the render used.

use serde::{Deserialize, Serialize};

/// Denoiser backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DenoiserType {
    #[default]
    OpenImageDenoise,
    Optix,
}

/// Guiding-pass prefilter mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DenoisePrefilter {
    None,
    Fast,
    #[default]
    Accurate,
}

/// Denoiser parameters, passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseParams {
    pub use_denoise: bool,
    pub denoiser: DenoiserType,
    /// Sample count after which denoising starts
    pub start_sample: u32,
    pub use_pass_albedo: bool,
    pub use_pass_normal: bool,
    pub prefilter: DenoisePrefilter,
}

impl Default for DenoiseParams {
    fn default() -> Self {
        Self {
            use_denoise: false,
            denoiser: DenoiserType::default(),
            start_sample: 0,
            use_pass_albedo: true,
            use_pass_normal: true,
            prefilter: DenoisePrefilter::default(),
        }
    }
}

/// Film settings recorded alongside the passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilmSettings {
    pub exposure: f32,
    pub transparent_background: bool,
}

impl Default for FilmSettings {
    fn default() -> Self {
        Self {
            exposure: 1.0,
            transparent_background: false,
        }
    }
}

/// Read-only view of the scene state the tile manager needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub film: FilmSettings,
    pub denoise: DenoiseParams,
}

impl Scene {
    pub fn new(film: FilmSettings, denoise: DenoiseParams) -> Self {
        Self { film, denoise }
    }
}
