//! TOML configuration file loading
//!
//! Supports `~/.config/lostspells/voice/config.toml` as a persistent config
//! source. All fields are optional; the file is a partial overlay on top of
//! defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;
use crate::command::Language;
use crate::orchestrator::InFlightPolicy;
use crate::voice::SegmentMode;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct VoiceConfigFile {
    #[serde(default)]
    pub server: ServerFileConfig,

    #[serde(default)]
    pub voice: VoiceFileConfig,

    #[serde(default)]
    pub pitch: PitchFileConfig,

    /// Element per pitch category
    #[serde(default)]
    pub elements: ElementsFileConfig,

    #[serde(default)]
    pub skills: SkillsFileConfig,
}

/// Transcription server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Base URL (e.g. "http://localhost:8000")
    pub url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Capture and segmentation configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// "ko" or "en"
    pub language: Option<Language>,
    pub sample_rate: Option<u32>,
    pub ring_seconds: Option<f32>,
    /// "key_triggered" or "continuous"
    pub segment_mode: Option<SegmentMode>,
    pub activation_threshold: Option<f32>,
    pub silence_timeout: Option<f32>,
    pub min_duration: Option<f32>,
    pub max_duration: Option<f32>,
    pub pre_roll: Option<f32>,
    pub pitch_update_interval: Option<f32>,
    /// "drop" or "queue_latest"
    pub in_flight: Option<InFlightPolicy>,
}

/// Pitch engine configuration
#[derive(Debug, Default, Deserialize)]
pub struct PitchFileConfig {
    pub low_max: Option<f32>,
    pub high_min: Option<f32>,
    pub peak_count: Option<usize>,
    pub hinted: Option<bool>,
    pub yin_threshold: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ElementsFileConfig {
    pub low: Option<String>,
    pub medium: Option<String>,
    pub high: Option<String>,
    /// Element used for every cast regardless of pitch
    pub pinned: Option<String>,
}

/// Skill catalog configuration
#[derive(Debug, Default, Deserialize)]
pub struct SkillsFileConfig {
    /// Path to the JSON skill catalog
    pub catalog: Option<String>,

    /// Skill ids active at startup (empty = all)
    pub active: Option<Vec<String>>,
}

/// Load the TOML config file from the standard path
///
/// Returns `VoiceConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> VoiceConfigFile {
    let Some(path) = config_file_path() else {
        return VoiceConfigFile::default();
    };

    if !path.exists() {
        return VoiceConfigFile::default();
    }

    match read_config_file(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            VoiceConfigFile::default()
        }
    }
}

/// Read and parse a config file at an explicit path
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn read_config_file(path: &Path) -> Result<VoiceConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Return the config file path: `~/.config/lostspells/voice/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| {
        d.config_dir()
            .join("lostspells")
            .join("voice")
            .join("config.toml")
    })
}
