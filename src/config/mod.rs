//! Configuration management for the voice command engine

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::command::{Language, SkillCatalog};
use crate::orchestrator::{InFlightPolicy, OrchestratorConfig, VoiceSettings};
use crate::pitch::{
    DEFAULT_PEAK_COUNT, DEFAULT_THRESHOLD, ElementMap, PitchAnalyzer, PitchBoundaries, YinEstimator,
};
use crate::voice::{DEFAULT_TIMEOUT, SAMPLE_RATE, SegmenterConfig};
use crate::{Error, Result};

use file::VoiceConfigFile;

/// Default transcription server
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Seconds of audio kept in the capture ring
pub const DEFAULT_RING_SECONDS: f32 = 10.0;

/// Voice command engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Transcription server
    pub server: ServerConfig,

    /// Recognition language
    pub language: Language,

    /// Capture sample rate in Hz
    pub sample_rate: u32,

    /// Capture ring length in seconds
    pub ring_seconds: f32,

    /// Utterance segmentation
    pub segmenter: SegmenterConfig,

    /// Seconds between live pitch updates
    pub pitch_update_interval: f32,

    /// Handling of utterances finished during a request
    pub in_flight: InFlightPolicy,

    /// Pitch engine tuning
    pub pitch: PitchConfig,

    /// Element per pitch category
    pub elements: ElementMap,

    /// Element used regardless of pitch
    pub pinned_element: Option<String>,

    /// Skill catalog source
    pub skills: SkillsConfig,
}

/// Transcription server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub url: String,
    pub timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Pitch engine configuration
#[derive(Debug, Clone)]
pub struct PitchConfig {
    pub boundaries: PitchBoundaries,

    /// Loudest frames analyzed per utterance
    pub peak_count: usize,

    /// Restrict YIN to a band around the spectral peak
    pub hinted: bool,

    pub yin_threshold: f32,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            boundaries: PitchBoundaries::default(),
            peak_count: DEFAULT_PEAK_COUNT,
            hinted: true,
            yin_threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Skill catalog configuration
#[derive(Debug, Clone, Default)]
pub struct SkillsConfig {
    /// JSON catalog path; the built-in demo catalog is used when unset
    pub catalog: Option<PathBuf>,

    /// Skill ids active at startup (empty = all)
    pub active: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            language: Language::default(),
            sample_rate: SAMPLE_RATE,
            ring_seconds: DEFAULT_RING_SECONDS,
            segmenter: SegmenterConfig::default(),
            pitch_update_interval: 0.1,
            in_flight: InFlightPolicy::default(),
            pitch: PitchConfig::default(),
            elements: ElementMap::default(),
            pinned_element: None,
            skills: SkillsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the standard file and the process environment
    ///
    /// # Errors
    ///
    /// Returns error if an environment override is invalid
    pub fn load() -> Result<Self> {
        Self::from_sources(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Load configuration from an explicit file plus the process environment
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, or an override is invalid
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let fc = file::read_config_file(path)?;
        tracing::info!(path = %path.display(), "loaded config file");
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Merge sources with precedence env > file > default
    ///
    /// # Errors
    ///
    /// Returns error if an environment override is invalid
    pub fn from_sources<F>(fc: VoiceConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let server = ServerConfig {
            url: env("LOSTSPELLS_SERVER_URL")
                .or(fc.server.url)
                .unwrap_or(defaults.server.url),
            timeout: fc
                .server
                .timeout_secs
                .map_or(defaults.server.timeout, Duration::from_secs),
        };

        let language = match env("LOSTSPELLS_LANGUAGE") {
            Some(code) => code.parse()?,
            None => fc.voice.language.unwrap_or(defaults.language),
        };

        let seg = defaults.segmenter;
        let segmenter = SegmenterConfig {
            mode: fc.voice.segment_mode.unwrap_or(seg.mode),
            activation_threshold: fc.voice.activation_threshold.unwrap_or(seg.activation_threshold),
            silence_timeout: fc.voice.silence_timeout.unwrap_or(seg.silence_timeout),
            min_duration: fc.voice.min_duration.unwrap_or(seg.min_duration),
            max_duration: fc.voice.max_duration.unwrap_or(seg.max_duration),
            pre_roll: fc.voice.pre_roll.unwrap_or(seg.pre_roll),
        };

        let mut boundaries = defaults.pitch.boundaries;
        boundaries.set(
            fc.pitch.low_max.unwrap_or(defaults.pitch.boundaries.low_max()),
            fc.pitch.high_min.unwrap_or(defaults.pitch.boundaries.high_min()),
        );
        let pitch = PitchConfig {
            boundaries,
            peak_count: fc.pitch.peak_count.unwrap_or(defaults.pitch.peak_count),
            hinted: fc.pitch.hinted.unwrap_or(defaults.pitch.hinted),
            yin_threshold: fc.pitch.yin_threshold.unwrap_or(defaults.pitch.yin_threshold),
        };

        let base = defaults.elements;
        let elements = ElementMap {
            low: fc.elements.low.unwrap_or(base.low),
            medium: fc.elements.medium.unwrap_or(base.medium),
            high: fc.elements.high.unwrap_or(base.high),
        };

        let skills = SkillsConfig {
            catalog: fc.skills.catalog.map(PathBuf::from),
            active: env("LOSTSPELLS_SKILLS")
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .or(fc.skills.active)
                .unwrap_or_default(),
        };

        let config = Self {
            server,
            language,
            sample_rate: fc.voice.sample_rate.unwrap_or(defaults.sample_rate),
            ring_seconds: fc.voice.ring_seconds.unwrap_or(defaults.ring_seconds),
            segmenter,
            pitch_update_interval: fc
                .voice
                .pitch_update_interval
                .unwrap_or(defaults.pitch_update_interval),
            in_flight: fc.voice.in_flight.unwrap_or(defaults.in_flight),
            pitch,
            elements,
            pinned_element: fc.elements.pinned.filter(|e| !e.trim().is_empty()),
            skills,
        };
        config.validate()?;

        Ok(config)
    }

    /// Reject values the engine cannot run with
    ///
    /// # Errors
    ///
    /// Returns error describing the first invalid field
    pub fn validate(&self) -> Result<()> {
        if self.server.url.trim().is_empty() {
            return Err(Error::Config("server url is empty".to_string()));
        }
        if self.sample_rate == 0 {
            return Err(Error::Config("sample rate must be positive".to_string()));
        }
        if self.ring_seconds <= self.segmenter.max_duration + self.segmenter.pre_roll {
            return Err(Error::Config(format!(
                "ring of {}s cannot hold a {}s utterance plus {}s pre-roll",
                self.ring_seconds, self.segmenter.max_duration, self.segmenter.pre_roll
            )));
        }
        if self.segmenter.min_duration > self.segmenter.max_duration {
            return Err(Error::Config(
                "min duration exceeds max duration".to_string(),
            ));
        }
        if self.pitch.peak_count == 0 {
            return Err(Error::Config("peak count must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Pitch analyzer built from the pitch section
    #[must_use]
    pub fn analyzer(&self) -> PitchAnalyzer {
        PitchAnalyzer::new(
            self.pitch.peak_count,
            self.pitch.hinted,
            YinEstimator::new(self.pitch.yin_threshold),
        )
    }

    /// Engine tuning for the orchestrator
    #[must_use]
    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            segmenter: self.segmenter,
            analyzer: self.analyzer(),
            pitch_update_interval: self.pitch_update_interval,
            in_flight: self.in_flight,
        }
    }

    /// Initial player-facing settings
    #[must_use]
    pub fn voice_settings(&self) -> VoiceSettings {
        VoiceSettings {
            boundaries: self.pitch.boundaries,
            elements: self.elements.clone(),
            pinned_element: self.pinned_element.clone(),
            language: self.language,
        }
    }

    /// Load the configured skill catalog and apply the startup active set
    ///
    /// # Errors
    ///
    /// Returns error if the catalog file cannot be loaded
    pub fn skill_catalog(&self) -> Result<SkillCatalog> {
        let mut catalog = match &self.skills.catalog {
            Some(path) => SkillCatalog::load(path)?,
            None => SkillCatalog::from_json(DEMO_CATALOG)?,
        };

        if !self.skills.active.is_empty() {
            catalog.set_active(&self.skills.active);
        }
        Ok(catalog)
    }
}

/// Catalog used when no catalog file is configured
const DEMO_CATALOG: &str = r#"[
    {"id": "fireball", "voice_keyword": "파이어볼",
     "localized_names": {"ko": "파이어볼", "en": "Fireball"},
     "aliases": ["화염구"]},
    {"id": "ice_spear", "voice_keyword": "아이스 스피어",
     "localized_names": {"ko": "아이스 스피어", "en": "Ice Spear"},
     "aliases": ["얼음창"]},
    {"id": "thunder", "voice_keyword": "썬더",
     "localized_names": {"ko": "썬더", "en": "Thunder"},
     "aliases": ["번개"]},
    {"id": "elemental_bolt", "voice_keyword": "볼트",
     "localized_names": {"ko": "볼트", "en": "Bolt"},
     "is_generic": true,
     "element_variants": {
        "Fire": {"id": "fire_bolt", "voice_keyword": "파이어 볼트"},
        "Ice": {"id": "ice_bolt", "voice_keyword": "아이스 볼트"},
        "Electric": {"id": "electric_bolt", "voice_keyword": "일렉트릭 볼트"}
     }}
]"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::SegmentMode;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(VoiceConfigFile::default(), no_env).unwrap();
        assert_eq!(config.server.url, DEFAULT_SERVER_URL);
        assert_eq!(config.language, Language::Korean);
        assert_eq!(config.sample_rate, SAMPLE_RATE);
        assert_eq!(config.segmenter.mode, SegmentMode::KeyTriggered);
        assert_eq!(config.in_flight, InFlightPolicy::Drop);
        assert_eq!(config.pitch.peak_count, DEFAULT_PEAK_COUNT);
        assert!(config.skills.active.is_empty());
    }

    #[test]
    fn test_file_overlay() {
        let fc: VoiceConfigFile = toml::from_str(
            r#"
            [server]
            url = "http://gpu-box:8000"
            timeout_secs = 5

            [voice]
            segment_mode = "continuous"
            silence_timeout = 0.8

            [pitch]
            low_max = 150.0
            high_min = 300.0

            [elements]
            high = "Wind"
            "#,
        )
        .unwrap();

        let config = Config::from_sources(fc, no_env).unwrap();
        assert_eq!(config.server.url, "http://gpu-box:8000");
        assert_eq!(config.server.timeout, Duration::from_secs(5));
        assert_eq!(config.segmenter.mode, SegmentMode::Continuous);
        assert!((config.segmenter.silence_timeout - 0.8).abs() < f32::EPSILON);
        assert!((config.pitch.boundaries.low_max() - 150.0).abs() < f32::EPSILON);
        assert!((config.pitch.boundaries.high_min() - 300.0).abs() < f32::EPSILON);
        assert_eq!(config.elements.high, "Wind");
        assert_eq!(config.elements.low, "Fire");
    }

    #[test]
    fn test_env_wins_over_file() {
        let fc: VoiceConfigFile = toml::from_str(
            r#"
            [server]
            url = "http://from-file:8000"

            [voice]
            language = "ko"

            [skills]
            active = ["fireball"]
            "#,
        )
        .unwrap();

        let env = |key: &str| match key {
            "LOSTSPELLS_SERVER_URL" => Some("http://from-env:9000".to_string()),
            "LOSTSPELLS_LANGUAGE" => Some("en".to_string()),
            "LOSTSPELLS_SKILLS" => Some("thunder, ice_spear,".to_string()),
            _ => None,
        };

        let config = Config::from_sources(fc, env).unwrap();
        assert_eq!(config.server.url, "http://from-env:9000");
        assert_eq!(config.language, Language::English);
        assert_eq!(config.skills.active, vec!["thunder", "ice_spear"]);
    }

    #[test]
    fn test_bad_language_override() {
        let env = |key: &str| (key == "LOSTSPELLS_LANGUAGE").then(|| "klingon".to_string());
        let result = Config::from_sources(VoiceConfigFile::default(), env);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_ring_must_hold_utterance() {
        let fc: VoiceConfigFile = toml::from_str("[voice]\nring_seconds = 3.0\n").unwrap();
        assert!(matches!(
            Config::from_sources(fc, no_env),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_demo_catalog_with_active_subset() {
        let mut config = Config::default();
        config.skills.active = vec!["thunder".to_string(), "fireball".to_string()];

        let catalog = config.skill_catalog().unwrap();
        assert_eq!(catalog.all().len(), 4);

        let ids: Vec<&str> = catalog.active().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["thunder", "fireball"]);
        assert!(catalog.get("elemental_bolt").unwrap().is_generic);
    }

    #[test]
    fn test_derived_settings() {
        let mut config = Config::default();
        config.pinned_element = Some("Ice".to_string());
        config.in_flight = InFlightPolicy::QueueLatest;

        let settings = config.voice_settings();
        assert_eq!(settings.pinned_element.as_deref(), Some("Ice"));
        assert_eq!(settings.boundaries, PitchBoundaries::default());

        let engine = config.orchestrator();
        assert_eq!(engine.in_flight, InFlightPolicy::QueueLatest);
        assert_eq!(engine.analyzer.peak_count(), DEFAULT_PEAK_COUNT);
    }
}
