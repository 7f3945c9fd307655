//! Lost Spells voice command engine
//!
//! Turns spoken utterances into spell casts and menu commands:
//! - Utterance segmentation (push-to-talk or voice activity)
//! - Pitch analysis selecting a spell element
//! - Context-aware resolution against the active skill catalog
//! - Remote speech-to-text over HTTP
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                       Host                          │
//! │    Screen state  │  Frame tick  │  Event consumer   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              VoiceCommandOrchestrator               │
//! │   Segmenter  │  Pitch  │  Resolver  │  Catalog      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │            Transcription server (HTTP)              │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pitch;
pub mod voice;

pub use command::{
    CommandId, CommandResolver, GameContext, GameScreen, Language, RecognitionOutcome,
    Resolution, ScreenState, SkillCatalog, SkillDescriptor,
};
pub use config::Config;
pub use error::{Error, Result};
pub use orchestrator::{
    InFlightPolicy, OrchestratorConfig, VoiceCommandOrchestrator, VoiceEvent, VoiceSettings,
};
pub use pitch::{ElementMap, PitchAnalysis, PitchAnalyzer, PitchBoundaries, PitchCategory};
pub use voice::{AudioSource, CaptureRing, Transcriber, VoiceServerClient};
