//! Context-aware command routing
//!
//! Maps the host's screen state to a [`GameContext`], and resolves
//! utterances to skills or system commands legal in that context.

mod context;
mod resolver;
mod skill;
mod table;

pub use context::{GameContext, GameScreen, ScreenState, resolve_context};
pub use resolver::{
    CommandResolver, OutcomeStatus, RecognitionOutcome, Resolution, SYSTEM_PREFIX, Utterance,
};
pub use skill::{Language, SkillCatalog, SkillDescriptor};
pub use table::{
    CommandId, MAX_CHAPTER, UnknownCommand, allowed, blocked_hint, classify_command, is_allowed,
    keyword_hints, normalize,
};
