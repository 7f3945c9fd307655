//! Utterance to skill or command resolution

use serde::Serialize;

use super::context::GameContext;
use super::skill::{Language, SkillDescriptor};
use super::table::{CommandId, blocked_hint, classify_command, is_allowed, normalize};
use crate::voice::{Candidate, TranscriptionReply};

/// Prefix marking a server label as a system command
pub const SYSTEM_PREFIX: &str = "SYSTEM:";

/// Confidence of local matches
const EXACT_KEYWORD_CONFIDENCE: f32 = 1.0;
const KEYWORD_SUBSTRING_CONFIDENCE: f32 = 0.9;
const NAME_MATCH_CONFIDENCE: f32 = 0.8;
const KEYWORD_COMMAND_CONFIDENCE: f32 = 0.7;

/// Input to the resolver
#[derive(Debug, Clone, PartialEq)]
pub enum Utterance {
    /// A skill chosen directly, e.g. by a keyboard shortcut
    SkillId(String),
    /// A transcription result
    Transcript(TranscriptionReply),
}

impl Utterance {
    /// Bare transcript with no server-side match
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Transcript(TranscriptionReply {
            text: text.into(),
            ..TranscriptionReply::default()
        })
    }
}

/// What an utterance resolved to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// Cast `skill`; for generic skills this is already the element variant
    Skill {
        skill: String,
        element: Option<String>,
    },
    Command { command: CommandId },
}

/// Result classification of one utterance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Matched,
    NoMatch,
    /// Recognized but not legal in the current context
    Blocked { hint: String },
    /// Transcription failed
    Failed { reason: String },
}

/// Everything the host needs to act on or display one utterance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionOutcome {
    pub transcript: String,
    pub matched: Option<Resolution>,
    pub confidence: f32,
    pub candidates: Vec<Candidate>,
    pub status: OutcomeStatus,
}

impl RecognitionOutcome {
    /// Outcome for a transcription that never produced text
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            transcript: String::new(),
            matched: None,
            confidence: 0.0,
            candidates: Vec::new(),
            status: OutcomeStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    /// The resolution to execute, if the outcome allows it
    #[must_use]
    pub fn executable(&self) -> Option<&Resolution> {
        match self.status {
            OutcomeStatus::Matched => self.matched.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_matched(&self) -> bool {
        self.status == OutcomeStatus::Matched
    }
}

/// Intermediate match before context gating
enum Found<'a> {
    Skill(&'a SkillDescriptor),
    Command(CommandId),
}

/// Resolves utterances against the active skills and the command table
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandResolver {
    language: Language,
}

impl CommandResolver {
    #[must_use]
    pub const fn new(language: Language) -> Self {
        Self { language }
    }

    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    pub const fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// Resolve one utterance
    ///
    /// Order: direct skill id, single active skill, `SYSTEM:` server labels,
    /// catalog scan of the transcript, server skill labels, then command
    /// keywords. The first rule that matches wins. A `SYSTEM:` label in the
    /// reply or its text skips the catalog scan and server skill labels. The match is then gated by
    /// `context` and generic skills are swapped for their `element` variant.
    #[must_use]
    pub fn resolve(
        &self,
        utterance: &Utterance,
        active: &[SkillDescriptor],
        context: GameContext,
        element: Option<&str>,
    ) -> RecognitionOutcome {
        let (transcript, found, candidates) = match utterance {
            Utterance::SkillId(id) => {
                let found = active
                    .iter()
                    .find(|s| s.id == *id)
                    .map(|s| (Found::Skill(s), EXACT_KEYWORD_CONFIDENCE));
                (id.clone(), found, Vec::new())
            }
            Utterance::Transcript(reply) => (
                reply.text.clone(),
                self.match_transcript(reply, active, context),
                reply.candidates.clone(),
            ),
        };

        let outcome = self.finish(transcript, found, candidates, context, element);
        tracing::debug!(
            transcript = %outcome.transcript,
            matched = ?outcome.matched,
            status = ?outcome.status,
            context = %context,
            "utterance resolved"
        );
        outcome
    }

    fn match_transcript<'a>(
        &self,
        reply: &TranscriptionReply,
        active: &'a [SkillDescriptor],
        context: GameContext,
    ) -> Option<(Found<'a>, f32)> {
        if let [only] = active {
            return Some((Found::Skill(only), EXACT_KEYWORD_CONFIDENCE));
        }

        let label = reply.matched_skill.as_deref().map(str::trim).unwrap_or_default();
        let sentinel = label
            .strip_prefix(SYSTEM_PREFIX)
            .or_else(|| reply.text.trim().strip_prefix(SYSTEM_PREFIX));

        // A system label replaces skill matching on the transcript
        if let Some(name) = sentinel {
            if let Some(found) = match_system_label(name.trim(), active) {
                return Some((found, reply.confidence));
            }
        } else {
            if let Some(found) = scan_catalog(&normalize(&reply.text), active) {
                return Some(found);
            }

            if !label.is_empty()
                && let Some(skill) = active.iter().find(|s| s.answers_to(label))
            {
                return Some((Found::Skill(skill), reply.confidence));
            }
        }

        classify_command(&reply.text, context)
            .map(|command| (Found::Command(command), KEYWORD_COMMAND_CONFIDENCE))
    }

    fn finish(
        &self,
        transcript: String,
        found: Option<(Found<'_>, f32)>,
        mut candidates: Vec<Candidate>,
        context: GameContext,
        element: Option<&str>,
    ) -> RecognitionOutcome {
        let Some((found, confidence)) = found else {
            return RecognitionOutcome {
                transcript,
                matched: None,
                confidence: 0.0,
                candidates,
                status: OutcomeStatus::NoMatch,
            };
        };

        let (resolution, legal) = match found {
            Found::Skill(skill) => {
                let cast = element.and_then(|e| skill.variant_for(e)).unwrap_or(skill);
                let resolution = Resolution::Skill {
                    skill: cast.id.clone(),
                    element: element.map(str::to_string),
                };
                (resolution, context.is_playing())
            }
            Found::Command(command) => (Resolution::Command { command }, is_allowed(command, context)),
        };

        if candidates.is_empty() {
            candidates.push(Candidate {
                name: resolution_name(&resolution),
                confidence,
            });
        }

        let status = if legal {
            OutcomeStatus::Matched
        } else {
            OutcomeStatus::Blocked {
                hint: blocked_hint(context, self.language),
            }
        };

        RecognitionOutcome {
            transcript,
            matched: Some(resolution),
            confidence,
            candidates,
            status,
        }
    }
}

/// First skill the normalized text names, in catalog order
fn scan_catalog<'a>(text: &str, active: &'a [SkillDescriptor]) -> Option<(Found<'a>, f32)> {
    if text.is_empty() {
        return None;
    }

    for skill in active {
        let keyword = normalize(&skill.voice_keyword);
        if !keyword.is_empty() {
            if text == keyword {
                return Some((Found::Skill(skill), EXACT_KEYWORD_CONFIDENCE));
            }
            if text.contains(&keyword) {
                return Some((Found::Skill(skill), KEYWORD_SUBSTRING_CONFIDENCE));
            }
        }

        let names = skill.localized_names.values().chain(&skill.aliases);
        for name in names {
            let name = normalize(name);
            if !name.is_empty() && (text.contains(&name) || name.contains(text)) {
                return Some((Found::Skill(skill), NAME_MATCH_CONFIDENCE));
            }
        }
    }

    None
}

/// Resolve the part after `SYSTEM:`; `Use<Name>` is a skill lookup
fn match_system_label<'a>(name: &str, active: &'a [SkillDescriptor]) -> Option<Found<'a>> {
    if let Ok(command) = name.parse::<CommandId>() {
        return Some(Found::Command(command));
    }

    let skill_name = name.strip_prefix("Use")?;
    active
        .iter()
        .find(|s| s.answers_to(skill_name))
        .map(Found::Skill)
}

fn resolution_name(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Skill { skill, .. } => skill.clone(),
        Resolution::Command { command } => format!("{SYSTEM_PREFIX}{command}"),
    }
}
