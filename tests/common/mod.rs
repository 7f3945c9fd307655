//! Shared test utilities
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use lostspells_voice::command::SkillCatalog;
use lostspells_voice::voice::{Transcriber, TranscriptionReply, TranscriptionRequest};
use lostspells_voice::{Error, Result};

/// Sample rate used throughout the integration tests
pub const SR: u32 = 16_000;

/// Generate sine wave audio samples
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn sine(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SR as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SR as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn silence(duration_secs: f32) -> Vec<f32> {
    vec![0.0; (SR as f32 * duration_secs) as usize]
}

/// Catalog with plain skills and one generic skill
pub fn catalog() -> SkillCatalog {
    SkillCatalog::from_json(
        r#"[
        {"id": "fireball", "voice_keyword": "파이어볼", "localized_names": {"en": "Fireball"}},
        {"id": "ice_spear", "voice_keyword": "아이스 스피어", "aliases": ["얼음창"]},
        {"id": "elemental_bolt", "voice_keyword": "볼트", "is_generic": true,
         "element_variants": {
            "Fire": {"id": "fire_bolt", "voice_keyword": "파이어 볼트"},
            "Ice": {"id": "ice_bolt", "voice_keyword": "아이스 볼트"},
            "Electric": {"id": "electric_bolt", "voice_keyword": "일렉트릭 볼트"}
         }}
    ]"#,
    )
    .expect("test catalog is valid")
}

/// Server reply naming a skill
pub fn reply(text: &str, matched: Option<&str>) -> TranscriptionReply {
    TranscriptionReply {
        text: text.to_string(),
        matched_skill: matched.map(str::to_string),
        confidence: 0.9,
        ..TranscriptionReply::default()
    }
}

/// Scripted transcriber that records every request
///
/// With a gate, each request waits for one `notify_one` before answering.
#[derive(Default)]
pub struct MockTranscriber {
    replies: Mutex<VecDeque<Result<TranscriptionReply>>>,
    requests: Mutex<Vec<TranscriptionRequest>>,
    gate: Option<Arc<Notify>>,
}

impl MockTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, reply: TranscriptionReply) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply));
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(Error::Transcription(message.to_string())));
        self
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn requests(&self) -> Vec<TranscriptionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn recognize(&self, request: TranscriptionRequest) -> Result<TranscriptionReply> {
        self.requests.lock().unwrap().push(request);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(TranscriptionReply::default()))
    }
}
