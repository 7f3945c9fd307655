//! Speech-to-text through the voice command server

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Request timeout for recognition calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// One utterance sent for recognition
#[derive(Debug, Clone, Default)]
pub struct TranscriptionRequest {
    /// 16-bit PCM WAV bytes
    pub audio: Vec<u8>,
    /// Language code, `ko` or `en`
    pub language: String,
    /// Voice keywords of the active skills
    pub skills: Vec<String>,
    /// Wire name of the current game context
    pub context: String,
    /// Phrases legal in the current context
    pub context_keywords: Vec<String>,
}

/// Scored alternative returned by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    #[serde(default)]
    pub confidence: f32,
}

/// Successful recognition result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptionReply {
    pub text: String,
    pub matched_skill: Option<String>,
    pub confidence: f32,
    pub candidates: Vec<Candidate>,
    /// Server-side processing time in seconds
    pub processing_time: f32,
}

/// Turns recorded audio into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Recognize one utterance
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the service reports failure
    async fn recognize(&self, request: TranscriptionRequest) -> Result<TranscriptionReply>;
}

/// Wire format of the `/recognize` reply
#[derive(Debug, Deserialize)]
struct ServerResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    text: String,
    #[serde(default)]
    matched_skill: Option<String>,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    processing_time: f32,
    #[serde(default)]
    error: Option<String>,
}

impl ServerResponse {
    fn into_reply(self) -> Result<TranscriptionReply> {
        if !self.success {
            let reason = self.error.unwrap_or_else(|| "server reported failure".to_string());
            return Err(Error::Transcription(reason));
        }

        Ok(TranscriptionReply {
            text: self.text,
            matched_skill: self.matched_skill.filter(|s| !s.is_empty()),
            confidence: self.confidence,
            candidates: self.candidates,
            processing_time: self.processing_time,
        })
    }
}

/// HTTP client for the voice command server
pub struct VoiceServerClient {
    client: reqwest::Client,
    base_url: String,
}

impl VoiceServerClient {
    /// Create a client for the server at `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if the URL is empty or the HTTP client cannot be built
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Config("voice server url required".to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    /// Server base URL without trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the server is reachable
    ///
    /// # Errors
    ///
    /// Returns error if the server is unreachable or answers with a failure status
    pub async fn health(&self) -> Result<()> {
        let response = self.client.get(format!("{}/", self.base_url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transcription(format!("health check failed: {status}")));
        }

        tracing::debug!(url = %self.base_url, "voice server healthy");
        Ok(())
    }
}

#[async_trait]
impl Transcriber for VoiceServerClient {
    async fn recognize(&self, request: TranscriptionRequest) -> Result<TranscriptionReply> {
        tracing::debug!(
            audio_bytes = request.audio.len(),
            language = %request.language,
            context = %request.context,
            skills = request.skills.len(),
            "sending recognition request"
        );

        let form = reqwest::multipart::Form::new()
            .part(
                "audio",
                reqwest::multipart::Part::bytes(request.audio)
                    .file_name("recording.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Transcription(e.to_string()))?,
            )
            .text("language", request.language)
            .text("skills", request.skills.join(","))
            .text("context", request.context)
            .text("context_keywords", request.context_keywords.join(","));

        let response = self
            .client
            .post(format!("{}/recognize", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "recognition request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "voice server error");
            return Err(Error::Transcription(format!("voice server error {status}: {body}")));
        }

        let parsed: ServerResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            e
        })?;

        let reply = parsed.into_reply()?;
        tracing::info!(
            transcript = %reply.text,
            matched = ?reply.matched_skill,
            confidence = reply.confidence,
            "transcription complete"
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_response() {
        let json = r#"{
            "success": true,
            "text": "파이어볼",
            "matched_skill": "Fireball",
            "confidence": 0.92,
            "candidates": [{"name": "Fireball", "confidence": 0.92}, {"name": "IceSpear"}],
            "processing_time": 0.41
        }"#;

        let reply = serde_json::from_str::<ServerResponse>(json)
            .unwrap()
            .into_reply()
            .unwrap();

        assert_eq!(reply.text, "파이어볼");
        assert_eq!(reply.matched_skill.as_deref(), Some("Fireball"));
        assert_eq!(reply.candidates.len(), 2);
        assert!(reply.candidates[1].confidence.abs() < f32::EPSILON);
    }

    #[test]
    fn test_failure_response_is_error() {
        let json = r#"{"success": false, "error": "model not loaded"}"#;
        let err = serde_json::from_str::<ServerResponse>(json)
            .unwrap()
            .into_reply()
            .unwrap_err();

        assert!(err.to_string().contains("model not loaded"));
    }

    #[test]
    fn test_missing_success_flag_is_failure() {
        let response: ServerResponse = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert!(response.into_reply().is_err());
    }

    #[test]
    fn test_empty_matched_skill_is_none() {
        let json = r#"{"success": true, "text": "음", "matched_skill": ""}"#;
        let reply = serde_json::from_str::<ServerResponse>(json)
            .unwrap()
            .into_reply()
            .unwrap();
        assert!(reply.matched_skill.is_none());
    }

    #[test]
    fn test_client_requires_url() {
        assert!(VoiceServerClient::new("  ", DEFAULT_TIMEOUT).is_err());

        let client = VoiceServerClient::new("http://localhost:8000/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
