//! Voice command orchestration
//!
//! Drives segmentation from the host's frame tick, sends finished utterances
//! for transcription, analyzes their pitch and resolves them against the
//! current game context. Results are queued as [`VoiceEvent`]s for the host.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::task::JoinHandle;

use crate::command::{
    CommandResolver, GameContext, Language, RecognitionOutcome, ScreenState, SkillCatalog,
    Utterance, keyword_hints, resolve_context,
};
use crate::pitch::{
    ElementMap, FRAME_SIZE, PitchAnalysis, PitchAnalyzer, PitchBoundaries, PitchCategory, classify,
    gauge_position, rms,
};
use crate::voice::{
    AudioSource, SampleBuffer, SegmentEvent, SegmentationState, SegmenterConfig, TRIM_LEVEL,
    Transcriber, TranscriptionReply, TranscriptionRequest, VoiceSegmenter, samples_to_wav,
};
use crate::Result;

/// Samples used for the per-tick level reading
pub const LEVEL_WINDOW: usize = 1024;

/// What to do with an utterance finished while a request is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InFlightPolicy {
    /// Discard the new utterance
    #[default]
    Drop,
    /// Hold the newest utterance and send it when the request completes
    QueueLatest,
}

/// Player-facing voice settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub boundaries: PitchBoundaries,
    pub elements: ElementMap,
    /// Element used regardless of pitch when set
    pub pinned_element: Option<String>,
    pub language: Language,
}

/// Engine tuning for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub segmenter: SegmenterConfig,
    pub analyzer: PitchAnalyzer,
    /// Seconds between live pitch updates while recording
    pub pitch_update_interval: f32,
    pub in_flight: InFlightPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            segmenter: SegmenterConfig::default(),
            analyzer: PitchAnalyzer::default(),
            pitch_update_interval: 0.1,
            in_flight: InFlightPolicy::default(),
        }
    }
}

/// Notification for the host
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceEvent {
    RecordingStarted,
    /// Live pitch while recording
    PitchUpdate {
        frequency: f32,
        category: PitchCategory,
        element: String,
        gauge: f32,
    },
    /// One utterance fully handled; `analysis` is absent for direct casts
    Recognition {
        outcome: RecognitionOutcome,
        analysis: Option<PitchAnalysis>,
    },
    /// Utterance too short to use
    SegmentDiscarded { duration: f32 },
    /// Utterance dropped because a request was already in flight
    SegmentDropped,
}

/// Clip ready to send, with the analysis of exactly those samples
struct PreparedClip {
    wav: Vec<u8>,
    analysis: PitchAnalysis,
}

struct PendingRequest {
    rx: oneshot::Receiver<Result<TranscriptionReply>>,
    task: JoinHandle<()>,
    analysis: PitchAnalysis,
    element: String,
}

/// Ties capture, segmentation, transcription and resolution together
pub struct VoiceCommandOrchestrator<S: AudioSource> {
    source: S,
    segmenter: VoiceSegmenter,
    analyzer: PitchAnalyzer,
    resolver: CommandResolver,
    catalog: SkillCatalog,
    transcriber: Arc<dyn Transcriber>,
    runtime: Handle,
    settings: VoiceSettings,
    screen: ScreenState,
    policy: InFlightPolicy,
    pitch_update_interval: f32,
    since_pitch_update: f32,
    pending: Option<PendingRequest>,
    queued: Option<PreparedClip>,
    events: VecDeque<VoiceEvent>,
}

impl<S: AudioSource> VoiceCommandOrchestrator<S> {
    /// Create an orchestrator reading from `source`
    ///
    /// Requests are spawned on `runtime`; the orchestrator itself never blocks.
    #[must_use]
    pub fn new(
        source: S,
        transcriber: Arc<dyn Transcriber>,
        catalog: SkillCatalog,
        config: OrchestratorConfig,
        settings: VoiceSettings,
        runtime: Handle,
    ) -> Self {
        let segmenter = VoiceSegmenter::new(config.segmenter, source.sample_rate(), source.capacity());
        if !segmenter.fits_capacity() {
            tracing::warn!(
                max_span = segmenter.max_span_samples(),
                capacity = source.capacity(),
                "audio source is shorter than the longest segment; long utterances will be cut"
            );
        }

        Self {
            source,
            segmenter,
            analyzer: config.analyzer,
            resolver: CommandResolver::new(settings.language),
            catalog,
            transcriber,
            runtime,
            settings,
            screen: ScreenState::default(),
            policy: config.in_flight,
            pitch_update_interval: config.pitch_update_interval,
            since_pitch_update: 0.0,
            pending: None,
            queued: None,
            events: VecDeque::new(),
        }
    }

    /// Advance by `dt` seconds
    ///
    /// Collects a finished request, reads the input level, steps the
    /// segmenter and emits live pitch while recording.
    pub fn update(&mut self, dt: f32) {
        self.poll_pending();

        let position = self.source.position();
        let level = rms(&self.source.latest(LEVEL_WINDOW));
        if let Some(event) = self.segmenter.tick(dt, level, position) {
            self.handle_segment(event);
        }

        if self.segmenter.is_recording() {
            self.since_pitch_update += dt;
            if self.since_pitch_update >= self.pitch_update_interval {
                self.since_pitch_update = 0.0;
                self.emit_pitch_update();
            }
        }
    }

    /// Push-to-talk pressed
    pub fn key_down(&mut self) {
        let position = self.source.position();
        if let Some(event) = self.segmenter.key_down(position) {
            self.handle_segment(event);
        }
    }

    /// Push-to-talk released
    pub fn key_up(&mut self) {
        let position = self.source.position();
        if let Some(event) = self.segmenter.key_up(position) {
            self.handle_segment(event);
        }
    }

    /// Resolve a skill chosen without voice, e.g. from a hotkey
    pub fn cast_by_id(&mut self, id: &str) -> RecognitionOutcome {
        let element = self.pinned_element().map(str::to_string);
        let outcome = self.resolver.resolve(
            &Utterance::SkillId(id.to_string()),
            self.catalog.active(),
            self.context(),
            element.as_deref(),
        );

        self.events.push_back(VoiceEvent::Recognition {
            outcome: outcome.clone(),
            analysis: None,
        });
        outcome
    }

    /// Abandon the current utterance, any queued clip and the request in flight
    pub fn reset(&mut self) {
        self.segmenter.reset();
        self.queued = None;
        self.since_pitch_update = 0.0;

        if let Some(pending) = self.pending.take() {
            pending.task.abort();
            tracing::debug!("outstanding recognition request aborted");
        }
    }

    /// Take all queued events
    pub fn drain_events(&mut self) -> Vec<VoiceEvent> {
        self.events.drain(..).collect()
    }

    /// Take the oldest queued event
    pub fn poll_event(&mut self) -> Option<VoiceEvent> {
        self.events.pop_front()
    }

    /// Update the host's screen state
    pub const fn set_screen(&mut self, screen: ScreenState) {
        self.screen = screen;
    }

    /// Voice context derived from the current screen state
    #[must_use]
    pub const fn context(&self) -> GameContext {
        resolve_context(&self.screen)
    }

    /// Move the pitch boundaries, re-clamped to stay valid
    pub fn set_pitch_boundaries(&mut self, low_max: f32, high_min: f32) {
        self.settings.boundaries.set(low_max, high_min);
        tracing::debug!(
            low_max = self.settings.boundaries.low_max(),
            high_min = self.settings.boundaries.high_min(),
            "pitch boundaries updated"
        );
    }

    pub fn set_element_map(&mut self, elements: ElementMap) {
        self.settings.elements = elements;
    }

    /// Force one element for every cast, or `None` to follow pitch again
    pub fn pin_element(&mut self, element: Option<String>) {
        self.settings.pinned_element = element.filter(|e| !e.trim().is_empty());
    }

    pub const fn set_language(&mut self, language: Language) {
        self.settings.language = language;
        self.resolver.set_language(language);
    }

    /// Replace all settings at once
    pub fn apply_settings(&mut self, settings: VoiceSettings) {
        self.resolver.set_language(settings.language);
        self.settings = settings;
    }

    /// Restrict recognition to the given skill ids
    pub fn set_active_skills<I, T>(&mut self, ids: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.catalog.set_active(ids);
    }

    #[must_use]
    pub const fn settings(&self) -> &VoiceSettings {
        &self.settings
    }

    #[must_use]
    pub const fn catalog(&self) -> &SkillCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn state(&self) -> SegmentationState {
        self.segmenter.state()
    }

    /// True while a recognition request is outstanding
    #[must_use]
    pub const fn is_processing(&self) -> bool {
        self.pending.is_some()
    }

    /// True when a clip is waiting behind the request in flight
    #[must_use]
    pub const fn has_queued(&self) -> bool {
        self.queued.is_some()
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    fn handle_segment(&mut self, event: SegmentEvent) {
        match event {
            SegmentEvent::Started { .. } => {
                self.since_pitch_update = 0.0;
                self.events.push_back(VoiceEvent::RecordingStarted);
            }
            SegmentEvent::Discarded { duration } => {
                self.events.push_back(VoiceEvent::SegmentDiscarded { duration });
            }
            SegmentEvent::Closed(span) => {
                let samples = self.source.read_span(span.start, span.end);
                self.segmenter.finish();

                if samples.is_empty() {
                    tracing::warn!(start = span.start, end = span.end, "closed span no longer buffered");
                    self.events.push_back(VoiceEvent::SegmentDiscarded { duration: 0.0 });
                    return;
                }

                if (samples.len() as u64) < span.len() {
                    tracing::warn!(
                        wanted = span.len(),
                        read = samples.len(),
                        "segment start already overwritten; using the buffered part"
                    );
                }

                let clip = SampleBuffer::new(samples, self.source.sample_rate()).trim_silence(TRIM_LEVEL);
                match self.prepare(&clip) {
                    Ok(prepared) => self.submit(prepared),
                    Err(e) => {
                        tracing::error!(error = %e, "failed to encode utterance");
                        self.events.push_back(VoiceEvent::Recognition {
                            outcome: RecognitionOutcome::failed(e.to_string()),
                            analysis: None,
                        });
                    }
                }
            }
        }
    }

    fn prepare(&self, clip: &SampleBuffer) -> Result<PreparedClip> {
        let analysis = self.analyzer.analyze(clip, &self.settings.boundaries);
        let wav = samples_to_wav(clip.samples(), clip.sample_rate())?;
        Ok(PreparedClip { wav, analysis })
    }

    fn submit(&mut self, prepared: PreparedClip) {
        if self.pending.is_none() {
            self.dispatch(prepared);
            return;
        }

        match self.policy {
            InFlightPolicy::Drop => {
                tracing::debug!("request in flight, utterance dropped");
                self.events.push_back(VoiceEvent::SegmentDropped);
            }
            InFlightPolicy::QueueLatest => {
                if self.queued.replace(prepared).is_some() {
                    tracing::debug!("queued utterance replaced by a newer one");
                    self.events.push_back(VoiceEvent::SegmentDropped);
                }
            }
        }
    }

    fn dispatch(&mut self, prepared: PreparedClip) {
        let context = self.context();
        let language = self.settings.language;
        let element = self.element_for(prepared.analysis.dominant);

        let request = TranscriptionRequest {
            audio: prepared.wav,
            language: language.code().to_string(),
            skills: self.catalog.request_keywords(language),
            context: context.wire_name().to_string(),
            context_keywords: keyword_hints(context, language)
                .into_iter()
                .map(str::to_string)
                .collect(),
        };

        tracing::debug!(
            audio_bytes = request.audio.len(),
            context = %context,
            dominant = %prepared.analysis.dominant,
            "dispatching recognition request"
        );

        let (tx, rx) = oneshot::channel();
        let transcriber = Arc::clone(&self.transcriber);
        let task = self.runtime.spawn(async move {
            let result = transcriber.recognize(request).await;
            // Receiver is gone after a reset
            let _ = tx.send(result);
        });

        self.pending = Some(PendingRequest {
            rx,
            task,
            analysis: prepared.analysis,
            element,
        });
    }

    fn poll_pending(&mut self) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };

        let result = match pending.rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Closed) => Err(crate::Error::Transcription(
                "recognition task ended without a result".to_string(),
            )),
        };

        let Some(pending) = self.pending.take() else {
            return;
        };

        let outcome = match result {
            Ok(reply) => self.resolver.resolve(
                &Utterance::Transcript(reply),
                self.catalog.active(),
                self.context(),
                Some(&pending.element),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "recognition failed");
                RecognitionOutcome::failed(e.to_string())
            }
        };

        self.events.push_back(VoiceEvent::Recognition {
            outcome,
            analysis: Some(pending.analysis),
        });

        if let Some(next) = self.queued.take() {
            self.dispatch(next);
        }
    }

    fn emit_pitch_update(&mut self) {
        let frame = self.source.latest(FRAME_SIZE);
        let Some(frequency) = self.analyzer.detect_realtime(&frame, self.source.sample_rate()) else {
            return;
        };

        let category = classify(frequency, &self.settings.boundaries);
        self.events.push_back(VoiceEvent::PitchUpdate {
            frequency,
            category,
            element: self.element_for(category),
            gauge: gauge_position(frequency),
        });
    }

    fn pinned_element(&self) -> Option<&str> {
        self.settings
            .pinned_element
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    fn element_for(&self, category: PitchCategory) -> String {
        self.pinned_element()
            .unwrap_or_else(|| self.settings.elements.element_for(category))
            .to_string()
    }
}

impl<S: AudioSource> Drop for VoiceCommandOrchestrator<S> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
        }
    }
}
