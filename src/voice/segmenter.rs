//! Utterance segmentation
//!
//! Turns a continuous capture stream into utterance spans, either bracketed
//! by a push-to-talk key or detected from signal level (VAD).

use serde::{Deserialize, Serialize};

/// How utterances are delimited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentMode {
    /// Key down opens, key up closes
    #[default]
    KeyTriggered,
    /// Level above the activation threshold opens, sustained silence closes
    Continuous,
}

/// Segmentation tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub mode: SegmentMode,
    /// RMS level that starts a VAD segment
    pub activation_threshold: f32,
    /// Seconds of silence (RMS below half the activation level) that close a VAD segment
    pub silence_timeout: f32,
    /// Segments shorter than this many seconds are discarded
    pub min_duration: f32,
    /// Segments are force-closed after this many seconds
    pub max_duration: f32,
    /// Seconds of audio kept before a VAD trigger
    pub pre_roll: f32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            mode: SegmentMode::default(),
            activation_threshold: 0.02,
            silence_timeout: 1.0,
            min_duration: 0.5,
            max_duration: 5.0,
            pre_roll: 1.0,
        }
    }
}

/// State of the segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentationState {
    /// Waiting for a key press or voice activity
    Idle,
    /// Capturing an utterance
    Recording,
    /// Span closed, waiting for the owner to extract it
    Finalizing,
}

/// Absolute stream positions `[start, end)` of one utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u64,
    pub end: u64,
}

impl Span {
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Transition reported by the segmenter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentEvent {
    /// Recording began; `start` includes any pre-roll
    Started { start: u64 },
    /// An utterance is ready for extraction
    Closed(Span),
    /// Recording ended too short to use
    Discarded { duration: f32 },
}

/// Segments utterances from level readings and key events
#[derive(Debug, Clone)]
pub struct VoiceSegmenter {
    config: SegmenterConfig,
    sample_rate: u32,
    capacity: usize,
    state: SegmentationState,
    start: u64,
    triggered_at: u64,
    silence: f32,
}

impl VoiceSegmenter {
    /// Create a segmenter for a stream at `sample_rate` retaining `capacity` samples
    #[must_use]
    pub fn new(config: SegmenterConfig, sample_rate: u32, capacity: usize) -> Self {
        tracing::debug!(mode = ?config.mode, sample_rate, capacity, "segmenter initialized");

        Self {
            config,
            sample_rate,
            capacity,
            state: SegmentationState::Idle,
            start: 0,
            triggered_at: 0,
            silence: 0.0,
        }
    }

    /// Push-to-talk pressed at stream position `position`
    pub fn key_down(&mut self, position: u64) -> Option<SegmentEvent> {
        if self.state != SegmentationState::Idle {
            return None;
        }
        Some(self.begin(position, position))
    }

    /// Push-to-talk released at stream position `position`
    pub fn key_up(&mut self, position: u64) -> Option<SegmentEvent> {
        if self.state != SegmentationState::Recording || self.config.mode != SegmentMode::KeyTriggered {
            return None;
        }
        Some(self.close(position))
    }

    /// Advance by `dt` seconds with the current `rms` level at `position`
    pub fn tick(&mut self, dt: f32, rms: f32, position: u64) -> Option<SegmentEvent> {
        match self.state {
            SegmentationState::Idle => {
                if self.config.mode == SegmentMode::Continuous && rms > self.config.activation_threshold {
                    let start = position.saturating_sub(self.pre_roll_samples());
                    tracing::trace!(rms, "voice activity detected");
                    return Some(self.begin(start, position));
                }
                None
            }
            SegmentationState::Recording => {
                if self.config.mode == SegmentMode::Continuous {
                    if rms < self.config.activation_threshold / 2.0 {
                        self.silence += dt;
                    } else {
                        self.silence = 0.0;
                    }

                    if self.silence >= self.config.silence_timeout {
                        tracing::trace!(silence = self.silence, "silence timeout");
                        return Some(self.close(position));
                    }
                }

                if self.seconds_since_trigger(position) >= self.config.max_duration {
                    tracing::debug!(max = self.config.max_duration, "segment reached max duration");
                    return Some(self.close(position));
                }
                None
            }
            SegmentationState::Finalizing => None,
        }
    }

    /// Acknowledge extraction of the closed span and return to Idle
    pub fn finish(&mut self) {
        if self.state == SegmentationState::Finalizing {
            self.state = SegmentationState::Idle;
        }
    }

    /// Return to Idle, abandoning any segment in progress
    pub fn reset(&mut self) {
        self.state = SegmentationState::Idle;
        self.silence = 0.0;
    }

    #[must_use]
    pub const fn state(&self) -> SegmentationState {
        self.state
    }

    #[must_use]
    pub const fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.state == SegmentationState::Recording
    }

    fn begin(&mut self, start: u64, triggered_at: u64) -> SegmentEvent {
        self.state = SegmentationState::Recording;
        self.start = start;
        self.triggered_at = triggered_at;
        self.silence = 0.0;

        tracing::debug!(start, "segment started");
        SegmentEvent::Started { start }
    }

    fn close(&mut self, end: u64) -> SegmentEvent {
        // VAD segments only count voiced time toward the minimum
        let mut duration = self.seconds_since_trigger(end);
        if self.config.mode == SegmentMode::Continuous {
            duration -= self.silence;
        }
        self.silence = 0.0;

        if duration < self.config.min_duration {
            self.state = SegmentationState::Idle;
            tracing::debug!(duration, min = self.config.min_duration, "segment discarded");
            return SegmentEvent::Discarded { duration };
        }

        self.state = SegmentationState::Finalizing;
        let span = Span {
            start: self.start,
            end,
        };
        tracing::debug!(start = span.start, end = span.end, duration, "segment closed");
        SegmentEvent::Closed(span)
    }

    /// Longest span the segmenter can close, pre-roll included
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn max_span_samples(&self) -> u64 {
        let recording = (self.config.max_duration.max(0.0) * self.sample_rate as f32).ceil() as u64;
        let pre_roll = match self.config.mode {
            SegmentMode::KeyTriggered => 0,
            SegmentMode::Continuous => self.pre_roll_samples(),
        };
        recording + pre_roll
    }

    /// Whether every span this segmenter closes is still fully buffered
    #[must_use]
    pub fn fits_capacity(&self) -> bool {
        self.max_span_samples() <= self.capacity as u64
    }

    #[allow(clippy::cast_precision_loss)]
    fn seconds_since_trigger(&self, position: u64) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        position.saturating_sub(self.triggered_at) as f32 / self.sample_rate as f32
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn pre_roll_samples(&self) -> u64 {
        let wanted = (self.config.pre_roll.max(0.0) * self.sample_rate as f32) as u64;
        wanted.min(self.capacity as u64)
    }
}
