//! Voice processing module
//!
//! Handles audio capture, utterance segmentation and transcription requests.

mod buffer;
mod capture;
mod segmenter;
mod stt;

pub use buffer::{AudioSource, CaptureRing, SampleBuffer, TRIM_LEVEL};
pub use capture::{AudioCapture, SAMPLE_RATE, downmix, read_wav, samples_to_wav};
pub use segmenter::{
    SegmentEvent, SegmentMode, SegmentationState, SegmenterConfig, Span, VoiceSegmenter,
};
pub use stt::{
    Candidate, DEFAULT_TIMEOUT, Transcriber, TranscriptionReply, TranscriptionRequest,
    VoiceServerClient,
};
