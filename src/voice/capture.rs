//! Audio capture from microphone

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use super::buffer::CaptureRing;
use crate::{Error, Result};

/// Preferred capture sample rate
pub const SAMPLE_RATE: u32 = 44_100;

/// Captures audio from the default input device into a [`CaptureRing`]
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    ring: CaptureRing,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Open the default input device
    ///
    /// Prefers a mono stream at `sample_rate`; otherwise falls back to the
    /// device default and downmixes. The ring holds `ring_seconds` of audio at
    /// the rate actually negotiated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoMicrophone`] if there is no input device, or
    /// [`Error::Audio`] if its configuration cannot be read
    pub fn new(sample_rate: u32, ring_seconds: f32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(Error::NoMicrophone)?;

        let preferred = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            });

        let config = match preferred {
            Some(supported) => supported.with_sample_rate(SampleRate(sample_rate)).config(),
            None => device
                .default_input_config()
                .map_err(|e| Error::Audio(e.to_string()))?
                .config(),
        };

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "audio capture initialized"
        );

        let ring = CaptureRing::with_duration(config.sample_rate.0, ring_seconds);

        Ok(Self {
            device,
            config,
            ring,
            stream: None,
        })
    }

    /// Start capturing audio
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be built or started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let ring = self.ring.clone();
        let channels = usize::from(self.config.channels.max(1));

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if channels == 1 {
                        ring.push(data);
                    } else {
                        ring.push(&downmix(data, channels));
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Handle to the ring the stream writes into
    #[must_use]
    pub fn ring(&self) -> CaptureRing {
        self.ring.clone()
    }

    /// Check if currently capturing
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    /// Negotiated sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }
}

/// Average interleaved frames down to mono
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }

    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Convert f32 samples to WAV bytes for the transcription server
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            // Convert f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// Read a WAV file as mono f32 samples
///
/// Integer formats are scaled to `[-1, 1]`; multi-channel files are downmixed.
///
/// # Errors
///
/// Returns error if the file cannot be opened or decoded
#[allow(clippy::cast_precision_loss)]
pub fn read_wav(path: &std::path::Path) -> Result<super::SampleBuffer> {
    let mut reader = hound::WavReader::open(path).map_err(|e| Error::Audio(e.to_string()))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Audio(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Audio(e.to_string()))?
        }
    };

    let samples = downmix(&interleaved, usize::from(spec.channels));
    tracing::debug!(
        path = %path.display(),
        samples = samples.len(),
        sample_rate = spec.sample_rate,
        "wav loaded"
    );

    Ok(super::SampleBuffer::new(samples, spec.sample_rate))
}
