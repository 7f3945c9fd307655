//! Pitch categories, element mapping and gauge math

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lowest frequency a boundary may take
pub const MIN_BOUNDARY_HZ: f32 = 50.0;

/// Highest frequency a boundary may take
pub const MAX_BOUNDARY_HZ: f32 = 1000.0;

/// Minimum gap kept between the two boundaries
const MIN_BOUNDARY_GAP_HZ: f32 = 10.0;

/// Display range of the pitch gauge
pub const GAUGE_MIN_HZ: f32 = 50.0;
pub const GAUGE_MAX_HZ: f32 = 1000.0;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Discrete pitch band of a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PitchCategory {
    Low,
    Medium,
    High,
}

impl PitchCategory {
    /// All categories, lowest first
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Position in [`ALL`](Self::ALL)
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }
}

impl fmt::Display for PitchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// Two boundary frequencies splitting the Low/Medium/High bands
///
/// Invariant: `50 <= low_max < high_min <= 1000`. Fields are private so the
/// invariant is only ever changed through the clamping setters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBoundaries", into = "RawBoundaries")]
pub struct PitchBoundaries {
    low_max: f32,
    high_min: f32,
}

#[derive(Serialize, Deserialize)]
struct RawBoundaries {
    low_max: f32,
    high_min: f32,
}

impl From<RawBoundaries> for PitchBoundaries {
    fn from(raw: RawBoundaries) -> Self {
        Self::new(raw.low_max, raw.high_min)
    }
}

impl From<PitchBoundaries> for RawBoundaries {
    fn from(b: PitchBoundaries) -> Self {
        Self {
            low_max: b.low_max,
            high_min: b.high_min,
        }
    }
}

impl Default for PitchBoundaries {
    /// C3 and C4
    fn default() -> Self {
        Self {
            low_max: 130.81,
            high_min: 261.63,
        }
    }
}

impl PitchBoundaries {
    /// Create boundaries, clamping both values into the valid range
    #[must_use]
    pub fn new(low_max: f32, high_min: f32) -> Self {
        let mut bounds = Self::default();
        bounds.set(low_max, high_min);
        bounds
    }

    /// Top of the Low band
    #[must_use]
    pub const fn low_max(&self) -> f32 {
        self.low_max
    }

    /// Bottom of the High band
    #[must_use]
    pub const fn high_min(&self) -> f32 {
        self.high_min
    }

    /// Set both boundaries at once
    pub fn set(&mut self, low_max: f32, high_min: f32) {
        let low_max = sanitize(low_max, MIN_BOUNDARY_HZ);
        let high_min = sanitize(high_min, MAX_BOUNDARY_HZ);

        self.low_max = low_max.clamp(MIN_BOUNDARY_HZ, MAX_BOUNDARY_HZ - MIN_BOUNDARY_GAP_HZ);
        self.high_min = high_min.clamp(self.low_max + MIN_BOUNDARY_GAP_HZ, MAX_BOUNDARY_HZ);
    }

    /// Move the low boundary, keeping it below the high one
    pub fn set_low_max(&mut self, low_max: f32) {
        let low_max = sanitize(low_max, self.low_max);
        self.low_max = low_max.clamp(MIN_BOUNDARY_HZ, self.high_min - MIN_BOUNDARY_GAP_HZ);
    }

    /// Move the high boundary, keeping it above the low one
    pub fn set_high_min(&mut self, high_min: f32) {
        let high_min = sanitize(high_min, self.high_min);
        self.high_min = high_min.clamp(self.low_max + MIN_BOUNDARY_GAP_HZ, MAX_BOUNDARY_HZ);
    }

    /// Gauge positions of the two boundaries
    #[must_use]
    pub fn marker_positions(&self) -> (f32, f32) {
        (gauge_position(self.low_max), gauge_position(self.high_min))
    }
}

fn sanitize(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

/// Classify a frequency into a pitch band
///
/// Non-positive frequencies (no detected pitch) classify as Medium.
#[must_use]
pub fn classify(frequency: f32, bounds: &PitchBoundaries) -> PitchCategory {
    if frequency.is_nan() || frequency <= 0.0 {
        PitchCategory::Medium
    } else if frequency < bounds.low_max {
        PitchCategory::Low
    } else if frequency < bounds.high_min {
        PitchCategory::Medium
    } else {
        PitchCategory::High
    }
}

/// Map a frequency onto `[0, 1]` on a log scale over 50-1000 Hz
#[must_use]
pub fn gauge_position(frequency: f32) -> f32 {
    let (log_min, log_max) = gauge_log_bounds();
    let log_freq = frequency.clamp(GAUGE_MIN_HZ, GAUGE_MAX_HZ).ln();
    (log_freq - log_min) / (log_max - log_min)
}

/// Inverse of [`gauge_position`]
#[must_use]
pub fn gauge_frequency(position: f32) -> f32 {
    let (log_min, log_max) = gauge_log_bounds();
    (log_min + position * (log_max - log_min)).exp()
}

fn gauge_log_bounds() -> (f32, f32) {
    (GAUGE_MIN_HZ.ln(), GAUGE_MAX_HZ.ln())
}

/// Note name with octave, e.g. `A4` for 440 Hz
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn note_name(frequency: f32) -> Option<String> {
    if frequency.is_nan() || frequency <= 0.0 || frequency.is_infinite() {
        return None;
    }

    let note = (57.0 + 12.0 * (frequency / 440.0).log2()).round();
    if note < 0.0 {
        return None;
    }

    let note = note as usize;
    Some(format!("{}{}", NOTE_NAMES[note % 12], note / 12))
}

/// Element name assigned to each pitch category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementMap {
    pub low: String,
    pub medium: String,
    pub high: String,
}

impl Default for ElementMap {
    fn default() -> Self {
        Self {
            low: "Fire".to_string(),
            medium: "Ice".to_string(),
            high: "Electric".to_string(),
        }
    }
}

impl ElementMap {
    /// Element for a category, falling back to the default when unset
    #[must_use]
    pub fn element_for(&self, category: PitchCategory) -> &str {
        let (value, fallback) = match category {
            PitchCategory::Low => (&self.low, "Fire"),
            PitchCategory::Medium => (&self.medium, "Ice"),
            PitchCategory::High => (&self.high, "Electric"),
        };

        let trimmed = value.trim();
        if trimmed.is_empty() { fallback } else { trimmed }
    }
}
