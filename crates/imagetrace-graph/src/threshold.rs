use imagetrace_core::{GraphConfig, ImageTraceError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum score at which two images count as connected.
///
/// Always within `[Threshold::MIN, Threshold::MAX]`. The UI moves it in
/// `Threshold::STEP` increments; `snapped` maps arbitrary input onto that grid.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Threshold(f64);

impl Threshold {
    pub const MIN: f64 = 0.1;
    pub const MAX: f64 = 1.0;
    pub const STEP: f64 = 0.05;

    /// Steps of `STEP` per unit
    const STEPS_PER_UNIT: f64 = 20.0;

    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ImageTraceError::InvalidThreshold(value))
        }
    }

    /// Clamp into range and round to the nearest grid step. NaN maps to the minimum.
    pub fn snapped(value: f64) -> Self {
        let clamped = if value.is_nan() {
            Self::MIN
        } else {
            value.clamp(Self::MIN, Self::MAX)
        };
        // grid values must compare equal to the preset literals
        let steps = (clamped * Self::STEPS_PER_UNIT).round();
        Self((steps * 5.0) / 100.0)
    }

    pub fn from_config(config: &GraphConfig) -> Result<Self> {
        Self::new(config.default_threshold)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Inclusive: a score equal to the threshold qualifies
    pub fn admits(self, score: f64) -> bool {
        score >= self.0
    }

    /// Preset whose value equals this threshold, if any
    pub fn preset(self) -> Option<ThresholdPreset> {
        ThresholdPreset::ALL
            .into_iter()
            .find(|preset| preset.value() == self.0)
    }
}

impl Default for Threshold {
    fn default() -> Self {
        ThresholdPreset::Medium.threshold()
    }
}

impl TryFrom<f64> for Threshold {
    type Error = ImageTraceError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Threshold> for f64 {
    fn from(threshold: Threshold) -> Self {
        threshold.0
    }
}

impl From<ThresholdPreset> for Threshold {
    fn from(preset: ThresholdPreset) -> Self {
        preset.threshold()
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Named thresholds offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThresholdPreset {
    Loose,
    Medium,
    Strict,
    VeryStrict,
}

impl ThresholdPreset {
    pub const ALL: [ThresholdPreset; 4] = [
        ThresholdPreset::Loose,
        ThresholdPreset::Medium,
        ThresholdPreset::Strict,
        ThresholdPreset::VeryStrict,
    ];

    pub fn value(self) -> f64 {
        match self {
            ThresholdPreset::Loose => 0.1,
            ThresholdPreset::Medium => 0.3,
            ThresholdPreset::Strict => 0.5,
            ThresholdPreset::VeryStrict => 0.7,
        }
    }

    pub fn threshold(self) -> Threshold {
        Threshold(self.value())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThresholdPreset::Loose => "loose",
            ThresholdPreset::Medium => "medium",
            ThresholdPreset::Strict => "strict",
            ThresholdPreset::VeryStrict => "very-strict",
        }
    }
}

impl fmt::Display for ThresholdPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThresholdPreset {
    type Err = ImageTraceError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        ThresholdPreset::ALL
            .into_iter()
            .find(|preset| preset.as_str() == normalized)
            .ok_or_else(|| ImageTraceError::UnknownPreset(s.to_string()))
    }
}
