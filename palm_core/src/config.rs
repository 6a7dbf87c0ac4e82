//! Tunable gesture parameters and the color palette.

use std::time::Duration;

use rgb::RGB8;
use serde::{Deserialize, Serialize};

use crate::error::GestureError;

// ════════════════════════════════════════════════════════════════════════════
// Defaults
// ════════════════════════════════════════════════════════════════════════════

pub const DEFAULT_FIST_THRESHOLD: f32      = 0.2;
pub const DEFAULT_LOCK_DEBOUNCE:  Duration = Duration::from_millis(500);
pub const DEFAULT_COLOR_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_COLOR_STEP:     f32      = 0.1;
pub const DEFAULT_RIGHT_ZONE:     usize    = 3;
pub const DEFAULT_LEFT_ZONE:      usize    = 4;

/// Red, green, blue, cyan, yellow, purple.
pub const DEFAULT_PALETTE: [RGB8; 6] = [
    RGB8 { r: 255, g: 0,   b: 0   },
    RGB8 { r: 0,   g: 255, b: 0   },
    RGB8 { r: 0,   g: 0,   b: 255 },
    RGB8 { r: 0,   g: 255, b: 255 },
    RGB8 { r: 255, g: 255, b: 0   },
    RGB8 { r: 128, g: 0,   b: 128 },
];

// ════════════════════════════════════════════════════════════════════════════
// GestureConfig
// ════════════════════════════════════════════════════════════════════════════

/// All gesture tunables.  Loaded from JSON with missing fields defaulted;
/// durations are written as seconds (`"lock_debounce": 0.5`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Fist distance below which the hand counts as clenched.
    pub fist_threshold: f32,
    /// Minimum interval between two lock toggles.
    #[serde(with = "secs")]
    pub lock_debounce:  Duration,
    /// Minimum interval between two color-zone switches.
    #[serde(with = "secs")]
    pub color_debounce: Duration,
    /// Half-width of the dead-band around `x = 0.5`.
    pub color_step:     f32,
    /// Palette index selected when the palm moves right of the dead-band.
    pub right_zone_color: usize,
    /// Palette index selected when the palm moves left of the dead-band.
    pub left_zone_color:  usize,
    pub palette:        Vec<RGB8>,
}

impl Default for GestureConfig {
    fn default() -> Self {
        GestureConfig {
            fist_threshold:   DEFAULT_FIST_THRESHOLD,
            lock_debounce:    DEFAULT_LOCK_DEBOUNCE,
            color_debounce:   DEFAULT_COLOR_DEBOUNCE,
            color_step:       DEFAULT_COLOR_STEP,
            right_zone_color: DEFAULT_RIGHT_ZONE,
            left_zone_color:  DEFAULT_LEFT_ZONE,
            palette:          DEFAULT_PALETTE.to_vec(),
        }
    }
}

impl GestureConfig {
    /// Check the invariants the state machine relies on: a non-empty palette,
    /// zone targets inside it, and finite non-negative thresholds.
    pub fn validate(&self) -> Result<(), GestureError> {
        if self.palette.is_empty() {
            return Err(GestureError::InvalidConfig("palette is empty".into()));
        }
        for (name, idx) in [
            ("right_zone_color", self.right_zone_color),
            ("left_zone_color",  self.left_zone_color),
        ] {
            if idx >= self.palette.len() {
                return Err(GestureError::InvalidConfig(format!(
                    "{} = {} is outside the {}-entry palette",
                    name, idx, self.palette.len()
                )));
            }
        }
        if !self.fist_threshold.is_finite() || self.fist_threshold <= 0.0 {
            return Err(GestureError::InvalidConfig(format!(
                "fist_threshold must be a positive number, got {}",
                self.fist_threshold
            )));
        }
        if !self.color_step.is_finite() || self.color_step <= 0.0 || self.color_step >= 0.5 {
            return Err(GestureError::InvalidConfig(format!(
                "color_step must be in (0, 0.5), got {}",
                self.color_step
            )));
        }
        Ok(())
    }

    /// Base color at `idx`, if the palette has one.
    pub fn color(&self, idx: usize) -> Option<RGB8> {
        self.palette.get(idx).copied()
    }
}

/// Serde adapter: `Duration` as fractional seconds.
mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let v = f64::deserialize(d)?;
        Duration::try_from_secs_f64(v).map_err(serde::de::Error::custom)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
