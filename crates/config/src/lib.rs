//! Shared configuration for nib
//!
//! This crate is the single source of truth for the calligraphy tool
//! settings (the scalars a preferences store persists between sessions) and
//! for the tuning constants shared by the stroke and scene crates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fit tolerance for line mode, in screen pixels
pub const TOLERANCE_LINE: f64 = 1.0;

/// Fit tolerance for calligraphic mode, in screen pixels (looser than line mode)
pub const TOLERANCE_CALLIGRAPHIC: f64 = 3.0;

/// Size of the sample window collected before a fit pass is forced
pub const SAMPLING_SIZE: usize = 16;

/// Maximum number of cubic segments produced by one recursive fit
pub const MAX_BEZIERS: usize = 8;

/// Interval of the sampling timer in timer-driven mode
pub const SAMPLE_TIMEOUT_MS: u64 = 10;

/// Maximum update/modified iterations before an update pass is aborted
pub const MAX_UPDATE_ITERATIONS: usize = 16;

/// Angle nudge step for the arrow keys, in degrees
pub const ANGLE_STEP: f64 = 5.0;

/// Width nudge step for the arrow keys
pub const WIDTH_STEP: f64 = 0.01;

const DEFAULT_MASS: f64 = 0.3;
const DEFAULT_DRAG: f64 = 1.0;
const DEFAULT_ANGLE: f64 = 30.0;
const DEFAULT_WIDTH: f64 = 0.2;
const DEFAULT_THINNING: f64 = 0.1;
const DEFAULT_FLATNESS: f64 = 0.9;

/// Errors produced while reading or writing tool settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting key: {0}")]
    UnknownKey(String),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("Failed to (de)serialize settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// How the tool turns the pen trajectory into geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeMode {
    /// Thin centre-line path fitted one cubic at a time
    Line,
    /// Filled outline traced by both edges of a wide nib
    #[default]
    Calligraphic,
}

impl StrokeMode {
    /// Parse a mode name as written in preferences or the environment
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "line" => Some(Self::Line),
            "calligraphic" | "calligraphy" => Some(Self::Calligraphic),
            _ => None,
        }
    }

    /// Named tolerance constant for this mode, in screen pixels
    pub fn tolerance(self) -> f64 {
        match self {
            Self::Line => TOLERANCE_LINE,
            Self::Calligraphic => TOLERANCE_CALLIGRAPHIC,
        }
    }
}

/// Persisted calligraphy tool settings
///
/// All scalars live in the user-facing range; the pen dynamics remap them to
/// physical ranges when they are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Pen mass, 0..1
    pub mass: f64,
    /// Drag (friction), 0..1
    pub drag: f64,
    /// Fixed nib angle in degrees, -90..90
    pub angle: f64,
    /// Nominal nib width, 0..1 of the visible area
    pub width: f64,
    /// How much velocity thins the stroke, -1..1
    pub thinning: f64,
    /// 0 = nib follows the motion, 1 = nib keeps its fixed angle
    pub flatness: f64,
    /// Capture mode
    pub mode: StrokeMode,
    /// Sample the pointer from a periodic timer instead of motion events
    pub use_timer: bool,
    /// Sampling period for timer mode and move decimation
    pub sample_interval_ms: u64,
    /// Drop motion events arriving faster than `sample_interval_ms`
    pub decimate_moves: bool,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            mass: DEFAULT_MASS,
            drag: DEFAULT_DRAG,
            angle: DEFAULT_ANGLE,
            width: DEFAULT_WIDTH,
            thinning: DEFAULT_THINNING,
            flatness: DEFAULT_FLATNESS,
            mode: StrokeMode::default(),
            use_timer: false,
            sample_interval_ms: SAMPLE_TIMEOUT_MS,
            decimate_moves: false,
        }
    }
}

impl ToolSettings {
    /// Settings for the given capture mode with every scalar at its default
    pub fn with_mode(mode: StrokeMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Apply one preference entry
    ///
    /// `value` of `None` restores the key's default. Numeric values are
    /// clamped to the key's valid range.
    pub fn set(&mut self, key: &str, value: Option<&str>) -> Result<(), ConfigError> {
        let number = |default: f64| -> Result<f64, ConfigError> {
            match value {
                None => Ok(default),
                Some(raw) => raw.trim().parse::<f64>().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: raw.to_string(),
                }),
            }
        };

        match key {
            "mass" => self.mass = number(DEFAULT_MASS)?.clamp(0.0, 1.0),
            "drag" => self.drag = number(DEFAULT_DRAG)?.clamp(0.0, 1.0),
            "angle" => self.angle = number(DEFAULT_ANGLE)?.clamp(-90.0, 90.0),
            "width" => self.width = number(DEFAULT_WIDTH)?.clamp(0.0, 1.0),
            "thinning" => self.thinning = number(DEFAULT_THINNING)?.clamp(-1.0, 1.0),
            "flatness" => self.flatness = number(DEFAULT_FLATNESS)?.clamp(0.0, 1.0),
            "mode" => {
                self.mode = match value {
                    None => StrokeMode::default(),
                    Some(raw) => StrokeMode::parse(raw).ok_or_else(|| ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: raw.to_string(),
                    })?,
                }
            }
            "usetimer" => {
                self.use_timer = match value {
                    None => false,
                    Some(raw) => matches!(raw.trim(), "1" | "true" | "yes"),
                }
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Rotate the fixed nib angle by `delta` degrees, clamped to -90..90
    pub fn nudge_angle(&mut self, delta: f64) {
        self.angle = (self.angle + delta).clamp(-90.0, 90.0);
    }

    /// Change the nib width by `delta`, clamped to 0..1
    pub fn nudge_width(&mut self, delta: f64) {
        self.width = (self.width + delta).clamp(0.0, 1.0);
    }

    /// Load settings from their persisted JSON form
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize settings for persistence
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Scene graph tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneSettings {
    /// Bound on update/modified iterations per pass
    pub max_update_iterations: usize,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            max_update_iterations: MAX_UPDATE_ITERATIONS,
        }
    }
}
