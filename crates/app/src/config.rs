//! Run configuration read from the environment

use nib_config::{ConfigError, StrokeMode, ToolSettings};

/// Options for one run of the replay driver
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppConfig {
    /// Only replay this mode (`NIB_STROKE_MODE`); both modes when unset
    pub mode: Option<StrokeMode>,
    /// Verbose logging (`NIB_DEBUG`)
    pub debug: bool,
    /// Tool settings as JSON (`NIB_SETTINGS`)
    pub settings_json: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let debug = var("NIB_DEBUG")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);
        Self {
            mode: var("NIB_STROKE_MODE").and_then(|v| StrokeMode::parse(&v)),
            debug,
            settings_json: var("NIB_SETTINGS").filter(|v| !v.trim().is_empty()),
        }
    }

    /// Modes to replay, in order
    pub fn modes(&self) -> Vec<StrokeMode> {
        match self.mode {
            Some(mode) => vec![mode],
            None => vec![StrokeMode::Line, StrokeMode::Calligraphic],
        }
    }

    /// Base tool settings, before the mode is applied
    pub fn tool_settings(&self) -> Result<ToolSettings, ConfigError> {
        match &self.settings_json {
            Some(json) => ToolSettings::from_json(json),
            None => Ok(ToolSettings::default()),
        }
    }
}
