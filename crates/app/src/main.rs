//! nib - replay calligraphy gestures into a scene without a window
//!
//! Builds a document with one layer, draws a synthetic S-curve in each
//! configured stroke mode and prints what was committed as JSON.

mod config;
mod logging;
mod replay;

use nib_config::{ConfigError, SceneSettings};
use nib_scene::{SceneDocument, SceneError};
use stroke::Point;
use thiserror::Error;
use tracing::{error, info};

use config::AppConfig;
use replay::{ReplayError, replay, synthetic_gesture};

/// Move events in the synthetic gesture
const GESTURE_SAMPLES: usize = 64;

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Replay(#[from] ReplayError),
    #[error("Failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}

fn run(config: &AppConfig) -> Result<(), AppError> {
    let base = config.tool_settings()?;
    let mut document = SceneDocument::new(SceneSettings::default())?;

    for (i, mode) in config.modes().into_iter().enumerate() {
        let mut settings = base.clone();
        settings.mode = mode;
        let origin = Point::new(120.0, 200.0 + 250.0 * i as f64);
        let events = synthetic_gesture(origin, GESTURE_SAMPLES);

        let report = replay(&mut document, settings, &events)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    info!(
        "Document holds {} nodes after {} commits",
        document.graph().len(),
        document.history().len()
    );
    Ok(())
}

fn main() {
    let config = AppConfig::from_env();
    logging::init(config.debug);
    info!("Starting nib replay with {:?}", config.modes());

    if let Err(err) = run(&config) {
        error!("nib failed: {}", err);
        std::process::exit(1);
    }
}
