//! Runner configuration: optional JSON file, then environment overrides.

use std::path::Path;

use eyre::WrapErr;
use rewind_clock::ClockConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub clock: ClockConfig,
    /// Host ticks per second. Ticking continues while time is frozen.
    pub target_fps: f64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            clock: ClockConfig::default(),
            target_fps: 60.0,
        }
    }
}

impl RunnerConfig {
    /// `REWIND_CONFIG` file if set, then `REWIND_WINDOW_SECS` and
    /// `REWIND_TARGET_FPS`.
    pub fn load() -> eyre::Result<Self> {
        let mut config = match std::env::var("REWIND_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };

        if let Some(window) = env_f64("REWIND_WINDOW_SECS") {
            config.clock.rewind_window_secs = window;
        }
        if let Some(fps) = env_f64("REWIND_TARGET_FPS") {
            config.target_fps = fps;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> eyre::Result<()> {
        self.clock.validate()?;
        eyre::ensure!(
            self.target_fps.is_finite() && self.target_fps > 0.0,
            "target_fps must be positive, got {}",
            self.target_fps
        );
        Ok(())
    }

    fn from_file(path: &Path) -> eyre::Result<Self> {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .wrap_err_with(|| format!("parsing {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}
