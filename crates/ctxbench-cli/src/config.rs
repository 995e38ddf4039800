//! Configuration loading from TOML files.
//!
//! Lookup order:
//! 1. `$CTXBENCH_CONFIG` environment variable
//! 2. `~/.config/ctxbench/config.toml`
//! 3. Built-in defaults (everything is optional)

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use ctxbench_core::DEFAULT_TOLERANCE_PCT;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub compare: CompareConfig,
    pub backend: BackendConfig,
}

/// Per-step generation settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Output size cap passed to the backend per step.
    pub max_output_size: u64,
    pub temperature: f32,
}

/// Comparison/diagnostic settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Tolerance band (percentage points) between size reduction and
    /// prefill-latency reduction before the diagnostic calls the run
    /// mixed-signal.
    pub tolerance_pct: f64,
}

/// Backend adapter selection.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// "sim" or "http".
    pub kind: String,
    /// Simulated-backend profile: balanced, prefill-dominant, kv-reuse.
    pub profile: String,
    /// Base URL for the http backend.
    pub url: String,
    pub model: String,
}

// --- Defaults ---

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_output_size: 256,
            temperature: 0.7,
        }
    }
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            tolerance_pct: DEFAULT_TOLERANCE_PCT,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: "sim".into(),
            profile: "balanced".into(),
            url: "http://localhost:8000".into(),
            model: "default".into(),
        }
    }
}

/// Load config from disk. Returns defaults if no config file exists.
pub fn load_config() -> Result<Config> {
    let path = config_path();

    if let Some(p) = &path {
        if p.exists() {
            let content =
                std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            let config: Config =
                toml::from_str(&content).with_context(|| format!("parsing {}", p.display()))?;
            return Ok(config);
        }
    }

    Ok(Config::default())
}

/// Resolve the config file path.
fn config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CTXBENCH_CONFIG") {
        return Some(PathBuf::from(p));
    }

    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config").join("ctxbench").join("config.toml"))
}

/// Show the active config path (for `ctxbench config`).
pub fn show_config_path() -> String {
    match config_path() {
        Some(p) if p.exists() => format!("{} (loaded)", p.display()),
        Some(p) => format!("{} (not found, using defaults)", p.display()),
        None => "no config path resolved (using defaults)".into(),
    }
}
