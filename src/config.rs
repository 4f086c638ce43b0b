//! TOML configuration for the EventSentry service.
//!
//! A layered model with compiled-in defaults, an environment variable
//! override for the config file path, and a standard filesystem location.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::state::DEFAULT_MAX_BODY_BYTES;
use crate::detect::Truncation;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "EVENTSENTRY_CONFIG";

/// System-wide config location.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/eventsentry/eventsentry.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve configuration from, in order:
    /// 1. The explicit `--config` path.
    /// 2. The path specified by the `EVENTSENTRY_CONFIG` environment variable.
    /// 3. `/etc/eventsentry/eventsentry.toml`, if it exists.
    /// 4. Compiled-in defaults.
    ///
    /// Runs before logging is set up, so a named file that cannot be loaded
    /// is an error rather than a warning nobody sees.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        Self::resolve_with(explicit, std::env::var(CONFIG_ENV).ok().as_deref())
    }

    fn resolve_with(explicit: Option<&Path>, env_path: Option<&str>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(env_path) = env_path {
            return Self::load(Path::new(env_path))
                .with_context(|| format!("{CONFIG_ENV} is set to {env_path}"));
        }
        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            return Self::load(system_path);
        }
        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        let t = self.detection.threshold;
        if !t.is_finite() || t < 0.0 {
            bail!("detection.threshold must be a finite non-negative number, got {t}");
        }
        if self.model.inference_timeout_ms == 0 {
            bail!("model.inference_timeout_ms must be positive");
        }
        if self.server.max_body_bytes == 0 {
            bail!("server.max_body_bytes must be positive");
        }
        if self.model.expected_sequence_length == Some(0) {
            bail!("model.expected_sequence_length must be positive when set");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address and port for the HTTP listener.
    pub bind: String,
    /// Largest accepted request body; log uploads can be large.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the JSON autoencoder artifact.
    pub path: PathBuf,
    /// Reject artifacts whose declared timesteps differ from this.
    pub expected_sequence_length: Option<usize>,
    /// Which end of an over-long sequence is dropped.
    pub truncation: Truncation,
    pub inference_timeout_ms: u64,
    /// Refuse to start instead of serving degraded when the artifact fails to load.
    pub require_on_startup: bool,
}

impl ModelConfig {
    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/lstm_autoencoder.json"),
            expected_sequence_length: None,
            truncation: Truncation::Post,
            inference_timeout_ms: 5000,
            require_on_startup: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Reconstruction errors strictly above this are anomalies.
    pub threshold: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self { threshold: 0.015 }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.server.bind, "0.0.0.0:5000");
        assert_eq!(cfg.server.max_body_bytes, 64 * 1024 * 1024);
        assert_eq!(cfg.model.path, PathBuf::from("models/lstm_autoencoder.json"));
        assert_eq!(cfg.model.expected_sequence_length, None);
        assert_eq!(cfg.model.truncation, Truncation::Post);
        assert_eq!(cfg.model.inference_timeout(), Duration::from_secs(5));
        assert!(!cfg.model.require_on_startup);
        assert_eq!(cfg.detection.threshold, 0.015);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, LogFormat::Text);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[server]
bind = "127.0.0.1:8080"
max_body_bytes = 1048576

[model]
path = "/opt/eventsentry/model.json"
expected_sequence_length = 6
truncation = "pre"
inference_timeout_ms = 250
require_on_startup = true

[detection]
threshold = 0.02

[logging]
level = "debug"
format = "json"
"#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
        assert_eq!(cfg.server.max_body_bytes, 1_048_576);
        assert_eq!(cfg.model.path, PathBuf::from("/opt/eventsentry/model.json"));
        assert_eq!(cfg.model.expected_sequence_length, Some(6));
        assert_eq!(cfg.model.truncation, Truncation::Pre);
        assert_eq!(cfg.model.inference_timeout_ms, 250);
        assert!(cfg.model.require_on_startup);
        assert_eq!(cfg.detection.threshold, 0.02);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let cfg: Config = toml::from_str("[detection]\nthreshold = 0.1\n").unwrap();
        assert_eq!(cfg.detection.threshold, 0.1);
        assert_eq!(cfg.server.bind, "0.0.0.0:5000");
        assert_eq!(cfg.model.inference_timeout_ms, 5000);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.detection.threshold = -1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.detection.threshold = f64::NAN;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.model.inference_timeout_ms = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.server.max_body_bytes = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.model.expected_sequence_length = Some(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind = \"127.0.0.1:9999\"").unwrap();
        let cfg = Config::resolve(Some(file.path())).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:9999");
    }

    #[test]
    fn test_unloadable_env_config_is_an_error() {
        let err = Config::resolve_with(None, Some("/nonexistent/typo.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("EVENTSENTRY_CONFIG"));
    }

    #[test]
    fn test_env_config_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[detection]\nthreshold = 0.5").unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let cfg = Config::resolve_with(None, Some(&path)).unwrap();
        assert_eq!(cfg.detection.threshold, 0.5);
    }

    #[test]
    fn test_explicit_path_wins_over_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind = \"127.0.0.1:7000\"").unwrap();
        let cfg = Config::resolve_with(Some(file.path()), Some("/nonexistent/typo.toml")).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:7000");
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        assert!(Config::resolve(Some(Path::new("/nonexistent/eventsentry.toml"))).is_err());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[detection]\nthreshold = -0.5").unwrap();
        assert!(Config::load(file.path()).is_err());
    }
}
