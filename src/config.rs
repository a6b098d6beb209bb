//! Engine configuration.
//!
//! Tunables for the command layer and the effect scheduler, loaded from
//! `$XDG_CONFIG_HOME/eclight/config.toml` when present. Every field has a
//! default, so a missing or partial file is fine.
//!
//! ```toml
//! command_timeout_ms = 2000
//! frame_hz = 20
//! push_hz = 5
//!
//! [breaker]
//! threshold = 3
//! cooldown_ms = 5000
//! max_cooldown_ms = 60000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Circuit breaker tuning.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub threshold: u32,
    pub cooldown_ms: u64,
    pub max_cooldown_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            threshold: 3,
            cooldown_ms: 5_000,
            max_cooldown_ms: 60_000,
        }
    }
}

impl BreakerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn max_cooldown(&self) -> Duration {
        Duration::from_millis(self.max_cooldown_ms)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Wall-clock timeout per external command.
    pub command_timeout_ms: u64,
    /// Timeout for detection probes (probes should answer fast).
    pub probe_timeout_ms: u64,
    /// Effect computation rate.
    pub frame_hz: u32,
    /// Maximum hardware push rate while an effect runs.
    pub push_hz: u32,
    /// Path or name of the ectool binary.
    pub ectool_path: String,
    /// EC debugfs io node for the direct register method.
    pub ec_io_path: String,
    pub breaker: BreakerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: 2_000,
            probe_timeout_ms: 2_000,
            frame_hz: 20,
            push_hz: 5,
            ectool_path: "ectool".to_string(),
            ec_io_path: "/sys/kernel/debug/ec/ec0/io".to_string(),
            breaker: BreakerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse from TOML string.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("parse TOML: {e}"))
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read {}: {e}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Load the config from the default location, falling back to defaults
    /// when the file does not exist.
    pub fn load_default() -> Result<Self, String> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_hz.clamp(1, 60) as f64)
    }

    pub fn push_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.push_hz.clamp(1, 60) as f64)
    }
}

/// Path to the default config TOML file.
pub fn default_config_path() -> PathBuf {
    dirs_path().join("config.toml")
}

fn dirs_path() -> PathBuf {
    if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(config).join("eclight")
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".config/eclight")
    } else {
        PathBuf::from("/tmp/eclight")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.command_timeout(), Duration::from_secs(2));
        assert_eq!(cfg.breaker.threshold, 3);
        assert_eq!(cfg.frame_interval(), Duration::from_millis(50));
        assert_eq!(cfg.push_interval(), Duration::from_millis(200));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = EngineConfig::from_toml("frame_hz = 30\n[breaker]\nthreshold = 5\n").unwrap();
        assert_eq!(cfg.frame_hz, 30);
        assert_eq!(cfg.breaker.threshold, 5);
        assert_eq!(cfg.breaker.cooldown_ms, 5_000);
        assert_eq!(cfg.ectool_path, "ectool");
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(EngineConfig::from_toml("frames_per_sec = 30\n").is_err());
    }

    #[test]
    fn test_rate_clamping() {
        let cfg = EngineConfig::from_toml("frame_hz = 500\npush_hz = 0\n").unwrap();
        assert_eq!(cfg.frame_interval(), Duration::from_secs_f64(1.0 / 60.0));
        assert_eq!(cfg.push_interval(), Duration::from_secs(1));
    }
}
