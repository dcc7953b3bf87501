use crate::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TTL_SECS: u64 = 36 * 60 * 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 120;

pub const ENV_DEFAULT_TTL_SECS: &str = "REACTRACK_DEFAULT_TTL_SECS";
pub const ENV_SWEEP_INTERVAL_SECS: &str = "REACTRACK_SWEEP_INTERVAL_SECS";
pub const ENV_SNAPSHOT_PATH: &str = "REACTRACK_SNAPSHOT_PATH";

/// Runtime settings for the tracked-item registry and its background sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Lifetime of an item whose consumer has no override
    pub default_ttl_secs: u64,
    /// Pause between two expiry sweeps
    pub sweep_interval_secs: u64,
    /// Per-consumer lifetime overrides
    pub consumer_ttl_secs: HashMap<String, u64>,
    /// Where the registry snapshot lives; `None` disables persistence
    pub snapshot_path: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: DEFAULT_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            consumer_ttl_secs: HashMap::new(),
            snapshot_path: None,
        }
    }
}

impl TrackerConfig {
    /// File (if any) first, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON or TOML config file. JSON is tried first.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::parse(&bytes).map_err(|err| {
            TrackerError::Config(format!("{}: {err}", path.display()))
        })
    }

    fn parse(bytes: &[u8]) -> std::result::Result<Self, String> {
        match serde_json::from_slice(bytes) {
            Ok(config) => Ok(config),
            Err(json_err) => {
                let utf8 = std::str::from_utf8(bytes).map_err(|err| format!("{json_err}; {err}"))?;
                toml::from_str(utf8).map_err(|toml_err| {
                    format!("not valid JSON ({json_err}) or TOML ({toml_err})")
                })
            }
        }
    }

    /// Applies `REACTRACK_*` overrides. Empty or unparsable values are ignored.
    pub fn apply_env(&mut self) {
        if let Some(secs) = secs_from_env(ENV_DEFAULT_TTL_SECS) {
            self.default_ttl_secs = secs;
        }
        if let Some(secs) = secs_from_env(ENV_SWEEP_INTERVAL_SECS) {
            self.sweep_interval_secs = secs;
        }
        if let Some(path) = std::env::var_os(ENV_SNAPSHOT_PATH).filter(|v| !v.is_empty()) {
            self.snapshot_path = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval_secs == 0 {
            return Err(TrackerError::Config(
                "sweep_interval_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// The consumer's override, or the default lifetime.
    #[must_use]
    pub fn ttl_for(&self, consumer_id: &str) -> Duration {
        self.consumer_ttl_secs
            .get(consumer_id)
            .map_or_else(|| self.default_ttl(), |secs| Duration::from_secs(*secs))
    }

    #[must_use]
    pub fn with_consumer_ttl(mut self, consumer_id: impl Into<String>, ttl: Duration) -> Self {
        self.consumer_ttl_secs
            .insert(consumer_id.into(), ttl.as_secs());
        self
    }
}

fn secs_from_env(var: &str) -> Option<u64> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.default_ttl(), Duration::from_secs(36 * 3600));
        assert_eq!(config.sweep_interval(), Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_consumer_override() {
        let config = TrackerConfig::default().with_consumer_ttl("rsvp", Duration::from_secs(60));
        assert_eq!(config.ttl_for("rsvp"), Duration::from_secs(60));
        assert_eq!(config.ttl_for("poll"), config.default_ttl());
    }

    #[test]
    fn test_parse_json_and_toml() {
        let json = br#"{"default_ttl_secs": 10, "consumer_ttl_secs": {"rsvp": 5}}"#;
        let config = TrackerConfig::parse(json).expect("json");
        assert_eq!(config.default_ttl_secs, 10);
        assert_eq!(config.ttl_for("rsvp"), Duration::from_secs(5));
        assert_eq!(config.sweep_interval_secs, DEFAULT_SWEEP_INTERVAL_SECS);

        let toml = b"sweep_interval_secs = 7\nsnapshot_path = \"state.json\"\n\n[consumer_ttl_secs]\npoll = 3\n";
        let config = TrackerConfig::parse(toml).expect("toml");
        assert_eq!(config.sweep_interval_secs, 7);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("state.json")));
        assert_eq!(config.ttl_for("poll"), Duration::from_secs(3));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = TrackerConfig::parse(br#"{"sweep_every": 3}"#).expect_err("unknown key");
        assert!(err.contains("TOML"), "unexpected error: {err}");
    }

    #[test]
    fn test_zero_interval_is_invalid() {
        let config = TrackerConfig {
            sweep_interval_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(TrackerError::Config(_))));
    }
}
