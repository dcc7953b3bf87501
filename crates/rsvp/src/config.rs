use reactrack_protocol::ReactionMarker;
use reactrack_text_chunker::{PackingPolicy, SplitterConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DAY_SECS: u64 = 24 * 60 * 60;

/// Settings for the sign-up sheet consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsvpConfig {
    /// Reaction that puts a user on the sheet
    pub signup_marker: ReactionMarker,
    /// Lifetime of a new sheet
    pub default_ttl_secs: u64,
    /// One unit of `extend`
    pub extension_unit_secs: u64,
    pub splitter: SplitterConfig,
}

impl Default for RsvpConfig {
    fn default() -> Self {
        Self {
            signup_marker: ReactionMarker::identified("tempest", Some(556_941_054_277_058_560)),
            default_ttl_secs: 3 * DAY_SECS,
            extension_unit_secs: DAY_SECS,
            splitter: SplitterConfig::default().with_policy(PackingPolicy::TopGreedy),
        }
    }
}

impl RsvpConfig {
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// `qty` extension units, saturating.
    #[must_use]
    pub fn extension(&self, qty: u32) -> Duration {
        Duration::from_secs(self.extension_unit_secs.saturating_mul(u64::from(qty)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = RsvpConfig::default();
        assert_eq!(config.default_ttl(), Duration::from_secs(3 * DAY_SECS));
        assert_eq!(config.extension(2), Duration::from_secs(2 * DAY_SECS));
        assert_eq!(config.splitter.policy, PackingPolicy::TopGreedy);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: RsvpConfig = serde_json::from_str(
            r#"{"signup_marker": {"kind": "symbolic", "text": "✅"}, "extension_unit_secs": 60}"#,
        )
        .expect("config");
        assert_eq!(config.signup_marker, ReactionMarker::symbolic("✅"));
        assert_eq!(config.extension(3), Duration::from_secs(180));
        assert_eq!(config.default_ttl_secs, 3 * DAY_SECS);
    }
}
