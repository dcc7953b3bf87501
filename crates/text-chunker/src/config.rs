use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Longest message the platform accepts.
pub const DEFAULT_MAX_LEN: usize = 2000;

/// Renders as an empty line but is not whitespace, so the platform accepts it.
pub const DEFAULT_PLACEHOLDER: &str = "_ _";

/// Delimiter that opens and closes an atomic block.
pub const DEFAULT_FENCE: &str = "```";

/// Configuration for splitting text into segments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Maximum segment length in characters (hard limit)
    pub max_len: usize,

    /// Text written into segments that would otherwise be empty
    pub placeholder: String,

    /// Delimiter toggling atomic-block mode
    pub fence: String,

    /// How units are packed into segments
    pub policy: PackingPolicy,

    /// Lower bound for the number of segments a text is spread over
    pub min_slots: usize,

    /// Segments added on top of what the text needs, so it can grow on edit
    pub reserve_slots: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_MAX_LEN,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            fence: DEFAULT_FENCE.to_string(),
            policy: PackingPolicy::BottomWeighted,
            min_slots: 4,
            reserve_slots: 2,
        }
    }
}

impl SplitterConfig {
    #[must_use]
    pub fn with_policy(mut self, policy: PackingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_len == 0 {
            return Err(ChunkerError::invalid_config("max_len must be > 0"));
        }

        if self.placeholder.trim().is_empty() {
            return Err(ChunkerError::invalid_config(
                "placeholder must contain a non-whitespace character",
            ));
        }

        let placeholder_len = self.placeholder.chars().count();
        if placeholder_len > self.max_len {
            return Err(ChunkerError::invalid_config(format!(
                "placeholder ({placeholder_len} chars) cannot exceed max_len ({})",
                self.max_len
            )));
        }

        if self.fence.is_empty() {
            return Err(ChunkerError::invalid_config("fence must not be empty"));
        }

        Ok(())
    }
}

/// Strategy for allocating units to segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackingPolicy {
    /// Hold units back until the remaining units would no longer cover the
    /// remaining segments, so trailing segments are never empty.
    /// Keeps short text next to whatever follows the last segment.
    #[default]
    BottomWeighted,

    /// Fill each segment until the next unit overflows it.
    TopGreedy,
}
