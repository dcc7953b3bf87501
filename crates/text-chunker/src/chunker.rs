use crate::config::{PackingPolicy, SplitterConfig};
use crate::error::{ChunkerError, Result};
use crate::strategy::Packer;
use crate::types::{slot_count_for, ChunkSet, Segment};
use crate::units::build_units;

/// Main interface for laying text out over bounded segments
#[derive(Debug, Clone)]
pub struct Chunker {
    config: SplitterConfig,
}

impl Chunker {
    /// Create a new chunker, rejecting invalid configuration
    pub fn new(config: SplitterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Segments needed for `text` under this configuration's minimum and
    /// reserve.
    #[must_use]
    pub fn slot_count(&self, text: &str) -> usize {
        slot_count_for(
            text,
            self.config.min_slots,
            self.config.reserve_slots,
            self.config.max_len,
        )
    }

    /// Split using [`Chunker::slot_count`] segments
    pub fn split_auto(&self, text: &str) -> Result<ChunkSet> {
        self.split(text, self.slot_count(text))
    }

    /// Split `text` into exactly `slot_count` segments
    pub fn split(&self, text: &str, slot_count: usize) -> Result<ChunkSet> {
        if slot_count == 0 {
            return Err(ChunkerError::invalid_config("slot count must be > 0"));
        }

        let units = build_units(text, self.config.max_len, &self.config.fence)?;
        let packed =
            Packer::new(self.config.policy, slot_count, self.config.max_len).pack(&units)?;

        let segments = packed
            .into_iter()
            .map(|content| {
                if content.trim().is_empty() {
                    Segment {
                        content: self.config.placeholder.clone(),
                        placeholder: true,
                    }
                } else {
                    Segment {
                        content,
                        placeholder: false,
                    }
                }
            })
            .collect();

        let set = ChunkSet::new(segments);
        log::debug!(
            "split {} chars into {} segments ({} placeholders)",
            text.chars().count(),
            set.len(),
            (0..set.len()).filter(|&i| set.is_placeholder(i)).count()
        );
        Ok(set)
    }
}

/// Split with the default placeholder and fence.
pub fn split(
    text: &str,
    slot_count: usize,
    max_len: usize,
    policy: PackingPolicy,
) -> Result<ChunkSet> {
    let config = SplitterConfig {
        max_len,
        policy,
        ..SplitterConfig::default()
    };
    Chunker::new(config)?.split(text, slot_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SplitterConfig {
            max_len: 0,
            ..Default::default()
        };
        assert!(matches!(
            Chunker::new(config),
            Err(ChunkerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_slots_is_rejected() {
        let chunker = Chunker::new(SplitterConfig::default()).expect("chunker");
        assert!(chunker.split("text", 0).is_err());
    }

    #[test]
    fn test_empty_text_is_all_placeholders() {
        let chunker = Chunker::new(SplitterConfig::default()).expect("chunker");
        let set = chunker.split_auto("").expect("split");
        assert_eq!(set.len(), 4);
        assert!(set.contents().all(|s| s == "_ _"));
    }

    #[test]
    fn test_whitespace_only_segment_gets_placeholder() {
        let set = split("  \n\t\n", 2, 10, PackingPolicy::TopGreedy).expect("split");
        assert_eq!(set.into_contents(), vec!["_ _", "_ _"]);
    }

    #[test]
    fn test_custom_placeholder_and_fence() {
        let config = SplitterConfig {
            max_len: 20,
            placeholder: "·".to_string(),
            fence: "~~~".to_string(),
            policy: PackingPolicy::TopGreedy,
            min_slots: 1,
            reserve_slots: 1,
        };
        let chunker = Chunker::new(config).expect("chunker");
        let set = chunker.split_auto("~~~\nkeep\n~~~\n").expect("split");
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(0), Some("~~~\nkeep\n~~~\n"));
        assert_eq!(set.get(1), Some("·"));
    }
}
