use serde::{Deserialize, Serialize};

/// Fixed-length, ordered set of segments produced by the splitter.
///
/// Every segment is at most `max_len` characters and never empty or
/// whitespace-only: unused segments carry the placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSet {
    segments: Vec<Segment>,
}

/// One output segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Text to publish for this segment
    pub content: String,

    /// True when `content` is the placeholder rather than part of the text
    #[serde(default)]
    pub placeholder: bool,
}

impl ChunkSet {
    pub(crate) fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Number of segments (always the requested slot count)
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Segment texts in order, placeholders included
    pub fn contents(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| s.content.as_str())
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(|s| s.content.as_str())
    }

    #[must_use]
    pub fn is_placeholder(&self, index: usize) -> bool {
        self.segments.get(index).is_some_and(|s| s.placeholder)
    }

    /// Concatenation of the non-placeholder segments
    #[must_use]
    pub fn joined_text(&self) -> String {
        self.segments
            .iter()
            .filter(|s| !s.placeholder)
            .map(|s| s.content.as_str())
            .collect()
    }

    #[must_use]
    pub fn into_contents(self) -> Vec<String> {
        self.segments.into_iter().map(|s| s.content).collect()
    }
}

/// Number of segments to spread `text` over: what the text needs at
/// `max_len` characters per segment plus `reserve`, but never fewer than
/// `minimum`.
#[must_use]
pub fn slot_count_for(text: &str, minimum: usize, reserve: usize, max_len: usize) -> usize {
    let needed = text.chars().count().div_ceil(max_len.max(1));
    minimum.max(needed + reserve)
}

/// Indices whose segment text differs between two layouts.
///
/// Segments past the end of the shorter layout always count as changed.
#[must_use]
pub fn update_diff<A: AsRef<str>, B: AsRef<str>>(old: &[A], new: &[B]) -> Vec<usize> {
    let len = old.len().max(new.len());
    (0..len)
        .filter(|&idx| match (old.get(idx), new.get(idx)) {
            (Some(a), Some(b)) => a.as_ref() != b.as_ref(),
            _ => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_count_for() {
        assert_eq!(slot_count_for("", 4, 2, 2000), 4);
        assert_eq!(slot_count_for(&"a".repeat(4500), 4, 2, 2000), 5);
        assert_eq!(slot_count_for(&"a".repeat(4000), 1, 0, 2000), 2);
        assert_eq!(slot_count_for(&"a".repeat(4001), 1, 0, 2000), 3);
    }

    #[test]
    fn test_slot_count_counts_characters() {
        // Multi-byte characters count once each.
        assert_eq!(slot_count_for(&"é".repeat(10), 1, 0, 10), 1);
    }

    #[test]
    fn test_update_diff() {
        let old = ["a", "b", "c"];
        assert!(update_diff(&old, &["a", "b", "c"]).is_empty());
        assert_eq!(update_diff(&old, &["a", "x", "c"]), vec![1]);
        assert_eq!(update_diff(&old, &["a", "b"]), vec![2]);
        assert_eq!(update_diff(&["a"], &["a", "b", "c"]), vec![1, 2]);
    }

    #[test]
    fn test_joined_text_skips_placeholders() {
        let set = ChunkSet::new(vec![
            Segment {
                content: "_ _".to_string(),
                placeholder: true,
            },
            Segment {
                content: "hello\n".to_string(),
                placeholder: false,
            },
            Segment {
                content: "_ _".to_string(),
                placeholder: false,
            },
        ]);
        assert_eq!(set.joined_text(), "hello\n_ _");
        assert!(set.is_placeholder(0));
        assert!(!set.is_placeholder(2));
        assert!(!set.is_placeholder(3));
    }
}
