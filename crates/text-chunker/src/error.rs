use thiserror::Error;

/// Result type for chunker operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors that can occur while laying text out over segments.
///
/// All of them are terminal for the call: the caller has to shorten the text
/// or ask for more or larger segments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkerError {
    /// A single whitespace-free word is longer than a segment
    #[error("cannot split word of {len} characters below the segment limit of {max_len}")]
    UnsplittableWord {
        word: String,
        len: usize,
        max_len: usize,
    },

    /// A fenced block does not fit in one segment
    #[error("fenced block of {len} characters exceeds the segment limit of {max_len}")]
    AtomicBlockTooLarge { len: usize, max_len: usize },

    /// Content left over after the last segment was filled
    #[error("text does not fit in {slots} segments of {max_len} characters")]
    CapacityExceeded { slots: usize, max_len: usize },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ChunkerError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// True for failures the content's author can fix by shortening the text.
    #[must_use]
    pub const fn is_content_error(&self) -> bool {
        !matches!(self, Self::InvalidConfig(_))
    }
}
