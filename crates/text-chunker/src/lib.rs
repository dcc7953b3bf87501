//! # Reactrack Text Chunker
//!
//! Lays an arbitrarily long text out over a fixed number of bounded-length
//! segments (one platform message each).
//!
//! ## Pipeline
//!
//! ```text
//! Text
//!     │
//!     ├──> Lines (terminators kept)
//!     │      └─> over-long lines re-wrapped on whitespace
//!     │
//!     ├──> Fenced blocks merged into single units
//!     │
//!     ├──> Packing (bottom-weighted or top-greedy)
//!     │
//!     └──> Empty segments replaced by the placeholder
//! ```
//!
//! ## Example
//!
//! ```rust
//! use reactrack_text_chunker::{Chunker, SplitterConfig};
//!
//! let chunker = Chunker::new(SplitterConfig::default()).unwrap();
//! let set = chunker.split("Sign-ups:\n1 - alice\n", 4).unwrap();
//!
//! assert_eq!(set.len(), 4);
//! assert!(set.is_placeholder(0));
//! assert_eq!(set.joined_text(), "Sign-ups:\n1 - alice\n");
//! ```

mod chunker;
mod config;
mod error;
mod strategy;
mod types;
mod units;

pub use chunker::{split, Chunker};
pub use config::{
    PackingPolicy, SplitterConfig, DEFAULT_FENCE, DEFAULT_MAX_LEN, DEFAULT_PLACEHOLDER,
};
pub use error::{ChunkerError, Result};
pub use types::{slot_count_for, update_diff, ChunkSet, Segment};
