//! # Reactrack Tracker
//!
//! Tracked items, reaction dispatch and expiry.
//!
//! ## Flow
//!
//! ```text
//! Reaction feed
//!     │
//!     ├──> Dispatcher (resolve part, dedupe, soft-remove)
//!     │      └─> Registry (per-item lock)
//!     │
//!     ├──> ItemHandler::render (no lock held)
//!     │      └─> ContentSink::edit_content
//!     │
//!     └──> ExpirySweeper (periodic sweep + snapshot)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use reactrack_tracker::{MemorySink, ReactionService, TrackerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = TrackerConfig::load(None)?;
//!     let service = ReactionService::new(config, Arc::new(MemorySink::default()))?;
//!     service.start().await;
//!
//!     println!("tracking {} items", service.registry().len());
//!     service.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod dispatcher;
mod error;
mod handler;
mod item;
mod multipart;
mod registry;
mod service;
mod sink;
mod snapshot;
mod sweeper;

pub use config::{
    TrackerConfig, ENV_DEFAULT_TTL_SECS, ENV_SNAPSHOT_PATH, ENV_SWEEP_INTERVAL_SECS,
};
pub use dispatcher::{DispatchOutcome, Dispatcher, ReactionEvent, ReactionKind};
pub use error::{Result, TrackerError};
pub use handler::ItemHandler;
pub use item::TrackedItem;
pub use multipart::MultiPartMessage;
pub use registry::Registry;
pub use service::ReactionService;
pub use sink::{ContentSink, MemorySink, PartState, SinkOp, SinkState};
pub use snapshot::{read_snapshot, restore_snapshot, snapshot_from_registry, write_snapshot};
pub use sweeper::ExpirySweeper;
