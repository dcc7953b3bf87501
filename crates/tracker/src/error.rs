use reactrack_protocol::{ItemId, UserId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("user {user} does not own item {item}")]
    NotOwner { item: ItemId, user: UserId },

    #[error("item {0} is not tracked")]
    NotTracked(ItemId),

    #[error("Chunker error: {0}")]
    Chunker(#[from] reactrack_text_chunker::ChunkerError),

    #[error("Content sink error: {0}")]
    Sink(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl TrackerError {
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }
}
