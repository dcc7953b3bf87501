use reactrack_protocol::ItemId;
use reactrack_text_chunker::ChunkerError;
use reactrack_tracker::TrackerError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RsvpError>;

#[derive(Error, Debug)]
pub enum RsvpError {
    #[error("no active RSVP with id {0}")]
    NotFound(ItemId),

    #[error("{caller} does not own RSVP {item} (owner: {owner})")]
    NotOwner {
        item: ItemId,
        caller: String,
        owner: String,
    },

    #[error("extension quantity must be at least 1")]
    InvalidQuantity,

    #[error("RSVP text does not fit: {0}")]
    Layout(#[from] ChunkerError),

    #[error("Tracker error: {0}")]
    Tracker(TrackerError),
}

impl From<TrackerError> for RsvpError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::NotTracked(id) => Self::NotFound(id),
            TrackerError::Chunker(err) => Self::Layout(err),
            other => Self::Tracker(other),
        }
    }
}

impl RsvpError {
    /// Explanation shown to the user who issued the command.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(id) => format!(
                "Could not find an active RSVP with ID {id}. Double check your message ID."
            ),
            Self::NotOwner { caller, owner, .. } => format!(
                "RSVP commands can only be used on messages you own. You are {caller} but the owner is {owner}."
            ),
            Self::InvalidQuantity => {
                "RSVP Extend needs a quantity of at least 1 time unit.".to_string()
            }
            Self::Layout(ChunkerError::UnsplittableWord { word, max_len, .. }) => format!(
                "The word \"{}\" is longer than {max_len} characters and cannot be displayed. Please shorten it.",
                preview(word)
            ),
            Self::Layout(ChunkerError::AtomicBlockTooLarge { len, max_len }) => format!(
                "A code block is {len} characters long but at most {max_len} fit in one message. Please shorten it."
            ),
            Self::Layout(ChunkerError::CapacityExceeded { .. }) => {
                "The RSVP text has grown too long to display. Please shorten the description.".to_string()
            }
            Self::Layout(ChunkerError::InvalidConfig(_)) | Self::Tracker(_) => {
                "Something went wrong while updating the RSVP.".to_string()
            }
        }
    }
}

fn preview(word: &str) -> String {
    const LIMIT: usize = 32;
    if word.chars().count() <= LIMIT {
        return word.to_string();
    }
    let head: String = word.chars().take(LIMIT).collect();
    format!("{head}…")
}
