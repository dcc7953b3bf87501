use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod marker;
pub mod snapshot;

pub use marker::ReactionMarker;
pub use snapshot::{EntryRecord, ItemRecord, SnapshotFile, SNAPSHOT_SCHEMA_VERSION};

/// Milliseconds since the unix epoch. Every timestamp in the core uses this unit.
pub type UnixMillis = u64;

#[must_use]
pub fn now_unix_ms() -> UnixMillis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Id of one piece of content on the external platform (a single message).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct PartId(pub u64);

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical registry key of a tracked item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<PartId> for ItemId {
    fn from(part: PartId) -> Self {
        Self(part.0)
    }
}

/// A platform user as seen by the core.
///
/// Identity is the user id alone; the display name and container are
/// descriptive and may change between lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    pub display_name: String,
    /// Guild/server the user was resolved in, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<u64>,
}

impl UserRef {
    pub fn new(id: u64, display_name: impl Into<String>) -> Self {
        Self {
            id: UserId(id),
            display_name: display_name.into(),
            container_id: None,
        }
    }

    #[must_use]
    pub const fn in_container(mut self, container_id: u64) -> Self {
        self.container_id = Some(container_id);
        self
    }

    /// Placeholder used when a stored user id can no longer be resolved.
    #[must_use]
    pub fn unresolved(id: UserId) -> Self {
        Self {
            id,
            display_name: format!("user-{id}"),
            container_id: None,
        }
    }
}

impl PartialEq for UserRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for UserRef {}

impl Hash for UserRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Opaque handle to rendered content, possibly spread across several parts.
///
/// The first part is the primary one: it provides the canonical id and is
/// the only part whose reactions are recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PartId>", into = "Vec<PartId>")]
pub struct ContentHandle {
    parts: Vec<PartId>,
}

impl TryFrom<Vec<PartId>> for ContentHandle {
    type Error = String;

    fn try_from(parts: Vec<PartId>) -> Result<Self, Self::Error> {
        Self::new(parts).ok_or_else(|| "content handle needs at least one part".to_string())
    }
}

impl From<ContentHandle> for Vec<PartId> {
    fn from(handle: ContentHandle) -> Self {
        handle.parts
    }
}

impl ContentHandle {
    /// Returns `None` for an empty part list.
    #[must_use]
    pub fn new(parts: Vec<PartId>) -> Option<Self> {
        (!parts.is_empty()).then_some(Self { parts })
    }

    #[must_use]
    pub fn single(part: PartId) -> Self {
        Self { parts: vec![part] }
    }

    #[must_use]
    pub fn primary(&self) -> PartId {
        self.parts[0]
    }

    #[must_use]
    pub fn canonical_id(&self) -> ItemId {
        self.primary().into()
    }

    #[must_use]
    pub fn parts(&self) -> &[PartId] {
        &self.parts
    }

    #[must_use]
    pub fn contains(&self, part: PartId) -> bool {
        self.parts.contains(&part)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// One user's reaction to a tracked item. Entries are never removed, only
/// invalidated, so the list doubles as an audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionEntry {
    pub user: UserRef,
    pub marker: ReactionMarker,
    pub timestamp_ms: UnixMillis,
    pub valid: bool,
}

impl ReactionEntry {
    #[must_use]
    pub fn new(user: UserRef, marker: ReactionMarker, timestamp_ms: UnixMillis) -> Self {
        Self {
            user,
            marker,
            timestamp_ms,
            valid: true,
        }
    }

    /// True for a still-valid entry of `user` with a marker equal to `marker`.
    #[must_use]
    pub fn is_live_match(&self, user: &UserRef, marker: &ReactionMarker) -> bool {
        self.valid && self.user == *user && self.marker == *marker
    }
}
