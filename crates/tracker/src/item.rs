use reactrack_protocol::{
    ContentHandle, ItemId, ReactionEntry, ReactionMarker, UnixMillis, UserRef,
};
use serde::Serialize;

/// An owner's content plus the reactions collected against it.
///
/// Values handed out by the registry are detached copies; structural changes
/// go through [`crate::Registry`] and [`crate::Dispatcher`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedItem {
    pub id: ItemId,
    pub owner: UserRef,
    pub content: String,
    pub handle: ContentHandle,
    /// Append-only, in arrival order.
    pub entries: Vec<ReactionEntry>,
    pub created_at_ms: UnixMillis,
    pub expires_at_ms: UnixMillis,
    /// Consumer-defined data, re-derived by the consumer's parser.
    pub consumer_data: serde_json::Value,
    pub consumer_id: String,
}

impl TrackedItem {
    #[must_use]
    pub fn is_expired(&self, now: UnixMillis) -> bool {
        self.expires_at_ms <= now
    }

    pub fn valid_entries(&self) -> impl Iterator<Item = &ReactionEntry> {
        self.entries.iter().filter(|e| e.valid)
    }

    /// Users with a valid entry for `marker`, first reaction first, each once.
    #[must_use]
    pub fn users_with(&self, marker: &ReactionMarker) -> Vec<&UserRef> {
        let mut users: Vec<&UserRef> = Vec::new();
        for entry in self.valid_entries() {
            if entry.marker == *marker && !users.contains(&&entry.user) {
                users.push(&entry.user);
            }
        }
        users
    }

    #[must_use]
    pub fn is_owned_by(&self, user: &UserRef) -> bool {
        self.owner == *user
    }
}
