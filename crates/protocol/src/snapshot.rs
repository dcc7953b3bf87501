use crate::{ItemId, PartId, ReactionMarker, UnixMillis, UserId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// On-disk form of the tracked-item registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct SnapshotFile {
    pub schema_version: u32,
    pub written_at_unix_ms: UnixMillis,
    #[serde(default)]
    pub items: BTreeMap<ItemId, ItemRecord>,
}

impl SnapshotFile {
    #[must_use]
    pub fn new(written_at_unix_ms: UnixMillis) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            written_at_unix_ms,
            items: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ItemRecord {
    pub owner_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_container_id: Option<u64>,
    pub content: String,
    /// Every part of the rendered content, primary first.
    pub content_parts: Vec<PartId>,
    #[serde(default)]
    pub entries: Vec<EntryRecord>,
    #[serde(default)]
    pub created_at_unix_ms: UnixMillis,
    pub expires_at_unix_ms: UnixMillis,
    pub consumer_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct EntryRecord {
    pub user_id: UserId,
    pub marker: ReactionMarker,
    pub timestamp_ms: UnixMillis,
    pub valid: bool,
}

/// JSON schema of [`SnapshotFile`], for tooling that inspects snapshots.
#[must_use]
pub fn snapshot_json_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(SnapshotFile)).unwrap_or_default()
}
