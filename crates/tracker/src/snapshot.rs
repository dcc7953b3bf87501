//! Best-effort persistence of the registry.
//!
//! Writes go to a sibling `.tmp` file first and are renamed into place.
//! Restoring never fails: a missing, unreadable or foreign file leaves the
//! registry as it was.

use crate::item::TrackedItem;
use crate::registry::Registry;
use crate::sink::ContentSink;
use crate::Result;
use log::{debug, info, warn};
use reactrack_protocol::{
    now_unix_ms, ContentHandle, EntryRecord, ItemRecord, ReactionEntry, SnapshotFile, UnixMillis,
    UserId, UserRef, SNAPSHOT_SCHEMA_VERSION,
};
use std::collections::HashMap;
use std::path::Path;

#[must_use]
pub fn snapshot_from_registry(registry: &Registry, now: UnixMillis) -> SnapshotFile {
    let mut file = SnapshotFile::new(now);
    for item in registry.items() {
        file.items.insert(item.id, record_for(&item));
    }
    file
}

fn record_for(item: &TrackedItem) -> ItemRecord {
    ItemRecord {
        owner_id: item.owner.id,
        owner_container_id: item.owner.container_id,
        content: item.content.clone(),
        content_parts: item.handle.parts().to_vec(),
        entries: item
            .entries
            .iter()
            .map(|entry| EntryRecord {
                user_id: entry.user.id,
                marker: entry.marker.clone(),
                timestamp_ms: entry.timestamp_ms,
                valid: entry.valid,
            })
            .collect(),
        created_at_unix_ms: item.created_at_ms,
        expires_at_unix_ms: item.expires_at_ms,
        consumer_id: item.consumer_id.clone(),
    }
}

pub async fn write_snapshot(path: &Path, registry: &Registry) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file = snapshot_from_registry(registry, now_unix_ms());
    let bytes = serde_json::to_vec_pretty(&file)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!("Wrote snapshot of {} items to {}", file.items.len(), path.display());
    Ok(())
}

pub async fn read_snapshot(path: &Path) -> Result<Option<SnapshotFile>> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(None);
    }
    let bytes = tokio::fs::read(path).await?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Loads `path` into `registry` and returns how many items were restored.
///
/// Users are re-resolved through `sink`; ids that no longer resolve keep an
/// id-only [`UserRef`]. Items that expired while the service was down are
/// dropped.
pub async fn restore_snapshot(path: &Path, registry: &Registry, sink: &dyn ContentSink) -> usize {
    let file = match read_snapshot(path).await {
        Ok(Some(file)) => file,
        Ok(None) => {
            debug!("No snapshot at {}", path.display());
            return 0;
        }
        Err(err) => {
            warn!("Ignoring unreadable snapshot {}: {err}", path.display());
            return 0;
        }
    };
    if file.schema_version != SNAPSHOT_SCHEMA_VERSION {
        warn!(
            "Ignoring snapshot {} with schema version {} (expected {})",
            path.display(),
            file.schema_version,
            SNAPSHOT_SCHEMA_VERSION
        );
        return 0;
    }

    let now = now_unix_ms();
    let mut users = UserCache::new(sink);
    let mut restored = 0;
    for (id, record) in file.items {
        if record.expires_at_unix_ms <= now {
            debug!("Skipping item {id}: expired while offline");
            continue;
        }
        let Some(handle) = ContentHandle::new(record.content_parts) else {
            warn!("Skipping item {id}: no content parts");
            continue;
        };
        if handle.canonical_id() != id {
            warn!("Skipping item {id}: keyed under a non-primary part");
            continue;
        }

        let mut owner = users.resolve(record.owner_id).await;
        owner.container_id = record.owner_container_id.or(owner.container_id);
        let mut entries = Vec::with_capacity(record.entries.len());
        for entry in record.entries {
            entries.push(ReactionEntry {
                user: users.resolve(entry.user_id).await,
                marker: entry.marker,
                timestamp_ms: entry.timestamp_ms,
                valid: entry.valid,
            });
        }

        registry.insert(TrackedItem {
            id,
            owner,
            content: record.content,
            handle,
            entries,
            created_at_ms: record.created_at_unix_ms,
            expires_at_ms: record.expires_at_unix_ms,
            consumer_data: serde_json::Value::Null,
            consumer_id: record.consumer_id,
        });
        restored += 1;
    }

    info!("Restored {restored} tracked items from {}", path.display());
    restored
}

struct UserCache<'a> {
    sink: &'a dyn ContentSink,
    known: HashMap<UserId, UserRef>,
}

impl<'a> UserCache<'a> {
    fn new(sink: &'a dyn ContentSink) -> Self {
        Self {
            sink,
            known: HashMap::new(),
        }
    }

    async fn resolve(&mut self, id: UserId) -> UserRef {
        if let Some(user) = self.known.get(&id) {
            return user.clone();
        }
        let user = match self.sink.resolve_user(id).await {
            Ok(user) => user,
            Err(err) => {
                debug!("Could not resolve user {id}: {err}");
                UserRef::unresolved(id)
            }
        };
        self.known.insert(id, user.clone());
        user
    }
}
