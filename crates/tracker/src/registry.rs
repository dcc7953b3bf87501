use crate::item::TrackedItem;
use crate::{Result, TrackerError};
use log::{debug, info, warn};
use reactrack_protocol::{now_unix_ms, ContentHandle, ItemId, PartId, UnixMillis, UserRef};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Registry-side state of one item. A slot is retired under its own lock
/// when the item is deleted or swept, so holders of a stale `Arc` see it.
#[derive(Debug)]
pub(crate) struct Slot {
    pub item: TrackedItem,
    pub retired: bool,
}

#[derive(Default)]
struct RegistryInner {
    items: HashMap<ItemId, Arc<Mutex<Slot>>>,
    /// Every part of every tracked handle, mapped to its canonical id.
    aliases: HashMap<PartId, ItemId>,
}

impl RegistryInner {
    fn detach(&mut self, id: ItemId) -> Option<Arc<Mutex<Slot>>> {
        let slot = self.items.remove(&id)?;
        self.aliases.retain(|_, owner| *owner != id);
        Some(slot)
    }
}

/// Owns every tracked item, keyed by canonical id.
///
/// Lock order is map first, then item. Item locks are never held across an
/// `.await`.
pub struct Registry {
    inner: RwLock<RegistryInner>,
    default_ttl: Duration,
    consumer_ttls: HashMap<String, Duration>,
}

impl Registry {
    #[must_use]
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            default_ttl,
            consumer_ttls: HashMap::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &crate::TrackerConfig) -> Self {
        let consumer_ttls = config
            .consumer_ttl_secs
            .keys()
            .map(|consumer| (consumer.clone(), config.ttl_for(consumer)))
            .collect();
        Self {
            inner: RwLock::new(RegistryInner::default()),
            default_ttl: config.default_ttl(),
            consumer_ttls,
        }
    }

    /// Lifetime used when `create_item` gets no explicit ttl.
    #[must_use]
    pub fn ttl_for(&self, consumer_id: &str) -> Duration {
        self.consumer_ttls
            .get(consumer_id)
            .copied()
            .unwrap_or(self.default_ttl)
    }

    /// Starts tracking `handle`. An item already tracked under the same
    /// canonical id is replaced.
    pub fn create_item(
        &self,
        owner: UserRef,
        content: impl Into<String>,
        handle: ContentHandle,
        consumer_id: impl Into<String>,
        ttl: Option<Duration>,
    ) -> TrackedItem {
        let consumer_id = consumer_id.into();
        let ttl = ttl.unwrap_or_else(|| self.ttl_for(&consumer_id));
        let now = now_unix_ms();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);

        let item = TrackedItem {
            id: handle.canonical_id(),
            owner,
            content: content.into(),
            handle,
            entries: Vec::new(),
            created_at_ms: now,
            expires_at_ms: now.saturating_add(ttl_ms),
            consumer_data: serde_json::Value::Null,
            consumer_id,
        };
        self.insert(item.clone());
        info!(
            "Tracking item {} for consumer {} until {}",
            item.id, item.consumer_id, item.expires_at_ms
        );
        item
    }

    /// Inserts a fully built item (used when restoring a snapshot).
    pub fn insert(&self, item: TrackedItem) {
        let id = item.id;
        let parts = item.handle.parts().to_vec();
        let mut inner = write(&self.inner);
        if let Some(previous) = inner.detach(id) {
            warn!("Item {id} was already tracked; replacing it");
            lock(&previous).retired = true;
        }
        for part in parts {
            inner.aliases.insert(part, id);
        }
        inner.items.insert(
            id,
            Arc::new(Mutex::new(Slot {
                item,
                retired: false,
            })),
        );
    }

    /// Copy of the item, if tracked.
    #[must_use]
    pub fn lookup(&self, id: ItemId) -> Option<TrackedItem> {
        let slot = self.slot(id)?;
        let guard = lock(&slot);
        (!guard.retired).then(|| guard.item.clone())
    }

    /// True while `id` is tracked.
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        read(&self.inner).items.contains_key(&id)
    }

    /// Canonical id of the item `part` belongs to, and whether `part` is its
    /// primary part.
    #[must_use]
    pub fn resolve(&self, part: PartId) -> Option<(ItemId, bool)> {
        let inner = read(&self.inner);
        let id = *inner.aliases.get(&part)?;
        Some((id, ItemId::from(part) == id))
    }

    /// Stops tracking `id`. The external content is left alone.
    pub fn delete(&self, id: ItemId) -> Option<TrackedItem> {
        let slot = write(&self.inner).detach(id)?;
        let mut guard = lock(&slot);
        guard.retired = true;
        debug!("Deleted tracked item {id}");
        Some(guard.item.clone())
    }

    /// Removes every item with `expires_at_ms <= now` and returns their ids.
    pub fn sweep(&self, now: UnixMillis) -> Vec<ItemId> {
        let mut inner = write(&self.inner);
        let mut expired: Vec<ItemId> = inner
            .items
            .iter()
            .filter_map(|(id, slot)| {
                let mut guard = lock(slot);
                guard.item.is_expired(now).then(|| {
                    guard.retired = true;
                    *id
                })
            })
            .collect();

        for id in &expired {
            inner.detach(*id);
        }
        expired.sort_unstable();
        expired
    }

    /// Replaces the item's content text. Returns false if it is not tracked.
    pub fn update_content(&self, id: ItemId, content: impl Into<String>) -> bool {
        let content = content.into();
        self.with_item_mut(id, |item| item.content = content)
            .is_some()
    }

    pub fn set_consumer_data(&self, id: ItemId, data: serde_json::Value) -> bool {
        self.with_item_mut(id, |item| item.consumer_data = data)
            .is_some()
    }

    /// Pushes the expiry later by `by`; returns the new expiry.
    pub fn extend(&self, id: ItemId, by: Duration) -> Option<UnixMillis> {
        let by_ms = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.with_item_mut(id, |item| {
            item.expires_at_ms = item.expires_at_ms.saturating_add(by_ms);
            item.expires_at_ms
        })
    }

    /// Ok only when `user` owns the tracked item `id`.
    pub fn authorize(&self, id: ItemId, user: &UserRef) -> Result<()> {
        let item = self.lookup(id).ok_or(TrackerError::NotTracked(id))?;
        if item.is_owned_by(user) {
            Ok(())
        } else {
            Err(TrackerError::NotOwner { item: id, user: user.id })
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        read(&self.inner).items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tracked ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = read(&self.inner).items.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Copies of every tracked item, ordered by id.
    #[must_use]
    pub fn items(&self) -> Vec<TrackedItem> {
        let slots: Vec<Arc<Mutex<Slot>>> = read(&self.inner).items.values().cloned().collect();
        let mut items: Vec<TrackedItem> = slots
            .iter()
            .filter_map(|slot| {
                let guard = lock(slot);
                (!guard.retired).then(|| guard.item.clone())
            })
            .collect();
        items.sort_by_key(|item| item.id);
        items
    }

    /// Runs `f` on the live item under its lock. `None` if the item is not
    /// tracked or was retired concurrently.
    pub(crate) fn with_item_mut<R>(
        &self,
        id: ItemId,
        f: impl FnOnce(&mut TrackedItem) -> R,
    ) -> Option<R> {
        let slot = self.slot(id)?;
        let mut guard = lock(&slot);
        if guard.retired {
            return None;
        }
        Some(f(&mut guard.item))
    }

    fn slot(&self, id: ItemId) -> Option<Arc<Mutex<Slot>>> {
        read(&self.inner).items.get(&id).cloned()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(std::sync::PoisonError::into_inner)
}
