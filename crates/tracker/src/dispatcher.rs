use crate::handler::ItemHandler;
use crate::item::TrackedItem;
use crate::registry::Registry;
use crate::sink::ContentSink;
use crate::{Result, TrackerError};
use log::{debug, warn};
use reactrack_protocol::{
    now_unix_ms, ItemId, PartId, ReactionEntry, ReactionMarker, UserRef,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// What a reaction notification did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// A new valid entry was appended
    Recorded,
    /// A valid entry for the same user and marker already existed
    Duplicate,
    /// The most recent matching entry was marked invalid
    Invalidated,
    /// Removal without a matching valid entry
    NoMatch,
    /// The part does not belong to any tracked item
    Untracked,
    /// Reaction on a non-primary part; the part's reactions were cleared
    NoiseCleared,
    /// The item was removed while the event was in flight
    Retired,
}

impl DispatchOutcome {
    /// True when the item changed and was re-rendered.
    #[must_use]
    pub fn changed(self) -> bool {
        matches!(self, Self::Recorded | Self::Invalidated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    Added,
    Removed,
}

/// One notification from the platform's reaction feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub part: PartId,
    pub user: UserRef,
    pub marker: ReactionMarker,
    pub kind: ReactionKind,
}

/// Turns reaction notifications into registry mutations and consumer renders.
pub struct Dispatcher {
    registry: Arc<Registry>,
    sink: Arc<dyn ContentSink>,
    handlers: RwLock<HashMap<String, Arc<dyn ItemHandler>>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, sink: Arc<dyn ContentSink>) -> Self {
        Self {
            registry,
            sink,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Registers `handler` for `consumer_id`, replacing any earlier one.
    pub fn register_handlers(&self, consumer_id: impl Into<String>, handler: Arc<dyn ItemHandler>) {
        let consumer_id = consumer_id.into();
        let previous = self
            .handlers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(consumer_id.clone(), handler);
        if previous.is_some() {
            debug!("Replaced handlers for consumer {consumer_id}");
        }
    }

    fn handler_for(&self, consumer_id: &str) -> Option<Arc<dyn ItemHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(consumer_id)
            .cloned()
    }

    pub async fn handle_event(&self, event: ReactionEvent) -> DispatchOutcome {
        match event.kind {
            ReactionKind::Added => {
                self.on_reaction_added(event.part, event.user, event.marker)
                    .await
            }
            ReactionKind::Removed => {
                self.on_reaction_removed(event.part, &event.user, &event.marker)
                    .await
            }
        }
    }

    pub async fn on_reaction_added(
        &self,
        part: PartId,
        user: UserRef,
        marker: ReactionMarker,
    ) -> DispatchOutcome {
        let id = match self.resolve_primary(part).await {
            Ok(id) => id,
            Err(outcome) => return outcome,
        };

        let applied = self.registry.with_item_mut(id, |item| {
            if item.entries.iter().any(|e| e.is_live_match(&user, &marker)) {
                return None;
            }
            item.entries
                .push(ReactionEntry::new(user.clone(), marker.clone(), now_unix_ms()));
            Some(item.clone())
        });

        match applied {
            None => {
                debug!("Item {id} was removed before {marker} from {} landed", user.id);
                DispatchOutcome::Retired
            }
            Some(None) => DispatchOutcome::Duplicate,
            Some(Some(snapshot)) => {
                self.render(&snapshot).await;
                DispatchOutcome::Recorded
            }
        }
    }

    pub async fn on_reaction_removed(
        &self,
        part: PartId,
        user: &UserRef,
        marker: &ReactionMarker,
    ) -> DispatchOutcome {
        let id = match self.resolve_primary(part).await {
            Ok(id) => id,
            Err(outcome) => return outcome,
        };

        let applied = self.registry.with_item_mut(id, |item| {
            let index = item
                .entries
                .iter()
                .rposition(|e| e.is_live_match(user, marker))?;
            item.entries[index].valid = false;
            Some(item.clone())
        });

        match applied {
            None => DispatchOutcome::Retired,
            Some(None) => {
                debug!(
                    "No valid {marker} entry from {} on item {id}; ignoring removal",
                    user.id
                );
                DispatchOutcome::NoMatch
            }
            Some(Some(snapshot)) => {
                self.render(&snapshot).await;
                DispatchOutcome::Invalidated
            }
        }
    }

    /// Re-derives consumer data without rendering. False if `id` is not
    /// tracked.
    pub fn reparse(&self, id: ItemId) -> bool {
        self.parse_detached(id).is_some()
    }

    /// Re-parses the item's content into consumer data, then renders it.
    pub async fn refresh(&self, id: ItemId) -> Result<TrackedItem> {
        let snapshot = self.parse_detached(id).ok_or(TrackerError::NotTracked(id))?;
        self.render(&snapshot).await;
        Ok(snapshot)
    }

    /// Parses a copy of the item with no lock held, then stores the result
    /// only if the content is still the one that was parsed.
    fn parse_detached(&self, id: ItemId) -> Option<TrackedItem> {
        loop {
            let snapshot = self.registry.lookup(id)?;
            let Some(handler) = self.handler_for(&snapshot.consumer_id) else {
                return Some(snapshot);
            };
            let data = handler.parse(&snapshot);
            let stored = self.registry.with_item_mut(id, |item| {
                if item.content != snapshot.content {
                    return None;
                }
                item.consumer_data = data;
                Some(item.clone())
            })?;
            match stored {
                Some(item) => return Some(item),
                None => debug!("Content of item {id} changed while parsing; parsing again"),
            }
        }
    }

    /// Replaces the content text and refreshes the item.
    pub async fn update_content(&self, id: ItemId, content: impl Into<String>) -> Result<TrackedItem> {
        if !self.registry.update_content(id, content) {
            return Err(TrackerError::NotTracked(id));
        }
        self.refresh(id).await
    }

    /// Maps `part` to a tracked id, clearing reactions on non-primary parts.
    async fn resolve_primary(&self, part: PartId) -> std::result::Result<ItemId, DispatchOutcome> {
        let Some((id, is_primary)) = self.registry.resolve(part) else {
            debug!("Reaction on untracked part {part}; ignoring");
            return Err(DispatchOutcome::Untracked);
        };
        if is_primary {
            return Ok(id);
        }

        debug!("Reaction on secondary part {part} of item {id}; clearing");
        if let Err(err) = self.sink.clear_reactions(part).await {
            warn!("Failed to clear reactions on part {part}: {err}");
        }
        Err(DispatchOutcome::NoiseCleared)
    }

    async fn render(&self, item: &TrackedItem) {
        let Some(handler) = self.handler_for(&item.consumer_id) else {
            debug!("No handlers registered for consumer {}", item.consumer_id);
            return;
        };
        if let Err(err) = handler.render(item).await {
            warn!("Render of item {} failed: {err:#}", item.id);
        }
    }
}
