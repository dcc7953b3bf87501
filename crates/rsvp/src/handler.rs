use crate::config::RsvpConfig;
use crate::sheet::{markers_to_data, render_sheet, RsvpPost};
use crate::Result;
use async_trait::async_trait;
use log::{debug, warn};
use reactrack_protocol::{ContentHandle, ItemId};
use reactrack_text_chunker::Chunker;
use reactrack_tracker::{ContentSink, ItemHandler, MultiPartMessage, Registry, TrackedItem};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Mutex as AsyncMutex;

type SharedMessage = Arc<AsyncMutex<MultiPartMessage>>;

/// Renders sign-up sheets onto their message parts.
///
/// Each sheet's parts sit behind their own async lock so renders of one
/// sheet never interleave. The sheet is re-read from the registry once the
/// lock is held, so the last render always shows the latest state.
pub struct RsvpHandler {
    config: RsvpConfig,
    chunker: Chunker,
    registry: Arc<Registry>,
    sink: Arc<dyn ContentSink>,
    messages: Mutex<HashMap<ItemId, SharedMessage>>,
}

impl RsvpHandler {
    pub fn new(
        config: RsvpConfig,
        registry: Arc<Registry>,
        sink: Arc<dyn ContentSink>,
    ) -> Result<Self> {
        let chunker = Chunker::new(config.splitter.clone())?;
        Ok(Self {
            config,
            chunker,
            registry,
            sink,
            messages: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn config(&self) -> &RsvpConfig {
        &self.config
    }

    /// Fails when `item` rendered as a sheet no longer fits its parts.
    pub fn check_fits(&self, item: &TrackedItem) -> Result<()> {
        self.chunker
            .split(&render_sheet(item, &self.config), item.handle.len())?;
        Ok(())
    }

    /// Takes over a freshly created message.
    pub(crate) fn adopt(&self, id: ItemId, message: MultiPartMessage) {
        let mut messages = self.lock_messages();
        self.prune(&mut messages);
        messages.insert(id, Arc::new(AsyncMutex::new(message)));
    }

    /// Clears stray reactions from the sheet's secondary parts.
    pub(crate) async fn clean_reactions(&self, item: &TrackedItem) {
        let message = self.message_for(item.id, &item.handle);
        let message = message.lock().await;
        if let Err(err) = message.clean_reactions(self.sink.as_ref()).await {
            warn!("Failed to clean reactions on sheet {}: {err}", item.id);
        }
    }

    /// Deletes every part of the sheet and forgets its layout.
    pub(crate) async fn discard(&self, id: ItemId, handle: &ContentHandle) -> Result<()> {
        let message = self
            .lock_messages()
            .remove(&id)
            .unwrap_or_else(|| self.attach(handle));
        let message = message.lock().await.clone();
        message.delete(self.sink.as_ref()).await?;
        Ok(())
    }

    fn message_for(&self, id: ItemId, handle: &ContentHandle) -> SharedMessage {
        let mut messages = self.lock_messages();
        if !messages.contains_key(&id) {
            self.prune(&mut messages);
        }
        messages
            .entry(id)
            .or_insert_with(|| self.attach(handle))
            .clone()
    }

    /// Layout for parts we did not create in this process. Nothing is known
    /// about their text, so the first render rewrites all of them.
    fn attach(&self, handle: &ContentHandle) -> SharedMessage {
        debug!("Attaching to existing sheet {}", handle.canonical_id());
        Arc::new(AsyncMutex::new(MultiPartMessage::attach(
            self.chunker.clone(),
            handle.clone(),
            vec![String::new(); handle.len()],
        )))
    }

    /// Drops layouts of sheets that expired or were deleted elsewhere.
    fn prune(&self, messages: &mut HashMap<ItemId, SharedMessage>) {
        let before = messages.len();
        messages.retain(|id, _| self.registry.contains(*id));
        if messages.len() < before {
            debug!("Released {} stale sheet layouts", before - messages.len());
        }
    }

    fn lock_messages(&self) -> MutexGuard<'_, HashMap<ItemId, SharedMessage>> {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl ItemHandler for RsvpHandler {
    fn parse(&self, item: &TrackedItem) -> serde_json::Value {
        markers_to_data(&RsvpPost::from_content(&item.content).special_markers())
    }

    async fn render(&self, item: &TrackedItem) -> anyhow::Result<()> {
        let message = self.message_for(item.id, &item.handle);
        let mut message = message.lock().await;

        let Some(current) = self.registry.lookup(item.id) else {
            debug!("Sheet {} is gone; skipping render", item.id);
            drop(message);
            self.lock_messages().remove(&item.id);
            return Ok(());
        };
        let changed = message
            .edit(self.sink.as_ref(), &render_sheet(&current, &self.config))
            .await?;
        debug!("Rendered sheet {} ({} parts changed)", item.id, changed.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rsvp;
    use reactrack_protocol::UserRef;
    use reactrack_tracker::{Dispatcher, MemorySink};
    use std::time::Duration;

    fn layouts(handler: &RsvpHandler) -> usize {
        handler.lock_messages().len()
    }

    #[tokio::test]
    async fn layouts_of_swept_sheets_are_released() {
        let registry = Arc::new(Registry::new(Duration::from_secs(3600)));
        let sink = Arc::new(MemorySink::new(1000));
        let dispatcher = Arc::new(Dispatcher::new(registry.clone(), sink.clone()));
        let rsvp = Rsvp::new(RsvpConfig::default(), registry.clone(), dispatcher.clone(), sink)
            .expect("rsvp");
        dispatcher.register_handlers(crate::CONSUMER_ID, rsvp.handler().clone());

        let owner = UserRef::new(1, "Ada");
        for n in 0..5 {
            rsvp.create(owner.clone(), format!("Sheet {n}"), "body\n")
                .await
                .expect("create");
        }
        assert_eq!(layouts(rsvp.handler()), 5);

        assert_eq!(registry.sweep(u64::MAX).len(), 5);
        let kept = rsvp
            .create(owner, "Fresh", "body\n")
            .await
            .expect("create");
        assert_eq!(layouts(rsvp.handler()), 1);

        // A render that finds its sheet gone forgets the layout too.
        registry.delete(kept.id);
        rsvp.handler().render(&kept).await.expect("render");
        assert_eq!(layouts(rsvp.handler()), 0);
    }
}
