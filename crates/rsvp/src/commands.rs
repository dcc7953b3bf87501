use crate::config::RsvpConfig;
use crate::handler::RsvpHandler;
use crate::sheet::{markers_from_data, render_draft, RsvpPost};
use crate::{Result, RsvpError};
use log::{info, warn};
use reactrack_protocol::{ItemId, ReactionMarker, UnixMillis, UserRef};
use reactrack_tracker::{
    ContentSink, Dispatcher, ItemHandler, MultiPartMessage, ReactionService, Registry,
    TrackedItem, TrackerError,
};
use std::sync::Arc;

/// Consumer id the sheets are tracked under.
pub const CONSUMER_ID: &str = "rsvp";

/// Sign-up sheet commands.
pub struct Rsvp {
    registry: Arc<Registry>,
    dispatcher: Arc<Dispatcher>,
    sink: Arc<dyn ContentSink>,
    handler: Arc<RsvpHandler>,
}

impl Rsvp {
    /// Builds the consumer and registers its handler with `service`.
    pub fn install(service: &ReactionService, config: RsvpConfig) -> Result<Self> {
        let rsvp = Self::new(
            config,
            service.registry().clone(),
            service.dispatcher().clone(),
            service.sink().clone(),
        )?;
        service.register_handlers(CONSUMER_ID, rsvp.handler.clone());
        Ok(rsvp)
    }

    /// Builds the consumer without registering it anywhere.
    pub fn new(
        config: RsvpConfig,
        registry: Arc<Registry>,
        dispatcher: Arc<Dispatcher>,
        sink: Arc<dyn ContentSink>,
    ) -> Result<Self> {
        let handler = Arc::new(RsvpHandler::new(config, registry.clone(), sink.clone())?);
        Ok(Self {
            registry,
            dispatcher,
            sink,
            handler,
        })
    }

    #[must_use]
    pub fn handler(&self) -> &Arc<RsvpHandler> {
        &self.handler
    }

    fn config(&self) -> &RsvpConfig {
        self.handler.config()
    }

    /// Posts a new sheet owned by `owner` and starts tracking it.
    pub async fn create(
        &self,
        owner: UserRef,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<TrackedItem> {
        let post = RsvpPost::new(title, body);
        let message = MultiPartMessage::create(
            self.sink.as_ref(),
            &render_draft(&post, self.config()),
            &self.config().splitter,
        )
        .await?;

        let item = self.registry.create_item(
            owner,
            post.to_content(),
            message.handle().clone(),
            CONSUMER_ID,
            Some(self.config().default_ttl()),
        );
        let id = item.id;

        let mut candidate = item;
        candidate.consumer_data = self.handler.parse(&candidate);
        if let Err(err) = self.handler.check_fits(&candidate) {
            self.registry.delete(id);
            if let Err(cleanup) = message.delete(self.sink.as_ref()).await {
                warn!("Failed to remove rejected sheet {id}: {cleanup}");
            }
            return Err(err);
        }

        self.handler.adopt(id, message);
        let item = self.dispatcher.refresh(id).await?;

        let primary = item.handle.primary();
        let mut markers = vec![self.config().signup_marker.clone()];
        markers.extend(markers_from_data(&item.consumer_data));
        for marker in &markers {
            if let Err(err) = self.sink.add_reaction(primary, marker).await {
                warn!("Failed to add {marker} to sheet {id}: {err}");
            }
        }

        info!("Created RSVP {id} with {} parts", item.handle.len());
        Ok(item)
    }

    /// Replaces title and body. Owner only.
    pub async fn edit(
        &self,
        user: &UserRef,
        id: ItemId,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<TrackedItem> {
        let item = self.owned_item(user, id)?;
        let content = RsvpPost::new(title, body).to_content();

        let mut candidate = item.clone();
        candidate.content = content.clone();
        candidate.consumer_data = self.handler.parse(&candidate);
        self.handler.check_fits(&candidate)?;

        let previous: Vec<ReactionMarker> = markers_from_data(&item.consumer_data);
        let updated = self.dispatcher.update_content(id, content).await?;

        let primary = updated.handle.primary();
        for marker in markers_from_data(&updated.consumer_data) {
            if previous.contains(&marker) {
                continue;
            }
            if let Err(err) = self.sink.add_reaction(primary, &marker).await {
                warn!("Failed to add {marker} to sheet {id}: {err}");
            }
        }
        self.handler.clean_reactions(&updated).await;

        info!("Edited RSVP {id}");
        Ok(updated)
    }

    /// Stops tracking the sheet and deletes its parts. Owner only.
    pub async fn delete(&self, user: &UserRef, id: ItemId) -> Result<()> {
        let item = self.owned_item(user, id)?;
        self.registry.delete(id);
        self.handler.discard(id, &item.handle).await?;
        info!("Deleted RSVP {id}");
        Ok(())
    }

    /// Pushes the expiry back by `qty` extension units. Owner only.
    /// Returns the new expiry.
    pub async fn extend(&self, user: &UserRef, id: ItemId, qty: u32) -> Result<UnixMillis> {
        if qty == 0 {
            return Err(RsvpError::InvalidQuantity);
        }
        self.owned_item(user, id)?;

        let expires_at = self
            .registry
            .extend(id, self.config().extension(qty))
            .ok_or(RsvpError::NotFound(id))?;
        self.dispatcher.refresh(id).await?;
        info!("Extended RSVP {id} until {expires_at}");
        Ok(expires_at)
    }

    fn owned_item(&self, user: &UserRef, id: ItemId) -> Result<TrackedItem> {
        let item = self.registry.lookup(id).ok_or(RsvpError::NotFound(id))?;
        match self.registry.authorize(id, user) {
            Ok(()) => Ok(item),
            Err(TrackerError::NotOwner { .. }) => Err(RsvpError::NotOwner {
                item: id,
                caller: user.display_name.clone(),
                owner: item.owner.display_name,
            }),
            Err(err) => Err(err.into()),
        }
    }
}
