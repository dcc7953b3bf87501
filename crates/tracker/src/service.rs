use crate::config::TrackerConfig;
use crate::dispatcher::Dispatcher;
use crate::handler::ItemHandler;
use crate::registry::Registry;
use crate::sink::ContentSink;
use crate::snapshot::{restore_snapshot, write_snapshot};
use crate::sweeper::ExpirySweeper;
use crate::Result;
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Wires the registry, dispatcher and sweeper together and owns their
/// lifecycle.
pub struct ReactionService {
    config: TrackerConfig,
    registry: Arc<Registry>,
    dispatcher: Arc<Dispatcher>,
    sink: Arc<dyn ContentSink>,
    ready_tx: watch::Sender<bool>,
    sweeper: Mutex<Option<ExpirySweeper>>,
}

impl ReactionService {
    pub fn new(config: TrackerConfig, sink: Arc<dyn ContentSink>) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(Registry::from_config(&config));
        let dispatcher = Arc::new(Dispatcher::new(registry.clone(), sink.clone()));
        let (ready_tx, _) = watch::channel(false);
        Ok(Self {
            config,
            registry,
            dispatcher,
            sink,
            ready_tx,
            sweeper: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    #[must_use]
    pub fn sink(&self) -> &Arc<dyn ContentSink> {
        &self.sink
    }

    pub fn register_handlers(&self, consumer_id: impl Into<String>, handler: Arc<dyn ItemHandler>) {
        self.dispatcher.register_handlers(consumer_id, handler);
    }

    /// Restores the snapshot, re-derives consumer data for restored items,
    /// then starts the sweeper. Register handlers before calling this.
    /// Returns the number of restored items.
    pub async fn start(&self) -> usize {
        let mut sweeper = self.sweeper.lock().await;
        if sweeper.is_some() {
            warn!("Reaction service already started");
            return 0;
        }

        let restored = match self.config.snapshot_path.as_deref() {
            Some(path) => restore_snapshot(path, &self.registry, self.sink.as_ref()).await,
            None => 0,
        };
        for id in self.registry.ids() {
            self.dispatcher.reparse(id);
        }

        *sweeper = Some(ExpirySweeper::spawn(
            self.registry.clone(),
            self.config.sweep_interval(),
            self.ready_tx.subscribe(),
            self.config.snapshot_path.clone(),
        ));
        self.ready_tx.send_replace(true);
        info!(
            "Reaction service started with {} tracked items",
            self.registry.len()
        );
        restored
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.ready_tx.borrow()
    }

    /// Stops the sweeper and writes a final snapshot when one is configured.
    pub async fn shutdown(&self) -> Result<()> {
        self.ready_tx.send_replace(false);
        if let Some(sweeper) = self.sweeper.lock().await.take() {
            sweeper.shutdown().await;
        }
        if let Some(path) = self.config.snapshot_path.as_deref() {
            write_snapshot(path, &self.registry).await?;
        }
        info!("Reaction service stopped");
        Ok(())
    }
}
