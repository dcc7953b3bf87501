use crate::registry::Registry;
use crate::snapshot::write_snapshot;
use log::{debug, info, warn};
use reactrack_protocol::now_unix_ms;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Background task that periodically removes expired items.
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ExpirySweeper {
    /// Starts the loop. It idles until `ready` turns true.
    pub fn spawn(
        registry: Arc<Registry>,
        interval: Duration,
        ready: watch::Receiver<bool>,
        snapshot_path: Option<PathBuf>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(registry, interval, ready, shutdown_rx, snapshot_path));
        Self { shutdown_tx, task }
    }

    /// Signals the loop and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(err) = self.task.await {
            warn!("Expiry sweeper ended abnormally: {err}");
        }
    }
}

async fn run(
    registry: Arc<Registry>,
    interval: Duration,
    mut ready: watch::Receiver<bool>,
    mut shutdown: watch::Receiver<bool>,
    snapshot_path: Option<PathBuf>,
) {
    tokio::select! {
        biased;
        _ = wait_for_shutdown(&mut shutdown) => return,
        is_ready = wait_until_ready(&mut ready) => {
            if !is_ready {
                debug!("Readiness sender dropped; sweeper not started");
                return;
            }
        }
    }
    debug!("Expiry sweeper running every {interval:?}");

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let removed = registry.sweep(now_unix_ms());
        if removed.is_empty() {
            continue;
        }
        info!("Swept {} expired items: {removed:?}", removed.len());

        if let Some(path) = snapshot_path.as_deref() {
            if let Err(err) = write_snapshot(path, &registry).await {
                warn!("Failed to write snapshot {}: {err}", path.display());
            }
        }
    }
    debug!("Expiry sweeper stopped");
}

async fn wait_until_ready(ready: &mut watch::Receiver<bool>) -> bool {
    ready.wait_for(|ready| *ready).await.is_ok()
}

/// Resolves once shutdown is requested or the sender is gone.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactrack_protocol::{ContentHandle, ItemId, PartId, UserRef};

    fn registry_with_expired_item() -> Arc<Registry> {
        let registry = Arc::new(Registry::new(Duration::from_secs(3600)));
        registry.create_item(
            UserRef::new(1, "owner"),
            "gone soon",
            ContentHandle::single(PartId(1)),
            "c",
            Some(Duration::ZERO),
        );
        registry.create_item(
            UserRef::new(1, "owner"),
            "stays",
            ContentHandle::single(PartId(2)),
            "c",
            None,
        );
        registry
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_ready_then_sweeps() {
        let registry = registry_with_expired_item();
        let (ready_tx, ready_rx) = watch::channel(false);
        let sweeper =
            ExpirySweeper::spawn(registry.clone(), Duration::from_secs(120), ready_rx, None);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(registry.len(), 2, "must not sweep before ready");

        ready_tx.send(true).expect("ready");
        tokio::time::sleep(Duration::from_secs(121)).await;
        assert_eq!(registry.ids(), vec![ItemId(2)]);

        sweeper.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_sleep() {
        let registry = registry_with_expired_item();
        let (_ready_tx, ready_rx) = watch::channel(true);
        let sweeper =
            ExpirySweeper::spawn(registry.clone(), Duration::from_secs(3600), ready_rx, None);

        tokio::time::sleep(Duration::from_secs(1)).await;
        sweeper.shutdown().await;
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn shutdown_before_ready() {
        let registry = registry_with_expired_item();
        let (_ready_tx, ready_rx) = watch::channel(false);
        let sweeper = ExpirySweeper::spawn(registry, Duration::from_secs(1), ready_rx, None);
        sweeper.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_writes_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        let registry = registry_with_expired_item();
        let (_ready_tx, ready_rx) = watch::channel(true);
        let sweeper = ExpirySweeper::spawn(
            registry,
            Duration::from_secs(5),
            ready_rx,
            Some(path.clone()),
        );

        tokio::time::sleep(Duration::from_secs(6)).await;
        sweeper.shutdown().await;

        let file = crate::snapshot::read_snapshot(&path)
            .await
            .expect("read")
            .expect("snapshot written");
        assert_eq!(file.items.keys().copied().collect::<Vec<_>>(), vec![ItemId(2)]);
    }
}
