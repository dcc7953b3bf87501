use async_trait::async_trait;
use pretty_assertions::assert_eq;
use reactrack_protocol::{ContentHandle, ItemId, PartId, ReactionMarker, UserRef};
use reactrack_tracker::{
    ContentSink, DispatchOutcome, Dispatcher, ItemHandler, MemorySink, ReactionEvent, ReactionKind, Registry,
    SinkOp, TrackedItem,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Recorder {
    renders: Mutex<Vec<TrackedItem>>,
}

impl Recorder {
    fn render_count(&self) -> usize {
        self.renders.lock().expect("lock").len()
    }
}

#[async_trait]
impl ItemHandler for Recorder {
    fn parse(&self, item: &TrackedItem) -> serde_json::Value {
        serde_json::json!({ "words": item.content.split_whitespace().count() })
    }

    async fn render(&self, item: &TrackedItem) -> anyhow::Result<()> {
        self.renders.lock().expect("lock").push(item.clone());
        Ok(())
    }
}

struct Failing;

#[async_trait]
impl ItemHandler for Failing {
    fn parse(&self, _item: &TrackedItem) -> serde_json::Value {
        serde_json::Value::Null
    }

    async fn render(&self, _item: &TrackedItem) -> anyhow::Result<()> {
        anyhow::bail!("sink unavailable")
    }
}

struct Fixture {
    registry: Arc<Registry>,
    sink: Arc<MemorySink>,
    dispatcher: Dispatcher,
    recorder: Arc<Recorder>,
}

fn fixture() -> Fixture {
    let registry = Arc::new(Registry::new(Duration::from_secs(3600)));
    let sink = Arc::new(MemorySink::new(1));
    let dispatcher = Dispatcher::new(registry.clone(), sink.clone());
    let recorder = Arc::new(Recorder::default());
    dispatcher.register_handlers("test", recorder.clone());
    Fixture {
        registry,
        sink,
        dispatcher,
        recorder,
    }
}

fn owner() -> UserRef {
    UserRef::new(1, "owner")
}

fn guest() -> UserRef {
    UserRef::new(2, "guest")
}

fn thumbs() -> ReactionMarker {
    ReactionMarker::symbolic("👍")
}

fn track(fx: &Fixture, parts: &[u64]) -> ItemId {
    let handle = ContentHandle::new(parts.iter().copied().map(PartId).collect()).expect("handle");
    fx.registry
        .create_item(owner(), "some body text", handle, "test", None)
        .id
}

#[tokio::test]
async fn repeated_add_is_idempotent() {
    let fx = fixture();
    let id = track(&fx, &[10]);

    let first = fx
        .dispatcher
        .on_reaction_added(PartId(10), guest(), thumbs())
        .await;
    let second = fx
        .dispatcher
        .on_reaction_added(PartId(10), guest(), ReactionMarker::identified("👍", None))
        .await;

    assert_eq!(first, DispatchOutcome::Recorded);
    assert_eq!(second, DispatchOutcome::Duplicate);
    let item = fx.registry.lookup(id).expect("tracked");
    assert_eq!(item.valid_entries().count(), 1);
    assert_eq!(fx.recorder.render_count(), 1);
}

#[tokio::test]
async fn removal_soft_deletes_the_entry() {
    let fx = fixture();
    let id = track(&fx, &[10]);

    fx.dispatcher
        .on_reaction_added(PartId(10), guest(), thumbs())
        .await;
    let removed = fx
        .dispatcher
        .on_reaction_removed(PartId(10), &guest(), &thumbs())
        .await;

    assert_eq!(removed, DispatchOutcome::Invalidated);
    let item = fx.registry.lookup(id).expect("tracked");
    assert_eq!(item.entries.len(), 1);
    assert!(!item.entries[0].valid);
    assert_eq!(fx.recorder.render_count(), 2);

    let again = fx
        .dispatcher
        .on_reaction_removed(PartId(10), &guest(), &thumbs())
        .await;
    assert_eq!(again, DispatchOutcome::NoMatch);
    assert_eq!(fx.recorder.render_count(), 2);
}

#[tokio::test]
async fn re_adding_after_removal_appends_a_new_entry() {
    let fx = fixture();
    let id = track(&fx, &[10]);

    for kind in [ReactionKind::Added, ReactionKind::Removed, ReactionKind::Added] {
        fx.dispatcher
            .handle_event(ReactionEvent {
                part: PartId(10),
                user: guest(),
                marker: thumbs(),
                kind,
            })
            .await;
    }

    let item = fx.registry.lookup(id).expect("tracked");
    let validity: Vec<bool> = item.entries.iter().map(|e| e.valid).collect();
    assert_eq!(validity, vec![false, true]);
}

#[tokio::test]
async fn removal_invalidates_the_most_recent_match() {
    let fx = fixture();
    let id = track(&fx, &[10]);
    let custom = ReactionMarker::identified("party", Some(7));

    fx.dispatcher
        .on_reaction_added(PartId(10), guest(), custom.clone())
        .await;
    fx.dispatcher
        .on_reaction_removed(PartId(10), &guest(), &custom)
        .await;
    fx.dispatcher
        .on_reaction_added(PartId(10), guest(), custom.clone())
        .await;
    fx.dispatcher
        .on_reaction_removed(PartId(10), &guest(), &ReactionMarker::identified("renamed", Some(7)))
        .await;

    let item = fx.registry.lookup(id).expect("tracked");
    assert_eq!(item.entries.len(), 2);
    assert!(item.entries.iter().all(|e| !e.valid));
}

#[tokio::test]
async fn events_for_untracked_parts_are_ignored() {
    let fx = fixture();
    let outcome = fx
        .dispatcher
        .on_reaction_added(PartId(99), guest(), thumbs())
        .await;
    assert_eq!(outcome, DispatchOutcome::Untracked);
    assert_eq!(fx.recorder.render_count(), 0);
}

#[tokio::test]
async fn deleted_items_are_never_resurrected() {
    let fx = fixture();
    let id = track(&fx, &[10]);
    fx.registry.delete(id);

    let outcome = fx
        .dispatcher
        .on_reaction_added(PartId(10), guest(), thumbs())
        .await;
    assert_eq!(outcome, DispatchOutcome::Untracked);
    assert!(fx.registry.lookup(id).is_none());
    assert!(fx.registry.is_empty());
}

#[tokio::test]
async fn reactions_on_secondary_parts_are_cleared() {
    let fx = fixture();
    for content in ["a", "b", "c"] {
        fx.sink.send_content(content).await.expect("send");
    }
    let id = track(&fx, &[1, 2, 3]);

    let outcome = fx
        .dispatcher
        .on_reaction_added(PartId(3), guest(), thumbs())
        .await;

    assert_eq!(outcome, DispatchOutcome::NoiseCleared);
    assert!(fx.registry.lookup(id).expect("tracked").entries.is_empty());
    assert!(fx
        .sink
        .ops()
        .contains(&SinkOp::ClearReactions { part: PartId(3) }));
    assert_eq!(fx.recorder.render_count(), 0);

    let outcome = fx
        .dispatcher
        .on_reaction_added(PartId(1), guest(), thumbs())
        .await;
    assert_eq!(outcome, DispatchOutcome::Recorded);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_record_a_single_entry() {
    let fx = fixture();
    let id = track(&fx, &[10]);
    let dispatcher = Arc::new(fx.dispatcher);

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .on_reaction_added(PartId(10), guest(), thumbs())
                    .await
            })
        })
        .collect();

    let mut recorded = 0;
    for task in tasks {
        if task.await.expect("join") == DispatchOutcome::Recorded {
            recorded += 1;
        }
    }

    assert_eq!(recorded, 1);
    assert_eq!(fx.registry.lookup(id).expect("tracked").entries.len(), 1);
}

#[tokio::test]
async fn render_failures_do_not_reach_the_event_source() {
    let fx = fixture();
    fx.dispatcher.register_handlers("test", Arc::new(Failing));
    let id = track(&fx, &[10]);

    let outcome = fx
        .dispatcher
        .on_reaction_added(PartId(10), guest(), thumbs())
        .await;
    assert_eq!(outcome, DispatchOutcome::Recorded);
    assert_eq!(fx.registry.lookup(id).expect("tracked").entries.len(), 1);
}

#[tokio::test]
async fn update_content_reparses_and_renders() {
    let fx = fixture();
    let id = track(&fx, &[10]);

    let item = fx
        .dispatcher
        .update_content(id, "three short words")
        .await
        .expect("tracked");
    assert_eq!(item.consumer_data, serde_json::json!({ "words": 3 }));
    assert_eq!(fx.recorder.render_count(), 1);

    fx.registry.delete(id);
    assert!(fx.dispatcher.update_content(id, "gone").await.is_err());
}

/// Parses by reading the item back through the registry.
struct Peeking {
    registry: Arc<Registry>,
}

#[async_trait]
impl ItemHandler for Peeking {
    fn parse(&self, item: &TrackedItem) -> serde_json::Value {
        let tracked = self.registry.lookup(item.id).is_some();
        serde_json::json!({ "tracked": tracked, "items": self.registry.len() })
    }

    async fn render(&self, _item: &TrackedItem) -> anyhow::Result<()> {
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parse_may_read_the_registry() {
    let fx = fixture();
    fx.dispatcher.register_handlers(
        "test",
        Arc::new(Peeking {
            registry: fx.registry.clone(),
        }),
    );
    let id = track(&fx, &[10]);
    let dispatcher = Arc::new(fx.dispatcher);

    let reparse = {
        let dispatcher = dispatcher.clone();
        tokio::task::spawn_blocking(move || dispatcher.reparse(id))
    };
    let reparsed = tokio::time::timeout(Duration::from_secs(3), reparse)
        .await
        .expect("reparse finished")
        .expect("join");
    assert!(reparsed);
    assert_eq!(
        fx.registry.lookup(id).expect("tracked").consumer_data,
        serde_json::json!({ "tracked": true, "items": 1 })
    );

    let item = tokio::time::timeout(Duration::from_secs(3), dispatcher.refresh(id))
        .await
        .expect("refresh finished")
        .expect("tracked");
    assert_eq!(item.consumer_data["tracked"], true);
}

#[test]
fn reaction_events_deserialize_from_json() {
    let raw = r#"{
        "part": 10,
        "user": {"id": 2, "display_name": "guest"},
        "marker": {"kind": "identified", "name": "tempest", "id": 556941054277058560},
        "kind": "removed"
    }"#;
    let event: ReactionEvent = serde_json::from_str(raw).expect("event");
    assert_eq!(event.part, PartId(10));
    assert_eq!(event.kind, ReactionKind::Removed);
    assert_eq!(
        event.marker,
        ReactionMarker::identified("tempest", Some(556_941_054_277_058_560))
    );
}
