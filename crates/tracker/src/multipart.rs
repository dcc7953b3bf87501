use crate::sink::ContentSink;
use crate::{Result, TrackerError};
use log::{debug, warn};
use reactrack_protocol::{ContentHandle, PartId};
use reactrack_text_chunker::{update_diff, Chunker, SplitterConfig};

/// A text body laid out over several sink parts.
///
/// The number of parts is fixed at creation; later edits must fit into it.
#[derive(Debug, Clone)]
pub struct MultiPartMessage {
    chunker: Chunker,
    handle: ContentHandle,
    rendered: Vec<String>,
}

impl MultiPartMessage {
    /// Splits `text` and sends one part per segment, in order.
    pub async fn create(
        sink: &dyn ContentSink,
        text: &str,
        config: &SplitterConfig,
    ) -> Result<Self> {
        let chunker = Chunker::new(config.clone())?;
        let rendered = chunker.split_auto(text)?.into_contents();

        let mut parts = Vec::with_capacity(rendered.len());
        for content in &rendered {
            parts.push(sink.send_content(content).await?);
        }
        let handle = ContentHandle::new(parts)
            .ok_or_else(|| TrackerError::Other("message has no parts".to_string()))?;
        debug!(
            "Created {}-part message {}",
            handle.len(),
            handle.canonical_id()
        );

        Ok(Self {
            chunker,
            handle,
            rendered,
        })
    }

    /// Wraps parts that already exist, e.g. after a restart.
    #[must_use]
    pub fn attach(chunker: Chunker, handle: ContentHandle, rendered: Vec<String>) -> Self {
        Self {
            chunker,
            handle,
            rendered,
        }
    }

    /// Re-lays `text` over the existing parts and edits only those that
    /// changed. Returns the changed indices.
    pub async fn edit(&mut self, sink: &dyn ContentSink, text: &str) -> Result<Vec<usize>> {
        let next = self.chunker.split(text, self.handle.len())?.into_contents();
        let changed = update_diff(&self.rendered, &next);

        for &index in &changed {
            let part = self.handle.parts()[index];
            sink.edit_content(part, &next[index]).await?;
            self.rendered[index] = next[index].clone();
        }
        Ok(changed)
    }

    /// Deletes every part. Keeps going past failures and reports the first.
    pub async fn delete(self, sink: &dyn ContentSink) -> Result<()> {
        let mut first_err = None;
        for &part in self.handle.parts() {
            if let Err(err) = sink.delete_content(part).await {
                warn!("Failed to delete part {part}: {err}");
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Clears reactions on every part except the primary one.
    pub async fn clean_reactions(&self, sink: &dyn ContentSink) -> Result<()> {
        for &part in &self.handle.parts()[1..] {
            sink.clear_reactions(part).await?;
        }
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, part: PartId) -> bool {
        self.handle.contains(part)
    }

    #[must_use]
    pub fn handle(&self) -> &ContentHandle {
        &self.handle
    }

    /// What each part currently shows.
    #[must_use]
    pub fn rendered(&self) -> &[String] {
        &self.rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{MemorySink, SinkOp};
    use pretty_assertions::assert_eq;
    use reactrack_protocol::ReactionMarker;
    use reactrack_text_chunker::{ChunkerError, PackingPolicy};

    fn config() -> SplitterConfig {
        SplitterConfig {
            max_len: 40,
            policy: PackingPolicy::TopGreedy,
            min_slots: 3,
            reserve_slots: 1,
            ..SplitterConfig::default()
        }
    }

    #[tokio::test]
    async fn create_sends_every_part_in_order() {
        let sink = MemorySink::new(1);
        let message = MultiPartMessage::create(&sink, "hello\n", &config())
            .await
            .expect("create");

        assert_eq!(message.handle().parts(), &[PartId(1), PartId(2), PartId(3)]);
        assert_eq!(sink.content(PartId(1)).as_deref(), Some("hello\n"));
        assert_eq!(sink.content(PartId(3)).as_deref(), Some("_ _"));
        assert!(message.contains(PartId(2)));
        assert!(!message.contains(PartId(4)));
    }

    #[tokio::test]
    async fn edit_touches_only_changed_parts() {
        let sink = MemorySink::new(1);
        let mut message = MultiPartMessage::create(&sink, "first\n", &config())
            .await
            .expect("create");

        let changed = message.edit(&sink, "first\n").await.expect("no-op edit");
        assert!(changed.is_empty());

        let changed = message.edit(&sink, "second\n").await.expect("edit");
        assert_eq!(changed, vec![0]);
        assert_eq!(sink.content(PartId(1)).as_deref(), Some("second\n"));
        assert_eq!(message.rendered()[0], "second\n");
        assert_eq!(sink.part(PartId(2)).map(|p| p.edits), Some(0));
    }

    #[tokio::test]
    async fn edit_that_no_longer_fits_is_rejected() {
        let sink = MemorySink::new(1);
        let mut message = MultiPartMessage::create(&sink, "short\n", &config())
            .await
            .expect("create");

        let long: String = (0..20).map(|i| format!("line number {i}\n")).collect();
        let err = message.edit(&sink, &long).await.expect_err("too long");
        assert!(matches!(
            err,
            TrackerError::Chunker(ChunkerError::CapacityExceeded { slots: 3, .. })
        ));
        assert_eq!(message.rendered()[0], "short\n");
    }

    #[tokio::test]
    async fn clean_reactions_skips_the_primary_part() {
        let sink = MemorySink::new(1);
        let message = MultiPartMessage::create(&sink, "x\n", &config())
            .await
            .expect("create");
        let marker = ReactionMarker::symbolic("👍");
        for &part in message.handle().parts() {
            sink.add_reaction(part, &marker).await.expect("react");
        }

        message.clean_reactions(&sink).await.expect("clean");
        assert_eq!(sink.part(PartId(1)).map(|p| p.reactions.len()), Some(1));
        assert_eq!(sink.part(PartId(2)).map(|p| p.reactions.len()), Some(0));
        assert_eq!(sink.part(PartId(3)).map(|p| p.reactions.len()), Some(0));
    }

    #[tokio::test]
    async fn delete_removes_all_parts() {
        let sink = MemorySink::new(1);
        let message = MultiPartMessage::create(&sink, "x\n", &config())
            .await
            .expect("create");
        message.delete(&sink).await.expect("delete");

        let deletes = sink
            .ops()
            .into_iter()
            .filter(|op| matches!(op, SinkOp::Delete { .. }))
            .count();
        assert_eq!(deletes, 3);
        assert!(sink.content(PartId(1)).is_none());
    }
}
