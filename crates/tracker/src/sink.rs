//! The external content collaborator and an in-memory implementation.
//!
//! [`ContentSink`] is the only way the tracker touches rendered content.
//! [`MemorySink`] keeps everything in process and records each call, which is
//! what the tests and the CLI replay run against.

use crate::{Result, TrackerError};
use async_trait::async_trait;
use reactrack_protocol::{PartId, ReactionMarker, UserId, UserRef};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[async_trait]
pub trait ContentSink: Send + Sync {
    /// Publishes a new part and returns its id.
    async fn send_content(&self, content: &str) -> Result<PartId>;

    async fn edit_content(&self, part: PartId, content: &str) -> Result<()>;

    async fn delete_content(&self, part: PartId) -> Result<()>;

    /// Adds the bot's own reaction to a part, e.g. the sign-up marker.
    async fn add_reaction(&self, part: PartId, marker: &ReactionMarker) -> Result<()>;

    /// Removes every reaction from a part.
    async fn clear_reactions(&self, part: PartId) -> Result<()>;

    async fn resolve_user(&self, id: UserId) -> Result<UserRef>;
}

/// One call made against a [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SinkOp {
    Send { part: PartId },
    Edit { part: PartId },
    Delete { part: PartId },
    AddReaction { part: PartId, marker: String },
    ClearReactions { part: PartId },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartState {
    pub content: String,
    pub reactions: Vec<String>,
    pub edits: usize,
}

/// Serializable view of everything a [`MemorySink`] currently holds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SinkState {
    pub parts: BTreeMap<PartId, PartState>,
    pub ops: Vec<SinkOp>,
}

#[derive(Default)]
struct MemoryInner {
    next_id: u64,
    parts: BTreeMap<PartId, PartState>,
    users: BTreeMap<UserId, UserRef>,
    ops: Vec<SinkOp>,
}

/// In-process [`ContentSink`]. Part ids are allocated sequentially from
/// `first_id`.
pub struct MemorySink {
    inner: Mutex<MemoryInner>,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl MemorySink {
    #[must_use]
    pub fn new(first_id: u64) -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                next_id: first_id,
                ..MemoryInner::default()
            }),
        }
    }

    /// Makes `user` resolvable through [`ContentSink::resolve_user`].
    pub fn add_user(&self, user: UserRef) {
        self.lock().users.insert(user.id, user);
    }

    #[must_use]
    pub fn content(&self, part: PartId) -> Option<String> {
        self.lock().parts.get(&part).map(|p| p.content.clone())
    }

    #[must_use]
    pub fn part(&self, part: PartId) -> Option<PartState> {
        self.lock().parts.get(&part).cloned()
    }

    #[must_use]
    pub fn ops(&self) -> Vec<SinkOp> {
        self.lock().ops.clone()
    }

    #[must_use]
    pub fn state(&self) -> SinkState {
        let inner = self.lock();
        SinkState {
            parts: inner.parts.clone(),
            ops: inner.ops.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn with_part<R>(&self, part: PartId, f: impl FnOnce(&mut PartState) -> R) -> Result<R> {
        self.lock()
            .parts
            .get_mut(&part)
            .map(f)
            .ok_or_else(|| TrackerError::sink(format!("unknown part {part}")))
    }
}

#[async_trait]
impl ContentSink for MemorySink {
    async fn send_content(&self, content: &str) -> Result<PartId> {
        let mut inner = self.lock();
        let part = PartId(inner.next_id);
        inner.next_id += 1;
        inner.parts.insert(
            part,
            PartState {
                content: content.to_string(),
                ..PartState::default()
            },
        );
        inner.ops.push(SinkOp::Send { part });
        Ok(part)
    }

    async fn edit_content(&self, part: PartId, content: &str) -> Result<()> {
        self.with_part(part, |state| {
            state.content = content.to_string();
            state.edits += 1;
        })?;
        self.lock().ops.push(SinkOp::Edit { part });
        Ok(())
    }

    async fn delete_content(&self, part: PartId) -> Result<()> {
        let mut inner = self.lock();
        if inner.parts.remove(&part).is_none() {
            return Err(TrackerError::sink(format!("unknown part {part}")));
        }
        inner.ops.push(SinkOp::Delete { part });
        Ok(())
    }

    async fn add_reaction(&self, part: PartId, marker: &ReactionMarker) -> Result<()> {
        let marker = marker.to_string();
        self.with_part(part, |state| state.reactions.push(marker.clone()))?;
        self.lock().ops.push(SinkOp::AddReaction { part, marker });
        Ok(())
    }

    async fn clear_reactions(&self, part: PartId) -> Result<()> {
        self.with_part(part, |state| state.reactions.clear())?;
        self.lock().ops.push(SinkOp::ClearReactions { part });
        Ok(())
    }

    async fn resolve_user(&self, id: UserId) -> Result<UserRef> {
        self.lock()
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| TrackerError::sink(format!("unknown user {id}")))
    }
}
