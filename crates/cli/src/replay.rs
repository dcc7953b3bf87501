use crate::{print_json, ReplayArgs};
use anyhow::{Context as AnyhowContext, Result};
use reactrack_protocol::{now_unix_ms, ItemId, PartId, ReactionMarker, UserRef};
use reactrack_rsvp::{Rsvp, RsvpConfig};
use reactrack_tracker::{
    MemorySink, ReactionEvent, ReactionKind, ReactionService, SinkState, TrackedItem, TrackerConfig,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One line of a replay script.
#[derive(Debug, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
enum Step {
    Create {
        owner: UserRef,
        title: String,
        #[serde(default)]
        body: String,
    },
    Edit {
        user: UserRef,
        id: ItemId,
        title: String,
        #[serde(default)]
        body: String,
    },
    Extend {
        user: UserRef,
        id: ItemId,
        qty: u32,
    },
    Delete {
        user: UserRef,
        id: ItemId,
    },
    React {
        part: PartId,
        user: UserRef,
        marker: String,
    },
    Unreact {
        part: PartId,
        user: UserRef,
        marker: String,
    },
    /// Sweeps as if `after_secs` had passed.
    Sweep {
        #[serde(default)]
        after_secs: u64,
    },
}

#[derive(Debug, Serialize)]
struct StepResult {
    line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct ReplayReport {
    steps: Vec<StepResult>,
    items: Vec<TrackedItem>,
    sink: SinkState,
}

pub(crate) async fn run(args: ReplayArgs) -> Result<()> {
    let script = tokio::fs::read_to_string(&args.script)
        .await
        .with_context(|| format!("Failed to read script {}", args.script.display()))?;
    let config = TrackerConfig::load(args.config.as_deref())?;

    let sink = Arc::new(MemorySink::default());
    let service = ReactionService::new(config, sink.clone())?;
    let rsvp = Rsvp::install(&service, RsvpConfig::default())?;
    service.start().await;

    let mut steps = Vec::new();
    for (index, raw) in script.lines().enumerate() {
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }
        let line = index + 1;
        let step: Step = serde_json::from_str(raw)
            .with_context(|| format!("Invalid step on line {line}"))?;
        // Users seen in the script resolve like they would on the platform
        if let Some(user) = step.user() {
            sink.add_user(user.clone());
        }

        let result = match apply(&service, &rsvp, step).await {
            Ok(outcome) => StepResult {
                line,
                outcome: Some(outcome),
                error: None,
            },
            Err(message) => {
                log::warn!("Line {line}: {message}");
                StepResult {
                    line,
                    outcome: None,
                    error: Some(message),
                }
            }
        };
        steps.push(result);
    }

    let report = ReplayReport {
        steps,
        items: service.registry().items(),
        sink: sink.state(),
    };
    service.shutdown().await?;
    print_json(&report)
}

/// Runs one step. Command failures come back as the owner-facing message.
async fn apply(
    service: &ReactionService,
    rsvp: &Rsvp,
    step: Step,
) -> std::result::Result<serde_json::Value, String> {
    let dispatcher = service.dispatcher();
    let value = match step {
        Step::Create { owner, title, body } => {
            let item = rsvp
                .create(owner, title, body)
                .await
                .map_err(|err| err.user_message())?;
            serde_json::json!({ "created": item.id, "parts": item.handle.parts() })
        }
        Step::Edit {
            user,
            id,
            title,
            body,
        } => {
            rsvp.edit(&user, id, title, body)
                .await
                .map_err(|err| err.user_message())?;
            serde_json::json!({ "edited": id })
        }
        Step::Extend { user, id, qty } => {
            let expires_at = rsvp
                .extend(&user, id, qty)
                .await
                .map_err(|err| err.user_message())?;
            serde_json::json!({ "extended": id, "expires_at_ms": expires_at })
        }
        Step::Delete { user, id } => {
            rsvp.delete(&user, id)
                .await
                .map_err(|err| err.user_message())?;
            serde_json::json!({ "deleted": id })
        }
        Step::React { part, user, marker } => {
            let outcome = dispatcher
                .handle_event(ReactionEvent {
                    part,
                    user,
                    marker: ReactionMarker::parse(&marker),
                    kind: ReactionKind::Added,
                })
                .await;
            serde_json::json!({ "reaction": outcome })
        }
        Step::Unreact { part, user, marker } => {
            let outcome = dispatcher
                .handle_event(ReactionEvent {
                    part,
                    user,
                    marker: ReactionMarker::parse(&marker),
                    kind: ReactionKind::Removed,
                })
                .await;
            serde_json::json!({ "reaction": outcome })
        }
        Step::Sweep { after_secs } => {
            let at = now_unix_ms().saturating_add(after_secs.saturating_mul(1000));
            serde_json::json!({ "swept": service.registry().sweep(at) })
        }
    };
    Ok(value)
}

impl Step {
    fn user(&self) -> Option<&UserRef> {
        match self {
            Self::Create { owner, .. } => Some(owner),
            Self::Edit { user, .. }
            | Self::Extend { user, .. }
            | Self::Delete { user, .. }
            | Self::React { user, .. }
            | Self::Unreact { user, .. } => Some(user),
            Self::Sweep { .. } => None,
        }
    }
}
