use crate::{print_json, print_stdout, SplitArgs};
use anyhow::{Context as AnyhowContext, Result};
use reactrack_text_chunker::{Chunker, SplitterConfig};
use std::io::Read;

pub(crate) fn run(args: SplitArgs) -> Result<()> {
    let text = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            text
        }
    };

    let chunker = Chunker::new(SplitterConfig {
        max_len: args.max_len,
        policy: args.policy.into(),
        min_slots: args.min_slots,
        reserve_slots: args.reserve,
        ..SplitterConfig::default()
    })?;
    let slots = args.slots.unwrap_or_else(|| chunker.slot_count(&text));
    let set = chunker
        .split(&text, slots)
        .with_context(|| format!("Cannot lay out {} characters", text.chars().count()))?;
    log::info!("Split into {} segments", set.len());

    if args.json {
        return print_json(&set.contents().collect::<Vec<_>>());
    }

    for (index, segment) in set.contents().enumerate() {
        print_stdout(&format!(
            "--- segment {} ({} chars) ---\n{segment}",
            index + 1,
            segment.chars().count()
        ))?;
    }
    Ok(())
}
