//! Special markers: reactions announced at the start of a line in the body.

use once_cell::sync::Lazy;
use reactrack_protocol::ReactionMarker;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

static CUSTOM_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<a?:(\w+):(\d+)>").expect("custom marker pattern compiles"));

/// Markers that open a line of `body`, first occurrence first, each once.
///
/// A line counts when, after leading whitespace, it starts with a custom
/// marker (`<:name:id>`) or with an emoji grapheme.
#[must_use]
pub fn special_markers(body: &str) -> Vec<ReactionMarker> {
    let mut markers: Vec<ReactionMarker> = Vec::new();
    for line in body.lines() {
        let Some(marker) = leading_marker(line.trim_start()) else {
            continue;
        };
        if !markers.contains(&marker) {
            markers.push(marker);
        }
    }
    markers
}

fn leading_marker(line: &str) -> Option<ReactionMarker> {
    if let Some(caps) = CUSTOM_MARKER.captures(line) {
        let id = caps[2].parse::<u64>().ok()?;
        return Some(ReactionMarker::identified(&caps[1], Some(id)));
    }

    let grapheme = line.graphemes(true).next()?;
    let first = grapheme.chars().next()?;
    is_emoji_start(first).then(|| ReactionMarker::symbolic(grapheme))
}

/// Code points that begin an emoji presentation sequence.
fn is_emoji_start(c: char) -> bool {
    matches!(
        u32::from(c),
        0x00A9 | 0x00AE
            | 0x203C | 0x2049 | 0x2122 | 0x2139
            | 0x2194..=0x2199
            | 0x21A9..=0x21AA
            | 0x231A..=0x231B
            | 0x2328 | 0x23CF
            | 0x23E9..=0x23F3
            | 0x23F8..=0x23FA
            | 0x24C2
            | 0x25AA..=0x25AB
            | 0x25B6 | 0x25C0
            | 0x25FB..=0x25FE
            | 0x2600..=0x27BF
            | 0x2934..=0x2935
            | 0x2B05..=0x2B55
            | 0x3030 | 0x303D | 0x3297 | 0x3299
            | 0x1F000..=0x1FAFF
    )
}
