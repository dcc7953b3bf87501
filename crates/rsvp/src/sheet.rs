//! The sign-up sheet: what a tracked RSVP item stores and how it is shown.

use crate::config::RsvpConfig;
use crate::parse::special_markers;
use chrono::{DateTime, Utc};
use reactrack_protocol::{ItemId, ReactionMarker, UnixMillis, UserId, UserRef};
use reactrack_tracker::TrackedItem;
use std::collections::HashMap;
use std::fmt::Write as _;

const EXPIRY_FORMAT: &str = "%A %b %d - %H:%M:%S";

/// Title and body of a sheet. Stored as the item content, title on the
/// first line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsvpPost {
    pub title: String,
    pub body: String,
}

impl RsvpPost {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into().replace('\n', " "),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn from_content(content: &str) -> Self {
        match content.split_once('\n') {
            Some((title, body)) => Self::new(title, body),
            None => Self::new(content, ""),
        }
    }

    #[must_use]
    pub fn to_content(&self) -> String {
        format!("{}\n{}", self.title, self.body)
    }

    #[must_use]
    pub fn special_markers(&self) -> Vec<ReactionMarker> {
        special_markers(&self.body)
    }
}

/// Consumer data as stored on the item: the parsed special markers.
#[must_use]
pub fn markers_from_data(data: &serde_json::Value) -> Vec<ReactionMarker> {
    serde_json::from_value(data.clone()).unwrap_or_default()
}

#[must_use]
pub fn markers_to_data(markers: &[ReactionMarker]) -> serde_json::Value {
    serde_json::to_value(markers).unwrap_or(serde_json::Value::Null)
}

/// One line of the sign-up list.
#[derive(Debug, Clone, PartialEq)]
pub struct Signup<'a> {
    pub user: &'a UserRef,
    pub specials: Vec<&'a ReactionMarker>,
}

/// The owner first, then everyone with a valid sign-up reaction in the
/// order they reacted. Valid reactions matching a special marker are listed
/// next to the user.
#[must_use]
pub fn signups<'a>(
    item: &'a TrackedItem,
    signup_marker: &ReactionMarker,
    specials: &'a [ReactionMarker],
) -> Vec<Signup<'a>> {
    let mut users: Vec<&UserRef> = vec![&item.owner];
    let mut extras: HashMap<UserId, Vec<&ReactionMarker>> = HashMap::new();

    for entry in item.valid_entries() {
        if entry.marker == *signup_marker {
            if !users.contains(&&entry.user) {
                users.push(&entry.user);
            }
            continue;
        }
        for special in specials.iter().filter(|s| entry.marker == **s) {
            extras.entry(entry.user.id).or_default().push(special);
        }
    }

    users
        .into_iter()
        .map(|user| Signup {
            user,
            specials: extras.remove(&user.id).unwrap_or_default(),
        })
        .collect()
}

#[must_use]
pub fn format_expiry(expires_at_ms: UnixMillis) -> String {
    i64::try_from(expires_at_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map_or_else(
            || expires_at_ms.to_string(),
            |at| at.format(EXPIRY_FORMAT).to_string(),
        )
}

/// Full text of a sheet.
#[must_use]
pub fn render_sheet(item: &TrackedItem, config: &RsvpConfig) -> String {
    let post = RsvpPost::from_content(&item.content);
    let specials = markers_from_data(&item.consumer_data);

    let mut out = String::new();
    let _ = writeln!(out, "**{}**", post.title);
    if !post.body.trim().is_empty() {
        let _ = writeln!(out, "{}", post.body.trim_end());
    }
    out.push('\n');
    let _ = writeln!(
        out,
        "Please react to this message with {} to join.",
        config.signup_marker
    );
    out.push_str("Removing your reaction will lose your spot in the queue.\n\n");
    out.push_str("Sign-ups:\n");

    for (n, signup) in signups(item, &config.signup_marker, &specials)
        .iter()
        .enumerate()
    {
        let _ = write!(out, "{} - {}", n + 1, signup.user.display_name);
        if !signup.specials.is_empty() {
            out.push_str(" [ ");
            for special in &signup.specials {
                let _ = write!(out, "{special} ");
            }
            out.push(']');
        }
        out.push('\n');
    }

    out.push('\n');
    out.push_str(&footer(item.id, item.expires_at_ms));
    out
}

/// Text shown while a new sheet is being set up.
#[must_use]
pub fn render_draft(post: &RsvpPost, config: &RsvpConfig) -> String {
    format!(
        "**{}**\n{}\n\nPlease react to this message with {} to join.\n\nPreparing sign-ups...\n",
        post.title,
        post.body.trim_end(),
        config.signup_marker
    )
}

fn footer(id: ItemId, expires_at_ms: UnixMillis) -> String {
    format!(
        "SystemID: {id}\nExpiration Time: {} UTC\n",
        format_expiry(expires_at_ms)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reactrack_protocol::{ContentHandle, PartId, ReactionEntry};

    fn item(entries: Vec<ReactionEntry>, specials: &[ReactionMarker]) -> TrackedItem {
        TrackedItem {
            id: ItemId(77),
            owner: UserRef::new(1, "Ada"),
            content: RsvpPost::new("Raid night", "Bring potions\n🎸 bard\n").to_content(),
            handle: ContentHandle::single(PartId(77)),
            entries,
            created_at_ms: 0,
            expires_at_ms: 0,
            consumer_data: markers_to_data(specials),
            consumer_id: "rsvp".to_string(),
        }
    }

    fn entry(user: UserRef, marker: ReactionMarker, valid: bool) -> ReactionEntry {
        let mut entry = ReactionEntry::new(user, marker, 0);
        entry.valid = valid;
        entry
    }

    #[test]
    fn post_round_trips_through_content() {
        let post = RsvpPost::new("Title", "line one\nline two");
        assert_eq!(RsvpPost::from_content(&post.to_content()), post);
        assert_eq!(RsvpPost::from_content("only title").body, "");
        assert_eq!(RsvpPost::new("two\nlines", "").title, "two lines");
    }

    #[test]
    fn owner_is_first_and_signups_keep_reaction_order() {
        let config = RsvpConfig::default();
        let signup = config.signup_marker.clone();
        let bard = ReactionMarker::symbolic("🎸");
        let grace = UserRef::new(2, "Grace");
        let linus = UserRef::new(3, "Linus");

        let item = item(
            vec![
                entry(linus.clone(), signup.clone(), false),
                entry(grace.clone(), signup.clone(), true),
                entry(UserRef::new(1, "Ada"), signup.clone(), true),
                entry(linus.clone(), signup.clone(), true),
                entry(grace.clone(), signup.clone(), true),
                entry(grace.clone(), bard.clone(), true),
                entry(linus.clone(), bard.clone(), false),
            ],
            &[bard],
        );

        let specials = markers_from_data(&item.consumer_data);
        let list = signups(&item, &signup, &specials);
        let names: Vec<&str> = list.iter().map(|s| s.user.display_name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Grace", "Linus"]);
        assert_eq!(list[1].specials.len(), 1);
        assert!(list[2].specials.is_empty());
    }

    #[test]
    fn sheet_lists_specials_and_footer() {
        let config = RsvpConfig::default();
        let bard = ReactionMarker::symbolic("🎸");
        let item = item(
            vec![
                entry(UserRef::new(2, "Grace"), config.signup_marker.clone(), true),
                entry(UserRef::new(2, "Grace"), bard.clone(), true),
            ],
            &[bard],
        );

        let text = render_sheet(&item, &config);
        assert!(text.starts_with("**Raid night**\nBring potions\n🎸 bard\n\n"));
        assert!(text.contains("with <:tempest:556941054277058560> to join."));
        assert!(text.contains("Sign-ups:\n1 - Ada\n2 - Grace [ 🎸 ]\n\n"));
        assert!(text.ends_with(
            "SystemID: 77\nExpiration Time: Thursday Jan 01 - 00:00:00 UTC\n"
        ));
    }

    #[test]
    fn expiry_is_formatted_in_utc() {
        assert_eq!(format_expiry(86_400_000), "Friday Jan 02 - 00:00:00");
    }
}
