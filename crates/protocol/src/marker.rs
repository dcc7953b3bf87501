use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reaction symbol, normalized across the two forms the platform delivers.
///
/// Equality is deliberately partial and not transitive:
///
/// * two `Symbolic` markers are equal iff their texts are equal;
/// * a `Symbolic` and an `Identified` marker are equal iff the text equals the
///   identified marker's `name`;
/// * two `Identified` markers are equal iff both carry an id and the ids match,
///   otherwise iff their names match.
///
/// Because of this the type implements `PartialEq` only, never `Eq` or `Hash`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReactionMarker {
    /// A plain unicode symbol.
    Symbolic { text: String },
    /// A platform-issued custom symbol.
    Identified {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
    },
}

impl ReactionMarker {
    pub fn symbolic(text: impl Into<String>) -> Self {
        Self::Symbolic { text: text.into() }
    }

    pub fn identified(name: impl Into<String>, id: Option<u64>) -> Self {
        Self::Identified {
            name: name.into(),
            id,
        }
    }

    /// Parses the textual form produced by `Display`: `<:name:id>` (or the
    /// animated `<a:name:id>`) yields an identified marker, anything else is
    /// symbolic.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(inner) = trimmed
            .strip_prefix("<a:")
            .or_else(|| trimmed.strip_prefix("<:"))
            .and_then(|rest| rest.strip_suffix('>'))
        {
            if let Some((name, id)) = inner.rsplit_once(':') {
                if let Ok(id) = id.parse::<u64>() {
                    if !name.is_empty() {
                        return Self::identified(name, Some(id));
                    }
                }
            }
        }
        Self::symbolic(trimmed)
    }

    /// The name the marker is known by: the text of a symbolic marker or the
    /// name of an identified one.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Symbolic { text } => text,
            Self::Identified { name, .. } => name,
        }
    }
}

impl PartialEq for ReactionMarker {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Symbolic { text: a }, Self::Symbolic { text: b }) => a == b,
            (Self::Symbolic { text }, Self::Identified { name, .. })
            | (Self::Identified { name, .. }, Self::Symbolic { text }) => text == name,
            (
                Self::Identified {
                    name: name_a,
                    id: id_a,
                },
                Self::Identified {
                    name: name_b,
                    id: id_b,
                },
            ) => match (id_a, id_b) {
                (Some(a), Some(b)) => a == b,
                _ => name_a == name_b,
            },
        }
    }
}

impl fmt::Display for ReactionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symbolic { text } => f.write_str(text),
            Self::Identified { name, id: Some(id) } => write!(f, "<:{name}:{id}>"),
            Self::Identified { name, id: None } => f.write_str(name),
        }
    }
}
