//! Breaks text into the indivisible units the packer allocates.

use crate::error::{ChunkerError, Result};

/// A run of text that is never split across segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Unit {
    pub text: String,
    /// Length in characters
    pub len: usize,
}

impl Unit {
    fn new(text: String) -> Self {
        let len = text.chars().count();
        Self { text, len }
    }
}

/// Splits `text` into units no longer than `max_len`.
///
/// Lines keep their terminators. Over-long lines are re-wrapped on
/// whitespace. Everything from an opening `fence` to the matching closing
/// fence (both included) becomes a single unit.
pub(crate) fn build_units(text: &str, max_len: usize, fence: &str) -> Result<Vec<Unit>> {
    let mut units = Vec::new();
    let mut block: Option<String> = None;

    for line in text.split_inclusive('\n') {
        let mut rest = line;
        while !rest.is_empty() {
            match block.take() {
                Some(mut open) => {
                    let Some(pos) = rest.find(fence) else {
                        open.push_str(rest);
                        block = Some(open);
                        break;
                    };
                    let end = pos + fence.len();
                    open.push_str(&rest[..end]);
                    rest = &rest[end..];

                    let mut unit = close_block(open, max_len)?;
                    if is_line_terminator(rest) && unit.len + rest.len() <= max_len {
                        unit.text.push_str(rest);
                        unit.len += rest.len();
                        rest = "";
                    }
                    units.push(unit);
                }
                None => {
                    let Some(pos) = rest.find(fence) else {
                        push_plain(&mut units, rest, max_len)?;
                        break;
                    };
                    if pos > 0 {
                        push_plain(&mut units, &rest[..pos], max_len)?;
                    }
                    block = Some(fence.to_string());
                    rest = &rest[pos + fence.len()..];
                }
            }
        }
    }

    if let Some(open) = block {
        log::debug!(
            "unterminated fenced block ({} chars) kept as one unit",
            open.chars().count()
        );
        units.push(close_block(open, max_len)?);
    }

    Ok(units)
}

fn close_block(text: String, max_len: usize) -> Result<Unit> {
    let unit = Unit::new(text);
    if unit.len > max_len {
        return Err(ChunkerError::AtomicBlockTooLarge {
            len: unit.len,
            max_len,
        });
    }
    Ok(unit)
}

fn is_line_terminator(s: &str) -> bool {
    s == "\n" || s == "\r\n"
}

fn push_plain(units: &mut Vec<Unit>, segment: &str, max_len: usize) -> Result<()> {
    let unit = Unit::new(segment.to_string());
    if unit.len <= max_len {
        units.push(unit);
    } else {
        units.extend(wrap_line(segment, max_len)?);
    }
    Ok(())
}

/// Greedy word wrap of a single over-long line.
///
/// Words are re-joined with single spaces; the space at each break stays at
/// the end of the earlier piece when it fits. The line terminator, if any,
/// ends the last piece.
pub(crate) fn wrap_line(line: &str, max_len: usize) -> Result<Vec<Unit>> {
    let (body, terminator) = if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    };

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in body.split_whitespace() {
        let word_len = word.chars().count();
        if word_len > max_len {
            return Err(ChunkerError::UnsplittableWord {
                word: word.to_string(),
                len: word_len,
                max_len,
            });
        }

        if current_len == 0 {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len > max_len {
            if current_len < max_len {
                current.push(' ');
                current_len += 1;
            }
            pieces.push(Unit {
                text: std::mem::take(&mut current),
                len: current_len,
            });
            current.push_str(word);
            current_len = word_len;
        } else {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        }
    }

    if !terminator.is_empty() {
        if current_len + terminator.len() > max_len {
            pieces.push(Unit {
                text: std::mem::take(&mut current),
                len: current_len,
            });
            current_len = 0;
        }
        current.push_str(terminator);
        current_len += terminator.len();
    }

    if current_len > 0 {
        pieces.push(Unit {
            text: current,
            len: current_len,
        });
    }

    Ok(pieces)
}
