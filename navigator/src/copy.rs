//! Turns a highlighted block of rendered text into the compact string that
//! goes to the clipboard.

use crate::clipboard::ClipboardError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyMode {
    /// The whole entry, `"key": value`.
    #[default]
    Full,
    /// Only the value, without the leading `"key":`.
    Value,
}

#[derive(Debug, Error)]
pub enum CopyError {
    #[error("nothing is selected")]
    NothingSelected,
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
}

/// Collapses whitespace outside string literals, trims the result and any
/// trailing comma, and spaces braces as `{ ... }`. In [`CopyMode::Value`]
/// a leading `"key":` is dropped as well.
pub fn clean_selection(text: &str, mode: CopyMode) -> String {
    let collapsed = collapse_whitespace(text);
    let trimmed = collapsed.trim();
    let trimmed = trimmed.strip_suffix(',').unwrap_or(trimmed).trim_end();
    let spaced = space_braces(trimmed);
    match mode {
        CopyMode::Full => spaced,
        CopyMode::Value => strip_key(&spaced).to_string(),
    }
}

/// Walks `text` yielding each char with whether it sits inside a string
/// literal (quotes included).
fn scan(text: &str) -> impl Iterator<Item = (char, bool)> + '_ {
    let mut in_string = false;
    let mut escaped = false;
    text.chars().map(move |ch| {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            (ch, true)
        } else {
            if ch == '"' {
                in_string = true;
            }
            (ch, in_string)
        }
    })
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for (ch, quoted) in scan(text) {
        if !quoted && ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(ch);
    }
    if pending_space {
        out.push(' ');
    }
    out
}

fn space_braces(text: &str) -> String {
    let chars: Vec<(char, bool)> = scan(text).collect();
    let mut out = String::with_capacity(text.len() + 4);
    for (index, &(ch, quoted)) in chars.iter().enumerate() {
        if quoted {
            out.push(ch);
            continue;
        }
        match ch {
            '{' => {
                out.push('{');
                let next = chars.get(index + 1).map(|&(next, _)| next);
                if !matches!(next, Some(' ') | Some('}') | None) {
                    out.push(' ');
                }
            }
            '}' => {
                if !(out.ends_with(' ') || out.ends_with('{')) {
                    out.push(' ');
                }
                out.push('}');
            }
            ch => out.push(ch),
        }
    }
    out
}

/// `"key": value` → `value`; anything else is returned unchanged.
fn strip_key(text: &str) -> &str {
    if !text.starts_with('"') {
        return text;
    }
    let mut escaped = false;
    let mut closing = None;
    for (index, ch) in text.char_indices().skip(1) {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => {
                closing = Some(index);
                break;
            }
            _ => {}
        }
    }
    let Some(closing) = closing else {
        return text;
    };
    let rest = text[closing + 1..].trim_start();
    match rest.strip_prefix(':') {
        Some(value) => value.trim_start(),
        None => text,
    }
}
