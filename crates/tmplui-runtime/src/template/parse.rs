#![forbid(unsafe_code)]

//! Expression syntax: `{{ name "arg" ... }}` spans embedded in plain text.
//!
//! # Splitting
//!
//! [`split_template`] walks the text looking for the first [`OPEN`] and the
//! first [`CLOSE`] after it, repeatedly. An [`OPEN`] with no matching
//! [`CLOSE`] is kept as literal text together with everything after it.
//!
//! # Calls
//!
//! A call is a name (leading ASCII word characters) followed by an argument
//! payload. There are two payload readers and they intentionally disagree:
//!
//! - [`parse_callback_call`] keeps only double-quoted arguments. Bare words
//!   are ignored, so `switchTo main` carries zero arguments.
//! - [`parse_evaluator_call`] reads quoted arguments first and, if there are
//!   none, falls back to whitespace-separated words so that `bindState key`
//!   needs no quotes.
//!
//! The payload must fit on one line; a newline inside it makes the call
//! unparseable.

use std::borrow::Cow;

/// Opening expression marker.
pub const OPEN: &str = "{{";
/// Closing expression marker.
pub const CLOSE: &str = "}}";

/// A piece of a template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text copied to the output unchanged.
    Literal(Cow<'a, str>),
    /// Raw content between the markers (not trimmed).
    Expr(&'a str),
}

/// Split `text` into literal and expression segments.
///
/// Empty literals between adjacent spans are omitted; the relative order of
/// everything else is preserved.
#[must_use]
pub fn split_template(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = text;
    loop {
        let Some(start) = rest.find(OPEN) else {
            push_literal(&mut segments, Cow::Borrowed(rest));
            break;
        };
        push_literal(&mut segments, Cow::Borrowed(&rest[..start]));
        let body = &rest[start + OPEN.len()..];
        let Some(end) = body.find(CLOSE) else {
            // Unclosed: the opening marker stays in the output.
            push_literal(&mut segments, Cow::Borrowed(&rest[start..]));
            break;
        };
        segments.push(Segment::Expr(&body[..end]));
        rest = &body[end + CLOSE.len()..];
    }
    segments
}

fn push_literal<'a>(segments: &mut Vec<Segment<'a>>, text: Cow<'a, str>) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Literal(prev)) = segments.last_mut() {
        prev.to_mut().push_str(&text);
        return;
    }
    segments.push(Segment::Literal(text));
}

/// Trimmed content of every closed expression span in `text`.
#[must_use]
pub fn template_expressions(text: &str) -> Vec<&str> {
    split_template(text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Expr(expr) => Some(expr.trim()),
            Segment::Literal(_) => None,
        })
        .collect()
}

/// A parsed call: name plus string arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub name: String,
    pub args: Vec<String>,
}

/// Parse an action expression; only quoted arguments count.
///
/// Returns `None` when no call name can be extracted.
#[must_use]
pub fn parse_callback_call(expr: &str) -> Option<Call> {
    let (name, payload) = split_name(expr)?;
    Some(Call {
        name: name.to_string(),
        args: quoted_arguments(payload.trim()),
    })
}

/// Parse an evaluator expression; bare words are accepted when no quoted
/// argument is present.
///
/// Returns `None` when no call name can be extracted.
#[must_use]
pub fn parse_evaluator_call(expr: &str) -> Option<Call> {
    let (name, payload) = split_name(expr)?;
    let payload = payload.trim();
    let mut args = quoted_arguments(payload);
    if args.is_empty() {
        args = payload.split_whitespace().map(str::to_string).collect();
    }
    Some(Call {
        name: name.to_string(),
        args,
    })
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn is_syntax_space(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

/// Separate the leading name from the argument payload.
fn split_name(expr: &str) -> Option<(&str, &str)> {
    let expr = expr.trim();
    let name_end = expr.find(|ch: char| !is_word_char(ch)).unwrap_or(expr.len());
    if name_end == 0 {
        return None;
    }
    let (name, after) = expr.split_at(name_end);
    let payload = after.trim_start_matches(is_syntax_space);
    if payload.contains('\n') {
        return None;
    }
    Some((name, payload))
}

/// Extract double-quoted arguments; `\` escapes the next character.
fn quoted_arguments(payload: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut escaped = false;

    for ch in payload.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' if in_quote => {
                args.push(std::mem::take(&mut current));
                in_quote = false;
            }
            '"' => in_quote = true,
            _ if in_quote => current.push(ch),
            _ => {}
        }
    }
    args
}
