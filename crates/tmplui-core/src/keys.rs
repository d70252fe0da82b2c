#![forbid(unsafe_code)]

//! Parsing of textual key descriptions such as `"Ctrl+Q"` or `"Shift+Tab"`.
//!
//! Grammar: zero or more `+`-separated modifiers followed by one key.
//!
//! - Modifiers (case-insensitive): `ctrl`/`control`, `alt`, `meta`, `shift`.
//! - Named keys (case-insensitive): `escape`/`esc`, `enter`/`return`, `tab`,
//!   `backtab`, `backspace`/`bs`, `delete`/`del`, `insert`/`ins`, `up`,
//!   `down`, `left`, `right`, `home`, `end`, `pgup`/`pageup`,
//!   `pgdn`/`pagedown`, `space`.
//! - Function keys `F1`..`F12`; text after the number is ignored.
//! - Any single character, kept exactly as written (case is the matcher's
//!   concern).

use thiserror::Error;

use crate::event::{KeyCode, Modifiers};

/// A parsed key description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeySpec {
    /// The character for character keys.
    #[must_use]
    pub const fn char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(ch) => Some(ch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("empty key string")]
    Empty,

    #[error("unknown modifier: {0}")]
    UnknownModifier(String),

    #[error("unknown key: {0}")]
    UnknownKey(String),
}

/// Parse a key description.
pub fn parse_key(desc: &str) -> Result<KeySpec, KeyParseError> {
    let desc = desc.trim();
    if desc.is_empty() {
        return Err(KeyParseError::Empty);
    }

    let parts: Vec<&str> = desc.split('+').collect();
    let (key_part, modifier_parts) = match parts.split_last() {
        Some(split) => split,
        None => return Err(KeyParseError::Empty),
    };

    let mut modifiers = Modifiers::NONE;
    for raw in modifier_parts {
        modifiers |= match raw.trim().to_ascii_lowercase().as_str() {
            "ctrl" | "control" => Modifiers::CTRL,
            "alt" => Modifiers::ALT,
            "meta" => Modifiers::META,
            "shift" => Modifiers::SHIFT,
            _ => return Err(KeyParseError::UnknownModifier((*raw).to_string())),
        };
    }

    let key = key_part.trim();
    let code = parse_key_code(key).ok_or_else(|| KeyParseError::UnknownKey(key.to_string()))?;
    Ok(KeySpec { code, modifiers })
}

fn parse_key_code(key: &str) -> Option<KeyCode> {
    let lower = key.to_ascii_lowercase();
    let named = match lower.as_str() {
        "escape" | "esc" => Some(KeyCode::Escape),
        "enter" | "return" => Some(KeyCode::Enter),
        "tab" => Some(KeyCode::Tab),
        "backtab" => Some(KeyCode::BackTab),
        "backspace" | "bs" => Some(KeyCode::Backspace),
        "delete" | "del" => Some(KeyCode::Delete),
        "insert" | "ins" => Some(KeyCode::Insert),
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "home" => Some(KeyCode::Home),
        "end" => Some(KeyCode::End),
        "pgup" | "pageup" => Some(KeyCode::PageUp),
        "pgdn" | "pagedown" => Some(KeyCode::PageDown),
        "space" => Some(KeyCode::Char(' ')),
        _ => None,
    };
    if named.is_some() {
        return named;
    }

    if let Some(n) = function_key_number(&lower)
        && (1..=12).contains(&n)
    {
        return Some(KeyCode::F(n));
    }

    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Some(KeyCode::Char(ch)),
        _ => None,
    }
}

/// Number of an `f<digits>` key. Text after the digits is ignored, so `f1x`
/// reads as `f1`.
fn function_key_number(lower: &str) -> Option<u8> {
    let rest = lower.strip_prefix('f')?;
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(code: KeyCode, modifiers: Modifiers) -> KeySpec {
        KeySpec { code, modifiers }
    }

    #[test]
    fn named_keys_and_aliases() {
        let cases = [
            ("Escape", KeyCode::Escape),
            ("esc", KeyCode::Escape),
            ("Enter", KeyCode::Enter),
            ("return", KeyCode::Enter),
            ("Tab", KeyCode::Tab),
            ("Backtab", KeyCode::BackTab),
            ("bs", KeyCode::Backspace),
            ("del", KeyCode::Delete),
            ("ins", KeyCode::Insert),
            ("Up", KeyCode::Up),
            ("Down", KeyCode::Down),
            ("Left", KeyCode::Left),
            ("Right", KeyCode::Right),
            ("Home", KeyCode::Home),
            ("End", KeyCode::End),
            ("PgUp", KeyCode::PageUp),
            ("PageUp", KeyCode::PageUp),
            ("PgDn", KeyCode::PageDown),
            ("PageDown", KeyCode::PageDown),
        ];
        for (input, code) in cases {
            assert_eq!(parse_key(input), Ok(spec(code, Modifiers::NONE)), "{input}");
        }
    }

    #[test]
    fn function_keys() {
        assert_eq!(parse_key("F1"), Ok(spec(KeyCode::F(1), Modifiers::NONE)));
        assert_eq!(parse_key("f12"), Ok(spec(KeyCode::F(12), Modifiers::NONE)));
        assert_eq!(
            parse_key("F13"),
            Err(KeyParseError::UnknownKey("F13".to_string()))
        );
    }

    #[test]
    fn function_keys_ignore_trailing_text() {
        assert_eq!(parse_key("F1x"), Ok(spec(KeyCode::F(1), Modifiers::NONE)));
        assert_eq!(
            parse_key("Alt+f05 "),
            Ok(spec(KeyCode::F(5), Modifiers::ALT))
        );
        assert_eq!(
            parse_key("Fx1"),
            Err(KeyParseError::UnknownKey("Fx1".to_string()))
        );
        assert_eq!(
            parse_key("F13x"),
            Err(KeyParseError::UnknownKey("F13x".to_string()))
        );
    }

    #[test]
    fn single_characters_keep_case() {
        assert_eq!(parse_key("a"), Ok(spec(KeyCode::Char('a'), Modifiers::NONE)));
        assert_eq!(parse_key("Q"), Ok(spec(KeyCode::Char('Q'), Modifiers::NONE)));
        assert_eq!(parse_key("f"), Ok(spec(KeyCode::Char('f'), Modifiers::NONE)));
        assert_eq!(parse_key("ñ"), Ok(spec(KeyCode::Char('ñ'), Modifiers::NONE)));
        assert_eq!(parse_key("space"), Ok(spec(KeyCode::Char(' '), Modifiers::NONE)));
    }

    #[test]
    fn modifiers_accumulate() {
        assert_eq!(
            parse_key("Ctrl+Q"),
            Ok(spec(KeyCode::Char('Q'), Modifiers::CTRL))
        );
        assert_eq!(
            parse_key("Control+Q"),
            Ok(spec(KeyCode::Char('Q'), Modifiers::CTRL))
        );
        assert_eq!(
            parse_key("Ctrl+Alt+Shift+Enter"),
            Ok(spec(
                KeyCode::Enter,
                Modifiers::CTRL | Modifiers::ALT | Modifiers::SHIFT
            ))
        );
        assert_eq!(
            parse_key(" meta + a "),
            Ok(spec(KeyCode::Char('a'), Modifiers::META))
        );
    }

    #[test]
    fn errors() {
        assert_eq!(parse_key(""), Err(KeyParseError::Empty));
        assert_eq!(parse_key("   "), Err(KeyParseError::Empty));
        assert_eq!(
            parse_key("Hyper+Q"),
            Err(KeyParseError::UnknownModifier("Hyper".to_string()))
        );
        assert_eq!(
            parse_key("InvalidKey"),
            Err(KeyParseError::UnknownKey("InvalidKey".to_string()))
        );
        assert!(parse_key("Ctrl+").is_err());
    }
}
