#![forbid(unsafe_code)]

//! Global key bindings: a key description paired with an action expression.
//!
//! # Matching rules
//!
//! Only `Ctrl`, `Alt`, `Shift` and `Meta` take part in the modifier
//! comparison. Named keys compare by key code. Characters compare
//! case-insensitively, except that `Ctrl` plus an ASCII letter also accepts
//! the ASCII control code terminals report for it (`Ctrl+A` is `0x01`):
//!
//! | binding  | accepted event characters       |
//! |----------|---------------------------------|
//! | `Ctrl+q` | `0x11`, `q`                     |
//! | `Ctrl+Q` | `0x11`, `Q`, `q`                |
//! | `Alt+x`  | `x`, `X`                        |
//!
//! A binding whose key description does not parse never matches.

use tmplui_core::event::{KeyCode, KeyEvent, KeyEventKind, Modifiers};
use tmplui_core::keys::{KeyParseError, KeySpec, parse_key};

use crate::template::Executor;

/// A key description and the action it triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyBinding {
    /// Key description such as `"Ctrl+Q"`.
    pub key: String,
    /// Action expression such as `"{{ stopApp }}"`.
    pub action: String,
}

impl KeyBinding {
    pub fn new(key: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            action: action.into(),
        }
    }

    /// Parse [`KeyBinding::key`].
    pub fn spec(&self) -> Result<KeySpec, KeyParseError> {
        parse_key(&self.key)
    }
}

/// Result of offering an event to a set of bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDispatch {
    /// The binding at `index` matched and its action ran.
    Handled { index: usize },
    /// Nothing matched, or no matching action could be built.
    Ignored,
}

impl KeyDispatch {
    #[must_use]
    pub const fn is_handled(&self) -> bool {
        matches!(self, Self::Handled { .. })
    }
}

/// ASCII control code for `letter` (`a`/`A` -> `0x01`).
const fn control_code(letter: char) -> char {
    ((letter.to_ascii_lowercase() as u8) - b'a' + 1) as char
}

/// Whether `event` satisfies the parsed `spec`.
#[must_use]
pub fn matches_spec(event: &KeyEvent, spec: &KeySpec) -> bool {
    if event.modifiers.tracked() != spec.modifiers.tracked() {
        return false;
    }
    match (spec.code, event.code) {
        (KeyCode::Char(want), KeyCode::Char(got)) => {
            if spec.modifiers.contains(Modifiers::CTRL) && want.is_ascii_alphabetic() {
                if got == control_code(want) || got == want {
                    return true;
                }
                return want.is_ascii_uppercase() && got == want.to_ascii_lowercase();
            }
            got.to_lowercase().eq(want.to_lowercase())
        }
        (want, got) => want == got,
    }
}

/// Whether `event` triggers `binding`.
#[must_use]
pub fn matches(event: &KeyEvent, binding: &KeyBinding) -> bool {
    binding.spec().is_ok_and(|spec| matches_spec(event, &spec))
}

/// Run the first matching binding whose action builds.
///
/// A matching binding whose action fails to build is skipped, and later
/// bindings are still tried. Key releases are never dispatched.
pub fn dispatch_key(event: &KeyEvent, bindings: &[KeyBinding], executor: &Executor) -> KeyDispatch {
    if event.kind == KeyEventKind::Release {
        return KeyDispatch::Ignored;
    }
    for (index, binding) in bindings.iter().enumerate() {
        if !matches(event, binding) {
            continue;
        }
        match executor.execute_callback(&binding.action) {
            Ok(callback) => {
                tracing::debug!(key = %binding.key, action = %binding.action, "key binding fired");
                callback();
                return KeyDispatch::Handled { index };
            }
            Err(err) => {
                tracing::debug!(key = %binding.key, error = %err, "key binding action not runnable");
            }
        }
    }
    KeyDispatch::Ignored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::state::StateValue;
    use crate::template::FunctionRegistry;
    use std::sync::Arc;

    fn key(ch: char, modifiers: Modifiers) -> KeyEvent {
        KeyEvent::char(ch).with_modifiers(modifiers)
    }

    #[test]
    fn ctrl_lowercase_accepts_code_or_letter() {
        let binding = KeyBinding::new("Ctrl+q", "{{ noop }}");
        assert!(matches(&key('\u{11}', Modifiers::CTRL), &binding));
        assert!(matches(&key('q', Modifiers::CTRL), &binding));
        assert!(!matches(&key('Q', Modifiers::CTRL), &binding));
        assert!(!matches(&key('q', Modifiers::NONE), &binding));
    }

    #[test]
    fn ctrl_uppercase_accepts_code_letter_or_lowercase() {
        let binding = KeyBinding::new("Ctrl+Q", "{{ noop }}");
        assert!(matches(&key('\u{11}', Modifiers::CTRL), &binding));
        assert!(matches(&key('Q', Modifiers::CTRL), &binding));
        assert!(matches(&key('q', Modifiers::CTRL), &binding));
        assert!(!matches(&key('w', Modifiers::CTRL), &binding));
    }

    #[test]
    fn plain_chars_ignore_case() {
        let binding = KeyBinding::new("x", "{{ noop }}");
        assert!(matches(&key('x', Modifiers::NONE), &binding));
        assert!(matches(&key('X', Modifiers::NONE), &binding));
        assert!(!matches(&key('x', Modifiers::ALT), &binding));

        let alt = KeyBinding::new("Alt+x", "{{ noop }}");
        assert!(matches(&key('X', Modifiers::ALT), &alt));
    }

    #[test]
    fn untracked_modifiers_are_ignored() {
        let binding = KeyBinding::new("Ctrl+s", "{{ noop }}");
        assert!(matches(
            &key('s', Modifiers::CTRL | Modifiers::SUPER | Modifiers::HYPER),
            &binding
        ));
    }

    #[test]
    fn named_keys_compare_codes() {
        let esc = KeyBinding::new("Escape", "{{ noop }}");
        assert!(matches(&KeyEvent::new(KeyCode::Escape), &esc));
        assert!(!matches(&KeyEvent::new(KeyCode::Enter), &esc));
        let shift_tab = KeyBinding::new("Shift+Tab", "{{ noop }}");
        assert!(matches(
            &KeyEvent::new(KeyCode::Tab).with_modifiers(Modifiers::SHIFT),
            &shift_tab
        ));
        assert!(!matches(&KeyEvent::new(KeyCode::Tab), &shift_tab));
    }

    #[test]
    fn invalid_binding_never_matches() {
        let binding = KeyBinding::new("InvalidKey", "{{ noop }}");
        assert!(binding.spec().is_err());
        assert!(!matches(&key('I', Modifiers::NONE), &binding));
    }

    #[test]
    fn dispatch_skips_unbuildable_actions() {
        let exec = Executor::new(Arc::new(Context::new()), Arc::new(FunctionRegistry::new()));
        let bindings = [
            KeyBinding::new("Ctrl+N", "{{ missingAction }}"),
            KeyBinding::new("Ctrl+N", r#"{{ showNotification "new" }}"#),
            KeyBinding::new("Ctrl+N", r#"{{ showNotification "shadowed" }}"#),
        ];
        let outcome = dispatch_key(&key('\u{0e}', Modifiers::CTRL), &bindings, &exec);
        assert_eq!(outcome, KeyDispatch::Handled { index: 1 });
        assert_eq!(
            exec.context().get_state("notification"),
            Some(StateValue::from("new"))
        );

        let release = key('\u{0e}', Modifiers::CTRL).with_kind(KeyEventKind::Release);
        assert_eq!(dispatch_key(&release, &bindings, &exec), KeyDispatch::Ignored);

        let outcome = dispatch_key(&key('z', Modifiers::NONE), &bindings, &exec);
        assert_eq!(outcome, KeyDispatch::Ignored);
        assert!(!outcome.is_handled());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn bindings_load_from_json() {
        let json = r#"[
            {"key": "Ctrl+Q", "action": "{{ stopApp }}"},
            {"key": "F5", "action": "{{ showNotification \"refresh\" }}"}
        ]"#;
        let bindings: Vec<KeyBinding> = serde_json::from_str(json).expect("valid bindings");
        assert_eq!(bindings[0], KeyBinding::new("Ctrl+Q", "{{ stopApp }}"));
        assert!(matches(&KeyEvent::new(KeyCode::F(5)), &bindings[1]));
    }
}
