#![forbid(unsafe_code)]

//! Canonical key event types.
//!
//! Terminal backends disagree on how they report modified keys. In particular
//! `Ctrl+letter` arrives either as the letter with [`Modifiers::CTRL`] set or
//! as the ASCII control code (`letter - 'a' + 1`) with `CTRL` set. These types
//! carry whatever the backend delivered; normalization is the matcher's job.

use bitflags::bitflags;

bitflags! {
    /// Modifier keys held during a key event.
    ///
    /// Only [`Modifiers::TRACKED`] participates in key-binding comparison.
    /// The remaining bits exist so backends can report them without breaking
    /// existing bindings.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const CTRL  = 0b0000_0100;
        const META  = 0b0000_1000;
        const SUPER = 0b0001_0000;
        const HYPER = 0b0010_0000;
    }
}

impl Modifiers {
    /// No modifiers.
    pub const NONE: Self = Self::empty();

    /// Modifier bits compared by key bindings.
    pub const TRACKED: Self = Self::CTRL
        .union(Self::ALT)
        .union(Self::SHIFT)
        .union(Self::META);

    /// Drop every bit not in [`Modifiers::TRACKED`].
    #[inline]
    #[must_use]
    pub const fn tracked(self) -> Self {
        self.intersection(Self::TRACKED)
    }
}

/// A physical or logical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A character, including ASCII control codes (`'\u{1}'` for `^A`).
    Char(char),
    Enter,
    Escape,
    Backspace,
    Tab,
    BackTab,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    /// Function key `F1`..`F12`.
    F(u8),
}

impl KeyCode {
    /// Whether this is a character key.
    #[inline]
    #[must_use]
    pub const fn is_char(self) -> bool {
        matches!(self, Self::Char(_))
    }
}

/// Press/repeat/release phase of a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    #[default]
    Press,
    Repeat,
    Release,
}

/// A single key event as delivered by the terminal backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// A key press with no modifiers.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
            kind: KeyEventKind::Press,
        }
    }

    /// A character key press with no modifiers.
    #[must_use]
    pub const fn char(ch: char) -> Self {
        Self::new(KeyCode::Char(ch))
    }

    /// Replace the modifier set.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Replace the event kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: KeyEventKind) -> Self {
        self.kind = kind;
        self
    }

    /// The character carried by a [`KeyCode::Char`] event.
    #[must_use]
    pub const fn as_char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(ch) => Some(ch),
            _ => None,
        }
    }
}

#[cfg(all(feature = "crossterm", not(target_arch = "wasm32")))]
impl KeyEvent {
    /// Convert a crossterm key event.
    ///
    /// Returns `None` for keys with no tmplui equivalent (media keys, lock
    /// keys, bare modifier presses).
    #[must_use]
    pub fn from_crossterm(event: crossterm::event::KeyEvent) -> Option<Self> {
        use crossterm::event::{KeyCode as Ct, KeyEventKind as CtKind, KeyModifiers};

        let code = match event.code {
            Ct::Char(ch) => KeyCode::Char(ch),
            Ct::Enter => KeyCode::Enter,
            Ct::Esc => KeyCode::Escape,
            Ct::Backspace => KeyCode::Backspace,
            Ct::Tab => KeyCode::Tab,
            Ct::BackTab => KeyCode::BackTab,
            Ct::Delete => KeyCode::Delete,
            Ct::Insert => KeyCode::Insert,
            Ct::Home => KeyCode::Home,
            Ct::End => KeyCode::End,
            Ct::PageUp => KeyCode::PageUp,
            Ct::PageDown => KeyCode::PageDown,
            Ct::Up => KeyCode::Up,
            Ct::Down => KeyCode::Down,
            Ct::Left => KeyCode::Left,
            Ct::Right => KeyCode::Right,
            Ct::F(n) => KeyCode::F(n),
            _ => return None,
        };

        let mut modifiers = Modifiers::NONE;
        let src = event.modifiers;
        if src.contains(KeyModifiers::SHIFT) {
            modifiers |= Modifiers::SHIFT;
        }
        if src.contains(KeyModifiers::ALT) {
            modifiers |= Modifiers::ALT;
        }
        if src.contains(KeyModifiers::CONTROL) {
            modifiers |= Modifiers::CTRL;
        }
        if src.contains(KeyModifiers::META) {
            modifiers |= Modifiers::META;
        }
        if src.contains(KeyModifiers::SUPER) {
            modifiers |= Modifiers::SUPER;
        }
        if src.contains(KeyModifiers::HYPER) {
            modifiers |= Modifiers::HYPER;
        }

        let kind = match event.kind {
            CtKind::Press => KeyEventKind::Press,
            CtKind::Repeat => KeyEventKind::Repeat,
            CtKind::Release => KeyEventKind::Release,
        };

        Some(Self {
            code,
            modifiers,
            kind,
        })
    }
}
