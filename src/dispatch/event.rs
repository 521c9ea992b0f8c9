//! Keyboard events as delivered by the host.

use crate::config::{Modifier, is_shortcut_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Down,
    Up,
}

/// A key press or release, modelled on `KeyboardEvent`.
///
/// `key` is the produced value (`"s"`, `"S"`, `"Alt"`), `code` the
/// physical key (`"KeyS"`, `"Digit1"`) when the host knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub kind: KeyEventKind,
    pub key: String,
    pub code: Option<String>,
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl KeyEvent {
    pub fn down(key: &str) -> Self {
        Self::new(KeyEventKind::Down, key)
    }

    pub fn up(key: &str) -> Self {
        Self::new(KeyEventKind::Up, key)
    }

    fn new(kind: KeyEventKind, key: &str) -> Self {
        Self {
            kind,
            key: key.to_string(),
            code: None,
            alt: false,
            ctrl: false,
            meta: false,
            shift: false,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    /// Mark `modifier` as held.
    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        match modifier {
            Modifier::Alt => self.alt = true,
            Modifier::Ctrl => self.ctrl = true,
            Modifier::Cmd => self.meta = true,
        }
        self
    }

    pub fn modifier_held(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Alt => self.alt,
            Modifier::Ctrl => self.ctrl,
            Modifier::Cmd => self.meta,
        }
    }

    /// Whether this event is the modifier key itself going down or up.
    pub fn is_modifier_key(&self, modifier: Modifier) -> bool {
        self.key == modifier.key_name()
    }

    /// The shortcut key this event names, if any.
    ///
    /// The produced `key` wins so the letter the user sees is the letter
    /// that fires on any layout. The physical code is the fallback: with
    /// Option held on macOS, `key` is the composed character (`ß` for
    /// `s`) while `code` is still `KeyS`.
    pub fn shortcut_key(&self) -> Option<char> {
        let mut chars = self.key.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            let c = c.to_ascii_lowercase();
            if is_shortcut_key(c) {
                return Some(c);
            }
        }
        self.code.as_deref().and_then(code_to_key)
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

fn code_to_key(code: &str) -> Option<char> {
    let rest = code.strip_prefix("Key").or_else(|| code.strip_prefix("Digit"))?;
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => {
            let c = c.to_ascii_lowercase();
            is_shortcut_key(c).then_some(c)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortcut_key_prefers_produced_key() {
        // AZERTY: the key labelled "a" sits where QWERTY has "q".
        let ev = KeyEvent::down("a").with_code("KeyQ");
        assert_eq!(ev.shortcut_key(), Some('a'));

        let ev = KeyEvent::down("O").with_code("KeyS");
        assert_eq!(ev.shortcut_key(), Some('o'));
    }

    #[test]
    fn shortcut_key_uses_code_for_composed_characters() {
        let ev = KeyEvent::down("ß").with_code("KeyS");
        assert_eq!(ev.shortcut_key(), Some('s'));

        let ev = KeyEvent::down("¡").with_code("Digit1");
        assert_eq!(ev.shortcut_key(), Some('1'));
    }

    #[test]
    fn shortcut_key_without_code() {
        assert_eq!(KeyEvent::down("S").shortcut_key(), Some('s'));
        assert_eq!(KeyEvent::down("Enter").shortcut_key(), None);
        assert_eq!(KeyEvent::down("ß").shortcut_key(), None);
        assert_eq!(KeyEvent::down("/").with_code("Slash").shortcut_key(), None);
    }

    #[test]
    fn modifier_flags() {
        let ev = KeyEvent::down("s").with_modifier(Modifier::Cmd);
        assert!(ev.meta);
        assert!(ev.modifier_held(Modifier::Cmd));
        assert!(!ev.modifier_held(Modifier::Alt));
        assert!(KeyEvent::down("Control").is_modifier_key(Modifier::Ctrl));
    }
}
