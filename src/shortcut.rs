//! Canonical shortcut bindings and the key-event normalizer.
//!
//! A binding is written as `Ctrl+Alt+Shift+Meta+Key` with the modifiers that are
//! present, always in that order, followed by exactly one non-modifier key. Two
//! presses of the same combination normalize to the same string no matter which
//! modifier went down first.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default activation shortcut (Ctrl+Alt+Shift+G)
pub const DEFAULT_SHORTCUT: &str = "Ctrl+Alt+Shift+G";

/// Physical key codes that only ever act as modifiers.
const MODIFIER_CODES: &[&str] = &[
    "Control",
    "ControlLeft",
    "ControlRight",
    "Alt",
    "AltLeft",
    "AltRight",
    "AltGraph",
    "Shift",
    "ShiftLeft",
    "ShiftRight",
    "Meta",
    "MetaLeft",
    "MetaRight",
    "OS",
    "OSLeft",
    "OSRight",
];

/// Named keys with a fixed spelling in canonical bindings.
const NAMED_KEYS: &[&str] = &[
    "Space",
    "Enter",
    "Tab",
    "Escape",
    "Backspace",
    "Delete",
    "Insert",
    "Home",
    "End",
    "PageUp",
    "PageDown",
    "ArrowUp",
    "ArrowDown",
    "ArrowLeft",
    "ArrowRight",
    "CapsLock",
    "PrintScreen",
    "Pause",
    "Backquote",
    "Minus",
    "Equal",
    "BracketLeft",
    "BracketRight",
    "Backslash",
    "Semicolon",
    "Quote",
    "Comma",
    "Period",
    "Slash",
];

/// A raw key press as reported by the UI shell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub meta: bool,
    /// Physical key identifier, e.g. `KeyG`, `Space`, `ShiftLeft`
    pub code: String,
}

impl KeyEvent {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    fn modifiers(&self) -> Modifiers {
        Modifiers {
            ctrl: self.ctrl,
            alt: self.alt,
            shift: self.shift,
            meta: self.meta,
        }
    }
}

/// Modifier flags of a binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn is_empty(&self) -> bool {
        !(self.ctrl || self.alt || self.shift || self.meta)
    }

    /// Modifier tokens in canonical order.
    pub fn tokens(&self) -> Vec<&'static str> {
        [
            (self.ctrl, "Ctrl"),
            (self.alt, "Alt"),
            (self.shift, "Shift"),
            (self.meta, "Meta"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }
}

/// A validated key combination. Always holds exactly one non-modifier key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShortcutBinding {
    modifiers: Modifiers,
    key: String,
}

impl ShortcutBinding {
    /// Build a binding from modifier flags and a key token.
    ///
    /// Returns `None` when the key is empty or is itself a modifier.
    pub fn new(modifiers: Modifiers, key: &str) -> Option<Self> {
        let key = canonical_key(key)?;
        Some(Self { modifiers, key })
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Default for ShortcutBinding {
    fn default() -> Self {
        Self {
            modifiers: Modifiers {
                ctrl: true,
                alt: true,
                shift: true,
                meta: false,
            },
            key: "G".to_string(),
        }
    }
}

impl fmt::Display for ShortcutBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in self.modifiers.tokens() {
            write!(f, "{}+", modifier)?;
        }
        f.write_str(&self.key)
    }
}

/// Error when parsing a stored shortcut string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShortcutParseError {
    #[error("shortcut is empty")]
    Empty,

    #[error("shortcut contains an empty token")]
    EmptyToken,

    #[error("shortcut has no non-modifier key")]
    NoKey,

    #[error("shortcut has more than one key: '{0}' and '{1}'")]
    MultipleKeys(String, String),
}

impl FromStr for ShortcutBinding {
    type Err = ShortcutParseError;

    /// Parses `modifier+...+key` case-insensitively and accepts the usual
    /// modifier aliases, so older settings files load in canonical form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ShortcutParseError::Empty);
        }

        let mut modifiers = Modifiers::default();
        let mut key: Option<&str> = None;

        for part in s.split('+').map(str::trim) {
            if part.is_empty() {
                return Err(ShortcutParseError::EmptyToken);
            }
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" | "option" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "meta" | "cmd" | "command" | "super" | "win" | "windows" => modifiers.meta = true,
                _ => {
                    if let Some(existing) = key {
                        return Err(ShortcutParseError::MultipleKeys(
                            existing.to_string(),
                            part.to_string(),
                        ));
                    }
                    key = Some(part);
                }
            }
        }

        let key = key.ok_or(ShortcutParseError::NoKey)?;
        ShortcutBinding::new(modifiers, key).ok_or(ShortcutParseError::NoKey)
    }
}

impl TryFrom<String> for ShortcutBinding {
    type Error = ShortcutParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ShortcutBinding> for String {
    fn from(binding: ShortcutBinding) -> Self {
        binding.to_string()
    }
}

/// Result of normalizing a single key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// A complete, canonical binding
    Binding(ShortcutBinding),
    /// Not a usable combination (modifier-only or unknown key); keep listening
    Rejected,
    /// Bare Escape: stop recording without choosing a binding
    Cancel,
}

/// Whether a physical key code denotes a modifier key.
pub fn is_modifier_code(code: &str) -> bool {
    MODIFIER_CODES.iter().any(|m| m.eq_ignore_ascii_case(code))
}

/// Normalize a raw key press into a canonical binding.
pub fn normalize(event: &KeyEvent) -> Normalized {
    let modifiers = event.modifiers();
    let Some(key) = canonical_key(&event.code) else {
        return Normalized::Rejected;
    };

    if key == "Escape" && modifiers.is_empty() {
        return Normalized::Cancel;
    }

    Normalized::Binding(ShortcutBinding { modifiers, key })
}

/// Map a physical key code or user-typed key name to its canonical token.
fn canonical_key(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || is_modifier_code(raw) {
        return None;
    }

    // KeyA..KeyZ, Digit0..Digit9
    for prefix in ["Key", "Digit"] {
        if let Some(rest) = raw.strip_prefix(prefix) {
            if rest.len() == 1 && rest.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Some(rest.to_ascii_uppercase());
            }
        }
    }

    if let Some(named) = NAMED_KEYS.iter().find(|k| k.eq_ignore_ascii_case(raw)) {
        return Some((*named).to_string());
    }

    let alias = match raw.to_ascii_lowercase().as_str() {
        "esc" => Some("Escape"),
        "return" => Some("Enter"),
        "up" => Some("ArrowUp"),
        "down" => Some("ArrowDown"),
        "left" => Some("ArrowLeft"),
        "right" => Some("ArrowRight"),
        "del" => Some("Delete"),
        _ => None,
    };
    if let Some(alias) = alias {
        return Some(alias.to_string());
    }

    // F1..F24
    let upper = raw.to_ascii_uppercase();
    if let Some(num) = upper.strip_prefix('F') {
        if num.parse::<u8>().map(|n| (1..=24).contains(&n)).unwrap_or(false) {
            return Some(upper);
        }
    }

    if raw.chars().count() == 1 {
        return Some(upper);
    }

    Some(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(event: KeyEvent) -> String {
        match normalize(&event) {
            Normalized::Binding(b) => b.to_string(),
            other => panic!("expected binding, got {:?}", other),
        }
    }

    #[test]
    fn test_canonical_order_is_fixed() {
        assert_eq!(binding(KeyEvent::new("Space").ctrl().shift()), "Ctrl+Shift+Space");
        assert_eq!(binding(KeyEvent::new("Space").shift().ctrl()), "Ctrl+Shift+Space");
        assert_eq!(
            binding(KeyEvent::new("KeyG").meta().shift().alt().ctrl()),
            "Ctrl+Alt+Shift+Meta+G"
        );
    }

    #[test]
    fn test_modifier_keys_are_rejected() {
        assert_eq!(normalize(&KeyEvent::new("ShiftLeft")), Normalized::Rejected);
        assert_eq!(normalize(&KeyEvent::new("ShiftLeft").shift()), Normalized::Rejected);
        assert_eq!(normalize(&KeyEvent::new("ControlRight").ctrl()), Normalized::Rejected);
        assert_eq!(normalize(&KeyEvent::new("MetaLeft").meta()), Normalized::Rejected);
        assert_eq!(normalize(&KeyEvent::new("AltRight").alt()), Normalized::Rejected);
        assert_eq!(normalize(&KeyEvent::new("")), Normalized::Rejected);
    }

    #[test]
    fn test_escape_is_cancel() {
        assert_eq!(normalize(&KeyEvent::new("Escape")), Normalized::Cancel);
        assert_eq!(binding(KeyEvent::new("Escape").ctrl()), "Ctrl+Escape");
    }

    #[test]
    fn test_key_codes_map_to_tokens() {
        assert_eq!(binding(KeyEvent::new("KeyA").ctrl()), "Ctrl+A");
        assert_eq!(binding(KeyEvent::new("Digit7").alt()), "Alt+7");
        assert_eq!(binding(KeyEvent::new("F13")), "F13");
        assert_eq!(binding(KeyEvent::new("Period").ctrl().alt()), "Ctrl+Alt+Period");
    }

    #[test]
    fn test_parse_normalizes_legacy_strings() {
        let parsed: ShortcutBinding = "shift+control+g".parse().unwrap();
        assert_eq!(parsed.to_string(), "Ctrl+Shift+G");

        let parsed: ShortcutBinding = "ctrl+alt+space".parse().unwrap();
        assert_eq!(parsed.to_string(), "Ctrl+Alt+Space");

        let parsed: ShortcutBinding = "Cmd + Option + K".parse().unwrap();
        assert_eq!(parsed.to_string(), "Alt+Meta+K");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<ShortcutBinding>(), Err(ShortcutParseError::Empty));
        assert_eq!(
            "Ctrl+Shift".parse::<ShortcutBinding>(),
            Err(ShortcutParseError::NoKey)
        );
        assert_eq!(
            "Ctrl++G".parse::<ShortcutBinding>(),
            Err(ShortcutParseError::EmptyToken)
        );
        assert!(matches!(
            "Ctrl+A+B".parse::<ShortcutBinding>(),
            Err(ShortcutParseError::MultipleKeys(_, _))
        ));
        assert_eq!(
            "Ctrl+ShiftLeft".parse::<ShortcutBinding>(),
            Err(ShortcutParseError::NoKey)
        );
    }

    #[test]
    fn test_display_round_trips() {
        let original = binding(KeyEvent::new("Space").ctrl().shift());
        let parsed: ShortcutBinding = original.parse().unwrap();
        assert_eq!(parsed.to_string(), original);
    }

    #[test]
    fn test_default_binding() {
        assert_eq!(ShortcutBinding::default().to_string(), DEFAULT_SHORTCUT);
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let binding: ShortcutBinding = serde_json::from_str("\"alt+ctrl+KeyP\"").unwrap();
        assert_eq!(serde_json::to_string(&binding).unwrap(), "\"Ctrl+Alt+P\"");
        assert!(serde_json::from_str::<ShortcutBinding>("\"Ctrl+Alt\"").is_err());
    }
}
