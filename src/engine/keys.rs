//! Key selection — turn a label (plus an optional forced hint) into a
//! single free key.
//!
//! Strategies run in a fixed order and the first candidate not already
//! in use wins:
//!
//! 1. forced hint (`[modifier+]key`, trailing character)
//! 2. priority word (first table entry contained in the label)
//! 3. first letter of the first word
//! 4. first letter of each later word
//! 5. any other letter of the label, left to right
//! 6. digits `1`..=`9`
//!
//! [`ConflictStrategy::Numeric`] skips 4–5 and [`ConflictStrategy::Skip`]
//! stops after 3.

use std::collections::BTreeSet;
use std::fmt;

use crate::config::{ConflictStrategy, PriorityWord, is_shortcut_key};

/// Which strategy produced a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Forced,
    PriorityWord,
    FirstInitial,
    WordInitial,
    Letter,
    Digit,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Forced => "forced",
            Self::PriorityWord => "priority-word",
            Self::FirstInitial => "first-initial",
            Self::WordInitial => "word-initial",
            Self::Letter => "letter",
            Self::Digit => "digit",
        })
    }
}

/// A selected key and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChoice {
    pub key: char,
    pub source: KeySource,
}

/// Parse a forced hint such as `"ctrl+Q"` or `"q"` into its key.
///
/// Returns `None` when the trailing character is not a letter or digit.
pub fn parse_hint(hint: &str) -> Option<char> {
    let key_part = hint.trim().rsplit('+').next()?.trim();
    let c = key_part.chars().last()?.to_ascii_lowercase();
    is_shortcut_key(c).then_some(c)
}

/// Stateless key selector built from configuration.
#[derive(Debug, Clone)]
pub struct KeySelector {
    priority_words: Vec<PriorityWord>,
    strategy: ConflictStrategy,
}

impl KeySelector {
    /// Selector over an ordered priority table.
    pub fn new(priority_words: Vec<PriorityWord>, strategy: ConflictStrategy) -> Self {
        Self {
            priority_words,
            strategy,
        }
    }

    /// Pick a key for `label` that is not in `used`.
    ///
    /// `hint` is the raw forced-shortcut attribute, if any. A hint for a
    /// used or reserved key is ignored and selection continues from the
    /// label.
    pub fn select(
        &self,
        label: &str,
        hint: Option<&str>,
        used: &BTreeSet<char>,
    ) -> Option<KeyChoice> {
        // Priority-table keys may come from hand-built configs.
        let free = |key: char, source: KeySource| {
            (is_shortcut_key(key) && !used.contains(&key)).then_some(KeyChoice { key, source })
        };

        if let Some(choice) = hint.and_then(parse_hint).and_then(|k| free(k, KeySource::Forced)) {
            return Some(choice);
        }

        let lower = label.to_lowercase();

        if let Some(entry) = self.priority_words.iter().find(|p| lower.contains(&p.word)) {
            if let Some(choice) = free(entry.key, KeySource::PriorityWord) {
                return Some(choice);
            }
        }

        let mut initials = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .filter_map(|w| w.chars().next())
            .filter(char::is_ascii_lowercase);

        // Only the first word's initial counts as strategy 3, even if an
        // earlier word had no usable initial.
        let first_word_initial = lower
            .split(|c: char| !c.is_alphanumeric())
            .find(|w| !w.is_empty())
            .and_then(|w| w.chars().next())
            .filter(char::is_ascii_lowercase);
        if let Some(choice) = first_word_initial.and_then(|k| free(k, KeySource::FirstInitial)) {
            return Some(choice);
        }

        match self.strategy {
            ConflictStrategy::Skip => return None,
            ConflictStrategy::Numeric => return digit(&free),
            ConflictStrategy::Smart => {}
        }

        if first_word_initial.is_some() {
            initials.next();
        }
        if let Some(choice) = initials.find_map(|k| free(k, KeySource::WordInitial)) {
            return Some(choice);
        }

        if let Some(choice) = lower
            .chars()
            .filter(char::is_ascii_lowercase)
            .find_map(|k| free(k, KeySource::Letter))
        {
            return Some(choice);
        }

        digit(&free)
    }
}

fn digit(free: &impl Fn(char, KeySource) -> Option<KeyChoice>) -> Option<KeyChoice> {
    ('1'..='9').find_map(|k| free(k, KeySource::Digit))
}
