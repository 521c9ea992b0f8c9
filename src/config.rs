//! Engine configuration — modifier, priority words, reserved keys,
//! selectors and timings.
//!
//! Loaded once from YAML. Every field is optional; anything that is
//! present must validate, so a malformed file fails at startup rather
//! than degrading silently.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::tree::selector::{Selector, SelectorError};

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown modifier {0:?} (expected alt, ctrl or cmd)")]
    UnknownModifier(String),
    #[error("unknown conflict strategy {0:?} (expected smart, numeric or skip)")]
    UnknownStrategy(String),
    #[error("invalid shortcut key {0:?} (expected a single letter or digit)")]
    InvalidKey(String),
    #[error("invalid selector: {0}")]
    Selector(#[from] SelectorError),
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Modifier that must be held for an activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Alt,
    Ctrl,
    Cmd,
}

impl Modifier {
    /// `KeyboardEvent.key` value of the modifier key itself.
    pub fn key_name(self) -> &'static str {
        match self {
            Self::Alt => "Alt",
            Self::Ctrl => "Control",
            Self::Cmd => "Meta",
        }
    }
}

impl FromStr for Modifier {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alt" | "option" => Ok(Self::Alt),
            "ctrl" | "control" => Ok(Self::Ctrl),
            "cmd" | "meta" | "super" => Ok(Self::Cmd),
            _ => Err(ConfigError::UnknownModifier(s.to_string())),
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Alt => "alt",
            Self::Ctrl => "ctrl",
            Self::Cmd => "cmd",
        })
    }
}

/// How the key selector proceeds once label-derived candidates collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictStrategy {
    /// Forced hint, priority word, word initials, remaining letters,
    /// then digits.
    #[default]
    Smart,
    /// Forced hint, priority word, first initial, then digits.
    Numeric,
    /// Forced hint, priority word, first initial, otherwise unbound.
    Skip,
}

impl FromStr for ConflictStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smart" => Ok(Self::Smart),
            "numeric" => Ok(Self::Numeric),
            "skip" => Ok(Self::Skip),
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

/// One entry of the ordered priority-word table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityWord {
    pub word: String,
    pub key: char,
}

impl PriorityWord {
    /// Entry matching `word` case-insensitively. The key is lower-cased.
    pub fn new(word: &str, key: char) -> Self {
        Self {
            word: word.to_lowercase(),
            key: key.to_ascii_lowercase(),
        }
    }
}

const DEFAULT_PRIORITY_WORDS: &[(&str, char)] = &[
    ("save", 's'),
    ("delete", 'd'),
    ("remove", 'r'),
    ("approve", 'a'),
    ("reject", 'r'),
    ("edit", 'e'),
    ("cancel", 'c'),
    ("close", 'c'),
    ("submit", 's'),
    ("search", 'f'),
    ("new", 'n'),
    ("add", 'n'),
    ("create", 'n'),
    ("next", 'j'),
    ("previous", 'k'),
    ("back", 'b'),
    ("refresh", 'r'),
    ("print", 'p'),
    ("export", 'x'),
    ("help", 'h'),
    ("open", 'o'),
];

const DEFAULT_INCLUDE: &[&str] = &[
    "button",
    "a[href]",
    "input[type=submit]",
    "input[type=button]",
    "[role=button]",
    "[role=tab]",
    "[role=menuitem]",
    "[data-shortcut]",
];

const DEFAULT_EXCLUDE: &[&str] = &[
    ".pagination a",
    ".pagination button",
    "[aria-hidden=true]",
];

/// Validated engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub modifier: Modifier,
    pub strategy: ConflictStrategy,
    pub reserved_keys: BTreeSet<char>,
    pub priority_words: Vec<PriorityWord>,
    pub include: Vec<Selector>,
    pub exclude: Vec<Selector>,
    /// Presence of this attribute opts an element out.
    pub opt_out_attribute: String,
    /// Attribute carrying a forced `[modifier+]key` hint.
    pub hint_attribute: String,
    pub debounce: Duration,
    pub pulse: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let parse_all = |sources: &[&str]| -> Vec<Selector> {
            sources.iter().filter_map(|s| Selector::parse(s).ok()).collect()
        };
        Self {
            modifier: Modifier::Alt,
            strategy: ConflictStrategy::Smart,
            reserved_keys: BTreeSet::new(),
            priority_words: DEFAULT_PRIORITY_WORDS
                .iter()
                .map(|(w, k)| PriorityWord::new(w, *k))
                .collect(),
            include: parse_all(DEFAULT_INCLUDE),
            exclude: parse_all(DEFAULT_EXCLUDE),
            opt_out_attribute: "data-no-shortcut".to_string(),
            hint_attribute: "data-shortcut".to_string(),
            debounce: Duration::from_millis(100),
            pulse: Duration::from_millis(200),
        }
    }
}

/// Raw YAML shape. Validated into [`Config`].
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    modifier: Option<String>,
    strategy: Option<String>,
    reserved_keys: Option<Vec<String>>,
    priority_words: Option<Vec<PriorityWordFile>>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    opt_out_attribute: Option<String>,
    hint_attribute: Option<String>,
    debounce_ms: Option<u64>,
    pulse_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PriorityWordFile {
    word: String,
    key: String,
}

impl Config {
    /// Parse and validate a YAML document.
    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a map.
        let raw: ConfigFile = if source.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(source)?
        };
        Self::validate(raw)
    }

    /// Read and validate a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&source)
    }

    fn validate(raw: ConfigFile) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(modifier) = raw.modifier {
            config.modifier = modifier.parse()?;
        }
        if let Some(strategy) = raw.strategy {
            config.strategy = strategy.parse()?;
        }
        if let Some(keys) = raw.reserved_keys {
            config.reserved_keys = keys
                .iter()
                .map(|k| parse_key(k))
                .collect::<Result<_, _>>()?;
        }
        if let Some(words) = raw.priority_words {
            config.priority_words = words
                .into_iter()
                .map(|w| parse_key(&w.key).map(|key| PriorityWord::new(&w.word, key)))
                .collect::<Result<_, _>>()?;
        }
        if let Some(include) = raw.include {
            config.include = parse_selectors(&include)?;
        }
        if let Some(exclude) = raw.exclude {
            config.exclude = parse_selectors(&exclude)?;
        }
        if let Some(attr) = raw.opt_out_attribute {
            config.opt_out_attribute = attr;
        }
        if let Some(attr) = raw.hint_attribute {
            config.hint_attribute = attr;
        }
        if let Some(ms) = raw.debounce_ms {
            config.debounce = Duration::from_millis(ms);
        }
        if let Some(ms) = raw.pulse_ms {
            config.pulse = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

/// Whether `c` can be a shortcut key.
pub fn is_shortcut_key(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

fn parse_key(raw: &str) -> Result<char, ConfigError> {
    let mut chars = raw.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if is_shortcut_key(c.to_ascii_lowercase()) => Ok(c.to_ascii_lowercase()),
        _ => Err(ConfigError::InvalidKey(raw.to_string())),
    }
}

fn parse_selectors(sources: &[String]) -> Result<Vec<Selector>, ConfigError> {
    sources
        .iter()
        .map(|s| Selector::parse(s).map_err(ConfigError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let config = Config::default();
        assert_eq!(config.modifier, Modifier::Alt);
        assert_eq!(config.strategy, ConflictStrategy::Smart);
        assert_eq!(config.include.len(), DEFAULT_INCLUDE.len());
        assert_eq!(config.exclude.len(), DEFAULT_EXCLUDE.len());
        assert_eq!(config.priority_words[0], PriorityWord::new("save", 's'));
        assert_eq!(config.debounce, Duration::from_millis(100));
        assert_eq!(config.pulse, Duration::from_millis(200));
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.modifier, Modifier::Alt);
    }

    #[test]
    fn full_document_parses() {
        let config = Config::from_yaml(
            r#"
modifier: ctrl
strategy: numeric
reserved_keys: [Q, "h"]
priority_words:
  - { word: Approve, key: a }
  - { word: save, key: s }
include: ["button", "[role=button]"]
exclude: [".pagination button"]
opt_out_attribute: data-skip
debounce_ms: 50
pulse_ms: 300
"#,
        )
        .unwrap();

        assert_eq!(config.modifier, Modifier::Ctrl);
        assert_eq!(config.strategy, ConflictStrategy::Numeric);
        assert_eq!(config.reserved_keys, BTreeSet::from(['q', 'h']));
        assert_eq!(
            config.priority_words,
            vec![PriorityWord::new("approve", 'a'), PriorityWord::new("save", 's')]
        );
        assert_eq!(config.include.len(), 2);
        assert_eq!(config.exclude[0].as_str(), ".pagination button");
        assert_eq!(config.opt_out_attribute, "data-skip");
        assert_eq!(config.hint_attribute, "data-shortcut");
        assert_eq!(config.debounce, Duration::from_millis(50));
        assert_eq!(config.pulse, Duration::from_millis(300));
    }

    #[test]
    fn unknown_modifier_fails_fast() {
        let err = Config::from_yaml("modifier: hyper").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownModifier(ref m) if m == "hyper"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            Config::from_yaml("strategy: random"),
            Err(ConfigError::UnknownStrategy(_))
        ));
        assert!(matches!(
            Config::from_yaml("reserved_keys: [ab]"),
            Err(ConfigError::InvalidKey(_))
        ));
        assert!(matches!(
            Config::from_yaml("reserved_keys: [\"!\"]"),
            Err(ConfigError::InvalidKey(_))
        ));
        assert!(matches!(
            Config::from_yaml("include: [\"button > a\"]"),
            Err(ConfigError::Selector(_))
        ));
        assert!(matches!(
            Config::from_yaml("debounce: 100"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hintkeys.yaml");
        std::fs::write(&path, "modifier: cmd\nreserved_keys: [q]\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.modifier, Modifier::Cmd);
        assert!(config.reserved_keys.contains(&'q'));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
