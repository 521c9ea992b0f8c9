//! Shortcut assignment: label extraction, key selection, the registry
//! and the scanner that drives them.

pub mod keys;
pub mod label;
pub mod registry;
pub mod scanner;

pub use keys::{KeyChoice, KeySelector, KeySource};
pub use label::extract_label;
pub use registry::{BindingId, Registry, RegistryError, ShortcutBinding};
pub use scanner::{ScanReport, ShortcutEngine};
