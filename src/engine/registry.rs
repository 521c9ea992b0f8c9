//! Assignment registry — the key↔element mapping.
//!
//! Bindings live in a table keyed by [`BindingId`]; elements and keys
//! only index into it. The registry never holds anything that keeps
//! an element alive, so a host can drop a node at any time and the
//! binding simply points at a stale [`ElementId`] until released.
//!
//! Invariants:
//! - `used ⊇ reserved`, always.
//! - every non-reserved key in `used` belongs to exactly one binding.
//! - an element holds at most one binding.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::config::{Modifier, is_shortcut_key};
use crate::tree::ElementId;

/// Registry error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("key {0:?} is reserved or already bound")]
    KeyUnavailable(char),
    #[error("element {0} already has a shortcut")]
    AlreadyBound(ElementId),
    #[error("{0:?} is not a valid shortcut key")]
    InvalidKey(char),
}

/// Opaque binding identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingId(u64);

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// One element's shortcut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutBinding {
    pub id: BindingId,
    pub element: ElementId,
    /// Container whose scan created the binding.
    pub container: ElementId,
    pub key: char,
    pub modifier: Modifier,
    pub label: String,
}

impl ShortcutBinding {
    /// Human form, e.g. `alt+s`.
    pub fn chord(&self) -> String {
        format!("{}+{}", self.modifier, self.key)
    }
}

#[derive(Debug)]
pub struct Registry {
    modifier: Modifier,
    reserved: BTreeSet<char>,
    used: BTreeSet<char>,
    bindings: BTreeMap<BindingId, ShortcutBinding>,
    by_element: HashMap<ElementId, BindingId>,
    by_key: HashMap<char, BindingId>,
    next_id: u64,
}

impl Registry {
    /// Create a registry with `reserved` permanently withheld.
    pub fn new(modifier: Modifier, reserved: impl IntoIterator<Item = char>) -> Self {
        let reserved: BTreeSet<char> = reserved
            .into_iter()
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self {
            modifier,
            used: reserved.clone(),
            reserved,
            bindings: BTreeMap::new(),
            by_element: HashMap::new(),
            by_key: HashMap::new(),
            next_id: 0,
        }
    }

    /// Record a binding of `key` to `element`.
    pub fn bind(
        &mut self,
        element: ElementId,
        container: ElementId,
        key: char,
        label: &str,
    ) -> Result<BindingId, RegistryError> {
        if !is_shortcut_key(key) {
            return Err(RegistryError::InvalidKey(key));
        }
        if self.used.contains(&key) {
            return Err(RegistryError::KeyUnavailable(key));
        }
        if self.by_element.contains_key(&element) {
            return Err(RegistryError::AlreadyBound(element));
        }

        let id = BindingId(self.next_id);
        self.next_id += 1;

        self.used.insert(key);
        self.by_key.insert(key, id);
        self.by_element.insert(element, id);
        self.bindings.insert(
            id,
            ShortcutBinding {
                id,
                element,
                container,
                key,
                modifier: self.modifier,
                label: label.to_string(),
            },
        );
        Ok(id)
    }

    /// Drop the binding for `element`, returning its key to the pool.
    pub fn release(&mut self, element: ElementId) -> Option<ShortcutBinding> {
        let id = self.by_element.remove(&element)?;
        let binding = self.bindings.remove(&id)?;
        self.by_key.remove(&binding.key);
        if !self.reserved.contains(&binding.key) {
            self.used.remove(&binding.key);
        }
        Some(binding)
    }

    /// Drop every binding. Reserved keys stay used.
    pub fn clear(&mut self) -> usize {
        let released = self.bindings.len();
        self.bindings.clear();
        self.by_element.clear();
        self.by_key.clear();
        self.used = self.reserved.clone();
        released
    }

    /// Binding held by `element`.
    pub fn lookup(&self, element: ElementId) -> Option<&ShortcutBinding> {
        self.by_element
            .get(&element)
            .and_then(|id| self.bindings.get(id))
    }

    /// Binding for `key`, matched case-insensitively.
    pub fn lookup_by_key(&self, key: char) -> Option<&ShortcutBinding> {
        self.by_key
            .get(&key.to_ascii_lowercase())
            .and_then(|id| self.bindings.get(id))
    }

    /// Binding by id.
    pub fn get(&self, id: BindingId) -> Option<&ShortcutBinding> {
        self.bindings.get(&id)
    }

    /// All bindings in creation order.
    pub fn bindings(&self) -> impl Iterator<Item = &ShortcutBinding> {
        self.bindings.values()
    }

    /// Elements bound by scans of `container`.
    pub fn elements_of(&self, container: ElementId) -> Vec<ElementId> {
        self.bindings
            .values()
            .filter(|b| b.container == container)
            .map(|b| b.element)
            .collect()
    }

    /// Bound keys plus reserved keys.
    pub fn used_keys(&self) -> &BTreeSet<char> {
        &self.used
    }

    /// Keys that are never assigned.
    pub fn reserved_keys(&self) -> &BTreeSet<char> {
        &self.reserved
    }

    pub fn modifier(&self) -> Modifier {
        self.modifier
    }

    /// Number of live bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
