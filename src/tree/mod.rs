//! ElementTree trait — the host UI tree the engine scans and activates.
//!
//! The engine never owns elements. It refers to them by [`ElementId`]
//! only and asks the tree whether an id is still attached before
//! trusting it, so a node removed by the host simply goes stale.

pub mod memory;
pub mod selector;

use std::fmt;

/// Opaque identity of an element in a host tree.
///
/// Ids are compared by value and never dereferenced by the engine.
/// Hosts must not reuse an id for a different node while the engine
/// may still hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural or attribute mutation reported by a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    /// Children were inserted under or removed from `parent`.
    ChildrenChanged {
        parent: ElementId,
        added: Vec<ElementId>,
        removed: Vec<ElementId>,
    },
    /// Attribute `name` was set or removed on `element`.
    AttributeChanged { element: ElementId, name: String },
}

/// Read/activate access to a host element tree.
///
/// Platform adapters (DOM bridge, accessibility tree, toolkit widget
/// tree) implement this trait. All methods must tolerate stale ids:
/// queries on a detached element return `None`/`false`/empty.
pub trait ElementTree {
    /// The document root.
    fn root(&self) -> ElementId;

    /// Parent of `element`, or `None` for the root and for detached ids.
    fn parent(&self, element: ElementId) -> Option<ElementId>;

    /// Children of `element` in document order.
    fn children(&self, element: ElementId) -> Vec<ElementId>;

    /// Whether `element` is still reachable from the root.
    fn is_attached(&self, element: ElementId) -> bool;

    /// Lower-case tag name.
    fn tag(&self, element: ElementId) -> Option<&str>;

    /// Attribute value. Boolean attributes report `Some("")`.
    fn attr(&self, element: ElementId, name: &str) -> Option<&str>;

    /// Whether `class` appears in the element's class list.
    fn has_class(&self, element: ElementId, class: &str) -> bool;

    /// Concatenated visible text of `element` and its descendants.
    fn text_content(&self, element: ElementId) -> String;

    /// Trigger the element's primary action (click).
    ///
    /// Returns `false` if the element is detached.
    fn activate(&mut self, element: ElementId) -> bool;

    /// Set an attribute. No-op on detached elements.
    fn set_attr(&mut self, element: ElementId, name: &str, value: &str);

    /// Remove an attribute if present.
    fn remove_attr(&mut self, element: ElementId, name: &str);

    /// Whether `element` is `ancestor` or lies below it.
    fn is_within(&self, element: ElementId, ancestor: ElementId) -> bool {
        let mut current = Some(element);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether the element is disabled, natively or through ARIA.
    fn is_disabled(&self, element: ElementId) -> bool {
        self.attr(element, "disabled").is_some()
            || self.attr(element, "aria-disabled") == Some("true")
    }

    /// Descendants of `container` (excluding it) in pre-order
    /// document order.
    fn descendants(&self, container: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = self.children(container).into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).into_iter().rev());
        }
        out
    }
}
