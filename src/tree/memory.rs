//! In-memory element tree.
//!
//! Arena of nodes keyed by [`ElementId`]. Ids are handed out from a
//! monotonically increasing counter and never reused, so an id that
//! outlives its node is detectably stale. Mutations are reported on
//! an optional unbounded channel, the way a DOM mutation observer
//! would report them.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use super::{ElementId, ElementTree, TreeChange};

/// Declarative description of a subtree, also the YAML tree format.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeSpec {
    pub tag: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Debug)]
struct Node {
    tag: String,
    text: String,
    attrs: BTreeMap<String, String>,
    classes: Vec<String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

/// Arena-backed [`ElementTree`].
#[derive(Debug)]
pub struct MemoryTree {
    nodes: HashMap<ElementId, Node>,
    root: ElementId,
    next_id: u64,
    observer: Option<UnboundedSender<TreeChange>>,
    activations: Vec<ElementId>,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    /// Empty tree with a `body` root.
    pub fn new() -> Self {
        Self::from_spec(NodeSpec::new("body"))
    }

    /// Build a tree whose root is `spec`.
    pub fn from_spec(spec: NodeSpec) -> Self {
        let mut tree = Self {
            nodes: HashMap::new(),
            root: ElementId(0),
            next_id: 0,
            observer: None,
            activations: Vec::new(),
        };
        tree.root = tree.insert_subtree(None, spec);
        tree
    }

    /// Parse a YAML [`NodeSpec`] document.
    pub fn from_yaml(source: &str) -> Result<Self, serde_yaml::Error> {
        let spec: NodeSpec = serde_yaml::from_str(source)?;
        Ok(Self::from_spec(spec))
    }

    /// Start reporting mutations. Replaces any previous observer.
    pub fn observe(&mut self) -> UnboundedReceiver<TreeChange> {
        let (tx, rx) = unbounded_channel();
        self.observer = Some(tx);
        rx
    }

    /// Append `spec` as the last child of `parent`.
    pub fn append(&mut self, parent: ElementId, spec: NodeSpec) -> ElementId {
        let id = self.insert_subtree(Some(parent), spec);
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(id);
        }
        self.notify(TreeChange::ChildrenChanged {
            parent,
            added: vec![id],
            removed: vec![],
        });
        id
    }

    /// Detach `element` and drop its whole subtree. No-op for the root
    /// or an already removed id.
    pub fn remove(&mut self, element: ElementId) {
        if element == self.root {
            return;
        }
        let Some(parent) = self.nodes.get(&element).and_then(|n| n.parent) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.retain(|c| *c != element);
        }

        let mut stack = vec![element];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(&id) {
                stack.extend(node.children);
            }
        }

        self.notify(TreeChange::ChildrenChanged {
            parent,
            added: vec![],
            removed: vec![element],
        });
    }

    /// Replace the element's own text.
    pub fn set_text(&mut self, element: ElementId, text: &str) {
        if let Some(node) = self.nodes.get_mut(&element) {
            node.text = text.to_string();
            self.notify(TreeChange::ChildrenChanged {
                parent: element,
                added: vec![],
                removed: vec![],
            });
        }
    }

    /// First attached element, in document order, whose own text or
    /// `aria-label` equals `label`.
    pub fn find_by_label(&self, label: &str) -> Option<ElementId> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .find(|id| {
                self.nodes.get(id).is_some_and(|n| {
                    n.text.trim() == label
                        || n.attrs.get("aria-label").map(String::as_str) == Some(label)
                })
            })
    }

    /// Elements activated so far, oldest first.
    pub fn activations(&self) -> &[ElementId] {
        &self.activations
    }

    fn insert_subtree(&mut self, parent: Option<ElementId>, spec: NodeSpec) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;

        self.nodes.insert(
            id,
            Node {
                tag: spec.tag.to_ascii_lowercase(),
                text: spec.text.unwrap_or_default(),
                attrs: spec.attrs,
                classes: spec.classes,
                parent,
                children: Vec::new(),
            },
        );

        let children: Vec<ElementId> = spec
            .children
            .into_iter()
            .map(|child| self.insert_subtree(Some(id), child))
            .collect();
        if let Some(node) = self.nodes.get_mut(&id) {
            node.children = children;
        }
        id
    }

    fn notify(&mut self, change: TreeChange) {
        let dropped = self
            .observer
            .as_ref()
            .is_some_and(|tx| tx.send(change).is_err());
        if dropped {
            // Receiver dropped — stop reporting.
            self.observer = None;
        }
    }
}

impl ElementTree for MemoryTree {
    fn root(&self) -> ElementId {
        self.root
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.nodes.get(&element).and_then(|n| n.parent)
    }

    fn children(&self, element: ElementId) -> Vec<ElementId> {
        self.nodes
            .get(&element)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn is_attached(&self, element: ElementId) -> bool {
        // Removal drops the whole subtree, so presence implies a path to
        // the root.
        self.nodes.contains_key(&element)
    }

    fn tag(&self, element: ElementId) -> Option<&str> {
        self.nodes.get(&element).map(|n| n.tag.as_str())
    }

    fn attr(&self, element: ElementId, name: &str) -> Option<&str> {
        self.nodes
            .get(&element)
            .and_then(|n| n.attrs.get(name))
            .map(String::as_str)
    }

    fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.nodes
            .get(&element)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    fn text_content(&self, element: ElementId) -> String {
        let Some(node) = self.nodes.get(&element) else {
            return String::new();
        };
        let mut out = node.text.clone();
        for child in &node.children {
            let text = self.text_content(*child);
            if text.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&text);
        }
        out
    }

    fn activate(&mut self, element: ElementId) -> bool {
        if !self.is_attached(element) {
            return false;
        }
        self.activations.push(element);
        true
    }

    fn set_attr(&mut self, element: ElementId, name: &str, value: &str) {
        if let Some(node) = self.nodes.get_mut(&element) {
            node.attrs.insert(name.to_string(), value.to_string());
            self.notify(TreeChange::AttributeChanged {
                element,
                name: name.to_string(),
            });
        }
    }

    fn remove_attr(&mut self, element: ElementId, name: &str) {
        let removed = self
            .nodes
            .get_mut(&element)
            .is_some_and(|n| n.attrs.remove(name).is_some());
        if removed {
            self.notify(TreeChange::AttributeChanged {
                element,
                name: name.to_string(),
            });
        }
    }
}
