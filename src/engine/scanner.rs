//! Tree scanning — find eligible elements under a container, release
//! stale bindings, and bind the newcomers.

use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::tree::{ElementId, ElementTree};

use super::keys::{KeySelector, parse_hint};
use super::label::extract_label;
use super::registry::{Registry, ShortcutBinding};

/// Outcome of one scan pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Every binding under the container, in document order.
    pub bindings: Vec<ShortcutBinding>,
    /// Bindings created by this pass.
    pub bound: usize,
    /// Bindings dropped by this pass.
    pub released: usize,
    /// Eligible elements skipped for lack of a label.
    pub unlabeled: Vec<ElementId>,
    /// Eligible elements left unbound because no key was free.
    pub exhausted: Vec<ElementId>,
}

/// Shortcut assignment engine: configuration, key selector and
/// registry for one isolated instance.
#[derive(Debug)]
pub struct ShortcutEngine {
    config: Config,
    selector: KeySelector,
    registry: Registry,
}

impl ShortcutEngine {
    pub fn new(config: Config) -> Self {
        let selector = KeySelector::new(config.priority_words.clone(), config.strategy);
        let registry = Registry::new(config.modifier, config.reserved_keys.iter().copied());
        Self {
            config,
            selector,
            registry,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Whether `element` should carry a shortcut when scanning `container`.
    pub fn is_eligible<T: ElementTree + ?Sized>(
        &self,
        tree: &T,
        element: ElementId,
        container: ElementId,
    ) -> bool {
        if element == container || !tree.is_attached(element) || !tree.is_within(element, container)
        {
            return false;
        }
        if !self
            .config
            .include
            .iter()
            .any(|s| s.matches(tree, element, container))
        {
            return false;
        }
        if tree.attr(element, &self.config.opt_out_attribute).is_some() || tree.is_disabled(element)
        {
            return false;
        }
        !self
            .config
            .exclude
            .iter()
            .any(|s| s.matches(tree, element, container))
    }

    /// Eligible elements under `container`, in document order.
    pub fn candidates<T: ElementTree + ?Sized>(
        &self,
        tree: &T,
        container: ElementId,
    ) -> Vec<ElementId> {
        tree.descendants(container)
            .into_iter()
            .filter(|id| self.is_eligible(tree, *id, container))
            .collect()
    }

    /// Scan `container` and return its current bindings.
    pub fn scan<T: ElementTree + ?Sized>(
        &mut self,
        tree: &T,
        container: ElementId,
    ) -> Vec<ShortcutBinding> {
        self.scan_report(tree, container).bindings
    }

    /// Scan `container`, reporting what changed.
    ///
    /// Stale bindings are released before any new key is chosen, so a
    /// key freed by a removal is available to elements found in the
    /// same pass. Elements that already hold a binding keep it, even if
    /// their label changed.
    pub fn scan_report<T: ElementTree + ?Sized>(
        &mut self,
        tree: &T,
        container: ElementId,
    ) -> ScanReport {
        let mut report = ScanReport::default();

        if !tree.is_attached(container) {
            report.released = self.release_container(tree, container);
            debug!(container = %container, released = report.released, "container detached");
            return report;
        }

        let stale: Vec<ElementId> = self
            .registry
            .bindings()
            .filter(|b| {
                !tree.is_attached(b.element)
                    || (b.container == container && !self.is_eligible(tree, b.element, container))
            })
            .map(|b| b.element)
            .collect();
        for element in stale {
            if let Some(binding) = self.registry.release(element) {
                debug!(element = %element, key = %binding.key, "released stale binding");
                report.released += 1;
            }
        }

        let candidates = self.candidates(tree, container);

        for &element in &candidates {
            if self.registry.lookup(element).is_some() {
                continue;
            }

            let label = extract_label(tree, element);
            if label.is_empty() {
                trace!(element = %element, "no label, skipped");
                report.unlabeled.push(element);
                continue;
            }

            let hint = tree.attr(element, &self.config.hint_attribute);
            if let Some(raw) = hint {
                if parse_hint(raw).is_none() {
                    warn!(element = %element, hint = raw, "unusable shortcut hint ignored");
                }
            }

            let Some(choice) = self.selector.select(&label, hint, self.registry.used_keys()) else {
                debug!(element = %element, label = %label, "key space exhausted, left unbound");
                report.exhausted.push(element);
                continue;
            };

            match self.registry.bind(element, container, choice.key, &label) {
                Ok(_) => {
                    trace!(
                        element = %element,
                        key = %choice.key,
                        source = %choice.source,
                        label = %label,
                        "bound"
                    );
                    report.bound += 1;
                }
                Err(e) => {
                    debug!(element = %element, error = %e, "bind failed, skipped");
                }
            }
        }

        report.bindings = candidates
            .iter()
            .filter_map(|id| self.registry.lookup(*id).cloned())
            .collect();

        info!(
            container = %container,
            bound = report.bound,
            released = report.released,
            unbound = report.unlabeled.len() + report.exhausted.len(),
            total = report.bindings.len(),
            "scan complete"
        );
        report
    }

    /// Release one element's binding.
    pub fn release(&mut self, element: ElementId) -> Option<ShortcutBinding> {
        self.registry.release(element)
    }

    /// Release every binding created by scans of `container`, and every
    /// binding whose element still sits inside its subtree, whichever
    /// container created it. Call on teardown so repeated mounts do not
    /// exhaust the key space.
    pub fn release_container<T: ElementTree + ?Sized>(
        &mut self,
        tree: &T,
        container: ElementId,
    ) -> usize {
        let mut elements = self.registry.elements_of(container);
        elements.extend(
            self.registry
                .bindings()
                .filter(|b| b.container != container && tree.is_within(b.element, container))
                .map(|b| b.element),
        );
        elements
            .into_iter()
            .filter_map(|element| self.registry.release(element))
            .count()
    }

    /// Release everything. Reserved keys stay reserved.
    pub fn dispose(&mut self) -> usize {
        let released = self.registry.clear();
        debug!(released, "engine disposed");
        released
    }

    /// All current bindings, in creation order.
    pub fn bindings(&self) -> Vec<ShortcutBinding> {
        self.registry.bindings().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::memory::{MemoryTree, NodeSpec};

    fn keys(bindings: &[ShortcutBinding]) -> Vec<char> {
        bindings.iter().map(|b| b.key).collect()
    }

    #[test]
    fn binds_in_document_order() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        tree.append(root, NodeSpec::new("button").text("Save"));
        tree.append(root, NodeSpec::new("a").attr("href", "/x").text("Export"));
        tree.append(root, NodeSpec::new("div").text("Not interactive"));

        let mut engine = ShortcutEngine::new(Config::default());
        let bindings = engine.scan(&tree, root);

        assert_eq!(keys(&bindings), vec!['s', 'x']);
        assert_eq!(bindings[0].label, "Save");
    }

    #[test]
    fn exclusions_are_honoured() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        tree.append(root, NodeSpec::new("button").text("Opted out").attr("data-no-shortcut", ""));
        tree.append(root, NodeSpec::new("button").text("Disabled").attr("disabled", ""));
        tree.append(root, NodeSpec::new("button").text("Aria off").attr("aria-disabled", "true"));
        tree.append(
            root,
            NodeSpec::new("nav")
                .class("pagination")
                .child(NodeSpec::new("a").attr("href", "?p=2").text("2")),
        );
        tree.append(root, NodeSpec::new("button").text("Kept"));

        let mut engine = ShortcutEngine::new(Config::default());
        let bindings = engine.scan(&tree, root);

        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].label, "Kept");
    }

    #[test]
    fn unlabeled_and_exhausted_are_reported() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        tree.append(root, NodeSpec::new("button").text("🔥"));
        for _ in 0..3 {
            tree.append(root, NodeSpec::new("button").text("Go"));
        }

        let config = Config {
            reserved_keys: ('1'..='9').collect(),
            ..Config::default()
        };
        let mut engine = ShortcutEngine::new(config);
        let report = engine.scan_report(&tree, root);

        assert_eq!(report.unlabeled.len(), 1);
        assert_eq!(keys(&report.bindings), vec!['g', 'o']);
        assert_eq!(report.exhausted.len(), 1);
    }

    #[test]
    fn forced_hint_is_used() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let el = tree.append(
            root,
            NodeSpec::new("button").text("Save").attr("data-shortcut", "alt+w"),
        );

        let mut engine = ShortcutEngine::new(Config::default());
        engine.scan(&tree, root);
        assert_eq!(engine.registry().lookup(el).unwrap().key, 'w');
    }

    #[test]
    fn scan_is_scoped_to_container() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let left = tree.append(root, NodeSpec::new("section"));
        let right = tree.append(root, NodeSpec::new("section"));
        tree.append(left, NodeSpec::new("button").text("Edit"));
        tree.append(right, NodeSpec::new("button").text("Open"));

        let mut engine = ShortcutEngine::new(Config::default());
        let bindings = engine.scan(&tree, left);
        assert_eq!(keys(&bindings), vec!['e']);
        assert_eq!(engine.registry().len(), 1);

        engine.scan(&tree, right);
        assert_eq!(engine.registry().len(), 2);

        assert_eq!(engine.release_container(&tree, left), 1);
        assert_eq!(engine.registry().len(), 1);
        assert!(engine.registry().lookup_by_key('e').is_none());
    }

    #[test]
    fn newly_disabled_element_is_released() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let el = tree.append(root, NodeSpec::new("button").text("Approve"));

        let mut engine = ShortcutEngine::new(Config::default());
        engine.scan(&tree, root);
        assert!(engine.registry().lookup(el).is_some());

        tree.set_attr(el, "disabled", "");
        let report = engine.scan_report(&tree, root);
        assert_eq!(report.released, 1);
        assert!(report.bindings.is_empty());
        assert!(!engine.registry().used_keys().contains(&'a'));
    }

    #[test]
    fn newly_opted_out_element_is_released() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let el = tree.append(root, NodeSpec::new("button").text("Export"));

        let mut engine = ShortcutEngine::new(Config::default());
        engine.scan(&tree, root);
        assert_eq!(engine.registry().lookup(el).map(|b| b.key), Some('x'));

        tree.set_attr(el, "data-no-shortcut", "");
        let report = engine.scan_report(&tree, root);
        assert_eq!(report.released, 1);
        assert!(engine.registry().lookup(el).is_none());
        assert!(engine.registry().lookup_by_key('x').is_none());
    }

    #[test]
    fn detached_element_is_released_by_any_container_scan() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let left = tree.append(root, NodeSpec::new("section"));
        let right = tree.append(root, NodeSpec::new("section"));
        let edit = tree.append(left, NodeSpec::new("button").text("Edit"));
        tree.append(right, NodeSpec::new("button").text("Open"));

        let mut engine = ShortcutEngine::new(Config::default());
        engine.scan(&tree, left);
        engine.scan(&tree, right);
        assert_eq!(engine.registry().lookup(edit).map(|b| b.container), Some(left));

        tree.remove(edit);
        let report = engine.scan_report(&tree, right);
        assert_eq!(report.released, 1);
        assert!(engine.registry().lookup(edit).is_none());
        assert!(!engine.registry().used_keys().contains(&'e'));
        assert_eq!(keys(&report.bindings), vec!['o']);
    }

    #[test]
    fn release_container_covers_subtree_bound_by_ancestor() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let panel = tree.append(root, NodeSpec::new("section"));
        let edit = tree.append(panel, NodeSpec::new("button").text("Edit"));
        let help = tree.append(root, NodeSpec::new("button").text("Help"));

        let mut engine = ShortcutEngine::new(Config::default());
        engine.scan(&tree, root);
        assert_eq!(engine.registry().len(), 2);

        assert_eq!(engine.release_container(&tree, panel), 1);
        assert!(engine.registry().lookup(edit).is_none());
        assert!(engine.registry().lookup(help).is_some());
    }

    #[test]
    fn detached_container_releases_its_bindings() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let dialog = tree.append(root, NodeSpec::new("dialog"));
        tree.append(dialog, NodeSpec::new("button").text("Close"));

        let mut engine = ShortcutEngine::new(Config::default());
        engine.scan(&tree, dialog);
        tree.remove(dialog);

        let report = engine.scan_report(&tree, dialog);
        assert_eq!(report.released, 1);
        assert!(engine.registry().is_empty());
    }

    #[test]
    fn dispose_clears_everything() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        tree.append(root, NodeSpec::new("button").text("One"));
        tree.append(root, NodeSpec::new("button").text("Two"));

        let mut engine = ShortcutEngine::new(Config::default());
        engine.scan(&tree, root);
        assert_eq!(engine.dispose(), 2);
        assert!(engine.bindings().is_empty());
    }
}
