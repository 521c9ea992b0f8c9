use std::collections::{BTreeSet, HashSet};

use hintkeys::config::{Config, PriorityWord};
use hintkeys::engine::ShortcutEngine;
use hintkeys::tree::memory::{MemoryTree, NodeSpec};
use hintkeys::tree::{ElementId, ElementTree};

fn config_with(reserved: &[char]) -> Config {
    Config {
        reserved_keys: reserved.iter().copied().collect(),
        priority_words: vec![
            PriorityWord::new("save", 's'),
            PriorityWord::new("delete", 'd'),
            PriorityWord::new("approve", 'a'),
        ],
        ..Config::default()
    }
}

fn buttons(labels: &[&str]) -> (MemoryTree, Vec<ElementId>) {
    let mut tree = MemoryTree::new();
    let root = tree.root();
    let ids = labels
        .iter()
        .map(|l| tree.append(root, NodeSpec::new("button").text(l)))
        .collect();
    (tree, ids)
}

fn key_of(engine: &ShortcutEngine, element: ElementId) -> Option<char> {
    engine.registry().lookup(element).map(|b| b.key)
}

// =========================================================================
// Worked examples
// =========================================================================

#[test]
fn save_family_example() {
    let (tree, ids) = buttons(&["Save Changes", "Save As", "Save All"]);
    let mut engine = ShortcutEngine::new(config_with(&[]));
    engine.scan(&tree, tree.root());

    assert_eq!(key_of(&engine, ids[0]), Some('s'));
    assert_eq!(key_of(&engine, ids[1]), Some('a'));
    assert_eq!(key_of(&engine, ids[2]), Some('v'));
}

#[test]
fn forced_hint_on_reserved_key_falls_back_to_label() {
    let mut tree = MemoryTree::new();
    let root = tree.root();
    let quit = tree.append(
        root,
        NodeSpec::new("button").text("Quit").attr("data-shortcut", "ctrl+q"),
    );

    let mut engine = ShortcutEngine::new(config_with(&['q']));
    engine.scan(&tree, root);

    assert_eq!(key_of(&engine, quit), Some('u'));
}

#[test]
fn twelve_deletes_with_reserved_d() {
    let labels = vec!["Delete"; 13];
    let (tree, ids) = buttons(&labels);
    let mut engine = ShortcutEngine::new(config_with(&['d']));
    let report = engine.scan_report(&tree, tree.root());

    let keys: Vec<char> = ids[..12].iter().filter_map(|id| key_of(&engine, *id)).collect();
    assert_eq!(keys, vec!['e', 'l', 't', '1', '2', '3', '4', '5', '6', '7', '8', '9']);
    assert_eq!(key_of(&engine, ids[12]), None);
    assert_eq!(report.exhausted, vec![ids[12]]);
}

// =========================================================================
// Properties
// =========================================================================

#[test]
fn injectivity_over_many_elements() {
    let labels: Vec<String> = (0..60).map(|i| format!("Action {i}")).collect();
    let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
    let (tree, _) = buttons(&refs);
    let mut engine = ShortcutEngine::new(config_with(&['x']));
    let bindings = engine.scan(&tree, tree.root());

    let keys: HashSet<char> = bindings.iter().map(|b| b.key).collect();
    let elements: HashSet<ElementId> = bindings.iter().map(|b| b.element).collect();
    assert_eq!(keys.len(), bindings.len());
    assert_eq!(elements.len(), bindings.len());
}

#[test]
fn reserved_keys_never_bound() {
    let reserved = ['s', 'a', 'v', 'e', '1'];
    let mut tree = MemoryTree::new();
    let root = tree.root();
    tree.append(root, NodeSpec::new("button").text("Save").attr("data-shortcut", "alt+s"));
    tree.append(root, NodeSpec::new("button").text("Save"));
    tree.append(root, NodeSpec::new("button").text("Save"));

    let mut engine = ShortcutEngine::new(config_with(&reserved));
    let bindings = engine.scan(&tree, root);

    assert!(bindings.iter().all(|b| !reserved.contains(&b.key)));
    assert_eq!(bindings.iter().map(|b| b.key).collect::<Vec<_>>(), vec!['2', '3', '4']);
}

#[test]
fn rescan_is_idempotent() {
    let (tree, _) = buttons(&["Save", "Edit", "Approve", "Export", "Help"]);
    let mut engine = ShortcutEngine::new(Config::default());

    let first = engine.scan(&tree, tree.root());
    let second = engine.scan(&tree, tree.root());
    assert_eq!(first, second);

    let report = engine.scan_report(&tree, tree.root());
    assert_eq!(report.bound, 0);
    assert_eq!(report.released, 0);
}

#[test]
fn removal_frees_key_for_newcomer() {
    let (mut tree, ids) = buttons(&["Save", "Settings"]);
    let root = tree.root();
    let mut engine = ShortcutEngine::new(config_with(&[]));
    engine.scan(&tree, root);
    assert_eq!(key_of(&engine, ids[0]), Some('s'));
    assert_eq!(key_of(&engine, ids[1]), Some('e'));

    tree.remove(ids[0]);
    let newcomer = tree.append(root, NodeSpec::new("button").text("Send"));
    engine.scan(&tree, root);

    assert_eq!(key_of(&engine, ids[0]), None);
    assert_eq!(key_of(&engine, newcomer), Some('s'));
    assert_eq!(key_of(&engine, ids[1]), Some('e'));
}

#[test]
fn relabeling_keeps_key() {
    let (mut tree, ids) = buttons(&["Save"]);
    let root = tree.root();
    let mut engine = ShortcutEngine::new(config_with(&[]));
    engine.scan(&tree, root);

    tree.set_text(ids[0], "Delete");
    let bindings = engine.scan(&tree, root);

    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].key, 's');
}

#[test]
fn mount_unmount_cycles_do_not_leak_keys() {
    let mut tree = MemoryTree::new();
    let root = tree.root();
    let mut engine = ShortcutEngine::new(Config::default());
    let baseline: BTreeSet<char> = engine.registry().used_keys().clone();

    for _ in 0..50 {
        let dialog = tree.append(root, NodeSpec::new("dialog"));
        tree.append(dialog, NodeSpec::new("button").text("Confirm"));
        tree.append(dialog, NodeSpec::new("button").text("Cancel"));
        assert_eq!(engine.scan(&tree, dialog).len(), 2);

        engine.release_container(&tree, dialog);
        tree.remove(dialog);
    }

    assert_eq!(engine.registry().used_keys(), &baseline);
}
