//! Automatic keyboard shortcuts for UI element trees.
//!
//! Scans a host tree for interactive elements, derives a single-key
//! shortcut for each from its label, keeps the assignment stable while
//! the tree mutates, and activates the bound element when the
//! configured modifier and key are pressed together.
//!
//! ```no_run
//! use hintkeys::config::Config;
//! use hintkeys::engine::ShortcutEngine;
//! use hintkeys::tree::ElementTree;
//! use hintkeys::tree::memory::{MemoryTree, NodeSpec};
//!
//! let mut tree = MemoryTree::new();
//! let root = tree.root();
//! tree.append(root, NodeSpec::new("button").text("Save"));
//!
//! let mut engine = ShortcutEngine::new(Config::default());
//! for binding in engine.scan(&tree, root) {
//!     println!("{} {}", binding.chord(), binding.label);
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod live;
pub mod tree;
