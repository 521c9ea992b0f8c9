//! Element selectors for the inclusion and exclusion predicates.
//!
//! A small CSS subset: compound selectors (`tag`, `*`, `#id`,
//! `.class`, `[attr]`, `[attr=value]`) joined by the descendant
//! combinator (whitespace). Ancestor compounds only match inside the
//! scope passed to [`Selector::matches`], which makes patterns like
//! `.pagination button` relative to the scanned container.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use super::{ElementId, ElementTree};

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?:(?P<ws>\s+)|(?P<tag>\*|[A-Za-z][\w-]*)|#(?P<id>[\w-]+)|\.(?P<class>[\w-]+)|\[\s*(?P<attr>[\w-]+)\s*(?:=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[^\]\s]+)))?\s*\])"#,
    )
    .expect("selector token regex is valid")
});

/// Selector parse error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected input in selector {selector:?} at byte {offset}")]
    Unexpected { selector: String, offset: usize },
    #[error("tag name must lead its compound in selector {selector:?}")]
    MisplacedTag { selector: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatch {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    /// `None` matches any tag (also used for `*`).
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
    universal: bool,
}

impl Compound {
    fn is_empty(&self) -> bool {
        !self.universal
            && self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
    }

    fn matches<T: ElementTree + ?Sized>(&self, tree: &T, element: ElementId) -> bool {
        if let Some(tag) = &self.tag {
            if tree.tag(element) != Some(tag.as_str()) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if tree.attr(element, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| tree.has_class(element, c)) {
            return false;
        }
        self.attrs.iter().all(|a| match (&a.value, tree.attr(element, &a.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(want), Some(have)) => want == have,
        })
    }
}

/// A parsed selector. The last compound is the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    compounds: Vec<Compound>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut compounds = Vec::new();
        let mut current = Compound::default();
        let mut offset = 0;

        while offset < trimmed.len() {
            let rest = &trimmed[offset..];
            let caps = TOKEN.captures(rest).ok_or_else(|| SelectorError::Unexpected {
                selector: source.to_string(),
                offset,
            })?;
            let matched = caps.get(0).map_or(0, |m| m.end());

            if caps.name("ws").is_some() {
                compounds.push(std::mem::take(&mut current));
            } else if let Some(tag) = caps.name("tag") {
                if !current.is_empty() {
                    return Err(SelectorError::MisplacedTag {
                        selector: source.to_string(),
                    });
                }
                if tag.as_str() == "*" {
                    current.universal = true;
                } else {
                    current.tag = Some(tag.as_str().to_ascii_lowercase());
                }
            } else if let Some(id) = caps.name("id") {
                current.id = Some(id.as_str().to_string());
            } else if let Some(class) = caps.name("class") {
                current.classes.push(class.as_str().to_string());
            } else if let Some(attr) = caps.name("attr") {
                let value = caps
                    .name("dq")
                    .or_else(|| caps.name("sq"))
                    .or_else(|| caps.name("bare"))
                    .map(|m| m.as_str().to_string());
                current.attrs.push(AttrMatch {
                    name: attr.as_str().to_ascii_lowercase(),
                    value,
                });
            }

            offset += matched;
        }
        compounds.push(current);

        Ok(Self {
            source: trimmed.to_string(),
            compounds,
        })
    }

    /// Whether `element` matches, with ancestor compounds resolved no
    /// higher than `scope` (inclusive).
    pub fn matches<T: ElementTree + ?Sized>(
        &self,
        tree: &T,
        element: ElementId,
        scope: ElementId,
    ) -> bool {
        let Some((subject, ancestors)) = self.compounds.split_last() else {
            return false;
        };
        if !subject.matches(tree, element) {
            return false;
        }

        // Greedy nearest-ancestor matching is exact for descendant-only
        // combinators.
        let mut cursor = element;
        for compound in ancestors.iter().rev() {
            loop {
                if cursor == scope {
                    return false;
                }
                match tree.parent(cursor) {
                    Some(parent) => cursor = parent,
                    None => return false,
                }
                if compound.matches(tree, cursor) {
                    break;
                }
            }
        }
        true
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::memory::{MemoryTree, NodeSpec};

    fn page() -> (MemoryTree, ElementId, ElementId, ElementId) {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let nav = tree.append(root, NodeSpec::new("nav").class("pagination"));
        let next = tree.append(nav, NodeSpec::new("a").attr("href", "#2").text("Next"));
        let save = tree.append(
            root,
            NodeSpec::new("button").attr("type", "submit").attr("id", "save").text("Save"),
        );
        (tree, nav, next, save)
    }

    #[test]
    fn parse_rejects_empty_and_garbage() {
        assert_eq!(Selector::parse("   "), Err(SelectorError::Empty));
        assert!(matches!(
            Selector::parse("button > a"),
            Err(SelectorError::Unexpected { offset: 7, .. })
        ));
        assert!(matches!(
            Selector::parse(".x button"),
            Ok(_)
        ));
        assert!(matches!(
            Selector::parse(".xbutton[disabled]a"),
            Err(SelectorError::MisplacedTag { .. })
        ));
    }

    #[test]
    fn compound_matches_tag_id_class_and_attrs() {
        let (tree, _, next, save) = page();
        let root = tree.root();

        assert!(Selector::parse("button").unwrap().matches(&tree, save, root));
        assert!(Selector::parse("#save").unwrap().matches(&tree, save, root));
        assert!(Selector::parse("button[type=submit]").unwrap().matches(&tree, save, root));
        assert!(Selector::parse("[type=\"submit\"]").unwrap().matches(&tree, save, root));
        assert!(!Selector::parse("button[type=reset]").unwrap().matches(&tree, save, root));
        assert!(Selector::parse("a[href]").unwrap().matches(&tree, next, root));
        assert!(Selector::parse("*").unwrap().matches(&tree, next, root));
        assert!(!Selector::parse("a").unwrap().matches(&tree, save, root));
    }

    #[test]
    fn descendant_combinator_is_scope_relative() {
        let (tree, nav, next, save) = page();
        let root = tree.root();
        let sel = Selector::parse(".pagination a").unwrap();

        assert!(sel.matches(&tree, next, root));
        assert!(!sel.matches(&tree, save, root));
        // The ancestor sits at the scope boundary, so it is still visible.
        assert!(sel.matches(&tree, next, nav));
        // Scoped below the pagination container, the ancestor is out of reach.
        let inner_scope = next;
        assert!(!sel.matches(&tree, next, inner_scope));
    }
}
