//! Label extraction — the display string a shortcut is derived from.

use crate::tree::{ElementId, ElementTree};

/// Derive the label for `element`. First non-empty source wins:
///
/// 1. `aria-label`
/// 2. visible text, with decorative glyphs stripped and whitespace
///    collapsed (`value` for button-like inputs)
/// 3. `title`
/// 4. `placeholder`, for text-entry elements only
///
/// Returns an empty string when none applies; such elements cannot be
/// bound.
pub fn extract_label<T: ElementTree + ?Sized>(tree: &T, element: ElementId) -> String {
    if let Some(label) = tree.attr(element, "aria-label").map(clean).filter(|l| !l.is_empty()) {
        return label;
    }

    let visible = if is_button_input(tree, element) {
        tree.attr(element, "value").map(clean).unwrap_or_default()
    } else {
        clean(&tree.text_content(element))
    };
    if !visible.is_empty() {
        return visible;
    }

    if let Some(title) = tree.attr(element, "title").map(clean).filter(|l| !l.is_empty()) {
        return title;
    }

    if is_text_entry(tree, element) {
        if let Some(placeholder) = tree.attr(element, "placeholder").map(clean) {
            return placeholder;
        }
    }

    String::new()
}

/// Strip pictographic code points and collapse whitespace.
pub fn clean(raw: &str) -> String {
    raw.chars()
        .map(|c| if is_decorative(c) { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Emoji, pictographs, dingbats, icon-font private use glyphs, and the
/// joiners/selectors that glue them together.
fn is_decorative(c: char) -> bool {
    matches!(
        c as u32,
        0x2300..=0x23FF
            | 0x2600..=0x27BF
            | 0x2B00..=0x2BFF
            | 0xE000..=0xF8FF
            | 0xFE00..=0xFE0F
            | 0x200D
            | 0x20E3
            | 0x1F000..=0x1FAFF
            | 0xE0020..=0xE007F
    )
}

fn is_button_input<T: ElementTree + ?Sized>(tree: &T, element: ElementId) -> bool {
    tree.tag(element) == Some("input")
        && matches!(
            tree.attr(element, "type"),
            Some("submit") | Some("button") | Some("reset")
        )
}

fn is_text_entry<T: ElementTree + ?Sized>(tree: &T, element: ElementId) -> bool {
    match tree.tag(element) {
        Some("textarea") => true,
        Some("input") => !is_button_input(tree, element),
        _ => false,
    }
}
