//! Named capability checks over page elements.
//!
//! Each check answers one yes/no question about a node. Classification code
//! composes them as ordered chains with early exit instead of one large
//! conditional.

use crate::dom::dom_model::{Document, NodeId};

pub type Capability = fn(&Document, NodeId) -> bool;

/// Input kinds that are buttons, not questions.
const BUTTON_INPUT_KINDS: &[&str] = &["submit", "button", "reset", "image"];

/// ARIA roles that stand in for a native control.
const CONTROL_ROLES: &[&str] = &["combobox", "listbox", "textbox", "spinbutton"];

/// Declared input kind, lowercased, `text` when absent.
pub fn input_kind(doc: &Document, id: NodeId) -> String {
    doc.attr_nonempty(id, "type")
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "text".to_string())
}

pub fn role(doc: &Document, id: NodeId) -> Option<String> {
    doc.attr_nonempty(id, "role").map(str::to_ascii_lowercase)
}

pub fn is_textarea(doc: &Document, id: NodeId) -> bool {
    doc.is_tag(id, "textarea")
}

pub fn is_native_select(doc: &Document, id: NodeId) -> bool {
    doc.is_tag(id, "select")
}

pub fn is_native_input(doc: &Document, id: NodeId) -> bool {
    doc.is_tag(id, "input")
}

pub fn has_listbox_role(doc: &Document, id: NodeId) -> bool {
    matches!(role(doc, id).as_deref(), Some("combobox") | Some("listbox"))
        || doc.attr(id, "aria-haspopup") == Some("listbox")
}

pub fn has_autocomplete_hint(doc: &Document, id: NodeId) -> bool {
    matches!(
        doc.attr(id, "aria-autocomplete"),
        Some("list") | Some("both")
    )
}

pub fn is_hidden_input(doc: &Document, id: NodeId) -> bool {
    is_native_input(doc, id) && input_kind(doc, id) == "hidden"
}

pub fn is_button_like(doc: &Document, id: NodeId) -> bool {
    if doc.is_tag(id, "button") {
        return true;
    }
    if is_native_input(doc, id) && BUTTON_INPUT_KINDS.contains(&input_kind(doc, id).as_str()) {
        return true;
    }
    role(doc, id).as_deref() == Some("button")
}

pub fn has_control_role(doc: &Document, id: NodeId) -> bool {
    role(doc, id)
        .map(|r| CONTROL_ROLES.contains(&r.as_str()))
        .unwrap_or(false)
}

pub fn is_option_role(doc: &Document, id: NodeId) -> bool {
    role(doc, id).as_deref() == Some("option")
}

pub fn is_radio(doc: &Document, id: NodeId) -> bool {
    is_native_input(doc, id) && input_kind(doc, id) == "radio"
}

/// Native controls a user answers a question with.
pub fn is_native_control(doc: &Document, id: NodeId) -> bool {
    if is_textarea(doc, id) || is_native_select(doc, id) {
        return true;
    }
    is_native_input(doc, id) && !is_button_like(doc, id)
}

/// Any element that should be treated as a form control, native or ARIA.
pub fn is_interactive_control(doc: &Document, id: NodeId) -> bool {
    const CHAIN: &[Capability] = &[is_native_control, has_control_role];
    CHAIN.iter().any(|check| check(doc, id))
}

fn has_alert_role(doc: &Document, id: NodeId) -> bool {
    role(doc, id).as_deref() == Some("alert")
}

fn is_assertive_live_region(doc: &Document, id: NodeId) -> bool {
    doc.attr(id, "aria-live") == Some("assertive")
}

fn has_error_class(doc: &Document, id: NodeId) -> bool {
    doc.class_contains(id, "error") || doc.class_contains(id, "invalid-feedback")
}

/// Elements that announce a validation problem.
pub fn is_error_region(doc: &Document, id: NodeId) -> bool {
    if doc.has_attr(id, "data-autofill-advisory") {
        return false;
    }
    const CHAIN: &[Capability] = &[has_alert_role, is_assertive_live_region, has_error_class];
    CHAIN.iter().any(|check| check(doc, id))
}

fn is_aria_invalid(doc: &Document, id: NodeId) -> bool {
    doc.attr(id, "aria-invalid") == Some("true")
}

fn has_invalid_data_flag(doc: &Document, id: NodeId) -> bool {
    doc.has_attr(id, "data-invalid")
}

fn has_invalid_class(doc: &Document, id: NodeId) -> bool {
    doc.class_contains(id, "invalid")
}

/// The control itself says it is invalid.
pub fn has_invalid_marker(doc: &Document, id: NodeId) -> bool {
    const CHAIN: &[Capability] = &[is_aria_invalid, has_invalid_data_flag, has_invalid_class];
    CHAIN.iter().any(|check| check(doc, id))
}

/// Accessible label of a button-like control.
pub fn button_label(doc: &Document, id: NodeId) -> String {
    let text = doc.text_content(id);
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if !text.is_empty() {
        return text;
    }
    doc.attr_nonempty(id, "value")
        .or_else(|| doc.attr_nonempty(id, "aria-label"))
        .or_else(|| doc.attr_nonempty(id, "title"))
        .unwrap_or("")
        .to_string()
}
