use serde::{Deserialize, Serialize};

use crate::dom::capability::{has_invalid_marker, is_error_region, is_native_input, is_native_select};
use crate::dom::dom_model::{Document, NodeId};
use crate::screen::field_model::{Container, Field, FieldType};
use crate::state::normalize::collapse_whitespace;

/// Ancestor levels searched for an error region that belongs to one field.
const MAX_ERROR_ANCESTOR_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum DeltaReason {
    RequiredEmpty,
    InvalidMarker,
    ErrorMessage(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaEntry {
    pub field_id: String,
    pub required: bool,
    pub reasons: Vec<DeltaReason>,
}

/// Fields still failing validation after an injection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationDelta {
    pub entries: Vec<DeltaEntry>,
    /// Distinct visible error texts, field-linked or not.
    pub messages: Vec<String>,
}

impl ValidationDelta {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn field_ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.field_id.clone()).collect()
    }

    pub fn required_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.required)
            .map(|e| e.field_id.clone())
            .collect()
    }

    pub fn contains(&self, field_id: &str) -> bool {
        self.entries.iter().any(|e| e.field_id == field_id)
    }
}

/// Compare the container's current state against its validation rules.
pub fn compute_validation_delta(doc: &Document, container: &Container) -> ValidationDelta {
    let mut delta = ValidationDelta::default();

    for field in &container.fields {
        let mut reasons = vec![];

        if field.required && is_field_visible(doc, field) && is_field_empty(doc, field) {
            reasons.push(DeltaReason::RequiredEmpty);
        }
        if field.elements().iter().any(|&e| has_invalid_marker(doc, e)) {
            reasons.push(DeltaReason::InvalidMarker);
        }
        for message in linked_error_messages(doc, container, field) {
            push_distinct(&mut delta.messages, &message);
            reasons.push(DeltaReason::ErrorMessage(message));
        }

        if !reasons.is_empty() {
            delta.entries.push(DeltaEntry {
                field_id: field.id.clone(),
                required: field.required,
                reasons,
            });
        }
    }

    for region in visible_error_regions(doc, Some(container.root)) {
        push_distinct(&mut delta.messages, &region.1);
    }

    delta
}

fn push_distinct(messages: &mut Vec<String>, message: &str) {
    if !message.is_empty() && !messages.iter().any(|m| m == message) {
        messages.push(message.to_string());
    }
}

fn is_field_visible(doc: &Document, field: &Field) -> bool {
    field.elements().iter().any(|&e| doc.is_visible(e))
}

/// Whether the field currently holds nothing.
pub fn is_field_empty(doc: &Document, field: &Field) -> bool {
    let element = field.element;
    match field.field_type {
        FieldType::RadioGroup => !field.elements().iter().any(|&e| doc.is_checked(e)),
        FieldType::Checkbox => !doc.is_checked(element),
        FieldType::SingleSelect if is_native_select(doc, element) => doc.value(element).trim().is_empty(),
        FieldType::SingleSelect if !is_native_input(doc, element) => {
            let picked = field
                .options
                .iter()
                .filter_map(|o| o.node)
                .any(|o| doc.attr(o, "aria-selected") == Some("true"));
            !picked && doc.attr_nonempty(element, "data-value").is_none()
        }
        _ => doc.value(element).trim().is_empty(),
    }
}

/// Error texts attached to a field: referenced by `aria-describedby` /
/// `aria-errormessage`, or sitting in a wrapper that holds only this field.
fn linked_error_messages(doc: &Document, container: &Container, field: &Field) -> Vec<String> {
    let mut messages = vec![];

    for element in field.elements() {
        for attr in ["aria-errormessage", "aria-describedby"] {
            let Some(ids) = doc.attr(element, attr) else {
                continue;
            };
            for target in ids.split_whitespace().filter_map(|id| doc.element_by_id(id)) {
                let counts = attr == "aria-errormessage"
                    || is_error_region(doc, target)
                    || has_invalid_marker(doc, element);
                if counts && doc.is_visible(target) {
                    let text = collapse_whitespace(&doc.text_content(target));
                    if !text.is_empty() && !messages.contains(&text) {
                        messages.push(text);
                    }
                }
            }
        }
    }

    if !messages.is_empty() {
        return messages;
    }

    for ancestor in doc.ancestors(field.element).into_iter().take(MAX_ERROR_ANCESTOR_DEPTH) {
        if ancestor == container.root || !doc.contains(container.root, ancestor) {
            break;
        }
        if fields_inside(doc, container, ancestor) > 1 {
            break;
        }
        for (_, text) in visible_error_regions(doc, Some(ancestor)) {
            if !messages.contains(&text) {
                messages.push(text);
            }
        }
        if !messages.is_empty() {
            break;
        }
    }

    messages
}

fn fields_inside(doc: &Document, container: &Container, ancestor: NodeId) -> usize {
    container
        .fields
        .iter()
        .filter(|f| f.elements().iter().any(|&e| doc.contains(ancestor, e)))
        .count()
}

/// Visible error regions with text, under `scope` (or the whole page).
pub fn visible_error_regions(doc: &Document, scope: Option<NodeId>) -> Vec<(NodeId, String)> {
    let nodes = match scope {
        Some(root) => doc.descendant_elements(root),
        None => doc.all_elements(),
    };
    nodes
        .into_iter()
        .filter(|&n| is_error_region(doc, n) && doc.is_visible(n))
        .map(|n| (n, collapse_whitespace(&doc.text_content(n))))
        .filter(|(_, text)| !text.is_empty())
        .collect()
}
