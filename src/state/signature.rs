use serde::Serialize;

use crate::dom::dom_model::{Document, NodeId};
use crate::dom::page::{PageContext, page_path};
use crate::screen::field_model::Field;
use crate::state::normalize::{collapse_whitespace, normalize_key, text_fingerprint};

/// Stable identity of one rendered form: sorted (label, type) pairs plus
/// the page path, hashed.
pub fn form_signature(fields: &[Field], url: &str) -> String {
    let mut pairs: Vec<String> = fields
        .iter()
        .map(|f| format!("{}|{}", normalize_key(&f.label), f.field_type.as_str()))
        .collect();
    pairs.sort();

    let material = format!("{}\n{}", page_path(url), pairs.join("\n"));
    text_fingerprint(&material)
}

/// Where a multi-step form currently is: path plus visible heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepSignature {
    pub path: String,
    pub heading: String,
}

pub fn step_signature(page: &dyn PageContext) -> StepSignature {
    StepSignature {
        path: page_path(page.url()),
        heading: current_heading(page.document()).unwrap_or_default(),
    }
}

fn current_heading(doc: &Document) -> Option<String> {
    const HEADING_TAGS: &[&str] = &["h1", "h2", "h3"];

    let elements = doc.all_elements();
    for tag in HEADING_TAGS {
        if let Some(text) = first_visible_text(doc, &elements, |d, n| d.is_tag(n, tag)) {
            return Some(text);
        }
    }
    first_visible_text(doc, &elements, |d, n| d.attr(n, "role") == Some("heading"))
}

fn first_visible_text(
    doc: &Document,
    elements: &[NodeId],
    matches: impl Fn(&Document, NodeId) -> bool,
) -> Option<String> {
    elements
        .iter()
        .filter(|&&n| matches(doc, n) && doc.is_visible(n))
        .map(|&n| collapse_whitespace(&doc.text_content(n)))
        .find(|t| !t.is_empty())
}
