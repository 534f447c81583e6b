use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use crate::agent::error::InjectError;
use crate::dom::capability::{is_native_input, is_native_select, is_radio};
use crate::dom::dom_model::{Document, EventKind, NodeId};
use crate::dom::page::PageContext;
use crate::inject::result::{FillSummary, InjectionOutcome, InjectionResult};
use crate::screen::extractor::{custom_option_nodes, custom_option_value};
use crate::screen::field_model::{Field, FieldType};
use crate::state::normalize::{collapse_whitespace, normalize_key};

/// Answers that mean "checked".
pub const TRUTHY_ANSWERS: &[&str] = &["true", "yes", "1", "on", "checked"];

/// Set on every control the injector has written to.
pub const FILLED_MARKER_ATTR: &str = "data-autofill-state";
pub const FILLED_MARKER_VALUE: &str = "filled";

const HIGHLIGHT_STYLE: &str = "outline: 2px solid #34a853; outline-offset: 1px;";
const MANUAL_FLAG_STYLE: &str = "outline: 2px dashed #f9ab00; outline-offset: 1px;";
const ADVISORY_ATTR: &str = "data-autofill-advisory";

/// Writes answers into fields one at a time.
#[derive(Debug, Clone)]
pub struct FieldInjector {
    pub settle_delay: Duration,
    pub inter_field_delay: Duration,
}

impl Default for FieldInjector {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(50),
            inter_field_delay: Duration::from_millis(120),
        }
    }
}

impl FieldInjector {
    pub fn new(settle_delay: Duration, inter_field_delay: Duration) -> Self {
        Self {
            settle_delay,
            inter_field_delay,
        }
    }

    /// Fill every field that has an answer, serially, with a pause between
    /// fields. Per-field failures are recorded, never propagated.
    pub fn inject_answers(
        &self,
        page: &mut dyn PageContext,
        fields: &[Field],
        answers: &HashMap<String, String>,
    ) -> FillSummary {
        let mut results = Vec::with_capacity(fields.len());

        for (i, field) in fields.iter().enumerate() {
            let answer = answers
                .get(&field.id)
                .map(|a| a.trim())
                .filter(|a| !a.is_empty());

            let Some(answer) = answer else {
                results.push(InjectionResult {
                    field_id: field.id.clone(),
                    label: field.label.clone(),
                    outcome: InjectionOutcome::Skipped {
                        reason: "no answer available".into(),
                    },
                });
                continue;
            };

            if i > 0 {
                page.settle(self.inter_field_delay);
            }

            let outcome = match self.inject(page, field, answer) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(field = %field.id, error = %e, "Injection failed");
                    InjectionOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            results.push(InjectionResult {
                field_id: field.id.clone(),
                label: field.label.clone(),
                outcome,
            });
        }

        FillSummary::from_results(results)
    }

    /// Write one answer according to the field's type semantics.
    pub fn inject(
        &self,
        page: &mut dyn PageContext,
        field: &Field,
        answer: &str,
    ) -> Result<InjectionOutcome, InjectError> {
        ensure_attached(page.document(), field.element)?;
        debug!(field = %field.id, kind = field.field_type.as_str(), "Injecting answer");

        match field.field_type {
            t if t.is_text_like() => self.fill_text(page, field.element, answer)?,
            FieldType::SingleSelect if is_native_select(page.document(), field.element) => {
                fill_native_select(page.document_mut(), field.element, answer)?
            }
            FieldType::SingleSelect => fill_custom_dropdown(page.document_mut(), field, answer)?,
            FieldType::RadioGroup => fill_radio_group(page.document_mut(), field, answer)?,
            FieldType::Checkbox => fill_checkbox(page.document_mut(), field.element, answer),
            FieldType::File => {
                flag_file_upload(page.document_mut(), field);
                return Ok(InjectionOutcome::Skipped {
                    reason: "file uploads must be attached manually".into(),
                });
            }
            _ => return Err(InjectError::UnsupportedType(field.field_type)),
        }

        mark_filled(page.document_mut(), field.element);
        Ok(InjectionOutcome::Filled)
    }

    /// focus → clear → native set → input/change/blur → settle → blur.
    fn fill_text(&self, page: &mut dyn PageContext, element: NodeId, answer: &str) -> Result<(), InjectError> {
        let doc = page.document_mut();
        doc.dispatch(element, EventKind::Focus);
        doc.set_value_native(element, "");
        doc.set_value_native(element, answer);
        doc.dispatch(element, EventKind::Input);
        doc.dispatch(element, EventKind::InsertText);
        doc.dispatch(element, EventKind::Change);
        doc.dispatch(element, EventKind::Blur);

        page.settle(self.settle_delay);

        // The page may have re-rendered during the pause.
        ensure_attached(page.document(), element)?;
        page.document_mut().dispatch(element, EventKind::Blur);
        Ok(())
    }
}

fn ensure_attached(doc: &Document, element: NodeId) -> Result<(), InjectError> {
    if doc.is_attached(element) {
        Ok(())
    } else {
        Err(InjectError::Detached)
    }
}

// ============================================================================
// Option matching
// ============================================================================

/// Exact match on value or text first, then the answer contained
/// (case-insensitively) in an option's value or text.
fn match_option(candidates: &[(NodeId, String, String)], target: &str) -> Option<NodeId> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }

    if let Some((node, _, _)) = candidates
        .iter()
        .find(|(_, value, text)| value == target || text == target)
    {
        return Some(*node);
    }

    let lower = target.to_lowercase();
    candidates
        .iter()
        .find(|(_, value, text)| {
            let value = value.to_lowercase();
            let text = text.to_lowercase();
            (!value.is_empty() && value.contains(&lower))
                || (!text.is_empty() && text.contains(&lower))
        })
        .map(|(node, _, _)| *node)
}

fn fill_native_select(doc: &mut Document, select: NodeId, answer: &str) -> Result<(), InjectError> {
    let candidates: Vec<(NodeId, String, String)> = doc
        .options_of(select)
        .into_iter()
        .map(|o| (o, doc.option_value(o), collapse_whitespace(&doc.text_content(o))))
        .collect();

    let option = match_option(&candidates, answer).ok_or_else(|| InjectError::NoMatchingOption {
        value: answer.to_string(),
    })?;

    doc.select_option(select, option);
    doc.dispatch(select, EventKind::Change);
    doc.dispatch(select, EventKind::Blur);
    Ok(())
}

/// Custom dropdown: open it, type the text, click the matching option.
fn fill_custom_dropdown(doc: &mut Document, field: &Field, answer: &str) -> Result<(), InjectError> {
    let control = field.element;

    let mut option_nodes: Vec<NodeId> = field
        .options
        .iter()
        .filter_map(|o| o.node)
        .filter(|&n| doc.is_attached(n))
        .collect();
    if option_nodes.is_empty() {
        option_nodes = custom_option_nodes(doc, control);
    }

    doc.dispatch(control, EventKind::Focus);
    doc.dispatch(control, EventKind::Click);

    if option_nodes.is_empty() {
        // Free-text combobox with no rendered options
        if !is_native_input(doc, control) {
            return Err(InjectError::NoMatchingOption {
                value: answer.to_string(),
            });
        }
        doc.set_value_native(control, answer);
        doc.dispatch(control, EventKind::Input);
        doc.dispatch(control, EventKind::Change);
        doc.dispatch(control, EventKind::Blur);
        return Ok(());
    }

    let candidates: Vec<(NodeId, String, String)> = option_nodes
        .iter()
        .map(|&o| (o, custom_option_value(doc, o), collapse_whitespace(&doc.text_content(o))))
        .collect();

    let option = match_option(&candidates, answer).ok_or_else(|| InjectError::NoMatchingOption {
        value: answer.to_string(),
    })?;

    for &o in &option_nodes {
        doc.set_attr(o, "aria-selected", if o == option { "true" } else { "false" });
    }
    if is_native_input(doc, control) {
        let text = collapse_whitespace(&doc.text_content(option));
        doc.set_value_native(control, &text);
        doc.dispatch(control, EventKind::Input);
    }
    doc.dispatch(option, EventKind::Click);
    doc.dispatch(control, EventKind::Change);
    doc.dispatch(control, EventKind::Blur);
    Ok(())
}

/// Radio match: exact label/value, then case-insensitive equality, then
/// containment (the answer inside the label or value, or every answer word
/// present in the option label).
fn match_radio(candidates: &[(NodeId, String, String)], target: &str) -> Option<NodeId> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }

    let exact = candidates
        .iter()
        .find(|(_, label, value)| label == target || value == target);
    if let Some((node, _, _)) = exact {
        return Some(*node);
    }

    let lower = target.to_lowercase();
    let equal = candidates
        .iter()
        .find(|(_, label, value)| label.to_lowercase() == lower || value.to_lowercase() == lower);
    if let Some((node, _, _)) = equal {
        return Some(*node);
    }

    let target_key = normalize_key(target);
    if target_key.is_empty() {
        return None;
    }
    let target_words: Vec<&str> = target_key.split_whitespace().collect();
    candidates
        .iter()
        .find(|(_, label, value)| {
            let label_key = normalize_key(label);
            let value_key = normalize_key(value);
            let label_words: Vec<&str> = label_key.split_whitespace().collect();
            label_key.contains(&target_key)
                || value_key.contains(&target_key)
                || target_words.iter().all(|w| label_words.contains(w))
        })
        .map(|(node, _, _)| *node)
}

fn fill_radio_group(doc: &mut Document, field: &Field, answer: &str) -> Result<(), InjectError> {
    let members = radio_members(doc, field);
    if members.is_empty() {
        return Err(InjectError::MissingElement);
    }

    let candidates: Vec<(NodeId, String, String)> = members
        .iter()
        .map(|&m| {
            let label = field
                .options
                .iter()
                .find(|o| o.node == Some(m))
                .map(|o| o.label.clone())
                .unwrap_or_default();
            (m, label, doc.attr(m, "value").unwrap_or("on").to_string())
        })
        .collect();

    let choice = match_radio(&candidates, answer).ok_or_else(|| InjectError::NoMatchingRadio {
        value: answer.to_string(),
    })?;

    // Checking a radio unchecks the rest of its group.
    for &m in &members {
        if m != choice && doc.is_checked(m) {
            doc.set_checked(m, false);
        }
    }
    doc.set_checked(choice, true);
    doc.dispatch(choice, EventKind::Change);
    doc.dispatch(choice, EventKind::Click);
    mark_filled(doc, choice);
    Ok(())
}

/// Group members sharing the field's name within the same form, or the
/// extracted option elements when the group is unnamed.
fn radio_members(doc: &Document, field: &Field) -> Vec<NodeId> {
    let Some(name) = field.name.as_deref() else {
        return field
            .options
            .iter()
            .filter_map(|o| o.node)
            .filter(|&n| doc.is_attached(n))
            .collect();
    };

    let form_of = |n: NodeId| doc.ancestors(n).into_iter().find(|&a| doc.is_tag(a, "form"));
    let home = form_of(field.element);

    doc.all_elements()
        .into_iter()
        .filter(|&n| is_radio(doc, n) && doc.attr(n, "name") == Some(name))
        .filter(|&n| form_of(n) == home)
        .collect()
}

fn fill_checkbox(doc: &mut Document, element: NodeId, answer: &str) {
    let desired = TRUTHY_ANSWERS.contains(&answer.trim().to_lowercase().as_str());
    if doc.is_checked(element) != desired {
        doc.set_checked(element, desired);
        doc.dispatch(element, EventKind::Change);
        doc.dispatch(element, EventKind::Click);
    }
}

/// File inputs cannot be set from script. Leave a note next to the control
/// and flag it for the user instead.
fn flag_file_upload(doc: &mut Document, field: &Field) {
    let element = field.element;
    let already_flagged = doc
        .parent(element)
        .map(|p| {
            doc.children(p)
                .iter()
                .any(|&c| doc.attr(c, ADVISORY_ATTR) == Some(field.id.as_str()))
        })
        .unwrap_or(false);
    if already_flagged {
        return;
    }

    let mut attrs = std::collections::BTreeMap::new();
    attrs.insert(ADVISORY_ATTR.to_string(), field.id.clone());
    attrs.insert("class".to_string(), "autofill-advisory".to_string());
    attrs.insert("role".to_string(), "note".to_string());
    let note = doc.create_element("div", attrs);
    let text = doc.create_text(&format!("Please attach your {} manually.", field.label));
    doc.append_child(note, text);
    doc.insert_after(element, note);

    doc.set_attr(element, "data-autofill-flag", "manual-upload");
    append_style(doc, element, MANUAL_FLAG_STYLE);
}

fn mark_filled(doc: &mut Document, element: NodeId) {
    if doc.attr(element, FILLED_MARKER_ATTR) == Some(FILLED_MARKER_VALUE) {
        return;
    }
    doc.set_attr(element, FILLED_MARKER_ATTR, FILLED_MARKER_VALUE);
    append_style(doc, element, HIGHLIGHT_STYLE);
}

fn append_style(doc: &mut Document, element: NodeId, style: &str) {
    let current = doc.attr(element, "style").unwrap_or("").trim().to_string();
    if current.contains(style) {
        return;
    }
    let merged = if current.is_empty() {
        style.to_string()
    } else if current.ends_with(';') {
        format!("{} {}", current, style)
    } else {
        format!("{}; {}", current, style)
    };
    doc.set_attr(element, "style", &merged);
}

/// Whether a control has already been written by a previous pass.
pub fn is_marked_filled(doc: &Document, element: NodeId) -> bool {
    doc.attr(element, FILLED_MARKER_ATTR) == Some(FILLED_MARKER_VALUE)
}
