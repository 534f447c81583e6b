use crate::dom::capability::is_interactive_control;
use crate::dom::dom_model::{Document, NodeId};
use crate::screen::field_model::LabelSource;
use crate::state::normalize::{UNNAMED_FIELD, clean_label, title_case_name};

type LabelStrategy = fn(&Document, NodeId) -> Option<String>;

/// Label resolution order. The first strategy that yields usable text wins.
const LABEL_CHAIN: &[(LabelSource, LabelStrategy)] = &[
    (LabelSource::AriaLabelledBy, aria_labelledby),
    (LabelSource::ExplicitLabel, explicit_label),
    (LabelSource::WrappingLabel, wrapping_label),
    (LabelSource::Legend, fieldset_legend),
    (LabelSource::QuestionGroup, question_group_prompt),
    (LabelSource::AriaLabel, aria_label),
    (LabelSource::Placeholder, placeholder),
    (LabelSource::Name, name_attribute),
];

/// How far up the tree to look for a question prompt.
const MAX_GROUP_DEPTH: usize = 4;

/// Prompts longer than this are paragraphs, not questions.
const MAX_PROMPT_LEN: usize = 200;

pub fn resolve_label(doc: &Document, control: NodeId) -> (String, LabelSource) {
    resolve_with(doc, control, |_| true)
}

/// Label for a radio group as a whole: skips the per-control `<label>`
/// steps, which name individual options rather than the question.
pub fn resolve_group_label(doc: &Document, control: NodeId) -> (String, LabelSource) {
    resolve_with(doc, control, |source| {
        !matches!(source, LabelSource::ExplicitLabel | LabelSource::WrappingLabel)
    })
}

/// Label of one option control (radio/checkbox): only the steps that name the
/// control itself.
pub fn resolve_option_label(doc: &Document, control: NodeId) -> Option<String> {
    const OPTION_CHAIN: &[LabelStrategy] =
        &[aria_labelledby, explicit_label, wrapping_label, aria_label];
    OPTION_CHAIN.iter().find_map(|strategy| strategy(doc, control))
}

fn resolve_with(
    doc: &Document,
    control: NodeId,
    allowed: impl Fn(LabelSource) -> bool,
) -> (String, LabelSource) {
    LABEL_CHAIN
        .iter()
        .filter(|(source, _)| allowed(*source))
        .find_map(|(source, strategy)| strategy(doc, control).map(|label| (label, *source)))
        .unwrap_or_else(|| (UNNAMED_FIELD.to_string(), LabelSource::Unnamed))
}

// ---- Strategies ----

fn aria_labelledby(doc: &Document, control: NodeId) -> Option<String> {
    let ids = doc.attr_nonempty(control, "aria-labelledby")?;
    let text = ids
        .split_whitespace()
        .filter_map(|id| doc.element_by_id(id))
        .map(|n| doc.text_content(n))
        .collect::<Vec<_>>()
        .join(" ");
    clean_label(&text)
}

fn explicit_label(doc: &Document, control: NodeId) -> Option<String> {
    let html_id = doc.attr_nonempty(control, "id")?;
    doc.all_elements()
        .into_iter()
        .filter(|&n| doc.is_tag(n, "label") && doc.attr(n, "for") == Some(html_id))
        .find_map(|label| clean_label(&doc.text_content_excluding(label, Some(control))))
}

fn wrapping_label(doc: &Document, control: NodeId) -> Option<String> {
    let label = doc
        .ancestors(control)
        .into_iter()
        .find(|&a| doc.is_tag(a, "label"))?;
    clean_label(&doc.text_content_excluding(label, Some(control)))
}

fn fieldset_legend(doc: &Document, control: NodeId) -> Option<String> {
    let fieldset = doc
        .ancestors(control)
        .into_iter()
        .find(|&a| doc.is_tag(a, "fieldset"))?;
    let legend = doc
        .children(fieldset)
        .iter()
        .copied()
        .find(|&c| doc.is_tag(c, "legend"))?;
    clean_label(&doc.text_content(legend))
}

/// Nearest preceding text within the same logical question: walk up a few
/// levels, checking earlier siblings nearest-first. A sibling that holds
/// another control belongs to a different question and stops the search.
fn question_group_prompt(doc: &Document, control: NodeId) -> Option<String> {
    let mut current = control;

    for _ in 0..MAX_GROUP_DEPTH {
        let parent = doc.parent(current)?;
        if doc.is_tag(parent, "form") || doc.is_tag(parent, "body") {
            return None;
        }

        let siblings = doc.children(parent);
        let pos = siblings.iter().position(|&c| c == current)?;

        for &sibling in siblings[..pos].iter().rev() {
            if holds_control(doc, sibling) {
                return None;
            }
            if doc.element(sibling).is_some() && !doc.is_visible(sibling) {
                continue;
            }
            if let Some(text) = clean_label(&doc.text_content(sibling)) {
                if text.len() <= MAX_PROMPT_LEN {
                    return Some(text);
                }
            }
        }

        current = parent;
    }

    None
}

fn holds_control(doc: &Document, node: NodeId) -> bool {
    doc.element(node).is_some()
        && (is_interactive_control(doc, node)
            || doc
                .descendant_elements(node)
                .into_iter()
                .any(|d| is_interactive_control(doc, d)))
}

fn aria_label(doc: &Document, control: NodeId) -> Option<String> {
    clean_label(doc.attr(control, "aria-label")?)
}

fn placeholder(doc: &Document, control: NodeId) -> Option<String> {
    clean_label(doc.attr(control, "placeholder")?)
}

fn name_attribute(doc: &Document, control: NodeId) -> Option<String> {
    clean_label(&title_case_name(doc.attr(control, "name")?))
}
