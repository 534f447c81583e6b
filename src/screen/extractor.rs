use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::dom::capability::{
    Capability, has_autocomplete_hint, has_control_role, has_listbox_role, input_kind,
    is_hidden_input, is_interactive_control, is_native_select, is_option_role, is_radio,
    is_textarea, role,
};
use crate::dom::dom_model::{Document, NodeId};
use crate::screen::field_model::{Field, FieldOption, FieldType, LabelSource, ValidationRules};
use crate::screen::label::{resolve_group_label, resolve_label, resolve_option_label};
use crate::state::normalize::{collapse_whitespace, is_generic_label, normalize_key};

/// Name fragments of framework plumbing fields.
const SKIPPED_NAME_TOKENS: &[&str] = &["csrf", "token", "_method", "authenticity_token"];

/// Ids generated by widget libraries: a long digit run plus a short suffix.
fn anonymous_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_:-]*\d{6,}[-_:]?[A-Za-z0-9]{0,4}$")
            .expect("anonymous id regex is valid")
    })
}

// ============================================================================
// Control discovery
// ============================================================================

/// Interactive controls inside `root`, in document order.
///
/// ARIA pseudo-controls wrapping a native control, and listboxes that are
/// merely the popup of a combobox, are left out: the native control or the
/// combobox is the real question.
pub fn collect_controls(doc: &Document, root: NodeId) -> Vec<NodeId> {
    let popups = referenced_popups(doc);

    doc.descendant_elements(root)
        .into_iter()
        .filter(|&n| is_interactive_control(doc, n))
        .filter(|&n| !is_hidden_input(doc, n))
        .filter(|&n| !(is_option_popup(doc, n) && popups.contains(&n)))
        .filter(|&n| {
            !(has_control_role(doc, n)
                && doc
                    .descendant_elements(n)
                    .into_iter()
                    .any(|d| is_interactive_control(doc, d)))
        })
        .collect()
}

fn is_option_popup(doc: &Document, id: NodeId) -> bool {
    role(doc, id).as_deref() == Some("listbox")
}

fn referenced_popups(doc: &Document) -> HashSet<NodeId> {
    doc.all_elements()
        .into_iter()
        .flat_map(|n| {
            ["aria-controls", "aria-owns"]
                .into_iter()
                .filter_map(move |attr| doc.attr(n, attr))
                .flat_map(|ids| ids.split_whitespace())
                .filter_map(|id| doc.element_by_id(id))
                .collect::<Vec<_>>()
        })
        .collect()
}

// ============================================================================
// Type determination
// ============================================================================

fn is_select_like(doc: &Document, id: NodeId) -> bool {
    const CHAIN: &[Capability] = &[is_native_select, has_listbox_role, has_autocomplete_hint];
    CHAIN.iter().any(|check| check(doc, id))
}

pub fn determine_type(doc: &Document, control: NodeId) -> FieldType {
    if is_textarea(doc, control) {
        return FieldType::LongText;
    }
    if is_select_like(doc, control) {
        return FieldType::SingleSelect;
    }
    if !doc.is_tag(control, "input") {
        // ARIA textbox / spinbutton
        return match role(doc, control).as_deref() {
            Some("spinbutton") => FieldType::Numeric,
            _ if doc.attr(control, "aria-multiline") == Some("true") => FieldType::LongText,
            _ => FieldType::ShortText,
        };
    }

    match input_kind(doc, control).as_str() {
        "email" => FieldType::Email,
        "tel" => FieldType::Phone,
        "url" => FieldType::Url,
        "number" | "range" => FieldType::Numeric,
        "date" | "datetime-local" | "month" | "week" | "time" => FieldType::Date,
        "radio" => FieldType::RadioGroup,
        "checkbox" => FieldType::Checkbox,
        "file" => FieldType::File,
        "color" => FieldType::UnsupportedOther,
        // password is deliberately plain text; unknown kinds too
        _ => FieldType::ShortText,
    }
}

// ============================================================================
// Skip policy
// ============================================================================

fn has_plumbing_name(doc: &Document, control: NodeId) -> bool {
    doc.attr(control, "name")
        .map(|n| {
            let lower = n.to_lowercase();
            SKIPPED_NAME_TOKENS.iter().any(|t| lower.contains(t))
        })
        .unwrap_or(false)
}

fn is_anonymous_widget_part(doc: &Document, control: NodeId, label_source: LabelSource) -> bool {
    let Some(html_id) = doc.attr_nonempty(control, "id") else {
        return false;
    };
    anonymous_id_pattern().is_match(html_id)
        && doc.attr_nonempty(control, "name").is_none()
        && label_source == LabelSource::Unnamed
}

// ============================================================================
// Extraction
// ============================================================================

/// Build the deduplicated field list for one container.
pub fn extract_fields(doc: &Document, root: NodeId) -> Vec<Field> {
    let controls = collect_controls(doc, root);
    let mut raw = Vec::new();
    let mut radio_groups = HashSet::new();

    for (ordinal, &control) in controls.iter().enumerate() {
        if is_hidden_input(doc, control) || has_plumbing_name(doc, control) {
            continue;
        }

        let field_type = determine_type(doc, control);

        let field = if field_type == FieldType::RadioGroup {
            let group = doc.attr(control, "name").unwrap_or("").to_string();
            if !group.is_empty() && !radio_groups.insert(group.clone()) {
                continue;
            }
            build_radio_group(doc, control, &group, &controls, ordinal)
        } else {
            build_field(doc, control, field_type, ordinal)
        };

        if is_anonymous_widget_part(doc, control, field.label_source) {
            continue;
        }

        raw.push(field);
    }

    assign_unique_ids(&mut raw);
    dedupe_fields(raw)
}

fn build_field(doc: &Document, control: NodeId, field_type: FieldType, ordinal: usize) -> Field {
    let (label, label_source) = resolve_label(doc, control);
    let validation = read_validation(doc, control);

    let options = match field_type {
        FieldType::SingleSelect if is_native_select(doc, control) => native_options(doc, control),
        FieldType::SingleSelect => custom_options(doc, control),
        _ => vec![],
    };

    let current_value = match field_type {
        FieldType::Checkbox => {
            if doc.is_checked(control) {
                "true".to_string()
            } else {
                String::new()
            }
        }
        _ => doc.value(control),
    };

    Field {
        id: base_id(doc, control, ordinal),
        name: doc.attr_nonempty(control, "name").map(str::to_string),
        html_id: doc.attr_nonempty(control, "id").map(str::to_string),
        label,
        label_source,
        field_type,
        required: validation.required,
        placeholder: doc.attr_nonempty(control, "placeholder").map(str::to_string),
        options,
        current_value,
        validation,
        element: control,
    }
}

fn build_radio_group(
    doc: &Document,
    first: NodeId,
    group: &str,
    controls: &[NodeId],
    ordinal: usize,
) -> Field {
    let members: Vec<NodeId> = if group.is_empty() {
        vec![first]
    } else {
        controls
            .iter()
            .copied()
            .filter(|&c| is_radio(doc, c) && doc.attr(c, "name") == Some(group))
            .collect()
    };

    let options: Vec<FieldOption> = members
        .iter()
        .map(|&m| {
            let value = doc.attr(m, "value").unwrap_or("on").to_string();
            FieldOption {
                label: resolve_option_label(doc, m).unwrap_or_else(|| value.clone()),
                value,
                selected: doc.is_checked(m),
                node: Some(m),
            }
        })
        .collect();

    let (label, label_source) = resolve_group_label(doc, first);
    let mut validation = read_validation(doc, first);
    validation.required = members.iter().any(|&m| is_required(doc, m));

    let current_value = options
        .iter()
        .find(|o| o.selected)
        .map(|o| o.value.clone())
        .unwrap_or_default();

    Field {
        id: if group.is_empty() {
            base_id(doc, first, ordinal)
        } else {
            group.to_string()
        },
        name: (!group.is_empty()).then(|| group.to_string()),
        html_id: doc.attr_nonempty(first, "id").map(str::to_string),
        label,
        label_source,
        field_type: FieldType::RadioGroup,
        required: validation.required,
        placeholder: None,
        options,
        current_value,
        validation,
        element: first,
    }
}

fn native_options(doc: &Document, select: NodeId) -> Vec<FieldOption> {
    doc.options_of(select)
        .into_iter()
        .map(|o| FieldOption {
            value: doc.option_value(o),
            label: collapse_whitespace(&doc.text_content(o)),
            selected: doc.is_selected(o),
            node: Some(o),
        })
        .collect()
}

/// Option elements for a custom dropdown: the ARIA-referenced listbox if
/// there is one, otherwise every option-role element on the page.
pub fn custom_option_nodes(doc: &Document, control: NodeId) -> Vec<NodeId> {
    let referenced: Vec<NodeId> = ["aria-controls", "aria-owns"]
        .into_iter()
        .filter_map(|attr| doc.attr(control, attr))
        .flat_map(|ids| ids.split_whitespace())
        .filter_map(|id| doc.element_by_id(id))
        .collect();

    let from_listbox: Vec<NodeId> = referenced
        .iter()
        .flat_map(|&lb| doc.descendant_elements(lb))
        .filter(|&n| is_option_role(doc, n))
        .collect();
    if !from_listbox.is_empty() {
        return from_listbox;
    }

    // A listbox control holds its own options.
    let own: Vec<NodeId> = doc
        .descendant_elements(control)
        .into_iter()
        .filter(|&n| is_option_role(doc, n))
        .collect();
    if !own.is_empty() {
        return own;
    }

    doc.all_elements()
        .into_iter()
        .filter(|&n| is_option_role(doc, n))
        .collect()
}

pub fn custom_option_value(doc: &Document, option: NodeId) -> String {
    doc.attr_nonempty(option, "data-value")
        .map(str::to_string)
        .unwrap_or_else(|| collapse_whitespace(&doc.text_content(option)))
}

fn custom_options(doc: &Document, control: NodeId) -> Vec<FieldOption> {
    let nodes = custom_option_nodes(doc, control);
    let selected_index = nodes
        .iter()
        .position(|&n| doc.attr(n, "aria-selected") == Some("true"))
        .unwrap_or(0);

    nodes
        .into_iter()
        .enumerate()
        .map(|(i, n)| FieldOption {
            value: custom_option_value(doc, n),
            label: collapse_whitespace(&doc.text_content(n)),
            selected: i == selected_index,
            node: Some(n),
        })
        .collect()
}

fn is_required(doc: &Document, control: NodeId) -> bool {
    doc.has_attr(control, "required") || doc.attr(control, "aria-required") == Some("true")
}

fn read_validation(doc: &Document, control: NodeId) -> ValidationRules {
    let number = |name: &str| doc.attr_nonempty(control, name).and_then(|v| v.parse().ok());
    let text = |name: &str| doc.attr_nonempty(control, name).map(str::to_string);

    ValidationRules {
        pattern: text("pattern"),
        min: text("min"),
        max: text("max"),
        min_length: number("minlength"),
        max_length: number("maxlength"),
        required: is_required(doc, control),
    }
}

fn base_id(doc: &Document, control: NodeId, ordinal: usize) -> String {
    doc.attr_nonempty(control, "id")
        .or_else(|| doc.attr_nonempty(control, "name"))
        .map(str::to_string)
        .unwrap_or_else(|| format!("field-{}", ordinal))
}

fn assign_unique_ids(fields: &mut [Field]) {
    let originals: HashSet<String> = fields.iter().map(|f| f.id.clone()).collect();
    let mut used: HashSet<String> = HashSet::new();
    for field in fields.iter_mut() {
        if used.contains(&field.id) {
            // A suffix must not collide with an id the page already uses.
            let mut n = 2;
            let mut candidate = format!("{}-{}", field.id, n);
            while used.contains(&candidate) || originals.contains(&candidate) {
                n += 1;
                candidate = format!("{}-{}", field.id, n);
            }
            field.id = candidate;
        }
        used.insert(field.id.clone());
    }
}

// ============================================================================
// Deduplication
// ============================================================================

/// Key under which two raw controls are considered the same question.
pub fn dedupe_key(field: &Field) -> String {
    if field.has_usable_label() && !is_generic_label(&field.label) {
        return format!("label:{}", normalize_key(&field.label));
    }
    if let Some(name) = field.name.as_deref().map(normalize_key).filter(|n| !n.is_empty()) {
        return format!("name:{}", name);
    }
    if let Some(id) = field.html_id.as_deref().map(normalize_key).filter(|i| !i.is_empty()) {
        return format!("id:{}", id);
    }
    format!("field:{}", field.id)
}

/// How much a raw control tells us about its question. Higher wins.
pub fn descriptive_score(field: &Field) -> i32 {
    let mut score = 0;
    if field.field_type == FieldType::SingleSelect {
        score += 5;
    }
    if !field.options.is_empty() {
        score += 4;
    }
    if field.required {
        score += 2;
    }
    if field.has_usable_label() && !is_generic_label(&field.label) {
        score += 2;
    }
    if field.name.is_some() {
        score += 1;
    }
    if field.field_type == FieldType::ShortText {
        score -= 1;
    }
    score
}

/// Collapse fields sharing a dedupe key, keeping the richer one in the
/// position of the first occurrence.
pub fn dedupe_fields(fields: Vec<Field>) -> Vec<Field> {
    let mut out: Vec<Field> = Vec::with_capacity(fields.len());
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for field in fields {
        let key = dedupe_key(&field);
        match index_by_key.get(&key) {
            Some(&i) => {
                if descriptive_score(&field) > descriptive_score(&out[i]) {
                    out[i] = field;
                }
            }
            None => {
                index_by_key.insert(key, out.len());
                out.push(field);
            }
        }
    }

    out
}
