use chrono::Utc;
use tracing::{debug, info};

use crate::dom::capability::{button_label, is_button_like, role};
use crate::dom::dom_model::{Document, NodeId};
use crate::dom::page::page_domain;
use crate::screen::extractor::{collect_controls, extract_fields};
use crate::screen::field_model::{Container, ContainerOrigin, ControlRef, DetectionRecord};
use crate::screen::scorer::{is_application_candidate, score_container};
use crate::state::normalize::{collapse_whitespace, contains_phrase};

/// Block-level elements considered for a virtual form.
const VIRTUAL_CANDIDATE_TAGS: &[&str] = &["main", "section", "article", "div"];
const VIRTUAL_CANDIDATE_ROLES: &[&str] = &["main", "form"];

/// A virtual form must contain at least this many controls.
const MIN_VIRTUAL_CONTROLS: usize = 2;

/// Containers with less visible text than this are layout wrappers.
const MIN_VIRTUAL_TEXT_LEN: usize = 20;

/// Labels that mark a control as the container's submit/next action.
const SUBMIT_KEYWORDS: &[&str] = &[
    "submit", "apply", "send", "next", "continue", "save", "sign in", "log in", "login",
];

const COMPANY_META: &[&str] = &["og:site_name", "application-name"];
const COMPANY_CLASS_HINTS: &[&str] = &["company-name", "companyname", "company", "employer", "organization"];

/// Scan a page for application forms.
///
/// Native `<form>` containers come first, best score first. Only when none
/// qualifies does the virtual-form fallback run.
pub fn detect_forms(doc: &Document, url: &str) -> DetectionRecord {
    let mut containers: Vec<Container> = doc
        .all_elements()
        .into_iter()
        .filter(|&n| doc.is_tag(n, "form"))
        .filter_map(|form| analyze_container(doc, form, ContainerOrigin::Native))
        .collect();

    if containers.is_empty() {
        if let Some(root) = find_virtual_form(doc) {
            debug!(root = root.0, "No native form qualified, using virtual form");
            containers.extend(analyze_container(doc, root, ContainerOrigin::Virtual));
        }
    }

    containers.sort_by(|a, b| b.score.total_cmp(&a.score));

    let title = page_title(doc);
    let company = extract_company_name(doc, &title);

    info!(
        url,
        containers = containers.len(),
        fields = containers.first().map(|c| c.fields.len()).unwrap_or(0),
        "Form detection complete"
    );

    DetectionRecord {
        url: url.to_string(),
        domain: page_domain(url),
        title,
        company,
        detected_at: Utc::now(),
        containers,
    }
}

/// Extract and score one container. `None` when it does not qualify.
pub fn analyze_container(doc: &Document, root: NodeId, origin: ContainerOrigin) -> Option<Container> {
    let fields = extract_fields(doc, root);
    let score = score_container(doc, root, &fields);

    if !is_application_candidate(&score, fields.len()) {
        debug!(root = root.0, score = score.score, "Container does not qualify");
        return None;
    }

    Some(Container {
        root,
        origin,
        submit_control: find_submit_control(doc, root),
        score: score.score,
        indicators: score.indicators,
        fields,
    })
}

fn is_virtual_candidate(doc: &Document, id: NodeId) -> bool {
    let tag_match = doc
        .tag(id)
        .map(|t| VIRTUAL_CANDIDATE_TAGS.contains(&t))
        .unwrap_or(false);
    let role_match = role(doc, id)
        .map(|r| VIRTUAL_CANDIDATE_ROLES.contains(&r.as_str()))
        .unwrap_or(false);
    tag_match || role_match
}

/// The block container holding the most controls. On a tie the nested
/// (more specific) container wins over its ancestor.
pub fn find_virtual_form(doc: &Document) -> Option<NodeId> {
    let mut best: Option<(NodeId, usize)> = None;

    for candidate in doc.all_elements() {
        if !is_virtual_candidate(doc, candidate) || !doc.is_visible(candidate) {
            continue;
        }
        if collapse_whitespace(&doc.text_content(candidate)).len() < MIN_VIRTUAL_TEXT_LEN {
            continue;
        }

        let count = collect_controls(doc, candidate).len();
        if count < MIN_VIRTUAL_CONTROLS {
            continue;
        }

        let better = match best {
            None => true,
            Some((current, best_count)) => {
                count > best_count || (count == best_count && doc.contains(current, candidate))
            }
        };
        if better {
            best = Some((candidate, count));
        }
    }

    best.map(|(node, _)| node)
}

fn find_submit_control(doc: &Document, root: NodeId) -> Option<ControlRef> {
    doc.descendant_elements(root)
        .into_iter()
        .filter(|&n| is_button_like(doc, n) && doc.is_visible(n))
        .map(|n| ControlRef {
            node: n,
            label: button_label(doc, n),
        })
        .find(|c| SUBMIT_KEYWORDS.iter().any(|k| contains_phrase(&c.label, k)))
}

pub fn page_title(doc: &Document) -> String {
    doc.all_elements()
        .into_iter()
        .find(|&n| doc.is_tag(n, "title"))
        .map(|n| collapse_whitespace(&doc.text_content(n)))
        .unwrap_or_default()
}

/// Best-effort employer name: site metadata, conventional class names, then
/// the page title.
pub fn extract_company_name(doc: &Document, title: &str) -> Option<String> {
    let elements = doc.all_elements();

    for key in COMPANY_META {
        let from_meta = elements.iter().find_map(|&n| {
            let is_match = doc.is_tag(n, "meta")
                && (doc.attr(n, "property") == Some(key) || doc.attr(n, "name") == Some(key));
            if is_match {
                doc.attr_nonempty(n, "content").map(str::to_string)
            } else {
                None
            }
        });
        if from_meta.is_some() {
            return from_meta;
        }
    }

    for hint in COMPANY_CLASS_HINTS {
        let from_class = elements
            .iter()
            .filter(|&&n| doc.class_contains(n, hint) && doc.is_visible(n))
            .map(|&n| collapse_whitespace(&doc.text_content(n)))
            .find(|t| !t.is_empty() && t.len() <= 80);
        if from_class.is_some() {
            return from_class;
        }
    }

    company_from_title(title)
}

fn company_from_title(title: &str) -> Option<String> {
    if let Some((_, company)) = title.rsplit_once(" at ") {
        let company = company.split(" - ").next().unwrap_or(company).trim();
        if !company.is_empty() {
            return Some(company.to_string());
        }
    }
    for separator in [" - ", " | "] {
        if let Some((_, company)) = title.rsplit_once(separator) {
            let company = company.trim();
            if !company.is_empty() {
                return Some(company.to_string());
            }
        }
    }
    None
}
