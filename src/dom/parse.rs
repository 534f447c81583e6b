use std::collections::{BTreeMap, HashMap};

use scraper::{Html, Node as HtmlNode};

use crate::dom::dom_model::{Document, NodeId};

/// Elements whose content never matters for form detection.
const SKIPPED_TAGS: &[&str] = &["script", "style", "template", "noscript"];

impl Document {
    /// Build a document from HTML markup.
    ///
    /// Parsing never fails: html5ever recovers from malformed input the same
    /// way a browser does.
    pub fn parse(html: &str) -> Document {
        let parsed = Html::parse_document(html);
        let mut doc = Document::new();

        let mut mapping = HashMap::new();
        mapping.insert(parsed.tree.root().id(), doc.root());

        for node in parsed.tree.root().descendants().skip(1) {
            let Some(parent) = node.parent().and_then(|p| mapping.get(&p.id()).copied()) else {
                continue;
            };

            match node.value() {
                HtmlNode::Element(el) => {
                    let tag = el.name().to_ascii_lowercase();
                    if SKIPPED_TAGS.contains(&tag.as_str()) {
                        continue;
                    }
                    let attrs: BTreeMap<String, String> = el
                        .attrs()
                        .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                        .collect();
                    let id = doc.create_element(&tag, attrs);
                    doc.append_child(parent, id);
                    mapping.insert(node.id(), id);
                }
                HtmlNode::Text(text) => {
                    let content: &str = text;
                    if !content.is_empty() {
                        let id = doc.create_text(content);
                        doc.append_child(parent, id);
                    }
                }
                _ => {}
            }
        }

        hydrate_properties(&mut doc);
        doc
    }
}

/// Initialise live properties from markup, the way a browser does on load.
fn hydrate_properties(doc: &mut Document) {
    for id in doc.all_elements() {
        match doc.tag(id) {
            Some("input") => {
                let value = doc.attr(id, "value").unwrap_or("").to_string();
                let checked = doc.has_attr(id, "checked");
                doc.set_value_native(id, &value);
                doc.set_checked(id, checked);
            }
            Some("textarea") => {
                let value = doc.text_content(id).trim().to_string();
                doc.set_value_native(id, &value);
            }
            Some("select") => hydrate_select(doc, id),
            _ => {}
        }
    }
}

fn hydrate_select(doc: &mut Document, select: NodeId) {
    let options = doc.options_of(select);
    let multiple = doc.has_attr(select, "multiple");
    let mut any_selected = false;

    for &o in &options {
        let selected = doc.has_attr(o, "selected") && (multiple || !any_selected);
        any_selected |= selected;
        doc.set_selected_flag(o, selected);
    }

    if !multiple && !any_selected {
        if let Some(&first) = options.first() {
            doc.set_selected_flag(first, true);
        }
    }
}
