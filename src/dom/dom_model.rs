use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// Page structure: an arena of nodes addressed by NodeId handles
// ============================================================================

/// Handle into a `Document`'s node table.
///
/// Handles are never reused within a document, so a handle captured during
/// one scan either still points at the same node or at a detached one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,

    // Live properties (what a script sees, not what the markup said)
    pub value: Option<String>,
    pub checked: bool,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Focus,
    Input,
    /// `InputEvent` with `inputType: insertText`
    InsertText,
    Change,
    Blur,
    Click,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomEvent {
    pub target: NodeId,
    pub kind: EventKind,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    events: Vec<DomEvent>,
    mutation_seq: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: vec![],
            }],
            events: vec![],
            mutation_seq: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    // ---- Construction ----

    pub fn create_element(&mut self, tag: &str, attrs: BTreeMap<String, String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data: NodeData::Element(ElementData {
                tag: tag.to_ascii_lowercase(),
                attrs,
                value: None,
                checked: false,
                selected: false,
            }),
            parent: None,
            children: vec![],
        });
        id
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data: NodeData::Text(text.to_string()),
            parent: None,
            children: vec![],
        });
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent.0 >= self.nodes.len() || child.0 >= self.nodes.len() {
            return;
        }
        self.unlink(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.mutation_seq += 1;
    }

    /// Insert `node` as the next sibling of `reference`.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.unlink(node);
        let siblings = &mut self.nodes[parent.0].children;
        let pos = siblings
            .iter()
            .position(|&c| c == reference)
            .map(|p| p + 1)
            .unwrap_or(siblings.len());
        siblings.insert(pos, node);
        self.nodes[node.0].parent = Some(parent);
        self.mutation_seq += 1;
    }

    /// Remove a subtree from the page. Its handles stay valid but detached.
    pub fn detach(&mut self, node: NodeId) {
        if node == self.root() || node.0 >= self.nodes.len() {
            return;
        }
        self.unlink(node);
        self.mutation_seq += 1;
    }

    fn unlink(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    // ---- Navigation ----

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(id.0)?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(id.0)?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Ancestors, nearest first. Excludes the node itself.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    /// Descendants in document order. Excludes the node itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.element(n).is_some())
            .collect()
    }

    /// Every attached element in document order.
    pub fn all_elements(&self) -> Vec<NodeId> {
        self.descendant_elements(self.root())
    }

    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.ancestors(node).contains(&ancestor)
    }

    pub fn element_by_id(&self, html_id: &str) -> Option<NodeId> {
        if html_id.is_empty() {
            return None;
        }
        self.all_elements()
            .into_iter()
            .find(|&n| self.attr(n, "id") == Some(html_id))
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        if id.0 >= self.nodes.len() {
            return false;
        }
        id == self.root() || self.ancestors(id).last() == Some(&self.root())
    }

    // ---- Attributes ----

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attrs.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Attribute value, trimmed, `None` when missing or blank.
    pub fn attr_nonempty(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attr(id, name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            el.attrs.insert(name.to_string(), value.to_string());
            self.mutation_seq += 1;
        }
    }

    /// Case-insensitive substring check against the `class` attribute.
    pub fn class_contains(&self, id: NodeId, needle: &str) -> bool {
        self.attr(id, "class")
            .map(|c| c.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false)
    }

    // ---- Text ----

    pub fn text_content(&self, id: NodeId) -> String {
        self.text_content_excluding(id, None)
    }

    /// Concatenated text of a subtree, skipping the subtree rooted at `skip`.
    pub fn text_content_excluding(&self, id: NodeId, skip: Option<NodeId>) -> String {
        let mut out = String::new();
        self.collect_text(id, skip, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, skip: Option<NodeId>, out: &mut String) {
        if Some(id) == skip {
            return;
        }
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.data {
            NodeData::Text(t) => {
                out.push_str(t);
                out.push(' ');
            }
            NodeData::Element(el) if matches!(el.tag.as_str(), "script" | "style" | "template") => {}
            _ => {
                for &c in &node.children {
                    self.collect_text(c, skip, out);
                }
            }
        }
    }

    // ---- Visibility / state ----

    fn hides_itself(&self, id: NodeId) -> bool {
        let Some(el) = self.element(id) else {
            return false;
        };
        if el.attrs.contains_key("hidden") {
            return true;
        }
        if el.attrs.get("aria-hidden").map(String::as_str) == Some("true") {
            return true;
        }
        if el.tag == "input"
            && el
                .attrs
                .get("type")
                .map(|t| t.eq_ignore_ascii_case("hidden"))
                .unwrap_or(false)
        {
            return true;
        }
        if let Some(style) = el.attrs.get("style") {
            let compact: String = style
                .to_lowercase()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            if compact.contains("display:none") || compact.contains("visibility:hidden") {
                return true;
            }
        }
        false
    }

    pub fn is_visible(&self, id: NodeId) -> bool {
        if !self.is_attached(id) || self.hides_itself(id) {
            return false;
        }
        !self.ancestors(id).into_iter().any(|a| self.hides_itself(a))
    }

    pub fn is_enabled(&self, id: NodeId) -> bool {
        if self.has_attr(id, "disabled") || self.attr(id, "aria-disabled") == Some("true") {
            return false;
        }
        !self
            .ancestors(id)
            .into_iter()
            .any(|a| self.is_tag(a, "fieldset") && self.has_attr(a, "disabled"))
    }

    // ---- Live properties ----

    /// Current value as a script would read it.
    pub fn value(&self, id: NodeId) -> String {
        let Some(el) = self.element(id) else {
            return String::new();
        };
        if el.tag == "select" {
            return self
                .selected_options(id)
                .first()
                .map(|&o| self.option_value(o))
                .unwrap_or_default();
        }
        el.value.clone().unwrap_or_default()
    }

    pub fn is_checked(&self, id: NodeId) -> bool {
        self.element(id).map(|el| el.checked).unwrap_or(false)
    }

    pub fn is_selected(&self, id: NodeId) -> bool {
        self.element(id).map(|el| el.selected).unwrap_or(false)
    }

    /// `<option>` descendants of a select (optgroups included).
    pub fn options_of(&self, select: NodeId) -> Vec<NodeId> {
        self.descendant_elements(select)
            .into_iter()
            .filter(|&n| self.is_tag(n, "option"))
            .collect()
    }

    pub fn selected_options(&self, select: NodeId) -> Vec<NodeId> {
        self.options_of(select)
            .into_iter()
            .filter(|&o| self.is_selected(o))
            .collect()
    }

    pub fn option_value(&self, option: NodeId) -> String {
        match self.attr(option, "value") {
            Some(v) => v.to_string(),
            None => collapse(&self.text_content(option)),
        }
    }

    /// Platform value setter: writes the property directly, the way
    /// `HTMLInputElement.prototype.value`'s setter does.
    pub fn set_value_native(&mut self, id: NodeId, value: &str) {
        if let Some(el) = self.element_mut(id) {
            el.value = Some(value.to_string());
        }
    }

    pub fn set_checked(&mut self, id: NodeId, checked: bool) {
        if let Some(el) = self.element_mut(id) {
            el.checked = checked;
        }
    }

    /// Select one option of a single-select, deselecting the rest.
    pub fn select_option(&mut self, select: NodeId, option: NodeId) {
        for o in self.options_of(select) {
            if let Some(el) = self.element_mut(o) {
                el.selected = o == option;
            }
        }
    }

    pub(crate) fn set_selected_flag(&mut self, option: NodeId, selected: bool) {
        if let Some(el) = self.element_mut(option) {
            el.selected = selected;
        }
    }

    // ---- Events / mutation tracking ----

    pub fn dispatch(&mut self, target: NodeId, kind: EventKind) {
        self.events.push(DomEvent { target, kind });
    }

    pub fn events(&self) -> &[DomEvent] {
        &self.events
    }

    pub fn events_for(&self, target: NodeId) -> Vec<EventKind> {
        self.events
            .iter()
            .filter(|e| e.target == target)
            .map(|e| e.kind)
            .collect()
    }

    /// Bumped by every structural or attribute mutation.
    pub fn mutation_seq(&self) -> u64 {
        self.mutation_seq
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
