use crate::dom::dom_model::{Document, NodeData, NodeId};

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

impl Document {
    /// Serialise the current state back to HTML, reflecting live values
    /// (`value`, `checked`, `selected`) into attributes.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for &child in self.children(self.root()) {
            self.write_node(child, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };

        match &node.data {
            NodeData::Document => {}
            NodeData::Text(t) => out.push_str(&escape(t, false)),
            NodeData::Element(el) => {
                let mut attrs = el.attrs.clone();
                match el.tag.as_str() {
                    "input" => {
                        attrs.insert("value".into(), self.value(id));
                        if el.checked {
                            attrs.insert("checked".into(), String::new());
                        } else {
                            attrs.remove("checked");
                        }
                    }
                    "option" => {
                        if el.selected {
                            attrs.insert("selected".into(), String::new());
                        } else {
                            attrs.remove("selected");
                        }
                    }
                    _ => {}
                }

                out.push('<');
                out.push_str(&el.tag);
                for (k, v) in &attrs {
                    out.push(' ');
                    out.push_str(k);
                    if !v.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape(v, true));
                        out.push('"');
                    }
                }
                out.push('>');

                if VOID_TAGS.contains(&el.tag.as_str()) {
                    return;
                }

                if el.tag == "textarea" {
                    out.push_str(&escape(&self.value(id), false));
                } else {
                    for &child in &node.children {
                        self.write_node(child, out);
                    }
                }

                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
