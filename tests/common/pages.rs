use std::time::Duration;

use job_autofill::dom::capability::button_label;
use job_autofill::dom::dom_model::{Document, EventKind};
use job_autofill::dom::page::PageContext;

type SettleScript = Box<dyn FnMut(&mut String, &mut Document)>;

/// A page whose `settle` runs a script, standing in for page JavaScript
/// reacting to the events dispatched so far.
pub struct ScriptedPage {
    url: String,
    document: Document,
    on_settle: SettleScript,
    pub settle_calls: usize,
}

impl ScriptedPage {
    pub fn new(url: &str, html: &str, on_settle: impl FnMut(&mut String, &mut Document) + 'static) -> Self {
        Self {
            url: url.to_string(),
            document: Document::parse(html),
            on_settle: Box::new(on_settle),
            settle_calls: 0,
        }
    }
}

impl PageContext for ScriptedPage {
    fn document(&self) -> &Document {
        &self.document
    }

    fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn settle(&mut self, _delay: Duration) {
        self.settle_calls += 1;
        (self.on_settle)(&mut self.url, &mut self.document);
    }

    fn navigate(&mut self, url: &str, document: Document) {
        self.url = url.to_string();
        self.document = document;
    }
}

/// Whether a button-like control with this label received a click.
pub fn clicked(doc: &Document, label: &str) -> bool {
    doc.events()
        .iter()
        .any(|e| e.kind == EventKind::Click && button_label(doc, e.target) == label)
}

/// Two-step wizard: clicking `trigger` swaps in the second step.
pub fn wizard(url: &str, step_one: &str, next_url: &str, step_two: &str, trigger: &str) -> ScriptedPage {
    let next_url = next_url.to_string();
    let step_two = step_two.to_string();
    let trigger = trigger.to_string();
    ScriptedPage::new(url, step_one, move |url, doc| {
        if clicked(doc, &trigger) {
            *url = next_url.clone();
            *doc = Document::parse(&step_two);
        }
    })
}
