use std::thread;
use std::time::Duration;

use crate::dom::dom_model::Document;

/// One live page context: the document plus where it lives.
///
/// `settle` is the only suspend point. Implementations backed by a real
/// browser let page scripts run during it; the document may change
/// arbitrarily (including detaching elements) across a call.
pub trait PageContext {
    fn document(&self) -> &Document;
    fn document_mut(&mut self) -> &mut Document;
    fn url(&self) -> &str;
    fn settle(&mut self, delay: Duration);
    /// Replace the whole page, as a navigation does.
    fn navigate(&mut self, url: &str, document: Document);
}

/// A page that only changes through the calls made on it.
pub struct StaticPage {
    url: String,
    document: Document,
}

impl StaticPage {
    pub fn new(url: &str, document: Document) -> Self {
        Self {
            url: url.to_string(),
            document,
        }
    }

    pub fn from_html(url: &str, html: &str) -> Self {
        Self::new(url, Document::parse(html))
    }
}

impl PageContext for StaticPage {
    fn document(&self) -> &Document {
        &self.document
    }

    fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn settle(&mut self, delay: Duration) {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    fn navigate(&mut self, url: &str, document: Document) {
        self.url = url.to_string();
        self.document = document;
    }
}

/// Path component of a page URL, `/` when the URL does not parse.
pub fn page_path(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| "/".to_string())
}

pub fn page_domain(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}
