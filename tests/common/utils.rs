use job_autofill::agent::orchestrator::AutofillEngine;
use job_autofill::agent::answer_service::AnswerService;
use job_autofill::agent::settings::{EngineSettings, Timing};
use job_autofill::dom::dom_model::{Document, NodeId};
use job_autofill::dom::page::StaticPage;
use job_autofill::screen::field_model::{Container, Field};

pub const JOB_URL: &str = "https://jobs.example.com/acme/senior-rust-engineer/apply";

pub fn fixture(name: &str) -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {}: {}", path.display(), e))
}

pub fn fixture_page(name: &str) -> StaticPage {
    StaticPage::from_html(JOB_URL, &fixture(name))
}

pub fn html_page(html: &str) -> StaticPage {
    StaticPage::from_html(JOB_URL, html)
}

/// Engine settings with every delay at zero.
pub fn instant_settings() -> EngineSettings {
    EngineSettings {
        timing: Timing::immediate(),
        ..EngineSettings::default()
    }
}

pub fn engine(service: impl AnswerService + 'static) -> AutofillEngine {
    AutofillEngine::new(Box::new(service), instant_settings())
}

pub fn by_id(doc: &Document, html_id: &str) -> NodeId {
    doc.element_by_id(html_id)
        .unwrap_or_else(|| panic!("no element with id '{}'", html_id))
}

pub fn field<'a>(container: &'a Container, id: &str) -> &'a Field {
    container
        .field(id)
        .unwrap_or_else(|| panic!("no field '{}' in {:?}", id, field_ids(container)))
}

pub fn field_ids(container: &Container) -> Vec<String> {
    container.fields.iter().map(|f| f.id.clone()).collect()
}
