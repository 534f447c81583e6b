use crate::dom::dom_model::{Document, NodeId};
use crate::screen::field_model::{Field, FieldType, ScoreSignal};
use crate::state::normalize::contains_phrase;

pub const APPLICATION_KEYWORDS: &[&str] = &[
    "apply",
    "application",
    "resume",
    "cv",
    "cover letter",
    "experience",
    "education",
    "qualification",
    "employment",
    "career",
    "job application",
    "submit application",
];

pub const WORK_HISTORY_KEYWORDS: &[&str] = &["company", "employer", "job title", "position"];

/// Score at or above which a container counts as an application form.
pub const QUALIFYING_SCORE: f32 = 0.3;

// Weights in hundredths so the additive total stays exact.
const FILE_UPLOAD_WEIGHT: u32 = 30;
const LONG_TEXT_WEIGHT: u32 = 20;
const KEYWORD_WEIGHT: u32 = 10;
const KEYWORD_CAP: u32 = 30;
const WORK_HISTORY_WEIGHT: u32 = 15;
const FIELD_COUNT_WEIGHT: u32 = 10;
const FULL_SCORE: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerScore {
    pub score: f32,
    pub indicators: Vec<ScoreSignal>,
}

pub fn score_container(doc: &Document, root: NodeId, fields: &[Field]) -> ContainerScore {
    let mut signals = Vec::new();
    let mut total: u32 = 0;

    if fields.iter().any(|f| f.field_type == FieldType::File) {
        total += FILE_UPLOAD_WEIGHT;
        signals.push(ScoreSignal::FileUpload);
    }

    if fields.iter().any(|f| f.field_type == FieldType::LongText) {
        total += LONG_TEXT_WEIGHT;
        signals.push(ScoreSignal::LongText);
    }

    let text = container_text(doc, root, fields);

    let mut keyword_total = 0;
    for keyword in APPLICATION_KEYWORDS {
        if contains_phrase(&text, keyword) {
            keyword_total += KEYWORD_WEIGHT;
            signals.push(ScoreSignal::Keyword(keyword.to_string()));
        }
    }
    total += keyword_total.min(KEYWORD_CAP);

    if let Some(hit) = WORK_HISTORY_KEYWORDS
        .iter()
        .find(|k| contains_phrase(&text, k))
    {
        total += WORK_HISTORY_WEIGHT;
        signals.push(ScoreSignal::WorkHistory(hit.to_string()));
    }

    if fields.len() >= 5 {
        total += FIELD_COUNT_WEIGHT;
        if fields.len() >= 10 {
            total += FIELD_COUNT_WEIGHT;
        }
        signals.push(ScoreSignal::FieldCount(fields.len()));
    }

    ContainerScore {
        score: total.min(FULL_SCORE) as f32 / FULL_SCORE as f32,
        indicators: signals,
    }
}

/// Candidate rule: permissive, since login and single-question forms are
/// legitimate targets too.
pub fn is_application_candidate(score: &ContainerScore, field_count: usize) -> bool {
    score.score >= QUALIFYING_SCORE || field_count >= 1
}

fn container_text(doc: &Document, root: NodeId, fields: &[Field]) -> String {
    let mut text = doc.text_content(root).to_lowercase();
    for field in fields {
        text.push(' ');
        text.push_str(&field.label.to_lowercase());
        if let Some(p) = &field.placeholder {
            text.push(' ');
            text.push_str(&p.to_lowercase());
        }
    }
    text
}
