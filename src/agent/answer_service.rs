use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::error::AutofillError;
use crate::screen::field_model::{DetectionRecord, Field, FieldType, ValidationRules};
use crate::state::normalize::{contains_phrase, normalize_key};

// ============================================================================
// Wire model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDescriptor {
    pub value: String,
    pub label: String,
}

/// What the answer service is told about one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_value: Option<String>,
    #[serde(default)]
    pub validation: ValidationRules,
}

impl From<&Field> for FieldDescriptor {
    fn from(field: &Field) -> Self {
        Self {
            id: field.id.clone(),
            label: field.label.clone(),
            field_type: field.field_type,
            required: field.required,
            placeholder: field.placeholder.clone(),
            options: field
                .options
                .iter()
                .map(|o| OptionDescriptor {
                    value: o.value.clone(),
                    label: o.label.clone(),
                })
                .collect(),
            existing_value: Some(field.current_value.clone()).filter(|v| !v.is_empty()),
            validation: field.validation.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobContext {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
}

impl From<&DetectionRecord> for JobContext {
    fn from(record: &DetectionRecord) -> Self {
        Self {
            url: record.url.clone(),
            title: record.title.clone(),
            company: record.company.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub user_id: String,
    pub job: JobContext,
    pub fields: Vec<FieldDescriptor>,
}

impl AnswerRequest {
    /// Build a request for `fields`, optionally narrowed to `scope` ids.
    pub fn for_fields(user_id: &str, job: JobContext, fields: &[Field], scope: Option<&[String]>) -> Self {
        let fields = fields
            .iter()
            .filter(|f| scope.map(|ids| ids.contains(&f.id)).unwrap_or(true))
            .map(FieldDescriptor::from)
            .collect();
        Self {
            user_id: user_id.to_string(),
            job,
            fields,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAnswer {
    pub answer: String,
    #[serde(default = "full_confidence")]
    pub confidence: f32,
    #[serde(default)]
    pub sources: Vec<String>,
}

fn full_confidence() -> f32 {
    1.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerResponse {
    #[serde(default)]
    pub answers: HashMap<String, FieldAnswer>,
    #[serde(default)]
    pub overall_confidence: f32,
    /// Free-form notes from the service, surfaced as diagnostics.
    #[serde(default)]
    pub messages: Vec<String>,
}

impl AnswerResponse {
    /// Answer text per field id, dropping blanks and anything under
    /// `min_confidence`.
    pub fn accepted(&self, min_confidence: f32) -> HashMap<String, String> {
        self.answers
            .iter()
            .filter(|(_, a)| !a.answer.trim().is_empty())
            .filter(|(_, a)| a.confidence >= min_confidence)
            .map(|(id, a)| (id.clone(), a.answer.clone()))
            .collect()
    }
}

// ============================================================================
// Service trait
// ============================================================================

pub trait AnswerService {
    fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, AutofillError>;
}

// ============================================================================
// HTTP backend
// ============================================================================

pub struct HttpAnswerService {
    pub endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpAnswerService {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AutofillError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AutofillError::ServiceUnavailable(format!("could not build HTTP client: {}", e)))?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
        })
    }
}

/// Map a non-success HTTP status to the session error it represents.
pub fn status_error(status: u16, body: &str) -> AutofillError {
    let detail = body.trim();
    let message = if detail.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, detail)
    };
    if (400..500).contains(&status) {
        AutofillError::ValidationRejected(message)
    } else {
        AutofillError::ServiceUnavailable(message)
    }
}

/// Parse a response body, treating anything malformed as an outage.
pub fn parse_response_body(body: &str) -> Result<AnswerResponse, AutofillError> {
    serde_json::from_str(body)
        .map_err(|e| AutofillError::ServiceUnavailable(format!("malformed answer response: {}", e)))
}

impl AnswerService for HttpAnswerService {
    fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, AutofillError> {
        debug!(endpoint = %self.endpoint, fields = request.fields.len(), "Requesting answers");

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .map_err(|e| AutofillError::ServiceUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| AutofillError::ServiceUnavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body));
        }
        parse_response_body(&body)
    }
}

// ============================================================================
// Static backend (offline runs and tests)
// ============================================================================

/// Answers from a fixed table keyed by field id or label.
///
/// Lookup order: exact field id, normalized label, then the longest key that
/// appears as a phrase inside the label.
#[derive(Debug, Clone, Default)]
pub struct StaticAnswerService {
    answers: BTreeMap<String, String>,
}

impl StaticAnswerService {
    pub fn new<K: Into<String>, V: Into<String>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            answers: entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self, AutofillError> {
        let answers: BTreeMap<String, String> =
            serde_yaml::from_str(content).map_err(|source| AutofillError::Yaml {
                context: "answers file".into(),
                source,
            })?;
        Ok(Self { answers })
    }

    pub fn load(path: &str) -> Result<Self, AutofillError> {
        let content = std::fs::read_to_string(path).map_err(|e| AutofillError::io(path, e))?;
        Self::from_yaml(&content)
    }

    pub fn lookup(&self, field: &FieldDescriptor) -> Option<&str> {
        if let Some(a) = self.answers.get(&field.id) {
            return Some(a);
        }

        let label_key = normalize_key(&field.label);
        if let Some((_, a)) = self.answers.iter().find(|(k, _)| normalize_key(k) == label_key) {
            return Some(a);
        }

        self.answers
            .iter()
            .filter(|(k, _)| contains_phrase(&field.label, k))
            .max_by_key(|(k, _)| k.len())
            .map(|(_, a)| a.as_str())
    }
}

impl AnswerService for StaticAnswerService {
    fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, AutofillError> {
        let answers: HashMap<String, FieldAnswer> = request
            .fields
            .iter()
            .filter_map(|f| {
                self.lookup(f).map(|a| {
                    (
                        f.id.clone(),
                        FieldAnswer {
                            answer: a.to_string(),
                            confidence: 1.0,
                            sources: vec!["static".into()],
                        },
                    )
                })
            })
            .collect();

        let overall_confidence = if request.fields.is_empty() {
            0.0
        } else {
            answers.len() as f32 / request.fields.len() as f32
        };

        Ok(AnswerResponse {
            answers,
            overall_confidence,
            messages: vec![],
        })
    }
}
