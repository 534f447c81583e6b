use thiserror::Error;

use crate::agent::session::SessionReport;
use crate::screen::field_model::FieldType;

/// Session-level failures.
#[derive(Debug, Error)]
pub enum AutofillError {
    #[error("No application form detected on {url}")]
    NoFormDetected { url: String },

    #[error("Answer service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Answer service rejected the request: {0}")]
    ValidationRejected(String),

    #[error("An autofill session is already in progress")]
    SessionInProgress,

    #[error("No answer service configured (pass --answers or set answer_service.endpoint)")]
    NoAnswerService,

    #[error("No page loaded")]
    NoPage,

    #[error("Store error: {0}")]
    Store(String),

    #[error("I/O error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error ({context}): {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("YAML error ({context}): {source}")]
    Yaml {
        context: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl AutofillError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        AutofillError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        AutofillError::Json {
            context: context.into(),
            source,
        }
    }

    /// Errors raised by the answer service end a session.
    pub fn is_service_failure(&self) -> bool {
        matches!(
            self,
            AutofillError::ServiceUnavailable(_) | AutofillError::ValidationRejected(_)
        )
    }
}

/// Per-field injection failures. Recorded, never fatal to a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectError {
    #[error("element is no longer attached to the page")]
    Detached,

    #[error("field type {0:?} cannot be filled")]
    UnsupportedType(FieldType),

    #[error("no option matching '{value}'")]
    NoMatchingOption { value: String },

    #[error("no radio option matching '{value}'")]
    NoMatchingRadio { value: String },

    #[error("radio group has no members on the page")]
    MissingElement,
}

/// A session that stopped early: the error plus everything accumulated
/// before it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct SessionAbort {
    #[source]
    pub error: AutofillError,
    pub partial: Box<SessionReport>,
}
