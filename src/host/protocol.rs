use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Command received from the host (one JSON line).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum HostCommand {
    Ping,
    GetLastDetected,
    DetectNow,
    AutofillPass,
    AutofillWithRetry {
        #[serde(default)]
        advance: bool,
    },
    AdvanceStep,
    SetAutoMode {
        /// Absent means toggle.
        #[serde(default)]
        enabled: Option<bool>,
    },
    ResetProcessed,
    LoadPage {
        url: String,
        html: String,
    },
    Tick,
    GetPage,
}

/// Reply sent back to the host (one JSON line).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HostResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(error: impl ToString) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }

    /// A failure that still carries partial results.
    pub fn fail_with(error: impl ToString, data: Value) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(error.to_string()),
        }
    }
}
