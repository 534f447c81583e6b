use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::state::normalize::{contains_phrase, normalize_key};

/// Labels that may be clicked to move a wizard forward.
pub const DEFAULT_SAFE_ADVANCE_LABELS: &[&str] = &[
    "next",
    "continue",
    "save and continue",
    "next step",
    "sign in",
    "log in",
    "login",
];

/// Labels that look like a final submission. Never clicked.
pub const BLOCKED_ADVANCE_LABELS: &[&str] = &[
    "submit",
    "apply",
    "send application",
    "finish",
    "complete application",
];

pub const DEFAULT_PREFERRED_ADVANCE_LABEL: &str = "save and continue";

/// Delays used around page writes, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub inter_field_delay_ms: u64,
    pub settle_delay_ms: u64,
    pub validation_settle_ms: u64,
    pub poll_interval_ms: u64,
    pub poll_attempts: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            inter_field_delay_ms: 120,
            settle_delay_ms: 50,
            validation_settle_ms: 400,
            poll_interval_ms: 250,
            poll_attempts: 8,
        }
    }
}

impl Timing {
    /// All delays zero, for deterministic runs.
    pub fn immediate() -> Self {
        Self {
            inter_field_delay_ms: 0,
            settle_delay_ms: 0,
            validation_settle_ms: 0,
            poll_interval_ms: 0,
            poll_attempts: 4,
        }
    }

    pub fn inter_field_delay(&self) -> Duration {
        Duration::from_millis(self.inter_field_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn validation_settle(&self) -> Duration {
        Duration::from_millis(self.validation_settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Which controls the engine may click to advance a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancePolicy {
    pub safe_labels: Vec<String>,
    pub preferred_label: String,
    /// Added to the built-in blocked vocabulary, never replacing it.
    pub extra_blocked_labels: Vec<String>,
}

impl Default for AdvancePolicy {
    fn default() -> Self {
        Self {
            safe_labels: DEFAULT_SAFE_ADVANCE_LABELS.iter().map(|s| s.to_string()).collect(),
            preferred_label: DEFAULT_PREFERRED_ADVANCE_LABEL.to_string(),
            extra_blocked_labels: vec![],
        }
    }
}

impl AdvancePolicy {
    /// Substring match on the normalised label, so inflections such as
    /// "submission" or "submitting" are caught too.
    pub fn is_blocked(&self, label: &str) -> bool {
        let key = normalize_key(label);
        let hit = |blocked: &str| {
            let needle = normalize_key(blocked);
            !needle.is_empty() && key.contains(&needle)
        };
        BLOCKED_ADVANCE_LABELS.iter().any(|b| hit(b)) || self.extra_blocked_labels.iter().any(|b| hit(b))
    }

    pub fn is_safe(&self, label: &str) -> bool {
        self.safe_labels.iter().any(|s| contains_phrase(label, s))
    }

    /// Safe and not blocked. Blocked wins.
    pub fn allows(&self, label: &str) -> bool {
        !self.is_blocked(label) && self.is_safe(label)
    }

    pub fn is_preferred(&self, label: &str) -> bool {
        !self.preferred_label.is_empty() && contains_phrase(label, &self.preferred_label)
    }
}

/// Everything the engine needs besides its collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub user_id: String,
    /// Answers below this confidence are treated as missing.
    pub min_confidence: f32,
    pub timing: Timing,
    pub advance: AdvancePolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            min_confidence: 0.0,
            timing: Timing::default(),
            advance: AdvancePolicy::default(),
        }
    }
}
