use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::agent::advance::AdvanceOutcome;
use crate::inject::result::{FillSummary, InjectionOutcome};

/// Retry rounds after the first fill attempt.
pub const MAX_ROUNDS: u32 = 2;

/// Transitions allowed per session before it is forced to `Done`.
pub const MAX_SESSION_STEPS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Filling,
    Injecting,
    Validating,
    Retrying,
    Advancing,
    Done,
}

/// State for one form instance, alive for the length of one session.
#[derive(Debug, Clone)]
pub struct AutofillSession {
    pub signature: String,
    pub url: String,
    pub phase: SessionPhase,
    /// Retry rounds taken so far.
    pub round: u32,
    pub fill_attempts: u32,
    pub steps: u32,
    /// Last answer written per field id.
    pub applied: BTreeMap<String, String>,
    /// Fields an answer was tried on, written or not.
    pub attempted: BTreeSet<String>,
    pub diagnostics: Vec<String>,
    /// Required fields still failing validation.
    pub unresolved: BTreeSet<String>,
    pub summaries: Vec<FillSummary>,
    pub advance: Option<AdvanceOutcome>,
}

impl AutofillSession {
    pub fn new(signature: &str, url: &str) -> Self {
        Self {
            signature: signature.to_string(),
            url: url.to_string(),
            phase: SessionPhase::Idle,
            round: 0,
            fill_attempts: 0,
            steps: 0,
            applied: BTreeMap::new(),
            attempted: BTreeSet::new(),
            diagnostics: vec![],
            unresolved: BTreeSet::new(),
            summaries: vec![],
            advance: None,
        }
    }

    /// Track which fields were tried and which answers actually landed.
    /// Only `Filled` results count as applied.
    pub fn record_results(&mut self, summary: &FillSummary, answers: &std::collections::HashMap<String, String>) {
        for result in &summary.results {
            match result.outcome {
                InjectionOutcome::Filled => {
                    self.attempted.insert(result.field_id.clone());
                    if let Some(answer) = answers.get(&result.field_id) {
                        self.applied.insert(result.field_id.clone(), answer.clone());
                    }
                }
                InjectionOutcome::Failed { .. } => {
                    self.attempted.insert(result.field_id.clone());
                }
                _ => {}
            }
        }
    }

    /// Add a diagnostic unless the same text is already recorded.
    pub fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !message.is_empty() && !self.diagnostics.contains(&message) {
            self.diagnostics.push(message);
        }
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            signature: self.signature.clone(),
            url: self.url.clone(),
            final_phase: self.phase,
            rounds: self.round,
            fill_attempts: self.fill_attempts,
            applied_answers: self.applied.clone(),
            unresolved_field_ids: self.unresolved.iter().cloned().collect(),
            diagnostics: self.diagnostics.clone(),
            summaries: self.summaries.clone(),
            advance: self.advance.clone(),
        }
    }
}

/// What a finished (or aborted) session hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub signature: String,
    pub url: String,
    pub final_phase: SessionPhase,
    pub rounds: u32,
    pub fill_attempts: u32,
    pub applied_answers: BTreeMap<String, String>,
    pub unresolved_field_ids: Vec<String>,
    pub diagnostics: Vec<String>,
    pub summaries: Vec<FillSummary>,
    pub advance: Option<AdvanceOutcome>,
}

impl SessionReport {
    pub fn total_filled(&self) -> usize {
        self.summaries.iter().map(|s| s.filled).sum()
    }

    pub fn is_resolved(&self) -> bool {
        self.unresolved_field_ids.is_empty()
    }
}
