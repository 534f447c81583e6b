use chrono::Utc;
use serde::Serialize;

use crate::agent::session::{AutofillSession, SessionPhase};
use crate::inject::result::FillSummary;

/// One orchestrator transition, written as a JSONL line.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: i64,
    pub step: u32,

    pub signature: String,
    pub phase: SessionPhase,
    pub round: u32,

    pub decision: Option<String>,

    pub filled: Option<usize>,
    pub failed: Option<usize>,
    pub skipped: Option<usize>,
    pub unresolved: Vec<String>,

    pub diagnostic: Option<String>,
}

impl TraceEvent {
    pub fn now(session: &AutofillSession) -> Self {
        Self {
            timestamp_ms: Utc::now().timestamp_millis(),
            step: session.steps,
            signature: session.signature.clone(),
            phase: session.phase,
            round: session.round,
            decision: None,
            filled: None,
            failed: None,
            skipped: None,
            unresolved: session.unresolved.iter().cloned().collect(),
            diagnostic: None,
        }
    }

    pub fn with_decision(mut self, decision: impl ToString) -> Self {
        self.decision = Some(decision.to_string());
        self
    }

    pub fn with_summary(mut self, summary: &FillSummary) -> Self {
        self.filled = Some(summary.filled);
        self.failed = Some(summary.failed);
        self.skipped = Some(summary.skipped);
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: impl ToString) -> Self {
        self.diagnostic = Some(diagnostic.to_string());
        self
    }
}
