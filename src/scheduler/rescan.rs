use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::agent::error::AutofillError;
use crate::agent::orchestrator::AutofillEngine;
use crate::agent::session::SessionReport;
use crate::dom::page::PageContext;
use crate::screen::field_model::DetectionRecord;
use crate::state::signature::form_signature;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Quiet period after the last mutation before a scan runs.
    pub debounce_ms: u64,
    /// Minimum gap between two scans.
    pub min_interval_ms: u64,
    /// Whether automatic sessions may click the next-step control.
    pub auto_advance: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            min_interval_ms: 2000,
            auto_advance: false,
        }
    }
}

/// What one scheduler tick did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TickOutcome {
    /// No mutation since the last scan.
    Idle,
    /// Mutations seen, waiting for the page to go quiet.
    Debouncing,
    Scanned {
        containers: usize,
        signature: Option<String>,
        already_processed: bool,
    },
    Autofilled {
        signature: String,
        report: SessionReport,
    },
    AutofillFailed {
        signature: String,
        error: String,
        partial: SessionReport,
    },
}

/// Coalesces page mutations into detection scans and decides when a newly
/// seen form gets an automatic session.
#[derive(Debug)]
pub struct RescanScheduler {
    config: SchedulerConfig,
    last_seq: Option<u64>,
    dirty: bool,
    last_mutation: Option<Instant>,
    last_scan: Option<Instant>,
    processed: HashSet<String>,
    in_progress: bool,
    auto_fill: bool,
    last_detection: Option<DetectionRecord>,
}

impl RescanScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            last_seq: None,
            dirty: false,
            last_mutation: None,
            last_scan: None,
            processed: HashSet::new(),
            in_progress: false,
            auto_fill: false,
            last_detection: None,
        }
    }

    fn debounce(&self) -> Duration {
        Duration::from_millis(self.config.debounce_ms)
    }

    fn min_interval(&self) -> Duration {
        Duration::from_millis(self.config.min_interval_ms)
    }

    /// Feed the page's mutation counter. Returns true when it moved.
    pub fn observe(&mut self, mutation_seq: u64, now: Instant) -> bool {
        if self.last_seq == Some(mutation_seq) {
            return false;
        }
        self.last_seq = Some(mutation_seq);
        self.dirty = true;
        self.last_mutation = Some(now);
        true
    }

    /// Forget the last mutation counter so the next observation counts as
    /// a change. Used when the whole document is swapped.
    pub fn invalidate(&mut self) {
        self.last_seq = None;
    }

    pub fn is_due(&self, now: Instant) -> bool {
        if !self.dirty {
            return false;
        }
        let quiet = self
            .last_mutation
            .map(|t| now.saturating_duration_since(t) >= self.debounce())
            .unwrap_or(true);
        let spaced = self
            .last_scan
            .map(|t| now.saturating_duration_since(t) >= self.min_interval())
            .unwrap_or(true);
        quiet && spaced
    }

    pub fn mark_scanned(&mut self, now: Instant) {
        self.dirty = false;
        self.last_scan = Some(now);
    }

    // ---- Processed signatures ----

    pub fn is_processed(&self, signature: &str) -> bool {
        self.processed.contains(signature)
    }

    /// Returns false when the signature was already recorded.
    pub fn mark_processed(&mut self, signature: &str) -> bool {
        self.processed.insert(signature.to_string())
    }

    pub fn reset_processed(&mut self) -> usize {
        let cleared = self.processed.len();
        self.processed.clear();
        cleared
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    // ---- Session guard ----

    pub fn begin_session(&mut self) -> Result<(), AutofillError> {
        if self.in_progress {
            return Err(AutofillError::SessionInProgress);
        }
        self.in_progress = true;
        Ok(())
    }

    pub fn end_session(&mut self) {
        self.in_progress = false;
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    // ---- Automatic mode ----

    pub fn auto_fill(&self) -> bool {
        self.auto_fill
    }

    /// `None` toggles. Returns the new state.
    pub fn set_auto_fill(&mut self, enabled: Option<bool>) -> bool {
        self.auto_fill = enabled.unwrap_or(!self.auto_fill);
        self.auto_fill
    }

    pub fn last_detection(&self) -> Option<&DetectionRecord> {
        self.last_detection.as_ref()
    }

    pub fn record_detection(&mut self, record: DetectionRecord) {
        self.last_detection = Some(record);
    }

    /// Observe the page, scan when due, and start a session for a form
    /// signature not seen before.
    pub fn tick(&mut self, page: &mut dyn PageContext, engine: &AutofillEngine, now: Instant) -> TickOutcome {
        self.observe(page.document().mutation_seq(), now);

        if !self.dirty {
            return TickOutcome::Idle;
        }
        if !self.is_due(now) {
            return TickOutcome::Debouncing;
        }

        let record = engine.detect(page);
        self.mark_scanned(now);

        let signature = record
            .primary()
            .map(|c| form_signature(&c.fields, &record.url));
        let containers = record.containers.len();
        self.record_detection(record);

        let Some(signature) = signature else {
            return TickOutcome::Scanned {
                containers,
                signature: None,
                already_processed: false,
            };
        };

        let already_processed = self.is_processed(&signature);
        if !self.auto_fill || already_processed || self.in_progress {
            debug!(%signature, already_processed, auto_fill = self.auto_fill, "Rescan without autofill");
            return TickOutcome::Scanned {
                containers,
                signature: Some(signature),
                already_processed,
            };
        }

        // Recorded before the session so a failing form is not retried on
        // every mutation.
        self.mark_processed(&signature);
        self.in_progress = true;

        info!(%signature, "New form detected, starting automatic session");
        let result = engine.run_session(page, self.config.auto_advance);
        self.end_session();

        match result {
            Ok(report) => TickOutcome::Autofilled { signature, report },
            Err(abort) => TickOutcome::AutofillFailed {
                signature,
                error: abort.error.to_string(),
                partial: *abort.partial,
            },
        }
    }
}
