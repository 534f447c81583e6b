use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::agent::error::AutofillError;
use crate::agent::orchestrator::AutofillEngine;
use crate::agent::session::SessionReport;
use crate::dom::dom_model::Document;
use crate::dom::page::{PageContext, StaticPage};
use crate::host::protocol::{HostCommand, HostResponse};
use crate::scheduler::rescan::{RescanScheduler, TickOutcome};
use crate::store::kv::KeyValueStore;
use crate::store::preferences::{Preferences, RecentAnswer, RecentAnswers, UserProfile};

/// Everything bound to one page context: the engine, the scheduler state,
/// the store, and the page itself.
pub struct HostController {
    engine: AutofillEngine,
    scheduler: RescanScheduler,
    store: Box<dyn KeyValueStore>,
    page: Option<Box<dyn PageContext>>,
}

impl HostController {
    /// Apply stored preferences and profile on top of the engine settings.
    pub fn new(
        mut engine: AutofillEngine,
        mut scheduler: RescanScheduler,
        store: Box<dyn KeyValueStore>,
    ) -> Result<Self, AutofillError> {
        let fallback = Preferences {
            auto_fill_enabled: scheduler.auto_fill(),
            min_confidence: engine.settings.min_confidence,
        };
        let prefs = Preferences::load_or(store.as_ref(), fallback)?;
        scheduler.set_auto_fill(Some(prefs.auto_fill_enabled));
        engine.settings.min_confidence = prefs.min_confidence;

        if let Some(user_id) = UserProfile::load(store.as_ref())?.user_id {
            engine.settings.user_id = user_id;
        }

        Ok(Self {
            engine,
            scheduler,
            store,
            page: None,
        })
    }

    pub fn page(&self) -> Option<&dyn PageContext> {
        self.page.as_deref()
    }

    pub fn scheduler(&self) -> &RescanScheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn handle(&mut self, command: HostCommand) -> HostResponse {
        debug!(?command, "Host command");
        match command {
            HostCommand::Ping => HostResponse::ok(json!({
                "pong": true,
                "version": env!("CARGO_PKG_VERSION"),
            })),

            HostCommand::GetLastDetected => match self.scheduler.last_detection() {
                Some(record) => respond(record),
                None => HostResponse::ok(serde_json::Value::Null),
            },

            HostCommand::DetectNow => {
                let Some(page) = self.page.as_deref() else {
                    return HostResponse::fail(AutofillError::NoPage);
                };
                let record = self.engine.detect(page);
                let response = respond(&record);
                self.scheduler.record_detection(record);
                response
            }

            HostCommand::AutofillPass => self.autofill_pass(),

            HostCommand::AutofillWithRetry { advance } => self.autofill_with_retry(advance),

            HostCommand::AdvanceStep => {
                let Some(page) = self.page.as_deref_mut() else {
                    return HostResponse::fail(AutofillError::NoPage);
                };
                respond(&self.engine.advance(page))
            }

            HostCommand::SetAutoMode { enabled } => match self.set_auto_mode(enabled) {
                Ok(enabled) => HostResponse::ok(json!({ "auto_fill_enabled": enabled })),
                Err(e) => HostResponse::fail(e),
            },

            HostCommand::ResetProcessed => {
                let cleared = self.scheduler.reset_processed();
                HostResponse::ok(json!({ "cleared": cleared }))
            }

            HostCommand::LoadPage { url, html } => {
                let document = Document::parse(&html);
                match self.page.as_deref_mut() {
                    Some(page) => page.navigate(&url, document),
                    None => self.page = Some(Box::new(StaticPage::new(&url, document))),
                }
                self.scheduler.invalidate();
                HostResponse::ok(json!({ "url": url }))
            }

            HostCommand::Tick => {
                let Some(page) = self.page.as_deref_mut() else {
                    return HostResponse::fail(AutofillError::NoPage);
                };
                let outcome = self.scheduler.tick(page, &self.engine, Instant::now());
                match &outcome {
                    TickOutcome::Autofilled { report, .. } => self.remember_answers(report),
                    TickOutcome::AutofillFailed { partial, .. } => self.remember_answers(partial),
                    _ => {}
                }
                respond(&outcome)
            }

            HostCommand::GetPage => {
                let Some(page) = self.page.as_deref() else {
                    return HostResponse::fail(AutofillError::NoPage);
                };
                HostResponse::ok(json!({
                    "url": page.url(),
                    "html": page.document().to_html(),
                    "events": page.document().events(),
                }))
            }
        }
    }

    /// Set (or, with `None`, toggle) automatic mode and persist it.
    /// Returns the new state.
    pub fn set_auto_mode(&mut self, enabled: Option<bool>) -> Result<bool, AutofillError> {
        let enabled = self.scheduler.set_auto_fill(enabled);
        Preferences {
            auto_fill_enabled: enabled,
            min_confidence: self.engine.settings.min_confidence,
        }
        .save(self.store.as_mut())?;
        Ok(enabled)
    }

    fn autofill_pass(&mut self) -> HostResponse {
        let Some(page) = self.page.as_deref_mut() else {
            return HostResponse::fail(AutofillError::NoPage);
        };
        if let Err(e) = self.scheduler.begin_session() {
            return HostResponse::fail(e);
        }
        let result = self.engine.fill_once(page);
        self.scheduler.end_session();

        match result {
            Ok(summary) => respond(&summary),
            Err(e) => HostResponse::fail(e),
        }
    }

    fn autofill_with_retry(&mut self, advance: bool) -> HostResponse {
        let Some(page) = self.page.as_deref_mut() else {
            return HostResponse::fail(AutofillError::NoPage);
        };
        if let Err(e) = self.scheduler.begin_session() {
            return HostResponse::fail(e);
        }
        let result = self.engine.run_session(page, advance);
        self.scheduler.end_session();

        match result {
            Ok(report) => {
                self.scheduler.mark_processed(&report.signature);
                self.remember_answers(&report);
                respond(&report)
            }
            Err(abort) => {
                self.remember_answers(&abort.partial);
                match serde_json::to_value(&*abort.partial) {
                    Ok(partial) => HostResponse::fail_with(&abort.error, partial),
                    Err(_) => HostResponse::fail(&abort.error),
                }
            }
        }
    }

    /// Push the session's answers into the recent-answers cache. Store
    /// failures are logged, not surfaced.
    fn remember_answers(&mut self, report: &SessionReport) {
        if report.applied_answers.is_empty() {
            return;
        }
        let mut recent = match RecentAnswers::load(self.store.as_ref()) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Could not load recent answers");
                RecentAnswers::default()
            }
        };

        let now = Utc::now();
        for (field_id, answer) in &report.applied_answers {
            let label = report
                .summaries
                .iter()
                .rev()
                .find_map(|s| s.result_for(field_id))
                .map(|r| r.label.clone())
                .unwrap_or_else(|| field_id.clone());
            recent.push(RecentAnswer {
                label,
                answer: answer.clone(),
                url: report.url.clone(),
                used_at: now,
            });
        }

        if let Err(e) = recent.save(self.store.as_mut()) {
            warn!(error = %e, "Could not save recent answers");
        }
    }
}

fn respond<T: Serialize>(value: &T) -> HostResponse {
    match serde_json::to_value(value) {
        Ok(data) => HostResponse::ok(data),
        Err(e) => HostResponse::fail(AutofillError::json("response payload", e)),
    }
}
