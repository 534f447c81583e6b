use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::agent::advance::{AdvanceOutcome, attempt_advance};
use crate::agent::answer_service::{AnswerRequest, AnswerService, JobContext};
use crate::agent::budget::{RetryDecision, check_retry_budget};
use crate::agent::error::{AutofillError, SessionAbort};
use crate::agent::session::{AutofillSession, MAX_SESSION_STEPS, SessionPhase, SessionReport};
use crate::agent::settings::EngineSettings;
use crate::agent::validation::compute_validation_delta;
use crate::dom::page::PageContext;
use crate::inject::injector::FieldInjector;
use crate::inject::result::FillSummary;
use crate::screen::detector::detect_forms;
use crate::screen::field_model::{Container, DetectionRecord, Field};
use crate::state::signature::form_signature;
use crate::trace::{logger::TraceLogger, trace::TraceEvent};

/// Drives detection, answering, injection, validation and advancing for
/// one page context.
pub struct AutofillEngine {
    service: Box<dyn AnswerService>,
    pub settings: EngineSettings,
    injector: FieldInjector,
    tracer: TraceLogger,
}

impl AutofillEngine {
    pub fn new(service: Box<dyn AnswerService>, settings: EngineSettings) -> Self {
        let injector = FieldInjector::new(
            settings.timing.settle_delay(),
            settings.timing.inter_field_delay(),
        );
        Self {
            service,
            settings,
            injector,
            tracer: TraceLogger::disabled(),
        }
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn detect(&self, page: &dyn PageContext) -> DetectionRecord {
        detect_forms(page.document(), page.url())
    }

    /// One request and one injection pass over the primary container. No
    /// validation, no retries.
    pub fn fill_once(&self, page: &mut dyn PageContext) -> Result<FillSummary, AutofillError> {
        let record = self.detect(page);
        let container = primary_container(&record)?;

        let answers = self.request_answers(&record, &container.fields, None)?;
        let summary = self.injector.inject_answers(page, &container.fields, &answers.0);
        info!(filled = summary.filled, failed = summary.failed, skipped = summary.skipped, "Autofill pass complete");
        Ok(summary)
    }

    /// Click the next-step control of the current primary container (or the
    /// page when nothing is detected).
    pub fn advance(&self, page: &mut dyn PageContext) -> AdvanceOutcome {
        let record = self.detect(page);
        let root = record.primary().map(|c| c.root);
        attempt_advance(page, root, &self.settings.advance, &self.settings.timing)
    }

    /// The full fill → inject → validate → retry → advance loop.
    ///
    /// Terminates after at most `MAX_ROUNDS + 1` answer requests. An answer
    /// service failure ends the session with everything gathered so far.
    pub fn run_session(&self, page: &mut dyn PageContext, advance: bool) -> Result<SessionReport, SessionAbort> {
        let mut record = self.detect(page);
        let Some(container) = record.primary() else {
            let session = AutofillSession::new("", page.url());
            return Err(SessionAbort {
                error: AutofillError::NoFormDetected {
                    url: page.url().to_string(),
                },
                partial: Box::new(session.report()),
            });
        };

        let mut session = AutofillSession::new(&form_signature(&container.fields, page.url()), page.url());
        let mut fields: Vec<Field> = container.fields.clone();
        let mut root = container.root;
        let mut scope: Option<Vec<String>> = None;
        let mut pending: HashMap<String, String> = HashMap::new();

        info!(signature = %session.signature, fields = fields.len(), "Autofill session started");

        loop {
            session.steps += 1;
            if session.steps > MAX_SESSION_STEPS {
                warn!(signature = %session.signature, "Session step budget exhausted");
                session.note("session step budget exhausted");
                session.phase = SessionPhase::Done;
            }

            match session.phase {
                SessionPhase::Idle => {
                    session.phase = SessionPhase::Filling;
                }

                SessionPhase::Filling => {
                    session.fill_attempts += 1;
                    match self.request_answers(&record, &fields, scope.as_deref()) {
                        Ok((answers, messages)) => {
                            for m in messages {
                                session.note(m);
                            }
                            self.trace(&session, "answers_received", None);
                            pending = answers;
                            session.phase = SessionPhase::Injecting;
                        }
                        Err(error) => {
                            warn!(error = %error, "Answer service failed, ending session");
                            session.note(error.to_string());
                            self.trace(&session, "service_failed", None);
                            return Err(SessionAbort {
                                error,
                                partial: Box::new(session.report()),
                            });
                        }
                    }
                }

                SessionPhase::Injecting => {
                    let targets: Vec<Field> = match &scope {
                        Some(ids) => fields.iter().filter(|f| ids.contains(&f.id)).cloned().collect(),
                        None => fields.clone(),
                    };
                    let summary = self.injector.inject_answers(page, &targets, &pending);
                    session.record_results(&summary, &pending);
                    self.trace(&session, "injected", Some(&summary));
                    session.summaries.push(summary);
                    session.phase = SessionPhase::Validating;
                }

                SessionPhase::Validating => {
                    page.settle(self.settings.timing.validation_settle());
                    record = self.detect(page);

                    let Some(current) = record.primary().cloned() else {
                        session.note("form is no longer present on the page");
                        session.unresolved.clear();
                        session.phase = SessionPhase::Done;
                        continue;
                    };
                    fields = current.fields.clone();
                    root = current.root;

                    let delta = compute_validation_delta(page.document(), &current);
                    for m in &delta.messages {
                        session.note(m.clone());
                    }
                    session.unresolved = delta.required_ids().into_iter().collect();

                    match check_retry_budget(&session, &delta) {
                        RetryDecision::Retry(ids) => {
                            debug!(round = session.round + 1, fields = ids.len(), "Retrying unresolved fields");
                            session.round += 1;
                            scope = Some(ids);
                            session.phase = SessionPhase::Retrying;
                        }
                        RetryDecision::Stop(reason) => {
                            self.trace(&session, reason, None);
                            session.phase = if !session.unresolved.is_empty() {
                                session.note(format!(
                                    "{} required field(s) still need attention",
                                    session.unresolved.len()
                                ));
                                SessionPhase::Done
                            } else if advance {
                                SessionPhase::Advancing
                            } else {
                                SessionPhase::Done
                            };
                        }
                    }
                }

                SessionPhase::Retrying => {
                    session.phase = SessionPhase::Filling;
                }

                SessionPhase::Advancing => {
                    let outcome = attempt_advance(page, Some(root), &self.settings.advance, &self.settings.timing);
                    session.note(format!("advance: {}", outcome.reason));
                    session.advance = Some(outcome);
                    session.phase = SessionPhase::Done;
                }

                SessionPhase::Done => {
                    self.trace(&session, "done", None);
                    break;
                }
            }
        }

        info!(
            signature = %session.signature,
            rounds = session.round,
            unresolved = session.unresolved.len(),
            "Autofill session finished"
        );
        Ok(session.report())
    }

    /// Ask the service for answers, keeping only those it is confident in.
    fn request_answers(
        &self,
        record: &DetectionRecord,
        fields: &[Field],
        scope: Option<&[String]>,
    ) -> Result<(HashMap<String, String>, Vec<String>), AutofillError> {
        let request = AnswerRequest::for_fields(&self.settings.user_id, JobContext::from(record), fields, scope);
        let response = self.service.answer(&request)?;

        let accepted = response.accepted(self.settings.min_confidence);
        let mut messages = response.messages.clone();
        let dropped = response
            .answers
            .values()
            .filter(|a| !a.answer.trim().is_empty() && a.confidence < self.settings.min_confidence)
            .count();
        if dropped > 0 {
            messages.push(format!("{} answer(s) below confidence threshold ignored", dropped));
        }
        Ok((accepted, messages))
    }

    fn trace(&self, session: &AutofillSession, decision: &str, summary: Option<&FillSummary>) {
        let mut event = TraceEvent::now(session).with_decision(decision);
        if let Some(summary) = summary {
            event = event.with_summary(summary);
        }
        if let Some(last) = session.diagnostics.last() {
            event = event.with_diagnostic(last);
        }
        self.tracer.log(&event);
    }
}

fn primary_container(record: &DetectionRecord) -> Result<&Container, AutofillError> {
    record.primary().ok_or_else(|| AutofillError::NoFormDetected {
        url: record.url.clone(),
    })
}
