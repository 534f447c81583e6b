mod common;

use job_autofill::agent::advance::find_advance_control;
use job_autofill::agent::orchestrator::AutofillEngine;
use job_autofill::agent::session::{MAX_ROUNDS, SessionPhase};
use job_autofill::agent::settings::{AdvancePolicy, EngineSettings};
use job_autofill::agent::validation::{DeltaReason, compute_validation_delta, is_field_empty};
use job_autofill::dom::dom_model::Document;
use job_autofill::dom::page::PageContext;
use job_autofill::inject::injector::is_marked_filled;
use job_autofill::screen::detector::detect_forms;
use job_autofill::trace::logger::TraceLogger;
use job_autofill::AutofillError;

use crate::common::pages::{ScriptedPage, clicked, wizard};
use crate::common::services::ScriptedService;
use crate::common::utils::{JOB_URL, by_id, engine, field, fixture, fixture_page, html_page, instant_settings};

const STEP_TWO_URL: &str = "https://jobs.example.com/acme/senior-rust-engineer/apply/experience";

fn wizard_page() -> ScriptedPage {
    wizard(
        JOB_URL,
        &fixture("wizard_step_one.html"),
        STEP_TWO_URL,
        &fixture("wizard_step_two.html"),
        "Next",
    )
}

// =========================================================================
// Single pass
// =========================================================================

#[test]
fn fill_once_injects_every_answered_field() {
    let mut page = fixture_page("application_form.html");
    let engine = engine(ScriptedService::new(&[
        ("First name", "Ada"),
        ("email", "ada@example.com"),
        ("How did you hear about us?", "LinkedIn"),
    ]));

    let summary = engine.fill_once(&mut page).unwrap();

    assert_eq!(summary.total, 6);
    assert_eq!(summary.filled, 3);
    let doc = page.document();
    assert_eq!(doc.value(by_id(doc, "first_name")), "Ada");
    assert_eq!(doc.value(by_id(doc, "source")), "linkedin");
}

#[test]
fn request_carries_job_context_and_field_descriptors() {
    let mut page = fixture_page("application_form.html");
    let service = ScriptedService::empty();
    let log = service.log();
    let engine = engine(service);

    engine.fill_once(&mut page).unwrap();

    let requests = log.borrow();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.user_id, "anonymous");
    assert_eq!(request.job.company.as_deref(), Some("Acme Robotics"));
    assert_eq!(request.job.url, JOB_URL);
    assert_eq!(request.fields.len(), 6);

    let json = serde_json::to_value(&request.fields[0]).unwrap();
    assert_eq!(json["id"], "first_name");
    assert_eq!(json["type"], "short-text");
    assert_eq!(json["required"], true);
}

#[test]
fn fill_once_without_form_is_an_error() {
    let mut page = html_page("<html><body><p>Thanks for applying!</p></body></html>");
    let engine = engine(ScriptedService::empty());

    let err = engine.fill_once(&mut page).unwrap_err();
    assert!(matches!(err, AutofillError::NoFormDetected { .. }));
}

// =========================================================================
// Retry loop
// =========================================================================

#[test]
fn clean_form_finishes_in_one_round() {
    let mut page = fixture_page("application_form.html");
    let engine = engine(ScriptedService::new(&[("first_name", "Ada"), ("email", "ada@example.com")]));

    let report = engine.run_session(&mut page, false).unwrap();

    assert_eq!(report.final_phase, SessionPhase::Done);
    assert_eq!(report.fill_attempts, 1);
    assert_eq!(report.rounds, 0);
    assert!(report.is_resolved());
    assert_eq!(report.total_filled(), 2);
    assert_eq!(report.applied_answers.get("first_name").map(String::as_str), Some("Ada"));
    assert!(report.advance.is_none());
}

#[test]
fn unanswerable_required_field_stops_after_retry_budget() {
    let mut page = fixture_page("application_form.html");
    let service = ScriptedService::new(&[("first_name", "Ada")]);
    let log = service.log();
    let engine = engine(service);

    let report = engine.run_session(&mut page, true).unwrap();

    assert_eq!(log.borrow().len() as u32, MAX_ROUNDS + 1);
    assert_eq!(report.fill_attempts, MAX_ROUNDS + 1);
    assert_eq!(report.rounds, MAX_ROUNDS);
    assert_eq!(report.unresolved_field_ids, vec!["email".to_string()]);
    assert!(report.advance.is_none());
    assert!(
        report
            .diagnostics
            .iter()
            .any(|d| d == "1 required field(s) still need attention")
    );
}

#[test]
fn retries_ask_only_for_failing_unanswered_fields() {
    let mut page = wizard_page();
    let service = ScriptedService::new(&[("name", "Ada Lovelace")]);
    let log = service.log();
    let engine = engine(service);

    let report = engine.run_session(&mut page, true).unwrap();

    let requests = log.borrow();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].fields.len(), 3);
    for retry in &requests[1..] {
        let ids: Vec<&str> = retry.fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["email"]);
    }

    // Blocked advance: the wizard never moved.
    assert_eq!(report.unresolved_field_ids, vec!["email".to_string()]);
    assert!(report.advance.is_none());
    assert!(!clicked(page.document(), "Next"));
    assert_eq!(page.url(), JOB_URL);
}

#[test]
fn answered_field_still_invalid_is_not_requested_again() {
    // The page rejects every email it is given.
    let mut page = ScriptedPage::new(JOB_URL, &fixture("wizard_step_one.html"), |_, doc| {
        if let Some(email) = doc.element_by_id("email") {
            if doc.attr(email, "aria-invalid").is_none() && !doc.value(email).is_empty() {
                doc.set_attr(email, "aria-invalid", "true");
            }
        }
    });
    let service = ScriptedService::new(&[("name", "Ada Lovelace"), ("email", "ada-at-example")]);
    let log = service.log();
    let engine = engine(service);

    let report = engine.run_session(&mut page, true).unwrap();

    assert_eq!(log.borrow().len(), 1);
    assert_eq!(report.fill_attempts, 1);
    assert_eq!(report.unresolved_field_ids, vec!["email".to_string()]);
    assert!(report.advance.is_none());
}

#[test]
fn field_revealed_after_fill_is_answered_on_retry() {
    // Answering the first question reveals a follow-up.
    let mut page = ScriptedPage::new(JOB_URL, &fixture("application_form.html"), |_, doc| {
        let (Some(form), Some(first)) = (doc.element_by_id("apply"), doc.element_by_id("first_name")) else {
            return;
        };
        if doc.value(first).is_empty() || doc.element_by_id("visa").is_some() {
            return;
        }
        let label = doc.create_element("label", [("for".to_string(), "visa".to_string())].into());
        let text = doc.create_text("Do you require visa sponsorship?");
        doc.append_child(label, text);
        let input = doc.create_element(
            "input",
            [
                ("id".to_string(), "visa".to_string()),
                ("name".to_string(), "visa".to_string()),
                ("required".to_string(), String::new()),
            ]
            .into(),
        );
        doc.append_child(form, label);
        doc.append_child(form, input);
    });
    let service = ScriptedService::new(&[("first_name", "Ada"), ("email", "ada@example.com"), ("visa", "No")]);
    let log = service.log();
    let engine = engine(service);

    let report = engine.run_session(&mut page, false).unwrap();

    assert!(report.is_resolved());
    assert_eq!(report.fill_attempts, 2);
    assert_eq!(report.rounds, 1);
    let ids: Vec<String> = log.borrow()[1].fields.iter().map(|f| f.id.clone()).collect();
    assert_eq!(ids, vec!["visa".to_string()]);
    let doc = page.document();
    assert_eq!(doc.value(by_id(doc, "visa")), "No");
    assert!(is_marked_filled(doc, by_id(doc, "visa")));
}

#[test]
fn rejected_answers_are_not_reported_as_applied() {
    let mut page = fixture_page("application_form.html");
    let service = ScriptedService::new(&[
        ("first_name", "Ada"),
        ("email", "ada@example.com"),
        ("source", "Carrier pigeon"),
    ]);
    let log = service.log();
    let engine = engine(service);

    let report = engine.run_session(&mut page, false).unwrap();

    assert_eq!(report.summaries[0].failed, 1);
    assert_eq!(report.applied_answers.get("first_name").map(String::as_str), Some("Ada"));
    assert!(!report.applied_answers.contains_key("source"));
    // A field that was already tried is not asked about again.
    assert_eq!(log.borrow().len(), 1);
    let doc = page.document();
    assert_eq!(doc.value(by_id(doc, "source")), "");
}

// =========================================================================
// Failures
// =========================================================================

#[test]
fn service_failure_aborts_with_partial_report() {
    let mut page = fixture_page("application_form.html");
    let engine = engine(ScriptedService::new(&[("first_name", "Ada")]).failing_on(2));

    let abort = engine.run_session(&mut page, true).unwrap_err();

    assert!(matches!(abort.error, AutofillError::ServiceUnavailable(_)));
    assert_eq!(abort.partial.fill_attempts, 2);
    assert_eq!(abort.partial.final_phase, SessionPhase::Filling);
    assert_eq!(abort.partial.applied_answers.get("first_name").map(String::as_str), Some("Ada"));
    assert!(
        abort
            .partial
            .diagnostics
            .iter()
            .any(|d| d.contains("connection refused"))
    );
    // What was written before the failure stays on the page.
    assert_eq!(page.document().value(by_id(page.document(), "first_name")), "Ada");
}

#[test]
fn first_request_failure_leaves_page_untouched() {
    let mut page = fixture_page("application_form.html");
    let before = page.document().mutation_seq();
    let engine = engine(ScriptedService::new(&[("first_name", "Ada")]).failing_on(1));

    let abort = engine.run_session(&mut page, false).unwrap_err();

    assert_eq!(abort.partial.fill_attempts, 1);
    assert!(abort.partial.applied_answers.is_empty());
    assert_eq!(page.document().mutation_seq(), before);
}

#[test]
fn session_without_form_reports_no_form_detected() {
    let mut page = html_page("<html><body><p>Position closed.</p></body></html>");
    let engine = engine(ScriptedService::empty());

    let abort = engine.run_session(&mut page, false).unwrap_err();

    assert!(matches!(abort.error, AutofillError::NoFormDetected { .. }));
    assert_eq!(abort.partial.fill_attempts, 0);
    assert!(abort.partial.signature.is_empty());
}

#[test]
fn low_confidence_answers_are_dropped() {
    let mut page = fixture_page("application_form.html");
    let settings = EngineSettings {
        min_confidence: 0.8,
        ..instant_settings()
    };
    let service = ScriptedService::new(&[("first_name", "Ada")]).with_confidence("email", "guess@example.com", 0.4);
    let engine = AutofillEngine::new(Box::new(service), settings);

    let report = engine.run_session(&mut page, false).unwrap();

    let doc = page.document();
    assert_eq!(doc.value(by_id(doc, "email")), "");
    assert!(!report.applied_answers.contains_key("email"));
    assert!(
        report
            .diagnostics
            .iter()
            .any(|d| d == "1 answer(s) below confidence threshold ignored")
    );
}

// =========================================================================
// Advancing
// =========================================================================

#[test]
fn resolved_wizard_step_advances_with_safe_control() {
    let mut page = wizard_page();
    let engine = engine(ScriptedService::new(&[("name", "Ada Lovelace"), ("email", "ada@example.com")]));

    let report = engine.run_session(&mut page, true).unwrap();

    let outcome = report.advance.expect("advance attempted");
    assert!(outcome.clicked);
    assert!(outcome.moved);
    assert_eq!(outcome.label.as_deref(), Some("Next"));
    assert_eq!(page.url(), STEP_TWO_URL);
    assert!(page.document().element_by_id("summary").is_some());
}

#[test]
fn session_without_advance_flag_never_clicks() {
    let mut page = wizard_page();
    let engine = engine(ScriptedService::new(&[("name", "Ada Lovelace"), ("email", "ada@example.com")]));

    let report = engine.run_session(&mut page, false).unwrap();

    assert!(report.is_resolved());
    assert!(report.advance.is_none());
    assert!(!clicked(page.document(), "Next"));
}

#[test]
fn submit_like_labels_are_never_chosen() {
    let doc = Document::parse(&fixture("wizard_step_one.html"));
    let policy = AdvancePolicy::default();

    let control = find_advance_control(&doc, None, &policy).unwrap();
    assert_eq!(control.label, "Next");

    let doc = Document::parse(&fixture("wizard_step_two.html"));
    assert!(find_advance_control(&doc, None, &policy).is_none());

    let doc = Document::parse(
        "<form><button>Apply now</button><button>Finish</button><button>Continue to submit</button></form>",
    );
    assert!(find_advance_control(&doc, None, &policy).is_none());

    // Inflected forms of a blocked word are blocked as well.
    for label in ["Continue to Submission", "Next: Submitting", "Submit and Continue"] {
        assert!(!policy.allows(label), "{} must not be clickable", label);
    }
    let doc = Document::parse(
        "<form><button>Continue to Submission</button><button>Next: Submitting</button></form>",
    );
    assert!(find_advance_control(&doc, None, &policy).is_none());
}

#[test]
fn preferred_label_wins_and_extra_blocks_apply() {
    let doc = Document::parse(
        "<form><button>Next</button><button>Save and Continue</button><button disabled>Continue</button></form>",
    );
    let mut policy = AdvancePolicy::default();
    assert_eq!(find_advance_control(&doc, None, &policy).unwrap().label, "Save and Continue");

    policy.extra_blocked_labels = vec!["save".into()];
    assert_eq!(find_advance_control(&doc, None, &policy).unwrap().label, "Next");
}

#[test]
fn advance_reports_no_movement() {
    let mut page = fixture_page("wizard_step_one.html");
    let engine = engine(ScriptedService::empty());

    let outcome = engine.advance(&mut page);

    assert!(outcome.clicked);
    assert!(!outcome.moved);
    assert_eq!(outcome.reason, "no step change after 4 checks");
}

#[test]
fn form_vanishing_after_fill_ends_the_session() {
    let mut page = ScriptedPage::new(JOB_URL, &fixture("application_form.html"), |_, doc| {
        if let (Some(form), Some(email)) = (doc.element_by_id("apply"), doc.element_by_id("email")) {
            if doc.attr(email, "data-autofill-state") == Some("filled") {
                doc.detach(form);
            }
        }
    });
    let engine = engine(ScriptedService::new(&[("first_name", "Ada"), ("email", "ada@example.com")]));

    let report = engine.run_session(&mut page, true).unwrap();

    assert_eq!(report.final_phase, SessionPhase::Done);
    assert!(report.is_resolved());
    assert!(report.diagnostics.iter().any(|d| d == "form is no longer present on the page"));
}

// =========================================================================
// Validation delta
// =========================================================================

const VALIDATION_HTML: &str = r#"
<form id="f">
  <div class="row">
    <label for="zip">Postal code</label>
    <input id="zip" name="zip" required aria-invalid="true" aria-describedby="zip-hint zip-err">
    <span id="zip-hint">Five digits</span>
    <span id="zip-err" class="error">Enter a valid postal code</span>
  </div>
  <div class="row">
    <label for="city">City</label>
    <input id="city" name="city" value="Paris">
    <span class="field-error">Unknown city</span>
  </div>
  <div class="row">
    <label for="country">Country</label>
    <input id="country" name="country" value="France" required>
  </div>
  <p role="alert">Please fix the errors below</p>
</form>
"#;

#[test]
fn validation_delta_collects_markers_and_messages() {
    let doc = Document::parse(VALIDATION_HTML);
    let record = detect_forms(&doc, JOB_URL);
    let container = record.primary().unwrap();

    let delta = compute_validation_delta(&doc, container);

    assert_eq!(delta.field_ids(), vec!["zip", "city"]);
    assert_eq!(delta.required_ids(), vec!["zip"]);
    assert!(!delta.contains("country"));

    let zip = &delta.entries[0];
    assert_eq!(
        zip.reasons,
        vec![
            DeltaReason::RequiredEmpty,
            DeltaReason::InvalidMarker,
            DeltaReason::ErrorMessage("Five digits".into()),
            DeltaReason::ErrorMessage("Enter a valid postal code".into()),
        ]
    );
    assert_eq!(delta.entries[1].reasons, vec![DeltaReason::ErrorMessage("Unknown city".into())]);
    assert_eq!(
        delta.messages,
        vec![
            "Five digits",
            "Enter a valid postal code",
            "Unknown city",
            "Please fix the errors below",
        ]
    );
}

#[test]
fn emptiness_follows_field_type() {
    let doc = Document::parse(&fixture("radio_checkbox.html"));
    let record = detect_forms(&doc, JOB_URL);
    let container = record.primary().unwrap();

    assert!(is_field_empty(&doc, field(container, "work_auth")));
    assert!(!is_field_empty(&doc, field(container, "schedule")));
    assert!(is_field_empty(&doc, field(container, "relocate")));
    assert!(!is_field_empty(&doc, field(container, "newsletter")));

    let doc = Document::parse(&fixture("duplicate_location.html"));
    let record = detect_forms(&doc, JOB_URL);
    assert!(is_field_empty(&doc, field(record.primary().unwrap(), "location-picker")));
}

// =========================================================================
// Tracing
// =========================================================================

#[test]
fn session_transitions_are_traced_as_jsonl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.jsonl");
    let mut page = fixture_page("application_form.html");
    let engine = engine(ScriptedService::new(&[("first_name", "Ada"), ("email", "ada@example.com")]))
        .with_tracer(TraceLogger::new(path.to_str().unwrap()));

    engine.run_session(&mut page, false).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let decisions: Vec<String> = content
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
        .map(|v| v["decision"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(decisions, vec!["answers_received", "injected", "validation_clean", "done"]);
}
