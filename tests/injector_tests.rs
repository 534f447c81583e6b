mod common;

use std::collections::HashMap;

use job_autofill::dom::dom_model::{Document, EventKind};
use job_autofill::dom::page::PageContext;
use job_autofill::inject::injector::{FILLED_MARKER_ATTR, FieldInjector, is_marked_filled};
use job_autofill::inject::result::InjectionOutcome;
use job_autofill::screen::detector::detect_forms;
use job_autofill::screen::field_model::{Container, Field};

use crate::common::pages::ScriptedPage;
use crate::common::utils::{JOB_URL, by_id, field, fixture, fixture_page};

fn injector() -> FieldInjector {
    FieldInjector::new(std::time::Duration::ZERO, std::time::Duration::ZERO)
}

fn primary(page: &dyn PageContext) -> Container {
    detect_forms(page.document(), page.url())
        .primary()
        .cloned()
        .expect("form detected")
}

fn fill_one(page: &mut dyn PageContext, f: &Field, answer: &str) -> InjectionOutcome {
    match injector().inject(page, f, answer) {
        Ok(outcome) => outcome,
        Err(e) => InjectionOutcome::Failed { reason: e.to_string() },
    }
}

// =========================================================================
// Text fields
// =========================================================================

#[test]
fn text_fill_fires_the_framework_event_sequence() {
    let mut page = fixture_page("application_form.html");
    let container = primary(&page);
    let first = field(&container, "first_name");

    let outcome = fill_one(&mut page, first, "Ada");

    assert_eq!(outcome, InjectionOutcome::Filled);
    let doc = page.document();
    assert_eq!(doc.value(first.element), "Ada");
    assert_eq!(
        doc.events_for(first.element),
        vec![
            EventKind::Focus,
            EventKind::Input,
            EventKind::InsertText,
            EventKind::Change,
            EventKind::Blur,
            EventKind::Blur,
        ]
    );
    assert_eq!(doc.attr(first.element, FILLED_MARKER_ATTR), Some("filled"));
    assert!(doc.attr(first.element, "style").unwrap_or("").contains("outline"));
}

#[test]
fn text_fill_replaces_existing_value() {
    let mut page = fixture_page("application_form.html");
    let container = primary(&page);
    let cover = field(&container, "cover");
    page.document_mut().set_value_native(cover.element, "draft text");

    fill_one(&mut page, cover, "I build reliable systems.");
    assert_eq!(page.document().value(cover.element), "I build reliable systems.");
}

#[test]
fn element_detached_during_settle_fails_the_field() {
    let mut page = ScriptedPage::new(JOB_URL, &fixture("application_form.html"), |_, doc| {
        if let Some(node) = doc.element_by_id("first_name") {
            doc.detach(node);
        }
    });
    let container = primary(&page);
    let first = field(&container, "first_name").clone();

    let result = injector().inject(&mut page, &first, "Ada");

    assert_eq!(result, Err(job_autofill::InjectError::Detached));
    assert_eq!(page.settle_calls, 1);
    // The write happened before the page re-rendered; nothing after it.
    assert_eq!(page.document().events_for(first.element).last(), Some(&EventKind::Blur));
    assert!(!is_marked_filled(page.document(), first.element));
}

#[test]
fn element_detached_before_injection_is_rejected() {
    let mut page = fixture_page("application_form.html");
    let container = primary(&page);
    let email = field(&container, "email");
    page.document_mut().detach(email.element);

    let outcome = fill_one(&mut page, email, "ada@example.com");
    match outcome {
        InjectionOutcome::Failed { reason } => assert!(reason.contains("no longer attached")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(page.document().events_for(email.element).is_empty());
}

// =========================================================================
// Native selects
// =========================================================================

#[test]
fn native_select_matches_exact_text_or_value() {
    let mut page = fixture_page("application_form.html");
    let container = primary(&page);
    let source = field(&container, "source");

    assert_eq!(fill_one(&mut page, source, "LinkedIn"), InjectionOutcome::Filled);
    assert_eq!(page.document().value(source.element), "linkedin");

    assert_eq!(fill_one(&mut page, source, "referral"), InjectionOutcome::Filled);
    assert_eq!(page.document().value(source.element), "referral");
    assert_eq!(page.document().selected_options(source.element).len(), 1);
}

#[test]
fn native_select_falls_back_to_containment() {
    let mut page = fixture_page("application_form.html");
    let container = primary(&page);
    let source = field(&container, "source");

    assert_eq!(fill_one(&mut page, source, "job"), InjectionOutcome::Filled);
    assert_eq!(page.document().value(source.element), "board");
    assert_eq!(
        page.document().events_for(source.element),
        vec![EventKind::Change, EventKind::Blur]
    );
}

#[test]
fn native_select_without_match_is_left_alone() {
    let mut page = fixture_page("application_form.html");
    let container = primary(&page);
    let source = field(&container, "source");

    let outcome = fill_one(&mut page, source, "Carrier pigeon");

    assert_eq!(
        outcome,
        InjectionOutcome::Failed {
            reason: "no option matching 'Carrier pigeon'".into()
        }
    );
    assert_eq!(page.document().value(source.element), "");
    assert!(page.document().events_for(source.element).is_empty());
}

// =========================================================================
// Custom dropdowns
// =========================================================================

#[test]
fn custom_dropdown_selects_and_clicks_the_option() {
    let mut page = fixture_page("duplicate_location.html");
    let container = primary(&page);
    let location = field(&container, "location-picker");

    assert_eq!(fill_one(&mut page, location, "Berlin"), InjectionOutcome::Filled);

    let doc = page.document();
    let options: Vec<_> = location.options.iter().filter_map(|o| o.node).collect();
    let selected: Vec<Option<&str>> = options.iter().map(|&o| doc.attr(o, "aria-selected")).collect();
    assert_eq!(selected, vec![Some("false"), Some("true"), Some("false")]);
    assert_eq!(doc.events_for(options[1]), vec![EventKind::Click]);
    assert_eq!(
        doc.events_for(location.element),
        vec![EventKind::Focus, EventKind::Click, EventKind::Change, EventKind::Blur]
    );
    assert!(is_marked_filled(doc, location.element));
}

#[test]
fn custom_dropdown_without_options_accepts_free_text_input() {
    let mut page = crate::common::utils::html_page(
        "<form><label for='city'>City</label>\
         <input id='city' name='city' role='combobox' aria-autocomplete='list'></form>",
    );
    let container = primary(&page);
    let city = field(&container, "city");

    assert_eq!(fill_one(&mut page, city, "Lisbon"), InjectionOutcome::Filled);
    assert_eq!(page.document().value(city.element), "Lisbon");
}

// =========================================================================
// Radio groups & checkboxes
// =========================================================================

#[test]
fn radio_answer_matches_by_words_and_leaves_others() {
    let mut page = fixture_page("radio_checkbox.html");
    let container = primary(&page);
    let auth = field(&container, "work_auth");

    assert_eq!(fill_one(&mut page, auth, "Yes, authorized"), InjectionOutcome::Filled);

    let doc = page.document();
    let yes = by_id(doc, "auth_yes");
    let no = by_id(doc, "auth_no");
    assert!(doc.is_checked(yes));
    assert!(!doc.is_checked(no));
    assert_eq!(doc.events_for(yes), vec![EventKind::Change, EventKind::Click]);
    assert!(doc.events_for(no).is_empty());
    assert!(is_marked_filled(doc, yes));
}

#[test]
fn radio_choice_unchecks_previous_member() {
    let mut page = fixture_page("radio_checkbox.html");
    let container = primary(&page);
    let schedule = field(&container, "schedule");

    assert_eq!(fill_one(&mut page, schedule, "Part time"), InjectionOutcome::Filled);

    let doc = page.document();
    assert!(doc.is_checked(by_id(doc, "sched_part")));
    assert!(!doc.is_checked(by_id(doc, "sched_full")));
}

#[test]
fn radio_without_match_fails() {
    let mut page = fixture_page("radio_checkbox.html");
    let container = primary(&page);
    let auth = field(&container, "work_auth");

    let outcome = fill_one(&mut page, auth, "Maybe later");

    assert!(matches!(outcome, InjectionOutcome::Failed { .. }));
    let doc = page.document();
    assert!(!doc.is_checked(by_id(doc, "auth_yes")));
    assert!(!doc.is_checked(by_id(doc, "auth_no")));
}

#[test]
fn checkbox_toggles_only_when_state_differs() {
    let mut page = fixture_page("radio_checkbox.html");
    let container = primary(&page);
    let relocate = field(&container, "relocate");
    let newsletter = field(&container, "newsletter");

    assert_eq!(fill_one(&mut page, relocate, "yes"), InjectionOutcome::Filled);
    assert_eq!(fill_one(&mut page, newsletter, "true"), InjectionOutcome::Filled);

    let doc = page.document();
    assert!(doc.is_checked(relocate.element));
    assert_eq!(doc.events_for(relocate.element), vec![EventKind::Change, EventKind::Click]);
    assert!(doc.is_checked(newsletter.element));
    assert!(doc.events_for(newsletter.element).is_empty());

    assert_eq!(fill_one(&mut page, newsletter, "no"), InjectionOutcome::Filled);
    assert!(!page.document().is_checked(newsletter.element));
}

// =========================================================================
// File & unsupported fields
// =========================================================================

fn advisories(doc: &Document) -> usize {
    doc.all_elements()
        .into_iter()
        .filter(|&n| doc.attr(n, "data-autofill-advisory").is_some())
        .count()
}

#[test]
fn file_field_is_flagged_not_filled() {
    let mut page = fixture_page("application_form.html");
    let container = primary(&page);
    let resume = field(&container, "resume");

    let outcome = fill_one(&mut page, resume, "/home/ada/resume.pdf");
    assert!(matches!(outcome, InjectionOutcome::Skipped { .. }));
    fill_one(&mut page, resume, "/home/ada/resume.pdf");

    let doc = page.document();
    assert!(!is_marked_filled(doc, resume.element));
    assert_eq!(doc.value(resume.element), "");
    assert_eq!(doc.attr(resume.element, "data-autofill-flag"), Some("manual-upload"));
    assert_eq!(advisories(doc), 1);

    let note = doc.children(doc.parent(resume.element).unwrap())
        .iter()
        .copied()
        .find(|&c| doc.attr(c, "data-autofill-advisory") == Some("resume"))
        .unwrap();
    assert!(doc.text_content(note).contains("Please attach your Resume manually."));
}

#[test]
fn unsupported_type_fails_without_touching_the_page() {
    let mut page = fixture_page("radio_checkbox.html");
    let container = primary(&page);
    let favorite = field(&container, "favorite");
    let before = page.document().mutation_seq();

    let outcome = fill_one(&mut page, favorite, "#ff0000");

    assert!(matches!(outcome, InjectionOutcome::Failed { reason } if reason.contains("cannot be filled")));
    assert_eq!(page.document().mutation_seq(), before);
}

// =========================================================================
// Batches
// =========================================================================

#[test]
fn batch_summary_counts_each_outcome() {
    let mut page = fixture_page("application_form.html");
    let container = primary(&page);
    let answers: HashMap<String, String> = [
        ("first_name", "Ada"),
        ("email", "ada@example.com"),
        ("phone", "   "),
        ("resume", "resume.pdf"),
        ("source", "Carrier pigeon"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let summary = injector().inject_answers(&mut page, &container.fields, &answers);

    assert_eq!(summary.total, 6);
    assert_eq!(summary.filled, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 3);
    assert!(summary.result_for("first_name").unwrap().is_filled());
    assert_eq!(
        summary.result_for("phone").unwrap().outcome,
        InjectionOutcome::Skipped {
            reason: "no answer available".into()
        }
    );
    assert!(matches!(
        summary.result_for("source").unwrap().outcome,
        InjectionOutcome::Failed { .. }
    ));
}

#[test]
fn batch_pauses_between_fields() {
    let mut page = ScriptedPage::new(JOB_URL, &fixture("application_form.html"), |_, _| {});
    let container = primary(&page);
    let answers: HashMap<String, String> = [("first_name", "Ada"), ("email", "ada@example.com")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let summary = injector().inject_answers(&mut page, &container.fields, &answers);

    assert_eq!(summary.filled, 2);
    // One settle inside each text fill plus one pause before the second field.
    assert_eq!(page.settle_calls, 3);
}
