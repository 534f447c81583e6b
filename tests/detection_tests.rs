use job_autofill::dom::dom_model::Document;
use job_autofill::screen::detector::{detect_forms, extract_company_name, find_virtual_form};
use job_autofill::screen::extractor::{dedupe_fields, descriptive_score, extract_fields};
use job_autofill::screen::field_model::{ContainerOrigin, FieldType, LabelSource, ScoreSignal};
use job_autofill::screen::scorer::{QUALIFYING_SCORE, score_container};
use job_autofill::state::normalize::UNNAMED_FIELD;
use job_autofill::state::signature::form_signature;

use crate::common::utils::{JOB_URL, by_id, field, field_ids, fixture};

mod common;

// =========================================================================
// Scoring
// =========================================================================

#[test]
fn application_form_with_file_and_long_text_qualifies() {
    let doc = Document::parse(&fixture("application_form.html"));
    let record = detect_forms(&doc, JOB_URL);

    let container = record.primary().expect("form detected");
    assert_eq!(container.origin, ContainerOrigin::Native);
    assert_eq!(container.fields.len(), 6, "fields: {:?}", field_ids(container));
    assert!(container.score >= 0.5, "score was {}", container.score);
    assert!(container.score >= QUALIFYING_SCORE);
    assert!(container.indicators.contains(&ScoreSignal::FileUpload));
    assert!(container.indicators.contains(&ScoreSignal::LongText));
}

#[test]
fn score_is_clamped_when_every_signal_fires() {
    let mut html = String::from(
        "<form><h2>Job application: resume, cv, cover letter, experience, education, \
         qualification, employment, career. Company, employer, position.</h2>\
         <input type='file' name='resume'><textarea name='about'></textarea>",
    );
    for i in 0..15 {
        html.push_str(&format!("<label for='q{i}'>Question {i}</label><input id='q{i}' name='q{i}'>"));
    }
    html.push_str("</form>");

    let doc = Document::parse(&html);
    let form = doc.all_elements().into_iter().find(|&n| doc.is_tag(n, "form")).unwrap();
    let fields = extract_fields(&doc, form);
    let score = score_container(&doc, form, &fields);

    assert!(fields.len() >= 10);
    assert!((0.0..=1.0).contains(&score.score), "score was {}", score.score);
    assert_eq!(score.score, 1.0);
}

#[test]
fn empty_container_scores_zero() {
    let doc = Document::parse("<form><p>Nothing to see</p></form>");
    let form = doc.all_elements().into_iter().find(|&n| doc.is_tag(n, "form")).unwrap();
    let score = score_container(&doc, form, &[]);
    assert_eq!(score.score, 0.0);
    assert!(score.indicators.is_empty());
}

// =========================================================================
// Extraction & classification
// =========================================================================

#[test]
fn fields_are_typed_and_labelled() {
    let doc = Document::parse(&fixture("application_form.html"));
    let record = detect_forms(&doc, JOB_URL);
    let container = record.primary().unwrap();

    let first = field(container, "first_name");
    assert_eq!(first.label, "First name");
    assert_eq!(first.label_source, LabelSource::ExplicitLabel);
    assert_eq!(first.field_type, FieldType::ShortText);
    assert!(first.required);

    assert_eq!(field(container, "email").field_type, FieldType::Email);
    assert_eq!(field(container, "phone").field_type, FieldType::Phone);
    assert_eq!(field(container, "resume").field_type, FieldType::File);

    let cover = field(container, "cover");
    assert_eq!(cover.field_type, FieldType::LongText);
    assert_eq!(cover.validation.max_length, Some(2000));

    let source = field(container, "source");
    assert_eq!(source.field_type, FieldType::SingleSelect);
    assert_eq!(source.options.len(), 4);
    assert_eq!(source.options[1].value, "linkedin");
    assert_eq!(source.options[1].label, "LinkedIn");
    assert_eq!(source.current_value, "");
}

#[test]
fn hidden_and_plumbing_inputs_are_skipped() {
    let doc = Document::parse(&fixture("application_form.html"));
    let record = detect_forms(&doc, JOB_URL);
    let ids = field_ids(record.primary().unwrap());

    assert!(!ids.iter().any(|id| id.contains("csrf")));
    // The header search box lives outside the form
    assert!(!ids.iter().any(|id| id == "q"));
}

#[test]
fn unlabeled_control_gets_sentinel_label() {
    let doc = Document::parse("<form><div><input type='text'></div></form>");
    let form = doc.all_elements().into_iter().find(|&n| doc.is_tag(n, "form")).unwrap();
    let fields = extract_fields(&doc, form);

    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].label, UNNAMED_FIELD);
    assert!(!fields[0].has_usable_label());
    assert_eq!(fields[0].id, "field-0");
}

#[test]
fn label_falls_back_through_placeholder_and_name() {
    let doc = Document::parse(
        "<form>
           <input name='current_company'>
           <input placeholder='City, Country' name='loc'>
           <input aria-label='Salary expectation' placeholder='e.g. 100k'>
         </form>",
    );
    let form = doc.all_elements().into_iter().find(|&n| doc.is_tag(n, "form")).unwrap();
    let fields = extract_fields(&doc, form);

    let labels: Vec<(&str, LabelSource)> = fields.iter().map(|f| (f.label.as_str(), f.label_source)).collect();
    assert_eq!(
        labels,
        vec![
            ("Current Company", LabelSource::Name),
            ("City, Country", LabelSource::Placeholder),
            ("Salary expectation", LabelSource::AriaLabel),
        ]
    );
}

#[test]
fn radio_buttons_fold_into_one_group_field() {
    let doc = Document::parse(&fixture("radio_checkbox.html"));
    let record = detect_forms(&doc, JOB_URL);
    let container = record.primary().unwrap();

    let auth = field(container, "work_auth");
    assert_eq!(auth.field_type, FieldType::RadioGroup);
    assert_eq!(auth.label, "Are you legally authorized to work in the United States?");
    assert_eq!(auth.label_source, LabelSource::Legend);
    assert!(auth.required);
    let option_labels: Vec<&str> = auth.options.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(option_labels, vec!["Yes, I am authorized to work", "No, I am not authorized"]);

    let schedule = field(container, "schedule");
    assert_eq!(schedule.current_value, "full");

    assert_eq!(field(container, "relocate").field_type, FieldType::Checkbox);
    assert_eq!(field(container, "newsletter").current_value, "true");
    assert_eq!(field(container, "favorite").field_type, FieldType::UnsupportedOther);
    assert_eq!(container.fields.len(), 5);
}

#[test]
fn repeated_ids_get_suffixes_that_avoid_existing_ids() {
    let doc = Document::parse(
        "<form>
           <input id='q' aria-label='Preferred name'>
           <input id='q' aria-label='Pronouns'>
           <input id='q-2' aria-label='Nickname'>
         </form>",
    );
    let form = doc.all_elements().into_iter().find(|&n| doc.is_tag(n, "form")).unwrap();
    let fields = extract_fields(&doc, form);

    let ids: Vec<&str> = fields.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["q", "q-3", "q-2"]);
}

// =========================================================================
// Deduplication
// =========================================================================

#[test]
fn duplicate_location_keeps_the_custom_dropdown() {
    let doc = Document::parse(&fixture("duplicate_location.html"));
    let record = detect_forms(&doc, JOB_URL);
    let container = record.primary().unwrap();

    assert_eq!(field_ids(container), vec!["full_name", "location-picker"]);

    let location = field(container, "location-picker");
    assert_eq!(location.label, "Location");
    assert_eq!(location.field_type, FieldType::SingleSelect);
    assert!(location.required);
    assert_eq!(location.options.len(), 3);
    assert!(descriptive_score(location) >= 8);
}

#[test]
fn combobox_popup_is_not_a_separate_field() {
    let doc = Document::parse(&fixture("duplicate_location.html"));
    let record = detect_forms(&doc, JOB_URL);
    let container = record.primary().unwrap();

    assert!(container.field("location-options").is_none());
    assert_eq!(by_id(&doc, "location-picker"), field(container, "location-picker").element);
}

#[test]
fn deduplication_is_idempotent() {
    let doc = Document::parse(&fixture("duplicate_location.html"));
    let form = by_id(&doc, "apply");

    let first = extract_fields(&doc, form);
    let second = extract_fields(&doc, form);
    assert_eq!(first, second);

    let again = dedupe_fields(first.clone());
    assert_eq!(again, first);
}

// =========================================================================
// Virtual forms
// =========================================================================

#[test]
fn virtual_form_found_when_no_native_form_exists() {
    let doc = Document::parse(&fixture("virtual_form.html"));
    let record = detect_forms(&doc, JOB_URL);

    let container = record.primary().expect("virtual form");
    assert_eq!(container.origin, ContainerOrigin::Virtual);
    assert_eq!(container.root, by_id(&doc, "application-panel"));
    assert_eq!(find_virtual_form(&doc), Some(container.root));

    let employer = field(container, "employer");
    assert_eq!(employer.label, "What is your current employer?");
    assert_eq!(employer.label_source, LabelSource::QuestionGroup);
    assert!(employer.required);

    assert_eq!(field(container, "years").field_type, FieldType::Numeric);
    let linkedin = container.fields.iter().find(|f| f.field_type == FieldType::Url).unwrap();
    assert_eq!(linkedin.label, "LinkedIn profile");

    let submit = container.submit_control.as_ref().expect("continue control");
    assert_eq!(submit.label, "Continue");
}

#[test]
fn page_without_controls_has_no_containers() {
    let doc = Document::parse("<html><body><main><p>We are hiring! Check back soon for open roles.</p></main></body></html>");
    let record = detect_forms(&doc, JOB_URL);
    assert!(record.is_empty());
}

// =========================================================================
// Page metadata & signatures
// =========================================================================

#[test]
fn company_name_sources() {
    let doc = Document::parse(&fixture("application_form.html"));
    let record = detect_forms(&doc, JOB_URL);
    assert_eq!(record.company.as_deref(), Some("Acme Robotics"));
    assert_eq!(record.title, "Senior Rust Engineer at Acme Robotics");
    assert_eq!(record.domain.as_deref(), Some("jobs.example.com"));

    let doc = Document::parse(&fixture("virtual_form.html"));
    assert_eq!(
        extract_company_name(&doc, "Data Engineer - Globex Careers").as_deref(),
        Some("Globex Corporation")
    );

    let doc = Document::parse("<html><body></body></html>");
    assert_eq!(
        extract_company_name(&doc, "Backend Developer at Umbrella Corp - Careers").as_deref(),
        Some("Umbrella Corp")
    );
    assert_eq!(extract_company_name(&doc, "Careers"), None);
}

#[test]
fn form_signature_ignores_values_and_query_but_not_path() {
    let doc = Document::parse(&fixture("application_form.html"));
    let fields = detect_forms(&doc, JOB_URL).primary().unwrap().fields.clone();

    let base = form_signature(&fields, JOB_URL);
    assert_eq!(base, form_signature(&fields, &format!("{}?ref=linkedin", JOB_URL)));

    let mut reordered = fields.clone();
    reordered.reverse();
    assert_eq!(base, form_signature(&reordered, JOB_URL));

    assert_ne!(base, form_signature(&fields, "https://jobs.example.com/other/apply"));
    assert_ne!(base, form_signature(&fields[1..], JOB_URL));
}
