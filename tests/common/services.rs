use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use job_autofill::agent::answer_service::{AnswerRequest, AnswerResponse, AnswerService, FieldAnswer};
use job_autofill::agent::error::AutofillError;
use job_autofill::state::normalize::normalize_key;

/// Answers by field id or normalized label, records every request, and can
/// be told to fail on a given call.
pub struct ScriptedService {
    answers: HashMap<String, (String, f32)>,
    fail_on_call: Option<usize>,
    pub requests: Rc<RefCell<Vec<AnswerRequest>>>,
}

impl ScriptedService {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            answers: entries
                .iter()
                .map(|(k, v)| (normalize_key(k), (v.to_string(), 1.0)))
                .collect(),
            fail_on_call: None,
            requests: Rc::new(RefCell::new(vec![])),
        }
    }

    pub fn empty() -> Self {
        Self::new(&[])
    }

    pub fn with_confidence(mut self, key: &str, answer: &str, confidence: f32) -> Self {
        self.answers
            .insert(normalize_key(key), (answer.to_string(), confidence));
        self
    }

    /// Fail with `ServiceUnavailable` on the n-th call (1-based).
    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn log(&self) -> Rc<RefCell<Vec<AnswerRequest>>> {
        Rc::clone(&self.requests)
    }
}

impl AnswerService for ScriptedService {
    fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, AutofillError> {
        self.requests.borrow_mut().push(request.clone());
        if Some(self.requests.borrow().len()) == self.fail_on_call {
            return Err(AutofillError::ServiceUnavailable("connection refused".into()));
        }

        let answers = request
            .fields
            .iter()
            .filter_map(|f| {
                self.answers
                    .get(&normalize_key(&f.id))
                    .or_else(|| self.answers.get(&normalize_key(&f.label)))
                    .map(|(answer, confidence)| {
                        (
                            f.id.clone(),
                            FieldAnswer {
                                answer: answer.clone(),
                                confidence: *confidence,
                                sources: vec!["profile".into()],
                            },
                        )
                    })
            })
            .collect();

        Ok(AnswerResponse {
            answers,
            overall_confidence: 0.9,
            messages: vec![],
        })
    }
}
