use crate::agent::session::{AutofillSession, MAX_ROUNDS};
use crate::agent::validation::ValidationDelta;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Ask again for exactly these field ids.
    Retry(Vec<String>),
    Stop(&'static str),
}

pub fn check_retry_budget(session: &AutofillSession, delta: &ValidationDelta) -> RetryDecision {
    // ---- Nothing failing ----
    if delta.is_empty() {
        return RetryDecision::Stop("validation_clean");
    }

    // ---- Only fields we have not answered yet are worth another request ----
    let unanswered: Vec<String> = delta
        .field_ids()
        .into_iter()
        .filter(|id| !session.attempted.contains(id))
        .collect();
    if unanswered.is_empty() {
        return RetryDecision::Stop("no_unanswered_fields");
    }

    // ---- Round cap ----
    if session.round >= MAX_ROUNDS {
        return RetryDecision::Stop("retry_budget_exhausted");
    }

    RetryDecision::Retry(unanswered)
}
