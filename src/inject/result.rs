use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InjectionOutcome {
    Filled,
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionResult {
    pub field_id: String,
    pub label: String,
    #[serde(flatten)]
    pub outcome: InjectionOutcome,
}

impl InjectionResult {
    pub fn is_filled(&self) -> bool {
        self.outcome == InjectionOutcome::Filled
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillSummary {
    pub total: usize,
    pub filled: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<InjectionResult>,
}

impl FillSummary {
    pub fn from_results(results: Vec<InjectionResult>) -> Self {
        let mut summary = FillSummary {
            total: results.len(),
            ..Default::default()
        };
        for r in &results {
            match r.outcome {
                InjectionOutcome::Filled => summary.filled += 1,
                InjectionOutcome::Skipped { .. } => summary.skipped += 1,
                InjectionOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary.results = results;
        summary
    }

    pub fn result_for(&self, field_id: &str) -> Option<&InjectionResult> {
        self.results.iter().find(|r| r.field_id == field_id)
    }
}
