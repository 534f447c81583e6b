use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::agent::settings::{AdvancePolicy, Timing};
use crate::dom::capability::{button_label, is_button_like};
use crate::dom::dom_model::{Document, EventKind, NodeId};
use crate::dom::page::PageContext;
use crate::screen::field_model::ControlRef;
use crate::state::signature::step_signature;

/// Result of one advance attempt. Never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceOutcome {
    pub clicked: bool,
    pub moved: bool,
    pub label: Option<String>,
    pub reason: String,
}

impl AdvanceOutcome {
    pub fn not_attempted(reason: impl Into<String>) -> Self {
        Self {
            clicked: false,
            moved: false,
            label: None,
            reason: reason.into(),
        }
    }
}

/// Clickable, visible, enabled, and allowed by the policy.
fn eligible_controls(doc: &Document, scope: NodeId, policy: &AdvancePolicy) -> Vec<ControlRef> {
    doc.descendant_elements(scope)
        .into_iter()
        .filter(|&n| is_button_like(doc, n) && doc.is_visible(n) && doc.is_enabled(n))
        .map(|n| ControlRef {
            node: n,
            label: button_label(doc, n),
        })
        .filter(|c| policy.allows(&c.label))
        .collect()
}

fn pick(candidates: Vec<ControlRef>, policy: &AdvancePolicy) -> Option<ControlRef> {
    let preferred = candidates.iter().position(|c| policy.is_preferred(&c.label));
    match preferred {
        Some(i) => candidates.into_iter().nth(i),
        None => candidates.into_iter().next(),
    }
}

/// The control to click for the next step: searched in the container
/// first, then across the page.
pub fn find_advance_control(doc: &Document, container: Option<NodeId>, policy: &AdvancePolicy) -> Option<ControlRef> {
    if let Some(root) = container.filter(|&r| doc.is_attached(r)) {
        if let Some(control) = pick(eligible_controls(doc, root, policy), policy) {
            return Some(control);
        }
    }
    pick(eligible_controls(doc, doc.root(), policy), policy)
}

/// Click the advance control and poll the step signature for a change.
pub fn attempt_advance(
    page: &mut dyn PageContext,
    container: Option<NodeId>,
    policy: &AdvancePolicy,
    timing: &Timing,
) -> AdvanceOutcome {
    let Some(control) = find_advance_control(page.document(), container, policy) else {
        debug!("No eligible advance control");
        return AdvanceOutcome::not_attempted("no eligible advance control found");
    };

    let before = step_signature(page);
    page.document_mut().dispatch(control.node, EventKind::Click);
    info!(label = %control.label, "Clicked advance control");

    for attempt in 1..=timing.poll_attempts {
        page.settle(timing.poll_interval());
        if step_signature(page) != before {
            debug!(attempt, "Step signature changed");
            return AdvanceOutcome {
                clicked: true,
                moved: true,
                label: Some(control.label),
                reason: "step changed".into(),
            };
        }
    }

    AdvanceOutcome {
        clicked: true,
        moved: false,
        label: Some(control.label),
        reason: format!("no step change after {} checks", timing.poll_attempts),
    }
}
