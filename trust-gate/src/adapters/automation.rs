//! Automation surface. A blocked step halts the workflow.

use verdict::{DecisionId, DecisionView, GateType, Status};

use crate::context::GateContext;

#[derive(Debug, Clone, PartialEq)]
pub enum AutomationOutcome {
    /// Do not run the next step
    Halt { decision_id: DecisionId },
    Continue(DecisionView),
}

impl AutomationOutcome {
    pub fn is_halt(&self) -> bool {
        matches!(self, Self::Halt { .. })
    }
}

#[derive(Clone)]
pub struct AutomationGate {
    ctx: GateContext,
}

impl AutomationGate {
    pub fn new(ctx: GateContext) -> Self {
        Self { ctx }
    }

    pub async fn check(&self, title: &str, text: &str, url: &str) -> AutomationOutcome {
        let judgment = self
            .ctx
            .check(GateType::Automation, "0", title, text, url)
            .await;

        match judgment.decision {
            Some(decision) if decision.status != Status::Block => {
                AutomationOutcome::Continue(decision.view())
            }
            _ => AutomationOutcome::Halt {
                decision_id: judgment.decision_id,
            },
        }
    }
}
