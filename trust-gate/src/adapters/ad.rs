//! Ad surface.

use verdict::{DecisionId, DecisionView, GateType, Status};

use crate::context::GateContext;

#[derive(Clone)]
pub struct AdGate {
    ctx: GateContext,
}

impl AdGate {
    pub fn new(ctx: GateContext) -> Self {
        Self { ctx }
    }

    /// Decision id to attach to an accepted ad, `None` if rejected.
    pub async fn check(&self, title: &str, content: &str, url: &str) -> Option<DecisionId> {
        let (decision_id, view) = self.check_view(title, content, url).await;
        view.map(|_| decision_id)
    }

    /// Like [`AdGate::check`] but hands back the admitted decision. The view
    /// is `None` when the ad is rejected.
    pub async fn check_view(
        &self,
        title: &str,
        content: &str,
        url: &str,
    ) -> (DecisionId, Option<DecisionView>) {
        let judgment = self.ctx.check(GateType::Ad, "0", title, content, url).await;
        let view = match judgment.decision {
            Some(decision) if decision.status != Status::Block => Some(decision.view()),
            _ => None,
        };
        (judgment.decision_id, view)
    }
}
