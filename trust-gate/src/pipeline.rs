//! Ordered gate pipeline.
//!
//! Integrations that chain several gates (an automation step that also
//! places an ad, say) register [`GateInterceptor`]s on a [`GatePipeline`].
//! Stages run in registration order and the first refusal stops the run.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use verdict::{DecisionView, GateType};

use crate::adapters::{AdGate, AutomationGate, AutomationOutcome};
use crate::error::GateError;

/// Content travelling through a pipeline.
#[derive(Debug, Clone, Default)]
pub struct GateItem {
    pub title: String,
    pub body: String,
    pub source_url: String,
    /// Decisions collected from the stages that admitted the item
    pub decisions: Vec<DecisionView>,
}

impl GateItem {
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            source_url: source_url.into(),
            decisions: Vec::new(),
        }
    }
}

#[async_trait]
pub trait GateInterceptor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Admit (possibly annotated) or refuse the item.
    async fn intercept(&self, item: GateItem) -> Result<GateItem, GateError>;
}

#[derive(Clone, Default)]
pub struct GatePipeline {
    stages: Vec<Arc<dyn GateInterceptor>>,
}

impl GatePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn then(mut self, stage: Arc<dyn GateInterceptor>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub async fn run(&self, mut item: GateItem) -> Result<GateItem, GateError> {
        for stage in &self.stages {
            item = match stage.intercept(item).await {
                Ok(item) => item,
                Err(e) => {
                    info!(stage = stage.name(), error = %e, "Pipeline stopped");
                    return Err(e);
                }
            };
            debug!(stage = stage.name(), "Pipeline stage admitted item");
        }
        Ok(item)
    }
}

#[async_trait]
impl GateInterceptor for AutomationGate {
    fn name(&self) -> &'static str {
        GateType::Automation.as_str()
    }

    async fn intercept(&self, mut item: GateItem) -> Result<GateItem, GateError> {
        match self.check(&item.title, &item.body, &item.source_url).await {
            AutomationOutcome::Continue(view) => {
                item.decisions.push(view);
                Ok(item)
            }
            AutomationOutcome::Halt { decision_id } => Err(GateError::blocked(decision_id)),
        }
    }
}

#[async_trait]
impl GateInterceptor for AdGate {
    fn name(&self) -> &'static str {
        GateType::Ad.as_str()
    }

    async fn intercept(&self, mut item: GateItem) -> Result<GateItem, GateError> {
        let (decision_id, view) = self.check_view(&item.title, &item.body, &item.source_url).await;
        match view {
            Some(view) => {
                item.decisions.push(view);
                Ok(item)
            }
            None => Err(GateError::blocked(decision_id)),
        }
    }
}
