//! Publish surface.
//!
//! Three steps run as a post moves towards `publish`:
//!
//! 1. [`PublishGate::filter`] before the post is persisted: anything short of
//!    PASS is demoted to `pending`, remembered in the [`PublishMemo`] and
//!    audited as `post_block`. Posts let through are audited as `post`.
//! 2. [`PublishGate::enforce`] as the strict pre-publish check: BLOCK is
//!    refused outright with the fixed blocked message.
//! 3. [`PublishGate::force_pending`] on later saves: demotes from the memo
//!    without deciding again.
//!
//! Only submissions requesting `publish` are gated. Revisions and
//! auto-drafts pass through untouched.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use verdict::{ContentType, DecisionId, GateType, Status};

use crate::context::GateContext;
use crate::error::GateError;
use crate::memo::{MemoRecord, PublishMemo};

/// Requested lifecycle status of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostStatus {
    Publish,
    Pending,
    Draft,
    AutoDraft,
    Future,
    Private,
    Trash,
}

/// A post on its way to storage.
#[derive(Debug, Clone)]
pub struct PostSubmission {
    /// Unset for posts that have never been saved
    pub id: Option<u64>,
    pub title: String,
    pub content: String,
    pub permalink: String,
    pub status: PostStatus,
    pub is_revision: bool,
}

impl PostSubmission {
    fn is_gated(&self) -> bool {
        self.status == PostStatus::Publish && !self.is_revision
    }

    fn subject_id(&self) -> String {
        self.id.unwrap_or(0).to_string()
    }
}

/// What [`PublishGate::filter`] did to a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    /// Not a publish request
    Skipped,
    Published { decision_id: DecisionId },
    /// Status rewritten to `pending`; `status` is `None` if undecidable
    Demoted {
        decision_id: DecisionId,
        status: Option<Status>,
    },
}

#[derive(Clone)]
pub struct PublishGate {
    ctx: GateContext,
    memo: Arc<PublishMemo>,
}

impl PublishGate {
    pub fn new(ctx: GateContext, memo: Arc<PublishMemo>) -> Self {
        Self { ctx, memo }
    }

    pub fn memo(&self) -> &Arc<PublishMemo> {
        &self.memo
    }

    /// Demote anything short of PASS to `pending`.
    pub async fn filter(&self, post: &mut PostSubmission) -> PublishOutcome {
        if !post.is_gated() {
            return PublishOutcome::Skipped;
        }

        let subject_id = post.subject_id();
        let judgment = self
            .ctx
            .judge(
                ContentType::Post,
                &subject_id,
                &post.title,
                &post.content,
                &post.permalink,
            )
            .await;

        if !judgment.enforced_status().is_restrictive() {
            self.ctx.record(GateType::Post, &subject_id, &judgment.decision_id);
            if let Some(id) = post.id {
                self.memo.forget(id);
            }
            return PublishOutcome::Published {
                decision_id: judgment.decision_id,
            };
        }

        self.ctx.record(GateType::PostBlock, &subject_id, &judgment.decision_id);

        let status = judgment.decision.as_ref().map(|d| d.status);
        if let Some(id) = post.id {
            self.memo.remember(
                id,
                MemoRecord {
                    decision_id: judgment.decision_id.clone(),
                    status,
                },
            );
        }
        post.status = PostStatus::Pending;

        info!(
            post_id = %subject_id,
            decision_id = %judgment.decision_id,
            status = ?status,
            "Publish demoted to pending"
        );

        PublishOutcome::Demoted {
            decision_id: judgment.decision_id,
            status,
        }
    }

    /// Strict pre-publish check. `Ok(None)` when the post is not gated.
    pub async fn enforce(&self, post: &PostSubmission) -> Result<Option<DecisionId>, GateError> {
        if !post.is_gated() {
            return Ok(None);
        }

        let judgment = self
            .ctx
            .check(
                GateType::Post,
                &post.subject_id(),
                &post.title,
                &post.content,
                &post.permalink,
            )
            .await;

        if judgment.enforced_status() == Status::Block {
            info!(
                post_id = %post.subject_id(),
                decision_id = %judgment.decision_id,
                missing = judgment.is_missing(),
                "Publish refused"
            );
            return Err(GateError::blocked(judgment.decision_id));
        }
        Ok(Some(judgment.decision_id))
    }

    /// Demote a publish request for a post the filter recently held back.
    /// Returns true when the status was rewritten.
    pub fn force_pending(&self, post: &mut PostSubmission) -> bool {
        if post.status != PostStatus::Publish {
            return false;
        }
        let Some(id) = post.id else {
            return false;
        };
        match self.memo.recall(id) {
            Some(record) if record.status.map_or(true, |s| s.is_restrictive()) => {
                post.status = PostStatus::Pending;
                true
            }
            _ => false,
        }
    }
}
