//! Comment surface. A blocked comment is parked in moderation.

use serde::{Deserialize, Serialize};
use verdict::{DecisionId, GateType, Status};

use crate::context::GateContext;

/// Moderation status of a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Approved,
    Hold,
    Spam,
    Trash,
}

#[derive(Debug, Clone)]
pub struct CommentSubmission {
    pub id: u64,
    pub author: String,
    pub content: String,
    pub link: String,
    pub status: CommentStatus,
}

impl CommentSubmission {
    /// Comments have no title of their own.
    pub fn title(&self) -> String {
        format!("Comment by {}", self.author)
    }
}

#[derive(Clone)]
pub struct CommentGate {
    ctx: GateContext,
}

impl CommentGate {
    pub fn new(ctx: GateContext) -> Self {
        Self { ctx }
    }

    /// Gate a freshly inserted comment, moving it to `hold` on BLOCK.
    pub async fn on_insert(&self, comment: &mut CommentSubmission) -> DecisionId {
        let judgment = self
            .ctx
            .check(
                GateType::Comment,
                &comment.id.to_string(),
                &comment.title(),
                &comment.content,
                &comment.link,
            )
            .await;

        if judgment.enforced_status() == Status::Block {
            comment.status = CommentStatus::Hold;
        }
        judgment.decision_id
    }
}
