//! Feed surface. Blocked items are syndicated as a placeholder.

use std::borrow::Cow;
use verdict::{GateType, Status};

use crate::context::GateContext;

pub const FEED_BLOCKED_PLACEHOLDER: &str = "Content blocked for distribution.";

/// The post a feed entry is rendered from.
#[derive(Debug, Clone)]
pub struct FeedPost {
    pub id: u64,
    pub title: String,
    pub permalink: String,
}

#[derive(Clone)]
pub struct FeedGate {
    ctx: GateContext,
}

impl FeedGate {
    pub fn new(ctx: GateContext) -> Self {
        Self { ctx }
    }

    /// Text to syndicate for `content`. Without a post there is nothing to
    /// judge and the content is returned as is.
    pub async fn render<'a>(&self, post: Option<&FeedPost>, content: &'a str) -> Cow<'a, str> {
        let Some(post) = post else {
            return Cow::Borrowed(content);
        };

        let judgment = self
            .ctx
            .check(
                GateType::Feed,
                &post.id.to_string(),
                &post.title,
                content,
                &post.permalink,
            )
            .await;

        match judgment.enforced_status() {
            Status::Block => Cow::Owned(FEED_BLOCKED_PLACEHOLDER.to_string()),
            Status::Pass | Status::Hold => Cow::Borrowed(content),
        }
    }
}
