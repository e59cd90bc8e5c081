//! REST surface.
//!
//! Reads (`GET` and `HEAD`) are never gated so editors and front ends can
//! load content.
//! Any other method serving a post gets its response replaced on HOLD or
//! BLOCK.

use hyper::{Method, StatusCode};
use serde_json::{json, Value};
use verdict::{GateType, Status};

use crate::context::GateContext;
use crate::error::BLOCKED_MESSAGE;

pub const REST_HOLD_MESSAGE: &str = "Content held for API distribution.";

/// A JSON response about to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl RestResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestPost {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub permalink: String,
}

#[derive(Clone)]
pub struct RestGate {
    ctx: GateContext,
}

impl RestGate {
    pub fn new(ctx: GateContext) -> Self {
        Self { ctx }
    }

    /// Final say over the response for `post`. `method` is `None` when the
    /// request is unknown, which is gated like a write.
    pub async fn prepare(
        &self,
        response: RestResponse,
        post: Option<&RestPost>,
        method: Option<&Method>,
    ) -> RestResponse {
        if matches!(method, Some(&Method::GET) | Some(&Method::HEAD)) {
            return response;
        }
        let Some(post) = post else {
            return response;
        };

        let judgment = self
            .ctx
            .check(
                GateType::Rest,
                &post.id.to_string(),
                &post.title,
                &post.content,
                &post.permalink,
            )
            .await;

        match judgment.enforced_status() {
            Status::Block => RestResponse {
                status: StatusCode::FORBIDDEN,
                body: json!({ "message": BLOCKED_MESSAGE, "ctg_status": "BLOCKED" }),
            },
            Status::Hold => RestResponse {
                status: StatusCode::OK,
                body: json!({ "message": REST_HOLD_MESSAGE, "ctg_status": "HOLD" }),
            },
            Status::Pass => response,
        }
    }
}
