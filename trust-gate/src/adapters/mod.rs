//! One gate per surface content passes through.
//!
//! | Gate | BLOCK (or undecidable) | HOLD |
//! |------|------------------------|------|
//! | [`PublishGate`] | demoted to `pending`, strict check refuses | demoted to `pending` |
//! | [`CommentGate`] | comment set to `hold` | kept |
//! | [`FeedGate`] | placeholder text | original text |
//! | [`RestGate`] | 403 | 200 held payload |
//! | [`AutomationGate`] | halt | continue |
//! | [`AdGate`] | rejected | accepted |

pub mod ad;
pub mod automation;
pub mod comment;
pub mod feed;
pub mod publish;
pub mod rest;

pub use ad::AdGate;
pub use automation::{AutomationGate, AutomationOutcome};
pub use comment::{CommentGate, CommentStatus, CommentSubmission};
pub use feed::{FeedGate, FeedPost, FEED_BLOCKED_PLACEHOLDER};
pub use publish::{PostStatus, PostSubmission, PublishGate, PublishOutcome};
pub use rest::{RestGate, RestPost, RestResponse, REST_HOLD_MESSAGE};
