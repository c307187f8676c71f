//! Request identity and the notifications a session emits.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::usage::Usage;

/// Caller-chosen identifier of one logical exchange.
///
/// Unique among live sessions; reusable once a session has ended.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Arc<str>);

impl RequestId {
    /// Creates an id from any string.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A notification about a session's progress.
///
/// Exactly one of [`Completed`](Self::Completed),
/// [`Failed`](Self::Failed) or [`Cancelled`](Self::Cancelled) ends every
/// session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SessionEvent {
    /// A fragment of visible text, as it streams.
    PartialResponse {
        /// The session.
        request_id: RequestId,
        /// The new text.
        text: String,
    },
    /// All visible text across every round of the session.
    FullResponse {
        /// The session.
        request_id: RequestId,
        /// The accumulated text.
        text: String,
    },
    /// A finished reasoning block.
    ThinkingBlock {
        /// The session.
        request_id: RequestId,
        /// The reasoning text.
        thinking: String,
        /// The block's signature, if the vendor sent one.
        signature: Option<String>,
    },
    /// A finished encrypted reasoning block.
    RedactedThinkingBlock {
        /// The session.
        request_id: RequestId,
        /// The opaque payload.
        data: String,
    },
    /// A tool began executing.
    ToolExecutionStarted {
        /// The session.
        request_id: RequestId,
        /// The call id.
        tool_id: String,
        /// The tool's display name.
        tool_name: String,
    },
    /// A tool finished (successfully or not).
    ToolExecutionCompleted {
        /// The session.
        request_id: RequestId,
        /// The call id.
        tool_id: String,
        /// The tool's display name.
        tool_name: String,
        /// The text sent back to the model.
        result: String,
    },
    /// Tool results were sent and a new round began.
    ContinuationStarted {
        /// The session.
        request_id: RequestId,
        /// The new round number (the first round is 1).
        round: u32,
    },
    /// The session finished successfully.
    Completed {
        /// The session.
        request_id: RequestId,
        /// Tokens used across all rounds.
        usage: Usage,
    },
    /// The session failed.
    Failed {
        /// The session.
        request_id: RequestId,
        /// What went wrong.
        error: String,
    },
    /// The session was cancelled.
    Cancelled {
        /// The session.
        request_id: RequestId,
    },
}

impl SessionEvent {
    /// The session the event belongs to.
    pub fn request_id(&self) -> &RequestId {
        match self {
            Self::PartialResponse { request_id, .. }
            | Self::FullResponse { request_id, .. }
            | Self::ThinkingBlock { request_id, .. }
            | Self::RedactedThinkingBlock { request_id, .. }
            | Self::ToolExecutionStarted { request_id, .. }
            | Self::ToolExecutionCompleted { request_id, .. }
            | Self::ContinuationStarted { request_id, .. }
            | Self::Completed { request_id, .. }
            | Self::Failed { request_id, .. }
            | Self::Cancelled { request_id } => request_id,
        }
    }

    /// Returns `true` for the event that ends a session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }
}
