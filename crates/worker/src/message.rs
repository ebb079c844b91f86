//! Commands pages post to the worker.
//!
//! Payloads are JSON objects tagged by `type`:
//!
//! ```json
//! { "type": "SKIP_WAITING" }
//! { "type": "CLEAR_CACHE" }
//! ```
//!
//! Unknown tags are rejected, not ignored.

use serde::{Deserialize, Serialize};
use sp1sh_core::Error;
use tokio::sync::oneshot;

/// Wire form of a page message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessagePayload {
    SkipWaiting,
    ClearCache,
}

/// Acknowledgement sent back after `CLEAR_CACHE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ClearCacheAck {
    pub success: bool,
}

/// Channel a page hands over to hear back from the worker.
pub type ReplyPort = oneshot::Sender<ClearCacheAck>;

/// A validated command.
#[derive(Debug)]
pub enum Command {
    SkipWaiting,
    ClearCache { reply: Option<ReplyPort> },
}

impl Command {
    /// Validate a raw message. `reply` is kept only for commands that answer.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownMessage` for anything but a known `type` tag.
    pub fn parse(message: &serde_json::Value, reply: Option<ReplyPort>) -> Result<Self, Error> {
        let payload: MessagePayload = serde_json::from_value(message.clone())
            .map_err(|e| Error::UnknownMessage(format!("{message}: {e}")))?;

        Ok(match payload {
            MessagePayload::SkipWaiting => Command::SkipWaiting,
            MessagePayload::ClearCache => Command::ClearCache { reply },
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::SkipWaiting => "SKIP_WAITING",
            Command::ClearCache { .. } => "CLEAR_CACHE",
        }
    }
}
