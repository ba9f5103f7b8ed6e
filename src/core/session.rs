//! Session-token continuity for the assistant conversation.
//!
//! The session id is an opaque token owned entirely by the backend: the first
//! successful response binds it, and every later request threads it through
//! verbatim. The client never generates, inspects, or compares tokens, so a
//! backend-side rotation is silently adopted.
//!
//! A send is split into two phases. `begin_send` appends the user and loading
//! entries and builds the request payload; `complete_send` applies the outcome
//! once the network task finishes. The controller loop bridges the two, which
//! means two rapid sends may complete in either order and append their
//! terminal entries in completion order. That interleaving is accepted; no
//! ordering token is attached to requests, and the loading placeholder is
//! never resolved or removed.

use crate::api::{ChatRequest, ChatResponse};
use crate::core::log::{EventLog, LogKind};

const LOADING_MESSAGE: &str = "Waiting for assistant...";

#[derive(Debug, Default)]
pub struct ChatSession {
    id: Option<String>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_bound(&self) -> bool {
        self.id.is_some()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Append the user and loading entries and build the request payload.
    /// The session id rides along iff the session is already bound.
    pub fn begin_send(&self, log: &mut EventLog, message: &str) -> ChatRequest {
        log.push(LogKind::User, message);
        log.push(LogKind::Loading, LOADING_MESSAGE);
        ChatRequest {
            message: message.to_string(),
            session_id: self.id.clone(),
        }
    }

    /// Apply the backend outcome. Success adopts the returned id verbatim and
    /// appends the assistant reply; failure appends an error entry and leaves
    /// the session exactly as it was.
    pub fn complete_send(&mut self, log: &mut EventLog, outcome: Result<ChatResponse, String>) {
        match outcome {
            Ok(response) => {
                self.id = Some(response.session_id);
                log.push(LogKind::Assistant, response.response);
            }
            Err(e) => {
                log.push(LogKind::Error, format!("Chat request failed: {e}"));
            }
        }
    }
}
