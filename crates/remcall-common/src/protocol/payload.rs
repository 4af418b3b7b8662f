//! JSON bodies of the 404 and 500 responses.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::CALL_NOT_DEFINED;

/// Body of a `500` response: `{"error": ..., "backtrace": [...], "class": ...}`.
///
/// The client only treats a 500 as a remote failure when all three fields
/// deserialize; any other 500 body is reported as a plain error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error message
    pub error: String,
    /// Remote stack trace, outermost frame first
    pub backtrace: Vec<String>,
    /// Error class (type) name
    pub class: String,
}

impl ErrorPayload {
    pub fn to_json(&self) -> Value {
        json!({
            "error": self.error,
            "backtrace": self.backtrace,
            "class": self.class,
        })
    }
}

/// Body of a `404` response for an unregistered call name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundPayload {
    pub error: String,
    /// The call name that was requested
    pub calls: String,
    /// Every call name registered at the time of the request
    pub list: Vec<String>,
}

impl NotFoundPayload {
    pub fn new(call: impl Into<String>, list: Vec<String>) -> Self {
        Self {
            error: CALL_NOT_DEFINED.into(),
            calls: call.into(),
            list,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "error": self.error,
            "calls": self.calls,
            "list": self.list,
        })
    }
}
