//! Error Chaining Across the Process Boundary
//!
//! A failure inside a remote handler travels to the client as an
//! [`ErrorPayload`] and is rebuilt there as a [`RemoteError`]. The client
//! then wraps it in a [`ChainedError`] so the error it returns points at both
//! ends: where the remote call was made, and where the handler failed.
//!
//! # Rendering
//!
//! [`chain_backtrace`] merges the two traces into one listing:
//!
//! ```text
//!   <local frame 0>
//!   <local frame 1>
//! /:0 caused by <class>: <message>
//!   <remote frame 0>
//!   <remote frame 1>
//! ```
//!
//! Rendering never mutates either error.

use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;

use super::payload::ErrorPayload;

const TRACE_INDENT: &str = "  ";

/// Class name reported for handlers that panic instead of returning an error.
pub const PANIC_CLASS: &str = "panic";

/// Captures the current thread's stack as trace lines.
///
/// Capture is forced regardless of `RUST_BACKTRACE`.
pub fn capture_backtrace() -> Vec<String> {
    Backtrace::force_capture()
        .to_string()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Merges a local trace with an optional cause's trace.
pub fn chain_backtrace(local: &[String], cause: Option<&RemoteError>) -> Vec<String> {
    let mut trace: Vec<String> = local
        .iter()
        .map(|line| format!("{}{}", TRACE_INDENT, line))
        .collect();

    if let Some(cause) = cause {
        trace.push(format!("/:0 caused by {}: {}", cause.class, cause.message));
        trace.extend(
            cause
                .backtrace
                .iter()
                .map(|line| format!("{}{}", TRACE_INDENT, line)),
        );
    }

    trace
}

/// A failure that happened in another process (or is about to be sent to
/// one): class name, message, and the stack trace where it was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    class: String,
    message: String,
    backtrace: Vec<String>,
}

impl RemoteError {
    pub fn new(
        class: impl Into<String>,
        message: impl Into<String>,
        backtrace: Vec<String>,
    ) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
            backtrace,
        }
    }

    /// Creates an error with the current stack as its trace.
    pub fn capture(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(class, message, capture_backtrace())
    }

    /// Describes a local error. The class is the error's type name.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error,
    {
        Self::capture(std::any::type_name::<E>(), err.to_string())
    }

    /// Describes a caught panic. The trace is the catch site's, since the
    /// panicking frames are gone by the time the payload is inspected.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(msg) = payload.downcast_ref::<&str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "handler panicked".to_string()
        };

        Self::capture(PANIC_CLASS, message)
    }

    pub fn from_payload(payload: ErrorPayload) -> Self {
        Self {
            class: payload.class,
            message: payload.error,
            backtrace: payload.backtrace,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            error: self.message.clone(),
            backtrace: self.backtrace.clone(),
            class: self.class.clone(),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn backtrace(&self) -> &[String] {
        &self.backtrace
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class, self.message)
    }
}

impl std::error::Error for RemoteError {}

impl From<ErrorPayload> for RemoteError {
    fn from(payload: ErrorPayload) -> Self {
        Self::from_payload(payload)
    }
}

/// A local error with an optional remote cause.
///
/// The local trace is captured when the error is created. Use
/// [`full_backtrace`](Self::full_backtrace) for the merged listing.
#[derive(Debug)]
pub struct ChainedError {
    message: String,
    backtrace: Vec<String>,
    cause: Option<Box<RemoteError>>,
}

impl ChainedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            backtrace: capture_backtrace(),
            cause: None,
        }
    }

    pub fn with_cause(message: impl Into<String>, cause: RemoteError) -> Self {
        Self {
            cause: Some(Box::new(cause)),
            ..Self::new(message)
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&RemoteError> {
        self.cause.as_deref()
    }

    /// The local trace, without indentation or cause.
    pub fn local_backtrace(&self) -> &[String] {
        &self.backtrace
    }

    pub fn full_backtrace(&self) -> Vec<String> {
        chain_backtrace(&self.backtrace, self.cause())
    }
}

impl fmt::Display for ChainedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ChainedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}
