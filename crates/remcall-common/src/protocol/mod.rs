//! remcall Wire Protocol
//!
//! A remote call is an ordinary HTTP `POST` that carries the call name in the
//! [`CALL_HEADER`] header and its parameters as a JSON object body. Everything
//! else on the request (path, query, extra headers) is left to the host.
//!
//! # Responses
//!
//! - `200` with `Content-Type: application/json`: the handler's return value
//! - `404`: [`NotFoundPayload`], the call name is not registered
//! - `500`: [`ErrorPayload`], the handler failed
//! - anything else: a raw response the handler built itself

pub mod chain;
pub mod error;
pub mod payload;


use http::HeaderName;

pub use chain::{capture_backtrace, chain_backtrace, ChainedError, RemoteError};
pub use error::{RemcallError, Result};
pub use payload::{ErrorPayload, NotFoundPayload};

/// Request header carrying the call name. Its presence is what marks a
/// request as a remote call.
pub const CALL_HEADER: HeaderName = HeaderName::from_static("x-rack-remote-call");

/// Content type of every structured request and response body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// `error` field of the 404 payload.
pub const CALL_NOT_DEFINED: &str = "remote call not defined";

/// Message of the local error raised when the remote reports a failure.
pub const REMOTE_CALL_FAILED: &str = "Remote call returned error code 500";
