//! remcall Common Types and Transport
//!
//! This crate provides the shared pieces of the remcall remote-call protocol:
//!
//! - **Protocol**: marker header, wire payloads, the [`RemcallError`] taxonomy,
//!   and the [`RemoteError`] / [`ChainedError`] pair used to carry a remote
//!   failure (and its stack trace) back to the caller
//! - **Handlers**: the [`Handler`] trait, [`CallRequest`], [`HandlerResult`]
//!   and [`HandlerError`]
//! - **Context**: [`RemoteContext`], the registry of handlers and directory of
//!   named remotes shared by the dispatcher and the client
//! - **Transport**: HTTP body/response helpers
//!
//! # Architecture
//!
//! ```text
//! client ── POST, X-Rack-Remote-Call: <name>, JSON params ──▶ dispatcher
//!        ◀── 200 JSON value | 404 not defined | 500 error payload ──
//! ```
//!
//! # Example
//!
//! ```
//! use remcall_common::{CallRequest, HandlerError, RemoteContext, RemoteOptions};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! let context = Arc::new(RemoteContext::new());
//! context.register("factory", |params: Value, _request: CallRequest| async move {
//!     Ok::<_, HandlerError>(json!({"created": params}))
//! });
//! context.add("users", RemoteOptions::with_url("http://users.example.org")).unwrap();
//!
//! assert_eq!(context.calls(), vec!["factory"]);
//! ```

pub mod context;
pub mod handler;
pub mod protocol;
pub mod transport;

pub use context::{RemoteContext, RemoteOptions};
pub use handler::{BoxFuture, CallRequest, Handler, HandlerError, HandlerResult};
pub use protocol::*;
