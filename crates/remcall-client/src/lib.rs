//! remcall Client
//!
//! Invokes remote calls on a process running the remcall dispatcher. Failed
//! calls come back as [`RemcallError::RemoteCallFailed`], chaining the local
//! call site to the remote class, message and backtrace.
//!
//! ```no_run
//! use remcall_client::{Remote, RemoteClient};
//! use remcall_common::{RemoteContext, RemoteOptions};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> remcall_common::Result<()> {
//! let context = Arc::new(RemoteContext::new());
//! context.add("users", RemoteOptions::with_url("http://127.0.0.1:9001"))?;
//!
//! let client = RemoteClient::new(context);
//! let user = client.invoke(Remote::named("users"), "factory", &json!({"name": "ada"})).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;

pub use client::{interpret, ClientConfig, Remote, RemoteClient, Reply};
pub use remcall_common::protocol::error::{RemcallError, Result};
