//! Call Registry and Remote Directory
//!
//! [`RemoteContext`] holds the two pieces of state the protocol needs:
//!
//! - **Registry**: call name → [`Handler`], read by the dispatcher
//! - **Remote directory**: symbolic remote name → [`RemoteOptions`], read by the client
//!
//! The host creates one context, shares it (as `Arc<RemoteContext>`) with the
//! dispatcher and the client, and populates it at startup or test setup.
//! [`clear`](RemoteContext::clear) resets both maps between tests.
//!
//! # Concurrency
//!
//! Each map sits behind its own `RwLock`, held only for the map operation and
//! never across a handler call. Registering while requests are in flight is
//! allowed, but which version of a handler an in-flight request sees is up
//! to the caller to coordinate.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::handler::Handler;
use crate::protocol::error::{RemcallError, Result};

/// Connection options for a named remote.
///
/// # Example
///
/// ```
/// use remcall_common::RemoteOptions;
///
/// let options = RemoteOptions::with_url("http://users.example.org")
///     .header("X-Test-Run", "42");
/// assert_eq!(options.url.as_deref(), Some("http://users.example.org"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOptions {
    /// Base URL of the remote (required by [`RemoteContext::add`])
    pub url: Option<String>,
    /// Headers sent with every call to this remote
    pub headers: Vec<(String, String)>,
}

impl RemoteOptions {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Registry of handlers and directory of remotes.
#[derive(Default)]
pub struct RemoteContext {
    calls: RwLock<HashMap<String, Arc<dyn Handler>>>,
    remotes: RwLock<HashMap<String, RemoteOptions>>,
}

impl RemoteContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under `name`, replacing any previous handler with
    /// the same name.
    pub fn register<H: Handler>(&self, name: impl Into<String>, handler: H) {
        let name = name.into();
        tracing::debug!(call = %name, "registering remote call");
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, Arc::new(handler));
    }

    /// Looks up the handler registered under `name`.
    pub fn handler(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Names of all registered calls, sorted.
    pub fn calls(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Adds a named remote.
    ///
    /// # Errors
    ///
    /// Returns [`RemcallError::InvalidArgument`] if `options` has no URL. The
    /// directory is left unchanged in that case.
    pub fn add(&self, name: impl Into<String>, options: RemoteOptions) -> Result<()> {
        let name = name.into();
        match options.url.as_deref() {
            Some(url) if !url.trim().is_empty() => {}
            _ => {
                return Err(RemcallError::InvalidArgument(format!(
                    "remote '{}' requires a url",
                    name
                )));
            }
        }

        tracing::debug!(remote = %name, url = ?options.url, "adding remote");
        self.remotes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, options);
        Ok(())
    }

    /// Looks up a named remote.
    pub fn remote(&self, name: &str) -> Option<RemoteOptions> {
        self.remotes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Snapshot of all named remotes.
    pub fn remotes(&self) -> HashMap<String, RemoteOptions> {
        self.remotes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes every registered call and every remote.
    pub fn clear(&self) {
        let mut calls = self.calls.write().unwrap_or_else(PoisonError::into_inner);
        let mut remotes = self.remotes.write().unwrap_or_else(PoisonError::into_inner);
        calls.clear();
        remotes.clear();
    }
}

impl fmt::Debug for RemoteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteContext")
            .field("calls", &self.calls())
            .field("remotes", &self.remotes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{CallRequest, HandlerError, HandlerResult};
    use http::Request;
    use hyper::body::Bytes;
    use serde_json::{json, Value};

    fn call_request() -> CallRequest {
        let (parts, ()) = Request::post("/").body(()).unwrap().into_parts();
        CallRequest::new("factory", parts, Bytes::new())
    }

    fn constant(value: Value) -> impl Handler {
        move |_params: Value, _request: CallRequest| {
            let value = value.clone();
            async move { Ok::<_, HandlerError>(value) }
        }
    }

    #[test]
    fn test_register_adds_call() {
        let context = RemoteContext::new();
        assert!(context.calls().is_empty());

        context.register("factory", constant(json!(1)));

        assert_eq!(context.calls(), vec!["factory".to_string()]);
        assert!(context.handler("factory").is_some());
        assert!(context.handler("other").is_none());
    }

    #[tokio::test]
    async fn test_register_same_name_replaces_handler() {
        let context = RemoteContext::new();
        context.register("factory", constant(json!("first")));
        context.register("factory", constant(json!("second")));

        assert_eq!(context.calls().len(), 1);

        let handler = context.handler("factory").unwrap();
        let result = handler.call(json!({}), call_request()).await;
        assert!(matches!(result, Ok(HandlerResult::Value(v)) if v == json!("second")));
    }

    #[test]
    fn test_calls_are_sorted() {
        let context = RemoteContext::new();
        context.register("seed", constant(json!(null)));
        context.register("factory", constant(json!(null)));
        context.register("reset", constant(json!(null)));

        assert_eq!(context.calls(), vec!["factory", "reset", "seed"]);
    }

    #[test]
    fn test_add_remote() {
        let context = RemoteContext::new();
        context
            .add("users", RemoteOptions::with_url("http://users.example.org"))
            .unwrap();

        assert_eq!(context.remotes().len(), 1);
        assert_eq!(
            context.remote("users"),
            Some(RemoteOptions::with_url("http://users.example.org"))
        );
    }

    #[test]
    fn test_add_remote_overwrites() {
        let context = RemoteContext::new();
        context
            .add("users", RemoteOptions::with_url("http://old.example.org"))
            .unwrap();
        context
            .add("users", RemoteOptions::with_url("http://new.example.org"))
            .unwrap();

        assert_eq!(context.remotes().len(), 1);
        assert_eq!(
            context.remote("users").unwrap().url.as_deref(),
            Some("http://new.example.org")
        );
    }

    #[test]
    fn test_add_without_url_fails_without_mutation() {
        let context = RemoteContext::new();

        let err = context.add("users", RemoteOptions::default()).unwrap_err();
        assert!(matches!(err, RemcallError::InvalidArgument(_)));

        let err = context
            .add("users", RemoteOptions::with_url("  "))
            .unwrap_err();
        assert!(matches!(err, RemcallError::InvalidArgument(_)));

        assert!(context.remotes().is_empty());
    }

    #[test]
    fn test_clear_empties_calls_and_remotes() {
        let context = RemoteContext::new();
        context.register("factory", constant(json!(null)));
        context
            .add("users", RemoteOptions::with_url("http://users.example.org"))
            .unwrap();

        context.clear();

        assert!(context.calls().is_empty());
        assert!(context.remotes().is_empty());
        assert!(context.handler("factory").is_none());
    }
}
