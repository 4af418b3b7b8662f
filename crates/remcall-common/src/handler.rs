//! Remote Call Handlers
//!
//! A handler is what a remote call runs. It receives the parsed JSON
//! parameters and a [`CallRequest`] describing the HTTP request that carried
//! them, and resolves to a [`HandlerResult`] or a [`HandlerError`].
//!
//! Any `Fn(Value, CallRequest) -> impl Future` closure is a handler:
//!
//! ```
//! use remcall_common::{CallRequest, HandlerError, RemoteContext};
//! use serde_json::{json, Value};
//!
//! let context = RemoteContext::new();
//! context.register("create_user", |params: Value, _request: CallRequest| async move {
//!     let name = params["name"].as_str().unwrap_or("anonymous").to_string();
//!     Ok::<_, HandlerError>(json!({"id": 1, "name": name}))
//! });
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use http::request::Parts;
use http::{Extensions, HeaderMap, Method, Uri};
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::protocol::chain::RemoteError;
use crate::transport::http::{HttpTransport, RemoteResponse};

/// Boxed future returned by [`Handler::call`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for remote call handlers.
pub trait Handler: Send + Sync + 'static {
    fn call(
        &self,
        params: Value,
        request: CallRequest,
    ) -> BoxFuture<'static, Result<HandlerResult, HandlerError>>;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Value, CallRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    R: Into<HandlerResult>,
{
    fn call(
        &self,
        params: Value,
        request: CallRequest,
    ) -> BoxFuture<'static, Result<HandlerResult, HandlerError>> {
        let fut = (self)(params, request);
        Box::pin(async move { fut.await.map(Into::into) })
    }
}

/// The HTTP request a remote call arrived on.
///
/// Exposes the raw request context (method, URI, headers, and the
/// extensions the host pipeline attached) alongside the raw body bytes the
/// parameters were parsed from.
#[derive(Debug)]
pub struct CallRequest {
    name: String,
    parts: Parts,
    body: Bytes,
}

impl CallRequest {
    pub fn new(name: impl Into<String>, parts: Parts, body: Bytes) -> Self {
        Self {
            name: name.into(),
            parts,
            body,
        }
    }

    /// The call name from the marker header.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Per-request values attached by the host (peer address, state, ...).
    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_parts(self) -> (Parts, Bytes) {
        (self.parts, self.body)
    }
}

/// What a handler produced.
#[derive(Debug)]
pub enum HandlerResult {
    /// A complete response, sent back unchanged.
    Raw(RemoteResponse),
    /// A value, sent back as a `200` JSON response.
    Value(Value),
}

impl HandlerResult {
    /// Builds a raw response from its status, headers and body.
    pub fn raw(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        let mut response = Response::new(HttpTransport::full(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        HandlerResult::Raw(response)
    }

    /// Serializes any value into a [`HandlerResult::Value`].
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, HandlerError> {
        Ok(HandlerResult::Value(serde_json::to_value(value)?))
    }
}

impl From<Value> for HandlerResult {
    fn from(value: Value) -> Self {
        HandlerResult::Value(value)
    }
}

impl From<RemoteResponse> for HandlerResult {
    fn from(response: RemoteResponse) -> Self {
        HandlerResult::Raw(response)
    }
}

impl From<()> for HandlerResult {
    fn from(_: ()) -> Self {
        HandlerResult::Value(Value::Null)
    }
}

/// Failure returned by a handler.
///
/// Any [`std::error::Error`] converts into a `HandlerError` with `?`; its type
/// name becomes the class reported to the caller. Use [`HandlerError::new`]
/// to report a class of your own.
pub struct HandlerError(RemoteError);

impl HandlerError {
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self(RemoteError::capture(class, message))
    }

    pub fn as_remote(&self) -> &RemoteError {
        &self.0
    }

    pub fn into_remote(self) -> RemoteError {
        self.0
    }
}

impl<E> From<E> for HandlerError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self(RemoteError::from_error(&err))
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandlerError").field(&self.0).finish()
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
