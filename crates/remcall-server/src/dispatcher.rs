//! Remote Call Dispatcher
//!
//! [`Dispatcher`] is a hyper [`Service`] that wraps the host application's
//! own service. Requests without the [`CALL_HEADER`] go straight to the
//! wrapped service; requests with it are answered here:
//!
//! - **Unknown call**: `404` with [`NotFoundPayload`]
//! - **Handler value**: `200` with the value as JSON
//! - **Handler raw response**: the response, unchanged
//! - **Handler error or panic**: `500` with [`ErrorPayload`]
//!
//! A handler failure never reaches the wrapped service or the connection;
//! it always becomes a 500 response.
//!
//! # Example
//!
//! ```no_run
//! use remcall_common::{CallRequest, HandlerError, RemoteContext};
//! use remcall_server::{Dispatcher, NotFound};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! let context = Arc::new(RemoteContext::new());
//! context.register("ping", |_params: Value, _request: CallRequest| async {
//!     Ok::<_, HandlerError>(json!("pong"))
//! });
//! let dispatcher = Dispatcher::new(context, NotFound);
//! ```
//!
//! [`ErrorPayload`]: remcall_common::ErrorPayload

use std::convert::Infallible;
use std::future::{ready, Ready};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::FutureExt;
use http::HeaderMap;
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};
use hyper::service::Service;
use hyper::{Request, StatusCode};

use remcall_common::handler::{BoxFuture, CallRequest, HandlerResult};
use remcall_common::protocol::{NotFoundPayload, RemoteError, CALL_HEADER};
use remcall_common::transport::{BoxError, HttpTransport, RemoteResponse};
use remcall_common::RemoteContext;

/// Class reported when the request body could not be read.
const BODY_READ_CLASS: &str = "RequestBodyError";

/// Request interceptor for remote calls.
#[derive(Clone)]
pub struct Dispatcher<N> {
    context: Arc<RemoteContext>,
    next: N,
}

impl<N> Dispatcher<N> {
    /// Creates a dispatcher in front of `next`.
    ///
    /// # Arguments
    ///
    /// * `context` - Registry the call names are looked up in
    /// * `next` - Service that handles every request without the marker header
    pub fn new(context: Arc<RemoteContext>, next: N) -> Self {
        Self { context, next }
    }

    pub fn context(&self) -> &Arc<RemoteContext> {
        &self.context
    }
}

impl<B, N> Service<Request<B>> for Dispatcher<N>
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
    N: Service<Request<B>, Response = RemoteResponse>,
    N::Future: Send + 'static,
    N::Error: 'static,
{
    type Response = RemoteResponse;
    type Error = N::Error;
    type Future = BoxFuture<'static, Result<RemoteResponse, N::Error>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let Some(name) = call_name(req.headers()) else {
            return Box::pin(self.next.call(req));
        };

        let context = self.context.clone();
        Box::pin(async move { Ok::<_, N::Error>(dispatch(&context, name, req).await) })
    }
}

/// Extracts the call name from the marker header, if present.
pub fn call_name(headers: &HeaderMap) -> Option<String> {
    headers
        .get(&CALL_HEADER)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

/// Runs the remote call `name` for `req` and builds its response.
///
/// This is the marker-present half of [`Dispatcher`], usable on its own by
/// hosts that detect the marker themselves.
pub async fn dispatch<B>(context: &RemoteContext, name: String, req: Request<B>) -> RemoteResponse
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let Some(handler) = context.handler(&name) else {
        tracing::warn!(call = %name, "remote call not defined");
        let payload = NotFoundPayload::new(name, context.calls());
        return HttpTransport::json_response(StatusCode::NOT_FOUND, &payload.to_json());
    };

    let (parts, body) = req.into_parts();
    let body = match read_body(body).await {
        Ok(body) => body,
        Err(e) => {
            return failure_response(
                &name,
                RemoteError::capture(BODY_READ_CLASS, e.to_string()),
            );
        }
    };

    let params = match HttpTransport::decode_json(&body) {
        Ok(params) => params,
        Err(e) => return failure_response(&name, RemoteError::from_error(&e)),
    };

    tracing::debug!(call = %name, "dispatching remote call");
    let request = CallRequest::new(name.clone(), parts, body);

    let future = match panic::catch_unwind(AssertUnwindSafe(|| handler.call(params, request))) {
        Ok(future) => future,
        Err(payload) => return failure_response(&name, RemoteError::from_panic(payload)),
    };

    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(HandlerResult::Raw(response))) => response,
        Ok(Ok(HandlerResult::Value(value))) => {
            HttpTransport::json_response(StatusCode::OK, &value)
        }
        Ok(Err(err)) => failure_response(&name, err.into_remote()),
        Err(payload) => failure_response(&name, RemoteError::from_panic(payload)),
    }
}

async fn read_body<B>(body: B) -> Result<Bytes, BoxError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    body.collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(Into::into)
}

fn failure_response(name: &str, error: RemoteError) -> RemoteResponse {
    tracing::warn!(
        call = %name,
        class = %error.class(),
        "remote call failed: {}",
        error.message()
    );
    HttpTransport::json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &error.to_payload().to_json(),
    )
}

/// Fallback service answering every request with `404 Not Found`.
///
/// Use it as the wrapped service when the process serves nothing but remote
/// calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

impl<B> Service<Request<B>> for NotFound {
    type Response = RemoteResponse;
    type Error = Infallible;
    type Future = Ready<Result<RemoteResponse, Infallible>>;

    fn call(&self, _req: Request<B>) -> Self::Future {
        ready(Ok(HttpTransport::text_response(
            StatusCode::NOT_FOUND,
            "Not Found",
        )))
    }
}
