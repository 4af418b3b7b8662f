//! HTTP Transport Utilities
//!
//! This module provides the HTTP-specific pieces of the remote-call protocol.
//!
//! # Components
//!
//! - **[`HttpTransport`]**: JSON body decoding and response construction
//! - **[`RemoteBody`]**: Boxed body type used by every dispatcher response, so a
//!   handler's raw response, a JSON response, and the wrapped application's
//!   response all share one type
//!
//! # Example
//!
//! ```
//! use remcall_common::transport::http::HttpTransport;
//! use hyper::StatusCode;
//! use serde_json::json;
//!
//! let response = HttpTransport::json_response(StatusCode::OK, &json!({"id": 1}));
//! assert_eq!(response.status(), StatusCode::OK);
//! assert!(HttpTransport::is_json(response.headers()));
//! ```

use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde_json::{Map, Value};

use crate::protocol::JSON_CONTENT_TYPE;

/// Error type carried by [`RemoteBody`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body type of every response produced by the dispatcher
pub type RemoteBody = BoxBody<Bytes, BoxError>;

/// Response type produced by the dispatcher and by raw handler results
pub type RemoteResponse = Response<RemoteBody>;

/// HTTP transport utility functions
pub struct HttpTransport;

impl HttpTransport {
    /// Wraps complete bytes as a [`RemoteBody`].
    pub fn full(bytes: impl Into<Bytes>) -> RemoteBody {
        Full::new(bytes.into())
            .map_err(|never| match never {})
            .boxed()
    }

    /// Decodes a JSON body. An empty (or whitespace-only) body decodes to an
    /// empty object.
    ///
    /// Object keys are always strings; nesting is preserved as sent.
    ///
    /// # Example
    ///
    /// ```
    /// use remcall_common::transport::http::HttpTransport;
    /// use serde_json::json;
    ///
    /// assert_eq!(HttpTransport::decode_json(b"").unwrap(), json!({}));
    /// assert_eq!(HttpTransport::decode_json(br#"{"a":[1]}"#).unwrap(), json!({"a": [1]}));
    /// ```
    pub fn decode_json(body: &[u8]) -> serde_json::Result<Value> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Object(Map::new()));
        }

        serde_json::from_slice(body)
    }

    /// Creates a response with a JSON body and `Content-Type: application/json`.
    pub fn json_response(status: StatusCode, value: &Value) -> RemoteResponse {
        let mut response = Response::new(Self::full(value.to_string()));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        response
    }

    /// Creates a plain-text response.
    pub fn text_response(status: StatusCode, text: impl Into<String>) -> RemoteResponse {
        let mut response = Response::new(Self::full(text.into()));
        *response.status_mut() = status;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }

    /// Returns true when the `Content-Type` media type is `application/json`.
    ///
    /// Parameters such as `charset` are ignored and the comparison is
    /// case-insensitive.
    pub fn is_json(headers: &HeaderMap) -> bool {
        headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|media_type| media_type.trim().eq_ignore_ascii_case(JSON_CONTENT_TYPE))
            .unwrap_or(false)
    }
}
