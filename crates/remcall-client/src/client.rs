use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, HOST};
use http::{HeaderMap, Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use remcall_common::protocol::error::{RemcallError, Result};
use remcall_common::protocol::{
    ChainedError, ErrorPayload, RemoteError, CALL_HEADER, JSON_CONTENT_TYPE, REMOTE_CALL_FAILED,
};
use remcall_common::transport::HttpTransport;
use remcall_common::RemoteContext;

/// Client configuration.
///
/// # Default Configuration
///
/// - `timeout`: `None` (wait for the response as long as it takes)
/// - `default_headers`: none
///
/// # Example
///
/// ```rust
/// use remcall_client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(30))
///     .with_header("X-Test-Suite", "checkout");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Upper bound on a whole call (connect, send, receive)
    pub timeout: Option<Duration>,
    /// Headers sent with every call
    pub default_headers: Vec<(String, String)>,
}

impl ClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }
}

/// Where a remote call goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remote {
    /// A remote added to the [`RemoteContext`] directory.
    Named(String),
    /// A literal base URL.
    Url(String),
}

impl Remote {
    pub fn named(name: impl Into<String>) -> Self {
        Remote::Named(name.into())
    }
}

impl From<&str> for Remote {
    fn from(url: &str) -> Self {
        Remote::Url(url.to_string())
    }
}

impl From<String> for Remote {
    fn from(url: String) -> Self {
        Remote::Url(url)
    }
}

impl fmt::Display for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Remote::Named(name) => write!(f, ":{}", name),
            Remote::Url(url) => f.write_str(url),
        }
    }
}

/// Successful result of a remote call.
///
/// JSON responses are decoded; anything else is returned as text.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Json(Value),
    Text(String),
}

impl Reply {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Reply::Json(value) => Some(value),
            Reply::Text(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Reply::Json(value) => Some(value),
            Reply::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Json(_) => None,
            Reply::Text(text) => Some(text),
        }
    }

    /// Deserializes the reply. A text reply deserializes as a JSON string.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T> {
        let value = match self {
            Reply::Json(value) => value,
            Reply::Text(text) => Value::String(text),
        };
        Ok(serde_json::from_value(value)?)
    }
}

/// remcall client for invoking remote calls
///
/// Opens a fresh HTTP/1 connection for each call and closes it when the call
/// returns, on success and on every error path.
#[derive(Clone)]
pub struct RemoteClient {
    context: Arc<RemoteContext>,
    config: ClientConfig,
}

impl RemoteClient {
    /// Create a client resolving named remotes through `context`
    pub fn new(context: Arc<RemoteContext>) -> Self {
        Self::with_config(context, ClientConfig::default())
    }

    pub fn with_config(context: Arc<RemoteContext>, config: ClientConfig) -> Self {
        Self { context, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Invoke remote call `call` on `remote` with `params`.
    ///
    /// # Errors
    ///
    /// - [`RemcallError::RemoteCallFailed`] when the handler failed; the remote
    ///   class, message and backtrace are available via
    ///   [`RemcallError::remote_cause`]
    /// - [`RemcallError::ErrorResponse`] for any other non-200 response
    /// - [`RemcallError::RemoteNotFound`] for an unknown named remote
    /// - [`RemcallError::Timeout`] when the configured timeout expires
    pub async fn invoke<P>(
        &self,
        remote: impl Into<Remote>,
        call: &str,
        params: &P,
    ) -> Result<Reply>
    where
        P: Serialize + ?Sized,
    {
        self.invoke_with_headers(remote, call, params, &[]).await
    }

    /// Like [`invoke`](Self::invoke), sending extra request headers.
    pub async fn invoke_with_headers<P>(
        &self,
        remote: impl Into<Remote>,
        call: &str,
        params: &P,
        headers: &[(&str, &str)],
    ) -> Result<Reply>
    where
        P: Serialize + ?Sized,
    {
        let remote = remote.into();
        let (url, remote_headers) = self.resolve(&remote)?;
        let target = Target::parse(&url)?;
        let body = serde_json::to_vec(params)?;

        let mut extra: Vec<(&str, &str)> = remote_headers
            .iter()
            .chain(self.config.default_headers.iter())
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        extra.extend_from_slice(headers);

        let request = build_request(&target, call, &extra, body)?;

        tracing::debug!(call, remote = %remote, url = %url, "invoking remote call");

        let (status, headers, body) = match self.config.timeout {
            Some(timeout) => tokio::time::timeout(timeout, send(request))
                .await
                .map_err(|_| RemcallError::Timeout(timeout.as_millis() as u64))??,
            None => send(request).await?,
        };

        tracing::debug!(call, status = status.as_u16(), "remote call answered");
        interpret(status, &headers, &body)
    }

    /// Resolves `remote` to a URL and the headers configured for it.
    fn resolve(&self, remote: &Remote) -> Result<(String, Vec<(String, String)>)> {
        match remote {
            Remote::Url(url) => Ok((url.clone(), Vec::new())),
            Remote::Named(name) => {
                let options = self
                    .context
                    .remote(name)
                    .ok_or_else(|| RemcallError::RemoteNotFound(name.clone()))?;
                let url = options
                    .url
                    .ok_or_else(|| RemcallError::RemoteNotFound(name.clone()))?;
                Ok((url, options.headers))
            }
        }
    }
}

/// Interprets a remote call response.
///
/// A `500` is a remote failure only if it is JSON and carries all three
/// [`ErrorPayload`] fields; otherwise it is an ordinary error response.
pub fn interpret(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Result<Reply> {
    let is_json = HttpTransport::is_json(headers);

    if status == StatusCode::INTERNAL_SERVER_ERROR && is_json {
        if let Ok(payload) = serde_json::from_slice::<ErrorPayload>(body) {
            let cause = RemoteError::from_payload(payload);
            return Err(ChainedError::with_cause(REMOTE_CALL_FAILED, cause).into());
        }
    }

    if status != StatusCode::OK {
        return Err(RemcallError::ErrorResponse {
            status: status.as_u16(),
            body: String::from_utf8_lossy(body).into_owned(),
        });
    }

    if is_json {
        Ok(Reply::Json(HttpTransport::decode_json(body)?))
    } else {
        Ok(Reply::Text(String::from_utf8_lossy(body).into_owned()))
    }
}

/// Authority and request path parsed from a remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    /// `Host` header value
    authority: String,
    path: String,
}

impl Target {
    fn parse(url: &str) -> Result<Self> {
        let invalid = |reason: &str| RemcallError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let uri: Uri = url
            .parse()
            .map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;

        match uri.scheme_str() {
            Some(scheme) if scheme.eq_ignore_ascii_case("http") => {}
            Some(scheme) => return Err(invalid(&format!("unsupported scheme '{}'", scheme))),
            None => return Err(invalid("missing scheme")),
        }

        let host = uri.host().ok_or_else(|| invalid("missing host"))?;
        let authority = match uri.port_u16() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let path = match uri.path() {
            "" => "/".to_string(),
            path => path.to_string(),
        };

        Ok(Self { authority, path })
    }

    /// Absolute request URI, without the query string.
    fn uri(&self) -> String {
        format!("http://{}{}", self.authority, self.path)
    }
}

fn build_request(
    target: &Target,
    call: &str,
    headers: &[(&str, &str)],
    body: Vec<u8>,
) -> Result<Request<Full<Bytes>>> {
    let mut request = Request::new(Full::new(Bytes::from(body)));
    *request.method_mut() = Method::POST;
    *request.uri_mut() = target.uri().parse()?;

    let map = request.headers_mut();
    map.insert(HOST, HeaderValue::from_str(&target.authority)?);
    for (name, value) in headers {
        map.insert(HeaderName::try_from(*name)?, HeaderValue::try_from(*value)?);
    }
    map.insert(CALL_HEADER, HeaderValue::from_str(call)?);
    map.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

    Ok(request)
}

/// Performs one request/response exchange on a fresh connection.
async fn send(request: Request<Full<Bytes>>) -> Result<(StatusCode, HeaderMap, Bytes)> {
    // Nothing is pooled, so the connection closes once the exchange is done
    let client = Client::builder(TokioExecutor::new())
        .pool_max_idle_per_host(0)
        .build_http();

    let authority = request
        .uri()
        .authority()
        .map(|a| a.to_string())
        .unwrap_or_default();

    let response = client.request(request).await.map_err(|e| {
        let detail = std::error::Error::source(&e)
            .map(|source| source.to_string())
            .unwrap_or_else(|| e.to_string());
        if e.is_connect() {
            RemcallError::Connection(format!("Failed to connect to {}: {}", authority, detail))
        } else {
            RemcallError::Transport(format!("HTTP request failed: {}", detail))
        }
    })?;

    let (parts, body) = response.into_parts();
    let body = body.collect().await?.to_bytes();

    Ok((parts.status, parts.headers, body))
}
