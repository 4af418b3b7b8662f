//! HTTP Dispatch Integration Tests
//!
//! These tests run a real [`HttpServer`] on a loopback port and talk to it
//! with `reqwest`, checking the wire format of every response shape:
//! - Pass-through to the wrapped application
//! - JSON-wrapped handler values
//! - 404 for unknown calls
//! - 500 error payloads
//! - Raw handler responses

use std::convert::Infallible;
use std::future::{ready, Ready};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::header::{HeaderMap, CONTENT_TYPE};
use hyper::service::Service;
use hyper::{Request, StatusCode};
use remcall_common::transport::{HttpTransport, RemoteResponse};
use remcall_common::{CallRequest, HandlerError, HandlerResult, RemoteContext};
use remcall_server::{Dispatcher, HttpServer};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const CALL_HEADER: &str = "X-Rack-Remote-Call";

#[derive(Clone)]
struct InnerApp {
    hits: Arc<AtomicUsize>,
}

impl Service<Request<Incoming>> for InnerApp {
    type Response = RemoteResponse;
    type Error = Infallible;
    type Future = Ready<Result<RemoteResponse, Infallible>>;

    fn call(&self, _req: Request<Incoming>) -> Self::Future {
        self.hits.fetch_add(1, Ordering::SeqCst);
        ready(Ok(HttpTransport::text_response(StatusCode::OK, "All good!")))
    }
}

/// Test server that runs on a separate task until dropped
struct TestServer {
    url: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    async fn start(context: Arc<RemoteContext>, hits: Arc<AtomicUsize>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server = HttpServer::new(Dispatcher::new(context, InnerApp { hits }));
        tokio::spawn(server.serve(listener, async {
            let _ = shutdown_rx.await;
        }));

        Self {
            url,
            shutdown_tx: Some(shutdown_tx),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn setup() -> (Arc<RemoteContext>, Arc<AtomicUsize>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    (Arc::new(RemoteContext::new()), Arc::new(AtomicUsize::new(0)))
}

// ============================================================================
// Routing Tests
// ============================================================================

#[tokio::test]
async fn test_ordinary_request_reaches_inner_app() {
    let (context, hits) = setup();
    let invoked = Arc::new(AtomicUsize::new(0));
    let counter = invoked.clone();
    context.register("factory", move |_params: Value, _request: CallRequest| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, HandlerError>(json!({"id": 1})) }
    });
    let server = TestServer::start(context, hits.clone()).await;

    let res = reqwest::Client::new()
        .post(&server.url)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "All good!");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_remote_call_returns_json() {
    let (context, hits) = setup();
    context.register("factory", |params: Value, _request: CallRequest| async move {
        Ok::<_, HandlerError>(json!({"id": 1, "received": params}))
    });
    let server = TestServer::start(context, hits.clone()).await;

    let res = reqwest::Client::new()
        .post(format!("{}/any/path", server.url))
        .header(CALL_HEADER, "factory")
        .json(&json!({"param1": ["val1", {"abc": "cde"}]}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::OK);
    assert_eq!(
        res.headers().get(CONTENT_TYPE.as_str()).unwrap(),
        "application/json"
    );
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({"id": 1, "received": {"param1": ["val1", {"abc": "cde"}]}})
    );
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_remote_call_without_body() {
    let (context, hits) = setup();
    context.register("echo", |params: Value, _request: CallRequest| async move {
        Ok::<_, HandlerError>(params)
    });
    let server = TestServer::start(context, hits).await;

    let res = reqwest::Client::new()
        .post(&server.url)
        .header(CALL_HEADER, "echo")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({}));
}

// ============================================================================
// Error Response Tests
// ============================================================================

#[tokio::test]
async fn test_unknown_call_is_404_with_list() {
    let (context, hits) = setup();
    context.register("factory", |_params: Value, _request: CallRequest| async {
        Ok::<_, HandlerError>(())
    });
    context.register("cleanup", |_params: Value, _request: CallRequest| async {
        Ok::<_, HandlerError>(())
    });
    let server = TestServer::start(context, hits.clone()).await;

    let res = reqwest::Client::new()
        .post(&server.url)
        .header(CALL_HEADER, "nonexistent")
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "remote call not defined");
    assert_eq!(body["calls"], "nonexistent");
    assert_eq!(body["list"], json!(["cleanup", "factory"]));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_handler_error_is_500_payload() {
    let (context, hits) = setup();
    context.register("explode", |_params: Value, _request: CallRequest| async {
        Err::<Value, _>(HandlerError::new("ArgumentError", "wrong number of arguments"))
    });
    let server = TestServer::start(context, hits).await;

    let res = reqwest::Client::new()
        .post(&server.url)
        .header(CALL_HEADER, "explode")
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        res.headers().get(CONTENT_TYPE.as_str()).unwrap(),
        "application/json"
    );
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "wrong number of arguments");
    assert_eq!(body["class"], "ArgumentError");
    assert!(body["backtrace"].is_array());
}

#[tokio::test]
async fn test_server_survives_handler_panic() {
    let (context, hits) = setup();
    context.register("panics", |_params: Value, _request: CallRequest| async {
        if true {
            panic!("boom");
        }
        Ok::<_, HandlerError>(())
    });
    context.register("ping", |_params: Value, _request: CallRequest| async {
        Ok::<_, HandlerError>(json!("pong"))
    });
    let server = TestServer::start(context, hits).await;
    let client = reqwest::Client::new();

    let res = client
        .post(&server.url)
        .header(CALL_HEADER, "panics")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

    let res = client
        .post(&server.url)
        .header(CALL_HEADER, "ping")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!("pong"));
}

// ============================================================================
// Raw Response Tests
// ============================================================================

#[tokio::test]
async fn test_raw_response_is_sent_verbatim() {
    let (context, hits) = setup();
    context.register("teapot", |_params: Value, _request: CallRequest| async {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "text/plain".parse().unwrap());
        headers.insert("x-brewed", "no".parse().unwrap());
        Ok::<_, HandlerError>(HandlerResult::raw(
            StatusCode::IM_A_TEAPOT,
            headers,
            "short and stout",
        ))
    });
    let server = TestServer::start(context, hits).await;

    let res = reqwest::Client::new()
        .post(&server.url)
        .header(CALL_HEADER, "teapot")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 418);
    assert_eq!(res.headers().get("x-brewed").unwrap(), "no");
    assert_eq!(res.headers().get("content-type").unwrap(), "text/plain");
    assert_eq!(res.text().await.unwrap(), "short and stout");
}
