//! HTTP Server for remote calls
//!
//! This module serves a [`Dispatcher`] over HTTP/1.1 using hyper. Processes
//! that already run their own hyper server can skip it and hand the
//! dispatcher to their own connection loop instead.
//!
//! # Architecture
//!
//! The server:
//! - Listens on a TCP socket for incoming HTTP connections
//! - Spawns a tokio task for each connection
//! - Serves every request on the connection through the dispatcher
//!
//! # Example
//!
//! ```no_run
//! use remcall_common::RemoteContext;
//! use remcall_server::HttpServer;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let context = Arc::new(RemoteContext::new());
//!     let server = HttpServer::standalone(context);
//!     server.run("127.0.0.1:8080".parse().unwrap()).await.unwrap();
//! }
//! ```

use std::future::{pending, Future};
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper::Request;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use remcall_common::protocol::error::{RemcallError, Result};
use remcall_common::transport::{BoxError, RemoteResponse};
use remcall_common::RemoteContext;

use crate::dispatcher::{Dispatcher, NotFound};

/// HTTP server for a remote-call dispatcher.
pub struct HttpServer<N> {
    dispatcher: Dispatcher<N>,
}

impl HttpServer<NotFound> {
    /// Creates a server that answers remote calls and nothing else.
    pub fn standalone(context: Arc<RemoteContext>) -> Self {
        Self::new(Dispatcher::new(context, NotFound))
    }
}

impl<N> HttpServer<N>
where
    N: Service<Request<Incoming>, Response = RemoteResponse> + Clone + Send + 'static,
    N::Future: Send + 'static,
    N::Error: Into<BoxError> + 'static,
{
    pub fn new(dispatcher: Dispatcher<N>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher<N> {
        &self.dispatcher
    }

    /// Binds to `addr` and serves until the process exits.
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RemcallError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;

        self.serve(listener, pending()).await
    }

    /// Serves connections from `listener` until `shutdown` resolves.
    ///
    /// Connections already accepted keep running on their own tasks after
    /// shutdown.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr().map_err(|e| {
            RemcallError::Transport(format!("Failed to get local address: {}", e))
        })?;
        tracing::info!("Remote call server listening on {}", local_addr);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = accepted.map_err(|e| {
                        RemcallError::Transport(format!("Failed to accept connection: {}", e))
                    })?;

                    let io = TokioIo::new(stream);
                    let dispatcher = self.dispatcher.clone();

                    tokio::task::spawn(async move {
                        if let Err(err) = http1::Builder::new()
                            .serve_connection(io, dispatcher)
                            .await
                        {
                            tracing::error!("Error serving connection from {}: {}", peer, err);
                        }
                    });
                }
                _ = &mut shutdown => {
                    tracing::info!("Remote call server shutting down");
                    return Ok(());
                }
            }
        }
    }
}
