//! remcall Server
//!
//! This crate provides the server-side half of remcall: a [`Dispatcher`] that
//! intercepts requests carrying the remote-call marker header and runs the
//! handler registered for them, and an [`HttpServer`] that serves it.

pub mod dispatcher;
pub mod http_server;

pub use dispatcher::{call_name, dispatch, Dispatcher, NotFound};
pub use http_server::HttpServer;
