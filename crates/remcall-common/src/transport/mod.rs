//! remcall Transport Layer
//!
//! HTTP helpers shared by the dispatcher and the client: body and response
//! type aliases, JSON response builders, and content-type checks.
//!
//! Connection handling itself lives with each role (`remcall-server` serves
//! over hyper's HTTP/1 server connection, `remcall-client` opens one HTTP/1
//! client connection per call).

pub mod http;

pub use self::http::{BoxError, HttpTransport, RemoteBody, RemoteResponse};
