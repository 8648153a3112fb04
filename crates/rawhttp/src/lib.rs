//! Minimal HTTP/1.x client over raw TCP sockets.
//!
//! Only `GET` is supported, optionally with a single `Range` header. Requests
//! carry no other headers. Responses are framed by `Content-Length` or, when
//! it is absent, by the server closing the connection. Chunked encoding,
//! redirects, caching and TLS are out of scope.

mod client;
pub mod config;
pub mod error;
pub mod origin;
mod persistent;
pub mod request;
mod transient;
pub mod wire;

pub use client::HttpClient;
pub use config::{HttpClientConfig, HttpVersion};
pub use error::HttpError;
pub use origin::Origin;
pub use persistent::PersistentClient;
pub use request::ByteRange;
pub use transient::TransientClient;
