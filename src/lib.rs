//! Resilience and protocol policies for an HTTP client: retry with backoff,
//! response caching with revalidation, cookie handling, and reconnecting
//! Server-Sent Events streams, composed by [`HttpClient`] over a pluggable
//! [`Transport`].

pub mod backoff;
pub mod cache;
pub mod client;
pub mod config;
pub mod cookies;
pub mod errors;
pub mod net;
pub mod retry;
pub mod sse;

mod clock;

pub use client::HttpClient;
pub use config::{ClientConfig, ConfigError};
pub use errors::{NetError, TransportError, TransportErrorKind};
pub use net::{Request, Response, Transport};
