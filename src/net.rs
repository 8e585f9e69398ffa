//! Transport seam: request/response values and the [`Transport`] trait.
//!
//! The policy layer never opens sockets itself. Every network call goes
//! through a [`Transport`]; [`ReqwestTransport`] is the production
//! implementation and tests substitute a scripted one.

mod fetch;
mod request;
mod response;
mod transport;

use http::header::HeaderName;
use http::{HeaderMap, HeaderValue};

pub use fetch::ReqwestTransport;
pub use request::Request;
pub use response::{Response, StreamingResponse};
pub use transport::{ByteStream, Transport, TransportFuture};

/// Inserts a header from a string value, logging and skipping values that are
/// not valid header text.
pub(crate) fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(e) => log::warn!("dropping invalid {name} header value: {e}"),
    }
}
