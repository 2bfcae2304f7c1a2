//! Outgoing HTTP response construction.
//!
//! Two shapes leave this service: a PNG (the product) and a short plain-text
//! line (everything that went wrong). Both carry an explicit Content-Length
//! equal to the body length — that is part of the wire contract, not an
//! optimization.

use bytes::Bytes;
use http::StatusCode;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};
use http_body_util::Full;

/// The concrete response type this service produces. Every body is a single
/// fully-buffered frame; hyper streams it out.
pub(crate) type Response = http::Response<Full<Bytes>>;

/// `200 OK` with the rendered image.
pub(crate) fn png(image: Vec<u8>) -> Response {
    with_body(StatusCode::OK, "image/png", Bytes::from(image))
}

/// Plain-text response for any non-image outcome.
pub(crate) fn text(status: StatusCode, message: &str) -> Response {
    let mut body = String::with_capacity(message.len() + 1);
    body.push_str(message);
    body.push('\n');
    with_body(status, "text/plain; charset=utf-8", Bytes::from(body))
}

/// Status + content-type + explicit content-length around a buffered body.
/// Every part is valid by construction, so no fallible builder is involved.
fn with_body(status: StatusCode, content_type: &'static str, body: Bytes) -> Response {
    let length = body.len();
    let mut response = http::Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
        .headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(length));
    response
}
