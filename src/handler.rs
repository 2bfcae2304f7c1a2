//! The one request handler this service has.
//!
//! Every POST, whatever its path, is the same operation: pull `html` out of
//! the form body, render it, return the PNG. The pipeline is strictly
//! linear — receive, parse, render, respond — and failures become statuses
//! at this boundary and nowhere else.

use std::convert::Infallible;
use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::{Method, StatusCode};
use http_body_util::BodyExt;
use tracing::{debug, error, warn};

use crate::error::Error;
use crate::form;
use crate::render::Renderer;
use crate::response;

/// Entry point for every request on every connection.
///
/// The error type is [`Infallible`] — all failures are turned into responses
/// here, so hyper never sees an error.
pub(crate) async fn handle(
    renderer: Arc<Renderer>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<response::Response, Infallible> {
    if req.method() != Method::POST {
        warn!(method = %req.method(), "method not allowed");
        return Ok(response::text(
            StatusCode::METHOD_NOT_ALLOWED,
            "this service only accepts POST",
        ));
    }

    let response = match render_from_form(&renderer, req).await {
        Ok(image) => response::png(image),
        Err(err) => {
            let status = err.status();
            if status.is_server_error() {
                error!(%status, "render request failed: {err}");
            } else {
                warn!(%status, "render request rejected: {err}");
            }
            response::text(status, &err.to_string())
        }
    };

    Ok(response)
}

/// Collect the body, extract `html`, hand it to the renderer.
async fn render_from_form(
    renderer: &Renderer,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<Vec<u8>, Error> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let body = req.into_body().collect().await?.to_bytes();
    let html = form::html_field(content_type.as_deref(), &body)?;
    debug!(html_bytes = html.len(), "rendering");

    renderer.render(&html).await
}
