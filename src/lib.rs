//! # rasterd
//!
//! An HTML-to-PNG render service. POST a form with an `html` field, get the
//! image back. Nothing more. Nothing less.
//!
//! ## The contract
//!
//! One endpoint, every path, POST only. The body is `multipart/form-data` or
//! `application/x-www-form-urlencoded` and carries a single `html` field.
//! The reply is `200 OK`, `Content-Type: image/png`, an explicit
//! `Content-Length`, and the image bytes — produced by `wkhtmltoimage`
//! running as a child process with a fixed `--quiet --format png`
//! configuration. The service keeps no state: identical requests get
//! equivalent responses, and concurrent requests never share a renderer
//! process.
//!
//! What goes wrong is always an HTTP status, never a broken process:
//!
//! - **400** — body unreadable, `html` missing or not UTF-8
//! - **405** — any method but POST
//! - **502** — the renderer failed to start, exited nonzero, or produced
//!   no image
//!
//! The status mapping is deliberate hardening: client faults are 4xx,
//! renderer faults are 502, and no failure ever takes the process down.
//!
//! Body-size limits, TLS, rate limiting, and auth are reverse-proxy work —
//! rasterd does not reimplement them. Renders get no timeout either: the
//! renderer is trusted to finish, however long it takes.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use rasterd::{Renderer, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rasterd::Error> {
//!     let server = Server::bind(rasterd::DEFAULT_ADDR).await?;
//!     server.serve(Renderer::new()).await
//! }
//! ```
//!
//! ```text
//! curl -s -d 'html=<h1>hello</h1>' http://localhost:7227/ > hello.png
//! ```

mod error;
mod form;
mod handler;
mod render;
mod response;
mod server;

pub use error::Error;
pub use render::{DEFAULT_PROGRAM, ImageFormat, RENDERER_ENV, RenderOptions, Renderer};
pub use server::{DEFAULT_ADDR, Server};
