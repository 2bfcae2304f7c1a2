//! Unified error type.

use std::fmt;
use std::path::PathBuf;

use http::StatusCode;

/// The error type returned by rasterd's fallible operations.
///
/// Request-scoped failures (a missing form field, a renderer that exits
/// nonzero) never escape the handler: each maps onto an HTTP status and the
/// handler answers with that. Only infrastructure failures — binding the
/// port, accepting a connection — propagate out of
/// [`Server::serve`](crate::Server::serve).
#[derive(Debug)]
pub enum Error {
    /// Socket-level failure: bind, accept, local address lookup.
    Io(std::io::Error),
    /// The request body could not be read off the connection.
    Body(hyper::Error),
    /// The form body carried no `html` field.
    MissingHtmlField,
    /// The `html` field is not valid UTF-8.
    FieldNotUtf8(std::str::Utf8Error),
    /// The multipart body does not have the shape form-data clients emit.
    BadMultipart(&'static str),
    /// The renderer binary could not be started.
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },
    /// The renderer ran and failed.
    Render {
        code: Option<i32>,
        stderr: String,
    },
    /// The renderer exited cleanly but wrote no image bytes.
    EmptyOutput,
}

impl Error {
    /// The HTTP status a request-scoped error maps to.
    ///
    /// Client faults are 400s, renderer faults are 502s — the renderer is an
    /// external collaborator, so its failures are upstream failures. `Io`
    /// never reaches a response in practice; 500 covers it if it ever does.
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            Self::Body(_)
            | Self::MissingHtmlField
            | Self::FieldNotUtf8(_)
            | Self::BadMultipart(_) => StatusCode::BAD_REQUEST,
            Self::Spawn { .. } | Self::Render { .. } | Self::EmptyOutput => {
                StatusCode::BAD_GATEWAY
            }
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e)            => write!(f, "io: {e}"),
            Self::Body(e)          => write!(f, "request body: {e}"),
            Self::MissingHtmlField => write!(f, "form field `html` is missing"),
            Self::FieldNotUtf8(e)  => write!(f, "form field `html` is not valid UTF-8: {e}"),
            Self::BadMultipart(what) => write!(f, "malformed multipart body: {what}"),
            Self::Spawn { program, source } => {
                write!(f, "failed to start renderer `{}`: {source}", program.display())
            }
            Self::Render { code: Some(code), stderr } => {
                write!(f, "renderer exited with status {code}: {}", stderr.trim())
            }
            Self::Render { code: None, stderr } => {
                write!(f, "renderer was killed by a signal: {}", stderr.trim())
            }
            Self::EmptyOutput => write!(f, "renderer produced no output"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e)               => Some(e),
            Self::Body(e)             => Some(e),
            Self::FieldNotUtf8(e)     => Some(e),
            Self::Spawn { source, .. } => Some(source),
            _                         => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<hyper::Error> for Error {
    fn from(e: hyper::Error) -> Self {
        Self::Body(e)
    }
}
