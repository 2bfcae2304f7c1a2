//! External renderer invocation.
//!
//! rasterd does not rasterize HTML itself — `wkhtmltoimage` does, as one
//! child process per request: the HTML goes in on stdin, the PNG comes out
//! on stdout. A fresh process per request keeps renders fully isolated from
//! each other; concurrent requests never share renderer state.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::Error;

/// Environment variable naming the renderer binary, checked by
/// [`Renderer::new`] before falling back to [`DEFAULT_PROGRAM`].
pub const RENDERER_ENV: &str = "WKHTMLTOIMAGE_BIN";

/// The renderer binary resolved from `PATH` when nothing else is configured.
pub const DEFAULT_PROGRAM: &str = "wkhtmltoimage";

// ── Render options ────────────────────────────────────────────────────────────

/// Output image format. PNG is the only format this service produces.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ImageFormat {
    #[default]
    Png,
}

impl ImageFormat {
    /// The value passed to the renderer's `--format` flag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
        }
    }
}

/// Fixed renderer configuration.
///
/// The same options apply to every request; nothing here is ever derived
/// from client input.
#[derive(Clone, Debug)]
pub struct RenderOptions {
    pub format: ImageFormat,
    /// Suppress the renderer's progress chatter on stderr.
    pub quiet: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { format: ImageFormat::Png, quiet: true }
    }
}

impl RenderOptions {
    /// Command-line arguments for one invocation: the options, then `- -`
    /// (read the HTML from stdin, write the image to stdout).
    fn to_args(&self) -> Vec<&'static str> {
        let mut args = Vec::with_capacity(5);
        if self.quiet {
            args.push("--quiet");
        }
        args.push("--format");
        args.push(self.format.as_str());
        args.push("-");
        args.push("-");
        args
    }
}

// ── Renderer ──────────────────────────────────────────────────────────────────

/// Handle to the external rendering engine.
///
/// Holds configuration only — a program path and the fixed options. Every
/// call to [`render`](Renderer::render) spawns its own process, so one
/// handle can be shared across concurrent requests freely.
#[derive(Clone, Debug)]
pub struct Renderer {
    program: PathBuf,
    options: RenderOptions,
}

impl Renderer {
    /// Renderer binary from `WKHTMLTOIMAGE_BIN`, falling back to
    /// `wkhtmltoimage` on `PATH`; default options.
    pub fn new() -> Self {
        let program = std::env::var_os(RENDERER_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM));
        Self::with_program(program)
    }

    /// Renderer at an explicit path. This is what the `--renderer` CLI flag
    /// builds, and what tests use to substitute a stub binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self::with_options(program, RenderOptions::default())
    }

    /// Renderer with explicit options.
    pub fn with_options(program: impl Into<PathBuf>, options: RenderOptions) -> Self {
        Self { program: program.into(), options }
    }

    /// The binary this renderer will invoke.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Rasterizes `html` into PNG bytes.
    ///
    /// Spawns one renderer process, feeds it the HTML, and waits — however
    /// long the render takes; there is deliberately no timeout and no way to
    /// cancel a render once started. The render succeeds only if the process
    /// exits 0 *and* wrote at least one byte of image data.
    pub async fn render(&self, html: &str) -> Result<Vec<u8>, Error> {
        let mut child = Command::new(&self.program)
            .args(self.options.to_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn { program: self.program.clone(), source })?;

        // Pipes were requested above, so stdin is always present.
        let mut stdin = child.stdin.take().expect("child stdin is piped");

        // Feed stdin while collecting stdout, in case the renderer starts
        // writing output before it has read all of its input — sequential
        // write-then-wait can deadlock on full pipe buffers.
        let feed = async move {
            // A renderer that dies before consuming its input breaks the
            // pipe; its exit status below is the useful signal, not EPIPE.
            if let Err(e) = stdin.write_all(html.as_bytes()).await {
                debug!("renderer stdin write failed: {e}");
            }
            // Dropping stdin closes the pipe — the renderer sees EOF.
        };
        let ((), output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            return Err(Error::Render {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        if output.stdout.is_empty() {
            return Err(Error::EmptyOutput);
        }

        debug!(bytes = output.stdout.len(), "render complete");
        Ok(output.stdout)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
