//! rasterd binary: parse flags, wire up logging, run the server.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rasterd::{DEFAULT_ADDR, Renderer, Server};
use tracing::error;

/// HTML-to-PNG render service: POST an `html` form field, receive the PNG.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = DEFAULT_ADDR)]
    bind: String,

    /// Renderer binary. Defaults to $WKHTMLTOIMAGE_BIN, then `wkhtmltoimage`
    /// on PATH.
    #[arg(long)]
    renderer: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // RUST_LOG controls verbosity; `info` shows the startup and shutdown
    // lines plus per-request failures.
    tracing_subscriber::fmt::init();

    let renderer = match args.renderer {
        Some(program) => Renderer::with_program(program),
        None          => Renderer::new(),
    };

    let server = match Server::bind(&args.bind).await {
        Ok(server) => server,
        Err(e) => {
            error!(addr = %args.bind, "failed to bind: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.serve(renderer).await {
        error!("server error: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
