//! HTTP server and graceful shutdown.
//!
//! # Lifecycle
//!
//! [`Server::bind`] claims the socket up front and fails loudly if the port
//! is taken. [`Server::serve`] then accepts connections until the process
//! receives an interrupt (Ctrl-C, or SIGTERM where that exists), at which
//! point it:
//!
//! 1. Immediately stops calling `listener.accept()` — no new connections.
//! 2. Closes the listening socket.
//! 3. Lets every in-flight render run to completion, then returns.
//!
//! Tests drive the same loop through [`Server::serve_until`] with their own
//! stop trigger instead of process signals.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::Error;
use crate::handler;
use crate::render::Renderer;

/// The address the service listens on unless configured otherwise.
pub const DEFAULT_ADDR: &str = "localhost:7227";

/// The HTTP server: one listening socket, one handler.
pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Resolves `addr` and binds the listening socket.
    ///
    /// `addr` is a `host:port` string. Hostnames (`localhost:7227`) go
    /// through the system resolver, and port `0` asks the OS for a free
    /// port — see [`local_addr`](Server::local_addr).
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # async fn run() -> Result<(), rasterd::Error> {
    /// use rasterd::{DEFAULT_ADDR, Server};
    /// let server = Server::bind(DEFAULT_ADDR).await?;
    /// # Ok(()) }
    /// ```
    pub async fn bind(addr: &str) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// The address the socket actually bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections and answers render requests until the process
    /// receives an interrupt signal, then shuts down gracefully.
    pub async fn serve(self, renderer: Renderer) -> Result<(), Error> {
        self.serve_until(renderer, shutdown_signal()).await
    }

    /// The same loop as [`serve`](Server::serve), stopping when `shutdown`
    /// resolves instead of on a process signal.
    pub async fn serve_until(
        self,
        renderer: Renderer,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = self.listener;
        let addr = listener.local_addr()?;

        // One renderer handle shared across concurrent connection tasks. It
        // holds configuration only; every render spawns its own process.
        let renderer = Arc::new(renderer);

        info!(%addr, "rasterd listening");

        // JoinSet tracks every spawned connection task so we can wait for
        // them all to finish during graceful shutdown.
        let mut tasks = tokio::task::JoinSet::new();

        // The shutdown future is polled across loop iterations; pin it on
        // the stack so `select!` can take it by `&mut`.
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // `biased` makes select! check arms top-to-bottom instead of
                // randomly. Shutdown is checked first so an interrupt
                // immediately stops accepting, even if connections are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let renderer = Arc::clone(&renderer);
                    // TokioIo adapts tokio's AsyncRead/AsyncWrite to the hyper
                    // IO traits.
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // `service_fn` turns a plain async function into a
                        // hyper `Service`. The closure runs once per request
                        // on the connection, not once per connection.
                        let svc = service_fn(move |req| {
                            let renderer = Arc::clone(&renderer);
                            async move { handler::handle(renderer, req).await }
                        });

                        // `auto::Builder` transparently handles both HTTP/1.1
                        // and HTTP/2 — whatever the client negotiates.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Close the listening socket before draining: nothing new is
        // accepted after the signal, even while slow renders finish.
        drop(listener);

        while tasks.join_next().await.is_some() {}

        info!("rasterd stopped");
        Ok(())
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGINT** (Ctrl-C, for local dev) and
/// **SIGTERM** (what service managers send). On Windows only Ctrl-C is
/// available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    // `pending()` is a future that never resolves — on non-Unix platforms
    // the SIGTERM arm is effectively disabled.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
