//! HTTP server for the store routes.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::service::router;
use crate::error::Result;
use crate::gate::Gate;

/// Serves the store router until shut down.
pub struct StoreServer {
    /// Bound listener
    listener: TcpListener,
    /// Routes over the shared gate
    router: Router,
}

impl StoreServer {
    /// Bind a new server to `addr`.
    pub async fn bind(addr: SocketAddr, gate: Arc<Gate>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            router: router(gate),
        })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until Ctrl+C or SIGTERM.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Serve until `signal` resolves, then drain in-flight requests.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(addr = %self.local_addr()?, "Starting store server");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;

        info!("Store server stopped");
        Ok(())
    }
}

/// Resolves on the first of Ctrl+C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!(signal = "SIGINT", "Shutdown requested"),
                    _ = sigterm.recv() => info!(signal = "SIGTERM", "Shutdown requested"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl+C only"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Ctrl+C handler unavailable");
        std::future::pending::<()>().await;
    }
    info!(signal = "SIGINT", "Shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn start() -> (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<Result<()>>) {
        let gate = Arc::new(Gate::from_config(&GateConfig::default()).unwrap());
        let server = StoreServer::bind("127.0.0.1:0".parse().unwrap(), gate)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();

        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(server.serve_with_shutdown(async move {
            let _ = rx.await;
        }));
        (addr, tx, handle)
    }

    async fn http(addr: SocketAddr, method: &str, target: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "{} {} HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            method, target
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.unwrap();
        reply
    }

    #[tokio::test]
    async fn test_answers_plain_http_requests() {
        let (addr, shutdown, handle) = start().await;

        let reply = http(addr, "GET", "/v1/store/availability?time=1514764800").await;
        assert!(reply.starts_with("HTTP/1.1 200"), "{}", reply);
        assert!(reply.ends_with(r#"{"available":true}"#), "{}", reply);

        let reply = http(addr, "POST", "/v1/store/purchase?time=1514764800").await;
        assert!(reply.ends_with(r#"{"success":true}"#), "{}", reply);

        let reply = http(addr, "GET", "/v1/store/availability?time=1514764900").await;
        assert!(reply.ends_with(r#"{"available":false}"#), "{}", reply);

        let reply = http(addr, "GET", "/nowhere").await;
        assert!(reply.starts_with("HTTP/1.1 404"), "{}", reply);

        shutdown.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_accepting() {
        let (addr, shutdown, handle) = start().await;

        let reply = http(addr, "GET", "/ping").await;
        assert!(reply.ends_with(r#"{"ping":"pong"}"#), "{}", reply);

        shutdown.send(()).unwrap();
        handle.await.unwrap().unwrap();
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
