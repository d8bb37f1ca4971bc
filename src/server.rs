use crate::config::ServerConfig;
use crate::services::processor::AudioProcessor;
use crate::services::sweeper::StaleUploadSweeper;
use crate::{AppState, create_app};
use anyhow::Context;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

/// A bound but not yet serving instance. Each instance owns its config,
/// listener and scratch directory, so several can live in one process.
pub struct Server {
    listener: TcpListener,
    app: Router,
    config: Arc<ServerConfig>,
    local_addr: SocketAddr,
}

impl Server {
    pub async fn bind(
        config: ServerConfig,
        processor: Arc<dyn AudioProcessor>,
    ) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.upload_dir)
            .await
            .with_context(|| format!("creating upload dir {:?}", config.upload_dir))?;

        let state = AppState::new(config, processor);
        let config = state.config.clone();

        let app = create_app(state).layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    info!("📥 {} {}", request.method(), request.uri());
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        info!(
                            "📤 Finished in {:?} with status {}",
                            latency,
                            response.status()
                        );
                    },
                ),
        );

        let addr = config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding {}", addr))?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            app,
            config,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests and
    /// stop the sweeper.
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (sweeper_tx, sweeper_rx) = watch::channel(false);
        let sweeper = StaleUploadSweeper::new(
            self.config.upload_dir.clone(),
            self.config.stale_upload_age,
            self.config.sweep_interval,
            sweeper_rx,
        );
        let sweeper_handle = tokio::spawn(sweeper.run());

        info!("✅ Server ready at http://{}", self.local_addr);

        let served = axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await;

        let _ = sweeper_tx.send(true);
        let _ = sweeper_handle.await;

        served.context("serving HTTP")?;
        info!("🛑 Server on {} shut down gracefully.", self.local_addr);
        Ok(())
    }

    /// Run in a background task; the returned handle stops it.
    pub fn start(self) -> ServerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let local_addr = self.local_addr;

        let task = tokio::spawn(self.run_until(async move {
            // A dropped handle also counts as a stop request.
            let _ = shutdown_rx.changed().await;
        }));

        ServerHandle {
            local_addr,
            shutdown_tx,
            task,
        }
    }
}

pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn stop(self) -> anyhow::Result<()> {
        let _ = self.shutdown_tx.send(true);
        self.task.await.context("server task panicked")?
    }
}
