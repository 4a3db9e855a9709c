use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use tally_metrics::{CONTENT_TYPE, Registry};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const DEFAULT_METRICS_PATH: &str = "/metrics";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub path: String,
}

/// HTTP endpoint serving the registry in the text exposition format.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
    path: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl MetricsServer {
    pub async fn start(cfg: ServerConfig, registry: Arc<Registry>) -> anyhow::Result<Self> {
        validate_path(&cfg.path)?;

        let listener = TcpListener::bind(cfg.bind_addr)
            .await
            .with_context(|| format!("failed to bind metrics server: {}", cfg.bind_addr))?;
        let addr = listener
            .local_addr()
            .context("failed to resolve metrics server address")?;

        let app = router(&cfg.path, registry);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = serve.await {
                tracing::error!(error = %err, "metrics server failed");
            }
        });

        tracing::info!(%addr, path = %cfg.path, "metrics server listening");

        Ok(Self {
            addr,
            path: cfg.path,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}{}", self.addr, self.path)
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        tracing::info!(addr = %self.addr, "metrics server stopped");
    }
}

impl Drop for MetricsServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}

/// Checks that `path` is an absolute, literal route: no `:`/`*` captures and
/// no braces.
pub fn validate_path(path: &str) -> anyhow::Result<()> {
    anyhow::ensure!(
        path.starts_with('/'),
        "metrics path must start with `/`: {path}"
    );
    anyhow::ensure!(
        !path.contains(['{', '}']),
        "metrics path must not contain braces: {path}"
    );
    if let Some(segment) = path
        .split('/')
        .find(|s| s.starts_with(':') || s.starts_with('*'))
    {
        anyhow::bail!(
            "metrics path segment `{segment}` must not start with `:` or `*`: {path}"
        );
    }
    Ok(())
}

/// `path` must pass [`validate_path`].
pub fn router(path: &str, registry: Arc<Registry>) -> Router {
    Router::new()
        .route(path, get(handle_metrics))
        .with_state(registry)
}

async fn handle_metrics(State(registry): State<Arc<Registry>>) -> impl IntoResponse {
    let snapshot = registry.snapshot();
    let body = snapshot.render();
    tracing::trace!(
        families = snapshot.families.len(),
        bytes = body.len(),
        "served exposition"
    );
    (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body)
}
