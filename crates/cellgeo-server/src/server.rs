use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::AppConfig, handlers, scheduler::MaintenanceTask, state::AppState};

pub struct CellgeoServer {
    addr: SocketAddr,
    app: Router,
    tasks: Vec<MaintenanceTask>,
}

/// Routes and middleware over an assembled state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::locate))
        .route("/healthz", get(handlers::healthz))
        .route("/version", get(handlers::version))
        .route("/stats", get(handlers::stats))
        .route("/admin/reconcile/{tier}", post(handlers::reconcile))
        .route("/admin/refresh/{tier}", post(handlers::refresh))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &axum::http::Request<_>| {
                            tracing::info_span!(
                                "http.request",
                                http.method = %req.method(),
                                http.target = %req.uri(),
                                http.status_code = tracing::field::Empty,
                            )
                        })
                        .on_response(
                            |res: &axum::http::Response<_>,
                             latency: std::time::Duration,
                             span: &tracing::Span| {
                                span.record(
                                    "http.status_code",
                                    tracing::field::display(res.status().as_u16()),
                                );
                                tracing::info!(
                                    http.status = %res.status().as_u16(),
                                    elapsed_ms = %latency.as_millis(),
                                    "request handled"
                                );
                            },
                        ),
                )
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Builds the application from configuration, opening tiers and providers.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let state = AppState::from_config(cfg).await?;
    Ok(router(state))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<CellgeoServer> {
        let state = AppState::from_config(&self.config).await?;

        let mut tasks = Vec::new();
        if let Some(period) = self.config.reconcile_interval() {
            tasks.push(MaintenanceTask::reconcile(state.reconciler.clone(), period));
        }
        if let Some(period) = self.config.refresh_interval() {
            tasks.push(MaintenanceTask::refresh(
                state.refresher.clone(),
                period,
                state.refresh_max_age,
            ));
        }

        Ok(CellgeoServer {
            addr: self.addr,
            app: router(state),
            tasks,
        })
    }
}

impl CellgeoServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        for task in self.tasks {
            tracing::debug!(job = task.name(), "stopping scheduler");
            task.stop().await;
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
