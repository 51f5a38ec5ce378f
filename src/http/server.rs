//! Admin API server setup.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Bind plain or TLS listener and serve until shutdown

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ListenerConfig, PanelConfig};
use crate::http::auth::require_api_key;
use crate::http::handlers;
use crate::http::request::{request_id_of, UuidRequestId, X_REQUEST_ID};
use crate::lifecycle::ShutdownSignal;
use crate::net::tls::load_tls_config;
use crate::service::DomainService;

/// Request bodies are tiny JSON documents.
const MAX_BODY_BYTES: usize = 16 * 1024;

/// How long in-flight TLS connections get to finish after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DomainService>,
    pub api_key: Arc<str>,
}

/// Build the admin router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let api = Router::new()
        .route("/status", get(handlers::get_status))
        .route(
            "/domains",
            get(handlers::list_domains).post(handlers::create_domain),
        )
        .route(
            "/domains/{name}",
            get(handlers::get_domain).delete(handlers::delete_domain),
        )
        .route("/domains/{name}/tls", post(handlers::enable_tls))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .nest("/api", api)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "admin_request",
                            method = %request.method(),
                            path = %request.uri().path(),
                            request_id = %request_id_of(request),
                        )
                    }),
                )
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                .layer(TimeoutLayer::new(request_timeout)),
        )
}

/// Errors that stop the admin listener.
#[derive(Debug)]
pub enum ServerError {
    Address(String),
    Bind { addr: SocketAddr, source: std::io::Error },
    Tls(std::io::Error),
    Serve(std::io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Address(addr) => write!(f, "Invalid bind address: {}", addr),
            ServerError::Bind { addr, source } => write!(f, "Failed to bind {}: {}", addr, source),
            ServerError::Tls(e) => write!(f, "TLS setup failed: {}", e),
            ServerError::Serve(e) => write!(f, "Server error: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

/// Admin API server.
pub struct AdminServer {
    router: Router,
    listener: ListenerConfig,
}

impl AdminServer {
    pub fn new(service: Arc<DomainService>, config: &PanelConfig) -> Self {
        let state = AppState {
            service,
            api_key: Arc::from(config.admin.api_key.as_str()),
        };
        let router = build_router(
            state,
            Duration::from_secs(config.listener.request_timeout_secs),
        );
        Self {
            router,
            listener: config.listener.clone(),
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `stop` fires, then drain in-flight requests.
    pub async fn run(self, stop: ShutdownSignal) -> Result<(), ServerError> {
        let addr: SocketAddr = self
            .listener
            .bind_address
            .parse()
            .map_err(|_| ServerError::Address(self.listener.bind_address.clone()))?;

        match &self.listener.tls {
            None => {
                let listener = TcpListener::bind(addr)
                    .await
                    .map_err(|source| ServerError::Bind { addr, source })?;
                tracing::info!(address = %addr, tls = false, "Admin API listening");

                axum::serve(listener, self.router)
                    .with_graceful_shutdown(stop.recv())
                    .await
                    .map_err(ServerError::Serve)?;
            }
            Some(tls) => {
                let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path))
                    .await
                    .map_err(ServerError::Tls)?;

                let handle = axum_server::Handle::new();
                let drain = handle.clone();
                tokio::spawn(async move {
                    stop.recv().await;
                    drain.graceful_shutdown(Some(DRAIN_TIMEOUT));
                });

                tracing::info!(address = %addr, tls = true, "Admin API listening");
                axum_server::bind_rustls(addr, rustls)
                    .handle(handle)
                    .serve(self.router.into_make_service())
                    .await
                    .map_err(ServerError::Serve)?;
            }
        }

        tracing::info!("Admin API stopped");
        Ok(())
    }
}
