//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Mount the static handler on an Axum router
//! - Wire up middleware (request ID, tracing, timeout, nosniff)
//! - Bind server to listener with peer addresses for the rate limiter
//! - Stop accepting on the shutdown broadcast

use axum::http::{header, HeaderValue};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::handler::StaticHandler;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};

/// HTTP server hosting one static handler.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Mount `handler` at the configured route and wrap it in middleware.
    pub fn new(config: ServerConfig, handler: Arc<StaticHandler>) -> Self {
        let router = handler.register_router(&config.mount.route, Router::new());
        let router = Self::build_router(&config, router);
        Self { router, config }
    }

    /// Layers apply bottom-up: the request id is set before tracing sees
    /// the request.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, router: Router) -> Router {
        let router = router
            .layer(TimeoutLayer::new(Duration::from_secs(config.listener.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid));

        if config.listener.nosniff {
            router.layer(SetResponseHeaderLayer::if_not_present(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
        } else {
            router
        }
    }

    /// The fully layered router, for embedding or `oneshot` tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            route = %self.config.mount.route,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
