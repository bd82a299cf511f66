//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, security headers, timeout,
//!   body limit)
//! - Bind server to listener
//! - Forward requests to the upstream application
//!
//! # Middleware order (outermost first)
//! ```text
//! set request id → trace → propagate request id → security headers
//!     → timeout → body limit → handler
//! ```
//! Security headers wrap the timeout so 408 responses are decorated too.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::http::forward::{ForwardError, Forwarder};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::policy::PolicyError;
use crate::security::build_security_layer;

/// Error type for server construction and serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid header policy: {0}")]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Upstream(#[from] ForwardError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Option<Arc<Forwarder>>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        let forwarder = match &config.upstream.url {
            Some(url) => {
                let connect_timeout = Duration::from_secs(config.timeouts.connect_secs);
                Some(Arc::new(Forwarder::new(url, connect_timeout)?))
            }
            None => None,
        };

        let router = Self::build_router(&config, AppState { forwarder })?;
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Result<Router, ServerError> {
        let mut router = Router::new()
            .route("/healthz", get(health_handler))
            .fallback(forward_handler)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        if let Some(security) = build_security_layer(&config.security)? {
            router = router.layer(security);
        }

        Ok(router
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %req.request_id(),
                    method = %req.method(),
                    path = %req.uri().path(),
                )
            }))
            .layer(set_request_id_layer()))
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = self.config.upstream.url.as_deref().unwrap_or("none"),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Hand the request to the upstream application, if one is configured.
async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    tracing::debug!(path = %request.uri().path(), "Forwarding request");

    let response = match &state.forwarder {
        Some(forwarder) => forwarder.forward(request).await,
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    };

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HeaderConfig, PolicyConfig};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn send(router: Router, path: &str) -> Response {
        router
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_carries_policy_headers() {
        let server = HttpServer::new(GatewayConfig::default()).unwrap();
        let response = send(server.router(), "/healthz").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert!(response.headers().contains_key("x-request-id"));
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_no_upstream_is_decorated_404() {
        let server = HttpServer::new(GatewayConfig::default()).unwrap();
        let response = send(server.router(), "/api/playlists").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()["strict-transport-security"],
            "max-age=31536000; includeSubDomains"
        );
    }

    #[tokio::test]
    async fn test_disabled_security_sends_no_policy_headers() {
        let mut config = GatewayConfig::default();
        config.security.enabled = false;
        let server = HttpServer::new(config).unwrap();
        let response = send(server.router(), "/").await;

        assert!(response.headers().get("content-security-policy").is_none());
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_configured_policy_replaces_builtin() {
        let mut config = GatewayConfig::default();
        config.security.policies = vec![PolicyConfig {
            source: "/**".into(),
            headers: vec![HeaderConfig {
                key: "X-Frame-Options".into(),
                value: "SAMEORIGIN".into(),
            }],
        }];
        let server = HttpServer::new(config).unwrap();
        let response = send(server.router(), "/").await;

        assert_eq!(response.headers()["x-frame-options"], "SAMEORIGIN");
        assert!(response.headers().get("content-security-policy").is_none());
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let mut config = GatewayConfig::default();
        config.security.policies = vec![PolicyConfig {
            source: "/**".into(),
            headers: vec![HeaderConfig {
                key: "Server".into(),
                value: "gateway".into(),
            }],
        }];
        assert!(matches!(
            HttpServer::new(config),
            Err(ServerError::Policy(PolicyError::UnknownHeader(_)))
        ));
    }
}
