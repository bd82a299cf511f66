//! Security response headers.
//!
//! # Responsibilities
//! - Merge the policy table into every outgoing response
//! - Override whatever the upstream set for the same header names
//! - Decorate gateway-generated responses (404, 502, timeouts) too
//!
//! # Design Decisions
//! - Header values are parsed into `HeaderValue` once, at layer build time
//! - Sets are selected from the request path before the request is handed
//!   to the inner service
//! - A table with a single match-all set skips matching entirely

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, Response};
use tower::{Layer, Service};

use crate::config::schema::SecurityConfig;
use crate::observability::metrics;
use crate::policy::{PolicyError, PolicyTable, RouteMatcher};

/// Build the headers layer from config, or `None` when headers are disabled.
pub fn build_security_layer(
    config: &SecurityConfig,
) -> Result<Option<SecurityHeadersLayer>, PolicyError> {
    match config.active_table()? {
        Some(table) => Ok(Some(SecurityHeadersLayer::new(Arc::new(table)))),
        None => {
            tracing::warn!("Security headers disabled by configuration");
            Ok(None)
        }
    }
}

type HeaderPairs = Vec<(HeaderName, HeaderValue)>;

/// Policy table with values pre-converted to wire types.
#[derive(Debug)]
pub struct CompiledTable {
    sets: Vec<(RouteMatcher, HeaderPairs)>,
    uniform: bool,
}

impl CompiledTable {
    pub fn compile(table: &PolicyTable) -> Self {
        let sets: Vec<(RouteMatcher, HeaderPairs)> = table
            .entries()
            .iter()
            .map(|set| {
                let pairs = set.rules().iter().map(|r| r.to_header_pair()).collect();
                (set.matcher().clone(), pairs)
            })
            .collect();
        let uniform = sets.len() == 1 && sets[0].0.matches_all();

        Self { sets, uniform }
    }

    /// Indices of the sets that apply to `path`, in table order.
    fn select(&self, path: &str) -> Vec<usize> {
        if self.uniform {
            return vec![0];
        }
        self.sets
            .iter()
            .enumerate()
            .filter(|(_, (matcher, _))| matcher.matches(path))
            .map(|(i, _)| i)
            .collect()
    }

    /// Insert the selected sets into `headers`. Later sets overwrite earlier
    /// ones for the same name. Returns the number of headers written.
    fn apply(&self, selected: &[usize], headers: &mut HeaderMap) -> usize {
        let mut written = 0;
        for &i in selected {
            for (name, value) in &self.sets[i].1 {
                headers.insert(name.clone(), value.clone());
                written += 1;
            }
        }
        written
    }
}

/// Tower layer that adds policy headers to responses.
#[derive(Debug, Clone)]
pub struct SecurityHeadersLayer {
    table: Arc<CompiledTable>,
}

impl SecurityHeadersLayer {
    pub fn new(table: Arc<PolicyTable>) -> Self {
        Self {
            table: Arc::new(CompiledTable::compile(&table)),
        }
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersService {
            inner,
            table: self.table.clone(),
        }
    }
}

/// Tower service that adds policy headers to responses.
#[derive(Debug, Clone)]
pub struct SecurityHeadersService<S> {
    inner: S,
    table: Arc<CompiledTable>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for SecurityHeadersService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let selected = self.table.select(req.uri().path());
        let table = self.table.clone();
        let future = self.inner.call(req);

        Box::pin(async move {
            let mut response = future.await?;
            let written = table.apply(&selected, response.headers_mut());

            tracing::trace!(
                status = %response.status(),
                headers = written,
                "Applied security headers"
            );
            metrics::record_policy_applied(written);

            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{default_table, HeaderRule, KnownHeader, PolicySet};
    use axum::body::Body;
    use axum::http::StatusCode;
    use std::convert::Infallible;
    use tower::{service_fn, ServiceExt};

    async fn call(layer: &SecurityHeadersLayer, path: &str, status: StatusCode) -> Response<Body> {
        let svc = layer.layer(service_fn(move |_req: Request<Body>| async move {
            Ok::<_, Infallible>(
                Response::builder()
                    .status(status)
                    .header("x-frame-options", "ALLOWALL")
                    .body(Body::empty())
                    .unwrap(),
            )
        }));
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        svc.oneshot(req).await.unwrap()
    }

    #[tokio::test]
    async fn test_default_policy_on_every_path_and_status() {
        let layer = SecurityHeadersLayer::new(Arc::new(default_table()));

        for (path, status) in [
            ("/", StatusCode::OK),
            ("/api/playlists", StatusCode::CREATED),
            ("/missing", StatusCode::NOT_FOUND),
            ("/api/generate?prompt=rainy+day", StatusCode::BAD_GATEWAY),
        ] {
            let response = call(&layer, path, status).await;
            let headers = response.headers();
            assert_eq!(response.status(), status);
            assert_eq!(headers["x-frame-options"], "DENY", "upstream value overridden");
            assert_eq!(headers.get_all("x-frame-options").iter().count(), 1);
            assert_eq!(headers["x-content-type-options"], "nosniff");
            assert_eq!(headers["x-xss-protection"], "1; mode=block");
            assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
            assert_eq!(
                headers["strict-transport-security"],
                "max-age=31536000; includeSubDomains"
            );
            assert_eq!(
                headers["permissions-policy"],
                "camera=(), microphone=(), geolocation=(), payment=()"
            );
            assert!(headers["content-security-policy"]
                .to_str()
                .unwrap()
                .starts_with("default-src 'self'; "));
        }
    }

    #[tokio::test]
    async fn test_scoped_sets_only_apply_to_matching_paths() {
        let table = PolicyTable::new(vec![PolicySet::new(
            RouteMatcher::parse("/api/**").unwrap(),
            vec![HeaderRule::new(KnownHeader::CrossOriginResourcePolicy, "same-origin").unwrap()],
        )]);
        let layer = SecurityHeadersLayer::new(Arc::new(table));

        let api = call(&layer, "/api/playlists", StatusCode::OK).await;
        assert_eq!(api.headers()["cross-origin-resource-policy"], "same-origin");

        let page = call(&layer, "/", StatusCode::OK).await;
        assert!(page.headers().get("cross-origin-resource-policy").is_none());
        assert_eq!(page.headers()["x-frame-options"], "ALLOWALL");
    }

    #[test]
    fn test_disabled_config_builds_no_layer() {
        let config = SecurityConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(build_security_layer(&config).unwrap().is_none());
        assert!(build_security_layer(&SecurityConfig::default()).unwrap().is_some());
    }

    #[test]
    fn test_default_table_compiles_uniform() {
        let compiled = CompiledTable::compile(&default_table());
        assert!(compiled.uniform);
        assert_eq!(compiled.select("/anything/at/all"), vec![0]);
    }
}
