//! Upstream forwarding.
//!
//! # Responsibilities
//! - Rewrite the request URI to the upstream application
//! - Strip hop-by-hop headers in both directions
//! - Set X-Forwarded-For to the peer address
//! - Map upstream connection failures to 502 Bad Gateway
//!
//! # Design Decisions
//! - Bodies stream through; nothing is buffered
//! - The Host header is left as the client sent it
//! - Client-supplied X-Forwarded-For is never trusted; it is replaced
//! - Response headers from the upstream are kept; the security layer
//!   overwrites the policy headers afterwards

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode, Uri};
use axum::response::IntoResponse;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use url::Url;

use crate::http::request::RequestIdExt;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Error building a forwarder from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("invalid upstream url '{0}'")]
    InvalidUrl(String),
}

/// HTTP client bound to one upstream application.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    authority: Authority,
}

impl Forwarder {
    pub fn new(upstream: &str, connect_timeout: Duration) -> Result<Self, ForwardError> {
        let invalid = || ForwardError::InvalidUrl(upstream.to_string());

        let url = Url::parse(upstream).map_err(|_| invalid())?;
        let host = url.host_str().ok_or_else(invalid)?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority: Authority = authority.parse().map_err(|_| invalid())?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self { client, authority })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Send `request` upstream and return its response (or a 502).
    pub async fn forward(&self, request: Request<Body>) -> Response<Body> {
        let request_id = request.request_id().to_string();
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let (mut parts, body) = request.into_parts();

        let mut uri_parts = parts.uri.clone().into_parts();
        uri_parts.scheme = Some(Scheme::HTTP);
        uri_parts.authority = Some(self.authority.clone());
        if uri_parts.path_and_query.is_none() {
            uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        parts.uri = match Uri::from_parts(uri_parts) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Could not build upstream URI");
                return (StatusCode::BAD_REQUEST, "Invalid request URI").into_response();
            }
        };

        strip_hop_by_hop(&mut parts.headers);
        if let Some(ip) = peer {
            set_forwarded_for(&mut parts.headers, &ip.to_string());
        } else {
            parts.headers.remove(X_FORWARDED_FOR);
        }

        let upstream_request = Request::from_parts(parts, body);
        match self.client.request(upstream_request).await {
            Ok(response) => {
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    upstream = %self.authority,
                    error = %e,
                    "Upstream error"
                );
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }
}

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

fn set_forwarded_for(headers: &mut HeaderMap, ip: &str) {
    headers.remove(X_FORWARDED_FOR);
    if let Ok(value) = HeaderValue::from_str(ip) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
