//! Request forwarding to the resolved upstream
//!
//! Rebuilds the inbound request against the target URL, rewrites `Host` to
//! the target hostname, and streams the upstream response back.

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, Response};
use std::net::IpAddr;
use std::time::Duration;
use url::Url;

use crate::routing::Scheme;

/// Default upstream request timeout (30 seconds)
const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum buffered request body (10 MiB)
const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Headers that apply to a single connection and must not be forwarded
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Error type for dispatch operations
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Failed to build response: {0}")]
    Response(#[from] axum::http::Error),
}

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Per-request facts the forwarded request carries upstream
#[derive(Debug, Clone)]
pub struct ForwardContext {
    pub client_ip: IpAddr,
    pub original_host: Option<HeaderValue>,
    pub scheme: Scheme,
}

/// Forwards requests over a shared HTTP client
#[derive(Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl Dispatcher {
    /// Build a dispatcher with its own client
    pub fn new(config: &DispatchConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.timeout)
            .build()?;

        Ok(Self::with_client(client, config.max_body_bytes))
    }

    /// Build a dispatcher over an existing client
    pub fn with_client(client: reqwest::Client, max_body_bytes: usize) -> Self {
        Self {
            client,
            max_body_bytes,
        }
    }

    /// Forward `request` to `target`, keeping its path and query
    pub async fn dispatch(
        &self,
        target: &Url,
        request: Request<Body>,
        ctx: ForwardContext,
    ) -> Result<Response<Body>, DispatchError> {
        let (parts, body) = request.into_parts();

        let mut url = target.clone();
        url.set_path(parts.uri.path());
        url.set_query(parts.uri.query());

        let body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|_| DispatchError::BodyTooLarge(self.max_body_bytes))?;

        let headers = outbound_headers(&parts.headers, target, &ctx);

        tracing::debug!(
            method = %parts.method,
            upstream = %url,
            "Forwarding request"
        );

        let upstream = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let mut response = Response::builder().status(upstream.status());
        if let Some(response_headers) = response.headers_mut() {
            copy_end_to_end(upstream.headers(), response_headers);
        }

        Ok(response.body(Body::from_stream(upstream.bytes_stream()))?)
    }
}

/// Build the headers sent upstream
fn outbound_headers(inbound: &HeaderMap, target: &Url, ctx: &ForwardContext) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len() + 4);
    copy_end_to_end(inbound, &mut headers);
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);

    // The upstream sees its own hostname, without the port
    if let Some(host) = target.host_str().and_then(|h| HeaderValue::from_str(h).ok()) {
        headers.insert(header::HOST, host);
    }

    // Overwrite rather than append: this gateway is the first trusted hop
    if let Ok(value) = HeaderValue::from_str(&ctx.client_ip.to_string()) {
        headers.insert(HeaderName::from_static(X_FORWARDED_FOR), value);
    }
    if let Some(host) = ctx.original_host.clone() {
        headers.insert(HeaderName::from_static(X_FORWARDED_HOST), host);
    }
    headers.insert(
        HeaderName::from_static(X_FORWARDED_PROTO),
        HeaderValue::from_static(ctx.scheme.as_str()),
    );

    headers
}

/// Copy all headers except hop-by-hop ones (including any named in `Connection`)
fn copy_end_to_end(from: &HeaderMap, to: &mut HeaderMap) {
    let connection_listed: Vec<String> = from
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|v| v.trim().to_ascii_lowercase())
        .collect();

    for (name, value) in from.iter() {
        let name_str = name.as_str();
        if HOP_BY_HOP_HEADERS.contains(&name_str)
            || connection_listed.iter().any(|c| c == name_str)
        {
            continue;
        }
        to.append(name.clone(), value.clone());
    }
}
