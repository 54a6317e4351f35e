//! Request handling and transformation.
//!
//! # Responsibilities
//! - Capture the inbound request as the relay saw it (URL, headers, client IP)
//! - Derive the outbound request for the configured destination
//!
//! # Design Decisions
//! - The inbound request is never mutated; the outbound one is built fresh
//! - Bodies are moved through as streams, never buffered or inspected
//! - Client IP forwarding is single-hop: overwrite, never append

use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Body,
    http::{
        header::{self, HeaderName},
        uri::Authority,
        HeaderMap, HeaderValue, Method, Uri,
    },
};
use url::Url;

use crate::config::Destination;
use crate::http::headers::strip_hop_by_hop;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Reasons an inbound request cannot be described as a URL.
#[derive(Debug, thiserror::Error)]
pub enum InboundError {
    #[error("request has no Host header or authority")]
    MissingHost,

    #[error("invalid host: {0:?}")]
    InvalidHost(String),

    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A request as received by the relay.
#[derive(Debug)]
pub struct InboundRequest {
    pub method: Method,
    /// Full URL as presented to the relay (scheme, host, path, query).
    pub url: Url,
    pub headers: HeaderMap,
    /// Trusted client address supplied by the hosting runtime, if any.
    pub client_ip: Option<IpAddr>,
    pub body: Body,
}

impl InboundRequest {
    pub fn new(method: Method, url: Url, headers: HeaderMap, body: Body) -> Self {
        Self {
            method,
            url,
            headers,
            client_ip: None,
            body,
        }
    }

    pub fn with_client_ip(mut self, client_ip: Option<IpAddr>) -> Self {
        self.client_ip = client_ip;
        self
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
    }
}

/// Reconstruct the absolute URL of an origin-form or absolute-form request.
///
/// The scheme comes from the request line if present, otherwise
/// `default_scheme`. The host comes from the `Host` header, falling back to
/// the URI authority (HTTP/2 `:authority`).
///
/// The host must be a bare `host[:port]` authority: anything carrying a path,
/// query, fragment or userinfo is rejected.
pub fn inbound_url(
    uri: &Uri,
    headers: &HeaderMap,
    default_scheme: &str,
) -> Result<Url, InboundError> {
    let scheme = uri.scheme_str().unwrap_or(default_scheme);
    let authority = match headers.get(header::HOST) {
        Some(value) if !value.is_empty() => {
            let raw = value.to_str().map_err(|_| {
                InboundError::InvalidHost(String::from_utf8_lossy(value.as_bytes()).into_owned())
            })?;
            raw.parse::<Authority>()
                .map_err(|_| InboundError::InvalidHost(raw.to_string()))?
        }
        _ => uri.authority().cloned().ok_or(InboundError::MissingHost)?,
    };
    if authority.as_str().contains('@') {
        return Err(InboundError::InvalidHost(authority.to_string()));
    }

    let mut url = Url::parse(&format!("{scheme}://{authority}/"))?;
    url.set_path(uri.path());
    url.set_query(uri.query());
    Ok(url)
}

/// The request sent to the destination.
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// Connect to this address whatever the URL host and port say.
    ///
    /// Port 0 means the scheme default.
    pub resolve_override: Option<SocketAddr>,
    pub body: Body,
}

/// Derives outbound requests for one fixed destination.
#[derive(Debug, Clone)]
pub struct RequestRewriter {
    destination: Destination,
}

impl RequestRewriter {
    pub fn new(destination: Destination) -> Self {
        Self { destination }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Build the outbound request. Consumes the inbound request only to move
    /// its body stream; nothing else is taken from it by value.
    pub fn rewrite(&self, inbound: InboundRequest) -> OutboundRequest {
        let (url, resolve_override) = match &self.destination {
            Destination::Address { base, .. } => {
                let mut url = base.clone();
                url.set_path(inbound.url.path());
                url.set_query(inbound.url.query());
                (url, None)
            }
            Destination::Hostname { pin, .. } => (inbound.url.clone(), Some(*pin)),
        };

        let headers = self.derive_headers(&inbound);

        OutboundRequest {
            method: inbound.method,
            url,
            headers,
            resolve_override,
            body: inbound.body,
        }
    }

    fn derive_headers(&self, inbound: &InboundRequest) -> HeaderMap {
        let mut headers = inbound.headers.clone();
        strip_hop_by_hop(&mut headers);

        headers.insert(header::HOST, self.destination.host_header().clone());

        match inbound
            .client_ip
            .and_then(|ip| HeaderValue::from_str(&ip.to_string()).ok())
        {
            Some(ip) => {
                headers.insert(X_FORWARDED_FOR, ip.clone());
                headers.insert(X_REAL_IP, ip);
            }
            None => {
                headers.remove(X_FORWARDED_FOR);
                headers.remove(X_REAL_IP);
            }
        }

        if let Some(host) = inbound
            .url
            .host_str()
            .and_then(|h| HeaderValue::from_str(h).ok())
        {
            headers.insert(X_FORWARDED_HOST, host);
        }

        // Url::scheme() never carries the trailing ':'.
        if let Ok(proto) = HeaderValue::from_str(inbound.url.scheme()) {
            headers.insert(X_FORWARDED_PROTO, proto);
        }

        headers
    }
}
