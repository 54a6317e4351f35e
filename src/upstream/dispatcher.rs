//! Single-attempt upstream dispatch.
//!
//! # Responsibilities
//! - Send the outbound request to the destination exactly once
//! - Stream the request body up and the response body back
//! - Honour the resolve override (hostname mode) without DNS
//! - Report transport failures as [`DispatchError`] instead of panicking
//!
//! # Design Decisions
//! - Redirects are never followed; a 3xx goes back to the caller as-is
//! - Only a connect timeout; an overall deadline would cut long streams
//! - The pinned client is built once at startup; its resolver answers every
//!   name with the pin, so the inbound host never picks the connect target

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, HttpBody},
    response::Response,
};
use reqwest::{
    dns::{Addrs, Name, Resolve, Resolving},
    redirect, Client,
};
use url::{Host, Url};

use crate::config::TimeoutConfig;
use crate::http::headers::strip_hop_by_hop;
use crate::http::request::OutboundRequest;

/// Transport-level failure contacting the destination.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no upstream client pinned to {0}")]
    UnknownPin(SocketAddr),
}

/// Something that can perform the single upstream attempt.
pub trait Dispatch: Send + Sync + 'static {
    fn dispatch(
        &self,
        request: OutboundRequest,
    ) -> impl Future<Output = Result<Response, DispatchError>> + Send;
}

/// Resolver that answers every lookup with the same address.
#[derive(Debug)]
struct PinnedResolver {
    pin: SocketAddr,
}

impl Resolve for PinnedResolver {
    fn resolve(&self, _name: Name) -> Resolving {
        let addrs: Addrs = Box::new(std::iter::once(self.pin));
        Box::pin(std::future::ready(Ok(addrs)))
    }
}

/// `reqwest`-backed dispatcher used in production.
#[derive(Debug)]
pub struct UpstreamDispatcher {
    direct: Client,
    pinned: Option<(SocketAddr, Client)>,
}

impl UpstreamDispatcher {
    /// Build the clients. `pin` is the hostname-mode connect address, if any.
    pub fn new(
        timeouts: &TimeoutConfig,
        pin: Option<SocketAddr>,
    ) -> Result<Self, DispatchError> {
        let connect_timeout = Duration::from_secs(timeouts.connect_secs);

        let pinned = match pin {
            Some(pin) => {
                let client = Self::builder(connect_timeout)
                    .dns_resolver(Arc::new(PinnedResolver { pin }))
                    .build()?;
                tracing::debug!(pin = %pin, "Built pinned upstream client");
                Some((pin, client))
            }
            None => None,
        };

        Ok(Self {
            direct: Self::builder(connect_timeout).build()?,
            pinned,
        })
    }

    fn builder(connect_timeout: Duration) -> reqwest::ClientBuilder {
        Client::builder()
            .redirect(redirect::Policy::none())
            .connect_timeout(connect_timeout)
            .no_proxy()
    }

    fn client_for(&self, request: &OutboundRequest) -> Result<&Client, DispatchError> {
        match (request.resolve_override, &self.pinned) {
            (None, _) => Ok(&self.direct),
            (Some(wanted), Some((pin, client))) if wanted == *pin => Ok(client),
            (Some(wanted), _) => Err(DispatchError::UnknownPin(wanted)),
        }
    }
}

/// URL the pinned client actually connects with.
///
/// Literal addresses never reach the resolver, so they are replaced by the
/// pin. The port is always the pin's (port 0 means the scheme default).
fn pinned_url(mut url: Url, pin: SocketAddr) -> Url {
    if matches!(url.host(), Some(Host::Ipv4(_) | Host::Ipv6(_))) {
        let _ = url.set_ip_host(pin.ip());
    }
    let port = (pin.port() != 0).then_some(pin.port());
    let _ = url.set_port(port);
    url
}

impl Dispatch for UpstreamDispatcher {
    async fn dispatch(&self, request: OutboundRequest) -> Result<Response, DispatchError> {
        let client = self.client_for(&request)?;

        let OutboundRequest {
            method,
            url,
            headers,
            resolve_override,
            body,
        } = request;
        let url = match resolve_override {
            Some(pin) => pinned_url(url, pin),
            None => url,
        };

        let mut builder = client.request(method, url).headers(headers);
        if !body.is_end_stream() {
            builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream = builder.send().await?;

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
