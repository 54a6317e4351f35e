//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a single catch-all handler
//! - Wire up middleware (tracing)
//! - Turn each axum request into an `InboundRequest`
//! - Resolve the trusted client address
//! - Serve until the shutdown future resolves

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, Request},
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::{ClientIpSource, ProxyConfig};
use crate::http::request::{inbound_url, InboundRequest};
use crate::http::response;
use crate::proxy::ProxyPipeline;
use crate::upstream::Dispatch;

/// Per-process context the handler needs besides the pipeline.
struct ServerContext<D> {
    pipeline: ProxyPipeline<D>,
    public_scheme: String,
    client_ip: ClientIpResolver,
}

/// Application state injected into handlers.
type AppState<D> = Arc<ServerContext<D>>;

/// Where the trusted client address is read from.
#[derive(Debug, Clone)]
enum ClientIpResolver {
    Header(HeaderName),
    Peer,
    Disabled,
}

impl ClientIpResolver {
    fn from_config(source: &ClientIpSource) -> Self {
        match source {
            ClientIpSource::Header { name } => HeaderName::from_bytes(name.as_bytes())
                .map(ClientIpResolver::Header)
                .unwrap_or(ClientIpResolver::Disabled),
            ClientIpSource::Peer => ClientIpResolver::Peer,
            ClientIpSource::Disabled => ClientIpResolver::Disabled,
        }
    }

    /// A header value that is not a bare IP address counts as absent.
    fn resolve(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
        match self {
            ClientIpResolver::Header(name) => headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok()),
            ClientIpResolver::Peer => peer.map(|addr| addr.ip()),
            ClientIpResolver::Disabled => None,
        }
    }
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server around an already built pipeline.
    pub fn new<D: Dispatch>(config: &ProxyConfig, pipeline: ProxyPipeline<D>) -> Self {
        let state = Arc::new(ServerContext {
            pipeline,
            public_scheme: config.listener.public_scheme.clone(),
            client_ip: ClientIpResolver::from_config(&config.forwarding.client_ip),
        });

        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router<D: Dispatch>(state: AppState<D>) -> Router {
        Router::new()
            .route("/", any(proxy_handler::<D>))
            .route("/{*path}", any(proxy_handler::<D>))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` resolves. In-flight requests are drained first.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: every method, every path.
async fn proxy_handler<D: Dispatch>(
    State(state): State<AppState<D>>,
    request: Request<Body>,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (parts, body) = request.into_parts();

    let url = match inbound_url(&parts.uri, &parts.headers, &state.public_scheme) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(error = %e, uri = %parts.uri, "Rejecting request without usable host");
            return response::bad_request();
        }
    };

    let client_ip = state.client_ip.resolve(&parts.headers, peer);
    let inbound =
        InboundRequest::new(parts.method, url, parts.headers, body).with_client_ip(client_ip);

    state.pipeline.handle(inbound).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_header_source_parses_ip() {
        let resolver = ClientIpResolver::from_config(&ClientIpSource::default());
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static(" 203.0.113.9 "));

        assert_eq!(
            resolver.resolve(&headers, None),
            Some("203.0.113.9".parse().unwrap())
        );
    }

    #[test]
    fn test_header_source_ignores_garbage_and_peer() {
        let resolver = ClientIpResolver::from_config(&ClientIpSource::default());
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("unknown"));
        let peer: SocketAddr = "192.0.2.1:5000".parse().unwrap();

        assert_eq!(resolver.resolve(&headers, Some(peer)), None);
        assert_eq!(resolver.resolve(&HeaderMap::new(), Some(peer)), None);
    }

    #[test]
    fn test_peer_source() {
        let resolver = ClientIpResolver::from_config(&ClientIpSource::Peer);
        let peer: SocketAddr = "[2001:db8::5]:443".parse().unwrap();
        assert_eq!(
            resolver.resolve(&HeaderMap::new(), Some(peer)),
            Some("2001:db8::5".parse().unwrap())
        );
    }

    #[test]
    fn test_disabled_source() {
        let resolver = ClientIpResolver::from_config(&ClientIpSource::Disabled);
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("203.0.113.9"));
        let peer: SocketAddr = "192.0.2.1:5000".parse().unwrap();
        assert_eq!(resolver.resolve(&headers, Some(peer)), None);
    }
}
