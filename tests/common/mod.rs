//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use url::Url;

use origin_relay::config::{validate_config, ProxyConfig};
use origin_relay::http::OutboundRequest;
use origin_relay::upstream::{Dispatch, DispatchError};
use origin_relay::{HttpServer, ProxyPipeline, UpstreamDispatcher};

/// Start a backend that echoes what it received as JSON.
///
/// `/redirect` answers 301 with `Location: /x` instead. Returns the bound
/// address and a hit counter.
pub async fn start_echo_backend() -> (SocketAddr, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));

    let app = Router::new()
        .route("/redirect", any(redirect))
        .route("/", any(echo))
        .route("/{*path}", any(echo))
        .with_state(hits.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, hits)
}

async fn redirect(State(hits): State<Arc<AtomicUsize>>) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, "/x")]).into_response()
}

async fn echo(State(hits): State<Arc<AtomicUsize>>, request: Request<Body>) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);

    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    let mut headers = BTreeMap::new();
    for (name, value) in parts.headers.iter() {
        headers.insert(
            name.as_str().to_string(),
            value.to_str().unwrap_or_default().to_string(),
        );
    }

    Json(json!({
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Config for a relay on an ephemeral port forwarding to `backend` in
/// address mode over plain HTTP.
pub fn address_mode_config(backend: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.destination.scheme = "http".into();
    config.destination.address = Some(backend.ip());
    config.destination.port = Some(backend.port());
    config
}

/// Running relay; dropping it shuts the server down.
pub struct Relay {
    pub addr: SocketAddr,
    _shutdown: oneshot::Sender<()>,
}

impl Relay {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a real relay with the production dispatcher.
pub async fn start_relay(config: ProxyConfig) -> Relay {
    let destination = validate_config(&config).unwrap();
    let dispatcher = UpstreamDispatcher::new(&config.timeouts, destination.pin()).unwrap();
    let pipeline = ProxyPipeline::from_config(&config, dispatcher).unwrap();
    let server = HttpServer::new(&config, pipeline);

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let _ = server
            .run(listener, async {
                let _ = rx.await;
            })
            .await;
    });

    Relay {
        addr,
        _shutdown: tx,
    }
}

/// Client that never follows redirects and ignores system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

/// Everything about an outbound request except its body stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub resolve_override: Option<SocketAddr>,
    pub body: Bytes,
}

type Reply = Arc<dyn Fn() -> Result<Response, DispatchError> + Send + Sync>;

/// Dispatcher that records every call and answers with a canned reply.
#[derive(Clone)]
pub struct SpyDispatcher {
    calls: Arc<Mutex<Vec<Recorded>>>,
    reply: Reply,
}

impl SpyDispatcher {
    pub fn replying<F>(reply: F) -> Self
    where
        F: Fn() -> Result<Response, DispatchError> + Send + Sync + 'static,
    {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            reply: Arc::new(reply),
        }
    }

    /// 200 with body "ok".
    pub fn ok() -> Self {
        Self::replying(|| Ok((StatusCode::OK, "ok").into_response()))
    }

    pub fn failing(kind: std::io::ErrorKind) -> Self {
        Self::replying(move || Err(DispatchError::Io(std::io::Error::from(kind))))
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Dispatch for SpyDispatcher {
    fn dispatch(
        &self,
        request: OutboundRequest,
    ) -> impl std::future::Future<Output = Result<Response, DispatchError>> + Send {
        let calls = self.calls.clone();
        let reply = self.reply.clone();
        async move {
            let body = axum::body::to_bytes(request.body, usize::MAX)
                .await
                .unwrap_or_default();
            calls.lock().unwrap().push(Recorded {
                method: request.method,
                url: request.url,
                headers: request.headers,
                resolve_override: request.resolve_override,
                body,
            });
            reply()
        }
    }
}

/// Collect a response body as text.
pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
