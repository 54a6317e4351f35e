//! Single-destination reverse relay.
//!
//! Accepts any HTTP request, drops requests from blocked User-Agents,
//! rewrites the identifying headers and forwards everything else to one fixed
//! backend, relaying the backend's response (or a stable 503) to the caller.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod security;
pub mod upstream;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use proxy::ProxyPipeline;
pub use upstream::UpstreamDispatcher;
