//! Request forwarding core.
//!
//! The pipeline ties together the security filter, the request rewriter and
//! the upstream dispatcher. It knows nothing about sockets; the HTTP server
//! hands it an [`InboundRequest`](crate::http::request::InboundRequest) and
//! writes back whatever it returns.

pub mod pipeline;

pub use pipeline::ProxyPipeline;
