//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all handler, client IP)
//!     → request.rs (InboundRequest, rewrite to OutboundRequest)
//!     → headers.rs (hop-by-hop stripping, both directions)
//!     → [pipeline: filter, dispatch]
//!     → response.rs (relay-generated 400/403/503)
//!     → Send to client
//! ```

pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{InboundRequest, OutboundRequest, RequestRewriter};
pub use server::HttpServer;
