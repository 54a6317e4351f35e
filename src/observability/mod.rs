//! Observability subsystem.
//!
//! Structured logging only: startup, denials, upstream failures and a debug
//! line per forwarded request. HTTP request spans come from
//! `tower_http::trace::TraceLayer` in the server.

pub mod logging;
