//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! OutboundRequest
//!     → dispatcher.rs (pick direct or pinned client, one attempt)
//!     → destination
//!     → Response (status, headers, streamed body) | DispatchError
//! ```

pub mod dispatcher;

pub use dispatcher::{Dispatch, DispatchError, UpstreamDispatcher};
