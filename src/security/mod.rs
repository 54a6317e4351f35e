//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → access_control.rs (User-Agent deny list)
//!     → Deny: 403, nothing forwarded
//!     → Allow: pass to the rewriter
//! ```

pub mod access_control;

pub use access_control::{AccessFilter, Verdict};
