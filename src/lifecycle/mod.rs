//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Parse CLI → Load config → Validate → Init logging → Bind → Serve
//!
//! Shutdown (signals.rs):
//!     SIGTERM/SIGINT → Stop accepting → Drain in-flight requests → Exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

pub mod signals;

pub use signals::shutdown_signal;
