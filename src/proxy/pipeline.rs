//! The forwarding pipeline.
//!
//! ```text
//! InboundRequest
//!     → AccessFilter      Deny  → 403
//!     → RequestRewriter
//!     → Dispatch          Err   → 503
//!     → upstream response, verbatim
//! ```
//!
//! Every branch ends in a response; nothing is propagated to the runtime.

use axum::response::Response;

use crate::config::{validate_config, ConfigError, ProxyConfig};
use crate::http::request::{InboundRequest, RequestRewriter};
use crate::http::response;
use crate::security::{AccessFilter, Verdict};
use crate::upstream::Dispatch;

/// Orchestrates filter, rewrite and dispatch for one request at a time.
///
/// Holds only read-only state, so a single instance serves all concurrent
/// requests behind an `Arc`.
pub struct ProxyPipeline<D> {
    filter: AccessFilter,
    rewriter: RequestRewriter,
    dispatcher: D,
}

impl<D: Dispatch> ProxyPipeline<D> {
    pub fn new(filter: AccessFilter, rewriter: RequestRewriter, dispatcher: D) -> Self {
        Self {
            filter,
            rewriter,
            dispatcher,
        }
    }

    /// Build a pipeline from a loaded configuration.
    pub fn from_config(config: &ProxyConfig, dispatcher: D) -> Result<Self, ConfigError> {
        let destination = validate_config(config).map_err(ConfigError::Validation)?;
        Ok(Self::new(
            AccessFilter::from_config(&config.access),
            RequestRewriter::new(destination),
            dispatcher,
        ))
    }

    pub fn rewriter(&self) -> &RequestRewriter {
        &self.rewriter
    }

    /// Handle one inbound request end to end.
    pub async fn handle(&self, inbound: InboundRequest) -> Response {
        if let Verdict::Deny { pattern } = self.filter.evaluate(inbound.user_agent()) {
            tracing::warn!(
                pattern = %pattern,
                user_agent = inbound.user_agent().unwrap_or_default(),
                path = %inbound.url.path(),
                "Blocked user agent"
            );
            return response::access_denied();
        }

        let outbound = self.rewriter.rewrite(inbound);
        let method = outbound.method.clone();
        let upstream_url = outbound.url.clone();

        tracing::debug!(
            method = %method,
            upstream = %upstream_url,
            pinned = ?outbound.resolve_override,
            "Forwarding request"
        );

        match self.dispatcher.dispatch(outbound).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    method = %method,
                    upstream = %upstream_url,
                    "Fetch to origin failed"
                );
                response::origin_unavailable()
            }
        }
    }
}
