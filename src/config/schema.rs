//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, public scheme).
    pub listener: ListenerConfig,

    /// The single backend every allowed request is forwarded to.
    pub destination: DestinationConfig,

    /// User-Agent deny list.
    pub access: AccessConfig,

    /// Client address forwarding.
    pub forwarding: ForwardingConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Scheme callers use to reach the relay. Used for `X-Forwarded-Proto`
    /// when the request line carries no scheme of its own, e.g. when TLS is
    /// terminated in front of the relay.
    pub public_scheme: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            public_scheme: "http".to_string(),
        }
    }
}

/// Destination configuration as written in the config file.
///
/// Exactly one of `address` and `hostname` must be set; validation turns
/// this into a [`Destination`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DestinationConfig {
    /// Upstream scheme, `http` or `https`.
    pub scheme: String,

    /// Address mode: literal IP of the backend.
    pub address: Option<IpAddr>,

    /// Hostname mode: name presented to the backend.
    pub hostname: Option<String>,

    /// Hostname mode: address the transport actually connects to.
    pub pin_address: Option<IpAddr>,

    /// Optional port; the scheme default when unset.
    pub port: Option<u16>,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            address: None,
            hostname: None,
            pin_address: None,
            port: None,
        }
    }
}

/// Access filter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Case-sensitive substrings; a User-Agent containing any of them is denied.
    pub blocked_user_agents: Vec<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            blocked_user_agents: ["BadBot", "AhrefsBot", "SemrushBot", "MJ12bot"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Client address forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Where the trusted client address comes from.
    pub client_ip: ClientIpSource,
}

/// Source of the trusted client-IP signal.
///
/// Whatever this yields is trusted as-is: the relay overwrites
/// `X-Forwarded-For` and `X-Real-IP` with it and never appends.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum ClientIpSource {
    /// A header set by the single trusted hop in front of the relay.
    Header { name: String },
    /// The TCP peer address of the connection.
    Peer,
    /// Never forward a client address.
    Disabled,
}

impl Default for ClientIpSource {
    fn default() -> Self {
        ClientIpSource::Header {
            name: "CF-Connecting-IP".to_string(),
        }
    }
}

/// Timeout configuration for upstream operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { connect_secs: 5 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// A validated destination. Exactly one resolution mode is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Connect to a literal address.
    ///
    /// `base` is `scheme://address[:port]`; `host` is the address (and port)
    /// as sent in the `Host` header.
    Address { base: Url, host: HeaderValue },
    /// Keep the inbound URL, send `host` as `Host`, and connect to `pin`.
    ///
    /// Port 0 in `pin` means the scheme's default port is used.
    Hostname { host: HeaderValue, pin: SocketAddr },
}

impl Destination {
    /// Short label for logs.
    pub fn mode(&self) -> &'static str {
        match self {
            Destination::Address { .. } => "address",
            Destination::Hostname { .. } => "hostname",
        }
    }

    /// Address every connection is pinned to, in hostname mode.
    pub fn pin(&self) -> Option<SocketAddr> {
        match self {
            Destination::Address { .. } => None,
            Destination::Hostname { pin, .. } => Some(*pin),
        }
    }

    /// Value the outbound `Host` header is set to.
    pub fn host_header(&self) -> &HeaderValue {
        match self {
            Destination::Address { host, .. } | Destination::Hostname { host, .. } => host,
        }
    }
}
