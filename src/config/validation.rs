//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Enforce exactly one destination resolution mode
//! - Validate value ranges and header names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<Destination, Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use axum::http::{HeaderName, HeaderValue};
use url::{Position, Url};

use crate::config::schema::{ClientIpSource, Destination, ProxyConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("destination: exactly one of `address` or `hostname` must be set, found neither")]
    NoDestination,

    #[error("destination: `address` and `hostname` are mutually exclusive")]
    ConflictingDestination,

    #[error("destination: hostname mode requires `pin_address`")]
    MissingPinAddress,

    #[error("destination: `pin_address` is only valid in hostname mode")]
    UnexpectedPinAddress,

    #[error("destination: hostname must not be empty")]
    EmptyHostname,

    #[error("destination: hostname `{0}` is not a valid Host header value")]
    InvalidHostname(String),

    #[error("destination: cannot build upstream URL for `{0}`")]
    InvalidAddress(String),

    #[error("{field}: unsupported scheme `{value}` (expected http or https)")]
    InvalidScheme { field: &'static str, value: String },

    #[error("access: blocked_user_agents[{0}] is empty and would deny every request")]
    EmptyBlockedAgent(usize),

    #[error("forwarding: invalid client IP header name `{0}`")]
    InvalidClientIpHeader(String),

    #[error("listener: invalid bind address `{0}`")]
    InvalidBindAddress(String),

    #[error("timeouts: connect_secs must be greater than zero")]
    ZeroConnectTimeout,
}

fn is_http_scheme(scheme: &str) -> bool {
    matches!(scheme, "http" | "https")
}

/// Validate the configuration and resolve its destination.
pub fn validate_config(config: &ProxyConfig) -> Result<Destination, Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if !is_http_scheme(&config.listener.public_scheme) {
        errors.push(ValidationError::InvalidScheme {
            field: "listener.public_scheme",
            value: config.listener.public_scheme.clone(),
        });
    }

    for (i, pattern) in config.access.blocked_user_agents.iter().enumerate() {
        if pattern.is_empty() {
            errors.push(ValidationError::EmptyBlockedAgent(i));
        }
    }

    if let ClientIpSource::Header { name } = &config.forwarding.client_ip {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidClientIpHeader(name.clone()));
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroConnectTimeout);
    }

    let destination = resolve_destination(config, &mut errors);

    match destination {
        Some(destination) if errors.is_empty() => Ok(destination),
        _ => Err(errors),
    }
}

fn resolve_destination(
    config: &ProxyConfig,
    errors: &mut Vec<ValidationError>,
) -> Option<Destination> {
    let dest = &config.destination;

    if !is_http_scheme(&dest.scheme) {
        errors.push(ValidationError::InvalidScheme {
            field: "destination.scheme",
            value: dest.scheme.clone(),
        });
        return None;
    }

    match (dest.address, dest.hostname.as_deref()) {
        (None, None) => {
            errors.push(ValidationError::NoDestination);
            None
        }
        (Some(_), Some(_)) => {
            errors.push(ValidationError::ConflictingDestination);
            None
        }
        (Some(addr), None) => {
            if dest.pin_address.is_some() {
                errors.push(ValidationError::UnexpectedPinAddress);
                return None;
            }
            let authority = match (addr, dest.port) {
                (_, Some(port)) => SocketAddr::new(addr, port).to_string(),
                (IpAddr::V4(v4), None) => v4.to_string(),
                (IpAddr::V6(v6), None) => format!("[{v6}]"),
            };
            let base = Url::parse(&format!("{}://{}", dest.scheme, authority));
            let host = base.as_ref().ok().and_then(|url| {
                HeaderValue::from_str(&url[Position::BeforeHost..Position::AfterPort]).ok()
            });
            match (base, host) {
                (Ok(base), Some(host)) => Some(Destination::Address { base, host }),
                _ => {
                    errors.push(ValidationError::InvalidAddress(authority));
                    None
                }
            }
        }
        (None, Some(host)) => {
            let host = host.trim();
            if host.is_empty() {
                errors.push(ValidationError::EmptyHostname);
                return None;
            }
            let Some(pin) = dest.pin_address else {
                errors.push(ValidationError::MissingPinAddress);
                return None;
            };
            let Ok(host) = HeaderValue::from_str(host) else {
                errors.push(ValidationError::InvalidHostname(host.to_string()));
                return None;
            };
            Some(Destination::Hostname {
                host,
                pin: SocketAddr::new(pin, dest.port.unwrap_or(0)),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address_config() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.destination.address = Some("54.169.222.135".parse().unwrap());
        config
    }

    #[test]
    fn test_address_mode_resolves() {
        let dest = validate_config(&address_config()).unwrap();
        assert_eq!(
            dest,
            Destination::Address {
                base: Url::parse("https://54.169.222.135").unwrap(),
                host: HeaderValue::from_static("54.169.222.135"),
            }
        );
    }

    #[test]
    fn test_hostname_mode_resolves_with_pin() {
        let mut config = ProxyConfig::default();
        config.destination.hostname = Some("origin.example.com".into());
        config.destination.pin_address = Some("10.0.0.7".parse().unwrap());
        config.destination.port = Some(8443);

        let dest = validate_config(&config).unwrap();
        assert_eq!(
            dest,
            Destination::Hostname {
                host: HeaderValue::from_static("origin.example.com"),
                pin: "10.0.0.7:8443".parse().unwrap(),
            }
        );
    }

    #[test]
    fn test_neither_mode_is_rejected() {
        let errors = validate_config(&ProxyConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::NoDestination]);
    }

    #[test]
    fn test_both_modes_are_rejected() {
        let mut config = address_config();
        config.destination.hostname = Some("origin.example.com".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::ConflictingDestination]);
    }

    #[test]
    fn test_hostname_without_pin_is_rejected() {
        let mut config = ProxyConfig::default();
        config.destination.hostname = Some("origin.example.com".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingPinAddress]);
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = address_config();
        config.listener.bind_address = "not-an-address".into();
        config.access.blocked_user_agents.push(String::new());
        config.forwarding.client_ip = ClientIpSource::Header {
            name: "bad header".into(),
        };
        config.timeouts.connect_secs = 0;
        config.destination.scheme = "ftp".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::EmptyBlockedAgent(4)));
        assert!(errors.contains(&ValidationError::ZeroConnectTimeout));
    }

    #[test]
    fn test_ipv6_address_mode_brackets_host() {
        let mut config = ProxyConfig::default();
        let addr: IpAddr = "2406:da18:90f:a800::1".parse().unwrap();
        config.destination.address = Some(addr);

        let dest = validate_config(&config).unwrap();
        assert_eq!(dest.host_header(), "[2406:da18:90f:a800::1]");
    }

    #[test]
    fn test_address_mode_with_port() {
        let mut config = address_config();
        config.destination.scheme = "http".into();
        config.destination.port = Some(8080);

        let Destination::Address { base, host } = validate_config(&config).unwrap() else {
            panic!("expected address mode");
        };
        assert_eq!(base.as_str(), "http://54.169.222.135:8080/");
        assert_eq!(host, "54.169.222.135:8080");
    }
}
