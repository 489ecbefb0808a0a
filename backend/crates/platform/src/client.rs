//! Client identification utilities
//!
//! Derives the key used to partition rate-limit state from request headers.

use std::fmt;

use axum::http::HeaderMap;

/// Sentinel used when no address header is present
pub const UNKNOWN_CLIENT: &str = "unknown";

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Network identity of the caller, as reported by the fronting proxy
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn unknown() -> Self {
        Self(UNKNOWN_CLIENT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_CLIENT
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the client identifier from headers
///
/// Order of precedence:
/// 1. First entry of `X-Forwarded-For` (the originating client on multi-hop chains)
/// 2. `X-Real-IP`
/// 3. [`UNKNOWN_CLIENT`]
///
/// The value is used as an opaque key; it is not parsed as an IP address.
pub fn client_identifier(headers: &HeaderMap) -> ClientId {
    let forwarded = header_str(headers, X_FORWARDED_FOR)
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty());

    if let Some(first) = forwarded {
        return ClientId::new(first);
    }

    header_str(headers, X_REAL_IP)
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(ClientId::new)
        .unwrap_or_else(ClientId::unknown)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_first_entry_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            X_FORWARDED_FOR,
            HeaderValue::from_static("203.0.113.7, 10.0.0.1, 10.0.0.2"),
        );
        headers.insert(X_REAL_IP, HeaderValue::from_static("10.0.0.2"));

        assert_eq!(client_identifier(&headers).as_str(), "203.0.113.7");
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REAL_IP, HeaderValue::from_static("198.51.100.4"));

        assert_eq!(client_identifier(&headers).as_str(), "198.51.100.4");
    }

    #[test]
    fn test_empty_forwarded_for_falls_through() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static(" "));
        headers.insert(X_REAL_IP, HeaderValue::from_static("198.51.100.4"));

        assert_eq!(client_identifier(&headers).as_str(), "198.51.100.4");
    }

    #[test]
    fn test_unknown_sentinel() {
        let id = client_identifier(&HeaderMap::new());
        assert!(id.is_unknown());
        assert_eq!(id.to_string(), UNKNOWN_CLIENT);
    }
}
