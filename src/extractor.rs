/* src/extractor.rs */

use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

use crate::error::{GateError, Result};
use crate::request::RequestInfo;

/// Forwarding headers consulted when forwarding is allowed, in order of preference.
pub const DEFAULT_FORWARD_HEADERS: [&str; 12] = [
    "x-client-ip",
    "x-forwarded-for",
    // nginx
    "x-real-ip",
    // Cloudflare
    "cf-connecting-ip",
    // Rackspace, Riverbed
    "x-cluster-client-ip",
    // Fastly
    "fastly-ssl",
    "fastly-client-ip",
    // Akamai
    "true-client-ip",
    // Zscaler
    "z-forwarded-for",
    "x-forwarded",
    "forwarded-for",
    "forwarded",
];

const TRANSPORT_SOURCES: [&str; 4] = [
    "connection.remote_address",
    "socket.remote_address",
    "connection.socket.remote_address",
    "info.remote_address",
];

// Syntactic only: octets are not range checked and a trailing port is allowed.
static IPV4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{1,3}\.){3}[0-9]{1,3}(:[0-9]+)?$").unwrap());

// Deliberately loose, it also accepts some strings that are not valid IPv6.
static IPV6: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(::)?((([0-9]{1,3}\.){3}[0-9]{1,3})?[0-9a-f]{0,4}:{0,2}){1,8}(::)?$").unwrap()
});

/// Whether `ip` looks like a dotted-quad IPv4 address, optionally with a port.
pub fn is_ipv4(ip: &str) -> bool {
    IPV4.is_match(ip)
}

/// Whether `ip` looks like an IPv6 address.
pub fn is_ipv6(ip: &str) -> bool {
    IPV6.is_match(ip)
}

/// Configuration for client IP resolution.
#[derive(Debug, Clone)]
pub struct IpExtractor {
    /// Forwarding headers to check, in order of preference.
    pub headers: Vec<String>,
    /// Whether forwarding headers are consulted at all.
    pub allow_forwarded: bool,
}

impl Default for IpExtractor {
    fn default() -> Self {
        Self {
            headers: DEFAULT_FORWARD_HEADERS
                .iter()
                .map(|h| h.to_string())
                .collect(),
            allow_forwarded: false,
        }
    }
}

impl IpExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the forwarding headers to check.
    pub fn with_headers(mut self, headers: Vec<String>) -> Self {
        self.headers = headers;
        self
    }

    /// Replace the forwarding headers, rejecting names that are not HTTP tokens.
    pub fn try_with_headers<I, T>(mut self, headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.headers = headers
            .into_iter()
            .map(|name| validate_header_name(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(self)
    }

    /// Set whether forwarding headers are trusted.
    pub fn allow_forwarded(mut self, allow: bool) -> Self {
        self.allow_forwarded = allow;
        self
    }

    /// Resolve the client IP of `request`.
    ///
    /// When forwarding is allowed, header candidates come first and the
    /// transport addresses after them; otherwise only the transport addresses
    /// are considered. The first non-empty candidate wins and is cleaned up
    /// with [`clean_candidate`].
    pub fn extract(&self, request: &RequestInfo) -> Option<String> {
        let header_names: &[String] = if self.allow_forwarded {
            &self.headers
        } else {
            &[]
        };

        let forwarded = header_names
            .iter()
            .map(|name| (name.as_str(), request.header(name)));
        let transport = TRANSPORT_SOURCES
            .into_iter()
            .zip(request.transport_candidates());

        let (source, raw) = forwarded
            .chain(transport)
            .find_map(|(source, value)| value.filter(|v| !v.is_empty()).map(|v| (source, v)))?;

        let ip = clean_candidate(raw);
        trace!(source, raw, ip = %ip, "resolved client ip");
        Some(ip)
    }
}

/// Reduce a raw candidate to a single address.
///
/// Keeps the leftmost entry of a comma separated chain, trims it, strips an
/// IPv4-mapped `::ffff:` prefix and drops a port appended to an IPv4 address.
pub fn clean_candidate(raw: &str) -> String {
    let first = raw.split(',').next().unwrap_or(raw);
    let mut ip = first.trim().to_string();

    if is_ipv6(&ip) && ip.contains("::ffff:") {
        ip = ip.replacen("::ffff:", "", 1);
    }

    if is_ipv4(&ip) {
        if let Some(colon) = ip.find(':') {
            ip.truncate(colon);
        }
    }

    ip
}

fn validate_header_name(name: &str) -> Result<String> {
    let is_token = |c: char| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c);

    if name.is_empty() || !name.chars().all(is_token) {
        return Err(GateError::InvalidHeaderName(name.to_string()));
    }
    Ok(name.to_ascii_lowercase())
}

/// Resolve the client IP of `request` with the default header list.
///
/// # Examples
///
/// ```rust
/// use ipgate::{get_client_ip, RequestInfo};
///
/// let req = RequestInfo::new()
///     .with_connection_address("10.0.0.1")
///     .with_header("X-Forwarded-For", "203.0.113.7, 10.0.0.1");
///
/// assert_eq!(get_client_ip(&req, false).as_deref(), Some("10.0.0.1"));
/// assert_eq!(get_client_ip(&req, true).as_deref(), Some("203.0.113.7"));
/// ```
pub fn get_client_ip(request: &RequestInfo, allow_forwarded: bool) -> Option<String> {
    IpExtractor::default()
        .allow_forwarded(allow_forwarded)
        .extract(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_candidates() {
        let req = RequestInfo::new();
        assert_eq!(get_client_ip(&req, false), None);
        assert_eq!(get_client_ip(&req, true), None);
    }

    #[test]
    fn test_connection_address() {
        let req = RequestInfo::new().with_connection_address("1.2.3.4");
        assert_eq!(get_client_ip(&req, false).as_deref(), Some("1.2.3.4"));
    }

    #[test]
    fn test_transport_fallbacks() {
        let req = RequestInfo::new().with_socket_address("2.2.2.2");
        assert_eq!(get_client_ip(&req, false).as_deref(), Some("2.2.2.2"));

        let req = RequestInfo::new().with_connection_socket_address("3.3.3.3");
        assert_eq!(get_client_ip(&req, false).as_deref(), Some("3.3.3.3"));

        let req = RequestInfo::new().with_info_address("4.4.4.4");
        assert_eq!(get_client_ip(&req, false).as_deref(), Some("4.4.4.4"));
    }

    #[test]
    fn test_empty_transport_address_skipped() {
        let req = RequestInfo::new()
            .with_connection_address("")
            .with_socket_address("2.2.2.2");
        assert_eq!(get_client_ip(&req, false).as_deref(), Some("2.2.2.2"));
    }

    #[test]
    fn test_headers_ignored_unless_forwarding_allowed() {
        let req = RequestInfo::new().with_header("x-forwarded-for", "5.6.7.8");
        assert_eq!(get_client_ip(&req, false), None);
        assert_eq!(get_client_ip(&req, true).as_deref(), Some("5.6.7.8"));
    }

    #[test]
    fn test_forwarded_chain_takes_first() {
        let req = RequestInfo::new()
            .with_connection_address("1.1.1.1")
            .with_header("x-forwarded-for", "5.6.7.8, 9.9.9.9")
            .with_header("forwarded", "8.8.8.8");
        assert_eq!(get_client_ip(&req, true).as_deref(), Some("5.6.7.8"));
    }

    #[test]
    fn test_header_priority() {
        let req = RequestInfo::new()
            .with_header("X-Forwarded-For", "5.6.7.8")
            .with_header("X-Client-IP", "7.7.7.7");
        assert_eq!(get_client_ip(&req, true).as_deref(), Some("7.7.7.7"));
    }

    #[test]
    fn test_default_header_order() {
        for pair in DEFAULT_FORWARD_HEADERS.windows(2) {
            let (earlier, later) = (pair[0], pair[1]);
            let req = RequestInfo::new()
                .with_header(later, "2.2.2.2")
                .with_header(earlier, "1.1.1.1");
            assert_eq!(
                get_client_ip(&req, true).as_deref(),
                Some("1.1.1.1"),
                "{earlier} should win over {later}"
            );
        }
    }

    #[test]
    fn test_every_default_header_is_consulted() {
        for name in DEFAULT_FORWARD_HEADERS {
            let req = RequestInfo::new().with_header(name, "7.7.7.7");
            assert_eq!(get_client_ip(&req, true).as_deref(), Some("7.7.7.7"), "{name}");
        }
    }

    #[test]
    fn test_header_beats_every_transport_address() {
        let req = RequestInfo::new()
            .with_connection_address("1.1.1.1")
            .with_socket_address("2.2.2.2")
            .with_connection_socket_address("3.3.3.3")
            .with_info_address("4.4.4.4")
            .with_header("forwarded", "9.9.9.9");
        assert_eq!(get_client_ip(&req, true).as_deref(), Some("9.9.9.9"));
        assert_eq!(get_client_ip(&req, false).as_deref(), Some("1.1.1.1"));
    }

    #[test]
    fn test_whitespace_candidate_resolves_empty() {
        let req = RequestInfo::new()
            .with_header("x-client-ip", "   ")
            .with_connection_address("1.1.1.1");
        assert_eq!(get_client_ip(&req, true).as_deref(), Some(""));
    }

    #[test]
    fn test_empty_header_skipped() {
        let req = RequestInfo::new()
            .with_header("x-client-ip", "")
            .with_header("x-real-ip", "6.6.6.6");
        assert_eq!(get_client_ip(&req, true).as_deref(), Some("6.6.6.6"));
    }

    #[test]
    fn test_transport_used_after_headers() {
        let req = RequestInfo::new()
            .with_header("x-unrelated", "6.6.6.6")
            .with_info_address("4.4.4.4");
        assert_eq!(get_client_ip(&req, true).as_deref(), Some("4.4.4.4"));
    }

    #[test]
    fn test_strip_ipv4_mapped_prefix() {
        let req = RequestInfo::new().with_connection_address("::ffff:10.0.0.1");
        assert_eq!(get_client_ip(&req, false).as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_strip_port_from_ipv4() {
        let req = RequestInfo::new().with_header("x-forwarded-for", "172.16.0.5:4500");
        assert_eq!(get_client_ip(&req, true).as_deref(), Some("172.16.0.5"));
    }

    #[test]
    fn test_plain_ipv6_untouched() {
        let req = RequestInfo::new().with_connection_address("2001:db8::1");
        assert_eq!(get_client_ip(&req, false).as_deref(), Some("2001:db8::1"));
    }

    #[test]
    fn test_clean_candidate() {
        assert_eq!(clean_candidate("  1.2.3.4  "), "1.2.3.4");
        assert_eq!(clean_candidate("1.2.3.4 , 5.6.7.8"), "1.2.3.4");
        assert_eq!(clean_candidate("::ffff:192.168.0.1:8080"), "192.168.0.1");
        assert_eq!(clean_candidate("not-an-ip"), "not-an-ip");
    }

    #[test]
    fn test_ipv4_pattern() {
        assert!(is_ipv4("1.2.3.4"));
        assert!(is_ipv4("1.2.3.4:80"));
        assert!(is_ipv4("999.999.999.999"));
        assert!(!is_ipv4("1.2.3"));
        assert!(!is_ipv4("1.2.3.4.5"));
        assert!(!is_ipv4("1234.2.3.4"));
        assert!(!is_ipv4("::1"));
    }

    #[test]
    fn test_ipv6_pattern() {
        assert!(is_ipv6("::1"));
        assert!(is_ipv6("2001:DB8::1"));
        assert!(is_ipv6("::ffff:10.0.0.1"));
        assert!(is_ipv6("fe80::1:2:3:4"));
        assert!(!is_ipv6("not-an-ip"));
        assert!(!is_ipv6("2001:db8::zz"));
    }

    #[test]
    fn test_custom_headers() {
        let extractor = IpExtractor::new()
            .allow_forwarded(true)
            .try_with_headers(["X-Custom-Client"])
            .unwrap();
        assert_eq!(extractor.headers, vec!["x-custom-client".to_string()]);

        let req = RequestInfo::new()
            .with_header("x-custom-client", "203.0.113.200")
            .with_header("x-client-ip", "7.7.7.7");
        assert_eq!(extractor.extract(&req).as_deref(), Some("203.0.113.200"));
    }

    #[test]
    fn test_invalid_header_names() {
        let err = IpExtractor::new().try_with_headers(["x-ok", "bad header"]);
        assert_eq!(
            err.unwrap_err(),
            GateError::InvalidHeaderName("bad header".to_string())
        );
        assert!(IpExtractor::new().try_with_headers([""]).is_err());
    }
}
