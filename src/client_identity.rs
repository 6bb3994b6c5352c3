//! Client identity derivation for rate limiting.

use std::net::IpAddr;

/// Header carrying the original client address behind a reverse proxy.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Where a request came from, as seen by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOrigin<'a> {
    /// Peer address of the connection, normally `host:port`.
    pub remote_addr: &'a str,
    /// Raw value of the `X-Forwarded-For` header, if present.
    pub forwarded_for: Option<&'a str>,
}

impl<'a> ClientOrigin<'a> {
    pub fn new(remote_addr: &'a str, forwarded_for: Option<&'a str>) -> Self {
        Self {
            remote_addr,
            forwarded_for,
        }
    }

    pub fn identity(&self) -> String {
        client_identity(self.remote_addr, self.forwarded_for)
    }
}

/// Key used to partition rate-limit state per caller.
///
/// The first entry of `forwarded_for` wins when it is an IP literal; otherwise
/// the host part of `remote_addr`, or `remote_addr` itself when it has no port.
pub fn client_identity(remote_addr: &str, forwarded_for: Option<&str>) -> String {
    if let Some(forwarded) = forwarded_for {
        let first = forwarded.split(',').next().unwrap_or_default().trim();
        if first.parse::<IpAddr>().is_ok() {
            return first.to_string();
        }
    }

    match split_host_port(remote_addr) {
        Some(host) => host.to_string(),
        None => remote_addr.to_string(),
    }
}

/// Host part of `host:port` or `[host]:port`. `None` when there is no port or
/// an unbracketed host contains colons.
fn split_host_port(addr: &str) -> Option<&str> {
    if let Some(rest) = addr.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        after.strip_prefix(':')?;
        return Some(host);
    }

    let (host, _port) = addr.rsplit_once(':')?;
    if host.contains(':') {
        return None;
    }
    Some(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_addr_host() {
        assert_eq!(client_identity("127.0.0.1:8080", None), "127.0.0.1");
        assert_eq!(client_identity("example.com:443", None), "example.com");
        assert_eq!(client_identity("[::1]:8080", None), "::1");
    }

    #[test]
    fn test_remote_addr_without_port() {
        assert_eq!(client_identity("example.com", None), "example.com");
        assert_eq!(client_identity("::1", None), "::1");
        assert_eq!(client_identity("[::1]", None), "[::1]");
        assert_eq!(client_identity("", None), "");
    }

    #[test]
    fn test_forwarded_for_first_ip() {
        assert_eq!(
            client_identity("127.0.0.1:8080", Some("192.168.1.1")),
            "192.168.1.1"
        );
        assert_eq!(
            client_identity("127.0.0.1:8080", Some(" 192.168.1.1 , 10.0.0.1")),
            "192.168.1.1"
        );
        assert_eq!(
            client_identity("127.0.0.1:8080", Some("2001:db8::1, 10.0.0.1")),
            "2001:db8::1"
        );
    }

    #[test]
    fn test_forwarded_for_not_an_ip_falls_back() {
        assert_eq!(
            client_identity("127.0.0.1:8080", Some("unknown, 10.0.0.1")),
            "127.0.0.1"
        );
        assert_eq!(client_identity("127.0.0.1:8080", Some("")), "127.0.0.1");
    }

    #[test]
    fn test_origin_identity() {
        let origin = ClientOrigin::new("10.1.2.3:5000", Some("203.0.113.9"));
        assert_eq!(origin.identity(), "203.0.113.9");
    }
}
