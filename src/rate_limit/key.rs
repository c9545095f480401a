//! Caller identity for rate limiting.
//!
//! By default a request is keyed by its peer IP address, falling back to
//! [`UNKNOWN_KEY`] when the transport did not record one. Any
//! `Fn(&Req) -> String` can be used instead, e.g. to key by API token.

use std::net::{IpAddr, SocketAddr};

/// Key used when a request carries no peer address. All such requests share one quota.
pub const UNKNOWN_KEY: &str = "unknown";

/// Requests that know which address they came from.
pub trait PeerAddr {
    fn peer_addr(&self) -> Option<IpAddr>;
}

impl PeerAddr for IpAddr {
    fn peer_addr(&self) -> Option<IpAddr> {
        Some(*self)
    }
}

impl PeerAddr for SocketAddr {
    fn peer_addr(&self) -> Option<IpAddr> {
        Some(self.ip())
    }
}

impl<T: PeerAddr> PeerAddr for Option<T> {
    fn peer_addr(&self) -> Option<IpAddr> {
        self.as_ref().and_then(PeerAddr::peer_addr)
    }
}

impl<T: PeerAddr + ?Sized> PeerAddr for &T {
    fn peer_addr(&self) -> Option<IpAddr> {
        (**self).peer_addr()
    }
}

/// Derives the rate limit key for a request.
pub trait KeyExtractor<Req>: Send + Sync {
    fn extract(&self, req: &Req) -> String;
}

impl<Req, F> KeyExtractor<Req> for F
where
    F: Fn(&Req) -> String + Send + Sync,
{
    fn extract(&self, req: &Req) -> String {
        self(req)
    }
}

/// Keys requests by peer IP, or [`UNKNOWN_KEY`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PeerAddrKey;

impl<Req: PeerAddr> KeyExtractor<Req> for PeerAddrKey {
    fn extract(&self, req: &Req) -> String {
        match req.peer_addr() {
            Some(ip) => ip.to_string(),
            None => UNKNOWN_KEY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Request {
        remote: Option<SocketAddr>,
        token: &'static str,
    }

    impl PeerAddr for Request {
        fn peer_addr(&self) -> Option<IpAddr> {
            self.remote.peer_addr()
        }
    }

    #[test]
    fn keys_by_ip_without_port() {
        let req = Request { remote: Some("192.168.1.20:51234".parse().unwrap()), token: "" };
        assert_eq!(PeerAddrKey.extract(&req), "192.168.1.20");
    }

    #[test]
    fn missing_address_falls_back_to_unknown() {
        let req = Request { remote: None, token: "" };
        assert_eq!(PeerAddrKey.extract(&req), UNKNOWN_KEY);
    }

    #[test]
    fn ipv6_peer() {
        let addr: SocketAddr = "[::1]:8080".parse().unwrap();
        assert_eq!(PeerAddrKey.extract(&addr), "::1");
    }

    #[test]
    fn closures_are_extractors() {
        let by_token = |req: &Request| format!("token:{}", req.token);
        let req = Request { remote: None, token: "abc" };
        assert_eq!(by_token.extract(&req), "token:abc");
    }
}
