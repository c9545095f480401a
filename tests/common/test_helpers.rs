use pacer::rate_limit::PeerAddr;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Minimal stand-in for an inbound HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    pub path: &'static str,
    pub remote: Option<SocketAddr>,
    pub api_key: Option<&'static str>,
}

impl Request {
    pub fn from_ip(ip: &str) -> Self {
        Self {
            path: "/api/search",
            remote: Some(format!("{ip}:49152").parse().expect("valid socket address")),
            api_key: None,
        }
    }

    pub fn anonymous() -> Self {
        Self { path: "/api/search", remote: None, api_key: None }
    }

    pub fn with_api_key(mut self, key: &'static str) -> Self {
        self.api_key = Some(key);
        self
    }
}

impl PeerAddr for Request {
    fn peer_addr(&self) -> Option<IpAddr> {
        self.remote.peer_addr()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Let spawned timer tasks run after the paused clock moves.
pub async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

pub async fn advance_ms(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    settle().await;
}
