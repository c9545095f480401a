use crate::rate_limit::key::{KeyExtractor, PeerAddrKey};
use crate::rate_limit::{FixedWindowLimiter, RateLimitConfig, RateLimiter, DEFAULT_MESSAGE};
use crate::telemetry::{
    emit_best_effort, NullSink, PacerEvent, RateLimitEvent, RequestOutcome, TelemetrySink,
};
use crate::PacerError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::time::Instant;
use tower_layer::Layer;
use tower_service::Service;

/// A layer that enforces rate limits using a [`RateLimiter`].
///
/// # Examples
/// ```
/// use pacer::rate_limit::{RateLimitConfig, RateLimitLayer};
/// use std::net::SocketAddr;
/// use tower::{service_fn, ServiceBuilder, ServiceExt};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let config = RateLimitConfig::from_millis(60_000, 1).unwrap();
/// let svc = ServiceBuilder::new()
///     .layer(RateLimitLayer::fixed_window(config))
///     .service(service_fn(|peer: SocketAddr| async move {
///         Ok::<_, std::io::Error>(format!("hello {peer}"))
///     }));
///
/// let peer: SocketAddr = "10.0.0.1:4000".parse().unwrap();
/// assert!(svc.clone().oneshot(peer).await.is_ok());
/// let err = svc.oneshot(peer).await.unwrap_err();
/// assert_eq!(err.status_code(), Some(429));
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimitLayer<L, K = PeerAddrKey, Sink = NullSink> {
    limiter: Arc<L>,
    key: Arc<K>,
    message: Arc<str>,
    sink: Sink,
}

impl<L, K, Sink: Clone> Clone for RateLimitLayer<L, K, Sink> {
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
            key: self.key.clone(),
            message: self.message.clone(),
            sink: self.sink.clone(),
        }
    }
}

impl<L> RateLimitLayer<L> {
    /// Create a layer keyed by peer address, with the default denial message.
    pub fn new(limiter: L) -> Self {
        Self {
            limiter: Arc::new(limiter),
            key: Arc::new(PeerAddrKey),
            message: Arc::from(DEFAULT_MESSAGE),
            sink: NullSink,
        }
    }
}

impl RateLimitLayer<FixedWindowLimiter> {
    /// In-memory fixed-window limiter using the config's denial message.
    pub fn fixed_window(config: RateLimitConfig) -> Self {
        let message = Arc::from(config.message());
        Self { message, ..Self::new(FixedWindowLimiter::new(config)) }
    }
}

impl<L, K, Sink> RateLimitLayer<L, K, Sink> {
    /// Derive keys with `key` instead of the peer address.
    pub fn with_key_extractor<K2>(self, key: K2) -> RateLimitLayer<L, K2, Sink> {
        RateLimitLayer { limiter: self.limiter, key: Arc::new(key), message: self.message, sink: self.sink }
    }

    /// Override the denial message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Arc::from(message.into());
        self
    }

    /// Attach a telemetry sink.
    pub fn with_sink<S2>(self, sink: S2) -> RateLimitLayer<L, K, S2> {
        RateLimitLayer { limiter: self.limiter, key: self.key, message: self.message, sink }
    }

    /// The shared limiter; every service built from this layer uses it.
    pub fn limiter(&self) -> &Arc<L> {
        &self.limiter
    }
}

impl<S, L, K, Sink: Clone> Layer<S> for RateLimitLayer<L, K, Sink> {
    type Service = RateLimitService<S, L, K, Sink>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimitService {
            inner: service,
            limiter: self.limiter.clone(),
            key: self.key.clone(),
            message: self.message.clone(),
            sink: self.sink.clone(),
        }
    }
}

/// Middleware service that enforces rate limits.
#[derive(Debug)]
pub struct RateLimitService<S, L, K = PeerAddrKey, Sink = NullSink> {
    inner: S,
    limiter: Arc<L>,
    key: Arc<K>,
    message: Arc<str>,
    sink: Sink,
}

impl<S: Clone, L, K, Sink: Clone> Clone for RateLimitService<S, L, K, Sink> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
            key: self.key.clone(),
            message: self.message.clone(),
            sink: self.sink.clone(),
        }
    }
}

impl<S, L, K, Sink, Req> Service<Req> for RateLimitService<S, L, K, Sink>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    S::Response: Send + 'static,
    L: RateLimiter + 'static,
    K: KeyExtractor<Req> + 'static,
    Sink: TelemetrySink,
    Sink::Future: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = PacerError<S::Error>;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(PacerError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let key = self.key.extract(&req);
        let limiter = self.limiter.clone();
        let message = self.message.clone();
        let sink = self.sink.clone();
        // Take the service that was driven to readiness; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let decision = match limiter.check(&key).await {
                Ok(decision) => decision,
                Err(e) => {
                    tracing::error!(key = %key, error = %e, "rate limiter unavailable");
                    let reason = e.to_string();
                    let event = RateLimitEvent::Unavailable { key, reason: reason.clone() };
                    emit_best_effort(sink, PacerEvent::RateLimit(event)).await;
                    return Err(PacerError::Infrastructure(reason));
                }
            };

            if !decision.allowed {
                let event = RateLimitEvent::Denied {
                    key,
                    limit: decision.limit,
                    reset_at_millis: decision.reset_at_millis,
                };
                emit_best_effort(sink, PacerEvent::RateLimit(event)).await;
                return Err(PacerError::RateLimited { message: message.to_string(), decision });
            }

            let event = RateLimitEvent::Allowed { key, remaining: decision.remaining };
            emit_best_effort(sink.clone(), PacerEvent::RateLimit(event)).await;

            let start = Instant::now();
            let result = inner.call(req).await;
            let duration = start.elapsed();
            let outcome = match &result {
                Ok(_) => RequestOutcome::Success { duration },
                Err(_) => RequestOutcome::Failure { duration },
            };
            emit_best_effort(sink, PacerEvent::Request(outcome)).await;
            result.map_err(PacerError::Inner)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::telemetry::MemorySink;
    use std::net::SocketAddr;
    use tower::{service_fn, ServiceBuilder, ServiceExt};

    fn peer(ip: &str) -> SocketAddr {
        format!("{ip}:5000").parse().unwrap()
    }

    type EchoFuture = futures::future::Ready<Result<String, std::io::Error>>;

    fn echo_ip(addr: SocketAddr) -> EchoFuture {
        futures::future::ready(Ok(addr.ip().to_string()))
    }

    fn echo() -> tower::util::ServiceFn<fn(SocketAddr) -> EchoFuture> {
        service_fn(echo_ip as fn(SocketAddr) -> EchoFuture)
    }

    #[tokio::test]
    async fn five_allowed_then_denied() {
        let config = RateLimitConfig::from_millis(60_000, 5).unwrap();
        let limiter = FixedWindowLimiter::new(config).with_clock(ManualClock::new(0));
        let sink = MemorySink::with_capacity(100);
        let svc = ServiceBuilder::new()
            .layer(RateLimitLayer::new(limiter).with_sink(sink.clone()))
            .service(echo());

        for _ in 0..5 {
            assert_eq!(svc.clone().oneshot(peer("10.0.0.1")).await.unwrap(), "10.0.0.1");
        }
        let err = svc.clone().oneshot(peer("10.0.0.1")).await.unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(err.message(), Some(DEFAULT_MESSAGE));
        let decision = err.decision().copied().unwrap();
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.reset_at_millis, 60_000);

        let remaining: Vec<u32> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                PacerEvent::RateLimit(RateLimitEvent::Allowed { remaining, .. }) => Some(remaining),
                _ => None,
            })
            .collect();
        assert_eq!(remaining, vec![4, 3, 2, 1, 0]);
        assert_eq!(sink.events().iter().filter(|e| e.is_denial()).count(), 1);
    }

    #[tokio::test]
    async fn denied_request_never_reaches_inner() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counted = calls.clone();
        let inner = service_fn(move |_: SocketAddr| {
            counted.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async { Ok::<_, std::io::Error>(()) }
        });
        let layer = RateLimitLayer::fixed_window(
            RateLimitConfig::from_millis(60_000, 1).unwrap().with_message("Too many searches"),
        );
        let svc = ServiceBuilder::new().layer(layer).service(inner);

        svc.clone().oneshot(peer("10.0.0.2")).await.unwrap();
        let err = svc.oneshot(peer("10.0.0.2")).await.unwrap_err();
        assert_eq!(err.message(), Some("Too many searches"));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn custom_key_extractor_groups_callers() {
        let layer = RateLimitLayer::fixed_window(RateLimitConfig::from_millis(60_000, 1).unwrap())
            .with_key_extractor(|_: &SocketAddr| "everyone".to_string());
        let svc = ServiceBuilder::new().layer(layer).service(echo());

        svc.clone().oneshot(peer("10.0.0.3")).await.unwrap();
        let err = svc.oneshot(peer("10.0.0.4")).await.unwrap_err();
        assert!(err.is_rate_limited(), "different peers share the custom key");
    }

    #[tokio::test]
    async fn limiter_failure_is_infrastructure_error() {
        struct Broken;

        #[async_trait::async_trait]
        impl RateLimiter for Broken {
            async fn check(
                &self,
                _key: &str,
            ) -> Result<crate::rate_limit::RateLimitDecision, Box<dyn std::error::Error + Send + Sync>>
            {
                Err("store unreachable".into())
            }
        }

        let sink = MemorySink::with_capacity(10);
        let svc = ServiceBuilder::new()
            .layer(RateLimitLayer::new(Broken).with_sink(sink.clone()))
            .service(echo());
        let err = svc.oneshot(peer("10.0.0.5")).await.unwrap_err();
        assert!(err.is_infrastructure());
        assert!(err.to_string().contains("store unreachable"));
        assert!(matches!(
            sink.events().as_slice(),
            [PacerEvent::RateLimit(RateLimitEvent::Unavailable { .. })]
        ));
    }

    #[tokio::test]
    async fn inner_errors_are_wrapped_and_recorded() {
        let failing = service_fn(|_: SocketAddr| async {
            Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "tmdb down"))
        });
        let sink = MemorySink::with_capacity(10);
        let layer = RateLimitLayer::fixed_window(RateLimitConfig::from_millis(1_000, 10).unwrap())
            .with_sink(sink.clone());
        let err = ServiceBuilder::new()
            .layer(layer)
            .service(failing)
            .oneshot(peer("10.0.0.6"))
            .await
            .unwrap_err();

        assert!(err.is_inner());
        assert_eq!(err.to_string(), "tmdb down");
        assert!(matches!(
            sink.events().last(),
            Some(PacerEvent::Request(RequestOutcome::Failure { .. }))
        ));
    }
}
