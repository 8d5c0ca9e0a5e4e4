use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use shared_types::AppError;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Sliding-window limiter keyed by client IP.
///
/// The key is the TCP peer address. `X-Forwarded-For` is only consulted when
/// the peer is one of the configured trusted proxies.
#[derive(Clone)]
pub struct RateLimitState {
    inner: Arc<Mutex<RateLimitInner>>,
    trusted_proxies: Arc<Vec<IpAddr>>,
}

struct RateLimitInner {
    requests: HashMap<String, Vec<Instant>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimitState {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RateLimitInner {
                requests: HashMap::new(),
                max_requests,
                window,
            })),
            trusted_proxies: Arc::new(Vec::new()),
        }
    }

    /// Honor `X-Forwarded-For` from these peers.
    pub fn with_trusted_proxies(mut self, proxies: Vec<IpAddr>) -> Self {
        self.trusted_proxies = Arc::new(proxies);
        self
    }

    /// Limiter for credential endpoints, sized by `RATE_LIMIT_AUTH_PER_MINUTE` (default 20).
    /// `TRUSTED_PROXIES` is a comma-separated list of reverse-proxy addresses.
    pub fn for_auth_from_env() -> Self {
        let per_minute = std::env::var("RATE_LIMIT_AUTH_PER_MINUTE")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n: &u32| *n > 0)
            .unwrap_or(20);
        let proxies = std::env::var("TRUSTED_PROXIES")
            .map(|v| parse_proxy_list(&v))
            .unwrap_or_default();
        Self::new(per_minute, Duration::from_secs(60)).with_trusted_proxies(proxies)
    }

    /// Limiter key for a request. Without a peer address every caller shares
    /// the `"unknown"` bucket.
    pub fn key_for(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        let Some(peer_ip) = peer.map(|p| p.ip()) else {
            return "unknown".to_string();
        };
        if !self.trusted_proxies.contains(&peer_ip) {
            return peer_ip.to_string();
        }
        // Walk right to left past our own proxies; the first other hop is the client.
        forwarded_chain(headers)
            .into_iter()
            .rev()
            .find(|ip| !self.trusted_proxies.contains(ip))
            .unwrap_or(peer_ip)
            .to_string()
    }

    fn lock(&self) -> MutexGuard<'_, RateLimitInner> {
        // A panic while holding the lock leaves only timestamps behind.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a request from `key`. Returns false when the window is full.
    pub fn check(&self, key: &str) -> bool {
        let mut inner = self.lock();
        let now = Instant::now();
        let window = inner.window;
        let max = inner.max_requests;

        let timestamps = inner.requests.entry(key.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < window);

        if timestamps.len() as u32 >= max {
            return false;
        }
        timestamps.push(now);
        true
    }

    /// Forget keys with no requests inside the window.
    pub fn prune(&self) {
        let mut inner = self.lock();
        let now = Instant::now();
        let window = inner.window;
        inner
            .requests
            .retain(|_, ts| ts.iter().any(|t| now.duration_since(*t) < window));
    }
}

fn parse_proxy_list(raw: &str) -> Vec<IpAddr> {
    raw.split(',')
        .filter_map(|v| v.trim().parse().ok())
        .collect()
}

fn forwarded_chain(headers: &HeaderMap) -> Vec<IpAddr> {
    headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|v| v.trim().parse().ok())
        .collect()
}

/// First `x-forwarded-for` entry, else the peer address. Informational only
/// (recorded as the last login IP); never used as a limiter key.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|p| p.ip().to_string()))
}

pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = state.key_for(request.headers(), peer);

    if !state.check(&key) {
        tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
        let err = AppError::rate_limited("Too many requests. Please try again later.");
        return (StatusCode::TOO_MANY_REQUESTS, Json(err.to_response_body())).into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn allows_up_to_limit_then_blocks() {
        let state = RateLimitState::new(3, Duration::from_secs(60));
        assert!(state.check("1.2.3.4"));
        assert!(state.check("1.2.3.4"));
        assert!(state.check("1.2.3.4"));
        assert!(!state.check("1.2.3.4"));
        assert!(state.check("5.6.7.8"));
    }

    #[test]
    fn window_expiry_frees_slots() {
        let state = RateLimitState::new(1, Duration::from_millis(20));
        assert!(state.check("k"));
        assert!(!state.check("k"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(state.check("k"));
        std::thread::sleep(Duration::from_millis(30));
        state.prune();
        assert!(state.lock().requests.is_empty());
    }

    #[test]
    fn client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "10.0.0.9:5555".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("10.0.0.9"));

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("203.0.113.7"));
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }

    #[test]
    fn key_ignores_forwarded_for_from_untrusted_peer() {
        let state = RateLimitState::new(3, Duration::from_secs(60));
        let peer: SocketAddr = "198.51.100.20:4000".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));
        assert_eq!(state.key_for(&headers, Some(peer)), "198.51.100.20");
        assert_eq!(state.key_for(&headers, None), "unknown");
    }

    #[test]
    fn key_uses_forwarded_for_behind_trusted_proxy() {
        let state = RateLimitState::new(3, Duration::from_secs(60))
            .with_trusted_proxies(parse_proxy_list("10.0.0.1, 10.0.0.2,bogus"));
        let peer: SocketAddr = "10.0.0.1:4000".parse().unwrap();
        let mut headers = HeaderMap::new();
        // Client-supplied prefix is ignored; the proxy-appended hop wins.
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.1.1.1, 203.0.113.7, 10.0.0.2"),
        );
        assert_eq!(state.key_for(&headers, Some(peer)), "203.0.113.7");
        assert_eq!(state.key_for(&HeaderMap::new(), Some(peer)), "10.0.0.1");
    }

    #[tokio::test]
    async fn rotating_forwarded_for_does_not_reset_budget() {
        use axum::{body::Body, middleware, routing::post, Router};
        use tower::ServiceExt;

        let state = RateLimitState::new(3, Duration::from_secs(60));
        let app = Router::new()
            .route("/login", post(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(state, rate_limit_middleware));
        let peer: SocketAddr = "192.0.2.50:40000".parse().unwrap();

        let mut blocked = 0;
        for i in 0..10 {
            let mut req = axum::http::Request::builder()
                .method("POST")
                .uri("/login")
                .header("x-forwarded-for", format!("198.51.100.{i}"))
                .body(Body::empty())
                .unwrap();
            req.extensions_mut().insert(ConnectInfo(peer));
            let resp = app.clone().oneshot(req).await.unwrap();
            if resp.status() == StatusCode::TOO_MANY_REQUESTS {
                blocked += 1;
            }
        }
        assert_eq!(blocked, 7);
    }
}
