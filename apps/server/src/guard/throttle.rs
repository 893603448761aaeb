//! # レート制限ガード
//!
//! `throttled` なルートに対し、クライアント IP ごとに `THROTTLE_LIMIT` 回 / `THROTTLE_TTL` 秒の
//! トークンバケットを適用する。超過時は 429。
//!
//! 最後のリクエストから TTL 以上経過した IP のバケットは満杯に戻っているため、
//! [`Throttler::cleanup`] で破棄しても判定は変わらない。

use std::{
    num::NonZeroU32,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use crate::{
    client_ip::client_ip,
    config::ThrottleConfig,
    error::AppError,
    policy::route_policy,
    state::AppState,
};

/// この件数を超えたら `check` のついでに期限切れを掃除する
const MAX_ENTRIES: usize = 10_000;

#[derive(Debug)]
struct Bucket {
    limiter:   DefaultDirectRateLimiter,
    last_seen: Instant,
}

/// IP 単位のレートリミッタ
#[derive(Debug)]
pub struct Throttler {
    buckets: DashMap<String, Bucket>,
    /// `None` なら制限しない（TTL が 0）
    quota:   Option<Quota>,
    ttl:     Duration,
}

impl Throttler {
    pub fn new(config: &ThrottleConfig) -> Self {
        let quota = NonZeroU32::new(config.limit).and_then(|burst| {
            Quota::with_period(config.ttl / config.limit).map(|quota| quota.allow_burst(burst))
        });
        Self {
            buckets: DashMap::new(),
            quota,
            ttl: config.ttl,
        }
    }

    /// 1 リクエスト分を消費する。上限を超えていれば false
    pub fn check(&self, key: &str) -> bool {
        let Some(quota) = self.quota else {
            return true;
        };
        let now = Instant::now();
        if self.buckets.len() > MAX_ENTRIES {
            self.cleanup_at(now);
        }

        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket {
                limiter:   RateLimiter::direct(quota),
                last_seen: now,
            });
        bucket.last_seen = now;
        bucket.limiter.check().is_ok()
    }

    /// TTL 以上アクセスのない IP のバケットを破棄する
    pub fn cleanup(&self) {
        self.cleanup_at(Instant::now());
    }

    fn cleanup_at(&self, now: Instant) {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_seen) < self.ttl);
        let removed = before.saturating_sub(self.buckets.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.buckets.len(), "期限切れのレート制限バケットを破棄しました");
        }
    }

    /// 保持している IP の数
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// 掃除を回す間隔（TTL と同じ）。制限しないなら `None`
    pub fn cleanup_interval(&self) -> Option<Duration> {
        self.quota.map(|_| self.ttl)
    }
}

pub async fn throttle_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if route_policy(&request).throttled {
        let ip = client_ip(&request, state.config.trust_proxy);
        if !state.throttler.check(&ip) {
            tracing::warn!(ip = %ip, path = request.uri().path(), "レート制限を超過しました");
            return Err(AppError::TooManyRequests);
        }
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::{Router, body::Body, http::StatusCode, middleware::from_fn_with_state, routing::post};
    use maplit::hashmap;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        policy::RoutePolicy,
        test_support::{TestContext, test_config, with_policy},
    };

    fn throttler(limit: u32, ttl_secs: u64) -> Throttler {
        Throttler::new(&ThrottleConfig {
            ttl: Duration::from_secs(ttl_secs),
            limit,
        })
    }

    #[test]
    fn test_上限回数までは許可する() {
        let sut = throttler(3, 60);

        assert!(sut.check("10.0.0.1"));
        assert!(sut.check("10.0.0.1"));
        assert!(sut.check("10.0.0.1"));
        assert!(!sut.check("10.0.0.1"));
    }

    #[test]
    fn test_ipごとに独立して数える() {
        let sut = throttler(1, 60);

        assert!(sut.check("10.0.0.1"));
        assert!(sut.check("10.0.0.2"));
        assert!(!sut.check("10.0.0.1"));
    }

    #[test]
    fn test_ttlが0なら制限しない() {
        let sut = throttler(1, 0);

        assert!(sut.check("10.0.0.1"));
        assert!(sut.check("10.0.0.1"));
        assert!(sut.is_empty());
        assert_eq!(sut.cleanup_interval(), None);
    }

    #[test]
    fn test_ttl以上アクセスのないipは掃除で破棄される() {
        let sut = throttler(1, 60);
        assert!(sut.check("10.0.0.1"));
        assert!(sut.check("10.0.0.2"));

        sut.cleanup_at(Instant::now() + Duration::from_secs(61));

        assert!(sut.is_empty());
    }

    #[test]
    fn test_ttl以内にアクセスしたipは掃除後も制限が続く() {
        let sut = throttler(1, 60);
        assert!(sut.check("10.0.0.1"));

        sut.cleanup();

        assert_eq!(sut.len(), 1);
        assert!(!sut.check("10.0.0.1"));
    }

    fn create_test_app(policy: RoutePolicy, trust_proxy: &'static str) -> Router {
        let ctx = TestContext::with_config(test_config(hashmap! {
            "THROTTLE_LIMIT" => "2",
            "TRUST_PROXY" => trust_proxy,
        }));
        let router = Router::new()
            .route("/login", post(|| async {}))
            .layer(from_fn_with_state(ctx.state, throttle_guard));
        with_policy(router, policy)
    }

    fn request_from(ip: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/login")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_上限を超えると429() {
        let app = create_test_app(RoutePolicy::public().throttled(), "true");

        let mut statuses = Vec::new();
        for _ in 0..3 {
            let response = app.clone().oneshot(request_from("203.0.113.1")).await.unwrap();
            statuses.push(response.status());
        }

        assert_eq!(
            statuses,
            vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
        );
    }

    #[tokio::test]
    async fn test_throttledでないルートは制限しない() {
        let app = create_test_app(RoutePolicy::public(), "true");

        for _ in 0..5 {
            let response = app.clone().oneshot(request_from("203.0.113.1")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_プロキシを信頼しないときは転送ヘッダーを変えても同じ接続元として数える() {
        let app = create_test_app(RoutePolicy::public().throttled(), "false");

        let mut statuses = Vec::new();
        for ip in ["203.0.113.1", "203.0.113.2", "203.0.113.3"] {
            let response = app.clone().oneshot(request_from(ip)).await.unwrap();
            statuses.push(response.status());
        }

        assert_eq!(
            statuses,
            vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
        );
    }
}
