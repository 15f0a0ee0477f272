//! Per-request pipeline shared by every connection.
//!
//! ```text
//! Request
//!     → OPTIONS? answer preflight
//!     → gate closed? 403
//!     → peer over its rate? 429
//!     → router dispatch (panics become 500)
//! ```

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures_util::FutureExt;

use crate::http::error::ApiError;
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::observability::metrics;
use crate::routing::Router;
use crate::security::{AutomationGate, RateLimiter};

/// Everything a connection needs to turn a request into a response.
pub struct AutomationService {
    router: Router,
    gate: AutomationGate,
    limiter: RateLimiter,
}

impl AutomationService {
    pub fn new(router: Router, gate: AutomationGate, limiter: RateLimiter) -> Self {
        Self {
            router,
            gate,
            limiter,
        }
    }

    pub fn gate(&self) -> &AutomationGate {
        &self.gate
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub async fn handle(&self, request: Request, peer: SocketAddr) -> Response {
        let start = Instant::now();
        let method = request.method();
        let path = request.path().to_string();

        let response = self.respond(request, peer).await;

        tracing::info!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            peer_addr = %peer,
            latency_ms = start.elapsed().as_millis() as u64,
            "Request handled"
        );
        metrics::record_request(method.as_str(), response.status().as_u16(), start);
        response
    }

    async fn respond(&self, request: Request, peer: SocketAddr) -> Response {
        // Preflight is answered even while the gate is closed.
        if request.method() == Method::Options {
            return Response::preflight();
        }
        if !self.gate.is_enabled() {
            return ApiError::disabled().into_response();
        }
        if !self.limiter.check(peer.ip()) {
            return ApiError::RateLimited("Rate limit exceeded".to_string()).into_response();
        }

        match AssertUnwindSafe(self.router.dispatch(request)).catch_unwind().await {
            Ok(response) => response,
            Err(_) => {
                tracing::error!(peer_addr = %peer, "Handler panicked");
                ApiError::Internal("Internal server error".to_string()).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::http::response::StatusCode;
    use crate::routing::{PathMatcher, RouteRequest};
    use serde_json::Value;

    fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40000))
    }

    fn service(enabled: bool, rate_limit: RateLimitConfig) -> AutomationService {
        let router = Router::new()
            .route(Method::Get, PathMatcher::exact("/api/ping"), |_req: RouteRequest| async {
                Ok(Response::ok(StatusCode::Ok, &serde_json::json!({ "pong": true })))
            })
            .route(Method::Get, PathMatcher::exact("/api/boom"), |_req: RouteRequest| async {
                if true {
                    panic!("handler bug");
                }
                Ok(Response::new(StatusCode::Ok))
            });
        AutomationService::new(router, AutomationGate::new(enabled), RateLimiter::new(&rate_limit))
    }

    fn body(resp: &Response) -> Value {
        serde_json::from_slice(resp.body()).unwrap()
    }

    #[tokio::test]
    async fn preflight_bypasses_gate() {
        let svc = service(false, RateLimitConfig::default());
        let resp = svc.handle(Request::new(Method::Options, "/anything"), peer()).await;
        assert_eq!(resp.status(), StatusCode::NoContent);
        assert!(resp.body().is_empty());
    }

    #[tokio::test]
    async fn closed_gate_answers_forbidden() {
        let svc = service(false, RateLimitConfig::default());
        let resp = svc.handle(Request::new(Method::Get, "/api/ping"), peer()).await;
        assert_eq!(resp.status(), StatusCode::Forbidden);
        assert_eq!(
            body(&resp),
            serde_json::json!({ "status": "error", "error": "Automation API is disabled" })
        );

        svc.gate().set(true);
        let resp = svc.handle(Request::new(Method::Get, "/api/ping"), peer()).await;
        assert_eq!(resp.status(), StatusCode::Ok);
    }

    #[tokio::test]
    async fn rate_limit_applies_per_peer() {
        let svc = service(
            true,
            RateLimitConfig {
                enabled: true,
                requests_per_second: 1,
                burst_size: 1,
            },
        );
        let first = svc.handle(Request::new(Method::Get, "/api/ping"), peer()).await;
        assert_eq!(first.status(), StatusCode::Ok);

        let second = svc.handle(Request::new(Method::Get, "/api/ping"), peer()).await;
        assert_eq!(second.status(), StatusCode::TooManyRequests);
        assert_eq!(body(&second)["error"], "Rate limit exceeded");
    }

    #[tokio::test]
    async fn handler_panic_becomes_500() {
        let svc = service(true, RateLimitConfig::default());
        let resp = svc.handle(Request::new(Method::Get, "/api/boom"), peer()).await;
        assert_eq!(resp.status(), StatusCode::InternalServerError);
        assert_eq!(body(&resp)["status"], "error");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let svc = service(true, RateLimitConfig::default());
        let resp = svc.handle(Request::new(Method::Get, "/api/nope"), peer()).await;
        assert_eq!(resp.status(), StatusCode::NotFound);
        assert_eq!(body(&resp)["error"], "Unknown endpoint: GET /api/nope");
    }
}
