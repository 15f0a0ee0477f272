//! Route table and dispatch.
//!
//! # Responsibilities
//! - Store routes per method, ordered most-specific-first
//! - Look up the route for a (method, path) pair
//! - Run the handler and turn every outcome into a [`Response`]
//!
//! # Design Decisions
//! - Order is decided by matcher priority, then literal length, then
//!   registration order; registration order alone never shadows a sub-route
//! - Built once at startup, immutable while serving (shared via `Arc`)
//! - Path parameters are percent-decoded exactly once before the handler sees them

use std::cmp::Reverse;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::http::error::ApiError;
use crate::http::parser::percent_decode;
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::routing::matcher::PathMatcher;

pub type HandlerResult = Result<Response, ApiError>;
pub type Handler = Arc<dyn Fn(RouteRequest) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// What a handler receives: the request plus the decoded path parameter.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    request: Arc<Request>,
    param: Option<String>,
}

impl RouteRequest {
    pub fn new(request: Arc<Request>, param: Option<String>) -> Self {
        Self { request, param }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The path parameter. Routes registered with an exact matcher have none.
    pub fn param(&self) -> Result<&str, ApiError> {
        self.param
            .as_deref()
            .ok_or_else(|| ApiError::Internal("Route has no path parameter".into()))
    }
}

struct Route {
    matcher: PathMatcher,
    handler: Handler,
    order: usize,
}

/// Per-method ordered route table.
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, Vec<Route>>,
    registered: usize,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. The table is re-sorted after every insert.
    pub fn register<F, Fut>(&mut self, method: Method, matcher: PathMatcher, handler: F)
    where
        F: Fn(RouteRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |req: RouteRequest| handler(req).boxed());
        let table = self.routes.entry(method).or_default();
        table.push(Route {
            matcher,
            handler,
            order: self.registered,
        });
        table.sort_by_key(|r| (Reverse(r.matcher.priority()), Reverse(r.matcher.specificity()), r.order));
        self.registered += 1;
    }

    /// Chaining form of [`Router::register`].
    pub fn route<F, Fut>(mut self, method: Method, matcher: PathMatcher, handler: F) -> Self
    where
        F: Fn(RouteRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(method, matcher, handler);
        self
    }

    /// Find the matcher and decoded parameter for a request target.
    pub fn lookup(&self, method: Method, path: &str) -> Option<(&PathMatcher, Option<String>)> {
        self.find(method, path)
            .map(|(route, param)| (&route.matcher, param))
    }

    fn find(&self, method: Method, path: &str) -> Option<(&Route, Option<String>)> {
        self.routes.get(&method)?.iter().find_map(|route| {
            route
                .matcher
                .matches(path)
                .map(|m| (route, m.param.map(percent_decode)))
        })
    }

    /// Dispatch a request. Always yields a response; unmatched paths are 404.
    pub async fn dispatch(&self, request: Request) -> Response {
        let method = request.method();
        let (route, param) = match self.find(method, request.path()) {
            Some(found) => found,
            None => {
                tracing::debug!(method = %method, path = %request.path(), "No route matched");
                return ApiError::RouteNotFound {
                    method,
                    path: request.path().to_string(),
                }
                .into_response();
            }
        };

        tracing::trace!(method = %method, route = %route.matcher, "Route matched");
        let handler = Arc::clone(&route.handler);
        match handler(RouteRequest::new(Arc::new(request), param)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(error = %e, status = e.status().as_u16(), "Handler returned error");
                e.into_response()
            }
        }
    }

    /// Registered routes in dispatch order.
    pub fn routes(&self) -> Vec<(Method, &PathMatcher)> {
        let mut out: Vec<(Method, &PathMatcher)> = self
            .routes
            .iter()
            .flat_map(|(method, table)| table.iter().map(move |r| (*method, &r.matcher)))
            .collect();
        out.sort_by_key(|(method, _)| *method);
        out
    }

    pub fn len(&self) -> usize {
        self.registered
    }

    pub fn is_empty(&self) -> bool {
        self.registered == 0
    }
}
