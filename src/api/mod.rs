//! Automation API.
//!
//! # Data Flow
//! ```text
//! Router match (method + path)
//!     → handlers.rs (parse body via payloads.rs, classify identifiers)
//!     → Library command
//!     → {"status":"ok", ...} or ApiError
//! ```
//!
//! # Routes
//! Fixed subpaths (`/api/papers/tags`) are exact routes and therefore win
//! over the `/api/papers/{id}` prefix route. Identifiers in the path may
//! contain `/` (DOIs); the prefix matcher keeps everything after the prefix.

pub mod handlers;
pub mod payloads;

use std::future::Future;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use crate::http::request::Method;
use crate::library::Library;
use crate::routing::{HandlerResult, PathMatcher, RouteRequest, Router};

/// Facts about the running server that handlers report.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    port: Arc<AtomicU16>,
}

impl ServerInfo {
    /// Bound port, or 0 while stopped.
    pub fn port(&self) -> u16 {
        self.port.load(Ordering::Relaxed)
    }

    pub fn set_port(&self, port: u16) {
        self.port.store(port, Ordering::Relaxed);
    }
}

/// State shared by every handler.
#[derive(Clone)]
pub struct ApiContext {
    pub library: Arc<dyn Library>,
    pub info: ServerInfo,
}

fn bind<F, Fut>(ctx: &ApiContext, handler: F) -> impl Fn(RouteRequest) -> Fut + Send + Sync + 'static
where
    F: Fn(ApiContext, RouteRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let ctx = ctx.clone();
    move |req: RouteRequest| handler(ctx.clone(), req)
}

/// Build the automation route table.
pub fn routes(library: Arc<dyn Library>, info: ServerInfo) -> Router {
    let ctx = ApiContext { library, info };
    let mut router = Router::new();

    router.register(Method::Get, PathMatcher::exact("/api/status"), bind(&ctx, handlers::status));
    router.register(Method::Get, PathMatcher::exact("/api/identify"), bind(&ctx, handlers::identify));

    router.register(Method::Get, PathMatcher::exact("/api/papers"), bind(&ctx, handlers::search_papers));
    router.register(Method::Post, PathMatcher::exact("/api/papers"), bind(&ctx, handlers::add_papers));
    router.register(Method::Delete, PathMatcher::exact("/api/papers"), bind(&ctx, handlers::delete_papers));
    router.register(Method::Put, PathMatcher::exact("/api/papers/tags"), bind(&ctx, handlers::update_tags));
    router.register(Method::Put, PathMatcher::exact("/api/papers/read"), bind(&ctx, handlers::set_read));
    router.register(Method::Put, PathMatcher::exact("/api/papers/star"), bind(&ctx, handlers::set_starred));

    router.register(
        Method::Get,
        PathMatcher::prefix_suffix("/api/papers/", "/comments"),
        bind(&ctx, handlers::comments),
    );
    router.register(
        Method::Post,
        PathMatcher::prefix_suffix("/api/papers/", "/comments"),
        bind(&ctx, handlers::add_comment),
    );
    router.register(
        Method::Get,
        PathMatcher::prefix_suffix("/api/papers/", "/annotations"),
        bind(&ctx, handlers::annotations),
    );
    router.register(Method::Get, PathMatcher::prefix("/api/papers/"), bind(&ctx, handlers::paper));

    router.register(Method::Get, PathMatcher::exact("/api/collections"), bind(&ctx, handlers::collections));
    router.register(
        Method::Post,
        PathMatcher::exact("/api/collections"),
        bind(&ctx, handlers::create_collection),
    );
    router.register(
        Method::Get,
        PathMatcher::prefix_suffix("/api/collections/", "/papers"),
        bind(&ctx, handlers::collection_papers),
    );
    router.register(
        Method::Post,
        PathMatcher::prefix_suffix("/api/collections/", "/papers"),
        bind(&ctx, handlers::add_to_collection),
    );
    router.register(
        Method::Delete,
        PathMatcher::prefix_suffix("/api/collections/", "/papers"),
        bind(&ctx, handlers::remove_from_collection),
    );
    router.register(
        Method::Delete,
        PathMatcher::prefix("/api/collections/"),
        bind(&ctx, handlers::delete_collection),
    );

    router.register(Method::Get, PathMatcher::exact("/api/tags"), bind(&ctx, handlers::tags));

    router
}
