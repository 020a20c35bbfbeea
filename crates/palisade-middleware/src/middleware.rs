//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that every pipeline stage
//! implements. A stage sees the request before the handler does and the
//! response after it; it may also answer the request itself and never call
//! the rest of the chain.
//!
//! Stages that can fail should implement [`Guard`](crate::boundary::Guard)
//! instead and be wrapped in a [`Boundary`](crate::boundary::Boundary), which
//! turns their errors into JSON responses.
//!
//! # Example
//!
//! ```
//! use palisade_middleware::{BoxFuture, Middleware, MiddlewareContext, Next, Request, Response};
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             let response = next.run(ctx, request).await;
//!             tracing::debug!(elapsed = ?ctx.elapsed(), "request finished");
//!             response
//!         })
//!     }
//! }
//! ```

use crate::context::MiddlewareContext;
use crate::types::{Request, Response};
use std::future::Future;
use std::pin::Pin;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core middleware trait.
///
/// Middleware receives a mutable context, the incoming request, and a
/// [`Next`] callback to invoke the rest of the chain.
///
/// # Invariants
///
/// - Middleware calls `next.run()` at most once
/// - A stage that answers the request itself must not call `next.run()`
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this stage, used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request through this stage.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;
}

/// Callback to invoke the rest of the chain.
///
/// Consumed by [`Next::run`], so a stage cannot continue the chain twice.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(Box<dyn FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that invokes the given middleware.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the handler.
    pub(crate) fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next stage or the handler.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> Response {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;

    #[derive(Debug, Clone, PartialEq)]
    struct Visited(Vec<&'static str>);

    struct RecordingMiddleware {
        name: &'static str,
    }

    impl Middleware for RecordingMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                let mut visited = ctx
                    .get_extension::<Visited>()
                    .cloned()
                    .unwrap_or(Visited(Vec::new()));
                visited.0.push(self.name);
                ctx.set_extension(visited);
                next.run(ctx, request).await
            })
        }
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn ok_handler<'a>() -> Next<'a> {
        Next::handler(|_ctx, _req| {
            Box::pin(async { Response::text(StatusCode::OK, "OK") })
        })
    }

    #[tokio::test]
    async fn test_next_handler() {
        let mut ctx = MiddlewareContext::new();
        let response = ok_handler().run(&mut ctx, request()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_chain_runs_in_order() {
        let first = RecordingMiddleware { name: "first" };
        let second = RecordingMiddleware { name: "second" };
        assert_eq!(first.name(), "first");

        let mut ctx = MiddlewareContext::new();
        let next = Next::new(&first, Next::new(&second, ok_handler()));

        let response = next.run(&mut ctx, request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            ctx.get_extension::<Visited>(),
            Some(&Visited(vec!["first", "second"]))
        );
    }
}
