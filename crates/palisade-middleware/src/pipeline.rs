//! Caller-ordered middleware pipeline.
//!
//! A [`Pipeline`] is an immutable list of stages that every request flows
//! through before it reaches the handler. Stages run in the order they were
//! added; the usual arrangement is
//!
//! 1. **Request ID** - tag the request and its response
//! 2. **Rate limit** - reject abusive clients early
//! 3. **Auth guard** - verify the credential and attach claims
//! 4. **Authorize** - check the role claim
//! 5. **Validate** - check the body, query or headers against a schema
//!
//! but nothing enforces it. A stage may answer the request itself, in which
//! case the remaining stages and the handler never run.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};
use std::fmt;
use std::sync::Arc;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// An ordered middleware pipeline.
///
/// # Example
///
/// ```
/// use palisade_middleware::{Pipeline, MiddlewareContext, Request, Response, ResponseExt};
/// use palisade_middleware::stages::RequestIdMiddleware;
/// use bytes::Bytes;
/// use http::StatusCode;
/// use http_body_util::Full;
///
/// # tokio_test::block_on(async {
/// let pipeline = Pipeline::builder()
///     .stage(RequestIdMiddleware::new())
///     .build();
///
/// let request: Request = http::Request::new(Full::new(Bytes::new()));
/// let response = pipeline
///     .process(MiddlewareContext::new(), request, |_ctx, _req| {
///         Box::pin(async { Response::text(StatusCode::OK, "hello") })
///     })
///     .await;
///
/// assert!(response.headers().contains_key("x-request-id"));
/// # });
/// ```
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Processes a request through every stage, then the handler.
    pub async fn process<H>(&self, mut ctx: MiddlewareContext, request: Request, handler: H) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        let next = self.build_chain(handler);
        next.run(&mut ctx, request).await
    }

    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        let mut next = Next::handler(handler);
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns the names of all stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if the pipeline has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Builder for constructing a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared stage.
    ///
    /// The same stage instance can sit in several pipelines, for example one
    /// rate limiter shared by a group of routes.
    #[must_use]
    pub fn shared_stage(mut self, middleware: BoxedMiddleware) -> Self {
        self.stages.push(middleware);
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}
