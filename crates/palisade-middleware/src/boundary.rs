//! Error boundaries for fallible stages and handlers.
//!
//! A [`Guard`] is a stage that can fail. Wrapping it in a [`Boundary`] turns
//! it into ordinary [`Middleware`]: when the guard returns an error, the
//! boundary normalizes it with an [`ErrorFormatter`] and answers with the
//! JSON body instead of continuing the chain.
//!
//! Handlers get the same treatment through [`catch`] and [`catch_with`].
//!
//! # Example
//!
//! ```
//! use palisade_core::AppError;
//! use palisade_middleware::boundary::guard_fn;
//!
//! // Rejects requests without a `x-tenant` header with a 400.
//! let tenant_required = guard_fn("tenant", |_ctx, request| {
//!     if request.headers().contains_key("x-tenant") {
//!         Ok(())
//!     } else {
//!         Err(AppError::bad_request("Missing tenant").into())
//!     }
//! });
//! ```

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};
use palisade_core::{normalize, DefaultErrorFormatter, ErrorFormatter, PipelineError, PipelineResult};
use palisade_telemetry::log_stage_rejected;
use std::future::Future;

/// A pipeline stage that may fail.
///
/// On success the guard returns the response it obtained from `next` (or
/// produced itself). On failure it returns the error untouched; the
/// surrounding [`Boundary`] decides how it is rendered.
pub trait Guard: Send + Sync + 'static {
    /// Returns the name of this stage, used in logs.
    fn name(&self) -> &'static str;

    /// Runs the guard.
    fn guard<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult<Response>>;
}

/// Adapts a [`Guard`] into [`Middleware`] by rendering its errors.
///
/// The formatter defaults to [`DefaultErrorFormatter`]; swap it with
/// [`Boundary::with_formatter`].
#[derive(Debug, Clone)]
pub struct Boundary<G, F = DefaultErrorFormatter> {
    guard: G,
    formatter: F,
}

impl<G: Guard> Boundary<G> {
    /// Wraps a guard with the default formatter.
    pub const fn new(guard: G) -> Self {
        Self {
            guard,
            formatter: DefaultErrorFormatter,
        }
    }
}

impl<G: Guard, F: ErrorFormatter> Boundary<G, F> {
    /// Replaces the error formatter.
    pub fn with_formatter<F2: ErrorFormatter>(self, formatter: F2) -> Boundary<G, F2> {
        Boundary {
            guard: self.guard,
            formatter,
        }
    }

    /// Returns the wrapped guard.
    pub const fn inner(&self) -> &G {
        &self.guard
    }
}

impl<G: Guard, F: ErrorFormatter> Middleware for Boundary<G, F> {
    fn name(&self) -> &'static str {
        self.guard.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let request_id = ctx.log_request_id().to_string();
            match self.guard.guard(ctx, request, next).await {
                Ok(response) => response,
                Err(error) => render_error(&self.formatter, self.guard.name(), &request_id, &error),
            }
        })
    }
}

/// Normalizes an error and renders it as a JSON response.
pub(crate) fn render_error<F>(formatter: &F, stage: &str, request_id: &str, error: &PipelineError) -> Response
where
    F: ErrorFormatter + ?Sized,
{
    let normalized = normalize(formatter, error);
    log_stage_rejected!(stage, request_id, normalized.status.as_u16(), error);
    Response::json(normalized.status, &normalized.to_json())
}

/// Runs a fallible handler future and renders its error, if any, with the
/// default formatter.
///
/// ```
/// use palisade_core::{AppError, PipelineError};
/// use palisade_middleware::boundary::catch;
/// use http::StatusCode;
///
/// # tokio_test::block_on(async {
/// let response = catch(async { Err(PipelineError::from(AppError::not_found("No such user"))) }).await;
/// assert_eq!(response.status(), StatusCode::NOT_FOUND);
/// # });
/// ```
pub async fn catch<Fut>(future: Fut) -> Response
where
    Fut: Future<Output = PipelineResult<Response>>,
{
    catch_with(DefaultErrorFormatter, future).await
}

/// Like [`catch`], with a custom formatter.
pub async fn catch_with<F, Fut>(formatter: F, future: Fut) -> Response
where
    F: ErrorFormatter,
    Fut: Future<Output = PipelineResult<Response>>,
{
    match future.await {
        Ok(response) => response,
        Err(error) => render_error(&formatter, "handler", "-", &error),
    }
}

/// A guard built from a synchronous check.
///
/// The check runs before the rest of the chain; `Ok(())` continues,
/// an error short-circuits.
pub struct FnGuard<F> {
    name: &'static str,
    check: F,
}

impl<F> FnGuard<F> {
    /// Creates a guard from a check function.
    pub const fn new(name: &'static str, check: F) -> Self {
        Self { name, check }
    }
}

impl<F> Guard for FnGuard<F>
where
    F: Fn(&mut MiddlewareContext, &Request) -> PipelineResult<()> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn guard<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult<Response>> {
        Box::pin(async move {
            (self.check)(ctx, &request)?;
            Ok(next.run(ctx, request).await)
        })
    }
}

/// Wraps a synchronous check in a [`Boundary`].
pub fn guard_fn<F>(name: &'static str, check: F) -> Boundary<FnGuard<F>>
where
    F: Fn(&mut MiddlewareContext, &Request) -> PipelineResult<()> + Send + Sync + 'static,
{
    Boundary::new(FnGuard::new(name, check))
}
