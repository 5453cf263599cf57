//! Function handler module
//!
//! The function is an opaque capability invoked once per request with the
//! event and its context. Async closures, sync closures and custom types all
//! plug in through the [`Handler`] trait.
//!
//! # Example
//!
//! ```ignore
//! let state = AppState::new(config, handler_fn(|event: Event, ctx: Context| async move {
//!     ctx.set_status(StatusCode::CREATED);
//!     Ok::<_, Failure>(json!({ "path": event.path }))
//! }));
//! ```

pub mod echo;
pub mod router;

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use crate::invoke::{Context, Event, Failure, Reply};

// Re-export main entry point
pub use router::handle_request;

/// Outcome returned by a function
pub type HandlerResult = Result<Reply, Failure>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handler shared by every connection
pub type SharedHandler = Arc<dyn Handler>;

/// Trait for function handlers.
pub trait Handler: Send + Sync + 'static {
    /// Invoke the function for one request.
    fn call(&self, event: Event, ctx: Context) -> BoxFuture<'static, HandlerResult>;
}

/// Wrapper around an async closure.
pub struct FnHandler<F, Fut, R> {
    f: F,
    _phantom: PhantomData<fn() -> (Fut, R)>,
}

/// Wrap an async closure as a handler.
pub const fn handler_fn<F, Fut, R>(f: F) -> FnHandler<F, Fut, R>
where
    F: Fn(Event, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Failure>> + Send + 'static,
    R: Into<Reply> + 'static,
{
    FnHandler {
        f,
        _phantom: PhantomData,
    }
}

impl<F, Fut, R> Handler for FnHandler<F, Fut, R>
where
    F: Fn(Event, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Failure>> + Send + 'static,
    R: Into<Reply> + 'static,
{
    fn call(&self, event: Event, ctx: Context) -> BoxFuture<'static, HandlerResult> {
        let fut = (self.f)(event, ctx);
        Box::pin(async move { fut.await.map(Into::into) })
    }
}

/// Wrapper around a synchronous closure.
pub struct SyncFnHandler<F, R> {
    f: F,
    _phantom: PhantomData<fn() -> R>,
}

/// Wrap a synchronous closure as a handler.
///
/// The closure runs inside the invocation task, so a panic is still caught
/// and turned into a 500 response.
pub const fn sync_fn<F, R>(f: F) -> SyncFnHandler<F, R>
where
    F: Fn(Event, Context) -> Result<R, Failure> + Send + Sync + 'static,
    R: Into<Reply> + 'static,
{
    SyncFnHandler {
        f,
        _phantom: PhantomData,
    }
}

impl<F, R> Handler for SyncFnHandler<F, R>
where
    F: Fn(Event, Context) -> Result<R, Failure> + Send + Sync + 'static,
    R: Into<Reply> + 'static,
{
    fn call(&self, event: Event, ctx: Context) -> BoxFuture<'static, HandlerResult> {
        let outcome = (self.f)(event, ctx).map(Into::into);
        Box::pin(std::future::ready(outcome))
    }
}
