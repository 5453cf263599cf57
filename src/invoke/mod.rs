//! Invocation core
//!
//! Event and context protocol, dispatch of one function call, and the policy
//! that turns the reported result into a response.

pub mod context;
pub mod dispatcher;
pub mod event;
pub mod reply;
pub mod serializer;

pub use context::{Context, Report, ReportKind, ReportReceiver};
pub use dispatcher::invoke;
pub use event::{Body, Event, Method, Params};
pub use reply::{Failure, Reply};
pub use serializer::build_response;
