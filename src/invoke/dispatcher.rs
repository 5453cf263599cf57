//! Runs one function invocation and settles it into exactly one report.
//!
//! The function runs in its own task so a panic is observed as a failed join
//! instead of tearing down the connection. Whichever arrives first wins: an
//! explicit report through the context, or the task finishing. When the
//! report wins, the task is left running detached and its later outcome is
//! dropped by the context.

use std::any::Any;
use std::sync::Arc;

use hyper::{HeaderMap, StatusCode};
use tokio::task::JoinError;

use super::context::{Context, Report, ReportKind};
use super::event::Event;
use super::reply::Failure;
use crate::handler::SharedHandler;
use crate::logger;

/// Invoke `handler` once for `event` and return the authoritative report
pub async fn invoke(handler: &SharedHandler, event: Event) -> Report {
    let (ctx, mut reports) = Context::with_sink();

    let task = tokio::spawn({
        let handler = Arc::clone(handler);
        let ctx = ctx.clone();
        async move {
            let outcome = handler.call(event, ctx.clone()).await;
            ctx.settle(outcome);
        }
    });

    tokio::select! {
        biased;

        report = &mut reports => {
            return report.unwrap_or_else(|_| missing_report());
        }

        joined = task => {
            if let Err(err) = joined {
                ctx.settle(Err(failure_from_join(err)));
            }
        }
    }

    // The task settled the context (or we just did), so the report is ready
    reports.await.unwrap_or_else(|_| missing_report())
}

fn failure_from_join(err: JoinError) -> Failure {
    if err.is_panic() {
        let payload = err.into_panic();
        Failure::msg(format!("function panicked: {}", panic_message(payload.as_ref())))
    } else {
        Failure::msg("function task was cancelled")
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn missing_report() -> Report {
    logger::log_error("Function finished without producing a result");
    Report {
        kind: ReportKind::Unhandled,
        outcome: Err(Failure::msg("function finished without a result")),
        status: StatusCode::INTERNAL_SERVER_ERROR,
        headers: HeaderMap::new(),
    }
}
