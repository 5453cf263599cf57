//! Invocation context handed to the function alongside the event.
//!
//! The context accumulates the response status and headers and carries the
//! one-shot result sink. Only the first report (`succeed`, `fail`, or the
//! function's own return value) reaches the dispatcher; the response is built
//! from a snapshot taken at that moment, so later mutations have no effect.
//!
//! # Example
//!
//! ```ignore
//! async fn find_user(event: Event, ctx: Context) -> Result<Reply, Failure> {
//!     match lookup(event.query.get("id")).await {
//!         Some(user) => ctx.succeed(Reply::json(&user)?),
//!         None => ctx.set_status(StatusCode::NOT_FOUND).fail("no such user"),
//!     }
//!     Ok(Reply::Empty)
//! }
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hyper::{HeaderMap, StatusCode};
use tokio::sync::oneshot;

use super::reply::{Failure, Reply};
use crate::logger;

/// How a report came about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Explicit `succeed`
    Succeeded,
    /// Explicit `fail`
    Failed,
    /// The function returned a value without reporting
    Returned,
    /// The function returned an error or panicked without reporting
    Unhandled,
}

impl ReportKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeed",
            Self::Failed => "fail",
            Self::Returned => "return",
            Self::Unhandled => "unhandled failure",
        }
    }
}

/// One reported outcome plus the response metadata at reporting time
#[derive(Debug)]
pub struct Report {
    pub kind: ReportKind,
    pub outcome: Result<Reply, Failure>,
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Receiving end of the result sink
pub type ReportReceiver = oneshot::Receiver<Report>;

struct State {
    /// `None` until the function sets a status explicitly
    status: Option<StatusCode>,
    headers: HeaderMap,
    reports: u32,
    sink: Option<oneshot::Sender<Report>>,
}

/// Per-request invocation context
///
/// Cheap to clone; every clone refers to the same request.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Mutex<State>>,
}

impl Context {
    /// Create a context and the receiver its first report is delivered to
    pub fn with_sink() -> (Self, ReportReceiver) {
        let (tx, rx) = oneshot::channel();
        let ctx = Self {
            inner: Arc::new(Mutex::new(State {
                status: None,
                headers: HeaderMap::new(),
                reports: 0,
                sink: Some(tx),
            })),
        };
        (ctx, rx)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current status, 200 unless set
    pub fn status(&self) -> StatusCode {
        self.state().status.unwrap_or(StatusCode::OK)
    }

    /// Set the response status
    ///
    /// Ignored once a result has been reported.
    pub fn set_status(&self, status: StatusCode) -> &Self {
        let mut state = self.state();
        if state.reports > 0 {
            drop(state);
            logger::log_warning(&format!(
                "status {status} set after the result was reported; ignored"
            ));
            return self;
        }
        state.status = Some(status);
        self
    }

    /// Current response headers
    pub fn headers(&self) -> HeaderMap {
        self.state().headers.clone()
    }

    /// Replace the response headers wholesale
    ///
    /// Ignored once a result has been reported.
    pub fn set_headers(&self, headers: HeaderMap) -> &Self {
        let mut state = self.state();
        if state.reports > 0 {
            drop(state);
            logger::log_warning("headers set after the result was reported; ignored");
            return self;
        }
        state.headers = headers;
        self
    }

    /// Number of results reported so far
    pub fn report_count(&self) -> u32 {
        self.state().reports
    }

    /// Report a successful result
    pub fn succeed(&self, reply: impl Into<Reply>) {
        self.report(ReportKind::Succeeded, Ok(reply.into()));
    }

    /// Report a failure
    ///
    /// The status becomes 500 unless the function already set one.
    pub fn fail(&self, error: impl fmt::Display) {
        self.report(ReportKind::Failed, Err(Failure::msg(error)));
    }

    /// Settle the invocation with the function's own outcome
    ///
    /// Only takes effect when nothing was reported yet; otherwise the first
    /// report already stands and this outcome is dropped.
    pub(crate) fn settle(&self, outcome: Result<Reply, Failure>) {
        let kind = if outcome.is_ok() {
            ReportKind::Returned
        } else {
            ReportKind::Unhandled
        };
        self.report(kind, outcome);
    }

    fn report(&self, kind: ReportKind, outcome: Result<Reply, Failure>) {
        let implicit = matches!(kind, ReportKind::Returned | ReportKind::Unhandled);
        let mut state = self.state();

        // Implicit outcomes never count once anything was reported
        if implicit && state.reports > 0 {
            drop(state);
            if let Err(failure) = outcome {
                logger::log_debug(&format!(
                    "function failed after reporting its result; ignored: {failure}"
                ));
            }
            return;
        }

        state.reports += 1;
        if state.reports > 1 {
            let count = state.reports;
            drop(state);
            logger::log_error(&format!(
                "Protocol violation: result reported {count} times (latest via {}); \
                 only the first report is sent",
                kind.as_str()
            ));
            return;
        }

        if let (ReportKind::Unhandled, Err(failure)) = (kind, &outcome) {
            logger::log_error(&format!("Unhandled function failure: {failure}"));
        }

        let status = match kind {
            ReportKind::Failed => *state.status.get_or_insert(StatusCode::INTERNAL_SERVER_ERROR),
            ReportKind::Unhandled => {
                state.status = Some(StatusCode::INTERNAL_SERVER_ERROR);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ReportKind::Succeeded | ReportKind::Returned => {
                state.status.unwrap_or(StatusCode::OK)
            }
        };

        let report = Report {
            kind,
            outcome,
            status,
            headers: state.headers.clone(),
        };

        if let Some(sink) = state.sink.take() {
            drop(state);
            if sink.send(report).is_err() {
                logger::log_debug("result reported after the request was abandoned");
            }
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Context")
            .field("status", &state.status)
            .field("headers", &state.headers)
            .field("reports", &state.reports)
            .finish_non_exhaustive()
    }
}
