//! Per-invocation execution context handed through the router to every handler.

use std::time::Duration;

use chrono::{DateTime, Utc};
use http::HeaderMap;
use tokio_util::sync::{CancellationToken, DropGuard};

#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub request_id: String,
    pub deadline: Option<DateTime<Utc>>,
    pub invoked_function_arn: Option<String>,
    /// X-Ray trace header, forwarded as is.
    pub trace_id: Option<String>,
    cancellation: CancellationToken,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

impl InvocationContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            deadline: None,
            invoked_function_arn: None,
            trace_id: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn from_headers(request_id: &str, headers: &HeaderMap) -> Self {
        let deadline = header(headers, "Lambda-Runtime-Deadline-Ms")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis);

        Self {
            deadline,
            invoked_function_arn: header(headers, "Lambda-Runtime-Invoked-Function-Arn")
                .map(str::to_string),
            trace_id: header(headers, "Lambda-Runtime-Trace-Id").map(str::to_string),
            ..Self::new(request_id)
        }
    }

    /// Time left before the platform deadline; `None` when no deadline is known, zero once it
    /// has passed.
    pub fn remaining(&self) -> Option<Duration> {
        let deadline = self.deadline?;
        Some((deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }

    /// Cancelled when the deadline elapses or the invocation ends, whichever comes first.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Arms the deadline. The returned guard cancels the token when dropped, which ends the
    /// invocation from the handler's point of view.
    pub(crate) fn arm_deadline(&self) -> DropGuard {
        if let Some(remaining) = self.remaining() {
            let token = self.cancellation.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(remaining) => {
                        tracing::warn!("invocation deadline reached; cancelling");
                        token.cancel();
                    }
                    _ = token.cancelled() => {}
                }
            });
        }
        self.cancellation.clone().drop_guard()
    }
}
