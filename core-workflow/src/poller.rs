//! # Job Poller
//!
//! Polls a remote job until it reaches a terminal state.
//!
//! The check runs immediately, then once per `interval` until `is_error` or
//! `is_complete` accepts the observed status. A failing check ends the poll at
//! once; it is not retried. Before sleeping, the poller refuses to start a
//! wait that would carry it past `max_wait` and reports
//! [`PollError::TimedOut`] instead.
//!
//! Cancellation is observed while a check is in flight and while sleeping.
//! A poll cancelled during its sleep never issues another check.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// `None` polls until a terminal state, however long that takes.
    pub max_wait: Option<Duration>,
}

impl PollConfig {
    pub fn new(interval: Duration, max_wait: Option<Duration>) -> Self {
        Self { interval, max_wait }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError<T, E> {
    /// The status check itself failed.
    Check(E),
    /// The job reached its error state; carries the status observed.
    JobFailed(T),
    TimedOut { elapsed: Duration },
    Cancelled,
}

/// Drive `check` until the job is terminal.
///
/// Returns the completing status. `is_error` is evaluated before
/// `is_complete`.
pub async fn poll_until_terminal<T, E, F, Fut>(
    mut check: F,
    is_error: impl Fn(&T) -> bool,
    is_complete: impl Fn(&T) -> bool,
    config: PollConfig,
    cancel: &CancellationToken,
) -> Result<T, PollError<T, E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            result = check() => result.map_err(PollError::Check)?,
        };

        if is_error(&status) {
            debug!(attempt, "Polled job failed");
            return Err(PollError::JobFailed(status));
        }
        if is_complete(&status) {
            debug!(attempt, elapsed_ms = started.elapsed().as_millis() as u64, "Polled job complete");
            return Ok(status);
        }

        let elapsed = started.elapsed();
        if let Some(max_wait) = config.max_wait {
            if elapsed + config.interval > max_wait {
                return Err(PollError::TimedOut { elapsed });
            }
        }

        debug!(attempt, interval_ms = config.interval.as_millis() as u64, "Job not terminal; waiting");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            _ = sleep(config.interval) => {}
        }
    }
}
