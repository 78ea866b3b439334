//! # Workflow Orchestrator
//!
//! Runs the checkout and checkin pipelines against a [`StudioApi`].
//!
//! ## Semantics
//!
//! - Steps run strictly in order; step N+1 is issued only after step N's
//!   remote effect completed.
//! - The first failing step ends the run and its error is returned as-is.
//!   Nothing is retried.
//! - Completed steps are never rolled back. The `Failed` workflow event lists
//!   them so a subscriber can compensate if it wants to.
//! - Every authenticated step asks the [`TokenRefreshCoordinator`] for a
//!   credential first, so a token that expires mid-run is refreshed.
//! - Cancelling the token aborts the run at its next suspension point.
//!
//! ## Usage
//!
//! ```ignore
//! let orchestrator = WorkflowOrchestrator::new(api, WorkflowConfig::default())
//!     .with_event_bus(event_bus.clone());
//!
//! let checkout = orchestrator
//!     .run_checkout_workflow(&coordinator, request, &CancellationToken::new())
//!     .await?;
//! let checkin = orchestrator
//!     .run_checkin_workflow(&coordinator, checkout.into(), &CancellationToken::new())
//!     .await?;
//! println!("{}", checkin.share_link);
//! ```

use crate::context::{WorkflowKind, WorkflowStep};
use crate::error::{Result, WorkflowError};
use crate::poller::PollConfig;
use bridge_traits::time::{Clock, SystemClock};
use chrono::{DateTime, Months, Utc};
use core_runtime::config::{
    RoundtripConfig, DEFAULT_CHECKIN_COMMENT, DEFAULT_SESSION_LENGTH_MONTHS,
    DEFAULT_SNAPSHOT_POLL_CEILING, DEFAULT_SNAPSHOT_POLL_INTERVAL,
};
use core_runtime::events::{CoreEvent, EventBus, WorkflowEvent};
use provider_studio::StudioApi;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    pub snapshot_poll: PollConfig,
    /// New sessions end this many calendar months after creation.
    pub session_length_months: u32,
    pub checkin_comment: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            snapshot_poll: PollConfig::new(
                DEFAULT_SNAPSHOT_POLL_INTERVAL,
                Some(DEFAULT_SNAPSHOT_POLL_CEILING),
            ),
            session_length_months: DEFAULT_SESSION_LENGTH_MONTHS,
            checkin_comment: DEFAULT_CHECKIN_COMMENT.to_string(),
        }
    }
}

impl From<&RoundtripConfig> for WorkflowConfig {
    fn from(config: &RoundtripConfig) -> Self {
        Self {
            snapshot_poll: PollConfig::new(
                config.snapshot_poll_interval,
                config.snapshot_poll_ceiling,
            ),
            session_length_months: config.session_length_months,
            checkin_comment: config.checkin_comment.clone(),
        }
    }
}

pub struct WorkflowOrchestrator {
    pub(crate) api: Arc<dyn StudioApi>,
    pub(crate) config: WorkflowConfig,
    clock: Arc<dyn Clock>,
    pub(crate) event_bus: Option<EventBus>,
}

impl WorkflowOrchestrator {
    pub fn new(api: Arc<dyn StudioApi>, config: WorkflowConfig) -> Self {
        Self {
            api,
            config,
            clock: Arc::new(SystemClock),
            event_bus: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub(crate) fn session_end_date(&self) -> Result<DateTime<Utc>> {
        session_end_date(self.clock.now(), self.config.session_length_months)
    }
}

/// `now` plus whole calendar months, clamped to the last day of the month.
pub(crate) fn session_end_date(now: DateTime<Utc>, months: u32) -> Result<DateTime<Utc>> {
    now.checked_add_months(Months::new(months)).ok_or_else(|| {
        WorkflowError::InvalidInput(format!(
            "session end date {} months out is not representable",
            months
        ))
    })
}

/// Bookkeeping for one run: step outcomes, events and cancellation.
pub(crate) struct RunTracker<'a> {
    run_id: String,
    kind: WorkflowKind,
    completed: Vec<WorkflowStep>,
    event_bus: Option<&'a EventBus>,
    cancel: &'a CancellationToken,
}

impl<'a> RunTracker<'a> {
    pub fn start(
        kind: WorkflowKind,
        event_bus: Option<&'a EventBus>,
        cancel: &'a CancellationToken,
    ) -> Self {
        let run_id = Uuid::new_v4().to_string();
        info!(run_id = %run_id, workflow = %kind, "Workflow started");

        let tracker = Self {
            run_id,
            kind,
            completed: Vec::new(),
            event_bus,
            cancel,
        };
        tracker.emit(WorkflowEvent::Started {
            run_id: tracker.run_id.clone(),
            workflow: kind.as_str().to_string(),
        });
        tracker
    }

    /// Run one step unless the run is already cancelled.
    pub async fn step<T, F>(&mut self, step: WorkflowStep, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let cancel = self.cancel;
        let outcome = if cancel.is_cancelled() {
            Err(WorkflowError::Cancelled { step })
        } else {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(WorkflowError::Cancelled { step }),
                result = work => result,
            }
        };

        match outcome {
            Ok(value) => {
                debug!(run_id = %self.run_id, step = %step, "Workflow step completed");
                self.completed.push(step);
                self.emit(WorkflowEvent::StepCompleted {
                    run_id: self.run_id.clone(),
                    step: step.as_str().to_string(),
                });
                Ok(value)
            }
            Err(err) => {
                warn!(
                    run_id = %self.run_id,
                    workflow = %self.kind,
                    step = %step,
                    completed = self.completed.len(),
                    error = %err,
                    "Workflow aborted"
                );
                self.emit(WorkflowEvent::Failed {
                    run_id: self.run_id.clone(),
                    step: step.as_str().to_string(),
                    completed_steps: self
                        .completed
                        .iter()
                        .map(|s| s.as_str().to_string())
                        .collect(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    pub fn finish(self) {
        info!(run_id = %self.run_id, workflow = %self.kind, "Workflow completed");
        self.emit(WorkflowEvent::Completed {
            run_id: self.run_id.clone(),
            workflow: self.kind.as_str().to_string(),
        });
    }

    fn emit(&self, event: WorkflowEvent) {
        if let Some(bus) = self.event_bus {
            let _ = bus.emit(CoreEvent::Workflow(event));
        }
    }
}
