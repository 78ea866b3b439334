//! # Event Bus System
//!
//! Typed broadcast events for token refreshes and workflow progress, built on
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: [`CoreEvent`] wraps [`AuthEvent`] and [`WorkflowEvent`]
//! - **EventBus**: cloneable sender handle shared by the coordinator and the
//!   orchestrator
//! - **EventStream**: receiver wrapper with optional filtering
//!
//! Emitting never fails the emitter: with no subscribers the event is dropped.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, WorkflowEvent};
//!
//! let event_bus = EventBus::new(100);
//! let mut receiver = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Workflow(WorkflowEvent::Started {
//!         run_id: "run-1".to_string(),
//!         workflow: "checkout".to_string(),
//!     }))
//!     .ok();
//!
//! assert!(receiver.try_recv().is_ok());
//! ```
//!
//! ## Compensation hook
//!
//! [`WorkflowEvent::Failed`] lists the steps whose remote effects had already
//! happened when a pipeline aborted. Nothing is rolled back automatically; a
//! subscriber can use that list to clean up (for example delete a session that
//! was created before checkout-to-session failed).

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{self, error::RecvError, error::SendError};

pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event enum published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Auth(AuthEvent),
    Workflow(WorkflowEvent),
}

impl CoreEvent {
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Workflow(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::RefreshFailed { .. }) => EventSeverity::Error,
            CoreEvent::Workflow(WorkflowEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Auth(AuthEvent::TokenRefreshed { .. }) => EventSeverity::Info,
            CoreEvent::Workflow(WorkflowEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Error,
}

// ============================================================================
// Authentication Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// A refresh exchange was started for an expired credential.
    TokenRefreshing { subject_id: String },
    /// The credential was replaced.
    TokenRefreshed {
        subject_id: String,
        /// Unix epoch seconds
        expires_at: i64,
    },
    /// The refresh exchange failed; the holder must log in again.
    RefreshFailed { subject_id: String, message: String },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::TokenRefreshing { .. } => "Refreshing access token",
            AuthEvent::TokenRefreshed { .. } => "Token refreshed successfully",
            AuthEvent::RefreshFailed { .. } => "Token refresh failed",
        }
    }
}

// ============================================================================
// Workflow Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum WorkflowEvent {
    Started {
        run_id: String,
        /// `checkout` or `checkin`
        workflow: String,
    },
    StepCompleted { run_id: String, step: String },
    /// The pipeline stopped at `step`. `completed_steps` already took effect
    /// remotely and were not undone.
    Failed {
        run_id: String,
        step: String,
        completed_steps: Vec<String>,
        message: String,
    },
    Completed { run_id: String, workflow: String },
}

impl WorkflowEvent {
    fn description(&self) -> &str {
        match self {
            WorkflowEvent::Started { .. } => "Workflow started",
            WorkflowEvent::StepCompleted { .. } => "Workflow step completed",
            WorkflowEvent::Failed { .. } => "Workflow failed",
            WorkflowEvent::Completed { .. } => "Workflow completed",
        }
    }

    pub fn run_id(&self) -> &str {
        match self {
            WorkflowEvent::Started { run_id, .. }
            | WorkflowEvent::StepCompleted { run_id, .. }
            | WorkflowEvent::Failed { run_id, .. }
            | WorkflowEvent::Completed { run_id, .. } => run_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Events buffered per subscriber before it receives
    ///   `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none. Callers treat the error as informational.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a receiver for all future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::default();
/// let workflow_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Workflow(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once every sender is dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Drains already-buffered events that pass the filter.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        events.push(event);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return events,
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
