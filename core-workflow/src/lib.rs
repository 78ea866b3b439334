//! # Workflow Module
//!
//! Checkout and checkin pipelines between a Studio Project and a Studio
//! Session.
//!
//! ## Overview
//!
//! - **Checkout**: upload a file into a project, open a session and check
//!   the file out into it.
//! - **Checkin**: finalize the session, wait for its merged snapshot,
//!   delete the session, then check the snapshot in as a new revision,
//!   flatten it and create a share link.
//!
//! Both are strictly sequential and stop at the first failing step. The
//! snapshot wait uses [`poller::poll_until_terminal`], bounded by a
//! configurable ceiling.
//!
//! ## Components
//!
//! - [`WorkflowOrchestrator`]: runs the pipelines
//! - [`poller`]: generic status polling with cancellation
//! - [`context`]: workflow inputs, outputs and per-step accumulators

mod checkin;
mod checkout;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod poller;

pub use context::{
    CheckinRequest, CheckinResult, CheckoutRequest, CheckoutResult, WorkflowKind, WorkflowStep,
};
pub use error::{Result, WorkflowError};
pub use orchestrator::{WorkflowConfig, WorkflowOrchestrator};
pub use poller::{poll_until_terminal, PollConfig, PollError};
pub use tokio_util::sync::CancellationToken;
