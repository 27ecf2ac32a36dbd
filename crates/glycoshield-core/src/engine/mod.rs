//! # Engine Module
//!
//! The stateful layer between the data models in [`crate::core`] and the
//! workflows. It holds stage configuration, the pipeline state machine, the
//! conformer generator seam and the stage tasks themselves.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Validated parameters for each stage
//! - **State Tracking** ([`state`]) - Stage flags and the lock-free status handle
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Cancellation** ([`cancel`]) - Cooperative cancellation checked between work items
//! - **Error Handling** ([`error`]) - Engine-specific error types
//! - **Tasks** ([`tasks`]) - Shield generation, trajectory merge and differential SASA
//!
//! Work items fan out through a single pool helper and are joined before a
//! stage returns, so no stage ever overlaps another.

pub mod cancel;
pub mod config;
pub mod error;
pub mod generator;
pub(crate) mod pool;
pub mod progress;
pub mod state;
pub mod tasks;
pub mod tools;

#[cfg(test)]
pub(crate) mod fixtures;
