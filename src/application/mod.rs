//! Application layer containing the provisioning workflow.
//!
//! `ProvisioningEngine` runs one request through the group and safe steps,
//! `Escalator` owns the terminal-failure path, and `RequestDispatcher` feeds a
//! queue batch through the engine, optionally across lanes partitioned by
//! correlation id.

pub mod dispatcher;
pub mod engine;
pub mod escalation;
pub mod report;
