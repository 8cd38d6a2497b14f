//! Service layer: the polling pipeline and background maintenance.
//!
//! [`Scheduler`] drives [`Pipeline`] cycles on a fixed interval; the
//! expiry sweeper keeps the store free of items past their TTL.

pub mod expiry;
pub mod scheduler;

pub use expiry::{spawn_expiry_sweeper, sweep_once};
pub use scheduler::{CycleReport, Pipeline, RetryPolicy, Scheduler, SchedulerStats};
