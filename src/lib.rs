//! # volcanic-lightning-monitor
//!
//! Polls the volcanic lightning report, turns its table into a GeoJSON
//! snapshot, pushes every snapshot to connected WebSocket subscribers and
//! keeps a one-hour expiring history of them.
//!
//! ## Architecture
//!
//! ```text
//! Scheduler (service/) ── every tick, at most one cycle in flight
//!     │
//!     ├── ReportSource (report/)      fetch HTML report
//!     ├── parse_report (report/)      table rows → EventRecords
//!     ├── Snapshot (domain/)          keys, GeoJSON features, TTL
//!     ├── Broadcaster (domain/)  ──►  /ws subscribers ("latest-update")
//!     └── SnapshotStore (persistence/)
//!             │
//!             └── REST read API (api/) and expiry sweeper (service/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod report;
pub mod service;
pub mod ws;
