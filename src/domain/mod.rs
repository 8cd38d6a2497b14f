//! Domain layer: event records, snapshots, and subscriber fan-out.
//!
//! This module contains the lightning data model produced by each polling
//! cycle and the broadcaster that delivers it to live subscribers.

pub mod broadcaster;
pub mod event_record;
pub mod snapshot;
pub mod subscriber_id;

pub use broadcaster::{Broadcaster, Subscription};
pub use event_record::{Coordinates, EventRecord, Severity};
pub use snapshot::Snapshot;
pub use subscriber_id::SubscriberId;
