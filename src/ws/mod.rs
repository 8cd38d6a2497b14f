//! WebSocket layer: the subscriber channel.
//!
//! The endpoint at `/ws` registers each connection with the
//! [`crate::domain::Broadcaster`] and streams every new snapshot to it as a
//! `latest-update` message.

pub mod connection;
pub mod handler;
pub mod messages;
