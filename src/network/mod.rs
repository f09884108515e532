//! Network Module
//!
//! Listener, per-connection sessions and the server that ties them together.
//!
//! ## Architecture
//! - One acceptor loop polling a non-blocking listener
//! - One thread per accepted connection (capped by `max_connections`)
//! - Requests dispatched through the shared, read-only command table

mod listener;
mod connection;
mod server;

pub use listener::{Listener, Stream};
pub use connection::{Connection, SessionContext};
pub use server::{Server, ServerHandle};
