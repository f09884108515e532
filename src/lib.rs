//! # respd
//!
//! A framework for building servers that speak the Redis protocol, without
//! fixing what the commands do:
//! - Explicit, type-checked command registration
//! - TCP and Unix socket transports
//! - One request/reply session per connection
//! - Cooperative, latency-bounded shutdown
//! - Monitor feed of executed commands
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Acceptor (Listener)                        │
//! │              (TCP or Unix, polls shutdown)                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ one thread per connection
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Session (Connection)                         │
//! │        read request → dispatch → write reply                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ CommandTable│          │   Monitor   │
//!   │ (read-only) │          │  (fan-out)  │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use parking_lot::Mutex;
//! use respd::command::{CommandTableBuilder, Handler};
//! use respd::{Config, Server};
//!
//! #[derive(Default)]
//! struct Store(Mutex<HashMap<Bytes, Bytes>>);
//!
//! impl Handler for Store {
//!     fn register(self: Arc<Self>, commands: &mut CommandTableBuilder) -> respd::Result<()> {
//!         let store = Arc::clone(&self);
//!         commands.command("GET", move |key: Bytes| store.0.lock().get(&key).cloned())?;
//!         commands.command("SET", move |key: Bytes, value: Bytes| {
//!             self.0.lock().insert(key, value);
//!         })?;
//!         Ok(())
//!     }
//! }
//!
//! let config = Config::builder().port(6389).handler(Store::default()).build();
//! let server = Server::new(config)?;
//! server.listen_and_serve()?;
//! # Ok::<(), respd::RespdError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod command;
pub mod monitor;
pub mod shutdown;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DispatchError, RespdError, Result};
pub use config::{Config, Transport};
pub use command::{Command, CommandTable, CommandTableBuilder, Handler};
pub use network::{Server, ServerHandle};
pub use protocol::{Reply, Request};
pub use shutdown::{ShutdownSignal, ShutdownState};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of respd
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
