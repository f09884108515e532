//! Command Module
//!
//! Builds the immutable command table a server dispatches against.
//!
//! ## Registration
//! Handlers register their commands explicitly, either as typed closures or
//! as [`Command`] objects:
//!
//! ```text
//! Handler::register ──> CommandTableBuilder ──build()──> CommandTable
//!                        (name → adapter)                 (read-only, shared)
//! ```
//!
//! Closure parameters are converted from the raw request arguments through
//! [`FromArg`] and return values are turned into replies through
//! [`IntoReply`], so an operation whose signature cannot be adapted is
//! rejected at compile time.

mod adapter;
mod handler;
mod table;

pub use adapter::{Dispatch, DispatchResult, FromArg, IntoDispatch, IntoReply};
pub use handler::{Command, DefaultHandler, Handler};
pub use table::{CommandTable, CommandTableBuilder};
