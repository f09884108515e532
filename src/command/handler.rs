//! Handler contract
//!
//! The application side of the framework: an object that knows which of its
//! operations are commands.

use std::sync::Arc;

use super::{CommandTableBuilder, DispatchResult};
use crate::error::Result;
use crate::protocol::Request;

/// An application object exposing commands
///
/// `register` is called exactly once, while the server is being constructed
/// and before any connection is accepted. Only the names registered there
/// become commands.
///
/// ```
/// use std::sync::Arc;
/// use bytes::Bytes;
/// use respd::command::{CommandTableBuilder, Handler};
///
/// struct Echo;
///
/// impl Handler for Echo {
///     fn register(self: Arc<Self>, commands: &mut CommandTableBuilder) -> respd::Result<()> {
///         commands.command("ECHO", |message: Bytes| message)?;
///         Ok(())
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Register every command this handler exposes
    fn register(self: Arc<Self>, commands: &mut CommandTableBuilder) -> Result<()>;
}

/// A single command as an object, for operations that carry their own name
pub trait Command: Send + Sync + 'static {
    /// Name the command is registered under (case-sensitive)
    fn name(&self) -> &str;

    /// Handle one request addressed to this command
    fn execute(&self, request: &Request) -> DispatchResult;
}

/// Handler used when the configuration supplies none: exposes no commands
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHandler;

impl Handler for DefaultHandler {
    fn register(self: Arc<Self>, _commands: &mut CommandTableBuilder) -> Result<()> {
        Ok(())
    }
}
