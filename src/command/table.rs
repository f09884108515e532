//! Command table
//!
//! The name → adapter mapping, mutable only while it is being built.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::adapter::raw_dispatch;
use super::{Command, Dispatch, DispatchResult, Handler, IntoDispatch, IntoReply};
use crate::error::{DispatchError, RespdError, Result};
use crate::protocol::Request;

/// Collects registrations for a [`CommandTable`]
///
/// Registering a name twice replaces the earlier adapter.
#[derive(Default)]
pub struct CommandTableBuilder {
    commands: HashMap<String, Dispatch>,
}

impl CommandTableBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed operation under `name`
    ///
    /// Parameters are converted from the request arguments in order and the
    /// argument count must match the operation's parameter count.
    pub fn command<Args, F>(&mut self, name: &str, operation: F) -> Result<&mut Self>
    where
        F: IntoDispatch<Args>,
    {
        validate_name(name)?;
        let dispatch = operation.into_dispatch(name);
        self.insert(name, dispatch);
        Ok(self)
    }

    /// Register an operation that receives the whole request
    pub fn raw<F, R>(&mut self, name: &str, operation: F) -> Result<&mut Self>
    where
        F: Fn(&Request) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        validate_name(name)?;
        self.insert(name, raw_dispatch(operation));
        Ok(self)
    }

    /// Register a [`Command`] object under its own name
    pub fn register<C: Command>(&mut self, command: C) -> Result<&mut Self> {
        let name = command.name().to_string();
        validate_name(&name)?;
        let command = Arc::new(command);
        self.insert(&name, Arc::new(move |request: &Request| command.execute(request)));
        Ok(self)
    }

    /// Number of distinct names registered so far
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Freeze into an immutable table
    pub fn build(self) -> CommandTable {
        CommandTable {
            commands: self.commands,
        }
    }

    fn insert(&mut self, name: &str, dispatch: Dispatch) {
        if self.commands.insert(name.to_string(), dispatch).is_some() {
            tracing::debug!("Command {} registered again, keeping the latest", name);
        } else {
            tracing::debug!("Registered command {}", name);
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RespdError::Config("command name must not be empty".to_string()));
    }
    if name.contains(char::REPLACEMENT_CHARACTER) {
        return Err(RespdError::Config(format!(
            "invalid command name {:?}: the replacement character is reserved for undecodable names",
            name
        )));
    }
    if name.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control()) {
        return Err(RespdError::Config(format!(
            "invalid command name {:?}: whitespace and control characters are not allowed",
            name
        )));
    }
    Ok(())
}

/// Immutable mapping from command name to dispatch adapter
///
/// Shared read-only between sessions; there is no way to add or remove a
/// command once the table is built.
pub struct CommandTable {
    commands: HashMap<String, Dispatch>,
}

impl CommandTable {
    /// Build the table from a handler's registrations
    ///
    /// Any registration failure is reported as a configuration error.
    pub fn from_handler(handler: Arc<dyn Handler>) -> Result<Self> {
        let mut builder = CommandTableBuilder::new();
        handler.register(&mut builder).map_err(|e| match e {
            RespdError::Config(_) => e,
            other => RespdError::Config(format!("handler registration failed: {}", other)),
        })?;
        Ok(builder.build())
    }

    /// Look up the adapter for `name`
    pub fn get(&self, name: &str) -> Option<&Dispatch> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Route a request to its adapter
    pub fn dispatch(&self, request: &Request) -> DispatchResult {
        match self.commands.get(&request.name) {
            Some(dispatch) => dispatch(request),
            None => Err(DispatchError::UnknownCommand(request.name.clone())),
        }
    }
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTable")
            .field("commands", &self.names())
            .finish()
    }
}
