//! Request definitions
//!
//! A single command invocation read from a client.

use bytes::Bytes;

/// A parsed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Command name, exactly as sent (case-sensitive)
    pub name: String,

    /// Ordered arguments following the name
    pub args: Vec<Bytes>,

    /// Address of the client the request came from
    pub host: String,
}

impl Request {
    /// Create a request with no client address attached
    pub fn new(name: impl Into<String>, args: Vec<Bytes>) -> Self {
        Self {
            name: name.into(),
            args,
            host: String::new(),
        }
    }

    /// Attach the originating client address
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Argument at `index`, if present
    pub fn arg(&self, index: usize) -> Option<&Bytes> {
        self.args.get(index)
    }

    /// Number of arguments (the name is not counted)
    pub fn argc(&self) -> usize {
        self.args.len()
    }
}
