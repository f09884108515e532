//! Configuration for respd
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::command::Handler;
use crate::error::RespdError;

/// Socket path used by the Unix transport when no address is configured
pub const DEFAULT_UNIX_PATH: &str = "/tmp/redis.sock";

/// Host used by the TCP transport when no address is configured
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port used by the TCP transport
pub const DEFAULT_PORT: u16 = 6389;

/// Stream socket kind the server listens on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Tcp,
    Unix,
}

impl FromStr for Transport {
    type Err = RespdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Transport::Tcp),
            "unix" => Ok(Transport::Unix),
            other => Err(RespdError::Config(format!("unknown transport '{}'", other))),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Tcp => f.write_str("tcp"),
            Transport::Unix => f.write_str("unix"),
        }
    }
}

/// Resolved bind target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindAddr {
    Tcp(String),
    Unix(PathBuf),
}

impl fmt::Display for BindAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindAddr::Tcp(addr) => write!(f, "tcp://{}", addr),
            BindAddr::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// Main configuration for a respd server
#[derive(Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Listener Configuration
    // -------------------------------------------------------------------------
    /// Socket kind to listen on
    pub transport: Transport,

    /// Host name for TCP, socket path for Unix. Empty means "use the default".
    pub address: String,

    /// TCP port (ignored for the Unix transport)
    pub port: u16,

    // -------------------------------------------------------------------------
    // Command Configuration
    // -------------------------------------------------------------------------
    /// Object exposing the commands. `None` falls back to an empty command set.
    pub handler: Option<Arc<dyn Handler>>,

    // -------------------------------------------------------------------------
    // Connection Configuration
    // -------------------------------------------------------------------------
    /// Max concurrent client connections
    pub max_connections: usize,

    /// Read timeout once a request has started arriving (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Shutdown Configuration
    // -------------------------------------------------------------------------
    /// How often an idle session re-checks the shutdown signal (milliseconds).
    /// 0 makes idle reads fully blocking.
    pub shutdown_poll_ms: u64,

    /// How long `serve` waits for live sessions to drain after shutdown
    /// (milliseconds)
    pub shutdown_grace_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: Transport::Tcp,
            address: String::new(),
            port: DEFAULT_PORT,
            handler: None,
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            shutdown_poll_ms: 100,
            shutdown_grace_ms: 1000,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("transport", &self.transport)
            .field("address", &self.address)
            .field("port", &self.port)
            .field("handler", &self.handler.as_ref().map(|_| "<handler>"))
            .field("max_connections", &self.max_connections)
            .field("read_timeout_ms", &self.read_timeout_ms)
            .field("write_timeout_ms", &self.write_timeout_ms)
            .field("shutdown_poll_ms", &self.shutdown_poll_ms)
            .field("shutdown_grace_ms", &self.shutdown_grace_ms)
            .finish()
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Resolve the address to bind, applying the per-transport defaults
    pub fn bind_addr(&self) -> BindAddr {
        match self.transport {
            Transport::Unix if self.address.is_empty() => {
                BindAddr::Unix(PathBuf::from(DEFAULT_UNIX_PATH))
            }
            Transport::Unix => BindAddr::Unix(PathBuf::from(&self.address)),
            Transport::Tcp => {
                let host = if self.address.is_empty() {
                    DEFAULT_HOST
                } else {
                    self.address.as_str()
                };
                BindAddr::Tcp(format!("{}:{}", host, self.port))
            }
        }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the transport (TCP or Unix socket)
    pub fn transport(mut self, transport: Transport) -> Self {
        self.config.transport = transport;
        self
    }

    /// Set the host (TCP) or socket path (Unix)
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    /// Set the TCP port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the object exposing commands
    pub fn handler<H: Handler>(mut self, handler: H) -> Self {
        self.config.handler = Some(Arc::new(handler));
        self
    }

    /// Set an already shared handler
    pub fn shared_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.config.handler = Some(handler);
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set how often idle sessions poll for shutdown (in milliseconds)
    pub fn shutdown_poll_ms(mut self, ms: u64) -> Self {
        self.config.shutdown_poll_ms = ms;
        self
    }

    /// Set the shutdown grace period (in milliseconds)
    pub fn shutdown_grace_ms(mut self, ms: u64) -> Self {
        self.config.shutdown_grace_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
