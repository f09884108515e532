//! Server
//!
//! Builds the command table, accepts connections and hands each one to its
//! own session thread.

use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::connection::{Connection, SessionContext};
use super::{Listener, Stream};
use crate::command::{CommandTable, DefaultHandler, Handler};
use crate::config::Config;
use crate::error::{RespdError, Result};
use crate::monitor::Monitor;
use crate::shutdown::ShutdownSignal;

/// Pause between accept polls when nothing is pending
const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);

/// Pause between checks while draining sessions
const DRAIN_POLL: Duration = Duration::from_millis(10);

const MAX_CLIENTS_LINE: &[u8] = b"-ERR max number of clients reached\n";

/// A respd server instance
///
/// Immutable after construction apart from the monitor subscribers, the
/// shutdown state and the live-session count.
pub struct Server {
    config: Config,
    commands: Arc<CommandTable>,
    monitor: Monitor,
    shutdown: ShutdownSignal,
    active_sessions: Arc<AtomicUsize>,
}

impl Server {
    /// Create a server, building its command table from the configured handler
    ///
    /// Fails with a configuration error if the handler's registration fails;
    /// no partially built server is ever returned.
    pub fn new(config: Config) -> Result<Self> {
        let handler: Arc<dyn Handler> = match &config.handler {
            Some(handler) => Arc::clone(handler),
            None => {
                tracing::debug!("No handler configured, using the empty default handler");
                Arc::new(DefaultHandler)
            }
        };

        let commands = CommandTable::from_handler(handler)?;
        tracing::info!("Command table ready with {} command(s)", commands.len());

        Ok(Self {
            config,
            commands: Arc::new(commands),
            monitor: Monitor::new(),
            shutdown: ShutdownSignal::new(),
            active_sessions: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The immutable command table
    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// The monitor feed; call `subscribe()` on it to receive executed commands
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// A handle that can stop this server from anywhere
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Number of sessions currently running
    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::Acquire)
    }

    /// Bind the configured address
    pub fn bind(&self) -> Result<Listener> {
        Listener::bind(&self.config.bind_addr())
    }

    /// Bind the configured address and serve until shutdown (blocking)
    pub fn listen_and_serve(&self) -> Result<()> {
        let listener = self.bind()?;
        self.serve(listener)
    }

    /// Accept connections on `listener` until shutdown (blocking)
    ///
    /// The listener is closed on every exit path. After a shutdown, waits up
    /// to the configured grace period for live sessions to finish.
    pub fn serve(&self, listener: Listener) -> Result<()> {
        tracing::info!("Listening on {}", listener.bind_addr());

        let result = listener
            .set_nonblocking(true)
            .map_err(RespdError::from)
            .and_then(|()| self.accept_loop(&listener));
        drop(listener);

        if self.shutdown.is_shutting_down() {
            let grace = Duration::from_millis(self.config.shutdown_grace_ms);
            if !self.drain_sessions(grace) {
                tracing::warn!(
                    "{} session(s) still running after {:?} grace period",
                    self.active_sessions(),
                    grace
                );
            }
            self.shutdown.mark_stopped();
            tracing::info!("Server stopped");
        }

        result
    }

    /// Request shutdown
    ///
    /// Returns `true` for the first request; repeated requests are no-ops.
    pub fn shutdown(&self) -> bool {
        let first = self.shutdown.trigger();
        if first {
            tracing::info!("Server shutting down...");
        } else {
            tracing::debug!("Shutdown already requested");
        }
        first
    }

    /// Run the acceptor on a background thread
    pub fn start(self, listener: Listener) -> Result<ServerHandle> {
        let local_addr = listener.local_addr();
        let server = Arc::new(self);
        let acceptor = Arc::clone(&server);

        let thread = thread::Builder::new()
            .name("respd-acceptor".to_string())
            .spawn(move || acceptor.serve(listener))?;

        Ok(ServerHandle {
            server,
            local_addr,
            thread: Some(thread),
        })
    }

    fn accept_loop(&self, listener: &Listener) -> Result<()> {
        loop {
            if self.shutdown.is_shutting_down() {
                tracing::debug!("Acceptor observed shutdown");
                return Ok(());
            }

            match listener.accept() {
                Ok(Some((stream, peer))) => self.spawn_session(stream, peer),
                Ok(None) => thread::sleep(ACCEPT_BACKOFF),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::error!("Accept failed: {}", e);
                    return Err(e.into());
                }
            }
        }
    }

    fn spawn_session(&self, stream: Stream, peer: String) {
        // Only this thread increments the counter, so check-then-add cannot overshoot
        if self.active_sessions() >= self.config.max_connections {
            tracing::warn!("Rejecting {}: max connections reached", peer);
            let mut stream = stream;
            let _ = stream.write_all(MAX_CLIENTS_LINE);
            let _ = stream.close();
            return;
        }

        let guard = SessionGuard::new(Arc::clone(&self.active_sessions));
        let context = SessionContext {
            commands: Arc::clone(&self.commands),
            monitor: self.monitor.clone(),
            shutdown: self.shutdown.clone(),
        };
        let (read_ms, write_ms, poll_ms) = (
            self.config.read_timeout_ms,
            self.config.write_timeout_ms,
            self.config.shutdown_poll_ms,
        );

        let spawned = thread::Builder::new()
            .name("respd-session".to_string())
            .spawn(move || {
                let _guard = guard;
                let result = Connection::new(stream, peer.clone(), context).and_then(|mut conn| {
                    conn.set_timeouts(read_ms, write_ms, poll_ms)?;
                    conn.handle()
                });
                if let Err(e) = result {
                    tracing::debug!("Session {} ended with error: {}", peer, e);
                }
            });

        if let Err(e) = spawned {
            tracing::warn!("Failed to spawn session thread: {}", e);
        }
    }

    /// Wait until no session is running or `grace` has elapsed
    fn drain_sessions(&self, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        while self.active_sessions() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(DRAIN_POLL);
        }
        true
    }
}

/// Keeps the live-session count accurate however a session ends
struct SessionGuard {
    active: Arc<AtomicUsize>,
}

impl SessionGuard {
    fn new(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::AcqRel);
        Self { active }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Handle to a server whose acceptor runs on a background thread
///
/// Dropping the handle requests shutdown.
pub struct ServerHandle {
    server: Arc<Server>,
    local_addr: Option<SocketAddr>,
    thread: Option<thread::JoinHandle<Result<()>>>,
}

impl ServerHandle {
    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Bound TCP address, if the server listens on TCP
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Request shutdown; see [`Server::shutdown`]
    pub fn shutdown(&self) -> bool {
        self.server.shutdown()
    }

    /// Wait for the acceptor (and the session drain) to finish
    pub fn join(mut self) -> Result<()> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| RespdError::ThreadPanic)?,
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.server.shutdown.trigger();
    }
}
