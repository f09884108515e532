//! Connection Handler
//!
//! Runs the request/reply loop for one client connection.

use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::sync::Arc;
use std::time::Duration;

use super::Stream;
use crate::command::CommandTable;
use crate::error::{RespdError, Result};
use crate::monitor::Monitor;
use crate::protocol::{read_request, write_reply, Reply, Request};
use crate::shutdown::ShutdownSignal;

/// State shared by every session of one server
#[derive(Clone)]
pub struct SessionContext {
    pub commands: Arc<CommandTable>,
    pub monitor: Monitor,
    pub shutdown: ShutdownSignal,
}

/// Handles a single client connection
pub struct Connection {
    /// Stream reader (buffered for efficiency)
    reader: BufReader<Stream>,

    /// Stream writer (buffered, flushed after every reply)
    writer: BufWriter<Stream>,

    /// Command table, shutdown signal and monitor feed
    context: SessionContext,

    /// Client address, attached to every request
    peer_addr: String,

    /// Read timeout while idle between requests
    poll_interval: Option<Duration>,

    /// Read timeout once a request has started arriving
    read_timeout: Option<Duration>,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: Stream, peer_addr: String, context: SessionContext) -> Result<Self> {
        if let Stream::Tcp(tcp) = &stream {
            // Disable Nagle's algorithm for low latency
            tcp.set_nodelay(true)?;
        }

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            context,
            peer_addr,
            poll_interval: None,
            read_timeout: None,
        })
    }

    /// Configure connection timeouts (0 disables each one)
    ///
    /// `poll_ms` bounds how long an idle session can miss a shutdown.
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64, poll_ms: u64) -> Result<()> {
        let millis = |ms: u64| (ms > 0).then(|| Duration::from_millis(ms));

        self.read_timeout = millis(read_ms);
        self.poll_interval = millis(poll_ms);
        self.writer.get_ref().set_write_timeout(millis(write_ms))?;
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Returns when the client disconnects, shutdown is observed, or an
    /// error occurs. Strictly one reply per request: the next request is not
    /// read until the previous reply has been flushed.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            if self.context.shutdown.is_shutting_down() {
                tracing::debug!("Closing {} for shutdown", self.peer_addr);
                return Ok(());
            }

            match self.wait_for_request() {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!("Closing idle {} for shutdown", self.peer_addr);
                    return Ok(());
                }
                Err(e) if e.is_disconnect() => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            }

            let request = match read_request(&mut self.reader) {
                Ok(request) => request.with_host(self.peer_addr.clone()),
                Err(e) if e.is_disconnect() => {
                    tracing::debug!("Client {} went away mid-request: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(e @ RespdError::Protocol(_)) => {
                    tracing::warn!("Malformed request from {}: {}", self.peer_addr, e);
                    self.send_fallback_error(&e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            let reply = self.execute(&request);

            if let Err(e) = self.send_reply(&reply) {
                if e.is_disconnect() {
                    tracing::debug!(
                        "Client {} disconnected before reply could be sent: {}",
                        self.peer_addr,
                        e
                    );
                    return Ok(());
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Block until the next request starts arriving
    ///
    /// Returns `Ok(false)` when shutdown was observed while idle. With no
    /// poll interval the wait only ends on data, EOF or an error.
    fn wait_for_request(&mut self) -> Result<bool> {
        if !self.reader.buffer().is_empty() {
            return Ok(true);
        }

        self.reader.get_ref().set_read_timeout(self.poll_interval)?;
        loop {
            match self.reader.fill_buf() {
                Ok([]) => {
                    return Err(RespdError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed",
                    )))
                }
                Ok(_) => break,
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    if self.context.shutdown.is_shutting_down() {
                        return Ok(false);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.reader.get_ref().set_read_timeout(self.read_timeout)?;
        Ok(true)
    }

    /// Execute a request and return the reply
    fn execute(&self, request: &Request) -> Reply {
        tracing::trace!(
            "Received {} from {} with {} argument(s)",
            request.name,
            self.peer_addr,
            request.argc()
        );

        match self.context.commands.dispatch(request) {
            Ok(reply) => {
                self.context.monitor.publish(request);
                reply
            }
            Err(e) => {
                tracing::debug!("{} from {} failed: {}", request.name, self.peer_addr, e);
                Reply::from(e)
            }
        }
    }

    /// Send a reply to the client
    fn send_reply(&mut self, reply: &Reply) -> Result<()> {
        write_reply(&mut self.writer, reply)?;
        Ok(())
    }

    /// Best-effort `-<message>\n` before the connection is dropped
    fn send_fallback_error(&mut self, err: &RespdError) {
        let line = format!("-ERR {}\n", err).replace('\r', " ");
        if let Err(e) = self
            .writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.flush())
        {
            tracing::debug!("Could not send error line to {}: {}", self.peer_addr, e);
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.writer.flush();
        let _ = self.writer.get_ref().close();
    }
}
