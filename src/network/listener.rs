//! Socket listener
//!
//! Binds TCP or Unix stream sockets and accepts connections without
//! blocking, so the accept loop can observe shutdown between polls.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use crate::config::BindAddr;
use crate::error::{RespdError, Result};

#[cfg(unix)]
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::FileTypeExt;
#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};
#[cfg(unix)]
use std::path::Path;

/// A connected client stream
#[derive(Debug)]
pub enum Stream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Stream {
    pub fn try_clone(&self) -> io::Result<Self> {
        match self {
            Self::Tcp(stream) => stream.try_clone().map(Self::Tcp),
            #[cfg(unix)]
            Self::Unix(stream) => stream.try_clone().map(Self::Unix),
        }
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.set_read_timeout(timeout),
            #[cfg(unix)]
            Self::Unix(stream) => stream.set_read_timeout(timeout),
        }
    }

    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.set_write_timeout(timeout),
            #[cfg(unix)]
            Self::Unix(stream) => stream.set_write_timeout(timeout),
        }
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.set_nonblocking(nonblocking),
            #[cfg(unix)]
            Self::Unix(stream) => stream.set_nonblocking(nonblocking),
        }
    }

    /// Close both directions of the connection
    pub fn close(&self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Self::Unix(stream) => stream.shutdown(Shutdown::Both),
        }
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// Listening socket owned by the acceptor
#[derive(Debug)]
pub struct Listener {
    addr: BindAddr,
    kind: ListenerKind,
}

#[derive(Debug)]
enum ListenerKind {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl Listener {
    /// Bind to `addr`
    ///
    /// Every failure is a configuration error: the server cannot start.
    pub fn bind(addr: &BindAddr) -> Result<Self> {
        let kind = match addr {
            BindAddr::Tcp(target) => ListenerKind::Tcp(TcpListener::bind(target.as_str()).map_err(
                |e| RespdError::Config(format!("failed to bind TCP listener at {}: {}", target, e)),
            )?),
            #[cfg(unix)]
            BindAddr::Unix(path) => ListenerKind::Unix(bind_unix(path)?),
            #[cfg(not(unix))]
            BindAddr::Unix(path) => {
                return Err(RespdError::Config(format!(
                    "unix sockets are unsupported for {}",
                    path.display()
                )))
            }
        };

        Ok(Self {
            addr: addr.clone(),
            kind,
        })
    }

    /// Address the listener was asked to bind
    pub fn bind_addr(&self) -> &BindAddr {
        &self.addr
    }

    /// Actual TCP address (useful after binding port 0)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.kind {
            ListenerKind::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            ListenerKind::Unix(_) => None,
        }
    }

    pub(crate) fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        match &self.kind {
            ListenerKind::Tcp(listener) => listener.set_nonblocking(nonblocking),
            #[cfg(unix)]
            ListenerKind::Unix(listener) => listener.set_nonblocking(nonblocking),
        }
    }

    /// Accept one pending connection together with its client address
    ///
    /// `Ok(None)` means nothing is pending right now.
    pub(crate) fn accept(&self) -> io::Result<Option<(Stream, String)>> {
        let accepted = match &self.kind {
            ListenerKind::Tcp(listener) => listener
                .accept()
                .map(|(stream, peer)| (Stream::Tcp(stream), peer.to_string())),
            #[cfg(unix)]
            ListenerKind::Unix(listener) => listener.accept().map(|(stream, peer)| {
                let label = match (peer.as_pathname(), &self.addr) {
                    (Some(path), _) => format!("unix:{}", path.display()),
                    (None, BindAddr::Unix(path)) => format!("unix:{}", path.display()),
                    (None, BindAddr::Tcp(_)) => "unix".to_string(),
                };
                (Stream::Unix(stream), label)
            }),
        };

        match accepted {
            Ok((stream, peer)) => {
                stream.set_nonblocking(false)?;
                Ok(Some((stream, peer)))
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::ConnectionAborted
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let (ListenerKind::Unix(_), BindAddr::Unix(path)) = (&self.kind, &self.addr) {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove unix socket {}: {}", path.display(), e);
                }
            }
        }
    }
}

/// Bind a Unix socket, clearing a stale socket file left by a dead server
#[cfg(unix)]
fn bind_unix(path: &Path) -> Result<UnixListener> {
    if path.exists() {
        let metadata = fs::symlink_metadata(path).map_err(|e| {
            RespdError::Config(format!("failed to inspect {}: {}", path.display(), e))
        })?;
        if !metadata.file_type().is_socket() {
            return Err(RespdError::Config(format!(
                "{} exists and is not a socket",
                path.display()
            )));
        }
        match UnixStream::connect(path) {
            Ok(_) => {
                return Err(RespdError::Config(format!(
                    "unix socket {} is already in use",
                    path.display()
                )))
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
                ) =>
            {
                tracing::debug!("Removing stale unix socket {}", path.display());
                fs::remove_file(path).map_err(|e| {
                    RespdError::Config(format!(
                        "failed to remove stale socket {}: {}",
                        path.display(),
                        e
                    ))
                })?;
            }
            Err(e) => {
                return Err(RespdError::Config(format!(
                    "failed to probe unix socket {}: {}",
                    path.display(),
                    e
                )))
            }
        }
    }

    UnixListener::bind(path).map_err(|e| {
        RespdError::Config(format!(
            "failed to bind unix listener at {}: {}",
            path.display(),
            e
        ))
    })
}
