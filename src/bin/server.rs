//! respd Demo Server
//!
//! Serves a small in-memory key-value handler over TCP or a Unix socket.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use clap::Parser;
use parking_lot::RwLock;
use respd::command::{CommandTableBuilder, Handler};
use respd::{Config, DispatchError, Reply, Request, Server, Transport};
use tracing_subscriber::{fmt, EnvFilter};

/// respd Demo Server
#[derive(Parser, Debug)]
#[command(name = "respd-server")]
#[command(about = "Redis-protocol server backed by an in-memory demo handler")]
#[command(version)]
struct Args {
    /// Transport: tcp or unix
    #[arg(short, long, default_value = "tcp")]
    transport: Transport,

    /// Host (tcp) or socket path (unix); empty uses the transport default
    #[arg(short, long, default_value = "")]
    address: String,

    /// TCP port
    #[arg(short, long, default_value_t = respd::config::DEFAULT_PORT)]
    port: u16,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Shutdown grace period in milliseconds
    #[arg(long, default_value = "1000")]
    grace_ms: u64,

    /// Log every executed command
    #[arg(long)]
    monitor: bool,
}

/// In-memory key-value commands
#[derive(Default)]
struct MemoryStore {
    data: RwLock<HashMap<Bytes, Bytes>>,
}

impl Handler for MemoryStore {
    fn register(self: Arc<Self>, commands: &mut CommandTableBuilder) -> respd::Result<()> {
        commands.command("PING", || "PONG")?;
        commands.command("ECHO", |message: Bytes| message)?;

        let store = Arc::clone(&self);
        commands.command("GET", move |key: Bytes| store.data.read().get(&key).cloned())?;

        let store = Arc::clone(&self);
        commands.command("SET", move |key: Bytes, value: Bytes| {
            store.data.write().insert(key, value);
        })?;

        let store = Arc::clone(&self);
        commands.raw("DEL", move |request: &Request| -> Result<i64, DispatchError> {
            if request.args.is_empty() {
                return Err(DispatchError::WrongArity {
                    command: request.name.clone(),
                    expected: 1,
                    got: 0,
                });
            }
            let mut data = store.data.write();
            Ok(request.args.iter().filter(|key| data.remove(*key).is_some()).count() as i64)
        })?;

        let store = Arc::clone(&self);
        commands.raw("EXISTS", move |request: &Request| {
            let data = store.data.read();
            request.args.iter().filter(|key| data.contains_key(*key)).count()
        })?;

        let store = self;
        commands.command("DBSIZE", move || store.data.read().len())?;

        commands.raw("CLIENT", |request: &Request| {
            Reply::bulk(format!("addr={}", request.host))
        })?;

        Ok(())
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,respd=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("respd Server v{}", respd::VERSION);

    let config = Config::builder()
        .transport(args.transport)
        .address(&args.address)
        .port(args.port)
        .max_connections(args.max_connections)
        .shutdown_grace_ms(args.grace_ms)
        .handler(MemoryStore::default())
        .build();

    let server = match Server::new(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to build server: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Commands: {}", server.commands().names().join(", "));

    if args.monitor {
        let feed = server.monitor().subscribe();
        thread::spawn(move || {
            for line in feed {
                tracing::info!(target: "respd::monitor", "{}", line);
            }
        });
    }

    install_signal_handler(&server);

    if let Err(e) = server.listen_and_serve() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Trigger shutdown on SIGINT / SIGTERM
#[cfg(unix)]
fn install_signal_handler(server: &Server) {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = match Signals::new([SIGINT, SIGTERM]) {
        Ok(signals) => signals,
        Err(e) => {
            tracing::warn!("Could not install signal handler: {}", e);
            return;
        }
    };

    let shutdown = server.shutdown_signal();
    thread::spawn(move || {
        for signal in signals.forever() {
            tracing::info!("Received signal {}, initiating shutdown...", signal);
            shutdown.trigger();
        }
    });
}

#[cfg(not(unix))]
fn install_signal_handler(_server: &Server) {}
