//! Shared helpers for network tests

use std::collections::HashMap;
use std::io::{BufReader, BufWriter, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;
use respd::command::{CommandTableBuilder, Handler};
use respd::config::ConfigBuilder;
use respd::protocol::{read_reply, write_request};
use respd::{Config, DispatchError, Reply, Request, Server, ServerHandle};

/// Small key-value handler used by every network test
#[derive(Default)]
pub struct KvHandler {
    data: Mutex<HashMap<Bytes, Bytes>>,
}

impl Handler for KvHandler {
    fn register(self: Arc<Self>, commands: &mut CommandTableBuilder) -> respd::Result<()> {
        commands.command("PING", || "PONG")?;
        commands.command("ECHO", |message: Bytes| message)?;

        let store = Arc::clone(&self);
        commands.command("SET", move |key: Bytes, value: Bytes| {
            store.data.lock().insert(key, value);
        })?;

        let store = self;
        commands.command("GET", move |key: Bytes| store.data.lock().get(&key).cloned())?;

        commands.command("SLEEP", |ms: u64| {
            thread::sleep(Duration::from_millis(ms));
        })?;
        commands.command("FAIL", || -> Result<(), DispatchError> {
            Err(DispatchError::failed("requested failure"))
        })?;
        commands.raw("WHOAMI", |request: &Request| Reply::bulk(request.host.clone()))?;
        Ok(())
    }
}

/// Config for a test server on an ephemeral localhost port
pub fn test_config() -> ConfigBuilder {
    Config::builder()
        .address("127.0.0.1")
        .port(0)
        .handler(KvHandler::default())
        .shutdown_poll_ms(20)
        .shutdown_grace_ms(500)
}

/// Build, bind and start a server in the background
pub fn start(config: Config) -> ServerHandle {
    let server = Server::new(config).unwrap();
    let listener = server.bind().unwrap();
    server.start(listener).unwrap()
}

pub fn addr(handle: &ServerHandle) -> SocketAddr {
    handle.local_addr().unwrap()
}

/// Poll `condition` until it holds or two seconds pass
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Blocking RESP client over TCP
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    pub fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        Self {
            reader: BufReader::new(stream.try_clone().unwrap()),
            writer: BufWriter::new(stream),
        }
    }

    pub fn call(&mut self, name: &str, args: &[&str]) -> Reply {
        self.send(name, args);
        self.receive()
    }

    pub fn send(&mut self, name: &str, args: &[&str]) {
        let args = args.iter().map(|a| Bytes::copy_from_slice(a.as_bytes())).collect();
        write_request(&mut self.writer, &Request::new(name, args)).unwrap();
    }

    pub fn receive(&mut self) -> Reply {
        read_reply(&mut self.reader).unwrap()
    }

    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).unwrap();
        self.writer.flush().unwrap();
    }

    pub fn reader(&mut self) -> &mut BufReader<TcpStream> {
        &mut self.reader
    }
}
