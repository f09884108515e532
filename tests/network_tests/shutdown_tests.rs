//! Tests for shutdown
//!
//! These tests verify:
//! - The acceptor stops accepting once shutdown is requested
//! - Repeated shutdown requests are harmless
//! - Idle sessions notice shutdown within the poll interval
//! - With polling disabled, a blocked session only ends once its read resolves

use std::io::Read;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use respd::{Reply, Server, ShutdownState};

use crate::support::{addr, start, test_config, wait_until, Client};

#[test]
fn test_no_connections_accepted_after_shutdown() {
    let handle = start(test_config().build());
    let server_addr = addr(&handle);

    let mut client = Client::connect(server_addr);
    assert_eq!(client.call("PING", &[]), Reply::status("PONG"));

    assert!(handle.shutdown());
    handle.join().unwrap();

    assert!(TcpStream::connect(server_addr).is_err());
}

#[test]
fn test_second_shutdown_is_a_noop() {
    let handle = start(test_config().build());

    assert!(handle.shutdown());
    assert!(!handle.shutdown());
    assert!(!handle.server().shutdown());

    assert!(wait_until(|| {
        handle.server().shutdown_signal().state() == ShutdownState::Stopped
    }));
    assert!(!handle.shutdown());
    assert_eq!(
        handle.server().shutdown_signal().state(),
        ShutdownState::Stopped
    );
    handle.join().unwrap();
}

#[test]
fn test_idle_session_closed_after_shutdown() {
    let handle = start(test_config().build());
    let mut client = Client::connect(addr(&handle));
    assert_eq!(client.call("PING", &[]), Reply::status("PONG"));
    assert_eq!(handle.server().active_sessions(), 1);

    handle.shutdown();

    assert!(wait_until(|| handle.server().active_sessions() == 0));
    let mut rest = Vec::new();
    client.reader().read_to_end(&mut rest).unwrap();
    assert!(rest.is_empty());
    handle.join().unwrap();
}

#[test]
fn test_blocking_session_ends_only_when_read_resolves() {
    let config = test_config()
        .shutdown_poll_ms(0)
        .read_timeout_ms(0)
        .shutdown_grace_ms(100)
        .build();
    let handle = start(config);
    let mut client = Client::connect(addr(&handle));
    assert_eq!(client.call("PING", &[]), Reply::status("PONG"));

    handle.shutdown();
    assert!(wait_until(|| {
        handle.server().shutdown_signal().state() == ShutdownState::Stopped
    }));

    // Still parked in its read: nothing has arrived to wake it
    thread::sleep(Duration::from_millis(100));
    assert_eq!(handle.server().active_sessions(), 1);

    // The pending read resolves with this request; the session answers it
    // and then observes shutdown
    assert_eq!(client.call("PING", &[]), Reply::status("PONG"));
    let mut rest = Vec::new();
    client.reader().read_to_end(&mut rest).unwrap();
    assert!(rest.is_empty());
    assert!(wait_until(|| handle.server().active_sessions() == 0));
}

#[test]
fn test_blocking_session_ends_when_peer_disconnects() {
    let config = test_config()
        .shutdown_poll_ms(0)
        .read_timeout_ms(0)
        .shutdown_grace_ms(100)
        .build();
    let handle = start(config);
    let mut client = Client::connect(addr(&handle));
    assert_eq!(client.call("PING", &[]), Reply::status("PONG"));

    handle.shutdown();
    thread::sleep(Duration::from_millis(150));
    assert_eq!(handle.server().active_sessions(), 1);

    drop(client);
    assert!(wait_until(|| handle.server().active_sessions() == 0));
}

#[test]
fn test_listen_and_serve_returns_after_shutdown() {
    let server = Arc::new(Server::new(test_config().build()).unwrap());
    let signal = server.shutdown_signal();

    let serving = Arc::clone(&server);
    let acceptor = thread::spawn(move || serving.listen_and_serve());

    thread::sleep(Duration::from_millis(50));
    assert!(signal.trigger());

    acceptor.join().unwrap().unwrap();
    assert_eq!(server.shutdown_signal().state(), ShutdownState::Stopped);
}
