//! Tests for sessions
//!
//! These tests verify:
//! - Request/reply round trips over TCP
//! - Error replies keep the connection open
//! - Protocol errors close the connection after a fallback line
//! - Per-connection ordering with many concurrent clients
//! - The live-connection cap

use std::io::{BufRead, Read};
use std::thread;
use std::time::{Duration, Instant};

use respd::Reply;

use crate::support::{addr, start, test_config, wait_until, Client};

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_set_then_get_round_trip() {
    let handle = start(test_config().build());
    let mut client = Client::connect(addr(&handle));

    assert_eq!(client.call("SET", &["a", "1"]), Reply::ok());
    assert_eq!(client.call("GET", &["a"]), Reply::bulk("1"));
    assert_eq!(client.call("GET", &["missing"]), Reply::Nil);
}

#[test]
fn test_inline_requests_are_served() {
    let handle = start(test_config().build());
    let mut client = Client::connect(addr(&handle));

    client.send_raw(b"PING\r\n");
    assert_eq!(client.receive(), Reply::status("PONG"));
}

#[test]
fn test_back_to_back_requests_answered_in_order() {
    let handle = start(test_config().build());
    let mut client = Client::connect(addr(&handle));

    client.send_raw(b"*2\r\n$4\r\nECHO\r\n$5\r\nfirst\r\n*2\r\n$4\r\nECHO\r\n$6\r\nsecond\r\n");
    assert_eq!(client.receive(), Reply::bulk("first"));
    assert_eq!(client.receive(), Reply::bulk("second"));
}

#[test]
fn test_request_carries_client_address() {
    let handle = start(test_config().build());
    let mut client = Client::connect(addr(&handle));

    match client.call("WHOAMI", &[]) {
        Reply::Bulk(host) => {
            let host = String::from_utf8(host.to_vec()).unwrap();
            assert!(host.starts_with("127.0.0.1:"), "got {}", host);
        }
        other => panic!("unexpected reply {:?}", other),
    }
}

// =============================================================================
// Error Reply Tests
// =============================================================================

#[test]
fn test_unknown_command_keeps_connection_open() {
    let handle = start(test_config().build());
    let mut client = Client::connect(addr(&handle));

    assert_eq!(
        client.call("NOPE", &["x"]),
        Reply::error("ERR unknown command 'NOPE'")
    );
    assert_eq!(client.call("PING", &[]), Reply::status("PONG"));
}

#[test]
fn test_undecodable_name_is_unknown_command() {
    let handle = start(test_config().build());
    let mut client = Client::connect(addr(&handle));

    client.send_raw(b"*1\r\n$2\r\n\xff\xfe\r\n");
    assert_eq!(
        client.receive(),
        Reply::error("ERR unknown command '\u{FFFD}\u{FFFD}'")
    );

    client.send_raw(b"PING\r\n");
    assert_eq!(client.receive(), Reply::status("PONG"));
}

#[test]
fn test_dispatch_errors_keep_connection_open() {
    let handle = start(test_config().build());
    let mut client = Client::connect(addr(&handle));

    assert_eq!(client.call("FAIL", &[]), Reply::error("ERR requested failure"));
    assert_eq!(
        client.call("GET", &[]),
        Reply::error("ERR wrong number of arguments for 'GET' command (expected 1, got 0)")
    );
    assert!(client.call("SLEEP", &["soon"]).is_error());
    assert_eq!(client.call("PING", &[]), Reply::status("PONG"));
}

#[test]
fn test_protocol_error_sends_fallback_line_and_closes() {
    let handle = start(test_config().build());
    let mut client = Client::connect(addr(&handle));

    client.send_raw(b"*1\r\n:4\r\n");

    let mut line = String::new();
    client.reader().read_line(&mut line).unwrap();
    assert!(line.starts_with("-ERR Protocol error"), "got {:?}", line);
    assert!(line.ends_with('\n'));

    let mut rest = Vec::new();
    client.reader().read_to_end(&mut rest).unwrap();
    assert!(rest.is_empty());
}

#[test]
fn test_stalled_request_times_out_silently() {
    let handle = start(test_config().read_timeout_ms(100).build());
    let mut client = Client::connect(addr(&handle));
    assert!(wait_until(|| handle.server().active_sessions() == 1));

    client.send_raw(b"*2\r\n$4\r\nECHO\r\n");

    let mut rest = Vec::new();
    client.reader().read_to_end(&mut rest).unwrap();
    assert!(rest.is_empty());
    assert!(wait_until(|| handle.server().active_sessions() == 0));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_clients_get_their_own_replies_in_order() {
    const CLIENTS: usize = 8;
    const REQUESTS: usize = 50;

    let handle = start(test_config().build());
    let server_addr = addr(&handle);

    let workers: Vec<_> = (0..CLIENTS)
        .map(|c| {
            thread::spawn(move || {
                let mut client = Client::connect(server_addr);
                for r in 0..REQUESTS {
                    let message = format!("client-{}-request-{}", c, r);
                    assert_eq!(client.call("ECHO", &[message.as_str()]), Reply::bulk(message));
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
}

#[test]
fn test_slow_command_does_not_block_other_sessions() {
    let handle = start(test_config().build());
    let server_addr = addr(&handle);

    let slow = thread::spawn(move || {
        let mut client = Client::connect(server_addr);
        client.call("SLEEP", &["500"])
    });
    thread::sleep(Duration::from_millis(50));

    let started = Instant::now();
    let mut fast = Client::connect(server_addr);
    assert_eq!(fast.call("PING", &[]), Reply::status("PONG"));
    assert!(started.elapsed() < Duration::from_millis(400));

    assert_eq!(slow.join().unwrap(), Reply::ok());
}

#[test]
fn test_connection_cap_rejects_extra_clients() {
    let handle = start(test_config().max_connections(1).build());
    let server_addr = addr(&handle);

    let mut first = Client::connect(server_addr);
    assert_eq!(first.call("PING", &[]), Reply::status("PONG"));

    let mut second = Client::connect(server_addr);
    let mut line = String::new();
    second.reader().read_line(&mut line).unwrap();
    assert_eq!(line, "-ERR max number of clients reached\n");

    drop(first);
    assert!(wait_until(|| handle.server().active_sessions() == 0));

    let mut third = Client::connect(server_addr);
    assert_eq!(third.call("PING", &[]), Reply::status("PONG"));
}
