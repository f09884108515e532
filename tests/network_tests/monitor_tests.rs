//! Tests for the monitor feed
//!
//! These tests verify:
//! - Subscribers see commands from every session
//! - Failed dispatches are not published
//! - Subscribers only see commands executed after they subscribed

use std::time::Duration;

use respd::Reply;

use crate::support::{addr, start, test_config, Client};

const WAIT: Duration = Duration::from_secs(2);

#[test]
fn test_subscriber_sees_commands_from_all_sessions() {
    let handle = start(test_config().build());
    let feed = handle.server().monitor().subscribe();

    let mut first = Client::connect(addr(&handle));
    let mut second = Client::connect(addr(&handle));
    assert_eq!(first.call("SET", &["k", "v"]), Reply::ok());
    assert_eq!(second.call("GET", &["k"]), Reply::bulk("v"));

    let set = feed.recv_timeout(WAIT).unwrap();
    let get = feed.recv_timeout(WAIT).unwrap();
    assert!(set.contains("[127.0.0.1:"), "got {}", set);
    assert!(set.ends_with("\"SET\" \"k\" \"v\""), "got {}", set);
    assert!(get.ends_with("\"GET\" \"k\""), "got {}", get);
}

#[test]
fn test_failed_dispatch_is_not_published() {
    let handle = start(test_config().build());
    let feed = handle.server().monitor().subscribe();

    let mut client = Client::connect(addr(&handle));
    assert!(client.call("NOPE", &[]).is_error());
    assert!(client.call("FAIL", &[]).is_error());
    assert_eq!(client.call("PING", &[]), Reply::status("PONG"));

    let line = feed.recv_timeout(WAIT).unwrap();
    assert!(line.ends_with("\"PING\""), "got {}", line);
    assert!(feed.try_recv().is_err());
}

#[test]
fn test_late_subscriber_misses_earlier_commands() {
    let handle = start(test_config().build());
    let mut client = Client::connect(addr(&handle));
    assert_eq!(client.call("ECHO", &["before"]), Reply::bulk("before"));

    let feed = handle.server().monitor().subscribe();
    assert_eq!(client.call("ECHO", &["after"]), Reply::bulk("after"));

    let line = feed.recv_timeout(WAIT).unwrap();
    assert!(line.ends_with("\"ECHO\" \"after\""), "got {}", line);
    assert!(feed.try_recv().is_err());
}
