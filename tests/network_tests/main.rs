//! Network tests
//!
//! Sessions, the acceptor and shutdown over real sockets.

mod support;

mod session_tests;
mod shutdown_tests;
mod monitor_tests;
