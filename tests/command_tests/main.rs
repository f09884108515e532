//! Command table tests
//!
//! Handler registration and dispatch routing.
