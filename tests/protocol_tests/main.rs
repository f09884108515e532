//! Protocol tests
//!
//! Request parsing and reply encoding on the wire.
