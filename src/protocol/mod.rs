//! Protocol Module
//!
//! The Redis serialization protocol (RESP) as spoken on the wire.
//!
//! ## Request Format
//! ```text
//! *<argc>\r\n
//! $<len>\r\n<name>\r\n
//! $<len>\r\n<arg 1>\r\n
//! ...
//! ```
//! Inline requests (`NAME arg arg\r\n`) are accepted as well.
//!
//! ## Reply Types
//! - `+` status line
//! - `-` error line
//! - `:` integer
//! - `$` bulk string (`$-1` is nil)
//! - `*` multi-bulk (`*-1` is nil)

mod request;
mod reply;
mod codec;

pub use request::Request;
pub use reply::Reply;
pub use codec::{
    decode_reply, decode_request, encode_reply, encode_request, read_reply, read_request,
    write_reply, write_request, MAX_ARGS, MAX_BULK_LEN, MAX_INLINE_LEN, MAX_REPLY_DEPTH,
};
