//! Reply definitions
//!
//! Represents replies sent back to clients.

use std::io::{self, Write};

use bytes::Bytes;

use crate::error::DispatchError;

/// A reply to send to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+OK`-style single line
    Status(String),

    /// `-ERR ...`-style single line
    Error(String),

    /// `:<n>`
    Integer(i64),

    /// `$<len>` followed by the payload
    Bulk(Bytes),

    /// `$-1`
    Nil,

    /// `*<n>` followed by n nested replies
    Array(Vec<Reply>),

    /// `*-1`
    NilArray,
}

impl Reply {
    /// The `+OK` status reply
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    /// A status reply
    pub fn status(text: impl Into<String>) -> Self {
        Reply::Status(text.into())
    }

    /// An error reply
    ///
    /// The message is sent as-is, so it should carry its own error code
    /// prefix (e.g. `ERR`, `WRONGTYPE`).
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    /// A bulk reply
    pub fn bulk(payload: impl Into<Bytes>) -> Self {
        Reply::Bulk(payload.into())
    }

    /// A multi-bulk reply made of bulk strings
    pub fn bulks<I, B>(items: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Reply::Array(items.into_iter().map(|b| Reply::Bulk(b.into())).collect())
    }

    /// True for error replies
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Encode onto a stream, returning the number of bytes written
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<usize> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        writer.write_all(&buf)?;
        Ok(buf.len())
    }

    pub(crate) fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::Status(text) => {
                buf.push(b'+');
                push_line(buf, text);
            }
            Reply::Error(message) => {
                buf.push(b'-');
                push_line(buf, message);
            }
            Reply::Integer(n) => {
                buf.extend_from_slice(format!(":{}\r\n", n).as_bytes());
            }
            Reply::Bulk(payload) => {
                buf.extend_from_slice(format!("${}\r\n", payload.len()).as_bytes());
                buf.extend_from_slice(payload);
                buf.extend_from_slice(b"\r\n");
            }
            Reply::Nil => buf.extend_from_slice(b"$-1\r\n"),
            Reply::Array(items) => {
                buf.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
                for item in items {
                    item.encode_into(buf);
                }
            }
            Reply::NilArray => buf.extend_from_slice(b"*-1\r\n"),
        }
    }
}

/// Status and error lines cannot carry line breaks
fn push_line(buf: &mut Vec<u8>, text: &str) {
    buf.extend(
        text.bytes()
            .map(|b| if b == b'\r' || b == b'\n' { b' ' } else { b }),
    );
    buf.extend_from_slice(b"\r\n");
}

impl From<DispatchError> for Reply {
    fn from(err: DispatchError) -> Self {
        Reply::Error(format!("ERR {}", err))
    }
}
