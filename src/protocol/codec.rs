//! Protocol codec
//!
//! Reading requests and writing replies on the server side, plus the inverse
//! pair used by clients.
//!
//! ## Wire Format
//!
//! ### Multi-bulk request
//! ```text
//! *2\r\n$3\r\nGET\r\n$1\r\na\r\n
//! ```
//!
//! ### Inline request
//! ```text
//! GET a\r\n
//! ```
//!
//! Every line ends with CRLF; a bare LF is tolerated on input.

use std::io::{self, BufRead, Cursor, Read, Write};

use bytes::Bytes;

use super::{Reply, Request};
use crate::error::{RespdError, Result};

/// Longest accepted header or inline line, without its terminator
pub const MAX_INLINE_LEN: usize = 64 * 1024;

/// Largest accepted bulk string (512 MB)
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Largest accepted argument count in a multi-bulk request
pub const MAX_ARGS: usize = 1024 * 1024;

/// Deepest accepted nesting of multi-bulk replies
pub const MAX_REPLY_DEPTH: usize = 64;

// =============================================================================
// Line helpers
// =============================================================================

fn unexpected_eof(message: &str) -> RespdError {
    RespdError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, message.to_string()))
}

/// Read one line, stripping the LF / CRLF terminator
fn read_line<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let limit = (MAX_INLINE_LEN + 2) as u64;
    let mut line = Vec::new();
    let n = reader.by_ref().take(limit).read_until(b'\n', &mut line)?;

    if n == 0 {
        return Err(unexpected_eof("connection closed"));
    }
    if line.last() != Some(&b'\n') {
        if n as u64 == limit {
            return Err(RespdError::Protocol(format!(
                "line exceeds {} bytes",
                MAX_INLINE_LEN
            )));
        }
        return Err(unexpected_eof("connection closed mid-line"));
    }

    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    if line.len() > MAX_INLINE_LEN {
        return Err(RespdError::Protocol(format!(
            "line exceeds {} bytes",
            MAX_INLINE_LEN
        )));
    }
    Ok(line)
}

fn parse_int(digits: &[u8]) -> Result<i64> {
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            RespdError::Protocol(format!(
                "invalid integer '{}'",
                String::from_utf8_lossy(digits)
            ))
        })
}

/// Read `len` payload bytes followed by CRLF
fn read_payload<R: BufRead>(reader: &mut R, len: i64) -> Result<Bytes> {
    if len < 0 || len as u64 > MAX_BULK_LEN as u64 {
        return Err(RespdError::Protocol(format!("invalid bulk length {}", len)));
    }
    let len = len as usize;

    let mut payload = Vec::new();
    reader
        .by_ref()
        .take(len as u64 + 2)
        .read_to_end(&mut payload)?;
    if payload.len() < len + 2 {
        return Err(unexpected_eof("connection closed mid-bulk"));
    }
    if !payload.ends_with(b"\r\n") {
        return Err(RespdError::Protocol(
            "bulk string not terminated by CRLF".to_string(),
        ));
    }
    payload.truncate(len);
    Ok(Bytes::from(payload))
}

// =============================================================================
// Requests
// =============================================================================

/// Read a complete request from a stream
///
/// Blocks until a complete request is received or an error occurs. Empty
/// multi-bulk requests and blank inline lines are skipped. A stream that
/// ends before the first byte yields an `UnexpectedEof` I/O error.
pub fn read_request<R: BufRead>(reader: &mut R) -> Result<Request> {
    loop {
        let line = read_line(reader)?;

        let parts = match line.split_first() {
            Some((b'*', count)) => {
                let count = parse_int(count)?;
                if count <= 0 {
                    continue;
                }
                if count as u64 > MAX_ARGS as u64 {
                    return Err(RespdError::Protocol(format!(
                        "too many arguments: {} (max {})",
                        count, MAX_ARGS
                    )));
                }
                read_bulk_args(reader, count as usize)?
            }
            _ => {
                let parts: Vec<Bytes> = line
                    .split(|b| b.is_ascii_whitespace())
                    .filter(|part| !part.is_empty())
                    .map(Bytes::copy_from_slice)
                    .collect();
                if parts.is_empty() {
                    continue;
                }
                parts
            }
        };

        return build_request(parts);
    }
}

fn read_bulk_args<R: BufRead>(reader: &mut R, count: usize) -> Result<Vec<Bytes>> {
    let mut args = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        let header = read_line(reader)?;
        match header.split_first() {
            Some((b'$', len)) => {
                let len = parse_int(len)?;
                args.push(read_payload(reader, len)?);
            }
            _ => {
                return Err(RespdError::Protocol(format!(
                    "expected '$', got '{}'",
                    String::from_utf8_lossy(&header)
                )))
            }
        }
    }
    Ok(args)
}

/// Names that are not UTF-8 are decoded lossily; they can never match a
/// registered command and so are answered as unknown.
fn build_request(mut parts: Vec<Bytes>) -> Result<Request> {
    let name = parts.remove(0);
    let name = String::from_utf8_lossy(&name).into_owned();
    Ok(Request::new(name, parts))
}

/// Decode a request from bytes
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    read_request(&mut Cursor::new(bytes))
}

/// Encode a request as a multi-bulk message
pub fn encode_request(request: &Request) -> Vec<u8> {
    let mut message = Vec::new();
    message.extend_from_slice(format!("*{}\r\n", request.args.len() + 1).as_bytes());
    for part in std::iter::once(request.name.as_bytes()).chain(request.args.iter().map(|a| &a[..])) {
        message.extend_from_slice(format!("${}\r\n", part.len()).as_bytes());
        message.extend_from_slice(part);
        message.extend_from_slice(b"\r\n");
    }
    message
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    writer.write_all(&encode_request(request))?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Replies
// =============================================================================

/// Encode a reply to bytes
pub fn encode_reply(reply: &Reply) -> Vec<u8> {
    let mut buf = Vec::new();
    reply.encode_into(&mut buf);
    buf
}

/// Write a reply to a stream and flush it
///
/// Returns the number of bytes written.
pub fn write_reply<W: Write>(writer: &mut W, reply: &Reply) -> Result<usize> {
    let n = reply.write_to(writer)?;
    writer.flush()?;
    Ok(n)
}

/// Read a complete reply from a stream
///
/// Arrays nested deeper than [`MAX_REPLY_DEPTH`] are a protocol error.
pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Reply> {
    read_reply_at(reader, 0)
}

fn read_reply_at<R: BufRead>(reader: &mut R, depth: usize) -> Result<Reply> {
    if depth > MAX_REPLY_DEPTH {
        return Err(RespdError::Protocol(format!(
            "reply nested deeper than {} levels",
            MAX_REPLY_DEPTH
        )));
    }

    let line = read_line(reader)?;
    let (kind, rest) = line
        .split_first()
        .ok_or_else(|| RespdError::Protocol("empty reply line".to_string()))?;

    match kind {
        b'+' => Ok(Reply::Status(String::from_utf8_lossy(rest).into_owned())),
        b'-' => Ok(Reply::Error(String::from_utf8_lossy(rest).into_owned())),
        b':' => Ok(Reply::Integer(parse_int(rest)?)),
        b'$' => match parse_int(rest)? {
            -1 => Ok(Reply::Nil),
            len => Ok(Reply::Bulk(read_payload(reader, len)?)),
        },
        b'*' => match parse_int(rest)? {
            -1 => Ok(Reply::NilArray),
            n if n < 0 || n as u64 > MAX_ARGS as u64 => Err(RespdError::Protocol(format!(
                "invalid multi-bulk length {}",
                n
            ))),
            n => (0..n)
                .map(|_| read_reply_at(reader, depth + 1))
                .collect::<Result<Vec<_>>>()
                .map(Reply::Array),
        },
        other => Err(RespdError::Protocol(format!(
            "unknown reply type '{}'",
            *other as char
        ))),
    }
}

/// Decode a reply from bytes
pub fn decode_reply(bytes: &[u8]) -> Result<Reply> {
    read_reply(&mut Cursor::new(bytes))
}
