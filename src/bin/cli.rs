//! respd CLI Client
//!
//! Sends a single command to a Redis-protocol server and prints the reply.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::process::ExitCode;

use bytes::Bytes;
use clap::Parser;
use respd::protocol::{read_reply, write_request};
use respd::{Reply, Request};

/// respd CLI
#[derive(Parser, Debug)]
#[command(name = "respd-cli")]
#[command(about = "Send one command to a Redis-protocol server")]
struct Args {
    /// Server address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6389")]
    server: String,

    /// Unix socket path (overrides --server)
    #[arg(short, long)]
    unix: Option<String>,

    /// Command name followed by its arguments
    #[arg(required = true, num_args = 1..)]
    command: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut parts = args.command.into_iter();
    let name = parts.next().unwrap_or_default();
    let request = Request::new(name, parts.map(Bytes::from).collect());

    let result = match &args.unix {
        Some(path) => run_unix(path, &request),
        None => run_tcp(&args.server, &request),
    };

    match result {
        Ok(reply) => {
            print_reply(&reply, 0);
            if reply.is_error() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("(error) {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_tcp(addr: &str, request: &Request) -> respd::Result<Reply> {
    let stream = TcpStream::connect(addr)?;
    let mut writer = BufWriter::new(stream.try_clone()?);
    write_request(&mut writer, request)?;
    read_reply(&mut BufReader::new(stream))
}

#[cfg(unix)]
fn run_unix(path: &str, request: &Request) -> respd::Result<Reply> {
    use std::os::unix::net::UnixStream;

    let stream = UnixStream::connect(path)?;
    let mut writer = BufWriter::new(stream.try_clone()?);
    write_request(&mut writer, request)?;
    read_reply(&mut BufReader::new(stream))
}

#[cfg(not(unix))]
fn run_unix(_path: &str, _request: &Request) -> respd::Result<Reply> {
    Err(respd::RespdError::Config(
        "unix sockets are unsupported on this platform".to_string(),
    ))
}

/// Print a reply the way redis-cli does
fn print_reply(reply: &Reply, depth: usize) {
    let indent = "   ".repeat(depth);
    match reply {
        Reply::Status(text) => println!("{}{}", indent, text),
        Reply::Error(message) => println!("{}(error) {}", indent, message),
        Reply::Integer(n) => println!("{}(integer) {}", indent, n),
        Reply::Bulk(payload) => println!("{}\"{}\"", indent, String::from_utf8_lossy(payload)),
        Reply::Nil | Reply::NilArray => println!("{}(nil)", indent),
        Reply::Array(items) if items.is_empty() => println!("{}(empty array)", indent),
        Reply::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                println!("{}{})", indent, i + 1);
                print_reply(item, depth + 1);
            }
        }
    }
}
