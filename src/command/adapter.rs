//! Dispatch adapters
//!
//! Bridges a generic [`Request`] to the native call shape of one handler
//! operation.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::DispatchError;
use crate::protocol::{Reply, Request};

/// Outcome of dispatching one request
pub type DispatchResult = std::result::Result<Reply, DispatchError>;

/// A callable bound to one handler operation. Built once, never mutated.
pub type Dispatch = Arc<dyn Fn(&Request) -> DispatchResult + Send + Sync>;

// =============================================================================
// Arguments
// =============================================================================

/// Conversion from one raw request argument into a typed parameter
pub trait FromArg: Sized {
    /// Convert, or explain why the argument is unacceptable
    fn from_arg(arg: &Bytes) -> Result<Self, String>;
}

impl FromArg for Bytes {
    fn from_arg(arg: &Bytes) -> Result<Self, String> {
        Ok(arg.clone())
    }
}

impl FromArg for Vec<u8> {
    fn from_arg(arg: &Bytes) -> Result<Self, String> {
        Ok(arg.to_vec())
    }
}

impl FromArg for String {
    fn from_arg(arg: &Bytes) -> Result<Self, String> {
        String::from_utf8(arg.to_vec()).map_err(|_| "value is not valid UTF-8".to_string())
    }
}

fn parse_number<T: std::str::FromStr>(arg: &Bytes, kind: &str) -> Result<T, String> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .ok_or_else(|| format!("value is not {}", kind))
}

impl FromArg for i64 {
    fn from_arg(arg: &Bytes) -> Result<Self, String> {
        parse_number(arg, "an integer")
    }
}

impl FromArg for u64 {
    fn from_arg(arg: &Bytes) -> Result<Self, String> {
        parse_number(arg, "a non-negative integer")
    }
}

impl FromArg for f64 {
    fn from_arg(arg: &Bytes) -> Result<Self, String> {
        parse_number(arg, "a valid float")
    }
}

// =============================================================================
// Return values
// =============================================================================

/// Conversion from an operation's return value into a reply
///
/// `&'static str` becomes a status line, `String`/`Bytes`/`Vec<u8>` become
/// bulk strings, `None` becomes nil and `()` becomes `+OK`.
pub trait IntoReply {
    fn into_reply(self) -> DispatchResult;
}

impl IntoReply for Reply {
    fn into_reply(self) -> DispatchResult {
        Ok(self)
    }
}

impl IntoReply for () {
    fn into_reply(self) -> DispatchResult {
        Ok(Reply::ok())
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> DispatchResult {
        Ok(Reply::status(self))
    }
}

impl IntoReply for String {
    fn into_reply(self) -> DispatchResult {
        Ok(Reply::bulk(self))
    }
}

impl IntoReply for Bytes {
    fn into_reply(self) -> DispatchResult {
        Ok(Reply::Bulk(self))
    }
}

impl IntoReply for Vec<u8> {
    fn into_reply(self) -> DispatchResult {
        Ok(Reply::bulk(self))
    }
}

impl IntoReply for i64 {
    fn into_reply(self) -> DispatchResult {
        Ok(Reply::Integer(self))
    }
}

impl IntoReply for usize {
    fn into_reply(self) -> DispatchResult {
        i64::try_from(self)
            .map(Reply::Integer)
            .map_err(|_| DispatchError::failed(format!("integer {} out of range", self)))
    }
}

impl IntoReply for bool {
    fn into_reply(self) -> DispatchResult {
        Ok(Reply::Integer(self as i64))
    }
}

impl IntoReply for Vec<Bytes> {
    fn into_reply(self) -> DispatchResult {
        Ok(Reply::bulks(self))
    }
}

impl IntoReply for Vec<String> {
    fn into_reply(self) -> DispatchResult {
        Ok(Reply::bulks(self))
    }
}

impl IntoReply for Vec<Vec<u8>> {
    fn into_reply(self) -> DispatchResult {
        Ok(Reply::bulks(self))
    }
}

impl IntoReply for Vec<Reply> {
    fn into_reply(self) -> DispatchResult {
        Ok(Reply::Array(self))
    }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> DispatchResult {
        match self {
            Some(value) => value.into_reply(),
            None => Ok(Reply::Nil),
        }
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<DispatchError>,
{
    fn into_reply(self) -> DispatchResult {
        match self {
            Ok(value) => value.into_reply(),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Operations
// =============================================================================

/// An operation that can be adapted into a [`Dispatch`]
///
/// Implemented for closures of zero to four parameters whose parameters are
/// [`FromArg`] and whose return value is [`IntoReply`]. `Args` only steers
/// type inference.
pub trait IntoDispatch<Args>: Send + Sync + 'static {
    /// Bind the operation under `name`, checking arity on every call
    fn into_dispatch(self, name: &str) -> Dispatch;
}

macro_rules! impl_into_dispatch {
    ($arity:expr; $($ty:ident => $var:ident),*) => {
        impl<F, R, $($ty,)*> IntoDispatch<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: IntoReply,
            $($ty: FromArg,)*
        {
            #[allow(unused_mut, unused_variables, unused_assignments)]
            fn into_dispatch(self, name: &str) -> Dispatch {
                let name = name.to_string();
                Arc::new(move |request: &Request| -> DispatchResult {
                    if request.args.len() != $arity {
                        return Err(DispatchError::WrongArity {
                            command: name.clone(),
                            expected: $arity,
                            got: request.args.len(),
                        });
                    }

                    let mut position = 0usize;
                    $(
                        let $var = match request.args.get(position) {
                            Some(raw) => <$ty as FromArg>::from_arg(raw).map_err(|reason| {
                                DispatchError::InvalidArgument {
                                    position: position + 1,
                                    reason,
                                }
                            })?,
                            None => {
                                return Err(DispatchError::WrongArity {
                                    command: name.clone(),
                                    expected: $arity,
                                    got: request.args.len(),
                                })
                            }
                        };
                        position += 1;
                    )*

                    (self)($($var),*).into_reply()
                })
            }
        }
    };
}

impl_into_dispatch!(0;);
impl_into_dispatch!(1; A1 => a1);
impl_into_dispatch!(2; A1 => a1, A2 => a2);
impl_into_dispatch!(3; A1 => a1, A2 => a2, A3 => a3);
impl_into_dispatch!(4; A1 => a1, A2 => a2, A3 => a3, A4 => a4);

/// Adapt an operation that takes the whole request (variadic commands)
pub(crate) fn raw_dispatch<F, R>(operation: F) -> Dispatch
where
    F: Fn(&Request) -> R + Send + Sync + 'static,
    R: IntoReply,
{
    Arc::new(move |request: &Request| operation(request).into_reply())
}
