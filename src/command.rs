//! The command table (§4.2, §4.3): turns a parsed array-of-blob-strings
//! frame into a validated [`Command`], and executes a [`Command`] against a
//! [`KeyStore`] to produce a [`Reply`].
//!
//! The original implementation dispatches on a map of closures keyed by
//! command name (`cmd/redigo_server/main.go`'s handler table). This crate
//! uses a tagged enum instead — one variant per command, carrying already-
//! validated arguments — so that arity and argument-shape checks happen once,
//! at parse time, rather than being re-derived inside every handler body.
//! See REDESIGN FLAG RF-1 in SPEC_FULL.md.

use crate::error::{Error, Result};
use crate::reply::Reply;
use crate::store::KeyStore;

/// A single recognized command, with its arguments already validated for
/// shape (arity, and for `LINDEX`, that its index argument parses as an
/// integer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get { key: Vec<u8> },
    Set { key: Vec<u8>, value: Vec<u8> },
    Rpush { key: Vec<u8>, values: Vec<Vec<u8>> },
    Rpop { key: Vec<u8> },
    Lpush { key: Vec<u8>, values: Vec<Vec<u8>> },
    Lpop { key: Vec<u8> },
    Llen { key: Vec<u8> },
    Lindex { key: Vec<u8>, index: i64 },
    Del { key: Vec<u8> },
    Ping,
}

impl Command {
    /// Builds a [`Command`] from a frame's blob-string arguments, where
    /// `args[0]` is the command name and `args[1..]` are its parameters.
    /// Matching is exact-case, uppercase only (§4.2.4): a lowercase command
    /// name is not normalized server-side and is rejected as unknown. Any
    /// case-folding is a client-side concern (see the CLI REPL in §6).
    ///
    /// Returns [`Error::UnknownCommand`] if `args[0]` is not in the table,
    /// or [`Error::Malformed`] if the arity (or, for `LINDEX`, the shape of
    /// an argument) does not match.
    pub fn from_frame(args: &[Vec<u8>]) -> Result<Self> {
        let (name, rest) = args.split_first().ok_or(Error::Malformed)?;

        match name.as_slice() {
            b"GET" => {
                let [key] = take_exact(rest)?;
                Ok(Command::Get { key })
            }
            b"SET" => {
                let [key, value] = take_exact(rest)?;
                Ok(Command::Set { key, value })
            }
            b"RPUSH" => {
                let (key, values) = take_key_and_rest(rest)?;
                Ok(Command::Rpush { key, values })
            }
            b"RPOP" => {
                let [key] = take_exact(rest)?;
                Ok(Command::Rpop { key })
            }
            b"LPUSH" => {
                let (key, values) = take_key_and_rest(rest)?;
                Ok(Command::Lpush { key, values })
            }
            b"LPOP" => {
                let [key] = take_exact(rest)?;
                Ok(Command::Lpop { key })
            }
            b"LLEN" => {
                let [key] = take_exact(rest)?;
                Ok(Command::Llen { key })
            }
            b"LINDEX" => {
                let [key, index] = take_exact(rest)?;
                let index = std::str::from_utf8(&index)
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .ok_or(Error::Malformed)?;
                Ok(Command::Lindex { key, index })
            }
            b"DEL" => {
                let [key] = take_exact(rest)?;
                Ok(Command::Del { key })
            }
            b"PING" => {
                if rest.is_empty() {
                    Ok(Command::Ping)
                } else {
                    Err(Error::Malformed)
                }
            }
            _ => Err(Error::UnknownCommand),
        }
    }

    /// Runs this command against `store`, producing the [`Reply`] to write
    /// back to the client. The store's internal-only errors
    /// ([`Error::KeyNotFound`], [`Error::IndexOutOfRange`]) are folded into
    /// [`Reply::Null`] here — they never propagate past this function.
    pub fn execute(&self, store: &mut dyn KeyStore) -> Reply {
        let result = match self {
            Command::Get { key } => store.get(key).map(Reply::blob),
            Command::Set { key, value } => {
                store.set(key, value.clone());
                Ok(Reply::Null)
            }
            Command::Rpush { key, values } => store.rpush(key, values).map(|()| Reply::Null),
            Command::Rpop { key } => store.rpop(key).map(Reply::blob),
            Command::Lpush { key, values } => store.lpush(key, values).map(|()| Reply::Null),
            Command::Lpop { key } => store.lpop(key).map(Reply::blob),
            Command::Llen { key } => store.llen(key).map(|n| Reply::Integer(n as i64)),
            Command::Lindex { key, index } => store.lindex(key, *index).map(Reply::blob),
            Command::Del { key } => {
                store.del(key);
                Ok(Reply::Null)
            }
            Command::Ping => Ok(Reply::blob(*b"PONG")),
        };

        match result {
            Ok(reply) => reply,
            Err(Error::KeyNotFound) | Err(Error::IndexOutOfRange) => Reply::Null,
            Err(err) => Reply::Error(err.client_message().to_string()),
        }
    }
}

fn take_exact<const N: usize>(args: &[Vec<u8>]) -> Result<[Vec<u8>; N]> {
    let arr: [Vec<u8>; N] = args.to_vec().try_into().map_err(|_| Error::Malformed)?;
    Ok(arr)
}

fn take_key_and_rest(args: &[Vec<u8>]) -> Result<(Vec<u8>, Vec<Vec<u8>>)> {
    let (key, values) = args.split_first().ok_or(Error::Malformed)?;
    if values.is_empty() {
        return Err(Error::Malformed);
    }
    Ok((key.clone(), values.to_vec()))
}
