//! The stable error taxonomy shared by the parser, the key store, and the
//! worker loop.
//!
//! Every fallible operation in this crate returns `Result<T, Error>`. The
//! *kind* of an [`Error`] determines how the worker reacts to it (§7 of the
//! specification); [`Error::client_message`] is the only part of an error
//! that is ever written to the wire. Internal detail (the variant name, any
//! wrapped [`std::io::Error`]) is for logs only.

use thiserror::Error as ThisError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The stable error kinds produced by this crate.
///
/// Variants are grouped the way §7 of the specification groups them: parser
/// errors first, then store errors. `client_message` is what separates a
/// "reportable" error (has a message, gets written to the client) from a
/// purely internal signal such as [`Error::Incomplete`].
#[derive(Debug, ThisError)]
pub enum Error {
    /// The connection's underlying transport failed (EOF, reset, deadline
    /// exceeded, closed pipe). Never reported to the client; the worker
    /// silently closes the connection.
    #[error("connection transport error")]
    Transport(#[source] std::io::Error),

    /// Bytes read so far are a valid prefix of some frame, but not yet a
    /// complete one. Purely internal — never reported, never logged as a
    /// failure.
    #[error("incomplete frame")]
    Incomplete,

    /// The bytes read so far definitively violate the RESP grammar, or a
    /// recognized command was invoked with the wrong arity.
    #[error("Command malformed")]
    Malformed,

    /// The cumulative byte count of a single logical message exceeded the
    /// configured ceiling.
    #[error("Call exceeded size allowed")]
    SizeExceeded {
        /// The configured ceiling, for logging.
        limit: usize,
    },

    /// The first element of a command frame did not match any entry in the
    /// command table.
    #[error("Command not found")]
    UnknownCommand,

    /// A command addressed a key whose stored value is of the other variant
    /// (a list command against a string key, or vice versa).
    #[error("Operation against a key holding the wrong kind of value")]
    WrongType,

    /// Internal-only: the addressed key does not exist. Command execution
    /// folds this into a null reply rather than exposing it on the wire;
    /// kept as its own variant so the store stays testable in isolation
    /// (see §4.3 of the specification).
    #[error("key not found")]
    KeyNotFound,

    /// Internal-only: `LINDEX` addressed a position outside the list's
    /// bounds (including negative indices). Folded into a null reply, like
    /// [`Error::KeyNotFound`].
    #[error("index out of range")]
    IndexOutOfRange,
}

impl Error {
    /// The short, stable string written to the client for errors that reach
    /// the wire. Calling this on [`Error::Incomplete`], [`Error::KeyNotFound`]
    /// or [`Error::IndexOutOfRange`] — variants that never reach the wire
    /// directly — is a logic error in the caller, but we still return a
    /// reasonable message rather than panicking.
    pub fn client_message(&self) -> &'static str {
        match self {
            Error::Transport(_) => "connection error",
            Error::Incomplete => "incomplete frame",
            Error::Malformed => "Command malformed",
            Error::SizeExceeded { .. } => "Call exceeded size allowed",
            Error::UnknownCommand => "Command not found",
            Error::WrongType => "Operation against a key holding the wrong kind of value",
            Error::KeyNotFound => "key not found",
            Error::IndexOutOfRange => "index out of range",
        }
    }

    /// True for transport-level failures that should close the connection
    /// silently, without writing anything back to the client.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// True for the internal "need more bytes" signal.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Error::Incomplete)
    }
}

impl From<std::io::Error> for Error {
    /// Every `std::io::Error` reaching this conversion came from a live
    /// socket read or write, never from the in-memory parser — so it is
    /// always transport-level, even `UnexpectedEof`. The parser's own
    /// "need more bytes" signal is [`Error::Incomplete`], a distinct
    /// condition produced by [`crate::parser::Parser`], not by I/O.
    fn from(err: std::io::Error) -> Self {
        Error::Transport(err)
    }
}
