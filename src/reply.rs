//! The reply encoder: a pure function set mapping typed values to RESP byte
//! sequences (§4.1 of the specification).
//!
//! None of these functions allocate more than the one `Vec<u8>` they return,
//! and none depend on I/O, `tokio`, or `tracing` — the encoder is unit-tested
//! in isolation from the rest of the stack.

/// A single typed reply value, ready for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A length-prefixed, binary-safe byte string.
    Blob(Vec<u8>),
    /// A signed decimal integer.
    Integer(i64),
    /// The RESP3 null form (`_\r\n`). Never the RESP2 `$-1\r\n` form.
    Null,
    /// A short, stable, human-readable error message.
    Error(String),
}

impl Reply {
    /// Convenience constructor for a blob reply from anything byte-like.
    pub fn blob(bytes: impl Into<Vec<u8>>) -> Self {
        Reply::Blob(bytes.into())
    }

    /// Appends this reply's RESP encoding onto `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Reply::Blob(bytes) => encode_blob_into(bytes, out),
            Reply::Integer(n) => encode_integer_into(*n, out),
            Reply::Null => out.extend_from_slice(b"_\r\n"),
            Reply::Error(msg) => encode_error_into(msg, out),
        }
    }

    /// Encodes this reply into a freshly allocated buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }
}

/// Encodes a blob string: `$<len>\r\n<bytes>\r\n`.
///
/// No escaping of embedded `\r\n` is performed — the length prefix already
/// makes the encoding binary-safe.
pub fn encode_blob_into(bytes: &[u8], out: &mut Vec<u8>) {
    out.push(b'$');
    out.extend_from_slice(bytes.len().to_string().as_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(bytes);
    out.extend_from_slice(b"\r\n");
}

/// Encodes a signed integer: `:<n>\r\n`.
pub fn encode_integer_into(n: i64, out: &mut Vec<u8>) {
    out.push(b':');
    out.extend_from_slice(n.to_string().as_bytes());
    out.extend_from_slice(b"\r\n");
}

/// Encodes the RESP3 null form: `_\r\n`.
pub fn encode_null_into(out: &mut Vec<u8>) {
    out.extend_from_slice(b"_\r\n");
}

/// Encodes a simple error: `-<msg>\r\n`.
///
/// `msg` must not itself contain `\r` or `\n`; every message this crate
/// produces is a short fixed string from [`crate::error::Error::client_message`],
/// so this invariant always holds in practice.
pub fn encode_error_into(msg: &str, out: &mut Vec<u8>) {
    out.push(b'-');
    out.extend_from_slice(msg.as_bytes());
    out.extend_from_slice(b"\r\n");
}

/// The fixed `PONG` reply to `PING`, pre-encoded as the spec's example byte
/// sequence (`$4\r\nPONG\r\n`).
pub const PONG: &[u8] = b"$4\r\nPONG\r\n";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_roundtrip_bytes() {
        assert_eq!(Reply::blob(*b"REDIGO").encode(), b"$6\r\nREDIGO\r\n");
        assert_eq!(Reply::blob(b"".to_vec()).encode(), b"$0\r\n\r\n");
    }

    #[test]
    fn integer_encoding() {
        assert_eq!(Reply::Integer(4).encode(), b":4\r\n");
        assert_eq!(Reply::Integer(-1).encode(), b":-1\r\n");
        assert_eq!(Reply::Integer(0).encode(), b":0\r\n");
    }

    #[test]
    fn null_encoding() {
        assert_eq!(Reply::Null.encode(), b"_\r\n");
    }

    #[test]
    fn error_encoding() {
        assert_eq!(
            Reply::Error("Command malformed".to_string()).encode(),
            b"-Command malformed\r\n"
        );
    }

    #[test]
    fn pong_matches_blob_encoding_of_pong() {
        assert_eq!(PONG, Reply::blob(*b"PONG").encode().as_slice());
    }

    #[test]
    fn concatenated_replies_match_pipeline_example() {
        let mut out = Vec::new();
        Reply::Null.encode_into(&mut out);
        Reply::blob(*b"crayoli").encode_into(&mut out);
        assert_eq!(out, b"_\r\n$7\r\ncrayoli\r\n");
    }
}
