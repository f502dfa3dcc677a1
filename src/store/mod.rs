//! The key store (§3, §4.3): an in-memory mapping of byte-string keys to
//! typed [`Value`]s, exposing the ten commands of the command table plus
//! locking.
//!
//! [`KeyStore`] is a trait rather than a concrete type so that an
//! alternative back-end (a sharded store, say) can be substituted without
//! touching the worker loop — only [`SimpleStore`], the single-mutex
//! `HashMap` back-end, ships with this crate; see DESIGN.md for why the
//! sharded alternative contemplated by the specification was not built.

mod simple;

pub use simple::SimpleStore;

use crate::error::Result;
#[allow(unused_imports)]
use crate::error::Error;

/// A stored value: exactly one of a scalar string or an ordered list of
/// strings. A key holds one variant at a time; commands that address the
/// wrong variant fail with [`Error::WrongType`] rather than coercing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A scalar UTF-8 byte string, as stored by `SET`.
    Str(Vec<u8>),
    /// An ordered sequence of UTF-8 byte strings, as built by `RPUSH`/`LPUSH`.
    List(std::collections::VecDeque<Vec<u8>>),
}

/// The operations a key store must support. Every method takes `&mut self`:
/// callers are expected to hold an exclusive lock (see [`SimpleStore`]) for
/// the duration of one command, never across a pipeline (§4.3).
pub trait KeyStore: Send {
    /// `GET key`. [`Error::KeyNotFound`] if absent, [`Error::WrongType`] if
    /// `key` holds a list.
    fn get(&mut self, key: &[u8]) -> Result<Vec<u8>>;

    /// `SET key value`. Always succeeds, overwriting any prior value or list.
    fn set(&mut self, key: &[u8], value: Vec<u8>);

    /// `RPUSH key values...`. Creates the list if absent.
    /// [`Error::WrongType`] if `key` holds a string.
    fn rpush(&mut self, key: &[u8], values: &[Vec<u8>]) -> Result<()>;

    /// `RPOP key`. [`Error::KeyNotFound`] if absent, [`Error::WrongType`] if
    /// `key` holds a string. Removes the key once the list becomes empty.
    fn rpop(&mut self, key: &[u8]) -> Result<Vec<u8>>;

    /// `LPUSH key values...`. The last argument ends up at the head of the
    /// list (§4.2.3, §9 RF none — this ordering is pinned by the
    /// specification's scenario 4+5, not a redesign). Creates the list if
    /// absent. [`Error::WrongType`] if `key` holds a string.
    fn lpush(&mut self, key: &[u8], values: &[Vec<u8>]) -> Result<()>;

    /// `LPOP key`. Same error behavior as [`KeyStore::rpop`].
    fn lpop(&mut self, key: &[u8]) -> Result<Vec<u8>>;

    /// `LLEN key`. [`Error::WrongType`] both when `key` holds a string and
    /// when `key` is entirely absent — the store does not distinguish the
    /// two for this command (see the Open Questions in SPEC_FULL.md).
    fn llen(&mut self, key: &[u8]) -> Result<usize>;

    /// `LINDEX key index`. [`Error::KeyNotFound`] if absent,
    /// [`Error::IndexOutOfRange`] if `index` is negative or past the end,
    /// [`Error::WrongType`] if `key` holds a string.
    fn lindex(&mut self, key: &[u8], index: i64) -> Result<Vec<u8>>;

    /// `DEL key`. Removes the key regardless of prior presence; never fails.
    fn del(&mut self, key: &[u8]);
}
