//! [`SimpleStore`]: the single-mutex `HashMap` key store (§4.3).
//!
//! Grounded directly on `core/caches/simple_cache_store.go` in the original
//! implementation: one map, no sharding, list operations backed by a
//! double-ended queue so push/pop at either end stay O(1).

use std::collections::{HashMap, VecDeque};

use crate::error::{Error, Result};
use crate::store::{KeyStore, Value};

/// The default key store: a `HashMap<Vec<u8>, Value>` with no internal
/// locking of its own. Callers (the worker, via [`crate::server`]) wrap an
/// instance in `Arc<Mutex<SimpleStore>>` and take the mutex for the
/// duration of one command — see §4.3 and REDESIGN FLAG RF-2 in
/// SPEC_FULL.md for why this crate uses `Mutex` guards instead of explicit
/// `lock`/`unlock` calls.
#[derive(Debug, Default)]
pub struct SimpleStore {
    dict: HashMap<Vec<u8>, Value>,
}

impl SimpleStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for SimpleStore {
    fn get(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        match self.dict.get(key) {
            Some(Value::Str(s)) => Ok(s.clone()),
            Some(Value::List(_)) => Err(Error::WrongType),
            None => Err(Error::KeyNotFound),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.dict.insert(key.to_vec(), Value::Str(value));
    }

    fn rpush(&mut self, key: &[u8], values: &[Vec<u8>]) -> Result<()> {
        match self.dict.get_mut(key) {
            Some(Value::List(list)) => {
                list.extend(values.iter().cloned());
                Ok(())
            }
            Some(Value::Str(_)) => Err(Error::WrongType),
            None => {
                self.dict
                    .insert(key.to_vec(), Value::List(values.iter().cloned().collect()));
                Ok(())
            }
        }
    }

    fn rpop(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        match self.dict.get_mut(key) {
            Some(Value::List(list)) => {
                let popped = list.pop_back().ok_or(Error::KeyNotFound)?;
                if list.is_empty() {
                    self.dict.remove(key);
                }
                Ok(popped)
            }
            Some(Value::Str(_)) => Err(Error::WrongType),
            None => Err(Error::KeyNotFound),
        }
    }

    fn lpush(&mut self, key: &[u8], values: &[Vec<u8>]) -> Result<()> {
        match self.dict.get_mut(key) {
            Some(Value::List(list)) => {
                for value in values {
                    list.push_front(value.clone());
                }
                Ok(())
            }
            Some(Value::Str(_)) => Err(Error::WrongType),
            None => {
                let mut list = VecDeque::with_capacity(values.len());
                for value in values {
                    list.push_front(value.clone());
                }
                self.dict.insert(key.to_vec(), Value::List(list));
                Ok(())
            }
        }
    }

    fn lpop(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        match self.dict.get_mut(key) {
            Some(Value::List(list)) => {
                let popped = list.pop_front().ok_or(Error::KeyNotFound)?;
                if list.is_empty() {
                    self.dict.remove(key);
                }
                Ok(popped)
            }
            Some(Value::Str(_)) => Err(Error::WrongType),
            None => Err(Error::KeyNotFound),
        }
    }

    fn llen(&mut self, key: &[u8]) -> Result<usize> {
        match self.dict.get(key) {
            Some(Value::List(list)) => Ok(list.len()),
            _ => Err(Error::WrongType),
        }
    }

    fn lindex(&mut self, key: &[u8], index: i64) -> Result<Vec<u8>> {
        match self.dict.get(key) {
            Some(Value::List(list)) => {
                if index < 0 {
                    return Err(Error::IndexOutOfRange);
                }
                list.get(index as usize).cloned().ok_or(Error::IndexOutOfRange)
            }
            Some(Value::Str(_)) => Err(Error::WrongType),
            None => Err(Error::KeyNotFound),
        }
    }

    fn del(&mut self, key: &[u8]) {
        self.dict.remove(key);
    }
}
