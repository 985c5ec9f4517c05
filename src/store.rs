use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use thiserror::Error as ThisError;

/// Errors surfaced to clients verbatim as `-ERR ...` replies.
#[derive(Debug, ThisError, PartialEq)]
pub enum StoreError {
    #[error("ERR Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("ERR index out of range")]
    IndexOutOfRange,
}

/// The value held by a key. A key's variant never changes underneath a
/// command: operations against the wrong variant fail before mutating.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(Bytes),
    List(VecDeque<Bytes>),
    Hash(HashMap<Bytes, Bytes>),
}

/// Cloneable handle to the shared key space. Every accessor takes the one
/// process-wide lock for its whole body, so each command observes and
/// mutates the store atomically with respect to other connections.
#[derive(Clone, Default)]
pub struct Store {
    entries: Arc<Mutex<HashMap<Bytes, Value>>>,
}

impl Store {
    pub fn new() -> Store {
        Store {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Bytes>, StoreError> {
        let entries = self.entries.lock().unwrap();

        match entries.get(key) {
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(None),
        }
    }

    /// Overwrites whatever the key held before, regardless of variant.
    pub fn set(&self, key: Bytes, value: Bytes) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key, Value::String(value));
    }

    /// Inserts each value at the head of the list, in argument order, so the
    /// last value given ends up at index 0. Creates the list if the key is
    /// absent. Returns how many values were pushed.
    pub fn list_head_push(&self, key: Bytes, values: Vec<Bytes>) -> Result<usize, StoreError> {
        let mut entries = self.entries.lock().unwrap();
        let pushed = values.len();

        match entries.get_mut(&key) {
            Some(Value::List(list)) => {
                for value in values {
                    list.push_front(value);
                }
            }
            Some(_) => return Err(StoreError::WrongType),
            None => {
                let mut list = VecDeque::with_capacity(pushed);
                for value in values {
                    list.push_front(value);
                }
                entries.insert(key, Value::List(list));
            }
        }

        Ok(pushed)
    }

    /// Removes and returns the head of the list. A list drained by its last
    /// pop is deleted, so the key reads as absent afterwards.
    pub fn list_head_pop(&self, key: &[u8]) -> Result<Option<Bytes>, StoreError> {
        let mut entries = self.entries.lock().unwrap();

        let list = match entries.get_mut(key) {
            Some(Value::List(list)) => list,
            Some(_) => return Err(StoreError::WrongType),
            None => return Ok(None),
        };

        let head = list.pop_front();
        if list.is_empty() {
            entries.remove(key);
        }

        Ok(head)
    }

    pub fn list_len(&self, key: &[u8]) -> Result<usize, StoreError> {
        let entries = self.entries.lock().unwrap();

        match entries.get(key) {
            Some(Value::List(list)) => Ok(list.len()),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(0),
        }
    }

    /// Returns the element at `index`. Negative indices count from the tail:
    /// for a list of length L, valid indices are -L..L. An absent key is
    /// absent, not out of range.
    pub fn list_index(&self, key: &[u8], index: i64) -> Result<Option<Bytes>, StoreError> {
        let entries = self.entries.lock().unwrap();

        let list = match entries.get(key) {
            Some(Value::List(list)) => list,
            Some(_) => return Err(StoreError::WrongType),
            None => return Ok(None),
        };

        let len = list.len() as i64;
        let position = if index < 0 { len + index } else { index };
        if position < 0 || position >= len {
            return Err(StoreError::IndexOutOfRange);
        }

        Ok(list.get(position as usize).cloned())
    }

    /// Sets a hash field, creating the hash if the key is absent. Returns
    /// true when the field did not exist before.
    pub fn hash_set(&self, key: Bytes, field: Bytes, value: Bytes) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().unwrap();

        match entries.get_mut(&key) {
            Some(Value::Hash(hash)) => {
                let is_new = !hash.contains_key(&field);
                hash.insert(field, value);
                Ok(is_new)
            }
            Some(_) => Err(StoreError::WrongType),
            None => {
                let mut hash = HashMap::new();
                hash.insert(field, value);
                entries.insert(key, Value::Hash(hash));
                Ok(true)
            }
        }
    }

    pub fn hash_get(&self, key: &[u8], field: &[u8]) -> Result<Option<Bytes>, StoreError> {
        let entries = self.entries.lock().unwrap();

        match entries.get(key) {
            Some(Value::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(None),
        }
    }
}
