//! In-memory key-value store with lazy TTL expiry.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::RwLock,
    time::Duration,
};

use async_trait::async_trait;
use beru_core::{KeyValueStore, StoreError};
use bytes::Bytes;
use tokio::time::Instant;

#[derive(Debug, Clone)]
enum Value {
    String(Bytes),
    Set(BTreeSet<String>),
    Hash(BTreeMap<String, String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory store implementation.
///
/// Useful for development, tests, and single-process deployments.
/// Data is lost on restart. Expired keys are dropped when next touched;
/// there is no background sweeper.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(
        &self,
        key: &str,
        f: impl FnOnce(Option<&Value>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let now = Instant::now();
        f(entries.get(key).filter(|e| !e.is_expired(now)).map(|e| &e.value))
    }

    fn write<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut HashMap<String, Entry>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let now = Instant::now();
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        f(&mut entries)
    }

    fn set_mut<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &str,
    ) -> Result<&'a mut BTreeSet<String>, StoreError> {
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Set(BTreeSet::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Set(set) => Ok(set),
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn hash_mut<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &str,
    ) -> Result<&'a mut BTreeMap<String, String>, StoreError> {
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(BTreeMap::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Hash(hash) => Ok(hash),
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        self.read(key, |value| match value {
            None => Ok(None),
            Some(Value::String(bytes)) => Ok(Some(bytes.clone())),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        })
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.write(key, |entries| {
            entries.insert(
                key.to_string(),
                Entry {
                    value: Value::String(value),
                    expires_at: ttl.map(|ttl| Instant::now() + ttl),
                },
            );
            Ok(())
        })
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.write(key, |entries| Ok(entries.remove(key).is_some()))
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        self.write(key, |entries| {
            let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
                value: Value::String(Bytes::from_static(b"0")),
                expires_at: None,
            });
            let Value::String(bytes) = &entry.value else {
                return Err(StoreError::WrongType(key.to_string()));
            };
            let current = std::str::from_utf8(bytes)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or_else(|| StoreError::WrongType(key.to_string()))?;
            let next = current.saturating_add(1);
            entry.value = Value::String(Bytes::from(next.to_string()));
            Ok(next)
        })
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.read(key, |value| match value {
            None => Ok(Vec::new()),
            Some(Value::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        })
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.write(key, |entries| {
            Ok(Self::set_mut(entries, key)?.insert(member.to_string()))
        })
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.write(key, |entries| {
            let removed = match entries.get_mut(key).map(|e| &mut e.value) {
                None => false,
                Some(Value::Set(set)) => set.remove(member),
                Some(_) => return Err(StoreError::WrongType(key.to_string())),
            };
            if matches!(entries.get(key).map(|e| &e.value), Some(Value::Set(s)) if s.is_empty()) {
                entries.remove(key);
            }
            Ok(removed)
        })
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.read(key, |value| match value {
            None => Ok(false),
            Some(Value::Set(set)) => Ok(set.contains(member)),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        })
    }

    async fn set_difference(&self, key: &str, other: &str) -> Result<Vec<String>, StoreError> {
        let left = self.set_members(key).await?;
        let right: BTreeSet<String> = self.set_members(other).await?.into_iter().collect();
        Ok(left.into_iter().filter(|m| !right.contains(m)).collect())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        self.read(key, |value| match value {
            None => Ok(None),
            Some(Value::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        })
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.write(key, |entries| {
            Self::hash_mut(entries, key)?.insert(field.to_string(), value.to_string());
            Ok(())
        })
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        self.write(key, |entries| match entries.get_mut(key).map(|e| &mut e.value) {
            None => Ok(false),
            Some(Value::Hash(hash)) => Ok(hash.remove(field).is_some()),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        })
    }

    async fn hash_keys(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.read(key, |value| match value {
            None => Ok(Vec::new()),
            Some(Value::Hash(hash)) => Ok(hash.keys().cloned().collect()),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        })
    }
}
