//! The typed value store.
//!
//! Each of the six namespaces sits behind its own reader-writer lock, so commands
//! on different types never contend. A key lives in at most one namespace at a time;
//! the `owners` index enforces that and is what produces `WRONGTYPE` errors.
//!
//! Lock order is fixed: a namespace lock first (strings, lists, hashes, sets,
//! sorted sets, streams), then `owners`, then `versions`. `owners` and `versions`
//! are never held while waiting for a namespace lock.

mod hashes;
mod lists;
mod sets;
mod snapshot;
mod sorted_sets;
mod streams;
mod strings;

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, VecDeque},
    sync::atomic::{AtomicU64, Ordering},
};

use thiserror::Error;
use tokio::{sync::RwLock, time::Instant};

use crate::blocking::BlockingCoordinator;

pub use lists::{BlockingPop, PushOutcome};
pub use snapshot::Snapshot;
pub use sorted_sets::SortedSet;
pub use streams::{StreamEntry, StreamId, StreamIdRequest, StreamRead};
pub use strings::{SetCondition, SetExpiration, SetOptions, SetOutcome, StringValue};

#[derive(Error, Debug, PartialEq)]
pub enum StoreError {
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,
    #[error("ERR increment or decrement would overflow")]
    Overflow,
    #[error("ERR {0}")]
    InvalidStreamId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    String,
    List,
    Hash,
    Set,
    SortedSet,
    Stream,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::String => "string",
            KeyType::List => "list",
            KeyType::Hash => "hash",
            KeyType::Set => "set",
            KeyType::SortedSet => "zset",
            KeyType::Stream => "stream",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Owner {
    kind: KeyType,
    expiration: Option<Instant>,
}

impl Owner {
    fn is_live(&self, now: Instant) -> bool {
        self.expiration.map_or(true, |expiration| expiration > now)
    }
}

#[derive(Debug, Default)]
pub struct KeyValueStore {
    strings: RwLock<HashMap<String, StringValue>>,
    lists: RwLock<HashMap<String, VecDeque<String>>>,
    hashes: RwLock<HashMap<String, BTreeMap<String, String>>>,
    sets: RwLock<HashMap<String, BTreeSet<String>>>,
    sorted_sets: RwLock<HashMap<String, SortedSet>>,
    streams: RwLock<HashMap<String, Vec<StreamEntry>>>,
    owners: RwLock<HashMap<String, Owner>>,
    versions: RwLock<HashMap<String, u64>>,
    dirty: AtomicU64,
    blocking: BlockingCoordinator,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocking(&self) -> &BlockingCoordinator {
        &self.blocking
    }

    /// Current version of `key`. Keys that were never mutated are at version 0.
    pub async fn version(&self, key: &str) -> u64 {
        self.versions.read().await.get(key).copied().unwrap_or(0)
    }

    /// Number of mutations since the last successful save.
    pub fn dirty(&self) -> u64 {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Subtracts the mutations covered by a completed save. Mutations that
    /// happened while the save ran stay counted.
    pub fn mark_saved(&self, saved: u64) {
        let _ = self
            .dirty
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |dirty| {
                Some(dirty.saturating_sub(saved))
            });
    }

    /// Returns the namespace holding `key`, scanning in a fixed order.
    pub async fn key_type(&self, key: &str) -> Option<KeyType> {
        let now = Instant::now();

        if let Some(value) = self.strings.read().await.get(key) {
            if !value.is_expired(now) {
                return Some(KeyType::String);
            }
        }

        if self.lists.read().await.contains_key(key) {
            return Some(KeyType::List);
        }

        if self.hashes.read().await.contains_key(key) {
            return Some(KeyType::Hash);
        }

        if self.sets.read().await.contains_key(key) {
            return Some(KeyType::Set);
        }

        if self.sorted_sets.read().await.contains_key(key) {
            return Some(KeyType::SortedSet);
        }

        if self.streams.read().await.contains_key(key) {
            return Some(KeyType::Stream);
        }

        None
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.owner_of(key).await.is_some()
    }

    /// Removes `key` from whichever namespace holds it.
    pub async fn delete(&self, key: &str) -> bool {
        let Some(kind) = self.owner_of(key).await else {
            return false;
        };

        if self.remove_from_namespace(kind, key).await {
            self.touch(key).await;
            return true;
        }

        false
    }

    /// Records one mutation of `key`.
    async fn touch(&self, key: &str) {
        *self.versions.write().await.entry(key.to_string()).or_insert(0) += 1;
        self.dirty.fetch_add(1, Ordering::SeqCst);
    }

    async fn owner_of(&self, key: &str) -> Option<KeyType> {
        let now = Instant::now();

        self.owners
            .read()
            .await
            .get(key)
            .filter(|owner| owner.is_live(now))
            .map(|owner| owner.kind)
    }

    /// Fails with `WRONGTYPE` when another namespace holds `key`.
    async fn check_type(&self, key: &str, kind: KeyType) -> Result<(), StoreError> {
        match self.owner_of(key).await {
            Some(owner) if owner != kind => Err(StoreError::WrongType),
            _ => Ok(()),
        }
    }

    /// Claims `key` for the namespace `kind` before a write creates it there.
    async fn claim(
        &self,
        key: &str,
        kind: KeyType,
        expiration: Option<Instant>,
    ) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut owners = self.owners.write().await;

        match owners.get(key) {
            Some(owner) if owner.kind != kind && owner.is_live(now) => Err(StoreError::WrongType),
            _ => {
                owners.insert(key.to_string(), Owner { kind, expiration });
                Ok(())
            }
        }
    }

    /// Drops the claim on `key` if `kind` still holds it.
    async fn release(&self, key: &str, kind: KeyType) {
        let mut owners = self.owners.write().await;

        if owners.get(key).is_some_and(|owner| owner.kind == kind) {
            owners.remove(key);
        }
    }

    async fn remove_from_namespace(&self, kind: KeyType, key: &str) -> bool {
        let removed = match kind {
            KeyType::String => self
                .strings
                .write()
                .await
                .remove(key)
                .is_some_and(|value| !value.is_expired(Instant::now())),
            KeyType::List => self.lists.write().await.remove(key).is_some(),
            KeyType::Hash => self.hashes.write().await.remove(key).is_some(),
            KeyType::Set => self.sets.write().await.remove(key).is_some(),
            KeyType::SortedSet => self.sorted_sets.write().await.remove(key).is_some(),
            KeyType::Stream => self.streams.write().await.remove(key).is_some(),
        };

        self.release(key, kind).await;
        removed
    }
}
