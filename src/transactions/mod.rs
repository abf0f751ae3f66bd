//! Optimistic transactions.
//!
//! Each session carries a [`TransactionState`]: the queued commands and the versions
//! of the keys it watches. The server-wide [`TransactionLock`] is held shared by every
//! mutating command and exclusively by `EXEC`, so the version check and the queued
//! batch run with no other mutation in between.

use std::collections::HashMap;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{commands::CommandHandler, key_value_store::KeyValueStore};

#[derive(Debug, Default)]
pub struct TransactionLock {
    lock: RwLock<()>,
}

impl TransactionLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Held while an ordinary command mutates the store and propagates.
    pub async fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().await
    }

    /// Held by `EXEC` and by a full resync for their whole duration.
    pub async fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().await
    }
}

#[derive(Debug, Default)]
pub struct TransactionState {
    queueing: bool,
    queue: Vec<CommandHandler>,
    watched: HashMap<String, u64>,
}

impl TransactionState {
    pub fn is_queueing(&self) -> bool {
        self.queueing
    }

    /// Enters queueing mode with an empty queue. Keys watched before `MULTI` stay
    /// watched.
    pub fn begin(&mut self) {
        self.queueing = true;
        self.queue.clear();
    }

    /// Queues `command` and records the current version of every key it names.
    pub async fn enqueue(&mut self, command: CommandHandler, store: &KeyValueStore) {
        for key in command.keys() {
            self.watch(key, store).await;
        }

        self.queue.push(command);
    }

    /// Records the version of `key` unless it is already watched. The earliest
    /// observed version is the one `EXEC` checks against.
    pub async fn watch(&mut self, key: &str, store: &KeyValueStore) {
        if !self.watched.contains_key(key) {
            let version = store.version(key).await;
            self.watched.insert(key.to_string(), version);
        }
    }

    pub fn unwatch(&mut self) {
        self.watched.clear();
    }

    /// Whether every watched key still has the version recorded for it.
    pub async fn watched_keys_unchanged(&self, store: &KeyValueStore) -> bool {
        for (key, version) in &self.watched {
            if store.version(key).await != *version {
                return false;
            }
        }

        true
    }

    /// Leaves queueing mode, clearing the watch set, and hands back the queue.
    pub fn reset(&mut self) -> Vec<CommandHandler> {
        self.queueing = false;
        self.watched.clear();
        std::mem::take(&mut self.queue)
    }
}
