use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    config::ServerConfig, key_value_store::KeyValueStore, pub_sub::PubSub, rdb::SaveScheduler,
    replication::ReplicationState, transactions::TransactionLock,
};

/// Everything the connections of one server share. Handed to every command
/// handler behind an `Arc`.
#[derive(Debug)]
pub struct State {
    pub config: ServerConfig,
    pub store: KeyValueStore,
    pub saver: SaveScheduler,
    pub replication: ReplicationState,
    pub pub_sub: PubSub,
    pub transactions: TransactionLock,
    next_session_id: AtomicU64,
}

impl State {
    pub fn new(config: ServerConfig) -> Self {
        let replication = ReplicationState::new(config.replica_of.clone());

        Self {
            config,
            store: KeyValueStore::new(),
            saver: SaveScheduler::new(),
            replication,
            pub_sub: PubSub::new(),
            transactions: TransactionLock::new(),
            next_session_id: AtomicU64::new(1),
        }
    }

    pub fn next_session_id(&self) -> u64 {
        self.next_session_id.fetch_add(1, Ordering::Relaxed)
    }
}
