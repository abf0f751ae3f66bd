//! Master-side replica registry and command propagation.
//!
//! A replica moves through `WaitingSnapshot -> SendingSnapshot -> Online` while its
//! `PSYNC` is served. Only `Online` replicas receive propagated commands, so nothing
//! is replayed ahead of the dataset the replica was seeded with.

mod replica;

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use rand::{distributions::Alphanumeric, Rng};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, MutexGuard, RwLock};
use tracing::{info, warn};

use crate::{config::ReplicaOf, input::CommandReadError, resp::RespValue, session::Outbound};

pub use replica::{run_replica_link, REPLICA_RETRY_BACKOFF};

pub const REPLICATION_ID_LENGTH: usize = 40;

#[derive(Error, Debug, PartialEq)]
pub enum ReplicationError {
    #[error("could not reach master: {0}")]
    Connect(String),
    #[error("unexpected handshake reply, expected {expected}, got {received}")]
    UnexpectedReply { expected: String, received: String },
    #[error("invalid replication id '{0}'")]
    InvalidReplicationId(String),
    #[error("invalid snapshot from master: {0}")]
    InvalidSnapshot(String),
    #[error("replication stream failed: {0}")]
    Stream(#[from] CommandReadError),
    #[error("write to master failed: {0}")]
    Io(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Role {
    Master,
    Replica(ReplicaOf),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplicaState {
    WaitingSnapshot,
    SendingSnapshot,
    Online,
}

#[derive(Debug)]
struct ReplicaLink {
    sender: mpsc::Sender<Outbound>,
    state: ReplicaState,
    acknowledged_offset: u64,
}

#[derive(Debug)]
pub struct ReplicationState {
    role: Role,
    replication_id: String,
    offset: AtomicU64,
    replicas: RwLock<HashMap<String, ReplicaLink>>,
    write_order: Mutex<()>,
}

impl ReplicationState {
    pub fn new(replica_of: Option<ReplicaOf>) -> Self {
        let role = match replica_of {
            Some(master) => Role::Replica(master),
            None => Role::Master,
        };

        Self {
            role,
            replication_id: generate_replication_id(),
            offset: AtomicU64::new(0),
            replicas: RwLock::new(HashMap::new()),
            write_order: Mutex::new(()),
        }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn is_replica(&self) -> bool {
        matches!(self.role, Role::Replica(_))
    }

    pub fn replication_id(&self) -> &str {
        &self.replication_id
    }

    /// On a master, bytes propagated so far. On a replica, bytes of the
    /// replication stream processed so far.
    pub fn offset(&self) -> u64 {
        self.offset.load(Ordering::SeqCst)
    }

    pub fn advance_offset(&self, bytes: usize) {
        self.offset.fetch_add(bytes as u64, Ordering::SeqCst);
    }

    pub fn set_offset(&self, offset: u64) {
        self.offset.store(offset, Ordering::SeqCst);
    }

    /// Serializes mutating commands from their store update through their
    /// propagation while at least one replica is attached, so replicas apply
    /// writes in the order the master did.
    pub async fn write_order(&self) -> Option<MutexGuard<'_, ()>> {
        if self.is_replica() || self.replicas.read().await.is_empty() {
            return None;
        }

        Some(self.write_order.lock().await)
    }

    pub async fn register_replica(&self, address: &str, sender: mpsc::Sender<Outbound>) {
        info!(replica = %address, "replica attached");

        self.replicas.write().await.insert(
            address.to_string(),
            ReplicaLink {
                sender,
                state: ReplicaState::WaitingSnapshot,
                acknowledged_offset: 0,
            },
        );
    }

    pub async fn set_replica_state(&self, address: &str, state: ReplicaState) {
        if let Some(replica) = self.replicas.write().await.get_mut(address) {
            replica.state = state;
        }
    }

    pub async fn replica_state(&self, address: &str) -> Option<ReplicaState> {
        self.replicas
            .read()
            .await
            .get(address)
            .map(|replica| replica.state)
    }

    pub async fn acknowledge(&self, address: &str, offset: u64) {
        if let Some(replica) = self.replicas.write().await.get_mut(address) {
            replica.acknowledged_offset = offset;
        }
    }

    pub async fn acknowledged_offset(&self, address: &str) -> Option<u64> {
        self.replicas
            .read()
            .await
            .get(address)
            .map(|replica| replica.acknowledged_offset)
    }

    pub async fn remove_replica(&self, address: &str) {
        if self.replicas.write().await.remove(address).is_some() {
            info!(replica = %address, "replica detached");
        }
    }

    pub async fn online_replicas(&self) -> usize {
        self.replicas
            .read()
            .await
            .values()
            .filter(|replica| replica.state == ReplicaState::Online)
            .count()
    }

    /// Forwards `command` to every `Online` replica and advances the master offset
    /// by its encoded length. Does nothing on a replica.
    pub async fn propagate(&self, command: &RespValue) {
        if self.is_replica() {
            return;
        }

        let encoded = command.encode();

        let senders: Vec<(String, mpsc::Sender<Outbound>)> = self
            .replicas
            .read()
            .await
            .iter()
            .filter(|(_, replica)| replica.state == ReplicaState::Online)
            .map(|(address, replica)| (address.clone(), replica.sender.clone()))
            .collect();

        for (address, sender) in senders {
            if sender.send(Outbound::Resp(encoded.clone())).await.is_err() {
                warn!(replica = %address, "replica link closed, dropping it");
                self.remove_replica(&address).await;
            }
        }

        self.advance_offset(encoded.len());
    }
}

fn generate_replication_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REPLICATION_ID_LENGTH)
        .map(char::from)
        .collect()
}
