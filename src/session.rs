use std::collections::BTreeSet;

use tokio::sync::mpsc;

use crate::transactions::TransactionState;

/// How many outbound frames may queue up for one connection before senders wait.
pub const OUTBOUND_CAPACITY: usize = 16;

/// A frame queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// An encoded RESP value.
    Resp(String),
    /// Raw bytes written as they are, such as a snapshot payload.
    Raw(Vec<u8>),
}

impl Outbound {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Outbound::Resp(value) => value.as_bytes(),
            Outbound::Raw(bytes) => bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionKind {
    /// A regular client connection.
    Client,
    /// The replica's link to its master. Commands arriving on it are applied
    /// without replies and never propagated further.
    MasterLink,
}

/// Per-connection state that commands read and update.
#[derive(Debug)]
pub struct Session {
    pub id: u64,
    pub address: String,
    pub kind: SessionKind,
    pub transaction: TransactionState,
    pub subscriptions: BTreeSet<String>,
    outbound: Option<mpsc::Sender<Outbound>>,
}

impl Session {
    /// A client session whose asynchronous messages (pub/sub pushes, snapshot
    /// payloads, propagated commands) go out through `outbound`.
    pub fn client(id: u64, address: &str, outbound: mpsc::Sender<Outbound>) -> Self {
        Self {
            id,
            address: address.to_string(),
            kind: SessionKind::Client,
            transaction: TransactionState::default(),
            subscriptions: BTreeSet::new(),
            outbound: Some(outbound),
        }
    }

    pub fn master_link(id: u64, address: &str) -> Self {
        Self {
            id,
            address: address.to_string(),
            kind: SessionKind::MasterLink,
            transaction: TransactionState::default(),
            subscriptions: BTreeSet::new(),
            outbound: None,
        }
    }

    pub fn outbound(&self) -> Option<&mpsc::Sender<Outbound>> {
        self.outbound.as_ref()
    }

    pub fn is_subscribed(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    pub fn is_master_link(&self) -> bool {
        self.kind == SessionKind::MasterLink
    }
}
