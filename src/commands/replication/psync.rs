//! PSYNC, the last step of a replica's handshake.
//!
//! Every PSYNC is answered with a full resynchronization: the FULLRESYNC header,
//! then the whole dataset as a length-prefixed snapshot with no trailing CRLF.
//! From then on the connection carries the master's propagated writes.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    rdb::RdbEncoder,
    replication::ReplicaState,
    resp::RespValue,
    session::{Outbound, Session},
    state::State,
};

/// Represents the parsed arguments for the PSYNC command.
///
/// The replica sends the replication ID and offset it last saw, `? -1` on a
/// first sync. Both are parsed but a full resync is always performed.
pub struct PsyncArguments {
    /// The replication ID of the master, or `?`.
    pub replication_id: String,
    /// The replica's offset, or -1.
    pub offset: i64,
}

impl PsyncArguments {
    /// # Returns
    ///
    /// * `Ok(PsyncArguments)` - Successfully parsed arguments
    /// * `Err(CommandError::WrongNumberOfArguments)` - Not exactly two arguments
    /// * `Err(CommandError::NotAnInteger)` - The offset is not an integer
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [replication_id, offset]: [String; 2] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("psync"))?;

        let offset = offset
            .parse::<i64>()
            .map_err(|_| CommandError::NotAnInteger)?;

        Ok(Self {
            replication_id,
            offset,
        })
    }
}

/// Handles the Redis PSYNC command.
///
/// Registers the connection as a replica, then writes the FULLRESYNC header and
/// the snapshot to its outbound queue. The transaction lock is held exclusively
/// from registration until the replica is `Online`, so every write either lands
/// in the snapshot or is propagated after it.
///
/// # Returns
///
/// * `Ok(CommandResult::NoResponse)` - Everything was already queued on the connection
/// * `Err(CommandError::InvalidPsyncConnection)` - This server is itself a replica, or
///   the connection cannot carry a replication stream
///
/// # Protocol Response
///
/// `+FULLRESYNC <replid> <offset>\r\n` followed by `$<len>\r\n<snapshot bytes>`.
pub async fn psync(
    state: &Arc<State>,
    session: &mut Session,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let psync_arguments = PsyncArguments::parse(arguments)?;

    if state.replication.is_replica() {
        return Err(CommandError::InvalidPsyncConnection);
    }

    let Some(sender) = session.outbound().cloned() else {
        return Err(CommandError::InvalidPsyncConnection);
    };

    let replication = &state.replication;
    let _transaction = state.transactions.exclusive().await;

    info!(
        replica = %session.address,
        requested_id = %psync_arguments.replication_id,
        requested_offset = psync_arguments.offset,
        "full resynchronization requested"
    );

    replication.register_replica(&session.address, sender.clone()).await;

    let header = RespValue::SimpleString(format!(
        "FULLRESYNC {} {}",
        replication.replication_id(),
        replication.offset()
    ))
    .encode();

    let snapshot = state.store.snapshot().await;
    replication
        .set_replica_state(&session.address, ReplicaState::SendingSnapshot)
        .await;

    let bytes = RdbEncoder::encode(&snapshot);
    let mut payload = format!("${}\r\n", bytes.len()).into_bytes();
    payload.extend_from_slice(&bytes);

    let sent = sender.send(Outbound::Resp(header)).await.is_ok()
        && sender.send(Outbound::Raw(payload)).await.is_ok();

    if !sent {
        warn!(replica = %session.address, "replica went away during resynchronization");
        replication.remove_replica(&session.address).await;
        return Ok(CommandResult::NoResponse);
    }

    replication
        .set_replica_state(&session.address, ReplicaState::Online)
        .await;

    info!(replica = %session.address, bytes = bytes.len(), "snapshot sent to replica");

    Ok(CommandResult::NoResponse)
}
