//! The replica side of replication.
//!
//! A replica keeps one link to its master. The link performs the handshake
//! (`PING`, `REPLCONF listening-port`, `PSYNC ? -1`), replaces the local dataset
//! with the snapshot that follows `FULLRESYNC`, and then applies the master's
//! command stream through the regular dispatcher. Any failure closes the link and
//! the whole handshake starts again after [`REPLICA_RETRY_BACKOFF`].

use std::time::Duration;

use regex::Regex;
use tokio::{
    io::AsyncWriteExt,
    net::{tcp::OwnedWriteHalf, TcpStream},
    time::sleep,
};
use tracing::{debug, info, warn};

use crate::{
    commands::{ack_command, CommandDispatcher, CommandHandler},
    config::ReplicaOf,
    input::RespReader,
    rdb::RdbParser,
    replication::{ReplicationError, Role},
    resp::RespValue,
    session::Session,
};

pub const REPLICA_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Keeps the replica synchronized with its master for as long as the server
/// runs. Returns immediately on a master.
pub async fn run_replica_link(dispatcher: CommandDispatcher) {
    let Role::Replica(master) = dispatcher.state().replication.role().clone() else {
        return;
    };

    loop {
        match follow_master(&dispatcher, &master).await {
            Ok(()) => warn!(master = %master.host, port = master.port, "master closed the replication link"),
            Err(error) => warn!(%error, master = %master.host, port = master.port, "replication link failed"),
        }

        debug!(backoff = ?REPLICA_RETRY_BACKOFF, "retrying replication handshake");
        sleep(REPLICA_RETRY_BACKOFF).await;
    }
}

fn is_valid_replication_id(replication_id: &str) -> bool {
    Regex::new(r"^[a-zA-Z0-9]{40}$").is_ok_and(|re| re.is_match(replication_id))
}

async fn send(writer: &mut OwnedWriteHalf, command: &RespValue) -> Result<(), ReplicationError> {
    writer
        .write_all(command.encode().as_bytes())
        .await
        .map_err(|e| ReplicationError::Io(e.to_string()))?;

    writer
        .flush()
        .await
        .map_err(|e| ReplicationError::Io(e.to_string()))
}

/// Sends a handshake command and checks that the master answered with the
/// simple string `expected`.
async fn send_and_expect<R>(
    writer: &mut OwnedWriteHalf,
    reader: &mut RespReader<R>,
    command: RespValue,
    expected: &str,
) -> Result<(), ReplicationError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    send(writer, &command).await?;

    match reader.read_value().await? {
        Some((RespValue::SimpleString(reply), _)) if reply.eq_ignore_ascii_case(expected) => Ok(()),
        other => Err(ReplicationError::UnexpectedReply {
            expected: expected.to_string(),
            received: other.map_or("nothing".to_string(), |(value, _)| format!("{:?}", value)),
        }),
    }
}

/// Parses `+FULLRESYNC <replid> <offset>` into the master's replication ID and
/// offset.
fn parse_full_resync(line: &str) -> Result<(String, u64), ReplicationError> {
    let unexpected = || ReplicationError::UnexpectedReply {
        expected: "FULLRESYNC".to_string(),
        received: line.to_string(),
    };

    let parts: Vec<&str> = line
        .strip_prefix('+')
        .ok_or_else(unexpected)?
        .split_whitespace()
        .collect();

    let [keyword, replication_id, offset] = parts[..] else {
        return Err(unexpected());
    };

    let Ok(offset) = offset.parse::<u64>() else {
        return Err(unexpected());
    };

    if keyword != "FULLRESYNC" {
        return Err(unexpected());
    }

    if !is_valid_replication_id(replication_id) {
        return Err(ReplicationError::InvalidReplicationId(replication_id.to_string()));
    }

    Ok((replication_id.to_string(), offset))
}

/// One connection to the master, from handshake until the stream ends.
async fn follow_master(
    dispatcher: &CommandDispatcher,
    master: &ReplicaOf,
) -> Result<(), ReplicationError> {
    let state = dispatcher.state();
    let address = format!("{}:{}", master.host, master.port);

    let stream = TcpStream::connect(&address)
        .await
        .map_err(|e| ReplicationError::Connect(e.to_string()))?;
    let (read_half, mut writer) = stream.into_split();
    let mut reader = RespReader::new(read_half);

    info!(master = %address, "connected to master, starting handshake");

    send_and_expect(&mut writer, &mut reader, RespValue::command(["PING"]), "PONG").await?;
    send_and_expect(
        &mut writer,
        &mut reader,
        RespValue::command([
            "REPLCONF".to_string(),
            "listening-port".to_string(),
            state.config.port.to_string(),
        ]),
        "OK",
    )
    .await?;

    send(&mut writer, &RespValue::command(["PSYNC", "?", "-1"])).await?;
    let (replication_id, master_offset) = parse_full_resync(&reader.read_line().await?)?;

    let payload = reader.read_snapshot_payload().await?;
    let snapshot =
        RdbParser::parse(&payload).map_err(|e| ReplicationError::InvalidSnapshot(e.to_string()))?;
    let keys = snapshot.key_count();

    state.store.load_snapshot(snapshot).await;
    state.replication.set_offset(master_offset);

    info!(
        master = %address,
        %replication_id,
        offset = master_offset,
        keys,
        "snapshot from master loaded"
    );

    let mut session = Session::master_link(state.next_session_id(), &address);

    while let Some((value, length)) = reader.read_value().await? {
        match CommandHandler::new(value.clone()) {
            Ok(command) if command.name == "PING" => {}
            Ok(command)
                if command.name == "REPLCONF"
                    && command
                        .arguments
                        .first()
                        .is_some_and(|argument| argument.eq_ignore_ascii_case("GETACK")) =>
            {
                send(&mut writer, &ack_command(state.replication.offset())).await?;
            }
            _ => {
                dispatcher.dispatch(&mut session, value).await;
            }
        }

        state.replication.advance_offset(length);
    }

    Ok(())
}
