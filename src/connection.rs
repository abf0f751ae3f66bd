//! One task per client connection.
//!
//! Requests are read and answered one at a time, in order. Every byte the client
//! receives goes through the session's outbound queue and a dedicated writer task,
//! so replies, pub/sub messages, and the replication stream sent to an attached
//! replica never interleave mid-frame.

use std::sync::Arc;

use tokio::{
    io::AsyncWriteExt,
    net::{tcp::OwnedWriteHalf, TcpStream},
    sync::mpsc,
};
use tracing::{debug, info, warn};

use crate::{
    commands::{restore_stranded_values, CommandDispatcher},
    input::{CommandReadError, RespReader},
    resp::RespValue,
    session::{Outbound, Session, OUTBOUND_CAPACITY},
};

/// Whether `input` names a command that can suspend. Only those are abandoned
/// when the client goes away; everything else runs to completion.
fn may_block(input: &RespValue) -> bool {
    match input {
        RespValue::Array(parts) => matches!(
            parts.first(),
            Some(RespValue::BulkString(name))
                if name.eq_ignore_ascii_case("BLPOP") || name.eq_ignore_ascii_case("XREAD")
        ),
        _ => false,
    }
}

async fn write_outbound(
    mut writer: OwnedWriteHalf,
    mut receiver: mpsc::Receiver<Outbound>,
    client_address: String,
) {
    while let Some(frame) = receiver.recv().await {
        if let Err(error) = writer.write_all(frame.as_bytes()).await {
            debug!(client = %client_address, %error, "write to client failed");
            break;
        }
    }
}

/// Serves one client until it disconnects or sends a malformed frame.
///
/// A blocked `BLPOP` or `XREAD` is abandoned as soon as the peer closes the
/// connection, which unregisters it from every key it waited on.
pub async fn handle_client_connection(
    stream: TcpStream,
    client_address: String,
    dispatcher: CommandDispatcher,
) {
    let state = Arc::clone(dispatcher.state());

    let (read_half, write_half) = stream.into_split();
    let mut reader = RespReader::new(read_half);

    let (sender, receiver) = mpsc::channel(OUTBOUND_CAPACITY);
    let writer = tokio::spawn(write_outbound(write_half, receiver, client_address.clone()));

    let mut session = Session::client(state.next_session_id(), &client_address, sender.clone());

    info!(client = %client_address, "client connected");

    loop {
        let input = match reader.read_value().await {
            Ok(Some((input, _))) => input,
            Ok(None) | Err(CommandReadError::ConnectionClosed) => break,
            Err(e) => {
                warn!(client = %client_address, error = %e, "protocol error, closing connection");
                let _ = sender.send(Outbound::Resp(e.as_string())).await;
                break;
            }
        };

        let reply = if may_block(&input) {
            let dispatch = dispatcher.dispatch(&mut session, input);
            tokio::pin!(dispatch);

            let mut abandoned = false;

            let reply = loop {
                tokio::select! {
                    reply = &mut dispatch => break reply,
                    closed = reader.wait_for_close() => {
                        if closed {
                            abandoned = true;
                            break None;
                        }
                    }
                }
            };

            if abandoned {
                debug!(client = %client_address, "client left while blocked");
                break;
            }

            reply
        } else {
            dispatcher.dispatch(&mut session, input).await
        };

        if let Some(reply) = reply {
            if sender.send(Outbound::Resp(reply)).await.is_err() {
                break;
            }
        }
    }

    restore_stranded_values(&state).await;
    state
        .pub_sub
        .remove_session(session.id, &session.subscriptions)
        .await;
    state.replication.remove_replica(&client_address).await;

    drop(session);
    drop(sender);
    let _ = writer.await;

    info!(client = %client_address, "client disconnected");
}
