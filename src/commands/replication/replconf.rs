use std::sync::Arc;

use tracing::debug;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
    session::Session,
    state::State,
};

/// The REPLCONF subcommands exchanged between a master and its replicas.
#[derive(Debug, PartialEq)]
pub enum ReplconfArguments {
    /// `listening-port <port>`, sent by a replica during the handshake.
    ListeningPort(u16),
    /// `capa <capability> ...`, sent by a replica during the handshake.
    Capabilities(Vec<String>),
    /// `ACK <offset>`, a replica reporting how much of the stream it processed.
    Ack(u64),
    /// `GETACK *`, a master asking its replica for an ACK.
    GetAck,
}

impl ReplconfArguments {
    /// # Returns
    ///
    /// * `Ok(ReplconfArguments)` - Successfully parsed arguments
    /// * `Err(CommandError::WrongNumberOfArguments)` - A subcommand is missing its value
    /// * `Err(CommandError::NotAnInteger)` - A port or offset is not a number
    /// * `Err(CommandError::SyntaxError)` - An unknown subcommand
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let Some((subcommand, values)) = arguments.split_first() else {
            return Err(CommandError::arity("replconf"));
        };

        let single_value = || match values {
            [value] => Ok(value.as_str()),
            _ => Err(CommandError::arity("replconf")),
        };

        match subcommand.to_lowercase().as_str() {
            "listening-port" => single_value()?
                .parse::<u16>()
                .map(ReplconfArguments::ListeningPort)
                .map_err(|_| CommandError::NotAnInteger),
            "capa" if !values.is_empty() => Ok(ReplconfArguments::Capabilities(values.to_vec())),
            "capa" => Err(CommandError::arity("replconf")),
            "ack" => single_value()?
                .parse::<u64>()
                .map(ReplconfArguments::Ack)
                .map_err(|_| CommandError::NotAnInteger),
            "getack" => single_value().map(|_| ReplconfArguments::GetAck),
            _ => Err(CommandError::SyntaxError),
        }
    }
}

/// Handles the Redis REPLCONF command.
///
/// # Returns
///
/// * `Ok(CommandResult::Response)` - `+OK` for `listening-port` and `capa`, and
///   `REPLCONF ACK <offset>` for `GETACK`
/// * `Ok(CommandResult::NoResponse)` - For `ACK`, which only records the offset
///
/// # Examples
///
/// ```ignore
/// // REPLCONF GETACK *
/// let result = replconf(&state, &mut session, vec!["GETACK".into(), "*".into()]).await?;
/// // Response: "*3\r\n$8\r\nREPLCONF\r\n$3\r\nACK\r\n$1\r\n0\r\n"
/// ```
pub async fn replconf(
    state: &Arc<State>,
    session: &mut Session,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let ok = || CommandResult::Response(RespValue::SimpleString("OK".to_string()).encode());

    match ReplconfArguments::parse(arguments)? {
        ReplconfArguments::ListeningPort(port) => {
            debug!(replica = %session.address, port, "replica listening port");
            Ok(ok())
        }
        ReplconfArguments::Capabilities(capabilities) => {
            debug!(replica = %session.address, ?capabilities, "replica capabilities");
            Ok(ok())
        }
        ReplconfArguments::Ack(offset) => {
            state.replication.acknowledge(&session.address, offset).await;
            Ok(CommandResult::NoResponse)
        }
        ReplconfArguments::GetAck => Ok(CommandResult::Response(
            ack_command(state.replication.offset()).encode(),
        )),
    }
}

/// `REPLCONF ACK <offset>` as a replica sends it.
pub fn ack_command(offset: u64) -> RespValue {
    RespValue::command(["REPLCONF".to_string(), "ACK".to_string(), offset.to_string()])
}
