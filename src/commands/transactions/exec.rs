use std::sync::Arc;

use tracing::debug;

use crate::{
    commands::{
        command_error::CommandError,
        command_handler::{CommandResult, ExecutionMode},
    },
    resp::RespValue,
    session::Session,
    state::State,
};

pub struct ExecArguments;

impl ExecArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if !arguments.is_empty() {
            return Err(CommandError::arity("exec"));
        }

        Ok(Self)
    }
}

/// Handles the Redis EXEC command.
///
/// Takes the transaction lock exclusively, then checks the watched versions and
/// runs the queue under that same hold, so no other mutation can land between
/// the check and the last queued command. Either way the session leaves
/// queueing mode with an empty watch set.
///
/// # Returns
///
/// * `Ok(String)` - One reply per queued command, in order. A command that fails
///   contributes its error reply and the rest still run
/// * `Ok(String)` - Null when a watched key changed; nothing ran
/// * `Err(CommandError::ExecWithoutMulti)` - The session was not queueing
///
/// # Examples
///
/// ```ignore
/// // MULTI, SET x 1, EXEC
/// let result = exec(&state, &mut session, vec![]).await?;
/// // Returns: "*1\r\n+OK\r\n"
/// ```
pub async fn exec(
    state: &Arc<State>,
    session: &mut Session,
    arguments: Vec<String>,
) -> Result<String, CommandError> {
    ExecArguments::parse(arguments)?;

    if !session.transaction.is_queueing() {
        return Err(CommandError::ExecWithoutMulti);
    }

    let _transaction = state.transactions.exclusive().await;

    let unchanged = session.transaction.watched_keys_unchanged(&state.store).await;
    let commands = session.transaction.reset();

    if !unchanged {
        debug!(client = %session.address, "watched key changed, transaction aborted");
        return Ok(RespValue::Null.encode());
    }

    let mut responses = Vec::with_capacity(commands.len() + 1);
    responses.push(format!("*{}\r\n", commands.len()));

    for command in commands {
        match command
            .handle_command(state, session, ExecutionMode::Transaction)
            .await
        {
            Ok(CommandResult::Write {
                response,
                propagate,
            }) => {
                for propagated in &propagate {
                    state.replication.propagate(propagated).await;
                }

                responses.push(response);
            }
            Ok(result) => {
                responses.push(
                    result
                        .into_response()
                        .unwrap_or_else(|| RespValue::Null.encode()),
                );
            }
            Err(e) => responses.push(e.as_string()),
        }
    }

    Ok(responses.join(""))
}
