use std::sync::Arc;

use crate::{
    commands::command_error::CommandError, resp::RespValue, session::Session, state::State,
};

pub struct WatchArguments {
    keys: Vec<String>,
}

impl WatchArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.is_empty() {
            return Err(CommandError::arity("watch"));
        }

        Ok(Self { keys: arguments })
    }
}

/// Handles the Redis WATCH command.
///
/// Records the current version of every key. A later `EXEC` aborts if any of
/// them changed in the meantime.
///
/// # Returns
///
/// * `Ok(String)` - `+OK`
/// * `Err(CommandError::WatchInsideMulti)` - The session is already queueing
pub async fn watch(
    state: &Arc<State>,
    session: &mut Session,
    arguments: Vec<String>,
) -> Result<String, CommandError> {
    let watch_arguments = WatchArguments::parse(arguments)?;

    if session.transaction.is_queueing() {
        return Err(CommandError::WatchInsideMulti);
    }

    for key in &watch_arguments.keys {
        session.transaction.watch(key, &state.store).await;
    }

    Ok(RespValue::SimpleString("OK".to_string()).encode())
}

pub struct UnwatchArguments;

impl UnwatchArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if !arguments.is_empty() {
            return Err(CommandError::arity("unwatch"));
        }

        Ok(Self)
    }
}

pub fn unwatch(session: &mut Session, arguments: Vec<String>) -> Result<String, CommandError> {
    UnwatchArguments::parse(arguments)?;

    session.transaction.unwatch();

    Ok(RespValue::SimpleString("OK".to_string()).encode())
}
