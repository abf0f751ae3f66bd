use std::sync::Arc;

use tracing::info;

use crate::{
    commands::command_error::CommandError,
    rdb::{save_now, start_background_save},
    resp::RespValue,
    state::State,
};

pub struct SaveArguments;

impl SaveArguments {
    pub fn parse(arguments: Vec<String>, command: &str) -> Result<Self, CommandError> {
        if !arguments.is_empty() {
            return Err(CommandError::arity(command));
        }

        Ok(SaveArguments)
    }
}

/// Handles the Redis SAVE command: writes a snapshot before replying.
///
/// # Returns
///
/// * `Ok(String)` - `+OK` once the snapshot is on disk
/// * `Err(CommandError::SaveInProgress)` - Another save is running
/// * `Err(CommandError::SaveFailed)` - The snapshot could not be written; the previous file is untouched
pub async fn save(state: &Arc<State>, arguments: Vec<String>) -> Result<String, CommandError> {
    SaveArguments::parse(arguments, "save")?;

    save_now(state).await?;

    Ok(RespValue::SimpleString("OK".to_string()).encode())
}

/// Handles the Redis BGSAVE command. The save runs in its own task and logs its
/// outcome when it finishes.
///
/// # Returns
///
/// * `Ok(String)` - `+Background saving started`
/// * `Err(CommandError::SaveInProgress)` - A save is already running
pub fn bgsave(state: &Arc<State>, arguments: Vec<String>) -> Result<String, CommandError> {
    SaveArguments::parse(arguments, "bgsave")?;

    start_background_save(state)?;
    info!("background save requested");

    Ok(RespValue::SimpleString("Background saving started".to_string()).encode())
}
