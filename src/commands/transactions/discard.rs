use crate::{commands::command_error::CommandError, resp::RespValue, session::Session};

pub struct DiscardArguments;

impl DiscardArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if !arguments.is_empty() {
            return Err(CommandError::arity("discard"));
        }

        Ok(Self)
    }
}

/// Handles the Redis DISCARD command: drops the queue and the watch set without
/// running anything.
pub fn discard(session: &mut Session, arguments: Vec<String>) -> Result<String, CommandError> {
    DiscardArguments::parse(arguments)?;

    if !session.transaction.is_queueing() {
        return Err(CommandError::DiscardWithoutMulti);
    }

    session.transaction.reset();

    Ok(RespValue::SimpleString("OK".to_string()).encode())
}
