use crate::{commands::command_error::CommandError, resp::RespValue, session::Session};

pub struct MultiArguments;

impl MultiArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if !arguments.is_empty() {
            return Err(CommandError::arity("multi"));
        }

        Ok(Self)
    }
}

/// Handles the Redis MULTI command: the session starts queueing. Keys watched
/// before MULTI stay watched.
pub fn multi(session: &mut Session, arguments: Vec<String>) -> Result<String, CommandError> {
    MultiArguments::parse(arguments)?;

    if session.transaction.is_queueing() {
        return Err(CommandError::NestedMulti);
    }

    session.transaction.begin();

    Ok(RespValue::SimpleString("OK".to_string()).encode())
}
