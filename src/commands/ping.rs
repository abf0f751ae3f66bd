use crate::{commands::command_error::CommandError, resp::RespValue};

pub struct PingArguments {
    message: Option<String>,
}

impl PingArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() > 1 {
            return Err(CommandError::arity("ping"));
        }

        Ok(Self {
            message: arguments.into_iter().next(),
        })
    }
}

/// Handles the Redis PING command.
///
/// # Returns
///
/// * `Ok(String)` - `+PONG`, or the optional message as a bulk string
/// * `Err(CommandError::WrongNumberOfArguments)` - More than one argument
pub fn ping(arguments: Vec<String>) -> Result<String, CommandError> {
    let ping_arguments = PingArguments::parse(arguments)?;

    match ping_arguments.message {
        Some(message) => Ok(RespValue::BulkString(message).encode()),
        None => Ok(RespValue::SimpleString("PONG".to_string()).encode()),
    }
}
