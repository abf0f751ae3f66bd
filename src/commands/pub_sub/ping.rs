use crate::{commands::command_error::CommandError, resp::RespValue};

pub struct SubscribePingArguments {
    message: Option<String>,
}

impl SubscribePingArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() > 1 {
            return Err(CommandError::arity("ping"));
        }

        Ok(Self {
            message: arguments.into_iter().next(),
        })
    }
}

/// PING as answered to a subscribed client: `["pong", message]`, with an empty
/// message when none was given.
pub fn subscribe_ping(arguments: Vec<String>) -> Result<String, CommandError> {
    let ping_arguments = SubscribePingArguments::parse(arguments)?;

    Ok(RespValue::Array(vec![
        RespValue::BulkString("pong".to_string()),
        RespValue::BulkString(ping_arguments.message.unwrap_or_default()),
    ])
    .encode())
}
