use crate::{commands::command_error::CommandError, resp::RespValue};

pub struct EchoArguments {
    message: String,
}

impl EchoArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [message]: [String; 1] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("echo"))?;

        Ok(Self { message })
    }
}

/// Handles the Redis ECHO command.
///
/// # Examples
///
/// ```ignore
/// // ECHO "hello world"
/// let result = echo(vec!["hello world".to_string()]);
/// // Returns: "$11\r\nhello world\r\n"
/// ```
pub fn echo(arguments: Vec<String>) -> Result<String, CommandError> {
    let echo_arguments = EchoArguments::parse(arguments)?;

    Ok(RespValue::BulkString(echo_arguments.message).encode())
}
