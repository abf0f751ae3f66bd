use std::sync::Arc;

use crate::{commands::command_error::CommandError, resp::RespValue, state::State};

pub struct PublishArguments {
    pub channel: String,
    pub message: String,
}

impl PublishArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [channel, message]: [String; 2] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("publish"))?;

        Ok(Self { channel, message })
    }
}

/// Handles the Redis PUBLISH command.
///
/// Every current subscriber gets `["message", channel, message]` queued on its
/// connection before this returns. A subscriber with a full queue holds up the
/// publisher until it drains.
///
/// # Returns
///
/// * `Ok(String)` - The number of subscribers the message reached, as a RESP integer
///
/// # Examples
///
/// ```ignore
/// // PUBLISH news hello
/// let result = publish(&state, vec!["news".to_string(), "hello".to_string()]).await?;
/// // Returns: ":2\r\n" with two subscribers
/// ```
pub async fn publish(state: &Arc<State>, arguments: Vec<String>) -> Result<String, CommandError> {
    let publish_arguments = PublishArguments::parse(arguments)?;

    let delivered = state
        .pub_sub
        .publish(&publish_arguments.channel, &publish_arguments.message)
        .await;

    Ok(RespValue::Integer(delivered as i64).encode())
}
