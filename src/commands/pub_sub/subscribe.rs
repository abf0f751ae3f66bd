use std::sync::Arc;

use tracing::debug;

use crate::{
    commands::command_error::CommandError, resp::RespValue, session::Session, state::State,
};

pub struct SubscribeArguments {
    pub channels: Vec<String>,
}

impl SubscribeArguments {
    /// SUBSCRIBE needs at least one channel. UNSUBSCRIBE without channels means
    /// every channel the session is subscribed to.
    pub fn parse(arguments: Vec<String>, command: &str) -> Result<Self, CommandError> {
        if arguments.is_empty() && command.eq_ignore_ascii_case("SUBSCRIBE") {
            return Err(CommandError::arity(command));
        }

        Ok(Self {
            channels: arguments,
        })
    }
}

fn confirmation(kind: &str, channel: Option<String>, count: usize) -> String {
    RespValue::Array(vec![
        RespValue::BulkString(kind.to_string()),
        channel.map_or(RespValue::Null, RespValue::BulkString),
        RespValue::Integer(count as i64),
    ])
    .encode()
}

/// Handles the Redis SUBSCRIBE command.
///
/// Replies once per channel with `["subscribe", channel, count]`, where `count`
/// is the number of channels the session is subscribed to after that channel.
/// Subscribing twice to the same channel is harmless.
///
/// # Examples
///
/// ```ignore
/// // SUBSCRIBE news sport
/// let result = subscribe(&state, &mut session, vec!["news".into(), "sport".into()]).await?;
/// // Returns: "*3\r\n$9\r\nsubscribe\r\n$4\r\nnews\r\n:1\r\n*3\r\n$9\r\nsubscribe\r\n$5\r\nsport\r\n:2\r\n"
/// ```
pub async fn subscribe(
    state: &Arc<State>,
    session: &mut Session,
    arguments: Vec<String>,
) -> Result<String, CommandError> {
    let subscribe_arguments = SubscribeArguments::parse(arguments, "subscribe")?;

    let Some(sender) = session.outbound().cloned() else {
        return Err(CommandError::UnknownCommand("subscribe".to_string()));
    };

    let mut response = String::new();

    for channel in subscribe_arguments.channels {
        state
            .pub_sub
            .subscribe(&channel, session.id, sender.clone())
            .await;
        session.subscriptions.insert(channel.clone());

        debug!(client = %session.address, %channel, "subscribed");

        response.push_str(&confirmation(
            "subscribe",
            Some(channel),
            session.subscriptions.len(),
        ));
    }

    Ok(response)
}

/// Handles the Redis UNSUBSCRIBE command.
///
/// Replies once per channel with `["unsubscribe", channel, remaining]`. With no
/// subscriptions left the session leaves subscribed mode. Unsubscribing from
/// everything while subscribed to nothing replies with a null channel.
pub async fn unsubscribe(
    state: &Arc<State>,
    session: &mut Session,
    arguments: Vec<String>,
) -> Result<String, CommandError> {
    let unsubscribe_arguments = SubscribeArguments::parse(arguments, "unsubscribe")?;

    let channels = if unsubscribe_arguments.channels.is_empty() {
        session.subscriptions.iter().cloned().collect()
    } else {
        unsubscribe_arguments.channels
    };

    if channels.is_empty() {
        return Ok(confirmation("unsubscribe", None, 0));
    }

    let mut response = String::new();

    for channel in channels {
        state.pub_sub.unsubscribe(&channel, session.id).await;
        session.subscriptions.remove(&channel);

        response.push_str(&confirmation(
            "unsubscribe",
            Some(channel),
            session.subscriptions.len(),
        ));
    }

    Ok(response)
}
