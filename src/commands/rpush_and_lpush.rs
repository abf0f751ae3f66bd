use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
};

pub struct PushArguments {
    key: String,
    values: Vec<String>,
}

impl PushArguments {
    pub fn parse(arguments: Vec<String>, command: &str) -> Result<Self, CommandError> {
        if arguments.len() < 2 {
            return Err(CommandError::arity(command));
        }

        let mut iter = arguments.into_iter();
        let key = iter.next().ok_or_else(|| CommandError::arity(command))?;

        Ok(Self {
            key,
            values: iter.collect(),
        })
    }
}

/// Handles the Redis RPUSH and LPUSH commands.
///
/// Values handed straight to clients blocked in `BLPOP` are consumed before the
/// reply is sent, but the reply still reports the length right after the push.
/// Replicas receive the push followed by one `LPOP` per served client, so their
/// copy of the list ends up the same.
///
/// # Arguments
///
/// * `store` - The key-value store
/// * `command` - `"RPUSH"` to append or `"LPUSH"` to prepend
/// * `arguments` - `[key, value, ...]`
///
/// # Returns
///
/// * `Ok(CommandResult::Write)` - The list length as a RESP integer
/// * `Err(CommandError::Store(StoreError::WrongType))` - The key holds another type
pub async fn push(
    store: &KeyValueStore,
    command: &str,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let push_arguments = PushArguments::parse(arguments, command)?;
    let front = command.eq_ignore_ascii_case("LPUSH");

    let outcome = store
        .push(&push_arguments.key, push_arguments.values.clone(), front)
        .await?;

    let mut propagate = vec![RespValue::command(
        [command, push_arguments.key.as_str()]
            .into_iter()
            .chain(push_arguments.values.iter().map(String::as_str)),
    )];

    for _ in 0..outcome.served {
        propagate.push(RespValue::command(["LPOP", push_arguments.key.as_str()]));
    }

    Ok(CommandResult::Write {
        response: RespValue::Integer(outcome.length as i64).encode(),
        propagate,
    })
}
