use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
};

pub struct PopArguments {
    key: String,
    /// `None` pops a single element and replies with a bulk string instead of an array.
    count: Option<usize>,
}

impl PopArguments {
    /// Parses `key [count]` for LPOP and RPOP.
    ///
    /// # Returns
    ///
    /// * `Ok(PopArguments)` - Successfully parsed arguments
    /// * `Err(CommandError::WrongNumberOfArguments)` - No key, or more than two arguments
    /// * `Err(CommandError::NotAnInteger)` - The count is not an integer
    /// * `Err(CommandError::InvalidCount)` - The count is zero or negative
    pub fn parse(arguments: Vec<String>, command: &str) -> Result<Self, CommandError> {
        if arguments.is_empty() || arguments.len() > 2 {
            return Err(CommandError::arity(command));
        }

        let count = match arguments.get(1) {
            Some(count) => {
                let count = count
                    .parse::<i64>()
                    .map_err(|_| CommandError::NotAnInteger)?;

                if count <= 0 {
                    return Err(CommandError::InvalidCount);
                }

                Some(count as usize)
            }
            None => None,
        };

        Ok(Self {
            key: arguments[0].clone(),
            count,
        })
    }
}

/// Handles the Redis LPOP and RPOP commands.
///
/// # Returns
///
/// * `Ok(CommandResult::Write)` - The popped element, or an array of them when a
///   count was given
/// * `Ok(CommandResult::Response)` - Null when the key does not exist
/// * `Err(CommandError::Store(StoreError::WrongType))` - The key holds another type
pub async fn pop(
    store: &KeyValueStore,
    command: &str,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let pop_arguments = PopArguments::parse(arguments, command)?;
    let from_back = command.eq_ignore_ascii_case("RPOP");

    let Some(values) = store
        .pop(&pop_arguments.key, pop_arguments.count, from_back)
        .await?
    else {
        return Ok(CommandResult::Response(RespValue::Null.encode()));
    };

    let response = match pop_arguments.count {
        Some(_) => RespValue::Array(values.into_iter().map(RespValue::BulkString).collect()),
        None => values
            .into_iter()
            .next()
            .map_or(RespValue::Null, RespValue::BulkString),
    };

    let mut propagate = vec![command.to_uppercase(), pop_arguments.key];
    propagate.extend(pop_arguments.count.map(|count| count.to_string()));

    Ok(CommandResult::Write {
        response: response.encode(),
        propagate: vec![RespValue::command(propagate)],
    })
}
