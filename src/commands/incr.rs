use crate::{
    commands::command_error::CommandError, key_value_store::KeyValueStore, resp::RespValue,
};

pub struct IncrArguments {
    key: String,
}

impl IncrArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [key]: [String; 1] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("incr"))?;

        Ok(Self { key })
    }
}

/// Handles the Redis INCR command.
///
/// A missing key counts as 0. The key's TTL, if any, is kept.
///
/// # Returns
///
/// * `Ok(String)` - The incremented value as a RESP integer
/// * `Err(CommandError::Store(StoreError::NotAnInteger))` - The stored value is not an integer
/// * `Err(CommandError::Store(StoreError::Overflow))` - The increment would overflow
pub async fn incr(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let incr_arguments = IncrArguments::parse(arguments)?;
    let value = store.incr(&incr_arguments.key).await?;

    Ok(RespValue::Integer(value).encode())
}
