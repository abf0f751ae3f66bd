use crate::{
    commands::command_error::CommandError, key_value_store::KeyValueStore, resp::RespValue,
};

pub struct GetArguments {
    key: String,
}

impl GetArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [key]: [String; 1] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("get"))?;

        Ok(Self { key })
    }
}

/// Handles the Redis GET command.
///
/// An expired value is purged on access and reads as missing.
///
/// # Returns
///
/// * `Ok(String)` - The value as a bulk string, or null when the key is missing
/// * `Err(CommandError::Store(StoreError::WrongType))` - The key holds another type
///
/// # Examples
///
/// ```ignore
/// // GET mykey
/// let result = get(&store, vec!["mykey".to_string()]).await;
/// // Returns: "$5\r\nhello\r\n" or "$-1\r\n" (null)
/// ```
pub async fn get(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let get_arguments = GetArguments::parse(arguments)?;

    match store.get(&get_arguments.key).await? {
        Some(value) => Ok(RespValue::BulkString(value).encode()),
        None => Ok(RespValue::Null.encode()),
    }
}
