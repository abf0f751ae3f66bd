use crate::{
    commands::command_error::CommandError, key_value_store::KeyValueStore, resp::RespValue,
};

/// Arguments of the multi-key commands `DEL` and `EXISTS`.
pub struct KeysArguments {
    keys: Vec<String>,
}

impl KeysArguments {
    pub fn parse(arguments: Vec<String>, command: &str) -> Result<Self, CommandError> {
        if arguments.is_empty() {
            return Err(CommandError::arity(command));
        }

        Ok(Self { keys: arguments })
    }
}

/// Handles the Redis DEL command. Replies with the number of keys removed.
pub async fn del(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let del_arguments = KeysArguments::parse(arguments, "del")?;
    let mut removed = 0;

    for key in &del_arguments.keys {
        if store.delete(key).await {
            removed += 1;
        }
    }

    Ok(RespValue::Integer(removed).encode())
}

/// Handles the Redis EXISTS command. A key named twice is counted twice.
pub async fn exists(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let exists_arguments = KeysArguments::parse(arguments, "exists")?;
    let mut found = 0;

    for key in &exists_arguments.keys {
        if store.exists(key).await {
            found += 1;
        }
    }

    Ok(RespValue::Integer(found).encode())
}
