//! HSET, HGET, HDEL, HEXISTS, HLEN, HKEYS, HVALS and HGETALL.

use crate::{
    commands::command_error::CommandError, key_value_store::KeyValueStore, resp::RespValue,
};

/// Arguments shared by the hash commands: a key followed by fields (and values
/// for HSET).
pub struct HashArguments {
    key: String,
    rest: Vec<String>,
}

impl HashArguments {
    /// Checks the arity `command` expects and splits off the key.
    pub fn parse(arguments: Vec<String>, command: &str) -> Result<Self, CommandError> {
        let rest_length = arguments.len().saturating_sub(1);

        let valid = match command.to_uppercase().as_str() {
            "HSET" => rest_length >= 2 && rest_length % 2 == 0,
            "HDEL" => rest_length >= 1,
            "HGET" | "HEXISTS" => rest_length == 1,
            _ => arguments.len() == 1,
        };

        if !valid || arguments.is_empty() {
            return Err(CommandError::arity(command));
        }

        let mut iter = arguments.into_iter();
        let key = iter.next().ok_or_else(|| CommandError::arity(command))?;

        Ok(Self {
            key,
            rest: iter.collect(),
        })
    }

    fn field(&self) -> &str {
        self.rest.first().map_or("", String::as_str)
    }
}

fn bulk_array(values: impl IntoIterator<Item = String>) -> String {
    RespValue::Array(values.into_iter().map(RespValue::BulkString).collect()).encode()
}

/// Handles the Redis HSET command. Replies with the number of fields that were new.
///
/// # Examples
///
/// ```ignore
/// // HSET user name ada lang rust
/// let result = hset(&store, vec!["user".into(), "name".into(), "ada".into(), "lang".into(), "rust".into()]).await;
/// // Returns: ":2\r\n"
/// ```
pub async fn hset(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let hash_arguments = HashArguments::parse(arguments, "hset")?;

    let mut pairs = Vec::with_capacity(hash_arguments.rest.len() / 2);
    let mut iter = hash_arguments.rest.into_iter();

    while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
        pairs.push((field, value));
    }

    let added = store.hset(&hash_arguments.key, pairs).await?;

    Ok(RespValue::Integer(added as i64).encode())
}

pub async fn hget(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let hash_arguments = HashArguments::parse(arguments, "hget")?;

    match store
        .hget(&hash_arguments.key, hash_arguments.field())
        .await?
    {
        Some(value) => Ok(RespValue::BulkString(value).encode()),
        None => Ok(RespValue::Null.encode()),
    }
}

/// Handles the Redis HDEL command. A hash left without fields is removed.
pub async fn hdel(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let hash_arguments = HashArguments::parse(arguments, "hdel")?;
    let removed = store
        .hdel(&hash_arguments.key, &hash_arguments.rest)
        .await?;

    Ok(RespValue::Integer(removed as i64).encode())
}

pub async fn hexists(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let hash_arguments = HashArguments::parse(arguments, "hexists")?;
    let exists = store
        .hexists(&hash_arguments.key, hash_arguments.field())
        .await?;

    Ok(RespValue::Integer(i64::from(exists)).encode())
}

pub async fn hlen(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let hash_arguments = HashArguments::parse(arguments, "hlen")?;
    let length = store.hlen(&hash_arguments.key).await?;

    Ok(RespValue::Integer(length as i64).encode())
}

pub async fn hkeys(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let hash_arguments = HashArguments::parse(arguments, "hkeys")?;

    Ok(bulk_array(store.hkeys(&hash_arguments.key).await?))
}

pub async fn hvals(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let hash_arguments = HashArguments::parse(arguments, "hvals")?;

    Ok(bulk_array(store.hvals(&hash_arguments.key).await?))
}

/// Handles the Redis HGETALL command: a flat `[field, value, ...]` array in field order.
pub async fn hgetall(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let hash_arguments = HashArguments::parse(arguments, "hgetall")?;
    let pairs = store.hgetall(&hash_arguments.key).await?;

    Ok(bulk_array(
        pairs
            .into_iter()
            .flat_map(|(field, value)| [field, value]),
    ))
}
