//! ZADD, ZSCORE, ZRANK, ZCARD, ZRANGE and ZREM.

use crate::{
    commands::command_error::CommandError, key_value_store::KeyValueStore, resp::RespValue,
};

pub struct SortedSetArguments {
    key: String,
    rest: Vec<String>,
}

impl SortedSetArguments {
    pub fn parse(arguments: Vec<String>, command: &str) -> Result<Self, CommandError> {
        let rest_length = arguments.len().saturating_sub(1);

        let valid = match command.to_uppercase().as_str() {
            "ZADD" => rest_length >= 2 && rest_length % 2 == 0,
            "ZREM" => rest_length >= 1,
            "ZSCORE" | "ZRANK" => rest_length == 1,
            "ZRANGE" => rest_length == 2,
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

    fn member(&self) -> &str {
        self.rest.first().map_or("", String::as_str)
    }
}

fn parse_score(score: &str) -> Result<f64, CommandError> {
    score
        .parse::<f64>()
        .ok()
        .filter(|score| !score.is_nan())
        .ok_or(CommandError::NotAFloat)
}

/// Handles the Redis ZADD command.
///
/// Every score is validated before anything is written, so a bad score leaves
/// the set untouched.
///
/// # Returns
///
/// * `Ok(String)` - The number of members that were new, as a RESP integer
/// * `Err(CommandError::NotAFloat)` - A score is not a valid float
///
/// # Examples
///
/// ```ignore
/// // ZADD board 10 ada 7.5 grace
/// let result = zadd(&store, vec!["board".into(), "10".into(), "ada".into(), "7.5".into(), "grace".into()]).await;
/// // Returns: ":2\r\n"
/// ```
pub async fn zadd(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let sorted_set_arguments = SortedSetArguments::parse(arguments, "zadd")?;

    let mut members = Vec::with_capacity(sorted_set_arguments.rest.len() / 2);
    let mut iter = sorted_set_arguments.rest.into_iter();

    while let (Some(score), Some(member)) = (iter.next(), iter.next()) {
        members.push((parse_score(&score)?, member));
    }

    let added = store.zadd(&sorted_set_arguments.key, members).await?;

    Ok(RespValue::Integer(added as i64).encode())
}

/// Handles the Redis ZSCORE command. The score is rendered in its shortest form
/// that parses back to the same value.
pub async fn zscore(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let sorted_set_arguments = SortedSetArguments::parse(arguments, "zscore")?;

    match store
        .zscore(&sorted_set_arguments.key, sorted_set_arguments.member())
        .await?
    {
        Some(score) => Ok(RespValue::BulkString(score.to_string()).encode()),
        None => Ok(RespValue::Null.encode()),
    }
}

pub async fn zrank(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let sorted_set_arguments = SortedSetArguments::parse(arguments, "zrank")?;

    match store
        .zrank(&sorted_set_arguments.key, sorted_set_arguments.member())
        .await?
    {
        Some(rank) => Ok(RespValue::Integer(rank as i64).encode()),
        None => Ok(RespValue::Null.encode()),
    }
}

pub async fn zcard(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let sorted_set_arguments = SortedSetArguments::parse(arguments, "zcard")?;
    let count = store.zcard(&sorted_set_arguments.key).await?;

    Ok(RespValue::Integer(count as i64).encode())
}

pub async fn zrange(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let sorted_set_arguments = SortedSetArguments::parse(arguments, "zrange")?;

    let start = sorted_set_arguments.rest[0]
        .parse::<i64>()
        .map_err(|_| CommandError::NotAnInteger)?;
    let stop = sorted_set_arguments.rest[1]
        .parse::<i64>()
        .map_err(|_| CommandError::NotAnInteger)?;

    let members = store
        .zrange(&sorted_set_arguments.key, start, stop)
        .await?;

    Ok(RespValue::Array(members.into_iter().map(RespValue::BulkString).collect()).encode())
}

pub async fn zrem(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let sorted_set_arguments = SortedSetArguments::parse(arguments, "zrem")?;
    let removed = store
        .zrem(&sorted_set_arguments.key, &sorted_set_arguments.rest)
        .await?;

    Ok(RespValue::Integer(removed as i64).encode())
}
