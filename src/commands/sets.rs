//! SADD, SREM, SMEMBERS, SISMEMBER, SCARD, SUNION and SINTER.

use std::collections::BTreeSet;

use crate::{
    commands::command_error::CommandError, key_value_store::KeyValueStore, resp::RespValue,
};

pub struct SetMembersArguments {
    keys: Vec<String>,
    members: Vec<String>,
}

impl SetMembersArguments {
    pub fn parse(arguments: Vec<String>, command: &str) -> Result<Self, CommandError> {
        let command_name = command.to_uppercase();

        let valid = match command_name.as_str() {
            "SADD" | "SREM" => arguments.len() >= 2,
            "SISMEMBER" => arguments.len() == 2,
            "SUNION" | "SINTER" => !arguments.is_empty(),
            _ => arguments.len() == 1,
        };

        if !valid {
            return Err(CommandError::arity(command));
        }

        if matches!(command_name.as_str(), "SUNION" | "SINTER") {
            return Ok(Self {
                keys: arguments,
                members: Vec::new(),
            });
        }

        let mut iter = arguments.into_iter();

        Ok(Self {
            keys: iter.next().into_iter().collect(),
            members: iter.collect(),
        })
    }

    fn key(&self) -> &str {
        self.keys.first().map_or("", String::as_str)
    }
}

fn members_array(members: BTreeSet<String>) -> String {
    RespValue::Array(members.into_iter().map(RespValue::BulkString).collect()).encode()
}

/// Handles the Redis SADD command. Replies with the number of members added.
pub async fn sadd(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let set_arguments = SetMembersArguments::parse(arguments, "sadd")?;
    let key = set_arguments.key().to_string();
    let added = store.sadd(&key, set_arguments.members).await?;

    Ok(RespValue::Integer(added as i64).encode())
}

/// Handles the Redis SREM command. A set left without members is removed.
pub async fn srem(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let set_arguments = SetMembersArguments::parse(arguments, "srem")?;
    let removed = store
        .srem(set_arguments.key(), &set_arguments.members)
        .await?;

    Ok(RespValue::Integer(removed as i64).encode())
}

pub async fn smembers(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let set_arguments = SetMembersArguments::parse(arguments, "smembers")?;

    Ok(members_array(store.smembers(set_arguments.key()).await?))
}

pub async fn sismember(
    store: &KeyValueStore,
    arguments: Vec<String>,
) -> Result<String, CommandError> {
    let set_arguments = SetMembersArguments::parse(arguments, "sismember")?;
    let member = set_arguments.members.first().map_or("", String::as_str);
    let found = store.sismember(set_arguments.key(), member).await?;

    Ok(RespValue::Integer(i64::from(found)).encode())
}

pub async fn scard(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let set_arguments = SetMembersArguments::parse(arguments, "scard")?;
    let count = store.scard(set_arguments.key()).await?;

    Ok(RespValue::Integer(count as i64).encode())
}

pub async fn sunion(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let set_arguments = SetMembersArguments::parse(arguments, "sunion")?;

    Ok(members_array(store.sunion(&set_arguments.keys).await?))
}

/// Handles the Redis SINTER command. Any missing key makes the result empty.
pub async fn sinter(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let set_arguments = SetMembersArguments::parse(arguments, "sinter")?;

    Ok(members_array(store.sinter(&set_arguments.keys).await?))
}
