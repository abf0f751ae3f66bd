use std::sync::Arc;

use crate::{commands::command_error::CommandError, replication::Role, resp::RespValue, state::State};

#[derive(Debug, PartialEq)]
enum InfoSection {
    All,
    Replication,
    /// A section this server has nothing to report for.
    Other,
}

pub struct InfoArguments {
    section: InfoSection,
}

impl InfoArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() > 1 {
            return Err(CommandError::SyntaxError);
        }

        let section = match arguments.first().map(|section| section.to_lowercase()) {
            None => InfoSection::All,
            Some(section) => match section.as_str() {
                "all" | "default" | "everything" => InfoSection::All,
                "replication" => InfoSection::Replication,
                _ => InfoSection::Other,
            },
        };

        Ok(InfoArguments { section })
    }
}

/// Handles the Redis INFO command. Only the replication section has content.
///
/// # Examples
///
/// ```ignore
/// let result = info(&state, vec!["replication".to_string()]).await?;
/// // Returns a bulk string such as:
/// // "# Replication\r\nrole:master\r\nconnected_slaves:0\r\nmaster_replid:...\r\nmaster_replioffset:0\r\n"
/// ```
pub async fn info(state: &Arc<State>, arguments: Vec<String>) -> Result<String, CommandError> {
    let info_arguments = InfoArguments::parse(arguments)?;

    if info_arguments.section == InfoSection::Other {
        return Ok(RespValue::BulkString(String::new()).encode());
    }

    let replication = &state.replication;
    let role = match replication.role() {
        Role::Master => "master",
        Role::Replica(_) => "slave",
    };

    let lines = [
        "# Replication".to_string(),
        format!("role:{}", role),
        format!("connected_slaves:{}", replication.online_replicas().await),
        format!("master_replid:{}", replication.replication_id()),
        format!("master_replioffset:{}", replication.offset()),
    ];

    let mut body = lines.join("\r\n");
    body.push_str("\r\n");

    Ok(RespValue::BulkString(body).encode())
}
