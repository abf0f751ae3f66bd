use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::{KeyValueStore, StreamIdRequest},
    resp::RespValue,
};

/// Represents the parsed arguments for the XADD command.
#[derive(Debug, PartialEq)]
pub struct XaddArguments {
    key: String,
    id: StreamIdRequest,
    /// Field/value pairs in the order they were given.
    fields: Vec<(String, String)>,
}

impl XaddArguments {
    /// Parses `key id field value [field value ...]`.
    ///
    /// # Returns
    ///
    /// * `Ok(XaddArguments)` - Successfully parsed arguments
    /// * `Err(CommandError::WrongNumberOfArguments)` - No field was given, or a field has no value
    /// * `Err(CommandError::InvalidStreamIdArgument)` - The ID is not `*`, `ms-*` or `ms-seq`
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() < 4 || arguments.len() % 2 != 0 {
            return Err(CommandError::arity("xadd"));
        }

        let mut iter = arguments.into_iter();
        let (Some(key), Some(id)) = (iter.next(), iter.next()) else {
            return Err(CommandError::arity("xadd"));
        };

        let id = StreamIdRequest::parse(&id).ok_or(CommandError::InvalidStreamIdArgument)?;

        let mut fields = Vec::new();
        while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
            fields.push((field, value));
        }

        Ok(Self { key, id, fields })
    }
}

/// Handles the Redis XADD command.
///
/// Appends an entry and wakes every client blocked on the stream. Replicas get
/// the command with the ID the master resolved, so a `*` ID cannot produce a
/// different entry on the other side.
///
/// # Returns
///
/// * `Ok(CommandResult::Write)` - The new entry's ID as a bulk string
/// * `Err(CommandError::Store(StoreError::InvalidStreamId))` - The ID does not exceed the stream's top entry
/// * `Err(CommandError::Store(StoreError::WrongType))` - The key holds another type
///
/// # Examples
///
/// ```ignore
/// // XADD sensor 1526919030474-0 temperature 36
/// let result = xadd(&store, vec![
///     "sensor".to_string(),
///     "1526919030474-0".to_string(),
///     "temperature".to_string(),
///     "36".to_string(),
/// ]).await?;
/// // Response: "$15\r\n1526919030474-0\r\n"
/// ```
pub async fn xadd(
    store: &KeyValueStore,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let xadd_arguments = XaddArguments::parse(arguments)?;

    let id = store
        .xadd(&xadd_arguments.key, xadd_arguments.id, xadd_arguments.fields.clone())
        .await?;
    let id = id.to_string();

    let mut parts = vec![
        "XADD".to_string(),
        xadd_arguments.key,
        id.clone(),
    ];
    for (field, value) in xadd_arguments.fields {
        parts.push(field);
        parts.push(value);
    }

    Ok(CommandResult::Write {
        response: RespValue::BulkString(id).encode(),
        propagate: vec![RespValue::command(parts)],
    })
}
