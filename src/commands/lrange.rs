use crate::{
    commands::command_error::CommandError, key_value_store::KeyValueStore, resp::RespValue,
};

pub struct LrangeArguments {
    key: String,
    start: i64,
    stop: i64,
}

impl LrangeArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [key, start, stop]: [String; 3] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("lrange"))?;

        Ok(Self {
            key,
            start: start.parse().map_err(|_| CommandError::NotAnInteger)?,
            stop: stop.parse().map_err(|_| CommandError::NotAnInteger)?,
        })
    }
}

/// Handles the Redis LRANGE command.
///
/// Both bounds are inclusive and may be negative to count from the tail. Out of
/// range bounds are clamped, and a range that selects nothing replies with an
/// empty array.
///
/// # Examples
///
/// ```ignore
/// // RPUSH fruits apple banana cherry
/// // LRANGE fruits -2 -1
/// // Returns: "*2\r\n$6\r\nbanana\r\n$6\r\ncherry\r\n"
/// ```
pub async fn lrange(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let lrange_arguments = LrangeArguments::parse(arguments)?;

    let values = store
        .range(
            &lrange_arguments.key,
            lrange_arguments.start,
            lrange_arguments.stop,
        )
        .await?;

    Ok(RespValue::Array(values.into_iter().map(RespValue::BulkString).collect()).encode())
}
