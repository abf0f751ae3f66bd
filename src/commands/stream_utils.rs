use crate::{
    commands::command_error::CommandError,
    key_value_store::{StreamEntry, StreamId},
    resp::RespValue,
};

/// Parses a range bound for XRANGE.
///
/// `-` and `+` stand for the smallest and largest possible IDs. A bare
/// millisecond value takes `default_seq` as its sequence, so `XRANGE s 5 5`
/// covers every entry of millisecond 5.
///
/// # Returns
///
/// * `Ok(StreamId)` - The resolved bound
/// * `Err(CommandError::InvalidStreamIdArgument)` - The bound is not a stream ID
///
/// # Examples
///
/// ```ignore
/// let start = parse_range_bound("1526919030484", 0)?;
/// // Returns: StreamId { ms: 1526919030484, seq: 0 }
///
/// let end = parse_range_bound("+", u64::MAX)?;
/// // Returns: StreamId::MAX
/// ```
pub fn parse_range_bound(bound: &str, default_seq: u64) -> Result<StreamId, CommandError> {
    match bound {
        "-" => Ok(StreamId::MIN),
        "+" => Ok(StreamId::MAX),
        _ => StreamId::parse(bound, default_seq).ok_or(CommandError::InvalidStreamIdArgument),
    }
}

/// Converts stream entries to the RESP shape clients expect: one
/// `[id, [field1, value1, field2, value2, ...]]` pair per entry, fields in
/// insertion order.
pub fn stream_entries_to_resp(entries: Vec<StreamEntry>) -> RespValue {
    RespValue::Array(
        entries
            .into_iter()
            .map(|entry| {
                let fields = entry
                    .fields
                    .into_iter()
                    .flat_map(|(field, value)| {
                        [RespValue::BulkString(field), RespValue::BulkString(value)]
                    })
                    .collect();

                RespValue::Array(vec![
                    RespValue::BulkString(entry.id.to_string()),
                    RespValue::Array(fields),
                ])
            })
            .collect(),
    )
}
