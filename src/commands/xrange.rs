use crate::{
    commands::{
        command_error::CommandError,
        stream_utils::{parse_range_bound, stream_entries_to_resp},
    },
    key_value_store::{KeyValueStore, StreamId},
};

/// Represents the parsed arguments for the XRANGE command.
#[derive(Debug, PartialEq)]
pub struct XrangeArguments {
    key: String,
    start: StreamId,
    end: StreamId,
}

impl XrangeArguments {
    /// Parses `key start end`. A bare millisecond start covers the whole
    /// millisecond from sequence 0, and a bare end covers it up to the last
    /// possible sequence.
    ///
    /// # Returns
    ///
    /// * `Ok(XrangeArguments)` - Successfully parsed arguments
    /// * `Err(CommandError::WrongNumberOfArguments)` - Not exactly three arguments
    /// * `Err(CommandError::InvalidStreamIdArgument)` - A bound is not a stream ID
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // XRANGE sensor - +
    /// let args = XrangeArguments::parse(vec!["sensor".into(), "-".into(), "+".into()])?;
    /// ```
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let [key, start, end]: [String; 3] = arguments
            .try_into()
            .map_err(|_| CommandError::arity("xrange"))?;

        Ok(Self {
            start: parse_range_bound(&start, 0)?,
            end: parse_range_bound(&end, u64::MAX)?,
            key,
        })
    }
}

/// Handles the Redis XRANGE command.
///
/// Both bounds are inclusive. A missing key replies with an empty array.
pub async fn xrange(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let xrange_arguments = XrangeArguments::parse(arguments)?;

    let entries = store
        .xrange(
            &xrange_arguments.key,
            xrange_arguments.start,
            xrange_arguments.end,
        )
        .await?;

    Ok(stream_entries_to_resp(entries).encode())
}
