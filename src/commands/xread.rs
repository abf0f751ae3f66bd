use std::{sync::Arc, time::Duration};

use tokio::time::Instant;
use tracing::debug;

use crate::{
    commands::{
        command_error::CommandError, command_handler::ExecutionMode,
        stream_utils::stream_entries_to_resp,
    },
    key_value_store::{KeyValueStore, StreamEntry, StreamId, StreamRead},
    resp::RespValue,
};

/// A per-stream cursor as the client wrote it.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Cursor {
    /// `$`: whatever the stream's last ID is when the command runs.
    Latest,
    After(StreamId),
}

/// Represents the parsed arguments for the XREAD command.
///
/// Format: `XREAD [COUNT n] [BLOCK milliseconds] STREAMS key1 key2 ... id1 id2 ...`
#[derive(Debug, PartialEq)]
pub struct XreadArguments {
    count: Option<usize>,
    /// `None` without BLOCK. `Some(None)` for `BLOCK 0`, which waits forever.
    block: Option<Option<Duration>>,
    streams: Vec<(String, Cursor)>,
}

impl XreadArguments {
    /// Parses command arguments into structured XreadArguments.
    ///
    /// # Returns
    ///
    /// * `Ok(XreadArguments)` - Successfully parsed arguments
    /// * `Err(CommandError::SyntaxError)` - An unknown option, or no `STREAMS` keyword
    /// * `Err(CommandError::NotAnInteger)` - `COUNT` or `BLOCK` is not a non-negative integer
    /// * `Err(CommandError::UnbalancedXread)` - Keys and IDs do not pair up
    /// * `Err(CommandError::InvalidStreamIdArgument)` - A cursor is neither `$` nor a stream ID
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // XREAD BLOCK 1000 STREAMS mystream $
    /// let args = XreadArguments::parse(vec![
    ///     "BLOCK".to_string(),
    ///     "1000".to_string(),
    ///     "STREAMS".to_string(),
    ///     "mystream".to_string(),
    ///     "$".to_string(),
    /// ])?;
    /// ```
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() < 3 {
            return Err(CommandError::arity("xread"));
        }

        let mut count = None;
        let mut block = None;
        let mut index = 0;

        loop {
            let Some(option) = arguments.get(index) else {
                return Err(CommandError::SyntaxError);
            };

            match option.to_uppercase().as_str() {
                "STREAMS" => {
                    index += 1;
                    break;
                }
                "COUNT" => {
                    let value = option_value(&arguments, index)?;
                    count = Some(value as usize).filter(|count| *count > 0);
                }
                "BLOCK" => {
                    let value = option_value(&arguments, index)?;
                    block = Some(Some(Duration::from_millis(value)).filter(|_| value > 0));
                }
                _ => return Err(CommandError::SyntaxError),
            }

            index += 2;
        }

        let rest = &arguments[index..];

        if rest.is_empty() || rest.len() % 2 != 0 {
            return Err(CommandError::UnbalancedXread);
        }

        let (keys, ids) = rest.split_at(rest.len() / 2);
        let mut streams = Vec::with_capacity(keys.len());

        for (key, id) in keys.iter().zip(ids) {
            let cursor = if id == "$" {
                Cursor::Latest
            } else {
                Cursor::After(
                    StreamId::parse(id, 0).ok_or(CommandError::InvalidStreamIdArgument)?,
                )
            };

            streams.push((key.clone(), cursor));
        }

        Ok(Self {
            count,
            block,
            streams,
        })
    }
}

fn option_value(arguments: &[String], index: usize) -> Result<u64, CommandError> {
    arguments
        .get(index + 1)
        .ok_or(CommandError::SyntaxError)?
        .parse::<u64>()
        .map_err(|_| CommandError::NotAnInteger)
}

/// Replaces every `$` cursor with the stream's current last ID.
async fn resolve_cursors(
    store: &KeyValueStore,
    streams: &[(String, Cursor)],
) -> Result<Vec<(String, StreamId)>, CommandError> {
    let mut cursors = Vec::with_capacity(streams.len());

    for (key, cursor) in streams {
        let id = match cursor {
            Cursor::After(id) => *id,
            Cursor::Latest => store.last_stream_id(key).await?.unwrap_or(StreamId::MIN),
        };

        cursors.push((key.clone(), id));
    }

    Ok(cursors)
}

fn found_to_resp(found: Vec<(String, Vec<StreamEntry>)>) -> String {
    RespValue::Array(
        found
            .into_iter()
            .map(|(key, entries)| {
                RespValue::Array(vec![
                    RespValue::BulkString(key),
                    stream_entries_to_resp(entries),
                ])
            })
            .collect(),
    )
    .encode()
}

/// Handles the Redis XREAD command.
///
/// Returns the entries newer than each stream's cursor. Without `BLOCK`, or
/// inside `EXEC`, nothing ready means a null reply right away. With `BLOCK` the
/// client is registered on every stream and re-scans each time one of them gets
/// a new entry, until something turns up or the deadline passes.
///
/// # Returns
///
/// * `Ok(String)` - `[[key, [[id, [field, value, ...]], ...]], ...]`, or null
/// * `Err(CommandError::Store(StoreError::WrongType))` - A key holds another type
///
/// # Examples
///
/// ```ignore
/// // XREAD STREAMS sensor 0-0
/// let result = xread(&store, vec!["STREAMS".into(), "sensor".into(), "0-0".into()], ExecutionMode::Immediate).await?;
/// // Returns: "*1\r\n*2\r\n$6\r\nsensor\r\n*1\r\n*2\r\n$3\r\n1-1\r\n*2\r\n$1\r\nt\r\n$2\r\n36\r\n"
/// ```
pub async fn xread(
    store: &KeyValueStore,
    arguments: Vec<String>,
    mode: ExecutionMode,
) -> Result<String, CommandError> {
    let xread_arguments = XreadArguments::parse(arguments)?;
    let cursors = resolve_cursors(store, &xread_arguments.streams).await?;

    let block = match xread_arguments.block {
        Some(block) if mode == ExecutionMode::Immediate => Some(block),
        _ => None,
    };

    let Some(block) = block else {
        return match store
            .read_after_or_register(&cursors, xread_arguments.count, false)
            .await?
        {
            StreamRead::Found(found) => Ok(found_to_resp(found)),
            _ => Ok(RespValue::Null.encode()),
        };
    };

    let deadline = block.and_then(|block| Instant::now().checked_add(block));

    loop {
        let mut registration = match store
            .read_after_or_register(&cursors, xread_arguments.count, true)
            .await?
        {
            StreamRead::Found(found) => return Ok(found_to_resp(found)),
            StreamRead::Registered(registration) => registration,
            StreamRead::Empty => return Ok(RespValue::Null.encode()),
        };

        debug!(streams = ?xread_arguments.streams, "client blocked");

        if registration.wait(deadline).await.is_none() {
            return Ok(RespValue::Null.encode());
        }
    }
}
