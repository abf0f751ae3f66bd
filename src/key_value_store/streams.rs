use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::blocking::{WaitKind, WaiterRegistration};

use super::{KeyType, KeyValueStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const MIN: StreamId = StreamId { ms: 0, seq: 0 };
    pub const MAX: StreamId = StreamId {
        ms: u64::MAX,
        seq: u64::MAX,
    };

    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }

    /// The smallest ID greater than this one, rolling over into the next millisecond.
    pub fn successor(self) -> Option<Self> {
        match self.seq.checked_add(1) {
            Some(seq) => Some(Self::new(self.ms, seq)),
            None => Some(Self::new(self.ms.checked_add(1)?, 0)),
        }
    }

    /// Parses `ms-seq`, or a bare `ms` whose sequence is `default_seq`.
    pub fn parse(input: &str, default_seq: u64) -> Option<Self> {
        match input.split_once('-') {
            Some((ms, seq)) => Some(Self::new(ms.parse().ok()?, seq.parse().ok()?)),
            None => Some(Self::new(input.parse().ok()?, default_seq)),
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub id: StreamId,
    pub fields: Vec<(String, String)>,
}

/// How `XADD` picks the ID of a new entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreamIdRequest {
    /// `*`
    Auto,
    /// `ms-*`
    AutoSequence(u64),
    /// `ms-seq`
    Explicit(StreamId),
}

impl StreamIdRequest {
    pub fn parse(input: &str) -> Option<Self> {
        if input == "*" {
            return Some(StreamIdRequest::Auto);
        }

        if let Some(ms) = input.strip_suffix("-*") {
            return Some(StreamIdRequest::AutoSequence(ms.parse().ok()?));
        }

        StreamId::parse(input, 0).map(StreamIdRequest::Explicit)
    }

    fn resolve(self, entries: &[StreamEntry]) -> Result<StreamId, StoreError> {
        let last = entries.last().map(|entry| entry.id);

        let id = match self {
            StreamIdRequest::Auto => {
                let candidate = StreamId::new(now_millis(), entries.len() as u64 + 1);

                match last {
                    Some(last) if candidate <= last => last.successor().ok_or_else(top_item_error)?,
                    _ => candidate,
                }
            }
            StreamIdRequest::AutoSequence(ms) => match last {
                Some(last) if last.ms == ms => {
                    let seq = last.seq.checked_add(1).ok_or_else(top_item_error)?;
                    StreamId::new(ms, seq)
                }
                _ if ms == 0 => StreamId::new(0, 1),
                _ => StreamId::new(ms, 0),
            },
            StreamIdRequest::Explicit(id) => id,
        };

        if id == StreamId::MIN {
            return Err(StoreError::InvalidStreamId(
                "The ID specified in XADD must be greater than 0-0".to_string(),
            ));
        }

        if last.is_some_and(|last| id <= last) {
            return Err(top_item_error());
        }

        Ok(id)
    }
}

fn top_item_error() -> StoreError {
    StoreError::InvalidStreamId(
        "The ID specified in XADD is equal or smaller than the target stream top item".to_string(),
    )
}

#[derive(Debug)]
pub enum StreamRead<'a> {
    Found(Vec<(String, Vec<StreamEntry>)>),
    Registered(WaiterRegistration<'a>),
    Empty,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

impl KeyValueStore {
    /// Appends an entry and wakes every client blocked on this stream.
    pub async fn xadd(
        &self,
        key: &str,
        request: StreamIdRequest,
        fields: Vec<(String, String)>,
    ) -> Result<StreamId, StoreError> {
        let mut streams = self.streams.write().await;

        let id = match streams.get(key) {
            Some(entries) => request.resolve(entries)?,
            None => {
                self.check_type(key, KeyType::Stream).await?;
                request.resolve(&[])?
            }
        };

        self.claim(key, KeyType::Stream, None).await?;
        streams
            .entry(key.to_string())
            .or_default()
            .push(StreamEntry { id, fields });
        self.touch(key).await;

        self.blocking.notify_stream(key);

        Ok(id)
    }

    /// Entries with IDs between `start` and `end`, inclusive.
    pub async fn xrange(
        &self,
        key: &str,
        start: StreamId,
        end: StreamId,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        let streams = self.streams.read().await;

        let Some(entries) = streams.get(key) else {
            self.check_type(key, KeyType::Stream).await?;
            return Ok(Vec::new());
        };

        let from = entries.partition_point(|entry| entry.id < start);

        Ok(entries[from..]
            .iter()
            .take_while(|entry| entry.id <= end)
            .cloned()
            .collect())
    }

    pub async fn last_stream_id(&self, key: &str) -> Result<Option<StreamId>, StoreError> {
        let streams = self.streams.read().await;

        match streams.get(key) {
            Some(entries) => Ok(entries.last().map(|entry| entry.id)),
            None => {
                self.check_type(key, KeyType::Stream).await?;
                Ok(None)
            }
        }
    }

    /// Collects entries newer than each stream's cursor. When nothing is newer and
    /// `register` is set, registers a stream waiter on every key before the streams
    /// lock is released.
    pub async fn read_after_or_register(
        &self,
        cursors: &[(String, StreamId)],
        count: Option<usize>,
        register: bool,
    ) -> Result<StreamRead<'_>, StoreError> {
        let streams = self.streams.read().await;
        let mut found = Vec::new();

        for (key, cursor) in cursors {
            let Some(entries) = streams.get(key) else {
                self.check_type(key, KeyType::Stream).await?;
                continue;
            };

            let from = entries.partition_point(|entry| entry.id <= *cursor);
            let newer: Vec<StreamEntry> = entries[from..]
                .iter()
                .take(count.unwrap_or(usize::MAX))
                .cloned()
                .collect();

            if !newer.is_empty() {
                found.push((key.clone(), newer));
            }
        }

        if !found.is_empty() {
            return Ok(StreamRead::Found(found));
        }

        if register {
            let keys: Vec<String> = cursors.iter().map(|(key, _)| key.clone()).collect();
            return Ok(StreamRead::Registered(
                self.blocking.register(WaitKind::Stream, &keys),
            ));
        }

        Ok(StreamRead::Empty)
    }
}
