use std::collections::BTreeMap;

use crate::{
    key_value_store::{Snapshot, StreamEntry, StreamId},
    rdb::{
        checksum,
        get_slice::get_buffer_slice,
        opcode::{OpCode, CHECKSUM_LENGTH, HEADER_LENGTH, MAGIC_STRING, MINIMUM_FILE_LENGTH, RDB_VERSION},
        RdbError,
    },
};

/// Decodes a complete snapshot held in memory.
///
/// The checksum is verified before any record is read, so a corrupted file never
/// produces a partial dataset.
#[derive(Debug)]
pub struct RdbParser<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl<'a> RdbParser<'a> {
    /// Parses `bytes` into a [`Snapshot`].
    ///
    /// # Returns
    ///
    /// * `Ok(Snapshot)` - Every record up to the EOF opcode
    /// * `Err(RdbError::TooSmall)` - Fewer bytes than an empty snapshot
    /// * `Err(RdbError::ChecksumMismatch)` - The trailing CRC64 does not match the body
    /// * `Err(RdbError::InvalidMagicString)` / `Err(RdbError::UnsupportedVersion)` - Bad header
    /// * `Err(RdbError::UnknownOpCode)` - A record type this format does not define
    /// * `Err(RdbError::Truncated)` - The body ends in the middle of a record
    pub fn parse(bytes: &'a [u8]) -> Result<Snapshot, RdbError> {
        if bytes.len() < MINIMUM_FILE_LENGTH {
            return Err(RdbError::TooSmall(bytes.len()));
        }

        let (body, footer) = bytes.split_at(bytes.len() - CHECKSUM_LENGTH);
        let expected = u64::from_be_bytes(
            footer
                .try_into()
                .map_err(|_| RdbError::Truncated)?,
        );
        let computed = checksum(body);

        if expected != computed {
            return Err(RdbError::ChecksumMismatch { expected, computed });
        }

        let mut parser = RdbParser {
            buffer: body,
            cursor: 0,
        };

        parser.parse_header()?;
        parser.parse_records()
    }

    fn parse_header(&mut self) -> Result<(), RdbError> {
        if self.read_bytes(MAGIC_STRING.len())? != MAGIC_STRING {
            return Err(RdbError::InvalidMagicString);
        }

        let version = self.read_u32()?;

        if version != RDB_VERSION {
            return Err(RdbError::UnsupportedVersion(version));
        }

        debug_assert_eq!(self.cursor, HEADER_LENGTH);

        Ok(())
    }

    fn parse_records(&mut self) -> Result<Snapshot, RdbError> {
        let mut snapshot = Snapshot::default();

        loop {
            let opcode = OpCode::try_from(self.read_u8()?)?;

            match opcode {
                OpCode::String => {
                    let key = self.read_string()?;
                    let value = self.read_string()?;
                    snapshot.strings.insert(key, value);
                }
                OpCode::List => {
                    let key = self.read_string()?;
                    let count = self.read_length()?;
                    let mut list = Vec::new();

                    for _ in 0..count {
                        list.push(self.read_string()?);
                    }

                    snapshot.lists.insert(key, list);
                }
                OpCode::Hash => {
                    let key = self.read_string()?;
                    let count = self.read_length()?;
                    let mut hash = BTreeMap::new();

                    for _ in 0..count {
                        let field = self.read_string()?;
                        hash.insert(field, self.read_string()?);
                    }

                    snapshot.hashes.insert(key, hash);
                }
                OpCode::Set => {
                    let key = self.read_string()?;
                    let count = self.read_length()?;
                    let mut set = std::collections::BTreeSet::new();

                    for _ in 0..count {
                        set.insert(self.read_string()?);
                    }

                    snapshot.sets.insert(key, set);
                }
                OpCode::SortedSet => {
                    let key = self.read_string()?;
                    let count = self.read_length()?;
                    let mut members = Vec::new();

                    for _ in 0..count {
                        let member = self.read_string()?;
                        let score = f64::from_bits(self.read_u64()?);
                        members.push((member, score));
                    }

                    snapshot.sorted_sets.insert(key, members);
                }
                OpCode::Stream => {
                    let key = self.read_string()?;
                    let count = self.read_length()?;
                    let mut entries = Vec::new();

                    for _ in 0..count {
                        entries.push(self.read_stream_entry()?);
                    }

                    snapshot.streams.insert(key, entries);
                }
                OpCode::EndOfFile => return Ok(snapshot),
            }
        }
    }

    fn read_stream_entry(&mut self) -> Result<StreamEntry, RdbError> {
        let id = self.read_string()?;
        let id = StreamId::parse(&id, 0).ok_or(RdbError::InvalidStreamId(id))?;
        let field_count = self.read_length()?;
        let mut fields = Vec::new();

        for _ in 0..field_count {
            let field = self.read_string()?;
            fields.push((field, self.read_string()?));
        }

        Ok(StreamEntry { id, fields })
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], RdbError> {
        let slice = get_buffer_slice(self.buffer, self.cursor, len)?;
        self.cursor += len;

        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, RdbError> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, RdbError> {
        let bytes = self.read_bytes(4)?;

        Ok(u32::from_be_bytes(
            bytes.try_into().map_err(|_| RdbError::Truncated)?,
        ))
    }

    fn read_u64(&mut self) -> Result<u64, RdbError> {
        let bytes = self.read_bytes(8)?;

        Ok(u64::from_be_bytes(
            bytes.try_into().map_err(|_| RdbError::Truncated)?,
        ))
    }

    /// A record or string length. Lengths longer than the remaining input are
    /// rejected before anything is allocated for them.
    fn read_length(&mut self) -> Result<usize, RdbError> {
        let length = usize::try_from(self.read_u64()?).map_err(|_| RdbError::Truncated)?;

        if length > self.buffer.len() - self.cursor {
            return Err(RdbError::Truncated);
        }

        Ok(length)
    }

    fn read_string(&mut self) -> Result<String, RdbError> {
        let length = self.read_length()?;
        let bytes = self.read_bytes(length)?;

        String::from_utf8(bytes.to_vec()).map_err(|_| RdbError::InvalidUtf8)
    }
}
