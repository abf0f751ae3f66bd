use bytes::BufMut;

use crate::{
    key_value_store::Snapshot,
    rdb::{
        checksum,
        opcode::{OpCode, MAGIC_STRING, RDB_VERSION},
    },
};

/// Serializes a [`Snapshot`] into the binary snapshot format.
///
/// The same bytes are written to disk by a save and streamed to a replica during a
/// full resync.
#[derive(Debug, Default)]
pub struct RdbEncoder {
    buffer: Vec<u8>,
}

impl RdbEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes `snapshot` and appends the checksum footer.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let bytes = RdbEncoder::encode(&store.snapshot().await);
    /// assert!(bytes.starts_with(b"REDIS"));
    /// ```
    pub fn encode(snapshot: &Snapshot) -> Vec<u8> {
        let mut encoder = Self::new();

        encoder.write_header();

        for (key, value) in &snapshot.strings {
            encoder.write_opcode(OpCode::String);
            encoder.write_string(key);
            encoder.write_string(value);
        }

        for (key, list) in &snapshot.lists {
            encoder.write_opcode(OpCode::List);
            encoder.write_string(key);
            encoder.write_length(list.len());

            for item in list {
                encoder.write_string(item);
            }
        }

        for (key, hash) in &snapshot.hashes {
            encoder.write_opcode(OpCode::Hash);
            encoder.write_string(key);
            encoder.write_length(hash.len());

            for (field, value) in hash {
                encoder.write_string(field);
                encoder.write_string(value);
            }
        }

        for (key, set) in &snapshot.sets {
            encoder.write_opcode(OpCode::Set);
            encoder.write_string(key);
            encoder.write_length(set.len());

            for member in set {
                encoder.write_string(member);
            }
        }

        for (key, members) in &snapshot.sorted_sets {
            encoder.write_opcode(OpCode::SortedSet);
            encoder.write_string(key);
            encoder.write_length(members.len());

            for (member, score) in members {
                encoder.write_string(member);
                encoder.buffer.put_f64(*score);
            }
        }

        for (key, entries) in &snapshot.streams {
            encoder.write_opcode(OpCode::Stream);
            encoder.write_string(key);
            encoder.write_length(entries.len());

            for entry in entries {
                encoder.write_string(&entry.id.to_string());
                encoder.write_length(entry.fields.len());

                for (field, value) in &entry.fields {
                    encoder.write_string(field);
                    encoder.write_string(value);
                }
            }
        }

        encoder.write_opcode(OpCode::EndOfFile);
        encoder.finish()
    }

    fn write_header(&mut self) {
        self.buffer.put_slice(MAGIC_STRING);
        self.buffer.put_u32(RDB_VERSION);
    }

    fn write_opcode(&mut self, opcode: OpCode) {
        self.buffer.put_u8(opcode.as_byte());
    }

    fn write_length(&mut self, length: usize) {
        self.buffer.put_u64(length as u64);
    }

    fn write_string(&mut self, value: &str) {
        self.write_length(value.len());
        self.buffer.put_slice(value.as_bytes());
    }

    fn finish(mut self) -> Vec<u8> {
        let checksum = checksum(&self.buffer);
        self.buffer.put_u64(checksum);
        self.buffer
    }
}
