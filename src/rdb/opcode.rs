use crate::rdb::RdbError;

pub const MAGIC_STRING: &[u8; 5] = b"REDIS";
pub const RDB_VERSION: u32 = 1;

/// Magic string and version.
pub const HEADER_LENGTH: usize = 9;
pub const CHECKSUM_LENGTH: usize = 8;
/// Header, EOF opcode and checksum of an empty snapshot.
pub const MINIMUM_FILE_LENGTH: usize = HEADER_LENGTH + 1 + CHECKSUM_LENGTH;

const STRING_OPCODE: u8 = 0x00;
const LIST_OPCODE: u8 = 0x01;
const HASH_OPCODE: u8 = 0x02;
const SET_OPCODE: u8 = 0x03;
const SORTED_SET_OPCODE: u8 = 0x04;
const STREAM_OPCODE: u8 = 0x05;
const END_OF_FILE_OPCODE: u8 = 0xFF;

/// Record types of the snapshot body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    String,
    List,
    Hash,
    Set,
    SortedSet,
    Stream,
    EndOfFile,
}

impl OpCode {
    pub fn as_byte(self) -> u8 {
        match self {
            OpCode::String => STRING_OPCODE,
            OpCode::List => LIST_OPCODE,
            OpCode::Hash => HASH_OPCODE,
            OpCode::Set => SET_OPCODE,
            OpCode::SortedSet => SORTED_SET_OPCODE,
            OpCode::Stream => STREAM_OPCODE,
            OpCode::EndOfFile => END_OF_FILE_OPCODE,
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = RdbError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            STRING_OPCODE => Ok(OpCode::String),
            LIST_OPCODE => Ok(OpCode::List),
            HASH_OPCODE => Ok(OpCode::Hash),
            SET_OPCODE => Ok(OpCode::Set),
            SORTED_SET_OPCODE => Ok(OpCode::SortedSet),
            STREAM_OPCODE => Ok(OpCode::Stream),
            END_OF_FILE_OPCODE => Ok(OpCode::EndOfFile),
            opcode => Err(RdbError::UnknownOpCode(opcode)),
        }
    }
}
