//! Binary snapshot format.
//!
//! Layout: `REDIS`, a big-endian `u32` version, typed records, an EOF opcode and a
//! big-endian CRC64 (Go ISO table) of every byte before it. Strings are a big-endian
//! `u64` length followed by raw bytes.

mod background_save;
mod get_slice;
mod opcode;
mod rdb_encoder;
mod rdb_file_operations;
mod rdb_parser;

use crc::{Crc, CRC_64_GO_ISO};
use thiserror::Error;

pub use background_save::{save_now, spawn_background_saver, start_background_save, SaveScheduler};
pub use rdb_encoder::RdbEncoder;
pub use rdb_file_operations::{load_rdb_file, save_rdb_file, save_store};
pub use rdb_parser::RdbParser;

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_GO_ISO);

#[derive(Error, Debug, PartialEq)]
pub enum RdbError {
    #[error("snapshot is {0} bytes, shorter than the smallest valid snapshot")]
    TooSmall(usize),
    #[error("checksum mismatch: expected {expected:016x}, computed {computed:016x}")]
    ChecksumMismatch { expected: u64, computed: u64 },
    #[error("invalid magic string")]
    InvalidMagicString,
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
    #[error("unexpected end of snapshot data")]
    Truncated,
    #[error("unknown opcode 0x{0:02X}")]
    UnknownOpCode(u8),
    #[error("invalid UTF-8 in snapshot string")]
    InvalidUtf8,
    #[error("invalid stream entry ID '{0}'")]
    InvalidStreamId(String),
    #[error("a save is already in progress")]
    SaveInProgress,
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for RdbError {
    fn from(error: std::io::Error) -> Self {
        RdbError::Io(error.to_string())
    }
}

pub fn checksum(bytes: &[u8]) -> u64 {
    CRC64.checksum(bytes)
}
