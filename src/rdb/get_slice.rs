use crate::rdb::RdbError;

/// Returns `len` bytes starting at `cursor`, or `Truncated` if the buffer ends first.
pub fn get_buffer_slice(buffer: &[u8], cursor: usize, len: usize) -> Result<&[u8], RdbError> {
    let end = cursor.checked_add(len).ok_or(RdbError::Truncated)?;

    buffer.get(cursor..end).ok_or(RdbError::Truncated)
}
