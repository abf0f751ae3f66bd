use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RespError {
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
    #[error("unknown RESP type '{0}'")]
    UnknownRespType(char),
    #[error("failed to parse integer")]
    FailedToParseInteger,
    #[error("invalid bulk string")]
    InvalidBulkString,
    #[error("invalid array")]
    InvalidArray,
    #[error("line without a RESP type")]
    EmptyLine,
}

/// A single value of the wire protocol. Requests arrive as arrays of bulk
/// strings and every reply is one of these.
#[derive(Debug, PartialEq, Clone)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(String),
    Null,
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn encode(&self) -> String {
        match self {
            RespValue::SimpleString(s) => format!("+{}\r\n", s),
            RespValue::Error(e) => format!("-{}\r\n", e),
            RespValue::Integer(i) => format!(":{}\r\n", i),
            RespValue::BulkString(s) => format!("${}\r\n{}\r\n", s.len(), s),
            RespValue::Null => "$-1\r\n".to_string(),
            RespValue::Array(elements) => {
                let mut encoded = format!("*{}\r\n", elements.len());

                for element in elements {
                    encoded.push_str(&element.encode());
                }

                encoded
            }
        }
    }

    /// Builds an array of bulk strings, the shape of every request.
    pub fn command<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RespValue::Array(
            parts
                .into_iter()
                .map(|part| RespValue::BulkString(part.into()))
                .collect(),
        )
    }

    /// Decodes one value from the front of `bytes`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some((value, consumed)))` - A complete value and the number of bytes it spans
    /// * `Ok(None)` - The buffer holds only part of a value so far
    /// * `Err(RespError)` - The buffer does not hold a RESP value
    pub fn decode(bytes: &[u8]) -> Result<Option<(RespValue, usize)>, RespError> {
        let Some(line_end) = find_crlf(bytes) else {
            return Ok(None);
        };

        let Some(&type_byte) = bytes.first() else {
            return Ok(None);
        };

        let line = bytes.get(1..line_end).ok_or(RespError::EmptyLine)?;
        let line = std::str::from_utf8(line).map_err(|_| RespError::InvalidUtf8)?;
        let after_line = line_end + 2;

        match type_byte {
            b'+' => Ok(Some((RespValue::SimpleString(line.to_string()), after_line))),
            b'-' => Ok(Some((RespValue::Error(line.to_string()), after_line))),
            b':' => {
                let value = line
                    .parse::<i64>()
                    .map_err(|_| RespError::FailedToParseInteger)?;

                Ok(Some((RespValue::Integer(value), after_line)))
            }
            b'$' => {
                let length = line
                    .parse::<i64>()
                    .map_err(|_| RespError::InvalidBulkString)?;

                if length == -1 {
                    return Ok(Some((RespValue::Null, after_line)));
                }

                let length = usize::try_from(length).map_err(|_| RespError::InvalidBulkString)?;
                let end = after_line + length;

                if bytes.len() < end + 2 {
                    return Ok(None);
                }

                if &bytes[end..end + 2] != b"\r\n" {
                    return Err(RespError::InvalidBulkString);
                }

                let content = String::from_utf8(bytes[after_line..end].to_vec())
                    .map_err(|_| RespError::InvalidUtf8)?;

                Ok(Some((RespValue::BulkString(content), end + 2)))
            }
            b'*' => {
                let length = line
                    .parse::<i64>()
                    .map_err(|_| RespError::InvalidArray)?;

                if length == -1 {
                    return Ok(Some((RespValue::Null, after_line)));
                }

                let length = usize::try_from(length).map_err(|_| RespError::InvalidArray)?;
                let mut elements = Vec::with_capacity(length.min(1024));
                let mut position = after_line;

                while elements.len() < length {
                    match RespValue::decode(&bytes[position..])? {
                        Some((element, consumed)) => {
                            elements.push(element);
                            position += consumed;
                        }
                        None => return Ok(None),
                    }
                }

                Ok(Some((RespValue::Array(elements), position)))
            }
            other => Err(RespError::UnknownRespType(other as char)),
        }
    }
}

fn find_crlf(bytes: &[u8]) -> Option<usize> {
    bytes.windows(2).position(|window| window == b"\r\n")
}
