use thiserror::Error;

use crate::{key_value_store::StoreError, rdb::RdbError, resp::RespValue};

/// Every way a command can fail. The display text is the reply the client sees,
/// error prefix included.
#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("ERR Protocol error: expected an array of bulk strings")]
    InvalidCommand,
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),
    #[error("ERR unknown subcommand '{0}'")]
    UnknownSubcommand(String),
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongNumberOfArguments(String),
    #[error("ERR syntax error")]
    SyntaxError,
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,
    #[error("ERR value is not a valid float")]
    NotAFloat,
    #[error("ERR timeout is not a float or out of range")]
    InvalidTimeout,
    #[error("ERR count must be a positive integer")]
    InvalidCount,
    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpireTime(String),
    #[error("ERR Invalid stream ID specified as stream command argument")]
    InvalidStreamIdArgument,
    #[error("ERR Unbalanced XREAD list of streams: for each stream key an ID must be specified")]
    UnbalancedXread,
    #[error("ERR MULTI calls can not be nested")]
    NestedMulti,
    #[error("ERR WATCH inside MULTI is not allowed")]
    WatchInsideMulti,
    #[error("ERR EXEC without MULTI")]
    ExecWithoutMulti,
    #[error("ERR DISCARD without MULTI")]
    DiscardWithoutMulti,
    #[error("ERR Command not allowed inside a transaction")]
    NotAllowedInTransaction,
    #[error("ERR only 'UNSUBSCRIBE' and 'PING' are allowed in this context")]
    SubscribedContext,
    #[error("READONLY You can't write against a read only replica.")]
    ReadOnlyReplica,
    #[error("ERR Background save already in progress")]
    SaveInProgress,
    #[error("ERR {0}")]
    SaveFailed(String),
    #[error("ERR PSYNC is not supported on this connection")]
    InvalidPsyncConnection,
    #[error("{0}")]
    Store(#[from] StoreError),
}

impl CommandError {
    /// Renders the error as a RESP error reply.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let reply = CommandError::ExecWithoutMulti.as_string();
    /// // Returns: "-ERR EXEC without MULTI\r\n"
    /// ```
    pub fn as_string(&self) -> String {
        RespValue::Error(self.to_string()).encode()
    }

    pub fn arity(command: &str) -> Self {
        CommandError::WrongNumberOfArguments(command.to_lowercase())
    }
}

impl From<RdbError> for CommandError {
    fn from(error: RdbError) -> Self {
        match error {
            RdbError::SaveInProgress => CommandError::SaveInProgress,
            other => CommandError::SaveFailed(other.to_string()),
        }
    }
}
