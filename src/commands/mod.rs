mod blpop;
mod command_dispatcher;
mod command_error;
mod command_handler;
mod config_get;
mod del;
mod echo;
mod get;
mod hashes;
mod incr;
mod info;
mod llen;
mod lpop;
mod lrange;
mod ping;
mod pub_sub;
mod replication;
mod rpush_and_lpush;
mod save;
mod set;
mod sets;
mod sorted_sets;
mod stream_utils;
mod transactions;
mod type_command;
mod xadd;
mod xrange;
mod xread;

pub use command_dispatcher::{CommandDispatcher, DispatchResult};
pub use command_error::CommandError;
pub use command_handler::{CommandHandler, CommandResult, ExecutionMode, WRITE_COMMANDS};
pub use blpop::restore_stranded_values;
pub use replication::ack_command;
