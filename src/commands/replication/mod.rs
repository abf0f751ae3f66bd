mod psync;
mod replconf;

pub use psync::{psync, PsyncArguments};
pub use replconf::{ack_command, replconf, ReplconfArguments};
