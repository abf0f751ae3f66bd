mod discard;
mod exec;
mod multi;
mod watch;

pub use discard::{discard, DiscardArguments};
pub use exec::{exec, ExecArguments};
pub use multi::{multi, MultiArguments};
pub use watch::{unwatch, watch, UnwatchArguments, WatchArguments};
