use std::{sync::Arc, time::Duration};

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    blocking::Wake,
    commands::{
        command_error::CommandError,
        command_handler::{CommandResult, ExecutionMode},
    },
    key_value_store::BlockingPop,
    resp::RespValue,
    state::State,
};

/// Represents the parsed arguments for the BLPOP command.
pub struct BlpopArguments {
    /// Keys tried in argument order.
    keys: Vec<String>,
    /// `None` waits forever (a timeout of 0).
    timeout: Option<Duration>,
}

impl BlpopArguments {
    /// Parses `key [key ...] timeout`.
    ///
    /// The timeout is in seconds and may be fractional.
    ///
    /// # Returns
    ///
    /// * `Ok(BlpopArguments)` - Successfully parsed arguments
    /// * `Err(CommandError::WrongNumberOfArguments)` - No key was given
    /// * `Err(CommandError::InvalidTimeout)` - The timeout is negative or not a finite number
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let Some((timeout, keys)) = arguments.split_last() else {
            return Err(CommandError::arity("blpop"));
        };

        if keys.is_empty() {
            return Err(CommandError::arity("blpop"));
        }

        let seconds = timeout
            .parse::<f64>()
            .ok()
            .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
            .ok_or(CommandError::InvalidTimeout)?;

        let timeout = if seconds == 0.0 {
            None
        } else {
            Some(Duration::try_from_secs_f64(seconds).map_err(|_| CommandError::InvalidTimeout)?)
        };

        Ok(Self {
            keys: keys.to_vec(),
            timeout,
        })
    }
}

fn popped(key: String, value: String) -> String {
    RespValue::command([key, value]).encode()
}

/// Handles the Redis BLPOP command.
///
/// Tries every key in order and pops from the first non-empty list. When all of
/// them are empty, the client is registered as a waiter on every key (in the same
/// critical section as the check, so no push can be missed) and suspended until a
/// push hands it a value or the timeout passes. Inside `EXEC` the command never
/// suspends and replies null instead.
///
/// An immediate pop is propagated to replicas as `LPOP key`. A value handed over
/// by a push was already propagated by that push.
///
/// # Returns
///
/// * `Ok(CommandResult)` - `[key, value]`, or null on timeout
/// * `Err(CommandError::Store(StoreError::WrongType))` - A key holds another type
///
/// # Examples
///
/// ```ignore
/// // BLPOP jobs 0.5
/// let result = blpop(&state, vec!["jobs".to_string(), "0.5".to_string()], ExecutionMode::Immediate).await?;
/// // Returns: "*2\r\n$4\r\njobs\r\n$5\r\nfirst\r\n" or "$-1\r\n" after half a second
/// ```
pub async fn blpop(
    state: &Arc<State>,
    arguments: Vec<String>,
    mode: ExecutionMode,
) -> Result<CommandResult, CommandError> {
    let blpop_arguments = BlpopArguments::parse(arguments)?;
    let store = &state.store;

    if mode == ExecutionMode::Transaction {
        return match store.pop_front_or_register(&blpop_arguments.keys, false).await? {
            BlockingPop::Popped { key, value } => Ok(CommandResult::Write {
                propagate: vec![RespValue::command(["LPOP", key.as_str()])],
                response: popped(key, value),
            }),
            _ => Ok(CommandResult::Response(RespValue::Null.encode())),
        };
    }

    // A deadline past what the clock can represent waits forever.
    let deadline = blpop_arguments
        .timeout
        .and_then(|timeout| Instant::now().checked_add(timeout));

    loop {
        let mut registration = {
            let _transaction = state.transactions.shared().await;
            let _write_order = state.replication.write_order().await;

            match store.pop_front_or_register(&blpop_arguments.keys, true).await? {
                BlockingPop::Popped { key, value } => {
                    state
                        .replication
                        .propagate(&RespValue::command(["LPOP", key.as_str()]))
                        .await;

                    return Ok(CommandResult::Response(popped(key, value)));
                }
                BlockingPop::Registered(registration) => registration,
                BlockingPop::Empty => return Ok(CommandResult::Response(RespValue::Null.encode())),
            }
        };

        debug!(keys = ?blpop_arguments.keys, "client blocked");

        match registration.wait(deadline).await {
            Some(Wake::Value { key, value }) => {
                return Ok(CommandResult::Response(popped(key, value)));
            }
            Some(Wake::Ready) => continue,
            None => {
                return match registration.finish() {
                    Some(Wake::Value { key, value }) => {
                        Ok(CommandResult::Response(popped(key, value)))
                    }
                    _ => Ok(CommandResult::Response(RespValue::Null.encode())),
                };
            }
        }
    }
}

/// Puts values handed to clients that disconnected before receiving them back at
/// the head of their lists. The earlier hand-off already reached replicas as an
/// `LPOP`, so each restored value is propagated as an `LPUSH`.
pub async fn restore_stranded_values(state: &Arc<State>) {
    let stranded = state.store.blocking().take_stranded();

    for (key, value) in stranded.into_iter().rev() {
        let _transaction = state.transactions.shared().await;
        let _write_order = state.replication.write_order().await;

        let outcome = match state.store.push(&key, vec![value.clone()], true).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(%key, %error, "dropping a value its blocked client never received");
                continue;
            }
        };

        debug!(%key, "restored a value its blocked client never received");

        state
            .replication
            .propagate(&RespValue::command(["LPUSH", key.as_str(), value.as_str()]))
            .await;

        for _ in 0..outcome.served {
            state
                .replication
                .propagate(&RespValue::command(["LPOP", key.as_str()]))
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arguments(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|part| part.to_string()).collect()
    }

    #[tokio::test]
    async fn test_stranded_value_returns_to_the_head() {
        let state = Arc::new(State::new(crate::config::ServerConfig::default()));
        state
            .store
            .push("q", vec!["next".to_string()], false)
            .await
            .unwrap();

        let keys = vec!["q".to_string()];
        let waiter = state.store.blocking().register(crate::blocking::WaitKind::List, &keys);
        assert_eq!(state.store.blocking().hand_off("q", "first".to_string()), Ok(()));
        drop(waiter);

        restore_stranded_values(&state).await;

        assert_eq!(
            state.store.range("q", 0, -1).await,
            Ok(vec!["first".to_string(), "next".to_string()])
        );
        assert_eq!(
            state.replication.offset(),
            RespValue::command(["LPUSH", "q", "first"]).encode().len() as u64
        );
    }

    #[test]
    fn test_parse_timeout() {
        let parsed = BlpopArguments::parse(arguments(&["a", "b", "0.25"])).unwrap();
        assert_eq!(parsed.keys, arguments(&["a", "b"]));
        assert_eq!(parsed.timeout, Some(Duration::from_millis(250)));

        assert_eq!(BlpopArguments::parse(arguments(&["a", "0"])).unwrap().timeout, None);
    }

    #[test]
    fn test_parse_errors() {
        let test_cases = vec![
            (arguments(&[]), CommandError::arity("blpop")),
            (arguments(&["0"]), CommandError::arity("blpop")),
            (arguments(&["a", "-1"]), CommandError::InvalidTimeout),
            (arguments(&["a", "soon"]), CommandError::InvalidTimeout),
            (arguments(&["a", "inf"]), CommandError::InvalidTimeout),
        ];

        for (input, expected) in test_cases {
            assert_eq!(
                BlpopArguments::parse(input.clone()).err(),
                Some(expected),
                "parsing {:?}",
                input
            );
        }
    }
}
