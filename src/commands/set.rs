use std::time::Duration;

use tokio::time::Instant;

use crate::{
    commands::command_error::CommandError,
    key_value_store::{KeyValueStore, SetCondition, SetExpiration, SetOptions, SetOutcome},
    resp::RespValue,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum ExpirationOption {
    None,
    KeepTtl,
    After(Duration),
}

/// Represents the parsed arguments for the SET command
#[derive(Debug, PartialEq)]
pub struct SetArguments {
    /// The key name to write
    key: String,
    /// The value to be stored under the given key
    value: String,
    condition: Option<SetCondition>,
    /// Reply with the previous value instead of `OK`
    get: bool,
    expiration: ExpirationOption,
}

impl SetArguments {
    /// Parses command arguments into a SetArguments structure.
    ///
    /// Accepts `key value [NX | XX] [GET] [EX seconds | PX milliseconds | KEEPTTL]`,
    /// with options in any order and case.
    ///
    /// # Returns
    ///
    /// * `Ok(SetArguments)` - Successfully parsed arguments
    /// * `Err(CommandError::WrongNumberOfArguments)` - Fewer than two arguments
    /// * `Err(CommandError::SyntaxError)` - An unknown option, a missing expiration value,
    ///   or a conflicting combination such as `NX XX` or `EX .. KEEPTTL`
    /// * `Err(CommandError::NotAnInteger)` - The expiration is not an integer
    /// * `Err(CommandError::InvalidExpireTime)` - The expiration is zero or negative
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // SET mykey hello PX 1000 NX
    /// let result = SetArguments::parse(vec![
    ///     "mykey".to_string(),
    ///     "hello".to_string(),
    ///     "PX".to_string(),
    ///     "1000".to_string(),
    ///     "NX".to_string(),
    /// ]);
    ///
    /// // SET mykey hello EX 10 KEEPTTL
    /// // Returns: Err(CommandError::SyntaxError)
    /// ```
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() < 2 {
            return Err(CommandError::arity("set"));
        }

        let mut iter = arguments.into_iter();
        let (Some(key), Some(value)) = (iter.next(), iter.next()) else {
            return Err(CommandError::arity("set"));
        };

        let mut condition = None;
        let mut get = false;
        let mut expiration = ExpirationOption::None;

        while let Some(option) = iter.next() {
            match option.to_uppercase().as_str() {
                "NX" | "XX" => {
                    if condition.is_some() {
                        return Err(CommandError::SyntaxError);
                    }

                    condition = Some(if option.eq_ignore_ascii_case("NX") {
                        SetCondition::Nx
                    } else {
                        SetCondition::Xx
                    });
                }
                "GET" => get = true,
                "KEEPTTL" => {
                    if expiration != ExpirationOption::None {
                        return Err(CommandError::SyntaxError);
                    }

                    expiration = ExpirationOption::KeepTtl;
                }
                unit @ ("EX" | "PX") => {
                    if expiration != ExpirationOption::None {
                        return Err(CommandError::SyntaxError);
                    }

                    let amount = iter.next().ok_or(CommandError::SyntaxError)?;
                    let amount = amount
                        .parse::<i64>()
                        .map_err(|_| CommandError::NotAnInteger)?;

                    if amount <= 0 {
                        return Err(CommandError::InvalidExpireTime("set".to_string()));
                    }

                    let duration = if unit == "EX" {
                        Duration::from_secs(amount as u64)
                    } else {
                        Duration::from_millis(amount as u64)
                    };

                    expiration = ExpirationOption::After(duration);
                }
                _ => return Err(CommandError::SyntaxError),
            }
        }

        Ok(Self {
            key,
            value,
            condition,
            get,
            expiration,
        })
    }

    fn options(&self) -> SetOptions {
        let expiration = match self.expiration {
            ExpirationOption::None => SetExpiration::Clear,
            ExpirationOption::KeepTtl => SetExpiration::Keep,
            ExpirationOption::After(duration) => SetExpiration::At(Instant::now() + duration),
        };

        SetOptions {
            condition: self.condition,
            get: self.get,
            expiration,
        }
    }
}

/// Handles the Redis SET command.
///
/// # Returns
///
/// * `Ok(String)` - `+OK` on a write, null when an `NX`/`XX` condition fails. With
///   `GET`, the previous value (or null) in both cases
/// * `Err(CommandError::Store(StoreError::WrongType))` - `GET` was given and the key
///   holds another type
///
/// # Examples
///
/// ```ignore
/// // SET mykey "hello"
/// let result = set(&store, vec!["mykey".to_string(), "hello".to_string()]).await;
/// // Returns: "+OK\r\n"
/// ```
pub async fn set(store: &KeyValueStore, arguments: Vec<String>) -> Result<String, CommandError> {
    let set_arguments = SetArguments::parse(arguments)?;
    let options = set_arguments.options();

    let outcome = store
        .set(&set_arguments.key, set_arguments.value, options)
        .await?;

    let response = match outcome {
        SetOutcome::Written { previous } | SetOutcome::Skipped { previous } if options.get => {
            previous.map_or(RespValue::Null, RespValue::BulkString)
        }
        SetOutcome::Written { .. } => RespValue::SimpleString("OK".to_string()),
        SetOutcome::Skipped { .. } => RespValue::Null,
    };

    Ok(response.encode())
}
