use crate::{commands::command_error::CommandError, config::ServerConfig, resp::RespValue};

pub struct ConfigGetArguments {
    pub parameters: Vec<String>,
}

impl ConfigGetArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.is_empty() {
            return Err(CommandError::arity("config|get"));
        }

        Ok(ConfigGetArguments {
            parameters: arguments,
        })
    }
}

fn parameter_value(config: &ServerConfig, parameter: &str) -> Option<String> {
    match parameter {
        "dir" => Some(config.dir.clone()),
        "dbfilename" => Some(config.dbfilename.clone()),
        "port" => Some(config.port.to_string()),
        "save" => Some(format!("{} {}", config.save_seconds, config.save_changes)),
        _ => None,
    }
}

/// Handles the Redis CONFIG GET command.
///
/// Replies with a flat array of name/value pairs. Unknown parameters are left
/// out of the reply, as Redis does.
///
/// # Examples
///
/// ```ignore
/// // CONFIG GET dir dbfilename
/// let result = config_get(&config, vec!["dir".into(), "dbfilename".into()])?;
/// // Returns: "*4\r\n$3\r\ndir\r\n$4\r\n/tmp\r\n$10\r\ndbfilename\r\n$8\r\ndump.rdb\r\n"
/// ```
pub fn config_get(config: &ServerConfig, arguments: Vec<String>) -> Result<String, CommandError> {
    let config_get_arguments = ConfigGetArguments::parse(arguments)?;
    let mut response = Vec::new();

    for parameter in config_get_arguments.parameters {
        let parameter = parameter.to_lowercase();

        if let Some(value) = parameter_value(config, &parameter) {
            response.push(RespValue::BulkString(parameter));
            response.push(RespValue::BulkString(value));
        }
    }

    Ok(RespValue::Array(response).encode())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_get() {
        let config = ServerConfig::default();

        let test_cases = vec![
            (
                vec!["dir", "dbfilename"],
                Ok("*4\r\n$3\r\ndir\r\n$4\r\n/tmp\r\n$10\r\ndbfilename\r\n$8\r\ndump.rdb\r\n".to_string()),
            ),
            (
                vec!["SAVE"],
                Ok("*2\r\n$4\r\nsave\r\n$5\r\n900 1\r\n".to_string()),
            ),
            (vec!["maxmemory"], Ok("*0\r\n".to_string())),
            (vec![], Err(CommandError::arity("config|get"))),
        ];

        for (parameters, expected) in test_cases {
            let arguments = parameters.iter().map(|p| p.to_string()).collect();
            assert_eq!(
                config_get(&config, arguments),
                expected,
                "CONFIG GET {:?}",
                parameters
            );
        }
    }
}
