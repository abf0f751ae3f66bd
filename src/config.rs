use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum CliError {
    #[error("Invalid command line flag '{0}'")]
    InvalidCommandLineFlag(String),
    #[error("Invalid value for command line flag '{0}'")]
    InvalidCommandLineFlagValue(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplicaOf {
    pub host: String,
    pub port: u16,
}

/// Startup configuration, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub dir: String,
    pub dbfilename: String,
    /// Save when at least `save_changes` mutations happened within `save_seconds`.
    pub save_seconds: u64,
    pub save_changes: u64,
    pub replica_of: Option<ReplicaOf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 6379,
            dir: "/tmp".to_string(),
            dbfilename: "dump.rdb".to_string(),
            save_seconds: 900,
            save_changes: 1,
            replica_of: None,
        }
    }
}

impl ServerConfig {
    /// Parses command line flags. The first item is the program name and is skipped.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let config = ServerConfig::from_args(std::env::args())?;
    /// ```
    pub fn from_args<I: IntoIterator<Item = String>>(command_line_args: I) -> Result<Self, CliError> {
        let mut iter = command_line_args.into_iter().skip(1);
        let mut config = ServerConfig::default();

        while let Some(flag) = iter.next() {
            let Some(value) = iter.next() else {
                return Err(CliError::InvalidCommandLineFlagValue(flag));
            };

            let invalid_value = || CliError::InvalidCommandLineFlagValue(flag.clone());

            match flag.as_str() {
                "--port" => {
                    config.port = value
                        .parse::<u16>()
                        .ok()
                        .filter(|port| *port > 0)
                        .ok_or_else(invalid_value)?;
                }
                "--dir" => config.dir = value,
                "--dbfilename" => {
                    if value.is_empty() || value.contains('/') {
                        return Err(invalid_value());
                    }

                    config.dbfilename = value;
                }
                "--save" => {
                    let (seconds, changes) = parse_pair(&value).ok_or_else(invalid_value)?;

                    config.save_seconds = seconds.parse().map_err(|_| invalid_value())?;
                    config.save_changes = changes.parse().map_err(|_| invalid_value())?;
                }
                "--replicaof" => {
                    let (host, port) = parse_pair(&value).ok_or_else(invalid_value)?;
                    let port = port.parse::<u16>().map_err(|_| invalid_value())?;

                    config.replica_of = Some(ReplicaOf {
                        host: host.to_string(),
                        port,
                    });
                }
                _ => return Err(CliError::InvalidCommandLineFlag(flag)),
            }
        }

        Ok(config)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(&self.dbfilename)
    }

    pub fn temporary_snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(format!("{}.tmp", self.dbfilename))
    }
}

/// Splits `"a b"` or `"a:b"` into its two parts.
fn parse_pair(value: &str) -> Option<(&str, &str)> {
    let mut parts = value.split_whitespace();

    match (parts.next(), parts.next(), parts.next()) {
        (Some(first), Some(second), None) => Some((first, second)),
        (Some(single), None, None) => single.rsplit_once(':'),
        _ => None,
    }
}
