use std::sync::Arc;

use tracing::debug;

use crate::{
    commands::{
        blpop::{blpop, BlpopArguments},
        command_error::CommandError,
        config_get::{config_get, ConfigGetArguments},
        del::{del, exists, KeysArguments},
        echo::{echo, EchoArguments},
        get::{get, GetArguments},
        hashes::{
            hdel, hexists, hget, hgetall, hkeys, hlen, hset, hvals, HashArguments,
        },
        incr::{incr, IncrArguments},
        info::{info, InfoArguments},
        llen::{llen, LlenArguments},
        lpop::{pop, PopArguments},
        lrange::{lrange, LrangeArguments},
        ping::{ping, PingArguments},
        pub_sub::{publish, subscribe, unsubscribe, PublishArguments, SubscribeArguments},
        replication::{psync, replconf, PsyncArguments, ReplconfArguments},
        rpush_and_lpush::{push, PushArguments},
        save::{bgsave, save, SaveArguments},
        set::{set, SetArguments},
        sets::{
            sadd, scard, sinter, sismember, smembers, srem, sunion, SetMembersArguments,
        },
        sorted_sets::{
            zadd, zcard, zrange, zrank, zrem, zscore, SortedSetArguments,
        },
        transactions::{unwatch, UnwatchArguments},
        type_command::{type_command, TypeArguments},
        xadd::{xadd, XaddArguments},
        xrange::{xrange, XrangeArguments},
        xread::{xread, XreadArguments},
    },
    resp::RespValue,
    session::Session,
    state::State,
};

/// Commands that change the dataset. They are refused on a replica's client
/// connections and propagated from a master.
pub const WRITE_COMMANDS: [&str; 15] = [
    "SET", "INCR", "DEL", "RPUSH", "LPUSH", "LPOP", "RPOP", "BLPOP", "HSET", "HDEL", "SADD",
    "SREM", "ZADD", "ZREM", "XADD",
];

#[derive(Debug, PartialEq)]
pub enum CommandResult {
    NoResponse,
    Response(String),
    /// A mutation that went through, together with the commands replicas must
    /// apply to reach the same state.
    Write {
        response: String,
        propagate: Vec<RespValue>,
    },
}

impl CommandResult {
    /// The reply the client sees, if any.
    pub fn into_response(self) -> Option<String> {
        match self {
            CommandResult::NoResponse => None,
            CommandResult::Response(response) => Some(response),
            CommandResult::Write { response, .. } => Some(response),
        }
    }
}

/// Whether a command runs on its own or as part of an `EXEC` batch. Inside a
/// batch the transaction lock is already held exclusively and blocking commands
/// must not suspend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExecutionMode {
    Immediate,
    Transaction,
}

#[derive(Debug, PartialEq, Clone)]
pub struct CommandHandler {
    pub name: String,
    pub arguments: Vec<String>,
    pub input: RespValue,
}

impl CommandHandler {
    /// Splits a request into its upper-cased command name and its arguments.
    /// `CONFIG GET` is treated as a single two-word command.
    ///
    /// # Returns
    ///
    /// * `Ok(CommandHandler)` - The parsed request
    /// * `Err(CommandError::InvalidCommand)` - The request is not a non-empty array of bulk strings
    /// * `Err(CommandError::UnknownSubcommand)` - `CONFIG` with anything but `GET`
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let handler = CommandHandler::new(RespValue::command(["set", "k", "v"]))?;
    /// // handler.name == "SET", handler.arguments == ["k", "v"]
    /// ```
    pub fn new(input: RespValue) -> Result<Self, CommandError> {
        let RespValue::Array(elements) = &input else {
            return Err(CommandError::InvalidCommand);
        };

        let mut parts = Vec::with_capacity(elements.len());

        for element in elements {
            match element {
                RespValue::BulkString(part) => parts.push(part.clone()),
                _ => return Err(CommandError::InvalidCommand),
            }
        }

        if parts.is_empty() {
            return Err(CommandError::InvalidCommand);
        }

        let name = parts.remove(0).to_uppercase();

        let (name, arguments) = match name.as_str() {
            "CONFIG" => {
                if parts.is_empty() {
                    return Err(CommandError::arity("config"));
                }

                let sub_command = parts.remove(0);

                if sub_command.to_uppercase() != "GET" {
                    return Err(CommandError::UnknownSubcommand(sub_command));
                }

                ("CONFIG GET".to_string(), parts)
            }
            _ => (name, parts),
        };

        Ok(Self {
            name,
            arguments,
            input,
        })
    }

    pub fn is_write(&self) -> bool {
        WRITE_COMMANDS.contains(&self.name.as_str())
    }

    /// The keys this command reads or writes, used to watch them when the command
    /// is queued inside `MULTI`.
    pub fn keys(&self) -> Vec<&str> {
        let arguments: Vec<&str> = self.arguments.iter().map(String::as_str).collect();

        match self.name.as_str() {
            "DEL" | "EXISTS" | "SUNION" | "SINTER" => arguments,
            "BLPOP" => match arguments.split_last() {
                Some((_, keys)) => keys.to_vec(),
                None => Vec::new(),
            },
            "XREAD" => {
                let Some(position) = arguments
                    .iter()
                    .position(|argument| argument.eq_ignore_ascii_case("STREAMS"))
                else {
                    return Vec::new();
                };

                let streams = &arguments[position + 1..];
                streams[..streams.len() / 2].to_vec()
            }
            "GET" | "SET" | "INCR" | "TYPE" | "RPUSH" | "LPUSH" | "LPOP" | "RPOP" | "LRANGE"
            | "LLEN" | "HSET" | "HGET" | "HDEL" | "HEXISTS" | "HLEN" | "HKEYS" | "HVALS"
            | "HGETALL" | "SADD" | "SREM" | "SMEMBERS" | "SISMEMBER" | "SCARD" | "ZADD"
            | "ZSCORE" | "ZRANK" | "ZCARD" | "ZRANGE" | "ZREM" | "XADD" | "XRANGE" => {
                arguments.into_iter().take(1).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Checks arity and syntax without running the command. Used before a command
    /// is queued inside `MULTI`.
    pub fn validate_command_arguments(&self) -> Option<CommandError> {
        let arguments = self.arguments.clone();

        match self.name.as_str() {
            "PING" => PingArguments::parse(arguments).err(),
            "ECHO" => EchoArguments::parse(arguments).err(),
            "GET" => GetArguments::parse(arguments).err(),
            "SET" => SetArguments::parse(arguments).err(),
            "INCR" => IncrArguments::parse(arguments).err(),
            "DEL" | "EXISTS" => KeysArguments::parse(arguments, &self.name).err(),
            "TYPE" => TypeArguments::parse(arguments).err(),
            "RPUSH" | "LPUSH" => PushArguments::parse(arguments, &self.name).err(),
            "LPOP" | "RPOP" => PopArguments::parse(arguments, &self.name).err(),
            "LRANGE" => LrangeArguments::parse(arguments).err(),
            "LLEN" => LlenArguments::parse(arguments).err(),
            "BLPOP" => BlpopArguments::parse(arguments).err(),
            "HSET" | "HGET" | "HDEL" | "HEXISTS" | "HLEN" | "HKEYS" | "HVALS" | "HGETALL" => {
                HashArguments::parse(arguments, &self.name).err()
            }
            "SADD" | "SREM" | "SMEMBERS" | "SISMEMBER" | "SCARD" | "SUNION" | "SINTER" => {
                SetMembersArguments::parse(arguments, &self.name).err()
            }
            "ZADD" | "ZSCORE" | "ZRANK" | "ZCARD" | "ZRANGE" | "ZREM" => {
                SortedSetArguments::parse(arguments, &self.name).err()
            }
            "XADD" => XaddArguments::parse(arguments).err(),
            "XRANGE" => XrangeArguments::parse(arguments).err(),
            "XREAD" => XreadArguments::parse(arguments).err(),
            "INFO" => InfoArguments::parse(arguments).err(),
            "CONFIG GET" => ConfigGetArguments::parse(arguments).err(),
            "SAVE" | "BGSAVE" => SaveArguments::parse(arguments, &self.name).err(),
            "PUBLISH" => PublishArguments::parse(arguments).err(),
            "SUBSCRIBE" | "UNSUBSCRIBE" => SubscribeArguments::parse(arguments, &self.name).err(),
            "REPLCONF" => ReplconfArguments::parse(arguments).err(),
            "PSYNC" => PsyncArguments::parse(arguments).err(),
            "UNWATCH" => UnwatchArguments::parse(arguments).err(),
            _ => Some(CommandError::UnknownCommand(self.name.to_lowercase())),
        }
    }

    /// Runs the command against the shared state.
    ///
    /// Transaction control (`MULTI`, `EXEC`, `DISCARD`, `WATCH`) never reaches this
    /// point; the dispatcher handles it. Mutating commands return
    /// [`CommandResult::Write`] so the caller can propagate them.
    pub async fn handle_command(
        &self,
        state: &Arc<State>,
        session: &mut Session,
        mode: ExecutionMode,
    ) -> Result<CommandResult, CommandError> {
        let store = &state.store;
        let arguments = self.arguments.clone();

        match self.name.as_str() {
            "PING" => ping(arguments).map(CommandResult::Response),
            "ECHO" => echo(arguments).map(CommandResult::Response),
            "GET" => get(store, arguments).await.map(CommandResult::Response),
            "SET" => set(store, arguments).await.map(|r| self.replicated(r)),
            "INCR" => incr(store, arguments).await.map(|r| self.replicated(r)),
            "DEL" => del(store, arguments).await.map(|r| self.replicated(r)),
            "EXISTS" => exists(store, arguments).await.map(CommandResult::Response),
            "TYPE" => type_command(store, arguments)
                .await
                .map(CommandResult::Response),
            "RPUSH" | "LPUSH" => push(store, &self.name, arguments).await,
            "LPOP" | "RPOP" => pop(store, &self.name, arguments).await,
            "LRANGE" => lrange(store, arguments).await.map(CommandResult::Response),
            "LLEN" => llen(store, arguments).await.map(CommandResult::Response),
            "BLPOP" => blpop(state, arguments, mode).await,
            "HSET" => hset(store, arguments).await.map(|r| self.replicated(r)),
            "HDEL" => hdel(store, arguments).await.map(|r| self.replicated(r)),
            "HGET" => hget(store, arguments).await.map(CommandResult::Response),
            "HEXISTS" => hexists(store, arguments).await.map(CommandResult::Response),
            "HLEN" => hlen(store, arguments).await.map(CommandResult::Response),
            "HKEYS" => hkeys(store, arguments).await.map(CommandResult::Response),
            "HVALS" => hvals(store, arguments).await.map(CommandResult::Response),
            "HGETALL" => hgetall(store, arguments).await.map(CommandResult::Response),
            "SADD" => sadd(store, arguments).await.map(|r| self.replicated(r)),
            "SREM" => srem(store, arguments).await.map(|r| self.replicated(r)),
            "SMEMBERS" => smembers(store, arguments).await.map(CommandResult::Response),
            "SISMEMBER" => sismember(store, arguments).await.map(CommandResult::Response),
            "SCARD" => scard(store, arguments).await.map(CommandResult::Response),
            "SUNION" => sunion(store, arguments).await.map(CommandResult::Response),
            "SINTER" => sinter(store, arguments).await.map(CommandResult::Response),
            "ZADD" => zadd(store, arguments).await.map(|r| self.replicated(r)),
            "ZREM" => zrem(store, arguments).await.map(|r| self.replicated(r)),
            "ZSCORE" => zscore(store, arguments).await.map(CommandResult::Response),
            "ZRANK" => zrank(store, arguments).await.map(CommandResult::Response),
            "ZCARD" => zcard(store, arguments).await.map(CommandResult::Response),
            "ZRANGE" => zrange(store, arguments).await.map(CommandResult::Response),
            "XADD" => xadd(store, arguments).await,
            "XRANGE" => xrange(store, arguments).await.map(CommandResult::Response),
            "XREAD" => xread(store, arguments, mode).await.map(CommandResult::Response),
            "INFO" => info(state, arguments).await.map(CommandResult::Response),
            "CONFIG GET" => config_get(&state.config, arguments).map(CommandResult::Response),
            "SAVE" => save(state, arguments).await.map(CommandResult::Response),
            "BGSAVE" => bgsave(state, arguments).map(CommandResult::Response),
            "PUBLISH" => publish(state, arguments).await.map(CommandResult::Response),
            "SUBSCRIBE" => subscribe(state, session, arguments)
                .await
                .map(CommandResult::Response),
            "UNSUBSCRIBE" => unsubscribe(state, session, arguments)
                .await
                .map(CommandResult::Response),
            "REPLCONF" => replconf(state, session, arguments).await,
            "PSYNC" => psync(state, session, arguments).await,
            "UNWATCH" => unwatch(session, arguments).map(CommandResult::Response),
            _ => {
                debug!(command = %self.name, "unknown command");
                Ok(CommandResult::Response(
                    RespValue::BulkString(String::new()).encode(),
                ))
            }
        }
    }

    /// Wraps the reply of a command that is replicated exactly as it arrived.
    fn replicated(&self, response: String) -> CommandResult {
        CommandResult::Write {
            response,
            propagate: vec![self.input.clone()],
        }
    }
}
