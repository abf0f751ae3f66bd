use std::sync::Arc;

use crate::{
    commands::{
        command_error::CommandError,
        command_handler::{CommandHandler, CommandResult, ExecutionMode},
        pub_sub::subscribe_ping,
        transactions::{discard, exec, multi, watch},
    },
    resp::RespValue,
    session::Session,
    state::State,
};

/// Represents the result of dispatching a command.
///
/// Transaction control and queueing are answered by the dispatcher itself.
/// Everything else is executed through [`CommandHandler::handle_command`].
#[derive(Debug, PartialEq)]
pub enum DispatchResult {
    /// A response produced without running the command, such as `+QUEUED`.
    ImmediateResponse(String),
    /// A single command to be executed immediately.
    ExecuteSingleCommand(CommandHandler),
}

/// Routes requests of one server to their handlers.
///
/// One dispatcher serves every connection; the per-connection state lives in
/// the [`Session`] passed to each call.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    state: Arc<State>,
}

impl CommandDispatcher {
    pub fn new(state: Arc<State>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<State> {
        &self.state
    }

    /// Runs one request and returns the reply to send back, if any.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let reply = dispatcher.dispatch(&mut session, RespValue::command(["SET", "k", "v"])).await;
    /// // Returns: Some("+OK\r\n")
    /// ```
    pub async fn dispatch(&self, session: &mut Session, input: RespValue) -> Option<String> {
        let command = match CommandHandler::new(input) {
            Ok(command) => command,
            Err(e) => return Some(e.as_string()),
        };

        match self.dispatch_command(session, command).await {
            Ok(DispatchResult::ImmediateResponse(response)) => Some(response),
            Ok(DispatchResult::ExecuteSingleCommand(command)) => self.execute(session, command).await,
            Err(e) => Some(e.as_string()),
        }
    }

    /// Decides what happens to a command given the session's mode.
    ///
    /// # Returns
    ///
    /// * `Ok(DispatchResult)` - The result of dispatching the command
    /// * `Err(CommandError)` - A transaction control error, a refused command in
    ///   subscribed mode or on a replica, or a command that failed validation while
    ///   queueing
    ///
    /// # Transactional Behavior
    ///
    /// - `MULTI`: Starts queueing and returns "OK"
    /// - `EXEC`: Executes all queued commands unless a watched key changed
    /// - `DISCARD`: Drops the queue and returns "OK"
    /// - `WATCH`: Records key versions, refused while queueing
    /// - Other commands: Queued if inside a transaction, executed immediately otherwise
    pub async fn dispatch_command(
        &self,
        session: &mut Session,
        command: CommandHandler,
    ) -> Result<DispatchResult, CommandError> {
        let state = &self.state;

        if session.is_subscribed() {
            return match command.name.as_str() {
                "PING" => subscribe_ping(command.arguments).map(DispatchResult::ImmediateResponse),
                "UNSUBSCRIBE" => Ok(DispatchResult::ExecuteSingleCommand(command)),
                _ => Err(CommandError::SubscribedContext),
            };
        }

        match command.name.as_str() {
            "MULTI" => multi(session, command.arguments).map(DispatchResult::ImmediateResponse),
            "EXEC" => exec(state, session, command.arguments)
                .await
                .map(DispatchResult::ImmediateResponse),
            "DISCARD" => discard(session, command.arguments).map(DispatchResult::ImmediateResponse),
            "WATCH" => watch(state, session, command.arguments)
                .await
                .map(DispatchResult::ImmediateResponse),
            _ => {
                if command.is_write() && state.replication.is_replica() && !session.is_master_link()
                {
                    return Err(CommandError::ReadOnlyReplica);
                }

                if !session.transaction.is_queueing() {
                    return Ok(DispatchResult::ExecuteSingleCommand(command));
                }

                if matches!(command.name.as_str(), "PSYNC" | "SUBSCRIBE") {
                    return Err(CommandError::NotAllowedInTransaction);
                }

                if let Some(e) = command.validate_command_arguments() {
                    return Err(e);
                }

                session.transaction.enqueue(command, &state.store).await;

                Ok(DispatchResult::ImmediateResponse(
                    RespValue::SimpleString("QUEUED".to_string()).encode(),
                ))
            }
        }
    }

    /// Runs a command outside a transaction.
    ///
    /// Writes hold the transaction lock shared, and the replication write order
    /// while replicas are attached, from the store update until their propagation
    /// is queued. BLPOP takes those itself around each attempt so it never
    /// suspends while holding them.
    async fn execute(&self, session: &mut Session, command: CommandHandler) -> Option<String> {
        let state = &self.state;

        let result = if command.is_write() && command.name != "BLPOP" {
            let _transaction = state.transactions.shared().await;
            let _write_order = state.replication.write_order().await;

            let result = command
                .handle_command(state, session, ExecutionMode::Immediate)
                .await;

            if let Ok(CommandResult::Write { propagate, .. }) = &result {
                for propagated in propagate {
                    state.replication.propagate(propagated).await;
                }
            }

            result
        } else {
            command
                .handle_command(state, session, ExecutionMode::Immediate)
                .await
        };

        match result {
            Ok(result) => result.into_response(),
            Err(e) => Some(e.as_string()),
        }
    }
}
