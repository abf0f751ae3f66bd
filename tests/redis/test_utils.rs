use std::{collections::HashMap, sync::Arc, time::Duration};

use redis_lite::{
    commands::{CommandDispatcher, CommandError},
    config::{ReplicaOf, ServerConfig},
    input::RespReader,
    resp::RespValue,
    server::RedisServer,
    session::{Outbound, Session, OUTBOUND_CAPACITY},
    state::State,
};
use tokio::{
    io::AsyncWriteExt,
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    sync::mpsc,
    task::JoinHandle,
    time::timeout,
};

/// Test utilities for simplifying Redis command tests
pub struct TestUtils;

/// A client session together with the receiving end of its outbound channel
pub struct TestClient {
    pub session: Session,
    pub outbound: mpsc::Receiver<Outbound>,
}

/// Test environment containing the shared server state and one session per
/// client address
pub struct TestEnv {
    pub dispatcher: CommandDispatcher,
    clients: HashMap<String, TestClient>,
}

impl TestEnv {
    /// Create a new test environment with a master server
    pub fn new_master_server() -> Self {
        Self::with_config(ServerConfig::default())
    }

    /// Create a new test environment with a replica server. The link to the
    /// master is not started.
    pub fn new_replica_server(master_port: u16) -> Self {
        Self::with_config(ServerConfig {
            replica_of: Some(ReplicaOf {
                host: "127.0.0.1".to_string(),
                port: master_port,
            }),
            ..ServerConfig::default()
        })
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(Arc::new(State::new(config))),
            clients: HashMap::new(),
        }
    }

    pub fn state(&self) -> &Arc<State> {
        self.dispatcher.state()
    }

    /// Get the session for `client_address`, connecting it on first use
    pub fn client(&mut self, client_address: &str) -> &mut TestClient {
        let state = Arc::clone(self.dispatcher.state());

        self.clients
            .entry(client_address.to_string())
            .or_insert_with(|| TestUtils::new_client(&state, client_address))
    }

    /// Run a command on the session of `client_address` and return its reply
    pub async fn exec_command(&mut self, command: RespValue, client_address: &str) -> Option<String> {
        let dispatcher = self.dispatcher.clone();
        let client = self.client(client_address);

        dispatcher.dispatch(&mut client.session, command).await
    }

    /// Execute a command and assert it replies with the expected response
    pub async fn exec_command_immediate_success_response(
        &mut self,
        command: RespValue,
        client_address: &str,
        expected_response: &str,
    ) {
        let response = self.exec_command(command.clone(), client_address).await;

        assert_eq!(
            response,
            Some(expected_response.to_string()),
            "running {:?}",
            command
        );
    }

    /// Execute a command and assert it fails with the expected error
    pub async fn exec_command_immediate_error_response(
        &mut self,
        command: RespValue,
        client_address: &str,
        expected_error: CommandError,
    ) {
        let response = self.exec_command(command.clone(), client_address).await;

        assert_eq!(
            response,
            Some(expected_error.as_string()),
            "running {:?}",
            command
        );
    }

    /// Execute a command that produces no reply, like REPLCONF ACK
    pub async fn exec_command_no_response(&mut self, command: RespValue, client_address: &str) {
        let response = self.exec_command(command.clone(), client_address).await;

        assert_eq!(response, None, "running {:?}", command);
    }

    /// Wait for the next asynchronous frame sent to `client_address`
    pub async fn next_outbound(&mut self, client_address: &str) -> Option<Outbound> {
        let client = self.client(client_address);

        timeout(Duration::from_secs(1), client.outbound.recv())
            .await
            .ok()
            .flatten()
    }

    /// Assert nothing was pushed to `client_address`
    pub fn assert_no_outbound(&mut self, client_address: &str) {
        let client = self.client(client_address);

        assert!(client.outbound.try_recv().is_err());
    }
}

impl TestUtils {
    pub fn new_client(state: &Arc<State>, client_address: &str) -> TestClient {
        let (sender, outbound) = mpsc::channel(OUTBOUND_CAPACITY);

        TestClient {
            session: Session::client(state.next_session_id(), client_address, sender),
            outbound,
        }
    }

    /// Create an arbitrary command from its parts
    pub fn command(parts: &[&str]) -> RespValue {
        RespValue::command(parts.iter().copied())
    }

    /// Create a BLPOP command
    pub fn blpop_command(key: &str, timeout_seconds: &str) -> RespValue {
        Self::command(&["BLPOP", key, timeout_seconds])
    }

    /// Create an RPUSH command with multiple values
    pub fn rpush_command(key: &str, values: &[&str]) -> RespValue {
        let mut command = vec!["RPUSH", key];
        command.extend_from_slice(values);

        Self::command(&command)
    }

    /// Create an LPUSH command with multiple values
    pub fn lpush_command(key: &str, values: &[&str]) -> RespValue {
        let mut command = vec!["LPUSH", key];
        command.extend_from_slice(values);

        Self::command(&command)
    }

    /// Create an LLEN command
    pub fn llen_command(key: &str) -> RespValue {
        Self::command(&["LLEN", key])
    }

    /// Create an LRANGE command
    pub fn lrange_command(key: &str, start: i64, stop: i64) -> RespValue {
        let (start, stop) = (start.to_string(), stop.to_string());

        Self::command(&["LRANGE", key, start.as_str(), stop.as_str()])
    }

    /// Create a GET command
    pub fn get_command(key: &str) -> RespValue {
        Self::command(&["GET", key])
    }

    /// Create a SET command
    pub fn set_command(key: &str, value: &str) -> RespValue {
        Self::command(&["SET", key, value])
    }

    /// Create an INCR command
    pub fn incr_command(key: &str) -> RespValue {
        Self::command(&["INCR", key])
    }

    /// Create a XADD command
    pub fn xadd_command(key: &str, stream_id: &str, entries: &[&str]) -> RespValue {
        let mut command = vec!["XADD", key, stream_id];
        command.extend_from_slice(entries);

        Self::command(&command)
    }

    /// Create a blocking XREAD command
    pub fn xread_blocking_command(
        timeout_milliseconds: &str,
        keys: &[&str],
        start_stream_ids: &[&str],
    ) -> RespValue {
        let mut command = vec!["XREAD", "BLOCK", timeout_milliseconds, "STREAMS"];
        command.extend_from_slice(keys);
        command.extend_from_slice(start_stream_ids);

        Self::command(&command)
    }

    pub fn multi_command() -> RespValue {
        Self::command(&["MULTI"])
    }

    pub fn exec_command() -> RespValue {
        Self::command(&["EXEC"])
    }

    pub fn discard_command() -> RespValue {
        Self::command(&["DISCARD"])
    }

    pub fn watch_command(keys: &[&str]) -> RespValue {
        let mut command = vec!["WATCH"];
        command.extend_from_slice(keys);

        Self::command(&command)
    }

    pub fn subscribe_command(channels: &[&str]) -> RespValue {
        let mut command = vec!["SUBSCRIBE"];
        command.extend_from_slice(channels);

        Self::command(&command)
    }

    pub fn unsubscribe_command(channels: &[&str]) -> RespValue {
        let mut command = vec!["UNSUBSCRIBE"];
        command.extend_from_slice(channels);

        Self::command(&command)
    }

    pub fn publish_command(channel: &str, message: &str) -> RespValue {
        Self::command(&["PUBLISH", channel, message])
    }

    pub fn client_address(port: u16) -> String {
        format!("127.0.0.1:{}", port)
    }

    /// Spawn a client on its own session that runs a single BLPOP
    pub fn spawn_blpop_task(
        env: &TestEnv,
        key: &str,
        timeout_seconds: &str,
        client_address: &str,
    ) -> JoinHandle<Option<String>> {
        Self::spawn_command_task(env, Self::blpop_command(key, timeout_seconds), client_address)
    }

    /// Spawn a client on its own session that runs a single blocking XREAD
    pub fn spawn_xread_task(
        env: &TestEnv,
        timeout_milliseconds: &str,
        key: &str,
        start_stream_id: &str,
        client_address: &str,
    ) -> JoinHandle<Option<String>> {
        Self::spawn_command_task(
            env,
            Self::xread_blocking_command(timeout_milliseconds, &[key], &[start_stream_id]),
            client_address,
        )
    }

    fn spawn_command_task(
        env: &TestEnv,
        command: RespValue,
        client_address: &str,
    ) -> JoinHandle<Option<String>> {
        let dispatcher = env.dispatcher.clone();
        let mut client = Self::new_client(env.state(), client_address);

        tokio::spawn(async move { dispatcher.dispatch(&mut client.session, command).await })
    }

    /// Wait for a spawned client, failing if it takes longer than `limit`
    pub async fn wait_for_completion(
        task: JoinHandle<Option<String>>,
        limit: Duration,
    ) -> Result<Option<String>, String> {
        match timeout(limit, task).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(format!("task failed: {}", e)),
            Err(_) => Err("task timed out".to_string()),
        }
    }

    pub fn expected_bulk_string(value: &str) -> String {
        RespValue::BulkString(value.to_string()).encode()
    }

    pub fn expected_integer(value: i64) -> String {
        RespValue::Integer(value).encode()
    }

    pub fn expected_simple_string(value: &str) -> String {
        RespValue::SimpleString(value.to_string()).encode()
    }

    pub fn expected_null() -> String {
        RespValue::Null.encode()
    }

    pub fn expected_bulk_string_array(items: &[&str]) -> String {
        RespValue::command(items.iter().copied()).encode()
    }

    pub async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    /// Bind a server on an ephemeral port and run it in the background
    pub async fn run_server(config: ServerConfig) -> (u16, Arc<State>) {
        let server = RedisServer::new(ServerConfig { port: 0, ..config })
            .await
            .unwrap();
        let port = server.local_addr().unwrap().port();
        let state = Arc::clone(server.state());

        tokio::spawn(server.run());

        (port, state)
    }

    pub async fn connect(port: u16) -> (RespReader<OwnedReadHalf>, OwnedWriteHalf) {
        let stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let (reader, writer) = stream.into_split();

        (RespReader::new(reader), writer)
    }

    /// Send a command over TCP and return the decoded reply
    pub async fn send_command_and_receive(
        reader: &mut RespReader<OwnedReadHalf>,
        writer: &mut OwnedWriteHalf,
        command: RespValue,
    ) -> RespValue {
        writer.write_all(command.encode().as_bytes()).await.unwrap();

        let (value, _) = timeout(Duration::from_secs(2), reader.read_value())
            .await
            .expect("no reply within two seconds")
            .unwrap()
            .expect("connection closed");

        value
    }

    /// Poll `condition` until it holds or two seconds pass
    pub async fn eventually<F>(mut condition: F) -> bool
    where
        F: FnMut() -> bool,
    {
        for _ in 0..100 {
            if condition() {
                return true;
            }

            Self::sleep_ms(20).await;
        }

        false
    }
}
