use std::time::Duration;

use redis_lite::{
    config::ServerConfig,
    rdb::{load_rdb_file, RdbError},
};

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_set_then_get() {
    let mut env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_immediate_success_response(
        TestUtils::set_command("foo", "bar"),
        &client,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::get_command("foo"),
        &client,
        &TestUtils::expected_bulk_string("bar"),
    )
    .await;
}

#[tokio::test]
async fn test_rpush_then_lrange() {
    let mut env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_immediate_success_response(
        TestUtils::rpush_command("mylist", &["a", "b", "c"]),
        &client,
        &TestUtils::expected_integer(3),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::lrange_command("mylist", 0, -1),
        &client,
        &TestUtils::expected_bulk_string_array(&["a", "b", "c"]),
    )
    .await;
}

#[tokio::test]
async fn test_blpop_is_served_by_a_later_push() {
    let mut env = TestEnv::new_master_server();

    let blocked = TestUtils::spawn_blpop_task(&env, "q", "0", &TestUtils::client_address(41845));

    assert!(
        TestUtils::eventually(|| env.state().store.blocking().waiting_on("q") > 0).await
    );

    env.exec_command_immediate_success_response(
        TestUtils::rpush_command("q", &["v1"]),
        &TestUtils::client_address(41846),
        &TestUtils::expected_integer(1),
    )
    .await;

    let response = TestUtils::wait_for_completion(blocked, Duration::from_secs(2)).await;
    assert_eq!(
        response,
        Ok(Some(TestUtils::expected_bulk_string_array(&["q", "v1"])))
    );

    env.exec_command_immediate_success_response(
        TestUtils::llen_command("q"),
        &TestUtils::client_address(41846),
        &TestUtils::expected_integer(0),
    )
    .await;
}

#[tokio::test]
async fn test_multi_exec_runs_queued_commands() {
    let mut env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_immediate_success_response(
        TestUtils::multi_command(),
        &client,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::set_command("x", "1"),
        &client,
        &TestUtils::expected_simple_string("QUEUED"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::exec_command(),
        &client,
        "*1\r\n+OK\r\n",
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::get_command("x"),
        &client,
        &TestUtils::expected_bulk_string("1"),
    )
    .await;
}

#[tokio::test]
async fn test_exec_aborts_when_a_watched_key_changes() {
    let mut env = TestEnv::new_master_server();
    let watcher = TestUtils::client_address(41844);
    let other = TestUtils::client_address(41845);

    env.exec_command_immediate_success_response(
        TestUtils::watch_command(&["x"]),
        &watcher,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::set_command("x", "2"),
        &other,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::multi_command(),
        &watcher,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::set_command("x", "3"),
        &watcher,
        &TestUtils::expected_simple_string("QUEUED"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::exec_command(),
        &watcher,
        &TestUtils::expected_null(),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::get_command("x"),
        &watcher,
        &TestUtils::expected_bulk_string("2"),
    )
    .await;
}

#[tokio::test]
async fn test_snapshot_round_trip_and_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        dir: dir.path().display().to_string(),
        ..ServerConfig::default()
    };

    let mut env = TestEnv::with_config(config.clone());
    let client = TestUtils::client_address(41844);

    env.exec_command_immediate_success_response(
        TestUtils::set_command("greeting", "hello"),
        &client,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::rpush_command("letters", &["a", "b", "c"]),
        &client,
        &TestUtils::expected_integer(3),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::command(&["SAVE"]),
        &client,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    let snapshot = load_rdb_file(&config.snapshot_path())
        .await
        .unwrap()
        .expect("snapshot file exists");

    let mut restored = TestEnv::with_config(config.clone());
    restored.state().store.load_snapshot(snapshot).await;

    restored
        .exec_command_immediate_success_response(
            TestUtils::get_command("greeting"),
            &client,
            &TestUtils::expected_bulk_string("hello"),
        )
        .await;

    restored
        .exec_command_immediate_success_response(
            TestUtils::lrange_command("letters", 0, -1),
            &client,
            &TestUtils::expected_bulk_string_array(&["a", "b", "c"]),
        )
        .await;

    let mut bytes = std::fs::read(config.snapshot_path()).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    std::fs::write(config.snapshot_path(), &bytes).unwrap();

    let result = load_rdb_file(&config.snapshot_path()).await;
    assert!(
        matches!(result, Err(RdbError::ChecksumMismatch { .. })),
        "got {:?}",
        result.map(|snapshot| snapshot.map(|s| s.key_count()))
    );
}
