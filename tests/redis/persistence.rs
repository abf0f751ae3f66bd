use redis_lite::{config::ServerConfig, rdb::load_rdb_file, resp::RespValue};

use crate::test_utils::{TestEnv, TestUtils};

fn config_in(dir: &tempfile::TempDir) -> ServerConfig {
    ServerConfig {
        dir: dir.path().display().to_string(),
        dbfilename: "snapshot.rdb".to_string(),
        ..ServerConfig::default()
    }
}

#[tokio::test]
async fn test_bgsave_writes_the_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let mut env = TestEnv::with_config(config.clone());
    let client = TestUtils::client_address(41844);

    env.exec_command_immediate_success_response(
        TestUtils::command(&["ZADD", "board", "1.5", "alice", "3", "bob"]),
        &client,
        &TestUtils::expected_integer(2),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::command(&["BGSAVE"]),
        &client,
        &TestUtils::expected_simple_string("Background saving started"),
    )
    .await;

    let state = env.state().clone();
    assert!(TestUtils::eventually(|| !state.saver.is_saving()).await);
    assert_eq!(state.store.dirty(), 0);

    let snapshot = load_rdb_file(&config.snapshot_path())
        .await
        .unwrap()
        .expect("snapshot file exists");

    assert_eq!(
        snapshot.sorted_sets.get("board"),
        Some(&vec![("alice".to_string(), 1.5), ("bob".to_string(), 3.0)])
    );
    assert!(!config.temporary_snapshot_path().exists());
}

#[tokio::test]
async fn test_config_get_reports_persistence_settings() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let mut env = TestEnv::with_config(config.clone());

    env.exec_command_immediate_success_response(
        TestUtils::command(&["CONFIG", "GET", "dbfilename"]),
        &TestUtils::client_address(41844),
        &TestUtils::expected_bulk_string_array(&["dbfilename", "snapshot.rdb"]),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::command(&["CONFIG", "GET", "dir"]),
        &TestUtils::client_address(41844),
        &TestUtils::expected_bulk_string_array(&["dir", config.dir.as_str()]),
    )
    .await;
}

#[tokio::test]
async fn test_restarted_server_serves_saved_data() {
    let dir = tempfile::tempdir().unwrap();

    let (port, _) = TestUtils::run_server(config_in(&dir)).await;
    let (mut reader, mut writer) = TestUtils::connect(port).await;

    for command in [
        TestUtils::set_command("name", "lite"),
        TestUtils::command(&["HSET", "user", "id", "7"]),
        TestUtils::command(&["SADD", "tags", "fast"]),
        TestUtils::xadd_command("log", "1-1", &["level", "info"]),
        TestUtils::command(&["SAVE"]),
    ] {
        let reply = TestUtils::send_command_and_receive(&mut reader, &mut writer, command).await;
        assert!(!matches!(reply, RespValue::Error(_)), "{:?}", reply);
    }

    let (port, _) = TestUtils::run_server(config_in(&dir)).await;
    let (mut reader, mut writer) = TestUtils::connect(port).await;

    let expectations = [
        (
            TestUtils::get_command("name"),
            RespValue::BulkString("lite".to_string()),
        ),
        (
            TestUtils::command(&["HGET", "user", "id"]),
            RespValue::BulkString("7".to_string()),
        ),
        (
            TestUtils::command(&["SISMEMBER", "tags", "fast"]),
            RespValue::Integer(1),
        ),
        (
            TestUtils::command(&["TYPE", "log"]),
            RespValue::SimpleString("stream".to_string()),
        ),
    ];

    for (command, expected) in expectations {
        assert_eq!(
            TestUtils::send_command_and_receive(&mut reader, &mut writer, command).await,
            expected
        );
    }
}
